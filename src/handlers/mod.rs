use chrono::{DateTime, Utc};
use serde::Deserialize;

pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod roles;
pub mod users;
pub mod work_orders;

/// Query parameters shared by the date-range report endpoints.
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}
