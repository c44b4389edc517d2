pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod roles;
pub mod users;
pub mod work_orders;
