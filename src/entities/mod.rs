pub mod inventory_history;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod product;
pub mod role;
pub mod user;
pub mod work_order;
