pub mod notification;
pub mod order_created;
pub mod outbox;
