pub mod email_sent;
pub mod order;
