pub mod notifications;
pub mod outbox_events;
