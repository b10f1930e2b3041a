//! Ambient plumbing shared by every orderflow service: configuration,
//! tracing, HTTP health and middleware, shutdown signalling and persistence
//! error classification.

pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod sea_ext;
pub mod serde;
pub mod shutdown;
pub mod tracing;
