//! Domain and wire types shared by the orders and notifications services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Anything that crosses the broker lives here so that producer and consumer
//! compile against the same definition of the wire contract.

pub mod event;
pub mod id;
pub mod order;
