//! Test utilities for orderflow crates and services.
//!
//! Provides `MemoryChannel`, an in-process broker channel, and the contract
//! fixture loader. Import from tests only, never from production code.

pub mod broker;
pub mod fixture;
