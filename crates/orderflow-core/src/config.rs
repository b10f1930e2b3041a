//! Environment-variable configuration helpers.
//!
//! Every service reads its configuration once at startup. Optional settings
//! fall back to a default usable in a local/dev environment; required ones
//! abort startup.

use std::str::FromStr;

/// Read `key` and parse it, falling back to `default` when unset or unparsable.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read `key` as a string, falling back to `default` when unset.
pub fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Read a required `key`.
///
/// # Panics
///
/// Panics when the variable is missing; a service without it must not start.
pub fn env_required(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("missing required env var {key}"))
}
