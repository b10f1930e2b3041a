//! Contract fixture loader.
//!
//! Loads golden files from `contracts/events/` for wire-format assertions.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Load a JSON fixture file relative to the workspace root.
///
/// # Example
/// ```no_run
/// use orderflow_testing::fixture::Fixture;
/// let val = Fixture::load("contracts/events/order_created.json");
/// ```
pub struct Fixture;

impl Fixture {
    /// Load and parse a fixture JSON file at `workspace_root/path`.
    ///
    /// Panics if the file is missing or invalid JSON.
    pub fn load(relative_path: &str) -> Value {
        let contents = Self::load_raw(relative_path);
        serde_json::from_str(&contents)
            .unwrap_or_else(|e| panic!("invalid JSON in fixture {relative_path}: {e}"))
    }

    /// The fixture bytes as stored, for feeding straight into a consumer.
    pub fn load_raw(relative_path: &str) -> String {
        let full_path = workspace_root().join(relative_path);
        std::fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("fixture not found at {}: {e}", full_path.display()))
    }
}

fn workspace_root() -> PathBuf {
    let start = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().expect("current dir"));
    start
        .ancestors()
        .find(|dir| dir.join("contracts").is_dir())
        .map(Path::to_path_buf)
        .unwrap_or(start)
}
