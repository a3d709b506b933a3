//! Shared test utilities for the bookend test suite.
//!
//! Provides fixture writers for fake project checkouts and build-output
//! trees, plus a canonical page-generation entry source matching the stock
//! anchor configuration.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! write_file(tmp.path(), "fn/util@1.0.mjs", "export const x = 1;\n");
//! let report = sanitize(tmp.path(), &SanitizeOptions::default()).unwrap();
//! ```

use crate::config::EntryConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Write `content` at `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Read the file at `relative` under `root`. Panics with the path on miss.
pub fn read_file(root: &Path, relative: &str) -> String {
    let path = root.join(relative);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

/// A page-generation entry source shaped like the real routing entries:
/// an exported async enumeration function ending in a plain full-list return.
pub fn entry_source() -> &'static str {
    "\
export async function collectPageKeys() {
  const rows = await fetchLocationRows();
  const keys = rows.map((row) => ({ params: { city: row.city } }));
  return keys;
}
"
}

/// The entry config matching [`entry_source`], at the stock routes root.
pub fn default_entry() -> EntryConfig {
    EntryConfig {
        file: "locations/page-keys.mjs".to_string(),
        definition_anchor: "export async function collectPageKeys() {".to_string(),
        return_anchor: "return keys;".to_string(),
        list_identifier: "keys".to_string(),
    }
}
