//! Project configuration module.
//!
//! Handles loading and validating `bookend.toml` from the project root. One
//! flat file configures all three operations; every key has a default, so a
//! project without a config file gets the stock conventions.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [batch]
//! pages_per_build = 2000       # Keys per build invocation
//!
//! [patch]
//! routes_root = "src/routes"               # Where the entry sources live
//! backup_dir = ".bookend/originals"        # Pre-patch backups
//! restore_script = "restore-entries.sh"    # Generated restore script
//!
//! [[patch.entry]]
//! file = "locations/page-keys.mjs"
//! definition_anchor = "export async function collectPageKeys() {"
//! return_anchor = "return keys;"
//! list_identifier = "keys"
//!
//! [sanitize]
//! roots = [".netlify/functions-internal", ".vercel/output/functions"]
//! module_extensions = ["mjs", "js", "cjs"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Name of the config file looked up in the project root.
pub const CONFIG_FILENAME: &str = "bookend.toml";

/// Tool configuration loaded from `bookend.toml`.
///
/// All fields have defaults. Projects only specify the values they want to
/// override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookendConfig {
    /// Batch planning settings.
    pub batch: BatchConfig,
    /// Entry-point patching settings.
    pub patch: PatchConfig,
    /// Build-output sanitization settings.
    pub sanitize: SanitizeConfig,
}

impl BookendConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.pages_per_build == 0 {
            return Err(ConfigError::Validation(
                "batch.pages_per_build must be positive".into(),
            ));
        }
        if self.sanitize.module_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "sanitize.module_extensions must not be empty".into(),
            ));
        }
        for entry in &self.patch.entry {
            if entry.file.is_empty() {
                return Err(ConfigError::Validation(
                    "patch.entry.file must not be empty".into(),
                ));
            }
            if entry.definition_anchor.trim().is_empty() || entry.return_anchor.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "patch.entry anchors for {} must not be empty",
                    entry.file
                )));
            }
            if entry.list_identifier.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "patch.entry.list_identifier for {} must not be empty",
                    entry.file
                )));
            }
        }
        Ok(())
    }
}

/// Batch planning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Keys per build invocation when batching is enabled.
    pub pages_per_build: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pages_per_build: crate::batch::DEFAULT_BATCH_SIZE,
        }
    }
}

/// Entry-point patching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchConfig {
    /// Directory (relative to the project root) holding the routing tree.
    pub routes_root: String,
    /// Directory (relative to the project root) where pre-patch backups go.
    pub backup_dir: String,
    /// Filename of the generated restore script, written to the project root.
    pub restore_script: String,
    /// The entry-point sources to patch.
    pub entry: Vec<EntryConfig>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            routes_root: "src/routes".to_string(),
            backup_dir: ".bookend/originals".to_string(),
            restore_script: "restore-entries.sh".to_string(),
            entry: Vec::new(),
        }
    }
}

/// One page-generation entry source and the anchor lines the patcher needs.
///
/// Anchors are matched as literal substrings — a structural assumption about
/// the entry's shape that is validated, never silently skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryConfig {
    /// Path relative to `patch.routes_root`.
    pub file: String,
    /// Line opening the key-enumeration function; slicing setup is injected
    /// right after it.
    pub definition_anchor: String,
    /// The final "return all keys" statement; replaced with a sliced return.
    pub return_anchor: String,
    /// Identifier of the key list returned by the entry function.
    #[serde(default = "default_list_identifier")]
    pub list_identifier: String,
}

fn default_list_identifier() -> String {
    "keys".to_string()
}

/// Build-output sanitization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SanitizeConfig {
    /// Candidate output roots, tried in order when the CLI gets no explicit
    /// root. One per hosting adapter.
    pub roots: Vec<String>,
    /// Extensions of files treated as module code (scanned for rewrites).
    pub module_extensions: Vec<String>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            roots: vec![
                ".netlify/functions-internal".to_string(),
                ".vercel/output/functions".to_string(),
            ],
            module_extensions: vec!["mjs".to_string(), "js".to_string(), "cjs".to_string()],
        }
    }
}

/// Load config from `bookend.toml` in the project root.
///
/// Returns the defaults when no file exists; rejects unknown keys and
/// validates the result otherwise.
pub fn load_config(project_root: &Path) -> Result<BookendConfig, ConfigError> {
    let path = project_root.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(BookendConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    let config: BookendConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `bookend.toml` with all keys documented.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Bookend Configuration
# =====================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Batch planning (pre-build)
# ---------------------------------------------------------------------------
[batch]
# Keys per build invocation. The orchestrator sets BUILD_PAGE_NUMBER to pick
# a batch; PAGES_PER_BUILD overrides this value per run.
pages_per_build = 2000

# ---------------------------------------------------------------------------
# Entry-point patching (staged migration path)
# ---------------------------------------------------------------------------
[patch]
# Routing tree the entry sources live under, relative to the project root.
routes_root = "src/routes"

# Where pre-patch backups are kept until restored.
backup_dir = ".bookend/originals"

# Restore script written to the project root by `bookend patch`.
restore_script = "restore-entries.sh"

# One [[patch.entry]] block per entry source. Anchors are literal substrings;
# patching fails loudly if either is missing.
#
# [[patch.entry]]
# file = "locations/page-keys.mjs"
# definition_anchor = "export async function collectPageKeys() {"
# return_anchor = "return keys;"
# list_identifier = "keys"

# ---------------------------------------------------------------------------
# Build-output sanitization (post-build)
# ---------------------------------------------------------------------------
[sanitize]
# Candidate output roots, tried in order when `bookend sanitize` gets no
# explicit root. One per hosting adapter.
roots = [".netlify/functions-internal", ".vercel/output/functions"]

# Extensions of files treated as module code. Only module code is scanned
# for reference rewriting.
module_extensions = ["mjs", "js", "cjs"]
"##
}
