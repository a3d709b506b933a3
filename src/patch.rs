//! Entry-point source patching for batched builds.
//!
//! The page-generation entry sources predate the explicit batch selector, so
//! batching is threaded into them the staged-migration way: literal text
//! injection at two anchor lines of each entry — slicing setup right after
//! the key-enumeration function opens, and a sliced return in place of the
//! final "return all keys" statement. The injected snippet reads the same
//! `BUILD_PAGE_NUMBER` / `PAGES_PER_BUILD` variables as [`crate::batch`], so
//! a patched entry and the `plan` subcommand always agree on the sub-range.
//!
//! Every patch copies the unmodified original into the backup directory
//! first. Backups are retained until explicitly restored — a dangling backup
//! is a detectable, recoverable state, not data loss. One patch cycle may be
//! in flight per checkout; concurrent batched builds sharing a backup
//! directory are unsupported.
//!
//! ## Backup naming
//!
//! The backup basename is the entry path relative to the routing root with
//! `/` flattened to `__`, suffixed `.orig`:
//!
//! ```text
//! locations/page-keys.mjs  →  locations__page-keys.mjs.orig
//! ```
//!
//! The convention is reversible without a manifest, which keeps both
//! [`restore`] and the generated shell script convention-driven. Entry
//! filenames containing a literal `__` are outside the convention.

use crate::batch::{BATCH_INDEX_VAR, BATCH_SIZE_VAR, DEFAULT_BATCH_SIZE};
use crate::config::{BookendConfig, EntryConfig, PatchConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Entry source not found: {0}")]
    EntryNotFound(PathBuf),
    #[error("Anchor `{anchor}` not found in {file}")]
    AnchorMissing { anchor: String, file: PathBuf },
}

/// Marker carried by the injected snippet. Its presence means an entry is
/// already patched, so repeated `patch` runs never stack slicing logic.
pub const PATCH_SENTINEL: &str = "/* bookend:batch */";

/// Record of one patched entry source.
#[derive(Debug, Clone)]
pub struct SourcePatch {
    /// The entry source that was mutated, relative to the project root.
    pub original_path: PathBuf,
    /// Where the unmodified original was copied, relative to the project root.
    pub backup_path: PathBuf,
    /// The text injected into the entry.
    pub injected_text: String,
}

/// Outcome of patching one configured entry.
#[derive(Debug)]
pub enum PatchOutcome {
    Patched(SourcePatch),
    /// The sentinel was already present; the file was left untouched.
    AlreadyPatched(PathBuf),
}

/// Outcome of a restore run.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Entry paths (relative to the project root) whose originals came back.
    pub restored: Vec<PathBuf>,
    /// Files in the backup directory that don't follow the naming convention.
    pub skipped: Vec<PathBuf>,
}

/// Flatten an entry path (relative to the routing root) into its backup name.
fn backup_name(entry_file: &str) -> String {
    format!("{}.orig", entry_file.replace('/', "__"))
}

/// Invert [`backup_name`]. Returns `None` for files outside the convention.
fn original_from_backup(backup_basename: &str) -> Option<String> {
    let flattened = backup_basename.strip_suffix(".orig")?;
    Some(flattened.replace("__", "/"))
}

/// The slicing setup injected right after the definition anchor.
fn threading_snippet() -> String {
    format!(
        "\n  {PATCH_SENTINEL}\n  \
         const __pageBatch = process.env.{BATCH_INDEX_VAR} == null ? null : parseInt(process.env.{BATCH_INDEX_VAR}, 10);\n  \
         const __pageBatchSize = parseInt(process.env.{BATCH_SIZE_VAR} || \"{DEFAULT_BATCH_SIZE}\", 10);"
    )
}

/// The sliced return statement substituted for the return anchor.
fn sliced_return(list_identifier: &str) -> String {
    format!(
        "return __pageBatch === null ? {id} : {id}.slice(__pageBatch * __pageBatchSize, __pageBatch * __pageBatchSize + __pageBatchSize);",
        id = list_identifier
    )
}

/// Patch one entry source, backing up the original first.
///
/// Both anchors are located before anything is written: if either is absent
/// the file is left unmodified and the missing anchor is reported as an
/// error — the anchor is a structural assumption about the entry's shape and
/// must be validated, not assumed. A file already carrying the sentinel is
/// skipped.
pub fn patch_entry(
    project_root: &Path,
    patch_config: &PatchConfig,
    entry: &EntryConfig,
) -> Result<PatchOutcome, PatchError> {
    let relative = Path::new(&patch_config.routes_root).join(&entry.file);
    let entry_path = project_root.join(&relative);
    if !entry_path.is_file() {
        return Err(PatchError::EntryNotFound(relative));
    }

    let content = fs::read_to_string(&entry_path)?;
    if content.contains(PATCH_SENTINEL) {
        return Ok(PatchOutcome::AlreadyPatched(relative));
    }

    // Locate both anchors up front; the file stays untouched unless both hit.
    let definition_at = content.find(&entry.definition_anchor).ok_or_else(|| {
        PatchError::AnchorMissing {
            anchor: entry.definition_anchor.clone(),
            file: relative.clone(),
        }
    })?;
    // The return anchor targets the *final* "return all keys" statement.
    let return_at =
        content
            .rfind(&entry.return_anchor)
            .ok_or_else(|| PatchError::AnchorMissing {
                anchor: entry.return_anchor.clone(),
                file: relative.clone(),
            })?;

    let threading = threading_snippet();
    let sliced = sliced_return(&entry.list_identifier);

    // Two edits: an insertion after the definition anchor and a replacement
    // of the return anchor. Applied back-to-front so the earlier edit's
    // offsets stay valid.
    let mut patched = content.clone();
    let insert_at = definition_at + entry.definition_anchor.len();
    if insert_at <= return_at {
        patched.replace_range(return_at..return_at + entry.return_anchor.len(), &sliced);
        patched.insert_str(insert_at, &threading);
    } else {
        patched.insert_str(insert_at, &threading);
        patched.replace_range(return_at..return_at + entry.return_anchor.len(), &sliced);
    }

    let backup_relative = Path::new(&patch_config.backup_dir).join(backup_name(&entry.file));
    let backup_path = project_root.join(&backup_relative);
    fs::create_dir_all(project_root.join(&patch_config.backup_dir))?;
    fs::copy(&entry_path, &backup_path)?;
    fs::write(&entry_path, &patched)?;

    Ok(PatchOutcome::Patched(SourcePatch {
        original_path: relative,
        backup_path: backup_relative,
        injected_text: format!("{threading}\n{sliced}"),
    }))
}

/// Patch every configured entry. The first structural failure aborts the run;
/// entries already patched by an earlier invocation are reported, not errors.
pub fn patch_all(
    project_root: &Path,
    config: &BookendConfig,
) -> Result<Vec<PatchOutcome>, PatchError> {
    let mut outcomes = Vec::new();
    for entry in &config.patch.entry {
        outcomes.push(patch_entry(project_root, &config.patch, entry)?);
    }
    Ok(outcomes)
}

/// Copy every backup under the backup directory back over its original.
///
/// Idempotent: once the originals are back in place, repeating the copy
/// changes nothing observable. A missing backup directory means there is
/// nothing to restore — an empty report, not an error. Files that don't
/// follow the backup naming convention are reported and skipped.
pub fn restore(project_root: &Path, config: &BookendConfig) -> Result<RestoreReport, PatchError> {
    let backup_dir = project_root.join(&config.patch.backup_dir);
    let mut report = RestoreReport::default();
    if !backup_dir.is_dir() {
        return Ok(report);
    }

    let mut backups: Vec<PathBuf> = fs::read_dir(&backup_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    backups.sort();

    for backup in backups {
        let basename = backup
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(entry_file) = original_from_backup(&basename) else {
            report.skipped.push(backup);
            continue;
        };
        let target_relative = Path::new(&config.patch.routes_root).join(&entry_file);
        let target = project_root.join(&target_relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&backup, &target)?;
        report.restored.push(target_relative);
    }
    Ok(report)
}

/// Write a POSIX restore script to the project root.
///
/// The script performs the same convention-driven copies as [`restore`], so
/// the build orchestrator can undo a patch cycle without this binary.
pub fn write_restore_script(project_root: &Path, config: &BookendConfig) -> io::Result<PathBuf> {
    let script = format!(
        "#!/bin/sh\n\
         # Copies every pre-patch backup back over its original under {routes}.\n\
         # Backup names flatten the original path: locations__page-keys.mjs.orig\n\
         # Generated by bookend; safe to run repeatedly.\n\
         set -eu\n\
         for backup in \"{backups}\"/*.orig; do\n\
         \x20 [ -e \"$backup\" ] || continue\n\
         \x20 name=$(basename \"$backup\" .orig)\n\
         \x20 target=$(printf '%s' \"$name\" | sed 's|__|/|g')\n\
         \x20 mkdir -p \"{routes}/$(dirname \"$target\")\"\n\
         \x20 cp \"$backup\" \"{routes}/$target\"\n\
         done\n",
        backups = config.patch.backup_dir,
        routes = config.patch.routes_root,
    );

    let path = project_root.join(&config.patch.restore_script);
    fs::write(&path, script)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{default_entry, entry_source, read_file, write_file};
    use tempfile::TempDir;

    fn project_with_entry() -> (TempDir, BookendConfig) {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "src/routes/locations/page-keys.mjs",
            entry_source(),
        );
        let mut config = BookendConfig::default();
        config.patch.entry.push(default_entry());
        (tmp, config)
    }

    #[test]
    fn backup_name_flattens_path() {
        assert_eq!(
            backup_name("locations/page-keys.mjs"),
            "locations__page-keys.mjs.orig"
        );
        assert_eq!(
            original_from_backup("locations__page-keys.mjs.orig").as_deref(),
            Some("locations/page-keys.mjs")
        );
    }

    #[test]
    fn files_outside_the_convention_do_not_decode() {
        assert_eq!(original_from_backup("README.md"), None);
    }

    #[test]
    fn patch_threads_batch_selection_through_the_entry() {
        let (tmp, config) = project_with_entry();
        let outcomes = patch_all(tmp.path(), &config).unwrap();
        assert_eq!(outcomes.len(), 1);

        let patched = read_file(tmp.path(), "src/routes/locations/page-keys.mjs");
        assert!(patched.contains(PATCH_SENTINEL));
        assert!(patched.contains("process.env.BUILD_PAGE_NUMBER"));
        assert!(patched.contains("PAGES_PER_BUILD || \"2000\""));
        assert!(patched.contains("keys.slice(__pageBatch * __pageBatchSize"));
        // The unsliced return is gone.
        assert!(!patched.contains("\n  return keys;\n"));
    }

    #[test]
    fn patch_backs_up_the_unmodified_original() {
        let (tmp, config) = project_with_entry();
        patch_all(tmp.path(), &config).unwrap();
        let backup = read_file(
            tmp.path(),
            ".bookend/originals/locations__page-keys.mjs.orig",
        );
        assert_eq!(backup, entry_source());
    }

    #[test]
    fn missing_definition_anchor_leaves_file_unmodified() {
        let (tmp, mut config) = project_with_entry();
        config.patch.entry[0].definition_anchor = "function somethingElse() {".to_string();

        let err = patch_all(tmp.path(), &config).unwrap_err();
        assert!(matches!(err, PatchError::AnchorMissing { .. }));
        assert_eq!(
            read_file(tmp.path(), "src/routes/locations/page-keys.mjs"),
            entry_source()
        );
        // No backup either — nothing was mutated.
        assert!(!tmp.path().join(".bookend/originals").exists());
    }

    #[test]
    fn missing_return_anchor_leaves_file_unmodified() {
        let (tmp, mut config) = project_with_entry();
        config.patch.entry[0].return_anchor = "return everything;".to_string();

        assert!(matches!(
            patch_all(tmp.path(), &config),
            Err(PatchError::AnchorMissing { .. })
        ));
        assert_eq!(
            read_file(tmp.path(), "src/routes/locations/page-keys.mjs"),
            entry_source()
        );
    }

    #[test]
    fn missing_entry_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut config = BookendConfig::default();
        config.patch.entry.push(default_entry());
        assert!(matches!(
            patch_all(tmp.path(), &config),
            Err(PatchError::EntryNotFound(_))
        ));
    }

    #[test]
    fn repatching_is_skipped_not_stacked() {
        let (tmp, config) = project_with_entry();
        patch_all(tmp.path(), &config).unwrap();
        let once = read_file(tmp.path(), "src/routes/locations/page-keys.mjs");

        let outcomes = patch_all(tmp.path(), &config).unwrap();
        assert!(matches!(outcomes[0], PatchOutcome::AlreadyPatched(_)));
        assert_eq!(
            read_file(tmp.path(), "src/routes/locations/page-keys.mjs"),
            once
        );
    }

    #[test]
    fn patch_then_restore_is_byte_identical() {
        let (tmp, config) = project_with_entry();
        patch_all(tmp.path(), &config).unwrap();
        let report = restore(tmp.path(), &config).unwrap();

        assert_eq!(report.restored.len(), 1);
        assert!(report.skipped.is_empty());
        assert_eq!(
            read_file(tmp.path(), "src/routes/locations/page-keys.mjs"),
            entry_source()
        );
    }

    #[test]
    fn restore_is_idempotent() {
        let (tmp, config) = project_with_entry();
        patch_all(tmp.path(), &config).unwrap();
        restore(tmp.path(), &config).unwrap();
        let report = restore(tmp.path(), &config).unwrap();

        assert_eq!(report.restored.len(), 1);
        assert_eq!(
            read_file(tmp.path(), "src/routes/locations/page-keys.mjs"),
            entry_source()
        );
    }

    #[test]
    fn restore_without_backups_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let report = restore(tmp.path(), &BookendConfig::default()).unwrap();
        assert!(report.restored.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn restore_skips_files_outside_the_convention() {
        let (tmp, config) = project_with_entry();
        patch_all(tmp.path(), &config).unwrap();
        write_file(tmp.path(), ".bookend/originals/notes.txt", "scratch");

        let report = restore(tmp.path(), &config).unwrap();
        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn restore_script_follows_the_convention() {
        let tmp = TempDir::new().unwrap();
        let config = BookendConfig::default();
        let path = write_restore_script(tmp.path(), &config).unwrap();

        let script = fs::read_to_string(&path).unwrap();
        assert!(script.starts_with("#!/bin/sh"));
        assert!(script.contains(".bookend/originals"));
        assert!(script.contains("src/routes"));
        assert!(script.contains(".orig"));
    }
}
