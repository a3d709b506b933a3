//! Build-artifact sanitization.
//!
//! Runs after the page build, over the serverless-function output tree of
//! the hosting adapter. The bundler emits filenames and module references
//! carrying the version separator (`util@1.0.2.mjs`), which the function
//! runtime's module loader cannot resolve in a relative specifier. Three
//! passes repair the tree in strict order, each consuming the filesystem
//! state the previous one left:
//!
//! 1. **Filename pass** — rename every file whose name carries the
//!    forbidden character, detecting collisions instead of overwriting.
//! 2. **Reference-propagation pass** — for each applied rename, rewrite the
//!    old basename wherever it appears in module code *in the same
//!    directory*. Directory scope is a deliberate limitation: a repo-wide
//!    reference graph would need a parser for the module format, and the
//!    bundler keeps sibling references local anyway.
//! 3. **Content-pattern pass** — a global sweep rewriting quoted
//!    `name@version` import specifiers and quoted relative paths that still
//!    carry the forbidden character.
//!
//! Both rewrite passes are plain-text substitution. Over-matching an
//! identical substring used for something unrelated is an accepted risk.
//!
//! No per-file problem is fatal: a file that can't be read, renamed, or
//! written is recorded in the report and the pass moves on. The only fatal
//! condition is a missing output root. Files are rewritten only when their
//! content actually changed, so untouched files keep their modification
//! state.

use crate::config::SanitizeConfig;
use crate::naming;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SanitizeError {
    #[error("Output root not found: {0}")]
    MissingRoot(PathBuf),
    #[error("No output root found; checked {0:?}")]
    NoUsableRoot(Vec<PathBuf>),
}

/// What the sanitizer treats as module code.
#[derive(Debug, Clone)]
pub struct SanitizeOptions {
    /// Extensions of files scanned for reference rewriting.
    pub module_extensions: Vec<String>,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self::from(&SanitizeConfig::default())
    }
}

impl From<&SanitizeConfig> for SanitizeOptions {
    fn from(config: &SanitizeConfig) -> Self {
        Self {
            module_extensions: config.module_extensions.clone(),
        }
    }
}

/// One applied rename.
#[derive(Debug, Clone, Serialize)]
pub struct RenameRecord {
    /// Directory of the renamed file, relative to the output root.
    pub directory: PathBuf,
    pub old_basename: String,
    pub new_basename: String,
}

/// Two or more names sanitizing to the same target, or a target that already
/// exists. Nothing in the colliding group is renamed — silent overwrite is a
/// data-loss risk the operator resolves upstream.
#[derive(Debug, Clone, Serialize)]
pub struct Collision {
    pub directory: PathBuf,
    pub target: String,
    pub sources: Vec<String>,
}

/// A single file the sanitizer failed to read, rename, or write. Recorded
/// and skipped; never aborts the pass.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub action: &'static str,
    pub cause: String,
}

/// Summary of one sanitizer run over an output root.
#[derive(Debug, Default, Serialize)]
pub struct SanitizeReport {
    /// Module-code files examined by the global content-pattern pass.
    pub files_scanned: usize,
    pub files_renamed: usize,
    pub files_modified: usize,
    pub renames: Vec<RenameRecord>,
    /// Files whose content was rewritten, relative to the output root.
    pub modified: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
    pub collisions: Vec<Collision>,
}

/// Quoted `name@version` specifier following an import-style keyword.
static IMPORT_SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\b(?:import|from|require)\s*\(?\s*)(["'])([^"'\s]+)@([^"'\s]+)(["'])"#).unwrap()
});

/// Quoted relative path still carrying the forbidden character.
static RELATIVE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(["'])(\.\.?/[^"']*@[^"']*)(["'])"#).unwrap());

/// Apply both content patterns to one module source.
///
/// Substitutions run in sequence on the same buffer; the result equals the
/// input when nothing matched. Pure — callers decide whether to write.
pub fn rewrite_module_source(source: &str) -> String {
    let after_specs = IMPORT_SPEC_RE.replace_all(source, |caps: &regex::Captures| {
        let (open, close) = (&caps[2], &caps[5]);
        if open != close {
            // Quote mismatch means we matched across two strings; leave it.
            return caps[0].to_string();
        }
        format!(
            "{}{}{}_{}{}",
            &caps[1],
            open,
            caps[3].replace(naming::FORBIDDEN_CHAR, "_"),
            &caps[4],
            close
        )
    });

    RELATIVE_PATH_RE
        .replace_all(&after_specs, |caps: &regex::Captures| {
            let (open, close) = (&caps[1], &caps[3]);
            if open != close {
                return caps[0].to_string();
            }
            format!("{}{}{}", open, naming::sanitize_segment(&caps[2]), close)
        })
        .into_owned()
}

/// Sanitize the build output under `root`.
///
/// Fatal only when `root` is not a directory; everything else degrades to
/// report entries.
pub fn sanitize(root: &Path, options: &SanitizeOptions) -> Result<SanitizeReport, SanitizeError> {
    if !root.is_dir() {
        return Err(SanitizeError::MissingRoot(root.to_path_buf()));
    }

    let mut report = SanitizeReport::default();
    let renames = rename_pass(root, &mut report);
    let mut modified = BTreeSet::new();
    propagate_pass(root, options, &renames, &mut modified, &mut report);
    content_pass(root, options, &mut modified, &mut report);

    report.files_renamed = report.renames.len();
    report.modified = modified.into_iter().collect();
    report.files_modified = report.modified.len();
    Ok(report)
}

/// Pick the output root: an explicit path wins, otherwise the first
/// configured root that exists under the project root.
pub fn resolve_root(
    project_root: &Path,
    config: &SanitizeConfig,
    explicit: Option<PathBuf>,
) -> Result<PathBuf, SanitizeError> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    let candidates: Vec<PathBuf> = config
        .roots
        .iter()
        .map(|r| project_root.join(r))
        .collect();
    candidates
        .iter()
        .find(|c| c.is_dir())
        .cloned()
        .ok_or(SanitizeError::NoUsableRoot(candidates))
}

fn is_module_code(path: &Path, options: &SanitizeOptions) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            options
                .module_extensions
                .iter()
                .any(|m| ext.eq_ignore_ascii_case(m))
        })
        .unwrap_or(false)
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Pass 1: rename files whose basename carries the forbidden character.
///
/// Candidates are grouped per directory so collisions are detected before
/// any rename in the group is applied. Returns the renames actually made.
fn rename_pass(root: &Path, report: &mut SanitizeReport) -> Vec<RenameRecord> {
    let mut by_directory: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let basename = entry.file_name().to_string_lossy().to_string();
        if naming::needs_sanitizing(&basename) {
            let directory = entry
                .path()
                .parent()
                .unwrap_or(root)
                .to_path_buf();
            by_directory.entry(directory).or_default().push(basename);
        }
    }

    let mut applied = Vec::new();
    for (directory, basenames) in &by_directory {
        let mut by_target: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for old in basenames {
            by_target
                .entry(naming::sanitize_segment(old))
                .or_default()
                .push(old.clone());
        }

        for (target, sources) in by_target {
            if sources.len() > 1 || directory.join(&target).exists() {
                report.collisions.push(Collision {
                    directory: relative_to(directory, root),
                    target,
                    sources,
                });
                continue;
            }
            let old = &sources[0];
            let from = directory.join(old);
            match fs::rename(&from, directory.join(&target)) {
                Ok(()) => {
                    let record = RenameRecord {
                        directory: relative_to(directory, root),
                        old_basename: old.clone(),
                        new_basename: target,
                    };
                    report.renames.push(record.clone());
                    applied.push(record);
                }
                Err(e) => report.failures.push(ItemFailure {
                    path: relative_to(&from, root),
                    action: "rename",
                    cause: e.to_string(),
                }),
            }
        }
    }
    applied
}

/// Pass 2: propagate each rename to module code in the same directory.
///
/// Every module-code file in a directory with renames is read once and all
/// of that directory's old basenames substituted.
fn propagate_pass(
    root: &Path,
    options: &SanitizeOptions,
    renames: &[RenameRecord],
    modified: &mut BTreeSet<PathBuf>,
    report: &mut SanitizeReport,
) {
    let mut by_directory: BTreeMap<&Path, Vec<&RenameRecord>> = BTreeMap::new();
    for record in renames {
        by_directory
            .entry(record.directory.as_path())
            .or_default()
            .push(record);
    }

    for (directory, records) in by_directory {
        let absolute = root.join(directory);
        let mut siblings: Vec<PathBuf> = match fs::read_dir(&absolute) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_module_code(p, options))
                .collect(),
            Err(e) => {
                report.failures.push(ItemFailure {
                    path: directory.to_path_buf(),
                    action: "read",
                    cause: e.to_string(),
                });
                continue;
            }
        };
        siblings.sort();

        for sibling in siblings {
            let content = match fs::read_to_string(&sibling) {
                Ok(c) => c,
                Err(e) => {
                    report.failures.push(ItemFailure {
                        path: relative_to(&sibling, root),
                        action: "read",
                        cause: e.to_string(),
                    });
                    continue;
                }
            };
            let mut rewritten = content.clone();
            for record in &records {
                rewritten = rewritten.replace(&record.old_basename, &record.new_basename);
            }
            if rewritten == content {
                continue;
            }
            match fs::write(&sibling, rewritten) {
                Ok(()) => {
                    modified.insert(relative_to(&sibling, root));
                }
                Err(e) => report.failures.push(ItemFailure {
                    path: relative_to(&sibling, root),
                    action: "write",
                    cause: e.to_string(),
                }),
            }
        }
    }
}

/// Pass 3: global content-pattern sweep over every module-code file.
fn content_pass(
    root: &Path,
    options: &SanitizeOptions,
    modified: &mut BTreeSet<PathBuf>,
    report: &mut SanitizeReport,
) {
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_module_code(e.path(), options))
    {
        report.files_scanned += 1;
        let content = match fs::read_to_string(entry.path()) {
            Ok(c) => c,
            Err(e) => {
                report.failures.push(ItemFailure {
                    path: relative_to(entry.path(), root),
                    action: "read",
                    cause: e.to_string(),
                });
                continue;
            }
        };
        let rewritten = rewrite_module_source(&content);
        if rewritten == content {
            continue;
        }
        match fs::write(entry.path(), rewritten) {
            Ok(()) => {
                modified.insert(relative_to(entry.path(), root));
            }
            Err(e) => report.failures.push(ItemFailure {
                path: relative_to(entry.path(), root),
                action: "write",
                cause: e.to_string(),
            }),
        }
    }
}
