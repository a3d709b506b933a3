//! CLI output formatting for all bookend operations.
//!
//! Every operation's report follows the same two-level pattern:
//!
//! 1. **Header line**: section name or positional index + identity
//! 2. **Context lines**: indented `Directory:`, `Backup:`, cause, etc.
//!
//! Sections with nothing to say are omitted entirely; the trailing summary
//! line always prints, because "no work needed" is a result too.
//!
//! ```text
//! Renames
//! 001 util@1.0.mjs -> util_1.0.mjs
//!     Directory: locations
//! Modified
//! 001 locations/index.mjs
//! Scanned 42 files: 1 renamed, 1 rewritten
//! ```
//!
//! Each operation has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::batch::BatchPlan;
use crate::patch::{PatchOutcome, RestoreReport};
use crate::sanitize::SanitizeReport;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Directories relative to a root display as `.` when empty.
fn display_dir(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        ".".to_string()
    } else {
        dir.display().to_string()
    }
}

fn count_noun(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

// ============================================================================
// Plan output
// ============================================================================

/// Format the batch plan header printed before the selected keys.
pub fn format_plan_output(plan: &BatchPlan, batch_size: usize) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("Plan".to_string());
    lines.push(format!("{}Keys: {}", indent(1), plan.total));
    if plan.batched {
        lines.push(format!(
            "{}Batch: [{}, {}) at size {}",
            indent(1),
            plan.start,
            plan.end,
            batch_size
        ));
    } else {
        lines.push(format!("{}Batch: none (full sequence)", indent(1)));
    }
    lines.push(format!(
        "{}Selected: {}",
        indent(1),
        count_noun(plan.len(), "key", "keys")
    ));
    lines
}

pub fn print_plan_output(plan: &BatchPlan, batch_size: usize) {
    for line in format_plan_output(plan, batch_size) {
        println!("{line}");
    }
}

// ============================================================================
// Patch / restore output
// ============================================================================

/// Format patch outcomes plus the restore-script location.
pub fn format_patch_output(outcomes: &[PatchOutcome], restore_script: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("Entries".to_string());
    for (i, outcome) in outcomes.iter().enumerate() {
        match outcome {
            PatchOutcome::Patched(patch) => {
                lines.push(format!(
                    "{} {}",
                    format_index(i + 1),
                    patch.original_path.display()
                ));
                lines.push(format!(
                    "{}Backup: {}",
                    indent(1),
                    patch.backup_path.display()
                ));
            }
            PatchOutcome::AlreadyPatched(path) => {
                lines.push(format!(
                    "{} {} (already patched)",
                    format_index(i + 1),
                    path.display()
                ));
            }
        }
    }
    let patched = outcomes
        .iter()
        .filter(|o| matches!(o, PatchOutcome::Patched(_)))
        .count();
    lines.push(format!(
        "Patched {}, restore script at {}",
        count_noun(patched, "entry", "entries"),
        restore_script.display()
    ));
    lines
}

pub fn print_patch_output(outcomes: &[PatchOutcome], restore_script: &Path) {
    for line in format_patch_output(outcomes, restore_script) {
        println!("{line}");
    }
}

/// Format a restore run.
pub fn format_restore_output(report: &RestoreReport) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.restored.is_empty() {
        lines.push("Restored".to_string());
        for (i, path) in report.restored.iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), path.display()));
        }
    }
    if !report.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for (i, path) in report.skipped.iter().enumerate() {
            lines.push(format!(
                "{} {} (not a backup)",
                format_index(i + 1),
                path.display()
            ));
        }
    }
    lines.push(format!(
        "Restored {}, skipped {}",
        count_noun(report.restored.len(), "entry", "entries"),
        count_noun(report.skipped.len(), "file", "files")
    ));
    lines
}

pub fn print_restore_output(report: &RestoreReport) {
    for line in format_restore_output(report) {
        println!("{line}");
    }
}

// ============================================================================
// Sanitize output
// ============================================================================

/// Format a sanitizer report: every rename, every modified file, every
/// failure with its cause, collisions, then the summary line.
pub fn format_sanitize_report(report: &SanitizeReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.renames.is_empty() {
        lines.push("Renames".to_string());
        for (i, rename) in report.renames.iter().enumerate() {
            lines.push(format!(
                "{} {} -> {}",
                format_index(i + 1),
                rename.old_basename,
                rename.new_basename
            ));
            lines.push(format!(
                "{}Directory: {}",
                indent(1),
                display_dir(&rename.directory)
            ));
        }
    }

    if !report.modified.is_empty() {
        lines.push("Modified".to_string());
        for (i, path) in report.modified.iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), path.display()));
        }
    }

    if !report.collisions.is_empty() {
        lines.push("Collisions".to_string());
        for (i, collision) in report.collisions.iter().enumerate() {
            lines.push(format!(
                "{} {} <- {}",
                format_index(i + 1),
                collision.target,
                collision.sources.join(", ")
            ));
            lines.push(format!(
                "{}Directory: {} (left as-is, resolve upstream)",
                indent(1),
                display_dir(&collision.directory)
            ));
        }
    }

    if !report.failures.is_empty() {
        lines.push("Failures".to_string());
        for (i, failure) in report.failures.iter().enumerate() {
            lines.push(format!(
                "{} {} ({})",
                format_index(i + 1),
                failure.path.display(),
                failure.action
            ));
            lines.push(format!("{}Cause: {}", indent(1), failure.cause));
        }
    }

    lines.push(format!(
        "Scanned {}: {} renamed, {} rewritten",
        count_noun(report.files_scanned, "file", "files"),
        report.files_renamed,
        report.files_modified
    ));
    lines
}

pub fn print_sanitize_report(report: &SanitizeReport) {
    for line in format_sanitize_report(report) {
        println!("{line}");
    }
}
