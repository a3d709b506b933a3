//! Sanitizer runs over realistic build-output trees.
//!
//! Builds the kind of serverless-function directory the bundler emits —
//! versioned chunk names, sibling imports, cross-directory relative paths —
//! and checks the repaired tree end to end.

use bookend::sanitize::{SanitizeOptions, sanitize};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read_file(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

/// A function bundle with a versioned entry, a versioned sibling chunk, and
/// a page module one directory up referencing the chunk relatively.
fn bundle() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "fn/chunks/entry@1.2.3.mjs",
        "import { render } from './util@1.0.mjs';\nexport default render;\n",
    );
    write_file(
        tmp.path(),
        "fn/chunks/util@1.0.mjs",
        "export function render() {}\n",
    );
    write_file(
        tmp.path(),
        "fn/pages/city.mjs",
        "import page from '../chunks/entry@1.2.3.mjs';\nimport data from \"page-data@4.1\";\nexport { page, data };\n",
    );
    tmp
}

#[test]
fn renames_rewrites_and_reports() {
    let tmp = bundle();
    let report = sanitize(tmp.path(), &SanitizeOptions::default()).unwrap();

    // Both versioned chunk files were renamed.
    assert_eq!(report.files_renamed, 2);
    assert!(tmp.path().join("fn/chunks/entry_1.2.3.mjs").is_file());
    assert!(tmp.path().join("fn/chunks/util_1.0.mjs").is_file());

    // The sibling import inside the renamed entry follows its neighbor.
    let entry = read_file(tmp.path(), "fn/chunks/entry_1.2.3.mjs");
    assert!(entry.contains("'./util_1.0.mjs'"));

    // The page one directory up is out of rename scope, but the content
    // pass catches both its relative path and its versioned specifier.
    let page = read_file(tmp.path(), "fn/pages/city.mjs");
    assert!(page.contains("'../chunks/entry_1.2.3.mjs'"));
    assert!(page.contains("\"page-data_4.1\""));

    assert!(report.failures.is_empty());
    assert!(report.collisions.is_empty());
    assert_eq!(report.files_scanned, 3);
}

#[test]
fn no_forbidden_characters_survive_in_module_code() {
    let tmp = bundle();
    sanitize(tmp.path(), &SanitizeOptions::default()).unwrap();

    for entry in WalkDir::new(tmp.path())
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy();
        assert!(!name.contains('@'), "unsanitized filename: {name}");
        if name.ends_with(".mjs") {
            let content = fs::read_to_string(entry.path()).unwrap();
            assert!(
                !content.contains('@'),
                "unsanitized reference in {}: {content}",
                entry.path().display()
            );
        }
    }
}

#[test]
fn second_run_finds_nothing_to_do() {
    let tmp = bundle();
    sanitize(tmp.path(), &SanitizeOptions::default()).unwrap();

    let second = sanitize(tmp.path(), &SanitizeOptions::default()).unwrap();
    assert_eq!(second.files_renamed, 0);
    assert_eq!(second.files_modified, 0);
    assert!(second.renames.is_empty());
    assert!(second.modified.is_empty());
    // The tree is still scanned; there is just nothing left to rewrite.
    assert_eq!(second.files_scanned, 3);
}

#[test]
fn untouched_files_keep_their_modification_time() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "fn/clean.mjs", "export const ok = true;\n");
    let before = fs::metadata(tmp.path().join("fn/clean.mjs"))
        .unwrap()
        .modified()
        .unwrap();

    sanitize(tmp.path(), &SanitizeOptions::default()).unwrap();

    let after = fs::metadata(tmp.path().join("fn/clean.mjs"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn collisions_block_renames_but_not_the_rest_of_the_run() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "fn/a/dupe@1.mjs", "export const a = 1;\n");
    write_file(tmp.path(), "fn/a/dupe_1.mjs", "export const b = 2;\n");
    write_file(tmp.path(), "fn/b/util@2.mjs", "export const c = 3;\n");

    let report = sanitize(tmp.path(), &SanitizeOptions::default()).unwrap();

    // The collision in fn/a is surfaced and left alone.
    assert_eq!(report.collisions.len(), 1);
    assert!(tmp.path().join("fn/a/dupe@1.mjs").is_file());
    assert_eq!(read_file(tmp.path(), "fn/a/dupe_1.mjs"), "export const b = 2;\n");

    // The unrelated rename in fn/b still happens.
    assert_eq!(report.files_renamed, 1);
    assert!(tmp.path().join("fn/b/util_2.mjs").is_file());
}

#[test]
fn report_serializes_for_machine_consumers() {
    let tmp = bundle();
    let report = sanitize(tmp.path(), &SanitizeOptions::default()).unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["files_renamed"], 2);
    assert!(value["renames"].as_array().unwrap().len() == 2);
    assert!(value["failures"].as_array().unwrap().is_empty());
}
