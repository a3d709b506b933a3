//! Module-path naming rules for build artifacts.
//!
//! The serverless bundlers emit files named after the packages they came
//! from, separator and all (`util@1.0.2.mjs`). The function runtime's module
//! loader cannot resolve `@` in a plain relative specifier, so every emitted
//! name has to be reduced to the loader-safe character set before deploy.
//! This module is the single place that character policy lives; the rename
//! pass and both rewrite passes all go through it.

/// The character the module loader rejects in relative specifiers.
pub const FORBIDDEN_CHAR: char = '@';

/// Characters that survive sanitization unchanged. Everything else becomes
/// an underscore.
pub fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')
}

/// Whether a path segment needs renaming at all.
pub fn needs_sanitizing(segment: &str) -> bool {
    segment.contains(FORBIDDEN_CHAR)
}

/// Replace every disallowed character in `segment` with `_`.
///
/// - `"util@1.0.2.mjs"` → `"util_1.0.2.mjs"`
/// - `"@scope/pkg@2.mjs"` → `"_scope/pkg_2.mjs"`
/// - already-clean names come back unchanged
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_separator_becomes_underscore() {
        assert_eq!(sanitize_segment("util@1.0.2.mjs"), "util_1.0.2.mjs");
    }

    #[test]
    fn scoped_package_name() {
        assert_eq!(sanitize_segment("@scope/pkg@2.mjs"), "_scope/pkg_2.mjs");
    }

    #[test]
    fn clean_name_unchanged() {
        assert_eq!(sanitize_segment("entry-point_v2.mjs"), "entry-point_v2.mjs");
    }

    #[test]
    fn spaces_and_punctuation_replaced() {
        assert_eq!(sanitize_segment("a b:c@d.mjs"), "a_b_c_d.mjs");
    }

    #[test]
    fn slashes_and_dots_survive() {
        assert_eq!(sanitize_segment("./lib/util@1.mjs"), "./lib/util_1.mjs");
    }

    #[test]
    fn needs_sanitizing_only_for_forbidden_char() {
        assert!(needs_sanitizing("pkg@1.mjs"));
        // Other odd characters are cleaned when a rename happens, but do not
        // trigger one on their own.
        assert!(!needs_sanitizing("plain name.mjs"));
        assert!(!needs_sanitizing("pkg_1.mjs"));
    }
}
