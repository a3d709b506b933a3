//! # Bookend
//!
//! Deployment tooling that runs before and after an opaque static-page
//! build. The site has hundreds of thousands of generated pages and a page
//! builder that holds every materialized page in memory, so one build
//! invocation cannot produce them all; and the serverless bundlers emit
//! filenames the function runtime's module loader refuses to resolve. Both
//! problems are fixed from outside the builder — hence the name: two
//! bookends around a build step this tool never touches.
//!
//! # Architecture: Two Bookends Around the Build
//!
//! ```text
//! 1. plan / patch   full key sequence  →  bounded batch    (pre-build)
//! 2. the page build (external, opaque)
//! 3. sanitize       build output tree  →  loader-safe tree (post-build)
//! ```
//!
//! The two components never talk to each other; the filesystem is the only
//! shared state. `restore` bridges successive batch runs by putting the
//! patched entry sources back.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`batch`] | Batch selection — saturating sub-ranges of the ordered page-key sequence |
//! | [`patch`] | Entry-point patching with backup, restore, and restore-script generation |
//! | [`sanitize`] | Three-pass build-output repair: rename, propagate, content rewrite |
//! | [`naming`] | The loader's character policy: forbidden set, sanitized names |
//! | [`config`] | `bookend.toml` loading, validation, stock config generation |
//! | [`output`] | CLI report formatting — pure `format_*` functions plus `print_*` wrappers |
//!
//! # Design Decisions
//!
//! ## Explicit Batch Selection Over Source Mutation
//!
//! Batching is an explicit parameterized range function ([`batch`]), driven
//! by `BUILD_PAGE_NUMBER` / `PAGES_PER_BUILD`. The [`patch`] module still
//! injects the same selection into legacy entry sources by text anchor, but
//! that is the staged-migration path: once the entries call the range
//! selection themselves, the whole backup/restore mechanism disappears.
//!
//! ## Empty Batches Are a Signal, Not an Error
//!
//! An out-of-range batch index yields an empty selection. Orchestrators
//! probe increasing indices until the first empty batch, so they never need
//! to know the key count up front.
//!
//! ## Text Substitution Over Module Parsing
//!
//! The sanitizer rewrites references by plain-text substitution, scoped to
//! the renamed file's directory plus two global quoted-string patterns. A
//! syntax-aware rewrite would need a parser for the module format and a
//! repo-wide reference graph for marginal benefit on bundler output, which
//! keeps sibling references local. The cost — over-matching an identical
//! substring used for something unrelated — is accepted.
//!
//! ## Collisions Are Surfaced, Never Resolved
//!
//! Two filenames sanitizing to the same target would mean one silently
//! overwriting the other. The sanitizer renames neither and reports the
//! collision for the operator to resolve upstream.

pub mod batch;
pub mod config;
pub mod naming;
pub mod output;
pub mod patch;
pub mod sanitize;

#[cfg(test)]
pub(crate) mod test_helpers;
