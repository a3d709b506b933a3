//! Batch planning for chunked page generation.
//!
//! The site has far more pages than a single build invocation can hold in
//! memory, so the orchestrator runs the page build several times, each
//! materializing one bounded-size batch of the full key sequence. The batch
//! is picked by index: batch `i` covers `[i * size, i * size + size)` of the
//! ordered key list, clamped to its bounds.
//!
//! Selection is intentionally saturating rather than validating: an index
//! past the end yields an empty batch, not an error. The orchestrator probes
//! increasing indices and treats the first empty batch as the termination
//! signal, so it never has to know the key count up front.
//!
//! The key order must be stable across repeated enumerations within one
//! build — indices are computed against a fixed order, and the enumeration
//! callback is the one that fixes it.

use serde::Serialize;
use std::ops::Range;

/// Environment variable holding the batch index. Unset means no batching.
pub const BATCH_INDEX_VAR: &str = "BUILD_PAGE_NUMBER";

/// Environment variable holding the batch size.
pub const BATCH_SIZE_VAR: &str = "PAGES_PER_BUILD";

/// Batch size used when [`BATCH_SIZE_VAR`] is unset.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Which sub-range of the page-key sequence this invocation materializes.
///
/// `index: None` is the non-batched default: the full sequence, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSelector {
    /// Zero-based batch index; `None` disables batching entirely.
    pub index: Option<usize>,
    /// Keys per batch. Must be positive; config validation enforces this.
    pub size: usize,
}

impl BatchSelector {
    /// The identity selector: every key, in order.
    pub fn unbatched() -> Self {
        Self {
            index: None,
            size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Selector for one concrete batch.
    pub fn batch(index: usize, size: usize) -> Self {
        Self {
            index: Some(index),
            size,
        }
    }

    /// Read the selector from the process environment.
    ///
    /// Unset or non-integer [`BATCH_INDEX_VAR`] means no batching; a
    /// non-integer [`BATCH_SIZE_VAR`] falls back to [`DEFAULT_BATCH_SIZE`].
    /// The CLI layers stricter parsing on top via clap; this is the forgiving
    /// path for embedding into an enumeration callback.
    pub fn from_env() -> Self {
        let index = std::env::var(BATCH_INDEX_VAR)
            .ok()
            .and_then(|v| v.parse().ok());
        let size = std::env::var(BATCH_SIZE_VAR)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_BATCH_SIZE);
        Self { index, size }
    }

    /// The effective index range for a sequence of `total` keys.
    ///
    /// Saturating on both ends: out-of-range indices produce an empty range
    /// at `total`, and `index * size` cannot overflow.
    pub fn range(&self, total: usize) -> Range<usize> {
        match self.index {
            None => 0..total,
            Some(index) => {
                let start = index.saturating_mul(self.size).min(total);
                let end = start.saturating_add(self.size).min(total);
                start..end
            }
        }
    }

    /// Select this invocation's keys from the full ordered sequence.
    ///
    /// Identity when unbatched; otherwise the clamped sub-slice. An empty
    /// result is a valid outcome, not an error.
    pub fn select<'a, T>(&self, keys: &'a [T]) -> &'a [T] {
        &keys[self.range(keys.len())]
    }

    /// Describe the selection against a sequence of `total` keys.
    pub fn plan(&self, total: usize) -> BatchPlan {
        let range = self.range(total);
        BatchPlan {
            start: range.start,
            end: range.end,
            total,
            batched: self.index.is_some(),
        }
    }
}

/// Resolved selection bounds, for reporting and the `--json` surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    pub start: usize,
    pub end: usize,
    pub total: usize,
    pub batched: bool,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
