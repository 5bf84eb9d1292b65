//! Error types for drops-curator
//!
//! Nothing here is process-fatal. Release-level errors never abort other
//! releases and group-level errors never abort other groups; all of them end
//! up in the run report next to whatever succeeded.

use crate::models::ExtendedCategory;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external provider (catalog, tracks, collections)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Caller-supplied deadline on the fetch executor elapsed
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Executor task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(String),
}

/// Which collection call a [`CurationError::Write`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Counting,
    Evicting,
    Inserting,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteStage::Counting => "counting",
            WriteStage::Evicting => "evicting",
            WriteStage::Inserting => "inserting",
        };
        f.write_str(s)
    }
}

/// Curation error taxonomy
#[derive(Debug, Error)]
pub enum CurationError {
    /// Track listing of one release could not be fetched
    #[error("Failed to fetch tracks of release {release_id}: {source}")]
    Fetch {
        release_id: String,
        source: ProviderError,
    },

    /// Group does not fit and eviction is disabled
    #[error(
        "Collection {collection_id} ({category}) is full: {current} + {requested} exceeds {ceiling}"
    )]
    CapacityExceeded {
        category: ExtendedCategory,
        collection_id: String,
        current: usize,
        requested: usize,
        ceiling: usize,
    },

    /// Insert or evict call failed mid-batch; the group is left incomplete
    #[error("Collection {collection_id} ({category}) failed while {stage}: {source}")]
    Write {
        category: ExtendedCategory,
        collection_id: String,
        stage: WriteStage,
        source: ProviderError,
    },

    /// Releases matched a category that has no destination; they stay inert
    #[error("No destination configured for {category} ({releases} release(s) not curated)")]
    Configuration {
        category: ExtendedCategory,
        releases: usize,
    },

    /// Candidate releases could not be listed; nothing else runs
    #[error("Failed to list candidate releases: {0}")]
    Listing(#[source] ProviderError),

    /// Identity cache or target store could not be persisted
    #[error("Store error: {0}")]
    Store(#[from] drops_common::Error),
}
