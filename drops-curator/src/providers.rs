//! External collaborators consumed by the engine
//!
//! The catalog client, track listing client and collection writer live
//! outside this crate. The engine only sees these traits, so any backend
//! (or a test fake) can be plugged in.

use crate::error::ProviderError;
use crate::models::{Release, Track};
use async_trait::async_trait;

/// Lists candidate releases of tracked artists (without tracks)
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    async fn list_candidate_releases(
        &self,
        artist_ids: &[String],
    ) -> Result<Vec<Release>, ProviderError>;
}

/// Retrieves the full track listing of one release
#[async_trait]
pub trait TrackProvider: Send + Sync {
    async fn get_tracks(&self, release_id: &str) -> Result<Vec<Track>, ProviderError>;
}

/// Reads and writes a capacity-limited, ordered collection
///
/// Position 0 is the top of the collection; the bottom holds the oldest items.
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// Current number of items in the collection
    async fn count(&self, collection_id: &str) -> Result<usize, ProviderError>;

    /// Insert `track_ids` at position 0, keeping their relative order
    ///
    /// Callers never pass more than `chunk_limit` ids.
    async fn insert_at_top(
        &self,
        collection_id: &str,
        track_ids: &[String],
        chunk_limit: usize,
    ) -> Result<(), ProviderError>;

    /// Remove `count` items starting at position `offset`
    async fn evict_from_bottom(
        &self,
        collection_id: &str,
        offset: usize,
        count: usize,
    ) -> Result<(), ProviderError>;
}
