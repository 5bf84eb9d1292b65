//! Durable state contracts
//!
//! The identity cache and the per-category update timestamps need a durable
//! key/value home. SQLite implementations live in [`crate::db`].

use crate::models::{CollectionTargets, ExtendedCategory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drops_common::Result;
use std::collections::HashSet;

/// Everything the identity cache knows, as loaded at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySnapshot {
    pub release_ids: HashSet<String>,
    pub fingerprints: HashSet<String>,
    pub artist_ids: HashSet<String>,
    /// When the artist set was last replaced; `None` if never
    pub artists_refreshed: Option<DateTime<Utc>>,
}

/// Durable storage behind the identity cache
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn load_snapshot(&self) -> Result<IdentitySnapshot>;

    /// Add release ids and fingerprints; already-known values are ignored
    async fn insert_releases(&self, release_ids: &[String], fingerprints: &[String]) -> Result<()>;

    /// Replace the whole artist set and stamp the refresh time
    async fn replace_artists(&self, artist_ids: &[String], refreshed_at: DateTime<Utc>)
        -> Result<()>;
}

/// Durable storage for collection targets
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn load_targets(&self) -> Result<CollectionTargets>;

    /// Record a successful update of the category's collection
    async fn mark_updated(&self, category: ExtendedCategory, at: DateTime<Utc>) -> Result<()>;
}
