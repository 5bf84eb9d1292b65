//! Identity cache
//!
//! Remembers which releases (by id and by name fingerprint) and which artists
//! were already processed, and gates all downstream work on that.
//!
//! The in-memory sets mirror an [`IdentityStore`]. Writes go to the store
//! first and only then to memory, under the write lock, so there is exactly
//! one writer at a time and memory never claims more than was persisted.

use crate::models::Release;
use crate::services::fingerprint::release_fingerprint;
use crate::store::{IdentitySnapshot, IdentityStore};
use chrono::{DateTime, Duration, Utc};
use drops_common::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Counters for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub release_ids: usize,
    pub fingerprints: usize,
    pub artists: usize,
    pub artists_refreshed: Option<DateTime<Utc>>,
}

pub struct IdentityCache {
    store: Arc<dyn IdentityStore>,
    state: RwLock<IdentitySnapshot>,
}

impl IdentityCache {
    /// Load the known sets from the store
    pub async fn load(store: Arc<dyn IdentityStore>) -> Result<Self> {
        let snapshot = store.load_snapshot().await?;
        info!(
            release_ids = snapshot.release_ids.len(),
            fingerprints = snapshot.fingerprints.len(),
            artists = snapshot.artist_ids.len(),
            "Identity cache loaded"
        );
        Ok(Self {
            store,
            state: RwLock::new(snapshot),
        })
    }

    /// Releases that are neither known by id nor by fingerprint
    ///
    /// Order-preserving and read-only: calling it twice without a
    /// [`commit`](Self::commit) in between returns the same result.
    pub async fn filter_new_releases(&self, candidates: &[Release]) -> Vec<Release> {
        let state = self.state.read().await;
        candidates
            .iter()
            .filter(|release| {
                !state.release_ids.contains(&release.id)
                    && !state.fingerprints.contains(&release_fingerprint(release))
            })
            .cloned()
            .collect()
    }

    /// Mark releases as processed
    ///
    /// Idempotent. Must only be called once a release is durably in its
    /// collection (or known to be inert), so a crash before this point leads
    /// to reprocessing instead of loss. Returns how many release ids were new.
    pub async fn commit(&self, releases: &[Release]) -> Result<usize> {
        if releases.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = releases.iter().map(|r| r.id.clone()).collect();
        let fingerprints: Vec<String> = releases.iter().map(release_fingerprint).collect();

        let mut state = self.state.write().await;
        self.store.insert_releases(&ids, &fingerprints).await?;

        let mut added = 0;
        for id in ids {
            if state.release_ids.insert(id) {
                added += 1;
            }
        }
        state.fingerprints.extend(fingerprints);

        debug!(committed = releases.len(), new_ids = added, "Committed releases to identity cache");
        Ok(added)
    }

    pub async fn is_artist_known(&self, artist_id: &str) -> bool {
        self.state.read().await.artist_ids.contains(artist_id)
    }

    /// True when no artist was ever recorded (first run)
    pub async fn has_no_artists(&self) -> bool {
        self.state.read().await.artist_ids.is_empty()
    }

    /// Replace the known artist set wholesale and reset the refresh time
    pub async fn refresh_artist_set(&self, current_followed: &HashSet<String>) -> Result<()> {
        self.refresh_artist_set_at(current_followed, drops_common::time::now())
            .await
    }

    /// [`refresh_artist_set`](Self::refresh_artist_set) with an explicit clock
    pub async fn refresh_artist_set_at(
        &self,
        current_followed: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut ids: Vec<String> = current_followed.iter().cloned().collect();
        ids.sort();

        let mut state = self.state.write().await;
        self.store.replace_artists(&ids, now).await?;
        state.artist_ids = current_followed.clone();
        state.artists_refreshed = Some(now);

        info!(artists = ids.len(), "Artist cache refreshed");
        Ok(())
    }

    /// `now - last_refreshed >= ttl`; a never-refreshed cache is expired
    pub async fn artist_cache_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.state.read().await.artists_refreshed {
            Some(last) => now - last >= ttl,
            None => true,
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            release_ids: state.release_ids.len(),
            fingerprints: state.fingerprints.len(),
            artists: state.artist_ids.len(),
            artists_refreshed: state.artists_refreshed,
        }
    }
}
