//! Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use drops_curator::error::ProviderError;
use drops_curator::models::{
    BaseCategory, CollectionTarget, CollectionTargets, ExtendedCategory, Release, Track,
};
use drops_curator::providers::{CollectionProvider, ReleaseProvider, TrackProvider};
use drops_curator::store::{IdentitySnapshot, IdentityStore, TargetStore};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

/// One call received by [`FakeCollections`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Count,
    Insert { len: usize, at: Instant },
    Evict { offset: usize, count: usize },
}

/// In-memory collections; index 0 is the top
#[derive(Default)]
pub struct FakeCollections {
    items: Mutex<HashMap<String, Vec<String>>>,
    calls: Mutex<Vec<Call>>,
    fail_inserts: Mutex<HashSet<String>>,
    fail_evictions: Mutex<HashSet<String>>,
    fail_counts: Mutex<HashSet<String>>,
}

impl FakeCollections {
    pub fn with_items(collection_id: &str, count: usize) -> Self {
        let fake = Self::default();
        let items = (0..count).map(|i| format!("old-{}", i)).collect();
        fake.items.lock().unwrap().insert(collection_id.to_string(), items);
        fake
    }

    pub fn fail_inserts_into(&self, collection_id: &str) {
        self.fail_inserts.lock().unwrap().insert(collection_id.to_string());
    }

    pub fn fail_evictions_into(&self, collection_id: &str) {
        self.fail_evictions.lock().unwrap().insert(collection_id.to_string());
    }

    pub fn fail_count_for(&self, collection_id: &str) {
        self.fail_counts.lock().unwrap().insert(collection_id.to_string());
    }

    pub fn items(&self, collection_id: &str) -> Vec<String> {
        self.items
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn insert_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Insert { len, .. } => Some(len),
                _ => None,
            })
            .collect()
    }

    pub fn insert_times(&self) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Insert { at, .. } => Some(at),
                _ => None,
            })
            .collect()
    }

    pub fn evictions(&self) -> Vec<(usize, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Evict { offset, count } => Some((offset, count)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl CollectionProvider for FakeCollections {
    async fn count(&self, collection_id: &str) -> Result<usize, ProviderError> {
        self.calls.lock().unwrap().push(Call::Count);
        if self.fail_counts.lock().unwrap().contains(collection_id) {
            return Err(ProviderError::RateLimited);
        }
        Ok(self.items(collection_id).len())
    }

    async fn insert_at_top(
        &self,
        collection_id: &str,
        track_ids: &[String],
        chunk_limit: usize,
    ) -> Result<(), ProviderError> {
        if track_ids.len() > chunk_limit {
            return Err(ProviderError::Api(400, "too many items".to_string()));
        }
        if self.fail_inserts.lock().unwrap().contains(collection_id) {
            return Err(ProviderError::Network("connection reset".to_string()));
        }
        self.calls.lock().unwrap().push(Call::Insert {
            len: track_ids.len(),
            at: Instant::now(),
        });
        let mut items = self.items.lock().unwrap();
        let collection = items.entry(collection_id.to_string()).or_default();
        collection.splice(0..0, track_ids.iter().cloned());
        Ok(())
    }

    async fn evict_from_bottom(
        &self,
        collection_id: &str,
        offset: usize,
        count: usize,
    ) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(Call::Evict { offset, count });
        if self.fail_evictions.lock().unwrap().contains(collection_id) {
            return Err(ProviderError::Api(503, "service unavailable".to_string()));
        }
        let mut items = self.items.lock().unwrap();
        let collection = items.entry(collection_id.to_string()).or_default();
        if offset + count != collection.len() {
            return Err(ProviderError::Api(400, "not the bottom of the collection".to_string()));
        }
        collection.truncate(offset);
        Ok(())
    }
}

/// Track listings keyed by release id, with injectable failures
#[derive(Default)]
pub struct ScriptedTracks {
    tracks: Mutex<HashMap<String, Vec<Track>>>,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedTracks {
    pub fn set(&self, release_id: &str, tracks: Vec<Track>) {
        self.tracks.lock().unwrap().insert(release_id.to_string(), tracks);
    }

    pub fn fail(&self, release_id: &str) {
        self.failing.lock().unwrap().insert(release_id.to_string());
    }

    pub fn heal(&self, release_id: &str) {
        self.failing.lock().unwrap().remove(release_id);
    }
}

#[async_trait]
impl TrackProvider for ScriptedTracks {
    async fn get_tracks(&self, release_id: &str) -> Result<Vec<Track>, ProviderError> {
        if self.failing.lock().unwrap().contains(release_id) {
            return Err(ProviderError::Network(format!("{} unavailable", release_id)));
        }
        self.tracks
            .lock()
            .unwrap()
            .get(release_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(release_id.to_string()))
    }
}

/// Returns the same candidate list for any artists
#[derive(Default)]
pub struct StaticReleases {
    releases: Mutex<Vec<Release>>,
}

impl StaticReleases {
    pub fn set(&self, releases: Vec<Release>) {
        *self.releases.lock().unwrap() = releases;
    }
}

#[async_trait]
impl ReleaseProvider for StaticReleases {
    async fn list_candidate_releases(&self, _: &[String]) -> Result<Vec<Release>, ProviderError> {
        Ok(self.releases.lock().unwrap().clone())
    }
}

/// Identity store kept in memory
#[derive(Default)]
pub struct MemoryIdentityStore {
    state: Mutex<IdentitySnapshot>,
    fail_inserts: AtomicBool,
}

impl MemoryIdentityStore {
    pub fn with_artists(artists: &[&str], refreshed: DateTime<Utc>) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            state.artist_ids = artists.iter().map(|a| a.to_string()).collect();
            state.artists_refreshed = Some(refreshed);
        }
        store
    }

    pub fn snapshot(&self) -> IdentitySnapshot {
        self.state.lock().unwrap().clone()
    }

    /// Make release inserts fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load_snapshot(&self) -> drops_common::Result<IdentitySnapshot> {
        Ok(self.snapshot())
    }

    async fn insert_releases(
        &self,
        release_ids: &[String],
        fingerprints: &[String],
    ) -> drops_common::Result<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(drops_common::Error::Internal("disk full".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.release_ids.extend(release_ids.iter().cloned());
        state.fingerprints.extend(fingerprints.iter().cloned());
        Ok(())
    }

    async fn replace_artists(
        &self,
        artist_ids: &[String],
        refreshed_at: DateTime<Utc>,
    ) -> drops_common::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.artist_ids = artist_ids.iter().cloned().collect();
        state.artists_refreshed = Some(refreshed_at);
        Ok(())
    }
}

/// Target store kept in memory
#[derive(Default)]
pub struct MemoryTargetStore {
    targets: Mutex<CollectionTargets>,
    fail_loads: AtomicBool,
}

impl MemoryTargetStore {
    pub fn with(targets: &[(ExtendedCategory, &str)]) -> Self {
        let store = Self::default();
        {
            let mut map = store.targets.lock().unwrap();
            for (category, id) in targets {
                map.insert(*category, CollectionTarget::new(*category, *id));
            }
        }
        store
    }

    pub fn last_update(&self, category: ExtendedCategory) -> Option<DateTime<Utc>> {
        self.targets
            .lock()
            .unwrap()
            .get(&category)
            .and_then(|t| t.last_update)
    }

    pub fn snapshot(&self) -> CollectionTargets {
        self.targets.lock().unwrap().clone()
    }

    /// Make `load_targets` fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.fail_loads.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn load_targets(&self) -> drops_common::Result<CollectionTargets> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(drops_common::Error::Internal("database is locked".to_string()));
        }
        Ok(self.snapshot())
    }

    async fn mark_updated(
        &self,
        category: ExtendedCategory,
        at: DateTime<Utc>,
    ) -> drops_common::Result<()> {
        if let Some(target) = self.targets.lock().unwrap().get_mut(&category) {
            target.last_update = Some(at);
        }
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Release by one artist without tracks
pub fn release(id: &str, title: &str, base: BaseCategory, released: NaiveDate) -> Release {
    Release::new(id, title, base, ["artist-1"], released).unwrap()
}

/// `count` tracks of `secs` seconds each, ids prefixed by `prefix`
pub fn tracks(prefix: &str, count: usize, secs: u64) -> Vec<Track> {
    (0..count)
        .map(|i| Track::new(format!("{}-t{}", prefix, i), format!("Track {}", i + 1), secs * 1000))
        .collect()
}
