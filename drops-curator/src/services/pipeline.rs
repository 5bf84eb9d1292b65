//! Discovery pipeline
//!
//! One run takes the currently followed artists from candidate listing all
//! the way to the identity cache commit.
//!
//! **Algorithm:**
//! 1. List candidate releases of the followed artists
//! 2. Drop releases older than the lookback window
//! 3. Drop duplicates within the batch (same id or same fingerprint)
//! 4. Seed the back catalog of artists not seen before (first run: everyone)
//!    straight into the identity cache, without curating it
//! 5. Keep releases unknown to the identity cache
//! 6. Fetch track listings (failed releases are left for the next run)
//! 7. Classify and apply the blacklist
//! 8. Curate into the destination collections and commit
//! 9. Refresh the artist cache on the executor when it expired or new
//!    artists appeared, and wait for it

use crate::classifier::{Blacklist, ClassificationEngine};
use crate::config::CuratorSettings;
use crate::error::CurationError;
use crate::models::{ExtendedCategory, Release};
use crate::providers::{CollectionProvider, ReleaseProvider, TrackProvider};
use crate::services::curator::{CollectionCurator, CurationReport};
use crate::services::executor::BoundedExecutor;
use crate::services::fingerprint::release_fingerprint;
use crate::services::identity_cache::IdentityCache;
use crate::services::track_fetch::TrackFetchScheduler;
use crate::store::TargetStore;
use chrono::NaiveDate;
use drops_common::time;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// External services a pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub releases: Arc<dyn ReleaseProvider>,
    pub tracks: Arc<dyn TrackProvider>,
    pub collections: Arc<dyn CollectionProvider>,
}

/// What happened to the artist cache at the end of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtistRefresh {
    NotNeeded,
    Refreshed { artists: usize },
    Failed(String),
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Releases returned by the listing provider
    pub candidates: usize,
    pub outside_lookback: usize,
    pub duplicates: usize,
    /// Back catalog of newly followed artists, committed without curation
    pub seeded: usize,
    /// Releases not yet in the identity cache
    pub new_releases: usize,
    /// One [`CurationError::Fetch`] per release whose tracks could not be fetched
    pub fetch_failures: Vec<CurationError>,
    /// Store failures outside curation (loading targets, seeding)
    pub errors: Vec<CurationError>,
    pub classified: BTreeMap<ExtendedCategory, usize>,
    pub curation: CurationReport,
    pub artist_refresh: ArtistRefresh,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            candidates: 0,
            outside_lookback: 0,
            duplicates: 0,
            seeded: 0,
            new_releases: 0,
            fetch_failures: Vec::new(),
            errors: Vec::new(),
            classified: BTreeMap::new(),
            curation: CurationReport::default(),
            artist_refresh: ArtistRefresh::NotNeeded,
        }
    }

    /// Errors of every kind collected during the run
    pub fn error_count(&self) -> usize {
        self.fetch_failures.len()
            + self.errors.len()
            + self.curation.errors.len()
            + usize::from(matches!(self.artist_refresh, ArtistRefresh::Failed(_)))
    }
}

pub struct DiscoveryPipeline {
    releases: Arc<dyn ReleaseProvider>,
    fetcher: TrackFetchScheduler,
    engine: ClassificationEngine,
    curator: CollectionCurator,
    cache: Arc<IdentityCache>,
    targets: Arc<dyn TargetStore>,
    executor: BoundedExecutor,
    settings: CuratorSettings,
}

impl DiscoveryPipeline {
    /// Wire up a pipeline; fails only on invalid remap patterns
    pub fn new(
        collaborators: Collaborators,
        cache: Arc<IdentityCache>,
        targets: Arc<dyn TargetStore>,
        settings: CuratorSettings,
        blacklist: Blacklist,
    ) -> drops_common::Result<Self> {
        let executor = BoundedExecutor::new(
            settings.fetch_concurrency,
            Some(settings.fetch_rate_per_second),
        );
        let engine = ClassificationEngine::from_settings(&settings.remap, blacklist)?;
        let fetcher = TrackFetchScheduler::new(collaborators.tracks, executor.clone())
            .with_deadline(settings.fetch_deadline());
        let curator = CollectionCurator::new(
            collaborators.collections,
            Arc::clone(&targets),
            Arc::clone(&cache),
            settings.clone(),
        );

        Ok(Self {
            releases: collaborators.releases,
            fetcher,
            engine,
            curator,
            cache,
            targets,
            executor,
            settings,
        })
    }

    pub async fn run(&self, followed_artist_ids: &[String]) -> Result<RunReport, CurationError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        self.run_inner(run_id, followed_artist_ids).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        followed_artist_ids: &[String],
    ) -> Result<RunReport, CurationError> {
        let mut report = RunReport::new(run_id);
        let now = time::now();
        let followed: HashSet<String> = followed_artist_ids.iter().cloned().collect();
        info!(artists = followed.len(), "Discovery run started");

        // Without targets nothing can be routed; new releases wait for the next run
        let targets = match self.targets.load_targets().await {
            Ok(targets) => Some(targets),
            Err(e) => {
                error!(error = %e, "Failed to load collection targets");
                report.errors.push(CurationError::Store(e));
                None
            }
        };

        let mut artist_ids: Vec<String> = followed.iter().cloned().collect();
        artist_ids.sort();
        let candidates = self
            .releases
            .list_candidate_releases(&artist_ids)
            .await
            .map_err(CurationError::Listing)?;
        report.candidates = candidates.len();

        let cutoff = now
            .checked_sub_signed(self.settings.lookback())
            .map(|t| t.date_naive())
            .unwrap_or(NaiveDate::MIN);
        let (recent, old): (Vec<Release>, Vec<Release>) = candidates
            .into_iter()
            .partition(|r| r.release_date >= cutoff);
        report.outside_lookback = old.len();

        let unique = dedupe(recent);
        report.duplicates = report.candidates - report.outside_lookback - unique.len();

        // Decided before anything is committed or refreshed
        let first_run = self.cache.has_no_artists().await;
        let mut unknown_artists = 0;
        for artist in &followed {
            if !self.cache.is_artist_known(artist).await {
                unknown_artists += 1;
            }
        }
        let refresh_due = first_run
            || unknown_artists > 0
            || self
                .cache
                .artist_cache_expired(now, self.settings.artist_cache_timeout())
                .await;

        let mut to_curate = Vec::with_capacity(unique.len());
        let mut to_seed = Vec::new();
        for release in unique {
            if first_run || !self.has_known_artist(&release).await {
                to_seed.push(release);
            } else {
                to_curate.push(release);
            }
        }
        if !to_seed.is_empty() {
            match self.cache.commit(&to_seed).await {
                Ok(seeded) => {
                    report.seeded = seeded;
                    info!(seeded, first_run, "Seeded back catalog of new artists");
                }
                Err(e) => {
                    error!(error = %e, "Failed to seed back catalog");
                    report.errors.push(CurationError::Store(e));
                }
            }
        }

        let new_releases = self.cache.filter_new_releases(&to_curate).await;
        report.new_releases = new_releases.len();
        info!(new_releases = new_releases.len(), "New releases found");

        let targets = targets.filter(|_| !new_releases.is_empty());
        if let Some(targets) = &targets {
            let outcome = self.fetcher.fetch_tracks(new_releases).await;
            report.fetch_failures = outcome
                .failed
                .into_iter()
                .map(|(release_id, source)| CurationError::Fetch { release_id, source })
                .collect();

            let classified = self.engine.classify_all(outcome.fetched);
            for item in &classified {
                *report.classified.entry(item.category).or_default() += 1;
            }
            report.curation = self.curator.curate(classified, targets).await;
        }

        if refresh_due {
            report.artist_refresh = self.refresh_artists(followed).await;
        }

        info!(
            candidates = report.candidates,
            new_releases = report.new_releases,
            errors = report.error_count(),
            "Discovery run finished"
        );
        Ok(report)
    }

    async fn has_known_artist(&self, release: &Release) -> bool {
        for artist in &release.artist_ids {
            if self.cache.is_artist_known(artist).await {
                return true;
            }
        }
        false
    }

    /// Replace the artist set on the executor and wait for the outcome
    async fn refresh_artists(&self, followed: HashSet<String>) -> ArtistRefresh {
        let cache = Arc::clone(&self.cache);
        let artists = followed.len();
        let handle = self
            .executor
            .submit(async move { cache.refresh_artist_set(&followed).await });

        match handle.await {
            Ok(Ok(())) => ArtistRefresh::Refreshed { artists },
            Ok(Err(e)) => {
                error!(error = %e, "Artist cache refresh failed");
                ArtistRefresh::Failed(e.to_string())
            }
            Err(join_err) => {
                error!(error = %join_err, "Artist cache refresh task failed");
                ArtistRefresh::Failed(join_err.to_string())
            }
        }
    }
}

/// Keep the first release of every id and every fingerprint
fn dedupe(releases: Vec<Release>) -> Vec<Release> {
    let mut ids = HashSet::new();
    let mut fingerprints = HashSet::new();
    releases
        .into_iter()
        .filter(|release| {
            let fingerprint = release_fingerprint(release);
            if ids.contains(&release.id) || fingerprints.contains(&fingerprint) {
                return false;
            }
            ids.insert(release.id.clone());
            fingerprints.insert(fingerprint);
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BaseCategory;

    fn release(id: &str, title: &str) -> Release {
        let date = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        Release::new(id, title, BaseCategory::Album, ["a"], date).unwrap()
    }

    #[test]
    fn test_dedupe_by_id_and_fingerprint() {
        let unique = dedupe(vec![
            release("r1", "Harbor"),
            release("r1", "Harbor"),
            release("r2", "Harbor (Deluxe Edition)"),
            release("r3", "Lighthouse"),
        ]);
        let ids: Vec<_> = unique.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r3"]);
    }
}
