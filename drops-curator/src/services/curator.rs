//! Collection curator
//!
//! Writes classified releases into their category's destination collection
//! and then commits everything that was handled to the identity cache.
//!
//! **Algorithm:**
//! 1. Group non-inert releases by category (fixed category order)
//! 2. Categories without a destination are reported and left inert
//! 3. Sort each group by release date, then id
//! 4. Capacity check; evict the oldest items or skip the group
//! 5. Insert the group's tracks at the top, in batches per [`BatchPolicy`]
//! 6. Stamp the category's last update on success
//! 7. Commit every release except those of groups that failed mid-write
//!
//! Writes to one collection are strictly sequential. A failed group never
//! stops the remaining groups.

use crate::classifier::ClassifiedRelease;
use crate::config::{BatchPolicy, CuratorSettings};
use crate::error::{CurationError, ProviderError, WriteStage};
use crate::models::{CollectionTargets, ExtendedCategory, Release};
use crate::providers::CollectionProvider;
use crate::services::identity_cache::IdentityCache;
use crate::store::TargetStore;
use drops_common::time;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Progress of one category group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupState {
    Pending,
    CapacityChecked,
    Evicting,
    Inserting,
    Done,
    Skipped,
}

/// Outcome of one category group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub category: ExtendedCategory,
    pub collection_id: String,
    pub state: GroupState,
    pub releases: usize,
    pub songs_added: usize,
    pub evicted: usize,
    pub error: Option<String>,
}

/// Outcome of one `curate` call
#[derive(Debug, Default)]
pub struct CurationReport {
    pub groups: Vec<GroupReport>,
    pub errors: Vec<CurationError>,
    /// Blacklisted releases (committed, never written)
    pub inert: Vec<String>,
    /// Releases whose category has no destination (committed, never written)
    pub unrouted: Vec<String>,
    /// Release ids newly recorded in the identity cache
    pub committed: usize,
}

impl CurationReport {
    pub fn group(&self, category: ExtendedCategory) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.category == category)
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Split a group's tracks into insert calls
///
/// Strict keeps every release in its own run of chunks; bundled concatenates
/// all tracks first. No chunk is longer than `limit`.
pub fn plan_batches(policy: BatchPolicy, releases: &[Release], limit: usize) -> Vec<Vec<String>> {
    let limit = limit.max(1);
    match policy {
        BatchPolicy::Strict => releases
            .iter()
            .flat_map(|release| {
                let ids: Vec<String> = release.tracks.iter().map(|t| t.id.clone()).collect();
                ids.chunks(limit).map(<[String]>::to_vec).collect::<Vec<_>>()
            })
            .collect(),
        BatchPolicy::Bundled => {
            let ids: Vec<String> = releases
                .iter()
                .flat_map(|release| release.tracks.iter().map(|t| t.id.clone()))
                .collect();
            ids.chunks(limit).map(<[String]>::to_vec).collect()
        }
    }
}

pub struct CollectionCurator {
    collections: Arc<dyn CollectionProvider>,
    targets: Arc<dyn TargetStore>,
    cache: Arc<IdentityCache>,
    settings: CuratorSettings,
}

impl CollectionCurator {
    pub fn new(
        collections: Arc<dyn CollectionProvider>,
        targets: Arc<dyn TargetStore>,
        cache: Arc<IdentityCache>,
        settings: CuratorSettings,
    ) -> Self {
        Self {
            collections,
            targets,
            cache,
            settings,
        }
    }

    pub async fn curate(
        &self,
        classified: Vec<ClassifiedRelease>,
        targets: &CollectionTargets,
    ) -> CurationReport {
        let mut report = CurationReport::default();
        let mut groups: BTreeMap<ExtendedCategory, Vec<Release>> = BTreeMap::new();
        let mut to_commit: Vec<Release> = Vec::with_capacity(classified.len());

        for item in classified {
            if item.inert {
                report.inert.push(item.release.id.clone());
                to_commit.push(item.release);
            } else {
                groups.entry(item.category).or_default().push(item.release);
            }
        }

        for (category, mut releases) in groups {
            let Some(collection_id) = targets.get(&category).and_then(|t| t.destination()) else {
                warn!(
                    category = %category,
                    releases = releases.len(),
                    "No destination collection configured"
                );
                report.errors.push(CurationError::Configuration {
                    category,
                    releases: releases.len(),
                });
                report.unrouted.extend(releases.iter().map(|r| r.id.clone()));
                to_commit.extend(releases);
                continue;
            };

            releases.sort_by(|a, b| {
                a.release_date
                    .cmp(&b.release_date)
                    .then_with(|| a.id.cmp(&b.id))
            });

            let (group, failure) = self.curate_group(category, collection_id, &releases).await;

            let wrote_partially = matches!(failure, Some(CurationError::Write { .. }));
            if group.state == GroupState::Done {
                if let Err(e) = self.targets.mark_updated(category, time::now()).await {
                    error!(category = %category, error = %e, "Failed to record collection update");
                    report.errors.push(CurationError::Store(e));
                }
            }
            if !wrote_partially {
                to_commit.extend(releases);
            }
            if let Some(err) = failure {
                report.errors.push(err);
            }
            report.groups.push(group);
        }

        match self.cache.commit(&to_commit).await {
            Ok(added) => report.committed = added,
            Err(e) => {
                error!(error = %e, "Failed to commit releases to identity cache");
                report.errors.push(CurationError::Store(e));
            }
        }

        info!(
            groups = report.groups.len(),
            inert = report.inert.len(),
            unrouted = report.unrouted.len(),
            committed = report.committed,
            errors = report.errors.len(),
            "Curation finished"
        );
        report
    }

    /// Run one group through the capacity check and the writes
    async fn curate_group(
        &self,
        category: ExtendedCategory,
        collection_id: &str,
        releases: &[Release],
    ) -> (GroupReport, Option<CurationError>) {
        let songs_to_add: usize = releases.iter().map(Release::track_count).sum();
        let mut group = GroupReport {
            category,
            collection_id: collection_id.to_string(),
            state: GroupState::Pending,
            releases: releases.len(),
            songs_added: 0,
            evicted: 0,
            error: None,
        };

        let write_error = |stage: WriteStage, source: ProviderError| CurationError::Write {
            category,
            collection_id: collection_id.to_string(),
            stage,
            source,
        };

        let current = match self.collections.count(collection_id).await {
            Ok(count) => count,
            Err(source) => {
                let err = write_error(WriteStage::Counting, source);
                return finish(group, err);
            }
        };
        group.state = GroupState::CapacityChecked;

        let ceiling = self.settings.collection_capacity;
        if current + songs_to_add > ceiling {
            // A group larger than the whole collection can never fit
            if !self.settings.circular_playlist_fitting || songs_to_add > ceiling {
                group.state = GroupState::Skipped;
                let err = CurationError::CapacityExceeded {
                    category,
                    collection_id: collection_id.to_string(),
                    current,
                    requested: songs_to_add,
                    ceiling,
                };
                warn!(category = %category, collection_id = %collection_id, "{}", err);
                return finish(group, err);
            }

            group.state = GroupState::Evicting;
            let deficit = current + songs_to_add - ceiling;
            if let Err(source) = self
                .evict_oldest(collection_id, current, deficit, &mut group)
                .await
            {
                return finish(group, write_error(WriteStage::Evicting, source));
            }
        }

        group.state = GroupState::Inserting;
        let limit = self.settings.collection_add_limit;
        let batches = plan_batches(self.settings.batch_policy, releases, limit);
        let cooldown = match self.settings.batch_policy {
            BatchPolicy::Strict => Some(self.settings.insert_cooldown()),
            BatchPolicy::Bundled => None,
        };

        for (i, batch) in batches.iter().enumerate() {
            if i > 0 {
                if let Some(delay) = cooldown {
                    tokio::time::sleep(delay).await;
                }
            }
            if let Err(source) = self
                .collections
                .insert_at_top(collection_id, batch, limit)
                .await
            {
                return finish(group, write_error(WriteStage::Inserting, source));
            }
            group.songs_added += batch.len();
        }

        group.state = GroupState::Done;
        info!(
            category = %category,
            collection_id = %collection_id,
            releases = group.releases,
            songs_added = group.songs_added,
            evicted = group.evicted,
            "Collection updated"
        );
        (group, None)
    }

    /// Remove `deficit` items from the bottom, at most one add limit per call
    ///
    /// Each pass removes the lowest `chunk` items of what is left, so the
    /// offset moves up by `chunk` every iteration.
    async fn evict_oldest(
        &self,
        collection_id: &str,
        current: usize,
        deficit: usize,
        group: &mut GroupReport,
    ) -> Result<(), ProviderError> {
        let limit = self.settings.collection_add_limit.max(1);
        let mut size = current;
        let mut remaining = deficit.min(current);

        while remaining > 0 {
            let chunk = remaining.min(limit);
            let offset = size - chunk;
            self.collections
                .evict_from_bottom(collection_id, offset, chunk)
                .await?;
            debug!(collection_id = %collection_id, offset, count = chunk, "Evicted items");

            size -= chunk;
            remaining -= chunk;
            group.evicted += chunk;
        }
        Ok(())
    }
}

fn finish(mut group: GroupReport, err: CurationError) -> (GroupReport, Option<CurationError>) {
    if !matches!(err, CurationError::CapacityExceeded { .. }) {
        error!(category = %group.category, error = %err, "Group left incomplete");
    }
    group.error = Some(err.to_string());
    (group, Some(err))
}
