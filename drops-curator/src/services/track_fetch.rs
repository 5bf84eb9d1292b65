//! Track fetch scheduler
//!
//! Retrieves the full track listing of every newly discovered release.
//!
//! **Algorithm:**
//! 1. Submit one fetch per release to the bounded executor, all at once
//! 2. Wait for every fetch (join, not streaming)
//! 3. Successful fetches yield a copy of the release with tracks attached
//! 4. Failed fetches are reported by release id; they never abort the rest
//!
//! An optional deadline bounds the whole batch: fetches still pending when
//! it passes resolve to [`ProviderError::Timeout`].

use crate::error::ProviderError;
use crate::models::Release;
use crate::providers::TrackProvider;
use crate::services::executor::BoundedExecutor;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Result of one batch fetch
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Releases with tracks attached, in input order
    pub fetched: Vec<Release>,
    /// `(release id, error)` for every release whose fetch failed
    pub failed: Vec<(String, ProviderError)>,
}

pub struct TrackFetchScheduler {
    provider: Arc<dyn TrackProvider>,
    executor: BoundedExecutor,
    deadline: Option<Duration>,
}

impl TrackFetchScheduler {
    pub fn new(provider: Arc<dyn TrackProvider>, executor: BoundedExecutor) -> Self {
        Self {
            provider,
            executor,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn fetch_tracks(&self, releases: Vec<Release>) -> FetchOutcome {
        if releases.is_empty() {
            return FetchOutcome::default();
        }

        let total = releases.len();
        let deadline = self.deadline.map(|d| (d, Instant::now() + d));

        let pending: Vec<_> = releases
            .into_iter()
            .map(|release| {
                let provider = Arc::clone(&self.provider);
                let release_id = release.id.clone();
                let handle = self.executor.submit(async move {
                    let call = provider.get_tracks(&release.id);
                    let result = match deadline {
                        Some((limit, at)) => tokio::time::timeout_at(at, call)
                            .await
                            .unwrap_or(Err(ProviderError::Timeout(limit))),
                        None => call.await,
                    };
                    result.map(|tracks| release.with_tracks(tracks))
                });
                (release_id, handle)
            })
            .collect();

        let (release_ids, handles): (Vec<String>, Vec<_>) = pending.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;

        let mut outcome = FetchOutcome::default();
        for (release_id, joined) in release_ids.into_iter().zip(joined) {
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => Err(ProviderError::Task(join_err.to_string())),
            };
            match result {
                Ok(release) => outcome.fetched.push(release),
                Err(err) => {
                    warn!(release_id = %release_id, error = %err, "Track fetch failed");
                    outcome.failed.push((release_id, err));
                }
            }
        }

        info!(
            requested = total,
            fetched = outcome.fetched.len(),
            failed = outcome.failed.len(),
            "Track fetch complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseCategory, Track};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct SlowOn {
        slow_id: &'static str,
    }

    #[async_trait]
    impl TrackProvider for SlowOn {
        async fn get_tracks(&self, release_id: &str) -> Result<Vec<Track>, ProviderError> {
            if release_id == self.slow_id {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(vec![Track::new(format!("{}-t1", release_id), "Track", 200_000)])
        }
    }

    fn release(id: &str) -> Release {
        let date = NaiveDate::from_ymd_opt(2024, 8, 8).unwrap();
        Release::new(id, id, BaseCategory::Single, ["a"], date).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out_slow_fetch_only() {
        let scheduler = TrackFetchScheduler::new(
            Arc::new(SlowOn { slow_id: "r2" }),
            BoundedExecutor::new(4, None),
        )
        .with_deadline(Some(Duration::from_secs(5)));

        let outcome = scheduler
            .fetch_tracks(vec![release("r1"), release("r2"), release("r3")])
            .await;

        let fetched: Vec<_> = outcome.fetched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(fetched, vec!["r1", "r3"]);
        assert_eq!(
            outcome.failed,
            vec![("r2".to_string(), ProviderError::Timeout(Duration::from_secs(5)))]
        );
        assert_eq!(outcome.fetched[0].track_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let scheduler = TrackFetchScheduler::new(
            Arc::new(SlowOn { slow_id: "" }),
            BoundedExecutor::new(1, None),
        );
        let outcome = scheduler.fetch_tracks(Vec::new()).await;
        assert!(outcome.fetched.is_empty() && outcome.failed.is_empty());
    }
}
