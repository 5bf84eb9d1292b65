//! Runtime settings for the curator
//!
//! Database-first: every value lives in the `settings` table. Missing or
//! NULL keys fall back to a built-in default which is written back, so after
//! the first load the table shows the full effective configuration.

use crate::classifier::rules::{
    RuleKind, DEFAULT_LIVE_PATTERN, DEFAULT_REMIX_PATTERN, DEFAULT_RERELEASE_PATTERN,
};
use crate::db::settings::{get_setting, get_setting_text, set_setting};
use chrono::TimeDelta;
use drops_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// How a category group is split into insert calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Each release is inserted on its own, chunked by the add limit, with a
    /// cooldown between consecutive calls
    Strict,
    /// All tracks of the group are concatenated and chunked, no cooldown
    Bundled,
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchPolicy::Strict => f.write_str("strict"),
            BatchPolicy::Bundled => f.write_str("bundled"),
        }
    }
}

/// Remap rule configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemapSettings {
    pub ep_separation: bool,
    pub remix_separation: bool,
    pub live_separation: bool,
    pub rerelease_separation: bool,
    /// Evaluation order; the first matching rule wins
    pub priority: Vec<RuleKind>,
    pub remix_pattern: String,
    pub live_pattern: String,
    pub rerelease_pattern: String,
}

impl RemapSettings {
    pub fn is_enabled(&self, kind: RuleKind) -> bool {
        match kind {
            RuleKind::Ep => self.ep_separation,
            RuleKind::Remix => self.remix_separation,
            RuleKind::Live => self.live_separation,
            RuleKind::Rerelease => self.rerelease_separation,
        }
    }

    pub fn pattern(&self, kind: RuleKind) -> &str {
        match kind {
            RuleKind::Ep => "",
            RuleKind::Remix => &self.remix_pattern,
            RuleKind::Live => &self.live_pattern,
            RuleKind::Rerelease => &self.rerelease_pattern,
        }
    }
}

impl Default for RemapSettings {
    fn default() -> Self {
        Self {
            ep_separation: true,
            remix_separation: true,
            live_separation: true,
            rerelease_separation: true,
            priority: RuleKind::DEFAULT_PRIORITY.to_vec(),
            remix_pattern: DEFAULT_REMIX_PATTERN.to_string(),
            live_pattern: DEFAULT_LIVE_PATTERN.to_string(),
            rerelease_pattern: DEFAULT_RERELEASE_PATTERN.to_string(),
        }
    }
}

/// Everything the pipeline reads from the `settings` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CuratorSettings {
    pub remap: RemapSettings,

    // === Collection writes ===
    /// Evict the oldest items when a group does not fit
    pub circular_playlist_fitting: bool,
    pub batch_policy: BatchPolicy,
    pub collection_capacity: usize,
    pub collection_add_limit: usize,
    pub insert_cooldown_ms: u64,

    // === Caches ===
    pub artist_cache_timeout_days: i64,
    pub lookback_days: i64,

    // === Track fetch executor ===
    pub fetch_concurrency: usize,
    pub fetch_rate_per_second: u32,
    pub fetch_deadline_secs: Option<u64>,
}

impl Default for CuratorSettings {
    fn default() -> Self {
        Self {
            remap: RemapSettings::default(),
            circular_playlist_fitting: true,
            batch_policy: BatchPolicy::Strict,
            collection_capacity: 10_000,
            collection_add_limit: 100,
            insert_cooldown_ms: 1000,
            artist_cache_timeout_days: 60,
            lookback_days: 3,
            fetch_concurrency: 8,
            fetch_rate_per_second: 10,
            fetch_deadline_secs: None,
        }
    }
}

/// Read a setting, writing `default` back when it is missing
async fn setting_or_default<T>(pool: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: fmt::Display,
{
    match get_setting::<T>(pool, key).await? {
        Some(value) => Ok(value),
        None => {
            info!(
                "Setting '{}' not found in database, using default: {}",
                key,
                default.to_string()
            );
            set_setting(pool, key, default.to_string()).await?;
            Ok(default)
        }
    }
}

fn parse_priority(list: &str) -> Result<Vec<RuleKind>> {
    let mut priority: Vec<RuleKind> = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: RuleKind = item
            .parse()
            .map_err(|e: String| Error::Config(format!("remapper_priority: {}", e)))?;
        if !priority.contains(&kind) {
            priority.push(kind);
        }
    }
    // Rules left out of the list keep their default relative order at the end
    for kind in RuleKind::DEFAULT_PRIORITY {
        if !priority.contains(&kind) {
            priority.push(kind);
        }
    }
    Ok(priority)
}

fn format_priority(priority: &[RuleKind]) -> String {
    priority
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn require_positive(key: &str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(Error::Config(format!("Setting '{}' must be at least 1", key)));
    }
    Ok(value)
}

/// Longest day span any setting may hold (about a century)
pub const MAX_DAYS: i64 = 36_500;

fn require_days(key: &str, value: i64) -> Result<i64> {
    if !(0..=MAX_DAYS).contains(&value) {
        return Err(Error::Config(format!(
            "Setting '{}' must be between 0 and {} days, got {}",
            key, MAX_DAYS, value
        )));
    }
    Ok(value)
}

fn days(value: i64) -> TimeDelta {
    TimeDelta::try_days(value.clamp(0, MAX_DAYS)).unwrap_or(TimeDelta::zero())
}

impl CuratorSettings {
    /// Load all curator settings, writing defaults for missing keys
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let remap = RemapSettings {
            ep_separation: setting_or_default(pool, "ep_separation", true).await?,
            remix_separation: setting_or_default(pool, "remix_separation", true).await?,
            live_separation: setting_or_default(pool, "live_separation", true).await?,
            rerelease_separation: setting_or_default(pool, "rerelease_separation", true).await?,
            priority: {
                let default = format_priority(&defaults.remap.priority);
                let raw = setting_or_default(pool, "remapper_priority", default).await?;
                parse_priority(&raw)?
            },
            remix_pattern: setting_or_default(pool, "remix_pattern", defaults.remap.remix_pattern)
                .await?,
            live_pattern: setting_or_default(pool, "live_pattern", defaults.remap.live_pattern)
                .await?,
            rerelease_pattern: setting_or_default(
                pool,
                "rerelease_pattern",
                defaults.remap.rerelease_pattern,
            )
            .await?,
        };

        let batch_policy = if setting_or_default(pool, "batch_playlist_addition", false).await? {
            BatchPolicy::Bundled
        } else {
            BatchPolicy::Strict
        };

        // Optional, no default written back
        let fetch_deadline_secs = match get_setting_text(pool, "fetch_deadline_secs").await? {
            Some(raw) if !raw.trim().is_empty() => {
                get_setting::<u64>(pool, "fetch_deadline_secs").await?
            }
            _ => None,
        };

        let settings = Self {
            remap,
            circular_playlist_fitting: setting_or_default(pool, "circular_playlist_fitting", true)
                .await?,
            batch_policy,
            collection_capacity: require_positive(
                "collection_capacity",
                setting_or_default(pool, "collection_capacity", defaults.collection_capacity)
                    .await?,
            )?,
            collection_add_limit: require_positive(
                "collection_add_limit",
                setting_or_default(pool, "collection_add_limit", defaults.collection_add_limit)
                    .await?,
            )?,
            insert_cooldown_ms: setting_or_default(
                pool,
                "insert_cooldown_ms",
                defaults.insert_cooldown_ms,
            )
            .await?,
            artist_cache_timeout_days: require_days(
                "artist_cache_timeout_days",
                setting_or_default(
                    pool,
                    "artist_cache_timeout_days",
                    defaults.artist_cache_timeout_days,
                )
                .await?,
            )?,
            lookback_days: require_days(
                "lookback_days",
                setting_or_default(pool, "lookback_days", defaults.lookback_days).await?,
            )?,
            fetch_concurrency: require_positive(
                "fetch_concurrency",
                setting_or_default(pool, "fetch_concurrency", defaults.fetch_concurrency).await?,
            )?,
            fetch_rate_per_second: require_positive(
                "fetch_rate_per_second",
                setting_or_default(pool, "fetch_rate_per_second", defaults.fetch_rate_per_second)
                    .await? as usize,
            )? as u32,
            fetch_deadline_secs,
        };

        info!(
            batch_policy = %settings.batch_policy,
            eviction = settings.circular_playlist_fitting,
            capacity = settings.collection_capacity,
            "Loaded curator settings from database"
        );
        Ok(settings)
    }

    pub fn insert_cooldown(&self) -> Duration {
        Duration::from_millis(self.insert_cooldown_ms)
    }

    pub fn fetch_deadline(&self) -> Option<Duration> {
        self.fetch_deadline_secs.map(Duration::from_secs)
    }

    /// Out-of-range day counts are clamped to `0..=MAX_DAYS`
    pub fn artist_cache_timeout(&self) -> TimeDelta {
        days(self.artist_cache_timeout_days)
    }

    pub fn lookback(&self) -> TimeDelta {
        days(self.lookback_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_are_written_back() {
        let pool = drops_common::db::init_memory_database().await.unwrap();

        let settings = CuratorSettings::load(&pool).await.unwrap();
        assert_eq!(settings, CuratorSettings::default());

        let stored: Option<String> = get_setting_text(&pool, "collection_capacity").await.unwrap();
        assert_eq!(stored.as_deref(), Some("10000"));
        let stored: Option<String> = get_setting_text(&pool, "remapper_priority").await.unwrap();
        assert_eq!(stored.as_deref(), Some("ep,remix,live,rerelease"));
        assert!(get_setting_text(&pool, "fetch_deadline_secs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stored_values_win() {
        let pool = drops_common::db::init_memory_database().await.unwrap();
        set_setting(&pool, "batch_playlist_addition", true).await.unwrap();
        set_setting(&pool, "live_separation", false).await.unwrap();
        set_setting(&pool, "remapper_priority", "live, ep").await.unwrap();
        set_setting(&pool, "fetch_deadline_secs", 30).await.unwrap();

        let settings = CuratorSettings::load(&pool).await.unwrap();
        assert_eq!(settings.batch_policy, BatchPolicy::Bundled);
        assert!(!settings.remap.is_enabled(RuleKind::Live));
        assert_eq!(
            settings.remap.priority,
            vec![RuleKind::Live, RuleKind::Ep, RuleKind::Remix, RuleKind::Rerelease]
        );
        assert_eq!(settings.fetch_deadline(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_zero_add_limit_is_rejected() {
        let pool = drops_common::db::init_memory_database().await.unwrap();
        set_setting(&pool, "collection_add_limit", 0).await.unwrap();

        assert!(matches!(CuratorSettings::load(&pool).await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_lookback_is_rejected() {
        let pool = drops_common::db::init_memory_database().await.unwrap();
        set_setting(&pool, "lookback_days", 200_000_000_000i64).await.unwrap();
        assert!(matches!(CuratorSettings::load(&pool).await, Err(Error::Config(_))));

        set_setting(&pool, "lookback_days", -5).await.unwrap();
        assert!(matches!(CuratorSettings::load(&pool).await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_artist_timeout_is_rejected() {
        let pool = drops_common::db::init_memory_database().await.unwrap();
        set_setting(&pool, "artist_cache_timeout_days", i64::MAX).await.unwrap();
        assert!(matches!(CuratorSettings::load(&pool).await, Err(Error::Config(_))));

        set_setting(&pool, "artist_cache_timeout_days", -1).await.unwrap();
        assert!(matches!(CuratorSettings::load(&pool).await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_boundary_days_are_accepted() {
        let pool = drops_common::db::init_memory_database().await.unwrap();
        set_setting(&pool, "lookback_days", 0).await.unwrap();
        set_setting(&pool, "artist_cache_timeout_days", MAX_DAYS).await.unwrap();

        let settings = CuratorSettings::load(&pool).await.unwrap();
        assert_eq!(settings.lookback(), TimeDelta::zero());
        assert_eq!(settings.artist_cache_timeout(), TimeDelta::days(MAX_DAYS));
    }

    #[test]
    fn test_hand_built_settings_never_panic() {
        let settings = CuratorSettings {
            lookback_days: i64::MAX,
            artist_cache_timeout_days: -7,
            ..CuratorSettings::default()
        };
        assert_eq!(settings.lookback(), TimeDelta::days(MAX_DAYS));
        assert_eq!(settings.artist_cache_timeout(), TimeDelta::zero());
    }

    #[tokio::test]
    async fn test_unknown_rule_in_priority_is_rejected() {
        let pool = drops_common::db::init_memory_database().await.unwrap();
        set_setting(&pool, "remapper_priority", "ep,karaoke").await.unwrap();

        assert!(matches!(CuratorSettings::load(&pool).await, Err(Error::Config(_))));
    }
}
