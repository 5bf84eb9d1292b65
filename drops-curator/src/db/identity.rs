//! SQLite-backed identity store
//!
//! Tables: `cache_releases`, `cache_release_names`, `cache_artists`; the
//! artist refresh time lives in `settings` under `artist_cache_last_update`.

use crate::store::{IdentitySnapshot, IdentityStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drops_common::time::{from_epoch_millis, to_epoch_millis};
use drops_common::Result;
use sqlx::{Pool, Sqlite};

/// Settings key holding the artist cache refresh time (epoch millis)
pub const ARTIST_CACHE_LAST_UPDATE: &str = "artist_cache_last_update";

#[derive(Clone)]
pub struct SqliteIdentityStore {
    db: Pool<Sqlite>,
}

impl SqliteIdentityStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Drop every cached release id, fingerprint and artist
    pub async fn purge(&self) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM cache_releases").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM cache_release_names").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM cache_artists").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(ARTIST_CACHE_LAST_UPDATE)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Identity cache purged");
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn load_snapshot(&self) -> Result<IdentitySnapshot> {
        let release_ids: Vec<String> = sqlx::query_scalar("SELECT release_id FROM cache_releases")
            .fetch_all(&self.db)
            .await?;
        let fingerprints: Vec<String> =
            sqlx::query_scalar("SELECT release_name FROM cache_release_names")
                .fetch_all(&self.db)
                .await?;
        let artist_ids: Vec<String> = sqlx::query_scalar("SELECT artist_id FROM cache_artists")
            .fetch_all(&self.db)
            .await?;
        let refreshed_millis: Option<i64> =
            crate::db::settings::get_setting(&self.db, ARTIST_CACHE_LAST_UPDATE).await?;

        Ok(IdentitySnapshot {
            release_ids: release_ids.into_iter().collect(),
            fingerprints: fingerprints.into_iter().collect(),
            artist_ids: artist_ids.into_iter().collect(),
            artists_refreshed: refreshed_millis.and_then(from_epoch_millis),
        })
    }

    async fn insert_releases(&self, release_ids: &[String], fingerprints: &[String]) -> Result<()> {
        let mut tx = self.db.begin().await?;

        for id in release_ids {
            sqlx::query("INSERT OR IGNORE INTO cache_releases (release_id) VALUES (?)")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        for name in fingerprints {
            sqlx::query("INSERT OR IGNORE INTO cache_release_names (release_name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn replace_artists(
        &self,
        artist_ids: &[String],
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM cache_artists").execute(&mut *tx).await?;
        for id in artist_ids {
            sqlx::query("INSERT OR IGNORE INTO cache_artists (artist_id) VALUES (?)")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
        )
        .bind(ARTIST_CACHE_LAST_UPDATE)
        .bind(to_epoch_millis(refreshed_at).to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
