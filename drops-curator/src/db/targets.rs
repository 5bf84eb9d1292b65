//! SQLite-backed collection targets

use crate::models::{CollectionTarget, CollectionTargets, ExtendedCategory};
use crate::store::TargetStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drops_common::time::{from_epoch_millis, to_epoch_millis};
use drops_common::{Error, Result};
use sqlx::{Pool, Sqlite};

#[derive(Clone)]
pub struct SqliteTargetStore {
    db: Pool<Sqlite>,
}

impl SqliteTargetStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Point a category at a destination collection
    ///
    /// Changing the destination keeps the previous timestamp out of it.
    pub async fn set_target(&self, category: ExtendedCategory, collection_id: &str) -> Result<()> {
        let collection_id = collection_id.trim();
        if collection_id.is_empty() {
            return Err(Error::InvalidInput("Collection id is empty".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO collection_targets (category, collection_id, last_update)
            VALUES (?, ?, NULL)
            ON CONFLICT(category) DO UPDATE SET collection_id = excluded.collection_id, last_update = NULL
            "#,
        )
        .bind(category.as_str())
        .bind(collection_id)
        .execute(&self.db)
        .await?;

        tracing::info!(
            category = %category,
            collection_id = %collection_id,
            "Collection target set"
        );
        Ok(())
    }

    /// Remove the destination of a category, leaving it inert
    pub async fn unset_target(&self, category: ExtendedCategory) -> Result<()> {
        let result = sqlx::query(
            "UPDATE collection_targets SET collection_id = NULL, last_update = NULL WHERE category = ?",
        )
        .bind(category.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("No target for {}", category)));
        }
        tracing::info!(category = %category, "Collection target unset");
        Ok(())
    }
}

#[async_trait]
impl TargetStore for SqliteTargetStore {
    async fn load_targets(&self) -> Result<CollectionTargets> {
        let rows: Vec<(String, Option<String>, Option<i64>)> = sqlx::query_as(
            "SELECT category, collection_id, last_update FROM collection_targets",
        )
        .fetch_all(&self.db)
        .await?;

        let mut targets = CollectionTargets::new();
        for (category, collection_id, last_update) in rows {
            let category: ExtendedCategory = category.parse().map_err(Error::Config)?;
            targets.insert(
                category,
                CollectionTarget {
                    category,
                    collection_id,
                    last_update: last_update.and_then(from_epoch_millis),
                },
            );
        }
        Ok(targets)
    }

    async fn mark_updated(&self, category: ExtendedCategory, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE collection_targets SET last_update = ? WHERE category = ?")
            .bind(to_epoch_millis(at))
            .bind(category.as_str())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
