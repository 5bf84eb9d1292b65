//! Per-artist category blacklist persistence
//!
//! One row per artist; categories are stored as a comma separated list of
//! category names (e.g. `"LIVE,REMIX"`).

use crate::classifier::Blacklist;
use crate::models::ExtendedCategory;
use drops_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeSet;

/// Load every blacklist row
///
/// Unknown category names in a row are a configuration error.
pub async fn load_blacklist(db: &Pool<Sqlite>) -> Result<Blacklist> {
    let rows: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT artist_id, blacklisted_types FROM blacklisted_types")
            .fetch_all(db)
            .await?;

    let mut blacklist = Blacklist::default();
    for (artist_id, types) in rows {
        let categories = parse_categories(types.as_deref().unwrap_or(""))?;
        if !categories.is_empty() {
            blacklist.insert(artist_id, categories);
        }
    }
    Ok(blacklist)
}

/// Replace the blacklisted categories of one artist
pub async fn set_blacklist(
    db: &Pool<Sqlite>,
    artist_id: &str,
    categories: &BTreeSet<ExtendedCategory>,
) -> Result<()> {
    let artist_id = artist_id.trim();
    if artist_id.is_empty() {
        return Err(Error::InvalidInput("Artist id is empty".to_string()));
    }
    if categories.is_empty() {
        return remove_blacklist(db, artist_id).await.map(|_| ());
    }

    let joined = categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(",");

    sqlx::query(
        "INSERT OR REPLACE INTO blacklisted_types (artist_id, blacklisted_types) VALUES (?, ?)",
    )
    .bind(artist_id)
    .bind(&joined)
    .execute(db)
    .await?;

    tracing::info!(artist_id = %artist_id, categories = %joined, "Blacklist updated");
    Ok(())
}

/// Drop an artist's blacklist row; returns whether one existed
pub async fn remove_blacklist(db: &Pool<Sqlite>, artist_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM blacklisted_types WHERE artist_id = ?")
        .bind(artist_id.trim())
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn parse_categories(list: &str) -> Result<BTreeSet<ExtendedCategory>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<ExtendedCategory>().map_err(Error::Config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_load_remove() {
        let db = drops_common::db::init_memory_database().await.unwrap();
        let categories: BTreeSet<_> = [ExtendedCategory::Live, ExtendedCategory::Remix].into();

        set_blacklist(&db, "artist-1", &categories).await.unwrap();
        let blacklist = load_blacklist(&db).await.unwrap();
        assert_eq!(blacklist.categories_for("artist-1"), Some(&categories));

        assert!(remove_blacklist(&db, "artist-1").await.unwrap());
        assert!(!remove_blacklist(&db, "artist-1").await.unwrap());
        assert!(load_blacklist(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_list_is_parsed_leniently() {
        let db = drops_common::db::init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO blacklisted_types VALUES ('artist-2', ' live, appears_on ,')")
            .execute(&db)
            .await
            .unwrap();

        let blacklist = load_blacklist(&db).await.unwrap();
        let expected: BTreeSet<_> = [ExtendedCategory::Live, ExtendedCategory::AppearsOn].into();
        assert_eq!(blacklist.categories_for("artist-2"), Some(&expected));
    }

    #[tokio::test]
    async fn test_unknown_category_is_config_error() {
        let db = drops_common::db::init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO blacklisted_types VALUES ('artist-3', 'LIVE,KARAOKE')")
            .execute(&db)
            .await
            .unwrap();

        assert!(matches!(load_blacklist(&db).await, Err(Error::Config(_))));
    }
}
