//! Settings table accessors
//!
//! Key/value pattern: every value is stored as text and parsed on read.

use drops_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Read and parse a setting; `None` when the key is missing or NULL
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        Some((Some(value),)) => {
            let parsed = value.trim().parse::<T>().map_err(|e| {
                Error::Config(format!("Setting '{}' has invalid value '{}': {}", key, value, e))
            })?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Raw text of a setting, without parsing
pub async fn get_setting_text(db: &Pool<Sqlite>, key: &str) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;
    Ok(row.and_then(|(value,)| value))
}

/// Insert or overwrite a setting
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}
