//! Settings database operations
//!
//! Get/set accessors for the settings table following the key-value pattern.
//! The database is the authoritative tier for classifier credentials, with
//! ENV and TOML as fallbacks (see `config::resolve_classifier_config`).

use restock_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Get the zero-shot classifier API token
///
/// Returns Some(token) if set, None otherwise
pub async fn get_classifier_api_token(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "classifier_api_token").await
}

/// Set the zero-shot classifier API token
pub async fn set_classifier_api_token(db: &Pool<Sqlite>, token: String) -> Result<()> {
    set_setting(db, "classifier_api_token", token).await
}

/// Get the classifier endpoint override, if configured
pub async fn get_classifier_endpoint(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "classifier_endpoint").await
}

/// Set the classifier endpoint override
pub async fn set_classifier_endpoint(db: &Pool<Sqlite>, endpoint: String) -> Result<()> {
    set_setting(db, "classifier_endpoint", endpoint).await
}

/// Whether AI classification is enabled
///
/// **Default:** false
pub async fn get_ai_enabled(db: &Pool<Sqlite>) -> Result<bool> {
    get_setting(db, "ai_enabled").await.map(|opt| opt.unwrap_or(false))
}

/// Enable or disable AI classification
pub async fn set_ai_enabled(db: &Pool<Sqlite>, enabled: bool) -> Result<()> {
    set_setting(db, "ai_enabled", enabled).await
}

/// Whether matched products flagged as AI-categorized skip re-classification
///
/// **Default:** true (preserves operator overrides and saves network calls)
pub async fn get_skip_ai_reclassify(db: &Pool<Sqlite>) -> Result<bool> {
    get_setting(db, "skip_ai_reclassify").await.map(|opt| opt.unwrap_or(true))
}

/// Enable or disable skipping of already AI-categorized products
pub async fn set_skip_ai_reclassify(db: &Pool<Sqlite>, skip: bool) -> Result<()> {
    set_setting(db, "skip_ai_reclassify", skip).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
