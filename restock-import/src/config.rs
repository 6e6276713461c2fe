//! Classifier configuration resolution for restock-import
//!
//! Provides multi-tier credential resolution with Database → ENV → TOML
//! priority. The resolved [`ClassifierConfig`] is injected into the
//! classifier client and the import controller; nothing reads credentials
//! from ambient global state at classification time.

use crate::services::zero_shot_classifier::{ClassifierConfig, DEFAULT_CLASSIFIER_ENDPOINT};
use restock_common::config::TomlConfig;
use restock_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Environment variable holding the classifier API token
pub const TOKEN_ENV_VAR: &str = "RESTOCK_CLASSIFIER_TOKEN";
/// Environment variable overriding the classifier endpoint
pub const ENDPOINT_ENV_VAR: &str = "RESTOCK_CLASSIFIER_ENDPOINT";

/// Resolve the classifier configuration for one import run.
///
/// **Priority:** Database → ENV → TOML, per credential. The AI-enabled and
/// skip-reclassify flags come from the settings table only.
pub async fn resolve_classifier_config(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<ClassifierConfig> {
    let api_token = resolve_token(db, toml_config).await?;

    let endpoint = match crate::db::settings::get_classifier_endpoint(db).await? {
        Some(endpoint) if !endpoint.trim().is_empty() => endpoint,
        _ => std::env::var(ENDPOINT_ENV_VAR)
            .ok()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| toml_config.classifier_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_CLASSIFIER_ENDPOINT.to_string()),
    };

    Ok(ClassifierConfig {
        endpoint,
        api_token,
        enabled: crate::db::settings::get_ai_enabled(db).await?,
        skip_reclassify: crate::db::settings::get_skip_ai_reclassify(db).await?,
    })
}

async fn resolve_token(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<Option<String>> {
    let db_token = crate::db::settings::get_classifier_api_token(db)
        .await?
        .filter(|t| is_valid_token(t));
    let env_token = std::env::var(TOKEN_ENV_VAR)
        .ok()
        .filter(|t| is_valid_token(t));
    let toml_token = toml_config
        .classifier_api_token
        .clone()
        .filter(|t| is_valid_token(t));

    let mut sources = Vec::new();
    if db_token.is_some() {
        sources.push("database");
    }
    if env_token.is_some() {
        sources.push("environment");
    }
    if toml_token.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "Classifier API token found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    if let Some(token) = db_token {
        info!("Classifier API token loaded from database");
        return Ok(Some(token));
    }
    if let Some(token) = env_token {
        info!("Classifier API token loaded from environment variable");
        return Ok(Some(token));
    }
    if let Some(token) = toml_token {
        info!("Classifier API token loaded from TOML config");
        return Ok(Some(token));
    }

    Ok(None)
}

/// Validate a token (non-empty, non-whitespace)
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}
