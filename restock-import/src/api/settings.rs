//! Classifier settings API handlers
//!
//! GET/PUT /settings/classifier - token, endpoint and flags backing the
//! Database tier of credential resolution. The token itself is never echoed
//! back, only whether one is configured.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::settings;
use crate::error::ApiResult;
use crate::AppState;

/// GET /settings/classifier response
#[derive(Debug, Serialize)]
pub struct ClassifierSettingsResponse {
    pub token_configured: bool,
    pub ai_enabled: bool,
    pub skip_ai_reclassify: bool,
    pub endpoint: Option<String>,
}

/// PUT /settings/classifier request; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateClassifierSettingsRequest {
    pub api_token: Option<String>,
    pub ai_enabled: Option<bool>,
    pub skip_ai_reclassify: Option<bool>,
    pub endpoint: Option<String>,
}

/// GET /settings/classifier
pub async fn get_classifier_settings(
    State(state): State<AppState>,
) -> ApiResult<Json<ClassifierSettingsResponse>> {
    let token = settings::get_classifier_api_token(&state.db).await?;

    Ok(Json(ClassifierSettingsResponse {
        token_configured: token.map(|t| !t.trim().is_empty()).unwrap_or(false),
        ai_enabled: settings::get_ai_enabled(&state.db).await?,
        skip_ai_reclassify: settings::get_skip_ai_reclassify(&state.db).await?,
        endpoint: settings::get_classifier_endpoint(&state.db).await?,
    }))
}

/// PUT /settings/classifier
pub async fn update_classifier_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateClassifierSettingsRequest>,
) -> ApiResult<Json<ClassifierSettingsResponse>> {
    if let Some(token) = request.api_token {
        settings::set_classifier_api_token(&state.db, token).await?;
        tracing::info!("Classifier API token updated");
    }
    if let Some(enabled) = request.ai_enabled {
        settings::set_ai_enabled(&state.db, enabled).await?;
        tracing::info!(enabled, "AI classification flag updated");
    }
    if let Some(skip) = request.skip_ai_reclassify {
        settings::set_skip_ai_reclassify(&state.db, skip).await?;
    }
    if let Some(endpoint) = request.endpoint {
        settings::set_classifier_endpoint(&state.db, endpoint).await?;
    }

    get_classifier_settings(State(state)).await
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route(
        "/settings/classifier",
        get(get_classifier_settings).put(update_classifier_settings),
    )
}
