//! Import workflow API handlers
//!
//! POST /import/start, GET /import/status/:session_id,
//! POST /import/cancel/:session_id

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::{AttachmentRepository, CatalogRepository, MetaRepository, TaskRepository};
use crate::error::{ApiError, ApiResult};
use crate::models::{ImportOptions, ImportProgress, ImportSession, ImportState, ImportSummary};
use crate::services::ImportStreamController;
use crate::AppState;

/// POST /import/start request
#[derive(Debug, Deserialize)]
pub struct StartImportRequest {
    /// Server-side path to the uploaded CSV (upload handling is external)
    pub csv_path: String,
    #[serde(default)]
    pub options: ImportOptions,
}

/// POST /import/start response
#[derive(Debug, Serialize)]
pub struct StartImportResponse {
    pub session_id: Uuid,
    pub state: ImportState,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// GET /import/status response
#[derive(Debug, Serialize)]
pub struct ImportStatusResponse {
    pub session_id: Uuid,
    pub state: ImportState,
    pub progress: ImportProgress,
    pub summary: ImportSummary,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// POST /import/cancel response
#[derive(Debug, Serialize)]
pub struct CancelImportResponse {
    pub session_id: Uuid,
    pub state: ImportState,
    pub cancel_requested: bool,
}

/// POST /import/start
///
/// Accepts a CSV path plus options, spawns the background run, and returns
/// the session id. One import at a time: a second start while a run is
/// active returns 409 Conflict.
pub async fn start_import(
    State(state): State<AppState>,
    Json(request): Json<StartImportRequest>,
) -> ApiResult<Json<StartImportResponse>> {
    let path = std::path::Path::new(&request.csv_path);
    if !path.is_file() {
        return Err(ApiError::BadRequest(format!(
            "CSV file does not exist: {}",
            request.csv_path
        )));
    }

    {
        let sessions = state.sessions.read().await;
        for session in sessions.values() {
            if !session.read().await.is_terminal() {
                return Err(ApiError::Conflict(
                    "Import session already running".to_string(),
                ));
            }
        }
    }

    let session = ImportSession::new(request.csv_path, request.options);
    let response = StartImportResponse {
        session_id: session.session_id,
        state: session.state,
        started_at: session.started_at,
    };

    let session_id = session.session_id;
    let shared = Arc::new(tokio::sync::RwLock::new(session));
    let cancel = CancellationToken::new();

    state
        .sessions
        .write()
        .await
        .insert(session_id, shared.clone());
    state
        .cancel_tokens
        .write()
        .await
        .insert(session_id, cancel.clone());

    tracing::info!(session_id = %session_id, "Import session accepted");

    tokio::spawn(async move {
        if let Err(e) = execute_import(state, shared, cancel).await {
            tracing::error!(
                session_id = %session_id,
                error = %e,
                "Import background task failed"
            );
        }
    });

    Ok(Json(response))
}

/// GET /import/status/:session_id
pub async fn get_import_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<ImportStatusResponse>> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Import session not found: {}", session_id)))?
        .read()
        .await;

    Ok(Json(ImportStatusResponse {
        session_id: session.session_id,
        state: session.state,
        progress: session.progress.clone(),
        summary: session.summary.clone(),
        started_at: session.started_at,
        ended_at: session.ended_at,
    }))
}

/// POST /import/cancel/:session_id
///
/// Requests cancellation; the run stops at the next row boundary.
pub async fn cancel_import(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CancelImportResponse>> {
    let current_state = {
        let sessions = state.sessions.read().await;
        let session = sessions
            .get(&session_id)
            .ok_or_else(|| {
                ApiError::NotFound(format!("Import session not found: {}", session_id))
            })?
            .read()
            .await;
        session.state
    };

    if matches!(
        current_state,
        ImportState::Completed | ImportState::Cancelled | ImportState::Failed
    ) {
        return Err(ApiError::BadRequest(format!(
            "Import session already in terminal state: {:?}",
            current_state
        )));
    }

    let cancelled = {
        let tokens = state.cancel_tokens.read().await;
        match tokens.get(&session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    };

    tracing::info!(session_id = %session_id, "Import cancellation requested");

    Ok(Json(CancelImportResponse {
        session_id,
        state: current_state,
        cancel_requested: cancelled,
    }))
}

/// Background task wrapping one controller run.
///
/// Works on a local copy of the session and writes the final state back, so
/// the run never holds the shared lock across awaits; live progress flows
/// through the SSE stream.
async fn execute_import(
    state: AppState,
    shared: Arc<tokio::sync::RwLock<ImportSession>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let classifier_config =
        crate::config::resolve_classifier_config(&state.db, &state.toml_config).await?;

    let controller = ImportStreamController::new(
        Arc::new(CatalogRepository::new(state.db.clone())),
        Arc::new(MetaRepository::new(state.db.clone())),
        Arc::new(AttachmentRepository::new(state.db.clone())),
        Arc::new(TaskRepository::new(state.db.clone())),
        classifier_config,
        state.event_bus.clone(),
        cancel,
    );

    let mut session = { shared.read().await.clone() };
    let session_id = session.session_id;

    let outcome = controller.run(&mut session).await;

    if let Err(e) = &outcome {
        tracing::error!(session_id = %session_id, error = %e, "Import run errored");
        session.transition_to(ImportState::Failed);
    }

    *shared.write().await = session;
    state.cancel_tokens.write().await.remove(&session_id);

    outcome.map_err(Into::into)
}

/// Build import workflow routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/start", post(start_import))
        .route("/import/status/:session_id", get(get_import_status))
        .route("/import/cancel/:session_id", post(cancel_import))
}
