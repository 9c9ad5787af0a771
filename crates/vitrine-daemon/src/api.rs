//! REST API handlers

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vitrine_core::{SceneDocument, EXPORT_FILE_NAME};
use vitrine_scene::SceneHost;

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> axum::response::Response {
    warn!(error = %e, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(format!("{}: {}", context, e))),
    )
        .into_response()
}

/// Stored JSON of the configured slot
async fn stored_json(state: &AppState) -> Result<Option<String>, axum::response::Response> {
    state
        .store
        .lock()
        .await
        .read_raw(&state.config.store.slot)
        .map_err(|e| internal_error("Failed to read scene", e))
}

/// Get the saved scene document
pub async fn get_scene(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match stored_json(&state).await {
        Ok(Some(json)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("No scene saved")),
        )
            .into_response(),
        Err(response) => response,
    }
}

/// Validate and save a scene document
pub async fn save_scene(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let doc = match SceneDocument::from_json(&body) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "Rejected scene document");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(format!("Invalid scene: {}", e))),
            )
                .into_response();
        }
    };

    let result = state
        .store
        .lock()
        .await
        .save(&state.config.store.slot, &doc);
    match result {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => internal_error("Failed to save scene", e),
    }
}

/// Download the saved scene as `3d.json`
pub async fn export_scene(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match stored_json(&state).await {
        Ok(Some(json)) => {
            let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                json,
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Nothing to export, save first")),
        )
            .into_response(),
        Err(response) => response,
    }
}

/// Data keys the live scene is bound to
pub async fn scene_keys(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let keys = state.viewer.lock().await.keys();
    Json(keys)
}

/// The live scene, with current data applied, as a document
pub async fn live_scene(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let doc = state.viewer.lock().await.scene().save();
    Json(doc)
}

/// Reload the live scene from the saved slot
pub async fn reload_scene(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.reload().await {
        Ok(report) => {
            info!(added = report.added, failed = report.failed, "Scene reloaded");
            Json(serde_json::json!({
                "added": report.added,
                "failed": report.failed,
                "ready": report.ready,
            }))
            .into_response()
        }
        Err(e) => internal_error("Failed to reload scene", e),
    }
}

/// Apply a live data snapshot and forward it to viewers
pub async fn push_data(
    State(state): State<Arc<AppState>>,
    Json(data): Json<Value>,
) -> impl IntoResponse {
    match state.push_data(data).await {
        Some(report) => Json(serde_json::json!({
            "changed": report.changed,
            "regenerated": report.regenerated.len(),
            "replaced": report.replaced.len(),
        }))
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Data must be a JSON object")),
        )
            .into_response(),
    }
}
