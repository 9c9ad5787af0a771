//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::state::AppState;
use crate::ws;

/// Build the router for `state`
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // API routes
        .route("/api/scene", get(api::get_scene).post(api::save_scene))
        .route("/api/scene/export", get(api::export_scene))
        .route("/api/scene/keys", get(api::scene_keys))
        .route("/api/scene/live", get(api::live_scene))
        .route("/api/scene/reload", post(api::reload_scene))
        .route("/api/data", post(api::push_data))
        // WebSocket for live data
        .route("/ws", get(ws::websocket_handler))
        // Fonts, models, svgs
        .nest_service("/assets", ServeDir::new(&state.config.assets.path))
        // Static frontend
        .fallback_service(ServeDir::new(&state.config.assets.web))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the web server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{bound_doc, test_config};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn app() -> (TempDir, Arc<AppState>, Router) {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(test_config(&dir)).await.unwrap();
        let app = router(state.clone());
        (dir, state, app)
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_export_requires_save() {
        let (_dir, _state, app) = app().await;
        let response = app.clone().oneshot(get_request("/api/scene")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get_request("/api/scene/export")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("save first"));
    }

    #[tokio::test]
    async fn test_save_then_export_exact_json() {
        let (_dir, _state, app) = app().await;
        let json = bound_doc().to_json().unwrap();

        let response = app
            .clone()
            .oneshot(post_json("/api/scene", json.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["objects"], 1);

        let response = app.oneshot(get_request("/api/scene/export")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"3d.json\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], json.as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_scene_rejected() {
        let (_dir, _state, app) = app().await;
        let response = app
            .clone()
            .oneshot(post_json("/api/scene", "{\"list\": 3}".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(get_request("/api/scene")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reload_then_live_data() {
        let (_dir, _state, app) = app().await;
        let json = bound_doc().to_json().unwrap();
        app.clone().oneshot(post_json("/api/scene", json)).await.unwrap();

        let response = app
            .clone()
            .oneshot(post_json("/api/scene/reload", String::new()))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["added"], 1);

        let response = app.clone().oneshot(get_request("/api/scene/keys")).await.unwrap();
        assert_eq!(body_json(response).await, json!(["id", "level"]));

        let response = app
            .clone()
            .oneshot(post_json("/api/data", json!({"level": 2}).to_string()))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["changed"], 1);

        let response = app.clone().oneshot(get_request("/api/scene/live")).await.unwrap();
        let live = body_json(response).await;
        assert_eq!(live["list"][0]["position"]["y"], 2.0);

        let response = app
            .oneshot(post_json("/api/data", "[1]".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
