//! Liveness check that also reports the room's store.

use std::sync::Arc;

use anonchat_core::{ChatError, MessageStore};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthResponse)))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"ok"` when the store answered.
    pub status: &'static str,
    pub version: &'static str,
    /// `sqlite` or `json`.
    pub backend: &'static str,
    /// Messages currently retained.
    pub messages: u64,
    pub max_messages: usize,
}

/// `GET /health`: 200 with store stats, or 500 when the store cannot be read.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 500, description = "Store failure"),
    )
)]
pub async fn get_health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ServerError> {
    let store = state.room.store();
    let messages = store.count().await.map_err(ChatError::from)?;
    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: store.backend_name(),
        messages,
        max_messages: store.max_messages(),
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn health_reports_backend_and_retained_count() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store_url: format!("json://{}", dir.path().join("chat.json").display()),
            upload_dir: dir.path().join("uploads").display().to_string(),
            max_messages: 5,
            ..Config::default()
        };
        let state = Arc::new(AppState::open(config).await.unwrap());
        state.room.post("bob", "one").await.unwrap();
        state.room.post("bob", "two").await.unwrap();

        let Json(body) = get_health(State(state)).await.unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.backend, "json");
        assert_eq!(body.messages, 2);
        assert_eq!(body.max_messages, 5);
        assert!(!body.version.is_empty());
    }
}
