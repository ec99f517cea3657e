//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Pages (`/`, `/noscript`)
//! - Message routes (`/messages`, `/send`, `/clear`)
//! - Attachment routes (`/upload`, `/file/{name}`)
//! - Health route and, optionally, the OpenAPI document

pub mod doc;
mod health;
pub mod messages;
pub mod pages;
pub mod upload;

use std::sync::Arc;

use axum::routing::get;
use axum::{Router, middleware};
use tower::ServiceBuilder;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(pages::router())
        .merge(messages::router())
        .merge(upload::router(state.config.max_upload_bytes))
        .merge(health::router());

    if state.config.enable_openapi {
        app = app.route("/api-docs/openapi.json", get(doc::openapi_json));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state.config)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
