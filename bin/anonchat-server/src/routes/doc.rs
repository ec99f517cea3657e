use axum::Json;
use utoipa::OpenApi;

use crate::routes::{health, messages, upload};

#[derive(OpenApi)]
#[openapi(info(
    title = "anonchat-server",
    description = "Single-room anonymous chat API",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(messages::MessagesApi::openapi());
    root.merge(upload::UploadApi::openapi());
    root.merge(health::HealthApi::openapi());
    root
}

/// `GET /api-docs/openapi.json`
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(get_docs())
}
