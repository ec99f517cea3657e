//! Attachment routes: multipart upload and download by stored name.

use std::sync::Arc;

use anonchat_core::{ChatError, UploadedFile};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::messages::UploadForm;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(upload_file, get_file), components(schemas(UploadForm)))]
pub struct UploadApi;

/// Register upload routes. The whole upload request is capped at
/// `max_upload_bytes`.
pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/file/{name}", get(get_file))
}

/// Upload an attachment (`POST /upload`).
///
/// Multipart fields: `file` (required) and `user`. The file is stored under a
/// sanitized name, overwriting any file of the same name, and a `/file/<name>`
/// message is posted to the room.
///
/// Only the extension is checked (png, jpg, jpeg, gif, pdf, txt); the bytes
/// are not sniffed.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 204, description = "File stored and message posted"),
        (status = 400, description = "No file part, empty or unusable filename"),
        (status = 413, description = "Upload exceeds the size cap"),
        (status = 415, description = "File type not allowed"),
        (status = 500, description = "Storage failure"),
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, ServerError> {
    let mut multipart = multipart.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let limit = state.room.uploads().max_bytes();

    let mut file: Option<UploadedFile> = None;
    let mut user = String::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let mut buf: Vec<u8> = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    buf.extend_from_slice(&chunk);
                    if buf.len() > limit {
                        return Err(ChatError::PayloadTooLarge { limit }.into());
                    }
                }
                debug!(file_name = %file_name, size_bytes = buf.len(), "received file part");
                file = Some(UploadedFile {
                    file_name,
                    bytes: Bytes::from(buf),
                });
            }
            Some("user") => {
                user = field.text().await.map_err(multipart_error)?;
            }
            other => debug!(field = ?other, "ignoring unknown multipart field"),
        }
    }

    state.room.upload(file, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Download a stored attachment (`GET /file/{name}`).
#[utoipa::path(
    get,
    path = "/file/{name}",
    tag = "files",
    params(("name" = String, Path, description = "Stored (sanitized) filename")),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "No such file"),
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ServerError> {
    let stored = state.room.read_file(&name).await?;
    Ok((
        [
            (header::CONTENT_TYPE, stored.content_type),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        stored.bytes,
    )
        .into_response())
}

fn multipart_error(e: MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(e.body_text())
    } else {
        ServerError::BadRequest(e.body_text())
    }
}
