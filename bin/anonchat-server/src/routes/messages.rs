//! Message log routes: list, send, clear.

use std::sync::Arc;

use axum::extract::{FromRequest, Request, State};
use axum::http::{StatusCode, header};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::messages::{MessageView, MessagesResponse, SendMessageRequest};
use crate::state::AppState;

/// How many of the newest messages `GET /messages` returns.
pub const MESSAGES_WINDOW: usize = 100;

#[derive(OpenApi)]
#[openapi(
    paths(list_messages, send_message, clear_room),
    components(schemas(MessageView, MessagesResponse, SendMessageRequest))
)]
pub struct MessagesApi;

/// Register message routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/messages", get(list_messages))
        .route("/send", post(send_message))
        .route("/clear", post(clear_room))
}

/// Recent messages (`GET /messages`).
///
/// Returns up to the 100 newest messages, oldest first. Text is returned raw;
/// the page escapes it before inserting it into the DOM.
#[utoipa::path(
    get,
    path = "/messages",
    tag = "messages",
    responses(
        (status = 200, description = "Newest messages in chronological order", body = MessagesResponse),
        (status = 500, description = "Storage failure"),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessagesResponse>, ServerError> {
    let messages = state.room.list(MESSAGES_WINDOW).await?;
    Ok(Json(MessagesResponse {
        messages: messages.into_iter().map(MessageView::from).collect(),
    }))
}

/// Post a text message (`POST /send`).
///
/// Accepts a JSON or urlencoded body with `user` and `text`.
#[utoipa::path(
    post,
    path = "/send",
    tag = "messages",
    request_body = SendMessageRequest,
    responses(
        (status = 204, description = "Message stored"),
        (status = 400, description = "Missing text or malformed body"),
        (status = 500, description = "Storage failure"),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    JsonOrForm(req): JsonOrForm<SendMessageRequest>,
) -> Result<StatusCode, ServerError> {
    let stored = state.room.post(&req.user, &req.text).await?;
    debug!(id = stored.id, user = %stored.user, "message posted");
    Ok(StatusCode::NO_CONTENT)
}

/// Wipe the room for everyone (`POST /clear`).
///
/// Unauthenticated: any client may clear the room.
#[utoipa::path(
    post,
    path = "/clear",
    tag = "messages",
    responses(
        (status = 204, description = "Log and uploads cleared"),
        (status = 500, description = "Storage failure"),
    )
)]
pub async fn clear_room(State(state): State<Arc<AppState>>) -> Result<StatusCode, ServerError> {
    let report = state.room.clear().await?;
    if report.files_failed > 0 {
        warn!(files_failed = report.files_failed, "some uploads survived the clear");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Body extractor that takes either `application/x-www-form-urlencoded` or
/// JSON, chosen by the `Content-Type` header.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| {
                ct.to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            });

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ServerError::BadRequest(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ServerError::BadRequest(e.body_text()))?;
            Ok(Self(value))
        }
    }
}
