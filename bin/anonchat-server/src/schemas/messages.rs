use anonchat_core::Message;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A message as returned by `GET /messages`.
///
/// Fields are raw client text; the page escapes them before DOM insertion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageView {
    pub user: String,
    /// Message body, or `/file/<name>` for an attachment.
    pub text: String,
    /// `YYYY-MM-DD HH:MM:SS`, server local time.
    pub time: String,
}

impl From<Message> for MessageView {
    fn from(m: Message) -> Self {
        Self {
            user: m.user,
            text: m.text,
            time: m.time,
        }
    }
}

/// Response body for `GET /messages`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessagesResponse {
    /// Most recent messages, oldest first.
    pub messages: Vec<MessageView>,
}

/// Request body for `POST /send` (JSON or urlencoded form).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Display name; blank means "Anon".
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
}

/// Multipart body for `POST /upload` (documentation only).
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct UploadForm {
    /// The attachment; extension must be png, jpg, jpeg, gif, pdf or txt.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Display name; blank means "Anon".
    pub user: Option<String>,
}
