use serde::{Deserialize, Serialize};

/// Display name used when a client leaves the name blank.
pub const DEFAULT_USER: &str = "Anon";

/// Prefix of the sentinel text that marks a message as a file attachment.
pub const FILE_SENTINEL: &str = "/file/";

/// Timestamp layout: fixed width, so lexical order is chronological order.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored chat message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sequence number assigned by the store; insertion order.
    pub id: i64,
    /// Free-text display name. Untrusted: escape before embedding in HTML.
    pub user: String,
    /// Message body, or `/file/<name>` for an attachment.
    pub text: String,
    pub time: String,
}

impl Message {
    /// The stored filename if this message is an attachment sentinel.
    pub fn attachment(&self) -> Option<&str> {
        self.text
            .strip_prefix(FILE_SENTINEL)
            .filter(|name| !name.is_empty())
    }
}

/// A message that has not been assigned a sequence number yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub user: String,
    pub text: String,
    pub time: String,
}

impl NewMessage {
    /// Trims both fields and substitutes [`DEFAULT_USER`] for a blank name.
    pub fn new(user: &str, text: &str, time: impl Into<String>) -> Self {
        Self {
            user: normalize_user(user),
            text: text.trim().to_owned(),
            time: time.into(),
        }
    }

    pub(crate) fn into_message(self, id: i64) -> Message {
        Message {
            id,
            user: self.user,
            text: self.text,
            time: self.time,
        }
    }
}

/// Current local time formatted with [`TIME_FORMAT`].
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

fn normalize_user(user: &str) -> String {
    let user = user.trim();
    if user.is_empty() {
        DEFAULT_USER.to_owned()
    } else {
        user.to_owned()
    }
}
