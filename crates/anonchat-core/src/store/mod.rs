//! Message store abstraction.
//!
//! [`MessageStore`] is the bounded, append-only log behind the chat room.
//! Two backends exist: [`sqlite::SqliteStore`] (one relational table) and
//! [`json::JsonFileStore`] (a flat JSON array rewritten on every mutation).
//! [`AnyStore`] picks one from a URL at startup.
//!
//! Trait methods use `impl Future` in their signatures so no `async-trait`
//! crate is required.

pub mod json;
pub mod sqlite;

use std::future::Future;

use crate::error::{ChatError, StorageError};
use crate::message::{Message, NewMessage};

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

/// Default number of messages the room retains.
pub const MAX_MESSAGES: usize = 3000;

/// An ordered message log capped at [`MessageStore::max_messages`] entries.
///
/// Implementations must persist each mutation before the returned future
/// resolves. Callers are expected to serialize mutations (see
/// [`crate::room::ChatRoom`]); the store itself only guarantees that a single
/// call leaves the log consistent.
pub trait MessageStore: Send + Sync + 'static {
    /// Append `msg`, then evict the oldest entries until the log is back at
    /// the cap. Returns the stored message with its sequence number.
    fn append(
        &self,
        msg: NewMessage,
    ) -> impl Future<Output = Result<Message, StorageError>> + Send;

    /// Up to `limit` most recent messages, oldest first.
    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Message>, StorageError>> + Send;

    /// Remove every message. Returns how many were removed.
    fn clear(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;

    /// Number of messages currently retained.
    fn count(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;

    /// The retention cap.
    fn max_messages(&self) -> usize;
}

/// Runtime-selected backend.
#[derive(Debug)]
pub enum AnyStore {
    Sqlite(SqliteStore),
    Json(JsonFileStore),
}

impl AnyStore {
    /// Open the backend named by `url`.
    ///
    /// - `sqlite://chat_log.db`, `sqlite::memory:` → [`SqliteStore`]
    /// - `json://chat_log.json` → [`JsonFileStore`]
    pub async fn open(url: &str, max_messages: usize) -> Result<Self, ChatError> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite(SqliteStore::connect(url, max_messages).await?))
        } else if let Some(path) = url.strip_prefix("json://") {
            if path.is_empty() {
                return Err(ChatError::Config("json:// store URL has no path".into()));
            }
            Ok(Self::Json(JsonFileStore::open(path, max_messages).await?))
        } else {
            Err(ChatError::Config(format!(
                "unsupported store URL '{url}'; expected sqlite:... or json://<path>"
            )))
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Json(_) => "json",
        }
    }
}

impl MessageStore for AnyStore {
    async fn append(&self, msg: NewMessage) -> Result<Message, StorageError> {
        match self {
            Self::Sqlite(s) => s.append(msg).await,
            Self::Json(s) => s.append(msg).await,
        }
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Message>, StorageError> {
        match self {
            Self::Sqlite(s) => s.recent(limit).await,
            Self::Json(s) => s.recent(limit).await,
        }
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        match self {
            Self::Sqlite(s) => s.clear().await,
            Self::Json(s) => s.clear().await,
        }
    }

    async fn count(&self) -> Result<u64, StorageError> {
        match self {
            Self::Sqlite(s) => s.count().await,
            Self::Json(s) => s.count().await,
        }
    }

    fn max_messages(&self) -> usize {
        match self {
            Self::Sqlite(s) => s.max_messages(),
            Self::Json(s) => s.max_messages(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn open_selects_backend_from_url() {
        let dir = tempfile::tempdir().unwrap();

        let sqlite_url = format!("sqlite://{}", dir.path().join("chat.db").display());
        let store = AnyStore::open(&sqlite_url, 10).await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");

        let json_url = format!("json://{}", dir.path().join("chat.json").display());
        let store = AnyStore::open(&json_url, 10).await.unwrap();
        assert_eq!(store.backend_name(), "json");
        assert_eq!(store.max_messages(), 10);
    }

    #[tokio::test]
    async fn open_rejects_unknown_scheme() {
        let err = AnyStore::open("postgres://localhost/chat", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }
}
