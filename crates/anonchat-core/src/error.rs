use thiserror::Error;

/// Errors returned by the chat room and its collaborators.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A required field or file part was missing or empty.
    #[error("{0}")]
    InvalidRequest(String),

    /// The uploaded file's extension is not on the allow-list.
    #[error("{0}")]
    UnsupportedType(String),

    /// The upload exceeds the configured size cap.
    #[error("payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The requested stored file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Durable storage (database, message file or upload directory) failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The store URL or another startup setting is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Low-level persistence failures, all surfaced as [`ChatError::Storage`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for ChatError {
    fn from(e: sqlx::Error) -> Self {
        ChatError::Storage(StorageError::Database(e))
    }
}

impl From<std::io::Error> for ChatError {
    fn from(e: std::io::Error) -> Self {
        ChatError::Storage(StorageError::Io(e))
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;
