//! anonchat-core – the state behind a single anonymous chat room.
//!
//! - [`store`]: the bounded, append-only message log ([`MessageStore`]) with a
//!   SQLite backend and a flat-file JSON backend.
//! - [`upload`]: the upload directory, filename sanitizing and the extension
//!   allow-list.
//! - [`room`]: [`ChatRoom`], which owns both behind one lock and is what HTTP
//!   handlers talk to.

pub mod error;
mod fs;
pub mod message;
pub mod room;
pub mod store;
pub mod upload;

pub use error::{ChatError, StorageError};
pub use message::{DEFAULT_USER, Message, NewMessage, timestamp_now};
pub use room::{ChatRoom, ClearReport, StoredFile, UploadedFile};
pub use store::{AnyStore, JsonFileStore, MAX_MESSAGES, MessageStore, SqliteStore};
pub use upload::{ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES, UploadDir, sanitize_filename};
