//! The chat room: one message log plus one upload directory.
//!
//! [`ChatRoom`] is the only thing HTTP handlers touch. Every mutation of the
//! log or the upload directory holds the write half of a single
//! [`tokio::sync::RwLock`]; reads hold the read half, so they can overlap
//! with each other but never see a half-applied append, upload or clear.

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ChatError, Result};
use crate::message::{FILE_SENTINEL, Message, NewMessage, timestamp_now};
use crate::store::{AnyStore, MessageStore};
use crate::upload::{UploadDir, content_type_for, extension_allowed, sanitize_filename};

/// A file part received from a client, not yet validated.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename exactly as the client sent it.
    pub file_name: String,
    pub bytes: Bytes,
}

/// A stored attachment read back for serving.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// What a [`ChatRoom::clear`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub messages_removed: u64,
    pub files_removed: usize,
    /// Files that could not be deleted; they are left in place.
    pub files_failed: usize,
}

/// The single shared room.
#[derive(Debug)]
pub struct ChatRoom<S = AnyStore> {
    store: S,
    uploads: UploadDir,
    gate: RwLock<()>,
}

impl<S: MessageStore> ChatRoom<S> {
    pub fn new(store: S, uploads: UploadDir) -> Self {
        Self {
            store,
            uploads,
            gate: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn uploads(&self) -> &UploadDir {
        &self.uploads
    }

    /// Append a message with an explicit timestamp.
    pub async fn append(&self, user: &str, text: &str, time: impl Into<String>) -> Result<Message> {
        let _guard = self.gate.write().await;
        let stored = self.store.append(NewMessage::new(user, text, time)).await?;
        debug!(id = stored.id, "message appended");
        Ok(stored)
    }

    /// Append a text message stamped with the current time.
    pub async fn post(&self, user: &str, text: &str) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(ChatError::InvalidRequest("Message text is required".into()));
        }
        self.append(user, text, timestamp_now()).await
    }

    /// Up to `limit` most recent messages, oldest first.
    pub async fn list(&self, limit: usize) -> Result<Vec<Message>> {
        let _guard = self.gate.read().await;
        Ok(self.store.recent(limit).await?)
    }

    /// Wipe the log and every uploaded file.
    ///
    /// File deletion is best effort; the report says how many were left.
    pub async fn clear(&self) -> Result<ClearReport> {
        let _guard = self.gate.write().await;
        let messages_removed = self.store.clear().await?;
        let files = self.uploads.clear_all().await;
        let report = ClearReport {
            messages_removed,
            files_removed: files.removed,
            files_failed: files.failed,
        };
        info!(
            messages_removed,
            files_removed = files.removed,
            files_failed = files.failed,
            "room cleared"
        );
        Ok(report)
    }

    /// Validate and store an attachment, then post the `/file/<name>` message
    /// that references it.
    ///
    /// Nothing is written and the log is untouched unless every check passes.
    pub async fn upload(&self, file: Option<UploadedFile>, user: &str) -> Result<Message> {
        let file = file.ok_or_else(|| ChatError::InvalidRequest("No file part".into()))?;
        if file.file_name.trim().is_empty() {
            return Err(ChatError::InvalidRequest("No file selected".into()));
        }
        let limit = self.uploads.max_bytes();
        if file.bytes.len() > limit {
            return Err(ChatError::PayloadTooLarge { limit });
        }
        let name = sanitize_filename(&file.file_name);
        if name.is_empty() {
            return Err(ChatError::InvalidRequest("Invalid file name".into()));
        }
        if !extension_allowed(&file.file_name) {
            return Err(ChatError::UnsupportedType("File type not allowed".into()));
        }
        // Sanitizing can eat the extension, e.g. `é.txt` -> `txt`.
        if !extension_allowed(&name) {
            return Err(ChatError::InvalidRequest("Invalid file name".into()));
        }

        let _guard = self.gate.write().await;
        self.uploads.save(&name, &file.bytes).await?;
        let text = format!("{FILE_SENTINEL}{name}");
        let stored = match self
            .store
            .append(NewMessage::new(user, &text, timestamp_now()))
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                // No message will point at the file, so it must not stay behind.
                if let Err(rm) = self.uploads.remove(&name).await {
                    warn!(stored_name = %name, error = %rm, "failed to remove orphaned upload");
                }
                return Err(e.into());
            }
        };
        info!(
            original_name = %file.file_name,
            stored_name = %name,
            size_bytes = file.bytes.len(),
            "upload stored"
        );
        Ok(stored)
    }

    /// Read back a stored attachment by its sanitized name.
    ///
    /// Any name that sanitizing would alter cannot refer to a stored file and
    /// is reported as not found.
    pub async fn read_file(&self, name: &str) -> Result<StoredFile> {
        let clean = sanitize_filename(name);
        if clean.is_empty() || clean != name {
            return Err(ChatError::NotFound(name.to_owned()));
        }

        let _guard = self.gate.read().await;
        match self.uploads.read(&clean).await {
            Ok(bytes) => Ok(StoredFile {
                content_type: content_type_for(&clean),
                name: clean,
                bytes,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ChatError::NotFound(name.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
