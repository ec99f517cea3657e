//! Flat-file implementation of [`MessageStore`].
//!
//! The whole log lives in memory and is written out as one JSON document after
//! every mutation: temp file in the same directory, fsync, rename, then a
//! best-effort fsync of the directory.
//!
//! The document carries the messages plus `next_id`, the next sequence number
//! to hand out, so ids keep growing across a clear and a restart. A bare JSON
//! array of messages is also accepted on load.
//!
//! # Crash behaviour
//!
//! Each mutation is applied to a copy of the log, the copy is written out, and
//! only then does it replace the in-memory log. A failed rewrite therefore
//! leaves both memory and file at the previous state and the caller gets the
//! error. If the process or the machine dies mid-rewrite, the file holds either
//! the previous log or the new one, never a mix: the mutation in flight (which
//! was never acknowledged) may be lost. The whole file is rewritten on every
//! append, so cost grows with the cap; use the SQLite backend for large caps.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::MessageStore;
use crate::error::StorageError;
use crate::fs::{parent_dir, sync_dir, write_synced};
use crate::message::{Message, NewMessage};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Log {
    next_id: i64,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Log(Log),
    Bare(Vec<Message>),
}

/// JSON-file-backed message log.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    max_messages: usize,
    log: Mutex<Log>,
}

impl JsonFileStore {
    /// Load the log at `path`, or start empty if the file does not exist.
    ///
    /// A file holding more than `max_messages` entries (e.g. after the cap
    /// was lowered) is trimmed in memory; the file catches up on the next
    /// mutation.
    pub async fn open(path: impl AsRef<Path>, max_messages: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let max_messages = max_messages.max(1);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut log = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Log::default(),
            Ok(bytes) => match serde_json::from_slice(&bytes)? {
                OnDisk::Log(log) => log,
                OnDisk::Bare(messages) => Log {
                    next_id: 0,
                    messages,
                },
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Log::default(),
            Err(e) => return Err(e.into()),
        };
        log.messages.sort_by_key(|m| m.id);
        trim_to(&mut log.messages, max_messages);
        let after_last = log.messages.last().map_or(1, |m| m.id + 1);
        log.next_id = log.next_id.max(after_last);

        info!(path = %path.display(), loaded = log.messages.len(), next_id = log.next_id, "message file opened");
        Ok(Self {
            path,
            max_messages,
            log: Mutex::new(log),
        })
    }

    async fn persist(&self, log: &Log) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(log)?;
        let dir = parent_dir(&self.path);
        let base = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("messages.json");
        let tmp_path = dir.join(format!(".{base}.tmp-{}", std::process::id()));

        write_synced(&tmp_path, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        sync_dir(dir).await;
        debug!(path = %self.path.display(), entries = log.messages.len(), "message file rewritten");
        Ok(())
    }
}

fn trim_to(messages: &mut Vec<Message>, max: usize) {
    if messages.len() > max {
        let excess = messages.len() - max;
        messages.drain(..excess);
    }
}

impl MessageStore for JsonFileStore {
    async fn append(&self, msg: NewMessage) -> Result<Message, StorageError> {
        let mut log = self.log.lock().await;
        let stored = msg.into_message(log.next_id);

        let mut next = log.clone();
        next.next_id += 1;
        next.messages.push(stored.clone());
        trim_to(&mut next.messages, self.max_messages);

        self.persist(&next).await?;
        *log = next;
        Ok(stored)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Message>, StorageError> {
        let log = self.log.lock().await;
        let start = log.messages.len().saturating_sub(limit);
        Ok(log.messages[start..].to_vec())
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let mut log = self.log.lock().await;
        let removed = log.messages.len() as u64;
        let next = Log {
            next_id: log.next_id,
            messages: Vec::new(),
        };
        self.persist(&next).await?;
        *log = next;
        Ok(removed)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.log.lock().await.messages.len() as u64)
    }

    fn max_messages(&self) -> usize {
        self.max_messages
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn msg(i: usize) -> NewMessage {
        NewMessage::new("tester", &format!("message {i}"), "2024-01-01 12:00:00")
    }

    fn read_log(path: &Path) -> Log {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn overflow_keeps_last_max_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("chat.json"), 4)
            .await
            .unwrap();
        for i in 0..9 {
            store.append(msg(i)).await.unwrap();
        }

        let texts: Vec<String> = store
            .recent(100)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["message 5", "message 6", "message 7", "message 8"]);
    }

    #[tokio::test]
    async fn every_append_is_on_disk_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        let store = JsonFileStore::open(&path, 10).await.unwrap();
        store.append(msg(1)).await.unwrap();

        let on_disk = read_log(&path);
        assert_eq!(on_disk.messages.len(), 1);
        assert_eq!(on_disk.messages[0].text, "message 1");
        assert_eq!(on_disk.next_id, on_disk.messages[0].id + 1);
    }

    #[tokio::test]
    async fn rewrite_leaves_only_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        let store = JsonFileStore::open(&path, 10).await.unwrap();
        for i in 0..5 {
            store.append(msg(i)).await.unwrap();
        }
        store.clear().await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["chat.json"]);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn reopen_continues_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.json");
        let last = {
            let store = JsonFileStore::open(&path, 10).await.unwrap();
            store.append(msg(1)).await.unwrap();
            store.append(msg(2)).await.unwrap()
        };

        let store = JsonFileStore::open(&path, 10).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        let next = store.append(msg(3)).await.unwrap();
        assert_eq!(next.id, last.id + 1);
    }

    #[tokio::test]
    async fn ids_keep_growing_across_clear_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        let before = {
            let store = JsonFileStore::open(&path, 10).await.unwrap();
            for i in 0..3 {
                store.append(msg(i)).await.unwrap();
            }
            let last = store.append(msg(3)).await.unwrap();
            store.clear().await.unwrap();
            last
        };

        let store = JsonFileStore::open(&path, 10).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        let after = store.append(msg(4)).await.unwrap();
        assert!(after.id > before.id, "{} <= {}", after.id, before.id);
    }

    #[tokio::test]
    async fn bare_array_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        let legacy = vec![NewMessage::new("old", "from before", "2024-01-01 00:00:00").into_message(7)];
        std::fs::write(&path, serde_json::to_vec(&legacy).unwrap()).unwrap();

        let store = JsonFileStore::open(&path, 10).await.unwrap();
        assert_eq!(store.recent(10).await.unwrap(), legacy);
        assert_eq!(store.append(msg(1)).await.unwrap().id, 8);
    }

    #[tokio::test]
    async fn reopen_with_lower_cap_trims_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        {
            let store = JsonFileStore::open(&path, 10).await.unwrap();
            for i in 0..6 {
                store.append(msg(i)).await.unwrap();
            }
        }

        let store = JsonFileStore::open(&path, 3).await.unwrap();
        let texts: Vec<String> = store
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["message 3", "message 4", "message 5"]);
    }

    #[tokio::test]
    async fn clear_rewrites_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        let store = JsonFileStore::open(&path, 10).await.unwrap();
        store.append(msg(1)).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.recent(10).await.unwrap().is_empty());
        assert!(read_log(&path).messages.is_empty());
    }

    #[tokio::test]
    async fn failed_rewrite_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        let store = JsonFileStore::open(&path, 10).await.unwrap();
        store.append(msg(1)).await.unwrap();

        // A directory where the log file should be makes the rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let err = store.append(msg(2)).await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        let texts: Vec<String> = store
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["message 1"]);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileStore::open(&path, 10).await.unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }
}
