//! SQLite implementation of [`MessageStore`].
//!
//! Uses [`sqlx`] with the `sqlite` feature. The `messages` table is created by
//! the embedded migration on [`SqliteStore::connect`].
//!
//! `sqlx::migrate!("./migrations")` resolves the path at compile time relative
//! to `CARGO_MANIFEST_DIR`, so the SQL is baked into the binary.
//!
//! The runtime-checked `sqlx::query` form is used so that no `DATABASE_URL`
//! is needed at compile time.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::debug;

use super::MessageStore;
use crate::error::StorageError;
use crate::message::{Message, NewMessage};

/// SQLite-backed message log.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    max_messages: usize,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and run pending migrations.
    ///
    /// `url` is a sqlx SQLite URL, e.g. `"sqlite://chat_log.db"` or
    /// `"sqlite::memory:"`.
    pub async fn connect(url: &str, max_messages: usize) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // Every pooled connection to `:memory:` would get its own empty database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            max_messages: max_messages.max(1),
        })
    }
}

impl MessageStore for SqliteStore {
    async fn append(&self, msg: NewMessage) -> Result<Message, StorageError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO messages (user, text, time) VALUES (?1, ?2, ?3)")
            .bind(&msg.user)
            .bind(&msg.text)
            .bind(&msg.time)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&mut *tx)
            .await?;
        let excess = count - cap_as_i64(self.max_messages);
        if excess > 0 {
            let evicted = sqlx::query(
                "DELETE FROM messages WHERE id IN \
                 (SELECT id FROM messages ORDER BY id ASC LIMIT ?1)",
            )
            .bind(excess)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            debug!(evicted, "trimmed oldest messages");
        }

        tx.commit().await?;
        Ok(msg.into_message(id))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Message>, StorageError> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, user, text, time FROM messages ORDER BY id DESC LIMIT ?1",
        )
        .bind(cap_as_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        // Fetched newest first; callers get chronological order.
        Ok(rows
            .into_iter()
            .rev()
            .map(|(id, user, text, time)| Message {
                id,
                user,
                text,
                time,
            })
            .collect())
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let removed = sqlx::query("DELETE FROM messages")
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    fn max_messages(&self) -> usize {
        self.max_messages
    }
}

fn cap_as_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod test {
    use super::*;

    async fn store(max: usize) -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("chat.db").display());
        let store = SqliteStore::connect(&url, max).await.unwrap();
        (dir, store)
    }

    fn msg(i: usize) -> NewMessage {
        NewMessage::new("tester", &format!("message {i}"), format!("2024-01-01 00:00:{:02}", i % 60))
    }

    #[tokio::test]
    async fn overflow_keeps_last_max_in_order() {
        let (_dir, store) = store(5).await;
        for i in 0..12 {
            store.append(msg(i)).await.unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 5);
        let texts: Vec<String> = store
            .recent(100)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        let expected: Vec<String> = (7..12).map(|i| format!("message {i}")).collect();
        assert_eq!(texts, expected);
    }

    #[tokio::test]
    async fn recent_returns_newest_window_oldest_first() {
        let (_dir, store) = store(50).await;
        for i in 0..10 {
            store.append(msg(i)).await.unwrap();
        }

        let window = store.recent(3).await.unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].text, "message 7");
        assert_eq!(window[2].text, "message 9");
        assert!(window.windows(2).all(|w| w[0].id < w[1].id));

        assert!(store.recent(0).await.unwrap().is_empty());
        assert_eq!(store.recent(usize::MAX).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn clear_empties_log_and_ids_keep_growing() {
        let (_dir, store) = store(50).await;
        let first = store.append(msg(1)).await.unwrap();
        store.append(msg(2)).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.recent(10).await.unwrap().is_empty());

        let after = store.append(msg(3)).await.unwrap();
        assert!(after.id > first.id);
    }

    #[tokio::test]
    async fn log_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("chat.db").display());
        {
            let store = SqliteStore::connect(&url, 10).await.unwrap();
            store.append(msg(1)).await.unwrap();
        }
        let store = SqliteStore::connect(&url, 10).await.unwrap();
        let messages = store.recent(10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].user, "tester");
    }

    #[tokio::test]
    async fn in_memory_url_works() {
        let store = SqliteStore::connect("sqlite::memory:", 2).await.unwrap();
        for i in 0..3 {
            store.append(msg(i)).await.unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
