//! Durable file writes shared by the JSON store and the upload directory.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Write `bytes` to `path` and fsync the file before returning.
///
/// On failure the partially written file is removed.
pub(crate) async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let result = async {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(path).await;
    }
    result
}

/// Fsync a directory so a rename or create inside it survives a crash.
///
/// Best effort: not every platform lets a directory be opened for syncing.
pub(crate) async fn sync_dir(dir: &Path) {
    match tokio::fs::File::open(dir).await {
        Ok(handle) => {
            if let Err(e) = handle.sync_all().await {
                debug!(dir = %dir.display(), error = %e, "directory fsync failed");
            }
        }
        Err(e) => debug!(dir = %dir.display(), error = %e, "cannot open directory for fsync"),
    }
}

/// Parent directory of `path`, or `.` for a bare filename.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
