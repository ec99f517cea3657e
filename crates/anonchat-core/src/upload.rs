//! Upload directory and filename rules.
//!
//! Validation is extension-based only: the bytes are never sniffed, so an
//! allow-listed extension is the whole trust boundary.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fs::{sync_dir, write_synced};

/// Extensions (lower-case) accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "pdf", "txt"];

/// Default cap on an upload request (2 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Reduce a client-supplied filename to a safe, flat name.
///
/// Path separators turn into word breaks, runs of whitespace become `_`, and
/// anything outside `[A-Za-z0-9._-]` is dropped. Leading and trailing `.` and
/// `_` are stripped, so no result can be `..` or a hidden file.
///
/// The result may be empty; callers must reject that.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_owned()
}

/// Whether `name` ends in an allow-listed extension (case-insensitive).
pub fn extension_allowed(name: &str) -> bool {
    extension(name).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// MIME type used when serving a stored file back.
pub fn content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Outcome of [`UploadDir::clear_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearFiles {
    pub removed: usize,
    pub failed: usize,
}

/// The directory holding uploaded attachments.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadDir {
    /// Create `root` if needed.
    pub async fn open(root: impl Into<PathBuf>, max_bytes: usize) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root, max_bytes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// `name` must already be sanitized.
    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write `bytes` as `name`, replacing any file of the same name. The file
    /// and the directory entry are fsynced before this returns.
    pub async fn save(&self, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(name);
        write_synced(&path, bytes).await?;
        sync_dir(&self.root).await;
        debug!(path = %path.display(), size_bytes = bytes.len(), "stored upload");
        Ok(path)
    }

    /// Delete one stored file. A file that is already gone is not an error.
    pub async fn remove(&self, name: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    pub async fn read(&self, name: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path_for(name)).await
    }

    /// Delete every file in the directory.
    ///
    /// Best effort: a file that cannot be removed is logged and counted, and
    /// the sweep carries on with the rest.
    pub async fn clear_all(&self) -> ClearFiles {
        let mut outcome = ClearFiles::default();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.root.display(), error = %e, "cannot list upload directory");
                outcome.failed += 1;
                return outcome;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.root.display(), error = %e, "error while listing upload directory");
                    outcome.failed += 1;
                    break;
                }
            };
            let path = entry.path();
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat upload");
                    outcome.failed += 1;
                    continue;
                }
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => outcome.removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to delete upload; continuing");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn traversal_segments_are_flattened() {
        assert_eq!(sanitize_filename("../../etc/passwd.txt"), "etc_passwd.txt");
        assert_eq!(sanitize_filename("..\\..\\boot.ini.txt"), "boot.ini.txt");
        assert_eq!(sanitize_filename("/abs/path/photo.png"), "abs_path_photo.png");
    }

    #[test]
    fn unsafe_characters_are_dropped() {
        assert_eq!(sanitize_filename("my cool  file.pdf"), "my_cool_file.pdf");
        assert_eq!(sanitize_filename("a<b>|c?.gif"), "abc.gif");
        assert_eq!(sanitize_filename("ünïcode.txt"), "ncode.txt");
        assert_eq!(sanitize_filename(".hidden.txt"), "hidden.txt");
        assert_eq!(sanitize_filename(".."), "");
        assert_eq!(sanitize_filename("../"), "");
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(extension_allowed("photo.PNG"));
        assert!(extension_allowed("scan.Jpeg"));
        assert!(extension_allowed("notes.txt"));
        assert!(!extension_allowed("setup.exe"));
        assert!(!extension_allowed("archive.txt.exe"));
        assert!(!extension_allowed("txt"));
        assert!(!extension_allowed("noext."));
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }

    #[tokio::test]
    async fn save_overwrites_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::open(dir.path().join("uploads"), DEFAULT_MAX_UPLOAD_BYTES)
            .await
            .unwrap();

        uploads.save("a.txt", b"first").await.unwrap();
        uploads.save("a.txt", b"second").await.unwrap();
        assert_eq!(uploads.read("a.txt").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::open(dir.path().join("gone"), DEFAULT_MAX_UPLOAD_BYTES)
            .await
            .unwrap();
        std::fs::remove_dir(uploads.root()).unwrap();

        assert!(uploads.save("a.txt", b"data").await.is_err());
        assert!(!uploads.root().exists());
    }

    #[tokio::test]
    async fn remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::open(dir.path(), DEFAULT_MAX_UPLOAD_BYTES)
            .await
            .unwrap();
        uploads.save("a.txt", b"a").await.unwrap();

        uploads.remove("a.txt").await.unwrap();
        assert!(!dir.path().join("a.txt").exists());
        uploads.remove("a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn clear_all_removes_files_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::open(dir.path(), DEFAULT_MAX_UPLOAD_BYTES)
            .await
            .unwrap();
        uploads.save("a.txt", b"a").await.unwrap();
        uploads.save("b.png", b"b").await.unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();

        let outcome = uploads.clear_all().await;
        assert_eq!(outcome, ClearFiles { removed: 2, failed: 0 });
        let left: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(left.len(), 1);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn clear_all_on_missing_directory_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::open(dir.path().join("gone"), DEFAULT_MAX_UPLOAD_BYTES)
            .await
            .unwrap();
        std::fs::remove_dir(uploads.root()).unwrap();

        let outcome = uploads.clear_all().await;
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.failed, 1);
        assert!(logs_contain("cannot list upload directory"));
    }
}
