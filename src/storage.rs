// Upload store: the on-disk side of unit and broker pictures
//
// Rows reference files as `uploads/<filename>`. The database is the primary
// store; files are written before a row exists and removed only after the
// row is gone, so a crash can leave orphaned files but never a row that
// points at a file we deleted.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

/// Prefix stored in the database in front of every file name
pub const UPLOAD_PREFIX: &str = "uploads";

/// Errors raised by the upload store
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid upload path: {0}")]
    InvalidPath(String),
}

/// Outcome of a best-effort cleanup
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    /// Relative paths that could not be removed
    pub failed: Vec<String>,
}

/// Filesystem-backed store for uploaded images
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the uploads directory if it does not exist yet
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Io {
                path: self.root.display().to_string(),
                source,
            })
    }

    /// Write `bytes` under `file_name` and return the relative path to store
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let relative = format!("{}/{}", UPLOAD_PREFIX, file_name);
        let target = self.resolve(&relative)?;

        self.ensure_root().await?;
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: relative.clone(),
                source,
            })?;

        debug!("Stored upload {} ({} bytes)", relative, bytes.len());
        Ok(relative)
    }

    /// Map a stored relative path to a file inside the uploads root.
    ///
    /// Only `uploads/<single file name>` is accepted.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let file_name = relative
            .strip_prefix(UPLOAD_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidPath(relative.to_string()))?;

        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(StorageError::InvalidPath(relative.to_string())),
        }
    }

    /// Remove a single stored file
    pub async fn remove(&self, relative: &str) -> Result<(), StorageError> {
        let target = self.resolve(relative)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|source| StorageError::Io {
                path: relative.to_string(),
                source,
            })
    }

    /// Remove every file in `paths`, logging and skipping failures
    pub async fn remove_all<S: AsRef<str>>(&self, paths: &[S]) -> CleanupReport {
        let mut report = CleanupReport::default();

        for path in paths {
            let path = path.as_ref();
            match self.remove(path).await {
                Ok(()) => report.removed += 1,
                Err(err) => {
                    warn!("Failed to delete upload {}: {}", path, err);
                    report.failed.push(path.to_string());
                }
            }
        }

        if !paths.is_empty() {
            info!(
                "Upload cleanup finished: {} removed, {} failed",
                report.removed,
                report.failed.len()
            );
        }
        report
    }
}

/// Name for a new unit image: `unit-<millis>-<random>.<ext>`
pub fn unit_file_name(original_name: Option<&str>) -> String {
    let suffix = rand::thread_rng().gen_range(0..1_000_000_000u32);
    format!(
        "unit-{}-{}{}",
        Utc::now().timestamp_millis(),
        suffix,
        extension_of(original_name)
    )
}

/// Name for a broker profile picture: `<firstname>-<millis>-profile.<ext>`
pub fn broker_picture_file_name(first_name: &str, original_name: Option<&str>) -> String {
    let mut stem: String = first_name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.trim_matches('_').is_empty() {
        stem = "broker".to_string();
    }

    format!(
        "{}-{}-profile{}",
        stem,
        Utc::now().timestamp_millis(),
        extension_of(original_name)
    )
}

/// `.ext` of the client's file name, lowercased; empty when unusable
fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_file_name_shape() {
        let name = unit_file_name(Some("Living Room.JPG"));
        assert!(name.starts_with("unit-"));
        assert!(name.ends_with(".jpg"));

        let parts: Vec<&str> = name.trim_end_matches(".jpg").split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(parts[2].parse::<u32>().unwrap() < 1_000_000_000);
    }

    #[test]
    fn test_unit_file_name_without_extension() {
        assert!(!unit_file_name(None).contains('.'));
        assert!(!unit_file_name(Some("noext")).contains('.'));
        assert!(!unit_file_name(Some("evil.ph/p")).ends_with(".ph/p"));
    }

    #[test]
    fn test_broker_picture_name_is_filesystem_safe() {
        let name = broker_picture_file_name("José ../Maria", Some("me.png"));
        assert!(name.ends_with("-profile.png"));
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));

        let fallback = broker_picture_file_name("   ", None);
        assert!(fallback.starts_with("broker-"));
    }

    #[test]
    fn test_resolve_rejects_escape_attempts() {
        let store = UploadStore::new("/srv/uploads");
        assert_eq!(
            store.resolve("uploads/unit-1-2.jpg").unwrap(),
            PathBuf::from("/srv/uploads/unit-1-2.jpg")
        );
        assert!(store.resolve("uploads/../etc/passwd").is_err());
        assert!(store.resolve("uploads/nested/file.jpg").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("uploads/").is_err());
        assert!(store.resolve("other/unit.jpg").is_err());
    }

    #[tokio::test]
    async fn test_save_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));

        let relative = store.save("unit-1-1.jpg", b"jpeg bytes").await.unwrap();
        assert_eq!(relative, "uploads/unit-1-1.jpg");
        let on_disk = store.resolve(&relative).unwrap();
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"jpeg bytes");

        store.remove(&relative).await.unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_remove_all_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let a = store.save("a.jpg", b"a").await.unwrap();
        let b = store.save("b.jpg", b"b").await.unwrap();
        let paths = vec![a.clone(), "uploads/missing.jpg".to_string(), b.clone()];

        let report = store.remove_all(&paths).await;
        assert_eq!(report.removed, 2);
        assert_eq!(report.failed, vec!["uploads/missing.jpg".to_string()]);
        assert!(!store.resolve(&a).unwrap().exists());
        assert!(!store.resolve(&b).unwrap().exists());
    }
}
