use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 10;

/// An image part received with a create or update request, not yet on disk.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Writes uploaded images into a directory that is served under `/uploads`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists the image and returns the generated filename.
    #[instrument(skip(self, image), fields(size = image.bytes.len()))]
    pub async fn save(&self, image: &UploadedImage) -> io::Result<String> {
        fs::create_dir_all(&self.dir).await?;

        let filename = stored_name(image.file_name.as_deref(), Utc::now());
        fs::write(self.dir.join(&filename), &image.bytes).await?;

        info!(filename = %filename, "Stored uploaded image");
        Ok(filename)
    }

    /// Removes a stored image; failures are only logged.
    pub async fn discard(&self, filename: &str) {
        if let Err(e) = fs::remove_file(self.dir.join(filename)).await {
            warn!(filename = %filename, error = %e, "Failed to remove orphaned upload");
        }
    }
}

/// `<unix-millis>-<uuid>[.<ext>]`, keeping only an alphanumeric extension.
fn stored_name(original: Option<&str>, now: DateTime<Utc>) -> String {
    let extension = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!(
        "{}-{}{}",
        now.timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_keeps_safe_extension() {
        let now = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();

        let name = stored_name(Some("Poster.PNG"), now);
        assert!(name.starts_with("1700000000000-"));
        assert!(name.ends_with(".png"));

        let name = stored_name(Some("../../etc/passwd"), now);
        assert!(!name.contains('/'));
        assert!(!name.contains('.'));

        let name = stored_name(Some("shell.p$p"), now);
        assert!(!name.contains('.'));

        assert_ne!(stored_name(None, now), stored_name(None, now));
    }

    #[tokio::test]
    async fn test_save_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));

        let image = UploadedImage {
            file_name: Some("cover.jpg".into()),
            content_type: Some("image/jpeg".into()),
            bytes: Bytes::from_static(b"\xff\xd8\xff"),
        };

        let filename = store.save(&image).await.unwrap();
        let path = store.dir().join(&filename);
        assert_eq!(fs::read(&path).await.unwrap(), b"\xff\xd8\xff");

        store.discard(&filename).await;
        assert!(!path.exists());
    }
}
