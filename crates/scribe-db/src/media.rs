//! Media store backends.
//!
//! - [`FilesystemMediaStore`] writes objects under a local directory and
//!   returns URLs below a configured public prefix.
//! - [`HttpMediaStore`] posts objects to a Cloudinary-compatible upload
//!   endpoint and returns the `secure_url` it replies with.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use scribe_core::{Error, MediaStore, Result, UploadedFile};

/// File extension for a stored object, by content type.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/ogg" => "ogv",
        "video/3gpp" => "3gp",
        "video/3gpp2" => "3g2",
        "video/x-msvideo" => "avi",
        "video/x-matroska" => "mkv",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "audio/wav" => "wav",
        "audio/webm" => "weba",
        "audio/aac" => "aac",
        "audio/mp4" => "m4a",
        "audio/3gpp" => "3gp",
        "audio/3gpp2" => "3g2",
        "audio/x-ms-wma" => "wma",
        _ => "bin",
    }
}

// =============================================================================
// FILESYSTEM
// =============================================================================

/// Local directory media store.
///
/// Object key format: `{uuidv7}.{ext}`, flat under `base_path`.
pub struct FilesystemMediaStore {
    base_path: PathBuf,
    public_url: String,
}

impl FilesystemMediaStore {
    pub fn new(base_path: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    /// Object key for a URL this store issued, if it did.
    fn key_for(&self, url: &str) -> Option<String> {
        let key = url.strip_prefix(&self.public_url)?.strip_prefix('/')?;
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return None;
        }
        Some(key.to_string())
    }

    /// Check the directory is writable before serving traffic.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.base_path, e))?;

        let probe = self.base_path.join(".health-check");
        fs::write(&probe, b"media-health-check")
            .await
            .map_err(|e| format!("write({:?}): {}", probe, e))?;
        fs::remove_file(&probe)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", probe, e))?;
        Ok(())
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    async fn upload(&self, file: &UploadedFile) -> Result<String> {
        let key = format!("{}.{}", Uuid::now_v7(), extension_for(&file.content_type));
        let full_path = self.base_path.join(&key);

        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            warn!(
                subsystem = "media",
                component = "filesystem",
                error = %e,
                "create_dir_all failed"
            );
            Error::Storage(e.to_string())
        })?;

        // temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut out = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        out.write_all(&file.data)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        out.sync_all()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        drop(out);
        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(subsystem = "media", component = "filesystem", error = %e, "rename failed");
            Error::Storage(e.to_string())
        })?;

        debug!(
            subsystem = "media",
            component = "filesystem",
            op = "upload",
            bytes = file.size(),
            key = %key,
            "Stored media object"
        );
        Ok(format!("{}/{}", self.public_url, key))
    }

    async fn discard(&self, url: &str) -> Result<()> {
        let Some(key) = self.key_for(url) else {
            debug!(
                subsystem = "media",
                component = "filesystem",
                url = %url,
                "Not a local object, skipping discard"
            );
            return Ok(());
        };
        match fs::remove_file(self.base_path.join(&key)).await {
            Ok(()) => {
                debug!(
                    subsystem = "media",
                    component = "filesystem",
                    op = "discard",
                    key = %key,
                    "Removed media object"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }
}

// =============================================================================
// HTTP UPLOAD SERVICE
// =============================================================================

/// Upload service reply; only the secure URL is used.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Remote media store speaking the Cloudinary unsigned-upload protocol.
pub struct HttpMediaStore {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: Option<String>,
    destroy_url: Option<String>,
    timeout_secs: u64,
}

impl HttpMediaStore {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.into(),
            upload_preset: None,
            destroy_url: None,
            timeout_secs: 120,
        }
    }

    pub fn with_upload_preset(mut self, preset: Option<String>) -> Self {
        self.upload_preset = preset;
        self
    }

    /// Endpoint accepting `{"url": ...}` to remove an object. Without one,
    /// discard is a no-op.
    pub fn with_destroy_url(mut self, url: Option<String>) -> Self {
        self.destroy_url = url;
        self
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn upload(&self, file: &UploadedFile) -> Result<String> {
        let file_name = file
            .file_name
            .clone()
            .unwrap_or_else(|| format!("upload.{}", extension_for(&file.content_type)));

        let part = reqwest::multipart::Part::bytes(file.data.clone())
            .file_name(file_name)
            .mime_str(&file.content_type)
            .map_err(|e| Error::Storage(format!("Failed to create multipart: {}", e)))?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(preset) = &self.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Upload service returned {}: {}",
                status, body
            )));
        }

        let reply: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Storage(format!("Failed to parse upload response: {}", e)))?;

        debug!(
            subsystem = "media",
            component = "http",
            op = "upload",
            bytes = file.size(),
            "Uploaded media object"
        );
        Ok(reply.secure_url)
    }

    async fn discard(&self, url: &str) -> Result<()> {
        let Some(destroy_url) = &self.destroy_url else {
            debug!(
                subsystem = "media",
                component = "http",
                url = %url,
                "No destroy endpoint configured"
            );
            return Ok(());
        };

        let response = self
            .client
            .post(destroy_url)
            .json(&serde_json::json!({ "url": url }))
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Destroy request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(Error::Storage(format!("Destroy endpoint returned {}", status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> UploadedFile {
        UploadedFile::new("files", Some("a.png".into()), "image/png", vec![1, 2, 3, 4])
    }

    #[tokio::test]
    async fn test_filesystem_upload_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemMediaStore::new(dir.path(), "http://localhost:3000/media/");

        let url = store.upload(&png()).await.unwrap();
        assert!(url.starts_with("http://localhost:3000/media/"));
        assert!(url.ends_with(".png"));

        let key = url.rsplit('/').next().unwrap();
        let stored = fs::read(dir.path().join(key)).await.unwrap();
        assert_eq!(stored, vec![1, 2, 3, 4]);

        store.discard(&url).await.unwrap();
        assert!(!dir.path().join(key).exists());

        // Second discard of the same object is fine.
        store.discard(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_filesystem_discard_ignores_foreign_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemMediaStore::new(dir.path(), "http://localhost:3000/media");

        store
            .discard("https://cdn.example.com/other.png")
            .await
            .unwrap();
        store
            .discard("http://localhost:3000/media/../secret")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_filesystem_validate() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemMediaStore::new(dir.path().join("nested"), "http://x/media");
        store.validate().await.unwrap();
        assert!(dir.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn test_http_discard_without_endpoint_is_noop() {
        let store = HttpMediaStore::new("http://127.0.0.1:9/upload");
        store.discard("https://cdn/x.png").await.unwrap();
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("video/quicktime"), "mov");
        assert_eq!(extension_for("application/x-unknown"), "bin");
    }
}
