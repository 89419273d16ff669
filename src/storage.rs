//! Object storage for uploaded plant media.
//!
//! Two backends: a hosted blob store reached over HTTP, and a local directory
//! served back under `/uploads` for development.

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix for every stored object.
pub const STORAGE_PREFIX: &str = "plants";

const BLOB_API_VERSION: &str = "7";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Store API error {0}: {1}")]
    Api(u16, String),

    #[error("Unexpected store response: {0}")]
    Parse(String),

    #[error("Store returned a non-absolute URL: {0}")]
    InvalidUrl(String),

    #[error("Refusing to write outside the upload directory: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A publicly readable object created by [`ObjectStore::put`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub url: String,
    pub pathname: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `pathname` with public read access.
    async fn put(
        &self,
        pathname: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StoreError>;
}

/// Build the storage key for an upload: `plants/{unix_millis}-{filename}`.
pub fn storage_key(now: DateTime<Utc>, filename: &str) -> String {
    let name: String = filename
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let name = if name.is_empty() || name.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        name
    };

    format!("{}/{}-{}", STORAGE_PREFIX, now.timestamp_millis(), name)
}

/// Declared content type if present, otherwise sniffed from the bytes.
pub fn resolve_content_type(declared: Option<&str>, bytes: &[u8]) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => infer::get(bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
    }
}

/// Accept only absolute http(s) URLs from a store.
pub fn ensure_absolute_url(url: &str) -> Result<(), StoreError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(StoreError::InvalidUrl(url.to_string())),
    }
}

/// Append `segments` and then the `/`-separated `pathname` to `base`,
/// percent-encoding each segment.
pub fn join_url(base: &str, segments: &[&str], pathname: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(base).map_err(|_| StoreError::InvalidUrl(base.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments)
        .extend(pathname.split('/'));
    Ok(url)
}

/// Hosted blob store client.
pub struct BlobStore {
    http_client: reqwest::Client,
    api_url: String,
    token: String,
}

impl BlobStore {
    pub fn new(api_url: String, token: String, timeout: Duration) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl ObjectStore for BlobStore {
    async fn put(
        &self,
        pathname: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StoreError> {
        let url = join_url(&self.api_url, &[], pathname)?;
        let size = bytes.len();

        tracing::debug!(%pathname, size, %content_type, "Uploading to blob store");

        let response = self
            .http_client
            .put(url)
            .bearer_auth(&self.token)
            .header("x-api-version", BLOB_API_VERSION)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .header("x-access", "public")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Api(status.as_u16(), body));
        }

        let object: StoredObject =
            serde_json::from_str(&body).map_err(|e| StoreError::Parse(e.to_string()))?;
        ensure_absolute_url(&object.url)?;

        tracing::info!(url = %object.url, size, "Stored object in blob store");
        Ok(object)
    }
}

/// Directory-backed store; files are served by the router under `/uploads`.
pub struct LocalStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, pathname: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(pathname);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StoreError::InvalidPath(pathname.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        pathname: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StoreError> {
        let path = self.resolve(pathname)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        let url = join_url(&self.public_base_url, &["uploads"], pathname)?.to_string();
        ensure_absolute_url(&url)?;

        tracing::info!(path = %path.display(), %url, "Stored object on local disk");
        Ok(StoredObject {
            url,
            pathname: pathname.to_string(),
            content_type: Some(content_type.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_is_timestamped_under_prefix() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(storage_key(now, "fern.jpg"), "plants/1700000000123-fern.jpg");
    }

    #[test]
    fn key_flattens_path_separators() {
        let now = Utc.timestamp_millis_opt(5).unwrap();
        assert_eq!(storage_key(now, "../../etc/passwd"), "plants/5-.._.._etc_passwd");
        assert_eq!(storage_key(now, ""), "plants/5-upload");
    }

    #[test]
    fn content_type_prefers_declared_then_sniffs() {
        let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(resolve_content_type(Some("video/mp4"), &png_magic), "video/mp4");
        assert_eq!(resolve_content_type(None, &png_magic), "image/png");
        assert_eq!(resolve_content_type(Some(" "), b"plain"), FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn only_absolute_urls_pass() {
        assert!(ensure_absolute_url("https://cdn.example.com/plants/1-a.jpg").is_ok());
        assert!(ensure_absolute_url("/plants/1-a.jpg").is_err());
        assert!(ensure_absolute_url("ftp://example.com/a").is_err());
    }

    #[tokio::test]
    async fn local_store_writes_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "http://localhost:3000/");

        let object = store
            .put("plants/1-leaf.png", Bytes::from_static(b"leaf"), "image/png")
            .await
            .unwrap();

        assert_eq!(object.url, "http://localhost:3000/uploads/plants/1-leaf.png");
        let written = std::fs::read(dir.path().join("plants/1-leaf.png")).unwrap();
        assert_eq!(written, b"leaf");
    }

    #[test]
    fn joined_urls_encode_reserved_characters() {
        let url = join_url("http://localhost:3000", &["uploads"], "plants/1-leaf #2.jpg").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/uploads/plants/1-leaf%20%232.jpg");
        assert_eq!(url.fragment(), None);

        let url = join_url("https://blob.test/", &[], "plants/1-what?.jpg").unwrap();
        assert_eq!(url.path(), "/plants/1-what%3F.jpg");
        assert_eq!(url.query(), None);

        let url = join_url("https://blob.test/base", &[], "plants/1-100%.jpg").unwrap();
        assert_eq!(url.path(), "/base/plants/1-100%25.jpg");
    }

    #[test]
    fn join_url_rejects_unusable_base() {
        assert!(matches!(
            join_url("not a url", &[], "plants/a.jpg"),
            Err(StoreError::InvalidUrl(_))
        ));
        assert!(matches!(
            join_url("mailto:someone@example.com", &[], "plants/a.jpg"),
            Err(StoreError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn local_store_encodes_filename_in_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "http://localhost:3000");

        let object = store
            .put("plants/1-leaf #2.jpg", Bytes::from_static(b"leaf"), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(object.url, "http://localhost:3000/uploads/plants/1-leaf%20%232.jpg");
        assert_eq!(object.pathname, "plants/1-leaf #2.jpg");
        assert!(dir.path().join("plants/1-leaf #2.jpg").exists());
    }

    #[tokio::test]
    async fn local_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "http://localhost:3000");

        let err = store
            .put("../escape.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }
}
