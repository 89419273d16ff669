//! HTTP client for the plant endpoints, used by the terminal views.

use async_trait::async_trait;
use axum::body::Bytes;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::models::{IdentifyResponse, UploadResponse};
use crate::storage::resolve_content_type;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file chosen for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk; the MIME type is sniffed from its contents.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = resolve_content_type(None, &bytes);

        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

/// The two server calls the views depend on.
#[async_trait]
pub trait PlantApi: Send + Sync {
    async fn upload(&self, file: &MediaFile) -> Result<UploadResponse, ClientError>;
    async fn identify(&self, image_url: &str) -> Result<IdentifyResponse, ClientError>;
}

pub struct HttpPlantApi {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpPlantApi {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/api/plants", server_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl PlantApi for HttpPlantApi {
    async fn upload(&self, file: &MediaFile) -> Result<UploadResponse, ClientError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        // Failures still carry the JSON envelope, whatever the status.
        let response = self.http_client.post(&self.endpoint).multipart(form).send().await?;
        Ok(response.json().await?)
    }

    async fn identify(&self, image_url: &str) -> Result<IdentifyResponse, ClientError> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("imageUrl", image_url)])
            .send()
            .await?;
        Ok(response.json().await?)
    }
}
