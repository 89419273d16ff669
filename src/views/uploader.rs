//! Uploader view: Idle -> Selected -> Uploading -> Uploaded | Error.

use std::fmt::Write as _;

use crate::client::{ClientError, MediaFile, PlantApi};
use crate::models::UploadResponse;
use crate::views::identification::IdentificationView;

/// Largest file the uploader accepts.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

pub const UNSUPPORTED_TYPE: &str = "Please upload an image or video file";
pub const FILE_TOO_LARGE: &str = "File size should be less than 10MB";
pub const UPLOAD_FAILED: &str = "Failed to upload file";
pub const UPLOAD_TRANSPORT_FAILED: &str = "An error occurred during upload";

#[derive(Debug, Clone, PartialEq)]
pub enum UploaderState {
    /// Nothing selected; may carry the reason the last selection was refused.
    Idle { error: Option<String> },
    Selected { file: MediaFile },
    Uploading { file: MediaFile },
    Uploaded { file: MediaFile, url: String },
    /// The file is kept so the upload can be retried.
    Error { file: MediaFile, message: String },
}

/// State discriminant, handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploaderPhase {
    Idle,
    Selected,
    Uploading,
    Uploaded,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploaderView {
    state: UploaderState,
}

impl Default for UploaderView {
    fn default() -> Self {
        Self::new()
    }
}

/// Same checks the browser applies before accepting a file.
pub fn check_file(file: &MediaFile) -> Result<(), &'static str> {
    if !file.is_image() && !file.is_video() {
        return Err(UNSUPPORTED_TYPE);
    }
    if file.size() > MAX_FILE_BYTES {
        return Err(FILE_TOO_LARGE);
    }
    Ok(())
}

impl UploaderView {
    pub fn new() -> Self {
        Self {
            state: UploaderState::Idle { error: None },
        }
    }

    pub fn state(&self) -> &UploaderState {
        &self.state
    }

    pub fn phase(&self) -> UploaderPhase {
        match self.state {
            UploaderState::Idle { .. } => UploaderPhase::Idle,
            UploaderState::Selected { .. } => UploaderPhase::Selected,
            UploaderState::Uploading { .. } => UploaderPhase::Uploading,
            UploaderState::Uploaded { .. } => UploaderPhase::Uploaded,
            UploaderState::Error { .. } => UploaderPhase::Error,
        }
    }

    pub fn file(&self) -> Option<&MediaFile> {
        match &self.state {
            UploaderState::Idle { .. } => None,
            UploaderState::Selected { file }
            | UploaderState::Uploading { file }
            | UploaderState::Uploaded { file, .. }
            | UploaderState::Error { file, .. } => Some(file),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            UploaderState::Idle { error } => error.as_deref(),
            UploaderState::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn uploaded_url(&self) -> Option<&str> {
        match &self.state {
            UploaderState::Uploaded { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Choose a file. A refused file leaves the current selection in place.
    pub fn select(&mut self, file: MediaFile) {
        if matches!(
            self.phase(),
            UploaderPhase::Uploading | UploaderPhase::Uploaded
        ) {
            return;
        }

        match check_file(&file) {
            Ok(()) => {
                tracing::debug!(name = %file.name, size = file.size(), "File selected");
                self.state = UploaderState::Selected { file };
            }
            Err(message) => {
                tracing::debug!(name = %file.name, %message, "File refused");
                self.state = match self.file().cloned() {
                    Some(previous) => UploaderState::Error {
                        file: previous,
                        message: message.to_string(),
                    },
                    None => UploaderState::Idle {
                        error: Some(message.to_string()),
                    },
                };
            }
        }
    }

    /// Move to Uploading and hand back the file to send.
    ///
    /// Returns `None` when there is nothing to upload or an upload is already running.
    pub fn begin_upload(&mut self) -> Option<MediaFile> {
        let file = match &self.state {
            UploaderState::Selected { file } | UploaderState::Error { file, .. } => file.clone(),
            _ => return None,
        };
        self.state = UploaderState::Uploading { file: file.clone() };
        Some(file)
    }

    /// Apply the result of the upload call started by [`begin_upload`](Self::begin_upload).
    pub fn finish_upload(&mut self, result: Result<UploadResponse, ClientError>) {
        let UploaderState::Uploading { file } = &self.state else {
            return;
        };
        let file = file.clone();

        self.state = match result {
            Ok(UploadResponse {
                success: true,
                url: Some(url),
                ..
            }) => UploaderState::Uploaded { file, url },
            Ok(response) => UploaderState::Error {
                file,
                message: response.error.unwrap_or_else(|| UPLOAD_FAILED.to_string()),
            },
            Err(err) => {
                tracing::error!(error = %err, "Upload request failed");
                UploaderState::Error {
                    file,
                    message: UPLOAD_TRANSPORT_FAILED.to_string(),
                }
            }
        };
    }

    /// Run one upload against `api`.
    pub async fn upload(&mut self, api: &dyn PlantApi) -> UploaderPhase {
        if let Some(file) = self.begin_upload() {
            let result = api.upload(&file).await;
            self.finish_upload(result);
        }
        self.phase()
    }

    /// Drop the selection and any result.
    pub fn remove(&mut self) {
        self.state = UploaderState::Idle { error: None };
    }

    /// The identification view for the uploaded media, once there is one.
    pub fn identification(&self) -> Option<IdentificationView> {
        self.uploaded_url().map(IdentificationView::new)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        match &self.state {
            UploaderState::Idle { .. } => {
                out.push_str("Select a plant photo or video (max 10MB).\n");
            }
            UploaderState::Selected { file } | UploaderState::Error { file, .. } => {
                let _ = writeln!(out, "{} ({}, {} bytes)", file.name, file.mime_type, file.size());
                out.push_str("[Analyze Plant]\n");
            }
            UploaderState::Uploading { file } => {
                let _ = writeln!(out, "{} ({}, {} bytes)", file.name, file.mime_type, file.size());
                out.push_str("Uploading...\n");
            }
            UploaderState::Uploaded { url, .. } => {
                let _ = writeln!(out, "Uploaded: {url}");
            }
        }
        if let Some(error) = self.error() {
            let _ = writeln!(out, "Error: {error}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(size: usize) -> MediaFile {
        MediaFile::new("fern.jpg", "image/jpeg", vec![0u8; size])
    }

    #[test]
    fn refuses_non_media_files() {
        let mut view = UploaderView::new();
        view.select(MediaFile::new("notes.txt", "text/plain", b"hi".to_vec()));

        assert_eq!(view.phase(), UploaderPhase::Idle);
        assert_eq!(view.error(), Some(UNSUPPORTED_TYPE));
    }

    #[test]
    fn refuses_files_over_ten_megabytes_but_keeps_previous() {
        let mut view = UploaderView::new();
        view.select(jpeg(1024));
        view.select(jpeg(MAX_FILE_BYTES + 1));

        assert_eq!(view.phase(), UploaderPhase::Error);
        assert_eq!(view.error(), Some(FILE_TOO_LARGE));
        assert_eq!(view.file().map(MediaFile::size), Some(1024));
    }

    #[test]
    fn exactly_ten_megabytes_is_accepted() {
        let mut view = UploaderView::new();
        view.select(MediaFile::new("clip.mp4", "video/mp4", vec![0u8; MAX_FILE_BYTES]));
        assert_eq!(view.phase(), UploaderPhase::Selected);
    }

    #[test]
    fn upload_needs_a_file_and_runs_once() {
        let mut view = UploaderView::new();
        assert!(view.begin_upload().is_none());

        view.select(jpeg(10));
        assert!(view.begin_upload().is_some());
        assert_eq!(view.phase(), UploaderPhase::Uploading);
        assert!(view.begin_upload().is_none());
    }

    #[test]
    fn server_failure_uses_its_message_or_default() {
        let mut view = UploaderView::new();
        view.select(jpeg(10));
        view.begin_upload();
        view.finish_upload(Ok(UploadResponse::failed("Failed to upload file")));
        assert_eq!(view.error(), Some("Failed to upload file"));

        view.begin_upload();
        view.finish_upload(Ok(UploadResponse {
            success: false,
            url: None,
            error: None,
        }));
        assert_eq!(view.phase(), UploaderPhase::Error);
        assert_eq!(view.error(), Some(UPLOAD_FAILED));
    }

    #[test]
    fn remove_resets_from_any_state() {
        let mut view = UploaderView::new();
        view.select(jpeg(10));
        view.begin_upload();
        view.finish_upload(Ok(UploadResponse::ok("https://cdn.example.com/plants/1-fern.jpg")));
        assert_eq!(view.phase(), UploaderPhase::Uploaded);

        view.remove();
        assert_eq!(view, UploaderView::new());
        assert!(view.identification().is_none());
    }
}
