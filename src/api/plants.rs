//! Upload and identification endpoints.
//!
//! `POST /api/plants` stores the multipart `file` part and returns its public URL.
//! `GET /api/plants?imageUrl=...` runs identification on an already stored image.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::error::{PlantError, PlantResult};
use crate::identify::identify_plant;
use crate::models::{IdentifyResponse, UploadResponse};
use crate::storage::{ensure_absolute_url, resolve_content_type, storage_key};
use crate::AppState;

/// Multipart field carrying the media.
pub const FILE_FIELD: &str = "file";

pub async fn upload_plant_media(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> PlantResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A plain form value under the same name is not a file.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let declared_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        let pathname = storage_key(Utc::now(), &filename);
        let content_type = resolve_content_type(declared_type.as_deref(), &bytes);
        tracing::info!(%pathname, %content_type, size = bytes.len(), "Received plant media");

        let object = state.store.put(&pathname, bytes, &content_type).await?;
        ensure_absolute_url(&object.url)?;

        return Ok(Json(UploadResponse::ok(object.url)));
    }

    Err(PlantError::MissingFile)
}

/// Query parameter carrying the stored image URL.
pub const IMAGE_URL_PARAM: &str = "imageUrl";

/// First `imageUrl` value; later repeats are ignored.
fn first_image_url(pairs: Vec<(String, String)>) -> Option<String> {
    pairs
        .into_iter()
        .find(|(key, _)| key == IMAGE_URL_PARAM)
        .map(|(_, value)| value)
        .filter(|url| !url.trim().is_empty())
}

pub async fn identify(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> PlantResult<Json<IdentifyResponse>> {
    let pairs = match query {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Unreadable identification query");
            Vec::new()
        }
    };
    let image_url = first_image_url(pairs).ok_or(PlantError::MissingImageUrl)?;

    let record = identify_plant(state.model.as_ref(), &image_url).await?;
    Ok(Json(IdentifyResponse::ok(record)))
}

pub fn plant_routes() -> Router<AppState> {
    Router::new().route("/api/plants", get(identify).post(upload_plant_media))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn first_image_url_wins() {
        let query = pairs(&[
            ("imageUrl", "https://a.test/x.jpg"),
            ("imageUrl", "https://a.test/y.jpg"),
        ]);
        assert_eq!(first_image_url(query).as_deref(), Some("https://a.test/x.jpg"));
    }

    #[test]
    fn blank_or_absent_image_url_is_missing() {
        assert_eq!(first_image_url(pairs(&[("other", "1")])), None);
        assert_eq!(first_image_url(pairs(&[("imageUrl", " ")])), None);
    }
}
