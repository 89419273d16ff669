//! Plant Health Assistant
//!
//! Upload a plant photo or video, hand it to a vision model, and show the
//! identification, care guide and health assessment it returns.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod identify;
pub mod models;
pub mod storage;
pub mod views;
pub mod vision;

pub use crate::error::{PlantError, PlantResult};

use axum::{extract::DefaultBodyLimit, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::storage::ObjectStore;
use crate::vision::PlantModel;

/// Default request body ceiling; well above the 10MB client-side limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared, immutable handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub model: Arc<dyn PlantModel>,
    /// Served under `/uploads` when the local store is in use.
    pub uploads_dir: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, model: Arc<dyn PlantModel>) -> Self {
        Self {
            store,
            model,
            uploads_dir: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uploads_dir = Some(dir.into());
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    let uploads_dir = state.uploads_dir.clone();

    let mut router = Router::new()
        .merge(api::ui_routes())
        .merge(api::plant_routes())
        .merge(api::health_routes());

    if let Some(dir) = uploads_dir {
        router = router.nest_service("/uploads", ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
