//! # API REST
//!
//! REST delivery layer for the upload storage service.
//!
//! Handles:
//! - HTTP endpoints with axum (upload, listing, download, health)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (multipart parsing, JSON serialization, CORS)
//!
//! All storage decisions (empty uploads, path safety, overwrite) are made by
//! [`upload_files::StorageService`]; this crate only translates between HTTP and it.

#![warn(rust_2018_idioms)]

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use upload_files::StorageService;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use handlers::{HealthRes, ListFilesRes, StoredFileRes, UploadForm, UploadRes};

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    storage: Arc<StorageService>,
}

impl AppState {
    pub fn new(storage: Arc<StorageService>) -> Self {
        Self { storage }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_files,
        handlers::upload_file,
        handlers::download_file,
    ),
    components(schemas(HealthRes, ListFilesRes, StoredFileRes, UploadForm, UploadRes))
)]
pub struct ApiDoc;

/// Builds the full application router, Swagger UI included.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/files", get(handlers::list_files))
        .route("/files", post(handlers::upload_file))
        .route("/files/:filename", get(handlers::download_file))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
