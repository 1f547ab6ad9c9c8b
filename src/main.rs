use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use upload_files::{StorageConfig, StorageService, STORAGE_DIR_ENV};

/// Main entry point for the upload server
///
/// Resolves configuration once, prepares the storage root and serves the REST API.
///
/// # Environment Variables
/// - `UPLOAD_STORAGE_DIR`: Storage root directory (default: "upload-dir")
/// - `UPLOAD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `UPLOAD_CLEAN_ON_START`: When `true`/`1`, wipe the storage root before serving
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the storage root cannot be created,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("upload_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("upload_files=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("UPLOAD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let config = StorageConfig::from_env_value(std::env::var(STORAGE_DIR_ENV).ok());
    let clean_on_start = flag_from_env_value(std::env::var("UPLOAD_CLEAN_ON_START").ok());

    let storage = Arc::new(StorageService::from_config(&config)?);
    if clean_on_start {
        tracing::info!("-- Wiping storage at {}", storage.root_location().display());
        storage.delete_all();
    }
    storage.init()?;

    tracing::info!("++ Storage root {}", storage.root_location().display());
    tracing::info!("++ Starting upload REST API on {}", rest_addr);

    let app = api_rest::router(AppState::new(storage));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Interprets `true`/`1`/`yes` (any case) as set; everything else, including absence, as unset.
fn flag_from_env_value(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
