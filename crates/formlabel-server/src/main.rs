//! FormLabel File Server
//!
//! Serves the files of one labeling project over HTTP: documents, the field
//! schema, label files and stored analysis results.
//!
//! ## Routes
//!
//! ```text
//! GET    /              banner
//! GET    /health        liveness
//! GET    /files         sorted file names
//! GET    /files/{name}  raw file content
//! PUT    /files/{name}  { "content": "<text>" }
//! DELETE /files/{name}
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use formlabel_core::document::DocumentMimeType;
use formlabel_core::storage::{FileStorage, QueuedStorage, Storage, StorageError};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 4000;

/// Shared application state
#[derive(Clone)]
struct AppState {
    storage: Arc<dyn Storage>,
}

#[derive(Debug, Deserialize)]
struct PutFile {
    content: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// A storage failure rendered as an HTTP response.
struct ApiError(StorageError);

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::InvalidName(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Storage failure: {}", self.0);
        }
        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn content_type(name: &str) -> &'static str {
    if name.ends_with(".json") {
        return "application/json";
    }
    match DocumentMimeType::from_path(name) {
        DocumentMimeType::Pdf => "application/pdf",
        DocumentMimeType::Jpeg => "image/jpeg",
        DocumentMimeType::Png => "image/png",
        DocumentMimeType::Tiff => "image/tiff",
        DocumentMimeType::Unknown => "application/octet-stream",
    }
}

fn app(storage: Arc<dyn Storage>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/files", get(list_files))
        .route("/files/{name}", get(get_file).put(put_file).delete(delete_file))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { storage })
}

/// Project directory: `FORMLABEL_DATA_DIR`, or the platform data directory.
fn open_storage() -> Result<FileStorage, StorageError> {
    match std::env::var_os("FORMLABEL_DATA_DIR") {
        Some(dir) => FileStorage::new(PathBuf::from(dir)),
        None => FileStorage::default_location(),
    }
}

fn port() -> u16 {
    std::env::var("FORMLABEL_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formlabel_server=info,tower_http=info".into()),
        )
        .init();

    let files = open_storage()?;
    info!("Serving files from {}", files.base_path().display());
    let app = app(Arc::new(QueuedStorage::new(files)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port()));
    info!("FormLabel file server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Index page
async fn index() -> &'static str {
    "FormLabel File Server - files at /files"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let mut files = state.storage.list_files().await?;
    files.sort();
    Ok(Json(files))
}

async fn get_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state
        .storage
        .read_binary(&name, false)
        .await?
        .ok_or_else(|| StorageError::NotFound(name.clone()))?;
    Ok(([(header::CONTENT_TYPE, content_type(&name))], bytes).into_response())
}

async fn put_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<PutFile>,
) -> Result<StatusCode, ApiError> {
    state.storage.write_text(&name, &body.content).await?;
    info!("Wrote {} ({} bytes)", name, body.content.len());
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_file(&name, false).await?;
    info!("Deleted {}", name);
    Ok(StatusCode::NO_CONTENT)
}
