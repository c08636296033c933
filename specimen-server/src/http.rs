//! Specimen HTTP API
//!
//! Axum-based HTTP server that classifies uploaded images and logs every
//! prediction to the configured store.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - GET  /               — static liveness message
//! - GET  /health         — health check with store status
//! - GET  /version        — server version and label set
//! - GET  /files          — every logged prediction, newest first
//! - POST /predict/image  — classify a multipart `file` upload and log it

use std::sync::Arc;

use anyhow::Result;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use specimen_core::config::HttpConfig;
use specimen_core::{
    create_predictor, create_store, Label, NewPrediction, PredictionError, PredictionStore,
    Predictor, SpecimenConfig, SpecimenError, StoreError,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

pub const ROOT_MESSAGE: &str = "Image classifier API is running! Try /predict/image";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub store: Arc<dyn PredictionStore>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(predictor: Arc<dyn Predictor>, store: Arc<dyn PredictionStore>) -> Self {
        Self {
            predictor,
            store,
            max_upload_bytes: HttpConfig::default().max_upload_bytes,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Construct the predictor and store named in the config.
    pub async fn from_config(config: &SpecimenConfig) -> Result<Self, SpecimenError> {
        let predictor: Arc<dyn Predictor> = Arc::from(create_predictor(&config.predictor)?);
        let store: Arc<dyn PredictionStore> = Arc::from(create_store(config).await?);

        tracing::info!(
            predictor = predictor.name(),
            store = store.name(),
            "Serving state ready"
        );

        Ok(Self::new(predictor, store).with_upload_limit(config.http.max_upload_bytes))
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/files", get(list_files_handler))
        .route("/predict/image", post(predict_image_handler))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: AppState,
    http: &HttpConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", http.host, http.port);
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Specimen HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// An uploaded file as declared by the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub filename: String,
    pub prediction: Label,
    pub logged: bool,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("{0}")]
    Validation(String),

    #[error("upload could not be read: {0}")]
    Upload(#[from] MultipartError),

    #[error("prediction failed: {0}")]
    Prediction(#[from] PredictionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ServeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServeError::Validation(_) => StatusCode::BAD_REQUEST,
            ServeError::Upload(e) => e.status(),
            ServeError::Prediction(_) | ServeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_reply(self) -> (StatusCode, serde_json::Value) {
        let status = self.status_code();
        let body = serde_json::to_value(ErrorResponse::new(self.to_string()))
            .unwrap_or_else(|_| serde_json::json!({"status": "error"}));
        (status, body)
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner root — static discovery message (pure, no IO).
pub fn root_inner() -> serde_json::Value {
    serde_json::json!({ "message": ROOT_MESSAGE })
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "labels": Label::ALL,
    })
}

/// Inner health check — pings the store and returns (status_code, json_body).
pub async fn health_inner(state: &AppState) -> (StatusCode, serde_json::Value) {
    match state.store.ping().await {
        Ok(backend) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "store": state.store.name(),
                "backend": backend,
                "predictor": state.predictor.name(),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner list — every record, newest first.
pub async fn list_files_inner(store: &dyn PredictionStore) -> (StatusCode, serde_json::Value) {
    match store.list_all().await {
        Ok(files) => (StatusCode::OK, serde_json::json!({ "files": files })),
        Err(e) => {
            tracing::error!("Failed to list predictions: {}", e);
            ServeError::from(e).into_reply()
        }
    }
}

/// Inner predict — validate, classify, log, respond.
///
/// Nothing is written unless the prediction succeeded. If the log write
/// fails the whole request fails and the label is dropped.
pub async fn predict_image_inner(
    state: &AppState,
    upload: ImageUpload,
) -> (StatusCode, serde_json::Value) {
    match predict_and_log(state, upload).await {
        Ok(resp) => match serde_json::to_value(&resp) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": e.to_string(), "status": "error" }),
            ),
        },
        Err(e) => e.into_reply(),
    }
}

async fn predict_and_log(state: &AppState, upload: ImageUpload) -> Result<PredictResponse, ServeError> {
    validate_content_type(upload.content_type.as_deref())?;

    let prediction = state.predictor.predict(&upload.bytes).await.map_err(|e| {
        tracing::error!("Prediction failed: {}", e);
        e
    })?;

    let filename = upload
        .filename
        .unwrap_or_else(|| format!("upload-{}", Uuid::new_v4()));

    let record = state
        .store
        .insert(NewPrediction::now(filename.clone(), prediction))
        .await
        .map_err(|e| {
            tracing::error!(
                filename = %filename,
                prediction = %prediction,
                "Prediction discarded, log write failed: {}",
                e
            );
            e
        })?;

    tracing::info!(
        id = record.id,
        filename = %record.filename,
        prediction = %record.prediction,
        "Prediction logged"
    );

    Ok(PredictResponse {
        filename: record.filename,
        prediction: record.prediction,
        logged: true,
    })
}

/// Only `image/*` uploads are classified.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ServeError> {
    match content_type {
        Some(ct) if ct.starts_with("image/") => Ok(()),
        Some(ct) => {
            tracing::warn!(content_type = ct, "Rejected non-image upload");
            Err(ServeError::Validation(format!(
                "Please upload an image file (got content type {:?})",
                ct
            )))
        }
        None => {
            tracing::warn!("Rejected upload without a content type");
            Err(ServeError::Validation(
                "Please upload an image file (no content type given)".to_string(),
            ))
        }
    }
}

/// Pull the `file` field out of the form. The content type is checked
/// before the body is buffered so rejected uploads are never read.
pub async fn read_upload(mut multipart: Multipart) -> Result<ImageUpload, ServeError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_owned);
        validate_content_type(content_type.as_deref())?;

        let filename = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(ServeError::Validation(format!(
        "multipart field '{}' is required",
        FILE_FIELD
    )))
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(root_inner()))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn list_files_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = list_files_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn predict_image_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let upload = match multipart {
        Ok(m) => read_upload(m).await,
        Err(rejection) => Err(ServeError::Validation(rejection.body_text())),
    };

    let (status, body) = match upload {
        Ok(upload) => predict_image_inner(&state, upload).await,
        Err(e) => e.into_reply(),
    };
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
