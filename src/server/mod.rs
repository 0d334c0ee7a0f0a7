//! HTTP front end.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/api/analyze` | Multipart upload (`file` field), returns an [`AnalysisReport`] |
//! | `GET` | `/uploads/*` | Stored uploads and their sampled frames |
//! | `GET` | `/health` | Liveness probe |

pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    analysis::{AnalysisError, FrameAnalyzer, OpenAiVisionAnalyzer},
    configuration::SampleOptions,
    pipeline::{AnalysisPipeline, PUBLIC_UPLOADS_PREFIX},
    report::AnalysisReport,
    sampler::FrameSampler,
};

pub use config::{ConfigError, ServerConfig};
pub use error::AppError;

/// Name of the multipart field carrying the video.
pub const UPLOAD_FIELD: &str = "file";

/// Shared handler state.
pub struct AppState {
    pub pipeline: AnalysisPipeline,
}

impl AppState {
    /// Wire a pipeline from configuration around the given analyzer.
    pub fn new(config: &ServerConfig, analyzer: Arc<dyn FrameAnalyzer>) -> Self {
        let options = SampleOptions::default()
            .with_count(config.frame_count)
            .with_jpeg_quality(config.jpeg_quality);
        let pipeline = AnalysisPipeline::new(
            FrameSampler::new(options),
            analyzer,
            config.upload_dir.clone(),
            config.sample_timeout,
        );
        Self { pipeline }
    }

    /// State backed by the OpenAI-compatible vision client.
    pub fn with_vision_client(config: &ServerConfig) -> Result<Self, AnalysisError> {
        let analyzer = OpenAiVisionAnalyzer::new(config.vision.clone())?;
        Ok(Self::new(config, Arc::new(analyzer)))
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let uploads = ServeDir::new(state.pipeline.upload_dir());

    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/health", get(health))
        .nest_service(PUBLIC_UPLOADS_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes));
    }

    let Some((file_name, bytes)) = upload else {
        return Err(AppError::bad_request("No file provided"));
    };
    if file_name.is_empty() {
        return Err(AppError::bad_request("No file selected"));
    }
    if bytes.is_empty() {
        return Err(AppError::bad_request("Uploaded file is empty"));
    }

    let stored = state.pipeline.store_upload(&file_name, &bytes).await?;
    tracing::info!(original = %file_name, stored = %stored.file_name, "Processing upload");

    let report = state.pipeline.process(&stored).await?;
    Ok(Json(report))
}
