// HTTP server - web UI plus the probe / download API

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::downloader::tools::ToolManager;
use crate::downloader::extractors::BlockingReason;
use crate::downloader::{AudioCodec, DownloadError, Downloader};

pub mod artifact;
pub mod routes;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub downloader: Arc<Downloader>,
    pub tools: Arc<ToolManager>,
    /// Codec for audio-only requests that do not name one
    pub default_codec: AudioCodec,
}

impl AppState {
    pub fn new(downloader: Downloader, tools: ToolManager, default_codec: AudioCodec) -> Self {
        Self {
            downloader: Arc::new(downloader),
            tools: Arc::new(tools),
            default_codec,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/tools", get(routes::tools))
        .route("/probe", post(routes::probe))
        .route("/download", post(routes::download))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running HTTP server")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
    }
}

/// JSON error body: `{error, kind, hint?, reason?}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    kind: &'static str,
    hint: Option<&'static str>,
    reason: Option<BlockingReason>,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            kind: "internal",
            hint: None,
            reason: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        if err.is_client_error() {
            tracing::debug!(kind = err.kind(), "rejected request: {}", err);
        } else {
            tracing::error!(kind = err.kind(), "request failed: {}", err);
        }

        let status = match &err {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            DownloadError::ExtractionFailed { .. } | DownloadError::ParseError(_) => StatusCode::BAD_GATEWAY,
            DownloadError::ToolNotFound(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            message: err.to_string(),
            kind: err.kind(),
            hint: err.hint(),
            reason: err.reason(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        });
        if let Some(hint) = self.hint {
            body["hint"] = serde_json::Value::from(hint);
        }
        if let Some(reason) = self.reason {
            body["reason"] = serde_json::json!({
                "code": reason,
                "description": reason.description(),
                "permanent": reason.is_permanent(),
            });
        }
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
