// Route handlers

use axum::{
    body::Bytes,
    extract::State,
    response::{Html, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::artifact::artifact_response;
use super::{ApiError, ApiResult, AppState};
use crate::downloader::models::ProbeRequest;
use crate::downloader::tools::ToolInfo;
use crate::downloader::{DownloadError, DownloadRequest, FormatCatalog};

const INDEX_HTML: &str = include_str!("index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": state.downloader.engine_name(),
    }))
}

/// Tool discovery runs `--version` subprocesses, so keep it off the async workers
pub async fn tools(State(state): State<AppState>) -> ApiResult<Json<Vec<ToolInfo>>> {
    let manager = state.tools.clone();
    let tools = tokio::task::spawn_blocking(move || manager.get_all_tools())
        .await
        .map_err(|e| ApiError::internal(format!("tool check failed: {}", e)))?;
    Ok(Json(tools))
}

pub async fn probe(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<FormatCatalog>> {
    let request: ProbeRequest = parse_body(&body)?;
    let url = request.into_url()?;
    let catalog = state.downloader.probe(&url).await?;
    tracing::info!(
        url = %url,
        video = catalog.video_formats.len(),
        audio = catalog.audio_formats.len(),
        "probe complete"
    );
    Ok(Json(catalog))
}

pub async fn download(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: DownloadRequest = parse_body(&body)?;
    let (url, intent) = request.into_parts(state.default_codec)?;
    let result = state.downloader.download(&url, &intent).await?;
    Ok(artifact_response(result).await?)
}

/// Lenient JSON body: empty means "all fields absent", malformed means missing input
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, DownloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| DownloadError::MissingInput(format!("request body is not valid JSON ({})", e)))
}
