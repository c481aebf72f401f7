// Artifact responses - stream the produced file, then drop its workspace

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tempfile::TempDir;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::downloader::orchestrator::discard_workspace;
use crate::downloader::{DownloadError, FetchResult};

/// File body that removes its workspace once finished or dropped
pub struct ArtifactStream {
    inner: ReaderStream<File>,
    workspace: Option<TempDir>,
}

impl ArtifactStream {
    fn new(file: File, workspace: TempDir) -> Self {
        Self {
            inner: ReaderStream::new(file),
            workspace: Some(workspace),
        }
    }

    fn release(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            discard_workspace(workspace);
        }
    }
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) = polled {
            self.release();
        }
        polled
    }
}

impl Drop for ArtifactStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Build the attachment response for a finished fetch
pub async fn artifact_response(result: FetchResult) -> Result<Response, DownloadError> {
    let file = match File::open(&result.artifact).await {
        Ok(file) => file,
        Err(e) => {
            discard_workspace(result.into_workspace());
            return Err(e.into());
        }
    };
    let size = result.size_bytes;
    let disposition = content_disposition(&result.public_filename);
    let stream = ArtifactStream::new(file, result.into_workspace());

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// `attachment` with an ASCII fallback name plus the RFC 5987 UTF-8 form
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}
