//! HTTP API tests driving the router with a fake extraction engine.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use universal_downloader_lib::downloader::extractors::{BlockingReason, MediaEngine, ProbeResult, RawFormat};
use universal_downloader_lib::downloader::tools::ToolManager;
use universal_downloader_lib::downloader::{AudioCodec, DownloadError, Downloader, ResolvedPlan};
use universal_downloader_lib::server::{create_router, AppState};

enum FetchBehaviour {
    Write(Vec<(&'static str, Vec<u8>)>),
    Nothing,
    Fail,
}

struct FakeEngine {
    behaviour: FetchBehaviour,
    selectors: Mutex<Vec<String>>,
}

impl FakeEngine {
    fn new(behaviour: FetchBehaviour) -> Self {
        Self {
            behaviour,
            selectors: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, url: &str) -> Result<ProbeResult, DownloadError> {
        if url.contains("private") {
            return Err(DownloadError::ExtractionFailed {
                message: "Private video".into(),
                reason: BlockingReason::PrivateVideo,
            });
        }
        Ok(ProbeResult {
            title: Some("Test Clip".into()),
            duration_seconds: Some(212.0),
            formats: vec![
                RawFormat {
                    format_id: "137".into(),
                    ext: "mp4".into(),
                    vcodec: Some("avc1.640028".into()),
                    acodec: Some("none".into()),
                    height: Some(1080),
                    filesize: Some(50_000_000),
                    ..Default::default()
                },
                RawFormat {
                    format_id: "18".into(),
                    ext: "mp4".into(),
                    vcodec: Some("avc1.42001E".into()),
                    acodec: Some("mp4a.40.2".into()),
                    height: Some(360),
                    ..Default::default()
                },
                RawFormat {
                    format_id: "251".into(),
                    ext: "webm".into(),
                    vcodec: Some("none".into()),
                    acodec: Some("opus".into()),
                    abr: Some(130.0),
                    ..Default::default()
                },
            ],
        })
    }

    async fn fetch(&self, _url: &str, plan: &ResolvedPlan, output_dir: &Path) -> Result<(), DownloadError> {
        self.selectors.lock().unwrap().push(plan.format_selector());
        match &self.behaviour {
            FetchBehaviour::Write(files) => {
                for (name, contents) in files {
                    std::fs::write(output_dir.join(name), contents)?;
                }
                Ok(())
            }
            FetchBehaviour::Nothing => Ok(()),
            FetchBehaviour::Fail => Err(DownloadError::from_engine_output(
                "ERROR: [generic] Unsupported URL: https://example.com/nothing",
            )),
        }
    }
}

struct Harness {
    app: Router,
    engine: Arc<FakeEngine>,
    temp_root: PathBuf,
    _dir: tempfile::TempDir,
}

fn harness(behaviour: FetchBehaviour) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let temp_root = dir.path().join("work");
    let engine = Arc::new(FakeEngine::new(behaviour));
    let downloader = Downloader::new(engine.clone(), temp_root.clone());
    let tools = ToolManager::new(Some("/nonexistent/yt-dlp".into()), Some("/nonexistent/ffmpeg".into()));
    let app = create_router(AppState::new(downloader, tools, AudioCodec::Mp3));
    Harness {
        app,
        engine,
        temp_root,
        _dir: dir,
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn workspaces_removed(root: &Path) -> bool {
    for _ in 0..100 {
        let empty = std::fs::read_dir(root).map(|mut d| d.next().is_none()).unwrap_or(true);
        if empty {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_health_and_index() {
    let h = harness(FetchBehaviour::Nothing);

    let resp = h
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["engine"], "fake");

    let resp = h
        .app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8_lossy(&bytes);
    assert!(page.contains("/probe"));
    assert!(page.contains("function estimateSize"));
    assert!(page.contains("function formatDuration"));
    assert!(page.contains("setTimeout(() => URL.revokeObjectURL"));
    assert!(page.contains("} catch (err) {"));
}

#[tokio::test]
async fn test_tools_reports_missing_binaries() {
    let h = harness(FetchBehaviour::Nothing);
    let resp = h
        .app
        .oneshot(Request::get("/api/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    let tools = json.as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().all(|t| t["is_available"] == false));
}

#[tokio::test]
async fn test_probe_classifies_formats() {
    let h = harness(FetchBehaviour::Nothing);
    let resp = h
        .app
        .oneshot(post_json("/probe", r#"{"url": "https://example.com/watch?v=1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["title"], "Test Clip");
    assert_eq!(json["duration"], 212.0);

    let video: Vec<_> = json["video_formats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["format_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(video, ["137", "18"]);
    assert_eq!(json["video_formats"][0]["has_audio"], false);
    assert_eq!(json["video_formats"][1]["has_audio"], true);
    assert_eq!(json["audio_formats"][0]["format_id"], "251");
}

#[tokio::test]
async fn test_probe_without_url_is_400() {
    let h = harness(FetchBehaviour::Nothing);

    for body in ["", "{}", r#"{"url": "  "}"#, "not json"] {
        let resp = h.app.clone().oneshot(post_json("/probe", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["kind"], "missing_input");
    }
}

#[tokio::test]
async fn test_probe_engine_failure_is_502_with_hint() {
    let h = harness(FetchBehaviour::Nothing);
    let resp = h
        .app
        .oneshot(post_json("/probe", r#"{"url": "https://example.com/private"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["kind"], "extraction_failed");
    assert!(json["error"].as_str().unwrap().contains("Private video"));
    assert!(json["hint"].is_string());
    assert_eq!(json["reason"]["code"], "private_video");
    assert_eq!(json["reason"]["description"], "Private video");
    assert_eq!(json["reason"]["permanent"], false);
}

#[tokio::test]
async fn test_download_audio_only_streams_named_file() {
    let h = harness(FetchBehaviour::Write(vec![
        ("Test Clip.opus", b"opus-audio-bytes".to_vec()),
        ("Test Clip.webm.part", b"x".to_vec()),
    ]));

    let resp = h
        .app
        .oneshot(post_json(
            "/download",
            r#"{"url": "https://example.com/v", "preset": "best_audio_only",
                "audio_codec": "opus", "output_basename": "song"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let headers = resp.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[header::CONTENT_LENGTH], "16");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("filename=\"song.opus\""));
    assert!(disposition.contains("filename*=UTF-8''song.opus"));

    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"opus-audio-bytes");

    assert_eq!(h.engine.selectors.lock().unwrap().as_slice(), ["bestaudio/best"]);
    assert!(workspaces_removed(&h.temp_root).await);
}

#[tokio::test]
async fn test_download_lone_video_pick_adds_audio() {
    let h = harness(FetchBehaviour::Write(vec![("Test Clip.mp4", vec![0u8; 64])]));

    let resp = h
        .app
        .oneshot(post_json(
            "/download",
            r#"{"url": "https://example.com/v", "video_format_id": "137"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("Test%20Clip.mp4"));
    drop(resp);

    assert_eq!(
        h.engine.selectors.lock().unwrap().as_slice(),
        ["137+bestaudio/bestaudio*"]
    );
    assert!(workspaces_removed(&h.temp_root).await);
}

#[tokio::test]
async fn test_download_rejects_bad_intent() {
    let h = harness(FetchBehaviour::Nothing);

    let cases = [
        (r#"{"url": "https://example.com/v"}"#, "missing_input"),
        (r#"{"url": "https://example.com/v", "preset": "best_everything"}"#, "invalid_intent"),
        (
            r#"{"url": "https://example.com/v", "preset": "best_audio_only", "audio_codec": "wma"}"#,
            "invalid_intent",
        ),
        (r#"{"url": "https://example.com/v", "video_format_id": "137/best"}"#, "invalid_intent"),
    ];

    for (body, kind) in cases {
        let resp = h.app.clone().oneshot(post_json("/download", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(body_json(resp.into_body()).await["kind"], kind);
    }
    assert!(h.engine.selectors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_download_engine_failure_is_502_and_cleans_up() {
    let h = harness(FetchBehaviour::Fail);
    let resp = h
        .app
        .oneshot(post_json(
            "/download",
            r#"{"url": "https://example.com/nothing", "preset": "best_video_with_audio"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["kind"], "extraction_failed");
    assert!(json["error"].as_str().unwrap().contains("Unsupported URL"));
    assert!(workspaces_removed(&h.temp_root).await);
}

#[tokio::test]
async fn test_download_without_output_is_500() {
    let h = harness(FetchBehaviour::Nothing);
    let resp = h
        .app
        .oneshot(post_json(
            "/download",
            r#"{"url": "https://example.com/v", "preset": "best_compatible_mp4"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp.into_body()).await["kind"], "no_artifact_produced");
    assert!(workspaces_removed(&h.temp_root).await);
}
