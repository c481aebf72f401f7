// Orchestrator - probe, resolve and fetch against one engine
//
// Each fetch gets a private workspace directory under the configured temp
// root. The directory lives inside the returned `FetchResult` and is removed
// when that result (or the stream serving it) is dropped; on failure it is
// removed before the error is returned.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::classifier::catalog_from_probe;
use super::errors::DownloadError;
use super::extractors::MediaEngine;
use super::format_selector::{AudioLookup, FormatSelector, ResolvedPlan};
use super::models::{DownloadIntent, FormatCatalog};

const WORKSPACE_PREFIX: &str = "ydl_";

/// Re-probes the URL to learn whether one format carries audio
pub struct ReprobeLookup<'a> {
    engine: &'a dyn MediaEngine,
    url: &'a str,
}

impl<'a> ReprobeLookup<'a> {
    pub fn new(engine: &'a dyn MediaEngine, url: &'a str) -> Self {
        Self { engine, url }
    }
}

#[async_trait]
impl AudioLookup for ReprobeLookup<'_> {
    async fn has_audio(&self, format_id: &str) -> Result<bool, DownloadError> {
        let catalog = catalog_from_probe(self.engine.probe(self.url).await?);
        let has_audio = catalog.has_audio(format_id).await?;
        tracing::debug!(format_id, has_audio, "re-verified audio track");
        Ok(has_audio)
    }
}

/// The produced file plus the workspace that owns it
#[derive(Debug)]
pub struct FetchResult {
    pub artifact: PathBuf,
    pub public_filename: String,
    pub size_bytes: u64,
    workspace: TempDir,
}

impl FetchResult {
    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Hand the workspace guard to whoever serves the file; dropping it deletes everything
    pub fn into_workspace(self) -> TempDir {
        self.workspace
    }
}

/// Remove a workspace on the blocking pool when a runtime is available
pub fn discard_workspace(workspace: TempDir) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(move || {
                let path = workspace.path().to_path_buf();
                if let Err(e) = workspace.close() {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove workspace");
                } else {
                    tracing::debug!(path = %path.display(), "workspace removed");
                }
            });
        }
        Err(_) => drop(workspace),
    }
}

/// Probe / resolve / fetch against one extraction engine
pub struct Downloader {
    engine: Arc<dyn MediaEngine>,
    temp_root: PathBuf,
}

impl Downloader {
    pub fn new(engine: Arc<dyn MediaEngine>, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            temp_root: temp_root.into(),
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Probe a URL and classify its formats
    pub async fn probe(&self, url: &str) -> Result<FormatCatalog, DownloadError> {
        let url = non_empty_url(url)?;
        tracing::info!(engine = self.engine.name(), url, "probing");
        Ok(catalog_from_probe(self.engine.probe(url).await?))
    }

    /// Resolve an intent, re-probing only when a lone video pick needs checking
    pub async fn resolve(
        &self,
        url: &str,
        intent: &DownloadIntent,
    ) -> Result<ResolvedPlan, DownloadError> {
        let url = non_empty_url(url)?;
        let lookup = ReprobeLookup::new(self.engine.as_ref(), url);
        FormatSelector::resolve(intent, &lookup).await
    }

    /// Resolve then fetch
    pub async fn download(
        &self,
        url: &str,
        intent: &DownloadIntent,
    ) -> Result<FetchResult, DownloadError> {
        let plan = self.resolve(url, intent).await?;
        self.fetch(url, &plan, intent.output_basename.as_deref()).await
    }

    /// Run the engine into a fresh workspace and pick the largest file it left
    pub async fn fetch(
        &self,
        url: &str,
        plan: &ResolvedPlan,
        output_basename: Option<&str>,
    ) -> Result<FetchResult, DownloadError> {
        let url = non_empty_url(url)?;
        let workspace = self.create_workspace().await?;
        tracing::info!(
            url,
            selector = %plan.expression,
            workspace = %workspace.path().display(),
            "fetching"
        );

        let picked = match self.engine.fetch(url, plan, workspace.path()).await {
            Ok(()) => select_artifact(workspace.path()).await,
            Err(e) => Err(e),
        };

        match picked {
            Ok((artifact, size_bytes)) => {
                let public_filename = public_filename(output_basename, plan, &artifact);
                tracing::info!(
                    artifact = %artifact.display(),
                    size_bytes,
                    public_filename = %public_filename,
                    "artifact ready"
                );
                Ok(FetchResult {
                    artifact,
                    public_filename,
                    size_bytes,
                    workspace,
                })
            }
            Err(e) => {
                discard_workspace(workspace);
                Err(e)
            }
        }
    }

    async fn create_workspace(&self) -> Result<TempDir, DownloadError> {
        tokio::fs::create_dir_all(&self.temp_root).await?;
        let root = self.temp_root.clone();
        let workspace = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(WORKSPACE_PREFIX)
                .tempdir_in(root)
        })
        .await
        .map_err(|e| DownloadError::Io(std::io::Error::other(e)))??;
        Ok(workspace)
    }
}

fn non_empty_url(url: &str) -> Result<&str, DownloadError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DownloadError::MissingInput("url".to_string()));
    }
    Ok(url)
}

/// Largest regular file in `dir`; ties go to the lexicographically first name
pub async fn select_artifact(dir: &Path) -> Result<(PathBuf, u64), DownloadError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut best: Option<(PathBuf, u64)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let candidate = (entry.path(), metadata.len());
        tracing::debug!(path = %candidate.0.display(), size = candidate.1, "workspace file");

        best = match best {
            Some(current)
                if current.1 > candidate.1
                    || (current.1 == candidate.1 && current.0 <= candidate.0) =>
            {
                Some(current)
            }
            _ => Some(candidate),
        };
    }

    best.ok_or(DownloadError::NoArtifactProduced)
}

/// Name the client should save the artifact under
pub fn public_filename(output_basename: Option<&str>, plan: &ResolvedPlan, artifact: &Path) -> String {
    match output_basename {
        Some(base) => format!("{}.{}", base, plan.output_extension()),
        None => artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("download.{}", plan.output_extension())),
    }
}
