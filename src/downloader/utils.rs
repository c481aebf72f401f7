// Helper functions shared by the engine and the orchestrator

use regex::Regex;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::DownloadError;

lazy_static::lazy_static! {
    // ERROR: [youtube] dQw4w9WgXcQ: Video unavailable
    static ref ERROR_LINE_RE: Regex =
        Regex::new(r"^ERROR:\s*(?:\[[^\]]+\]\s*)?(?:[\w-]+:\s+)?(.+)$").unwrap();
    static ref UNSAFE_FILENAME_RE: Regex = Regex::new(r#"[\\/:*?"<>|\x00-\x1f]+"#).unwrap();
}

/// Run a command to completion with a timeout, capturing stdout and stderr.
///
/// On timeout the child is killed; a failure to start maps to `ToolNotFound`.
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<OsString>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DownloadError::ToolNotFound(format!("{}: {}", program, e))
            }
            _ => DownloadError::Io(e),
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::ParseError(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::ParseError(format!("Failed to capture stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status) => {
            let status = status?;
            let stdout = join_pipe(stdout_task).await?;
            let stderr = join_pipe(stderr_task).await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            tracing::warn!(program, timeout_secs, "process timed out, killing");
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::timed_out(timeout_secs))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::Io(std::io::Error::other(e)))?
        .map_err(DownloadError::Io)
}

/// Pull the human-readable part of the last `ERROR:` line out of engine stderr.
///
/// Falls back to the last non-empty line when there is no `ERROR:` prefix.
pub fn extract_error_line(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find_map(|line| {
            ERROR_LINE_RE
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .or_else(|| lines.last().map(|l| l.to_string()))
}

/// Make a user-supplied basename safe to use as a download filename.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_basename(raw: &str) -> Option<String> {
    let replaced = UNSAFE_FILENAME_RE.replace_all(raw.trim(), "_");
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(200).collect())
    }
}
