pub mod cli;
pub mod config;
pub mod downloader;
pub mod server;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::Config;
use downloader::orchestrator::discard_workspace;
use downloader::tools::ToolManager;
use downloader::{DownloadRequest, Downloader, FormatCatalog, YtDlpEngine};
use server::AppState;

/// Parse arguments, load config and dispatch the chosen command
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = config::load_config_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            temp_root,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(temp_root) = temp_root {
                config.storage.temp_root = temp_root;
            }
            config::validate_config(&config)?;
            serve(config).await
        }
        Commands::Probe { url, json } => {
            let catalog = build_downloader(&config).probe(&url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                print_catalog(&catalog);
            }
            Ok(())
        }
        Commands::Fetch {
            url,
            preset,
            video,
            audio,
            audio_codec,
            filename,
            output_dir,
        } => {
            let request = DownloadRequest {
                url: Some(url),
                preset,
                video_format_id: video,
                audio_format_id: audio,
                audio_codec,
                output_basename: filename,
            };
            fetch(&config, request, &output_dir).await
        }
        Commands::CheckTools => {
            let tools = tool_manager(&config);
            for tool in tools.get_all_tools() {
                if tool.is_available {
                    println!(
                        "{:<8} {:<16} {}",
                        tool.name,
                        tool.version.as_deref().unwrap_or("unknown"),
                        tool.path.as_deref().unwrap_or("")
                    );
                } else {
                    println!("{:<8} not found", tool.name);
                }
            }
            Ok(())
        }
    }
}

fn build_downloader(config: &Config) -> Downloader {
    let engine = YtDlpEngine::new(config.engine.clone());
    Downloader::new(Arc::new(engine), config.storage.temp_root.clone())
}

fn tool_manager(config: &Config) -> ToolManager {
    ToolManager::new(
        config.engine.ytdlp_path.clone(),
        config.engine.ffmpeg_location.clone(),
    )
}

async fn serve(config: Config) -> Result<()> {
    let tools = tool_manager(&config);
    for tool in tools.get_all_tools() {
        if !tool.is_available {
            tracing::warn!("{} not found; downloads will fail until it is installed", tool.name);
        }
    }

    let downloader = build_downloader(&config);
    tracing::info!(engine = downloader.engine_name(), "Workspaces under {:?}", downloader.temp_root());
    let state = AppState::new(downloader, tools, config.defaults.audio_codec);
    server::start_server(&config.server, state).await
}

async fn fetch(config: &Config, request: DownloadRequest, output_dir: &Path) -> Result<()> {
    let (url, intent) = request.into_parts(config.defaults.audio_codec)?;
    let result = build_downloader(config).download(&url, &intent).await?;

    let destination = output_dir.join(&result.public_filename);
    let copied = async {
        tokio::fs::create_dir_all(output_dir).await?;
        tokio::fs::copy(&result.artifact, &destination).await
    }
    .await;
    discard_workspace(result.into_workspace());

    let bytes = copied.with_context(|| format!("Failed to save {:?}", destination))?;
    println!("Saved {} ({} bytes)", destination.display(), bytes);
    Ok(())
}

fn print_catalog(catalog: &FormatCatalog) {
    if let Some(title) = &catalog.title {
        println!("{}", title);
    }
    if let Some(duration) = catalog.duration_seconds {
        println!("Duration: {:.0}s", duration);
    }

    println!("\nVideo formats:");
    for f in &catalog.video_formats {
        println!(
            "  {:<10} {:<5} {:<12} {:<14} {}{}",
            f.format_id,
            f.container,
            f.resolution.as_deref().unwrap_or("?"),
            f.video_codec.as_deref().unwrap_or("?"),
            if f.has_audio { "+audio " } else { "" },
            size_label(f.effective_size())
        );
    }

    println!("\nAudio formats:");
    for f in &catalog.audio_formats {
        println!(
            "  {:<10} {:<5} {:<14} {:>6} {}",
            f.format_id,
            f.container,
            f.audio_codec.as_deref().unwrap_or("?"),
            f.bitrate_kbps.map(|b| format!("{:.0}k", b)).unwrap_or_default(),
            size_label(f.effective_size())
        );
    }
}

fn size_label(bytes: Option<u64>) -> String {
    bytes
        .map(|b| format!("{:.1} MiB", b as f64 / (1024.0 * 1024.0)))
        .unwrap_or_default()
}
