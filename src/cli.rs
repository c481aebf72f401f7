use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "universal-downloader")]
#[command(author, version, about = "Probe media URLs and download a single playable file")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web UI and HTTP API
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory that holds per-request workspaces
        #[arg(long)]
        temp_root: Option<PathBuf>,
    },

    /// List the video and audio formats available for a URL
    Probe {
        #[arg(required = true)]
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a URL into a directory
    Fetch {
        #[arg(required = true)]
        url: String,

        /// best_video_with_audio, best_audio_only or best_compatible_mp4
        #[arg(long, conflicts_with_all = ["video", "audio"])]
        preset: Option<String>,

        /// Video format id from `probe`
        #[arg(long)]
        video: Option<String>,

        /// Audio format id from `probe`
        #[arg(long)]
        audio: Option<String>,

        /// Target codec for audio-only downloads
        #[arg(long)]
        audio_codec: Option<String>,

        /// Output filename, without extension
        #[arg(long)]
        filename: Option<String>,

        /// Directory to save the file into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Check that yt-dlp and ffmpeg are available
    CheckTools,
}
