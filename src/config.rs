use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::api::{YtDlpClient, YtDlpConfig};
use crate::application::{DownloadCoordinator, FfmpegLocator};
use crate::domain::FailurePolicy;

/// Download YouTube videos, audio and playlists.
#[derive(Debug, Parser)]
#[command(name = "ytd", version, about)]
pub struct Cli {
    /// Use the text menu instead of opening a window
    #[arg(long)]
    pub console: bool,

    /// Folder downloads are saved to
    #[arg(short, long, value_name = "DIR", env = "YTD_DOWNLOAD_DIR")]
    pub dir: Option<PathBuf>,

    /// yt-dlp executable to run
    #[arg(long = "yt-dlp", value_name = "PATH", env = "YTD_YTDLP")]
    pub ytdlp: Option<PathBuf>,

    /// ffmpeg executable; checked before any other location
    #[arg(long, value_name = "PATH", env = "YTD_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Extra place to look for ffmpeg (repeatable)
    #[arg(long = "ffmpeg-candidate", value_name = "PATH")]
    pub ffmpeg_candidates: Vec<PathBuf>,

    /// Stop a playlist download at the first failed video
    #[arg(long)]
    pub stop_on_error: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub download_dir: PathBuf,
    pub ytdlp: YtDlpConfig,
    pub locator: FfmpegLocator,
    pub stop_on_error: bool,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let mut ytdlp = YtDlpConfig::default();
        if let Some(binary) = &cli.ytdlp {
            ytdlp.binary = binary.clone();
        }

        Self {
            download_dir: cli
                .dir
                .clone()
                .unwrap_or_else(|| default_download_dir(cli.console)),
            ytdlp,
            locator: FfmpegLocator::with_defaults(cli.ffmpeg.clone(), cli.ffmpeg_candidates.clone()),
            stop_on_error: cli.stop_on_error,
        }
    }

    /// Build the coordinator; ffmpeg is looked up here, once.
    pub fn coordinator(&self) -> DownloadCoordinator {
        let client = YtDlpClient::new(self.ytdlp.clone());
        let coordinator = DownloadCoordinator::new(Arc::new(client), self.locator.resolve());
        if self.stop_on_error {
            coordinator.with_failure_policy(FailurePolicy::AbortOnFirstFailure)
        } else {
            coordinator
        }
    }
}

/// The console keeps a `downloads` folder next to where it runs; the window
/// saves to the user's Downloads folder.
pub fn default_download_dir(console: bool) -> PathBuf {
    if console {
        return PathBuf::from("downloads");
    }
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads"))
}

pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}
