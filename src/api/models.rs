use serde::Deserialize;
use std::path::PathBuf;

/// Metadata record printed by `yt-dlp --dump-single-json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    /// Present only for playlists; unavailable members come back as `null`
    #[serde(default)]
    pub entries: Option<Vec<Option<RawInfo>>>,
}

impl RawInfo {
    pub fn uploader(&self) -> Option<&str> {
        self.uploader.as_deref().or(self.channel.as_deref())
    }
}

/// How much of a link the probe should resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeScope {
    /// Only the addressed video, even if the link also names a playlist
    Single,
    /// Playlist members are listed without resolving each one
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    pub codec: String,
    pub quality: String,
}

/// Configuration bundle for a single download call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub format: String,
    pub output_template: String,
    pub extract_audio: Option<AudioExtraction>,
    pub allow_collection: bool,
    pub ignore_errors: bool,
    pub ffmpeg_location: Option<PathBuf>,
}

/// Configuration for the yt-dlp client
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub binary: PathBuf,
    pub socket_timeout: u32,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(if cfg!(windows) { "yt-dlp.exe" } else { "yt-dlp" }),
            socket_timeout: 30,
        }
    }
}
