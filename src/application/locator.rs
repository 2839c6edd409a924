use std::path::{Path, PathBuf};

#[cfg(windows)]
const FFMPEG_BINARY: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const FFMPEG_BINARY: &str = "ffmpeg";

/// Finds an optional ffmpeg binary.
///
/// Lookup order: explicit override, then copies bundled next to the
/// executable, then the candidate list. The first path that exists wins.
#[derive(Debug, Clone, Default)]
pub struct FfmpegLocator {
    override_path: Option<PathBuf>,
    bundled_dirs: Vec<PathBuf>,
    candidates: Vec<PathBuf>,
}

impl FfmpegLocator {
    pub fn new(
        override_path: Option<PathBuf>,
        bundled_dirs: Vec<PathBuf>,
        candidates: Vec<PathBuf>,
    ) -> Self {
        Self {
            override_path,
            bundled_dirs,
            candidates,
        }
    }

    /// Locator with the platform defaults, plus any extra candidates.
    pub fn with_defaults(override_path: Option<PathBuf>, extra: Vec<PathBuf>) -> Self {
        let bundled_dirs = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .into_iter()
            .collect();

        let mut candidates = default_candidates();
        candidates.extend(extra);
        Self::new(override_path, bundled_dirs, candidates)
    }

    fn search_order(&self) -> Vec<PathBuf> {
        let mut order = Vec::new();
        order.extend(self.override_path.clone());
        for dir in &self.bundled_dirs {
            order.push(dir.join("ffmpeg").join(FFMPEG_BINARY));
            order.push(dir.join(FFMPEG_BINARY));
        }
        order.extend(self.candidates.iter().cloned());
        order
    }

    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.override_path {
            if !path.exists() {
                log::warn!("ffmpeg override {} does not exist, searching defaults", path.display());
            }
        }

        let found = self.search_order().into_iter().find(|path| path.is_file());
        match &found {
            Some(path) => log::info!("ffmpeg found at {}", path.display()),
            None => log::warn!("ffmpeg not found; audio extraction and container fixes may fail"),
        }
        found
    }
}

#[cfg(windows)]
fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(
            r"AppData\Local\Microsoft\WinGet\Packages\Gyan.FFmpeg_Microsoft.Winget.Source_8wekyb3d8bbwe\ffmpeg-8.0.1-full_build\bin\ffmpeg.exe",
        ));
        candidates.push(home.join(r"scoop\apps\ffmpeg\current\bin\ffmpeg.exe"));
    }
    candidates.push(PathBuf::from(r"C:\ffmpeg\bin\ffmpeg.exe"));
    candidates.push(PathBuf::from(r"C:\Program Files\ffmpeg\bin\ffmpeg.exe"));
    candidates
}

#[cfg(not(windows))]
fn default_candidates() -> Vec<PathBuf> {
    [
        "/opt/homebrew/bin/ffmpeg",
        "/usr/local/bin/ffmpeg",
        "/usr/bin/ffmpeg",
        "/snap/bin/ffmpeg",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}
