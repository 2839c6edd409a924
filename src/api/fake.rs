//! Scripted extractor for tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ApiError, DownloadOptions, Extractor, ProbeScope, RawInfo, Result};
use crate::domain::{ProgressEvent, ProgressPhase};

#[derive(Debug, Clone, Default)]
pub struct FakeDownload {
    pub events: Vec<ProgressEvent>,
    /// Title substituted into the output template; the file is created on success
    pub title: Option<String>,
    pub error: Option<String>,
}

impl FakeDownload {
    pub fn ok(title: &str, total: u64) -> Self {
        Self {
            events: vec![
                ProgressEvent {
                    downloaded_bytes: total / 2,
                    total_bytes: Some(total),
                    phase: ProgressPhase::Downloading,
                },
                ProgressEvent {
                    downloaded_bytes: total,
                    total_bytes: Some(total),
                    phase: ProgressPhase::Downloading,
                },
                ProgressEvent {
                    downloaded_bytes: total,
                    total_bytes: Some(total),
                    phase: ProgressPhase::Finished,
                },
            ],
            title: Some(title.to_string()),
            error: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            events: vec![ProgressEvent {
                downloaded_bytes: 1024,
                total_bytes: None,
                phase: ProgressPhase::Downloading,
            }],
            title: None,
            error: Some(message.to_string()),
        }
    }
}

#[derive(Default)]
pub struct FakeExtractor {
    infos: HashMap<String, std::result::Result<RawInfo, String>>,
    downloads: HashMap<String, FakeDownload>,
    pub probes: Mutex<Vec<(String, ProbeScope)>>,
    pub calls: Mutex<Vec<(String, DownloadOptions)>>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info(mut self, url: &str, info: RawInfo) -> Self {
        self.infos.insert(url.to_string(), Ok(info));
        self
    }

    pub fn with_probe_error(mut self, url: &str, message: &str) -> Self {
        self.infos.insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_download(mut self, url: &str, download: FakeDownload) -> Self {
        self.downloads.insert(url.to_string(), download);
        self
    }

    pub fn downloaded_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

pub fn raw_video(id: &str, title: &str) -> RawInfo {
    RawInfo {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        url: Some(format!("https://www.youtube.com/watch?v={}", id)),
        ..Default::default()
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract_info(&self, url: &str, scope: ProbeScope) -> Result<RawInfo> {
        self.probes.lock().unwrap().push((url.to_string(), scope));
        match self.infos.get(url) {
            Some(Ok(info)) => Ok(info.clone()),
            Some(Err(message)) => Err(ApiError::Failed(message.clone())),
            None => Err(ApiError::Failed(format!("ERROR: Unsupported URL: {}", url))),
        }
    }

    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Option<PathBuf>> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), options.clone()));

        let script = self
            .downloads
            .get(url)
            .cloned()
            .unwrap_or_else(|| FakeDownload::failing("ERROR: Unsupported URL"));

        for event in script.events {
            progress(event);
        }

        if let Some(message) = script.error {
            return Err(ApiError::Failed(message));
        }

        match script.title {
            Some(title) => {
                let ext = options
                    .extract_audio
                    .as_ref()
                    .map(|audio| audio.codec.as_str())
                    .unwrap_or("mp4");
                let path = PathBuf::from(
                    options
                        .output_template
                        .replace("%(title)s", &title)
                        .replace("%(ext)s", ext)
                        .replace("%%", "%"),
                );
                std::fs::write(&path, b"media")?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }
}
