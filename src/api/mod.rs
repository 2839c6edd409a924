mod client;
#[cfg(test)]
pub mod fake;
mod models;
mod thumbnail;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::ProgressEvent;

pub use client::{ApiError, Result, YtDlpClient};
pub use models::{AudioExtraction, DownloadOptions, ProbeScope, RawInfo, YtDlpConfig};
pub use thumbnail::{Thumbnail, ThumbnailClient};

/// The extraction tool everything is delegated to.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Resolve metadata without transferring any media.
    async fn extract_info(&self, url: &str, scope: ProbeScope) -> Result<RawInfo>;

    /// Download one URL. `progress` is called for every byte-progress report,
    /// in order, on the calling task. Returns the final file when the tool named it.
    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Option<PathBuf>>;
}
