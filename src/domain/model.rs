use std::path::{Path, PathBuf};

use super::AppError;

/// A single downloadable item, as reported by the metadata probe.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTarget {
    pub url: String,
    pub title: String,
    pub duration: Option<u64>,
    pub view_count: Option<u64>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
    /// 1-based position in the source collection
    pub ordinal: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub title: String,
    pub uploader: Option<String>,
    pub entries: Vec<DownloadTarget>,
}

impl CollectionInfo {
    pub fn member_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaInfo {
    Video(DownloadTarget),
    Collection(CollectionInfo),
}

impl MediaInfo {
    pub fn title(&self) -> &str {
        match self {
            MediaInfo::Video(target) => &target.title,
            MediaInfo::Collection(collection) => &collection.title,
        }
    }

    /// Thumbnail to preview; for collections this is the first member's.
    pub fn thumbnail(&self) -> Option<&str> {
        match self {
            MediaInfo::Video(target) => target.thumbnail.as_deref(),
            MediaInfo::Collection(collection) => collection
                .entries
                .first()
                .and_then(|entry| entry.thumbnail.as_deref()),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, MediaInfo::Collection(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    Video,
    Audio,
}

impl DownloadMode {
    pub fn format_selector(self) -> &'static str {
        match self {
            DownloadMode::Video => "best[ext=mp4]/best",
            DownloadMode::Audio => "bestaudio/best",
        }
    }

    /// (codec, quality) for the audio extraction step, if any.
    pub fn audio_extraction(self) -> Option<(&'static str, &'static str)> {
        match self {
            DownloadMode::Video => None,
            DownloadMode::Audio => Some(("mp3", "192")),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DownloadMode::Video => "MP4",
            DownloadMode::Audio => "MP3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    ContinueOnItemFailure,
    AbortOnFirstFailure,
}

impl FailurePolicy {
    pub fn for_target_count(count: usize) -> Self {
        if count > 1 {
            FailurePolicy::ContinueOnItemFailure
        } else {
            FailurePolicy::AbortOnFirstFailure
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub mode: DownloadMode,
    pub targets: Vec<DownloadTarget>,
    pub destination: PathBuf,
    /// Collection plans prefix output names with the source ordinal.
    pub from_collection: bool,
    pub policy: FailurePolicy,
}

impl DownloadPlan {
    pub fn new(
        mode: DownloadMode,
        targets: Vec<DownloadTarget>,
        destination: PathBuf,
        from_collection: bool,
    ) -> Result<Self, AppError> {
        if targets.is_empty() {
            return Err(AppError::NothingSelected);
        }

        let policy = FailurePolicy::for_target_count(targets.len());
        Ok(Self {
            mode,
            targets,
            destination,
            from_collection,
            policy,
        })
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Output template handed to the extractor for one target.
    ///
    /// Collection members are prefixed with their source ordinal; a member
    /// without one keeps the plain title name.
    pub fn output_template(&self, target: &DownloadTarget) -> String {
        let name = match target.ordinal.filter(|_| self.from_collection) {
            Some(ordinal) => format!("{} - %(title)s.%(ext)s", ordinal),
            None => "%(title)s.%(ext)s".to_string(),
        };

        let dir = escape_template(&self.destination);
        if dir.is_empty() {
            name
        } else {
            format!("{}{}{}", dir, std::path::MAIN_SEPARATOR, name)
        }
    }
}

fn escape_template(dir: &Path) -> String {
    dir.to_string_lossy()
        .trim_end_matches(['/', '\\'])
        .replace('%', "%%")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Downloading,
    Finished,
}

/// Raw byte-level progress reported by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub phase: ProgressPhase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// `None` while the total size is unknown
    pub fraction: Option<f32>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetOutcome {
    pub ordinal: Option<usize>,
    pub title: String,
    pub outcome: SessionOutcome,
    pub output: Option<PathBuf>,
}

impl TargetOutcome {
    pub fn succeeded(&self) -> bool {
        self.outcome == SessionOutcome::Succeeded
    }

    pub fn label(&self) -> String {
        match self.ordinal {
            Some(ordinal) => format!("{} - {}", ordinal, self.title),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResult {
    Succeeded,
    PartiallySucceeded,
    Failed,
}

impl SessionResult {
    pub fn from_outcomes(outcomes: &[TargetOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        if outcomes.is_empty() || succeeded == 0 {
            SessionResult::Failed
        } else if succeeded == outcomes.len() {
            SessionResult::Succeeded
        } else {
            SessionResult::PartiallySucceeded
        }
    }
}

/// What the reconciler did to a destination directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub promoted: Vec<PathBuf>,
    pub removed_stale: Vec<PathBuf>,
    pub deleted_leftovers: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.promoted.is_empty()
            && self.removed_stale.is_empty()
            && self.deleted_leftovers.is_empty()
            && self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub destination: PathBuf,
    pub outcomes: Vec<TargetOutcome>,
    pub result: SessionResult,
    /// Set when the worker terminated abnormally
    pub aborted: Option<String>,
    pub cleanup: ReconcileReport,
}

impl SessionReport {
    pub fn new(destination: PathBuf, outcomes: Vec<TargetOutcome>) -> Self {
        let result = SessionResult::from_outcomes(&outcomes);
        Self {
            destination,
            outcomes,
            result,
            aborted: None,
            cleanup: ReconcileReport::default(),
        }
    }

    pub fn aborted(destination: PathBuf, reason: String) -> Self {
        Self {
            destination,
            outcomes: Vec::new(),
            result: SessionResult::Failed,
            aborted: Some(reason),
            cleanup: ReconcileReport::default(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&TargetOutcome, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            SessionOutcome::Failed(reason) => Some((o, reason.as_str())),
            SessionOutcome::Succeeded => None,
        })
    }

    /// Acknowledgement shown to the user once the session is over.
    pub fn summary(&self) -> String {
        if let Some(reason) = &self.aborted {
            return format!("Download failed: {}", reason);
        }

        match self.result {
            SessionResult::Succeeded => {
                format!("Download complete! Saved to: {}", self.destination.display())
            }
            SessionResult::PartiallySucceeded => {
                let succeeded = self.outcomes.iter().filter(|o| o.succeeded()).count();
                let mut message = format!(
                    "Downloaded {} of {} items to: {}\nFailed:",
                    succeeded,
                    self.outcomes.len(),
                    self.destination.display()
                );
                for (outcome, reason) in self.failures() {
                    message.push_str(&format!("\n  {}: {}", outcome.label(), reason));
                }
                message
            }
            SessionResult::Failed => match self.outcomes.as_slice() {
                [single] => match &single.outcome {
                    SessionOutcome::Failed(reason) => format!("Download failed: {}", reason),
                    SessionOutcome::Succeeded => "Download failed".to_string(),
                },
                _ => {
                    let mut message =
                        format!("All {} downloads failed:", self.outcomes.len());
                    for (outcome, reason) in self.failures() {
                        message.push_str(&format!("\n  {}: {}", outcome.label(), reason));
                    }
                    message
                }
            },
        }
    }
}
