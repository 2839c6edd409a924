use super::{AppError, MediaInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Analyzing,
    Downloading,
}

/// Front-end session: the last analyzed media and whatever is in flight.
///
/// Only one background action runs at a time. Requests made while another
/// action is in flight are rejected, not queued.
#[derive(Debug, Clone)]
pub struct SessionState {
    media: Option<MediaInfo>,
    activity: Activity,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            media: None,
            activity: Activity::Idle,
        }
    }
}

impl SessionState {
    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn media(&self) -> Option<&MediaInfo> {
        self.media.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    fn ensure_idle(&self) -> Result<(), AppError> {
        match self.activity {
            Activity::Idle => Ok(()),
            Activity::Analyzing => Err(AppError::Busy("analysis")),
            Activity::Downloading => Err(AppError::Busy("download")),
        }
    }

    pub fn begin_analysis(&mut self) -> Result<(), AppError> {
        self.ensure_idle()?;
        self.activity = Activity::Analyzing;
        Ok(())
    }

    /// A failed analysis clears the previous media so no stale plan can be built.
    pub fn finish_analysis(&mut self, media: Option<MediaInfo>) {
        self.media = media;
        self.activity = Activity::Idle;
    }

    pub fn begin_download(&mut self) -> Result<&MediaInfo, AppError> {
        self.ensure_idle()?;
        let media = self.media.as_ref().ok_or(AppError::NotAnalyzed)?;
        self.activity = Activity::Downloading;
        Ok(media)
    }

    pub fn finish_download(&mut self) {
        self.activity = Activity::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DownloadTarget;

    fn media() -> MediaInfo {
        MediaInfo::Video(DownloadTarget {
            url: "https://youtu.be/abc123".to_string(),
            title: "Clip".to_string(),
            duration: Some(61),
            view_count: None,
            uploader: None,
            thumbnail: None,
            ordinal: None,
        })
    }

    #[test]
    fn test_download_requires_analysis() {
        let mut state = SessionState::default();
        assert_eq!(state.begin_download().unwrap_err(), AppError::NotAnalyzed);
        assert_eq!(state.activity(), Activity::Idle);
    }

    #[test]
    fn test_second_download_is_rejected() {
        let mut state = SessionState::default();
        state.begin_analysis().unwrap();
        state.finish_analysis(Some(media()));

        state.begin_download().unwrap();
        assert_eq!(
            state.begin_download().unwrap_err(),
            AppError::Busy("download")
        );
        assert_eq!(
            state.begin_analysis().unwrap_err(),
            AppError::Busy("download")
        );

        state.finish_download();
        assert!(state.begin_download().is_ok());
    }

    #[test]
    fn test_failed_analysis_clears_media() {
        let mut state = SessionState::default();
        state.begin_analysis().unwrap();
        state.finish_analysis(Some(media()));
        state.begin_analysis().unwrap();
        state.finish_analysis(None);
        assert!(state.media().is_none());
    }
}
