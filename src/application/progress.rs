use crate::domain::{ProgressEvent, ProgressPhase, ProgressUpdate};
use crate::utils::format_megabytes;

/// Turns raw byte counts into a completion fraction and status line.
///
/// One reporter covers one target. The fraction it reports never goes
/// backwards, even if the extractor's size estimate does.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    last_fraction: f32,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &ProgressEvent) -> ProgressUpdate {
        match event.phase {
            ProgressPhase::Finished => {
                self.last_fraction = 1.0;
                ProgressUpdate {
                    fraction: Some(1.0),
                    status: "Processing file...".to_string(),
                }
            }
            ProgressPhase::Downloading => match event.total_bytes.filter(|t| *t > 0) {
                Some(total) => {
                    let raw = (event.downloaded_bytes as f64 / total as f64).clamp(0.0, 1.0);
                    let fraction = (raw as f32).max(self.last_fraction);
                    self.last_fraction = fraction;
                    ProgressUpdate {
                        fraction: Some(fraction),
                        status: format!(
                            "Downloading: {} / {} ({:.1}%)",
                            format_megabytes(event.downloaded_bytes),
                            format_megabytes(total),
                            fraction * 100.0
                        ),
                    }
                }
                None => ProgressUpdate {
                    fraction: None,
                    status: format!(
                        "Downloading: {}...",
                        format_megabytes(event.downloaded_bytes)
                    ),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloading(downloaded: u64, total: Option<u64>) -> ProgressEvent {
        ProgressEvent {
            downloaded_bytes: downloaded,
            total_bytes: total,
            phase: ProgressPhase::Downloading,
        }
    }

    #[test]
    fn test_known_total() {
        let mut reporter = ProgressReporter::new();
        let update = reporter.observe(&downloading(1_048_576, Some(4_194_304)));
        assert_eq!(update.fraction, Some(0.25));
        assert_eq!(update.status, "Downloading: 1.0MB / 4.0MB (25.0%)");
    }

    #[test]
    fn test_unknown_total() {
        let mut reporter = ProgressReporter::new();
        let update = reporter.observe(&downloading(3 * 1_048_576, None));
        assert_eq!(update.fraction, None);
        assert_eq!(update.status, "Downloading: 3.0MB...");
    }

    #[test]
    fn test_clamped_and_monotonic() {
        let mut reporter = ProgressReporter::new();
        assert_eq!(reporter.observe(&downloading(600, Some(1000))).fraction, Some(0.6));
        // estimate grew, raw fraction would drop
        assert_eq!(reporter.observe(&downloading(700, Some(2000))).fraction, Some(0.6));
        assert_eq!(reporter.observe(&downloading(5000, Some(2000))).fraction, Some(1.0));
    }

    #[test]
    fn test_finished_forces_complete() {
        let mut reporter = ProgressReporter::new();
        reporter.observe(&downloading(10, Some(100)));
        let update = reporter.observe(&ProgressEvent {
            downloaded_bytes: 0,
            total_bytes: None,
            phase: ProgressPhase::Finished,
        });
        assert_eq!(update.fraction, Some(1.0));
        assert_eq!(update.status, "Processing file...");
    }

    #[test]
    fn test_new_reporter_starts_over() {
        let mut first = ProgressReporter::new();
        first.observe(&downloading(90, Some(100)));
        let mut second = ProgressReporter::new();
        assert_eq!(second.observe(&downloading(10, Some(100))).fraction, Some(0.1));
    }
}
