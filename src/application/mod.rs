pub mod download_coordinator;
pub mod link;
pub mod locator;
pub mod probe;
pub mod progress;
pub mod reconciler;

pub use download_coordinator::{DownloadCoordinator, SessionEvent};
pub use locator::FfmpegLocator;
pub use reconciler::reconcile;
