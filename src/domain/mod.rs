pub mod error;
pub mod model;
pub mod session;

pub use error::AppError;
pub use model::{
    CollectionInfo, DownloadMode, DownloadPlan, DownloadTarget, FailurePolicy, MediaInfo,
    ProgressEvent, ProgressPhase, ProgressUpdate, ReconcileReport, SessionOutcome,
    SessionReport, SessionResult, TargetOutcome,
};
pub use session::{Activity, SessionState};
