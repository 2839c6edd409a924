use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    api::{AudioExtraction, DownloadOptions, Extractor},
    domain::{
        AppError, DownloadMode, DownloadPlan, DownloadTarget, FailurePolicy, MediaInfo,
        ProgressEvent, ProgressUpdate, SessionOutcome, SessionReport, TargetOutcome,
    },
    utils::collection_dir_name,
};

use super::{link::classify_link, probe::probe, progress::ProgressReporter, reconciler::reconcile};

const SKIPPED_REASON: &str = "Skipped after an earlier failure";

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// `position` is 1-based within the plan
    TargetStarted {
        position: usize,
        total: usize,
        title: String,
    },
    Progress(ProgressUpdate),
    TargetFinished(TargetOutcome),
    /// Last event of a session, sent after the output directory was reconciled
    Finished(SessionReport),
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    extractor: Arc<dyn Extractor>,
    ffmpeg: Option<PathBuf>,
    /// Replaces the policy every plan derives from its size
    failure_policy: Option<FailurePolicy>,
}

impl DownloadCoordinator {
    pub fn new(extractor: Arc<dyn Extractor>, ffmpeg: Option<PathBuf>) -> Self {
        Self {
            extractor,
            ffmpeg,
            failure_policy: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn ffmpeg(&self) -> Option<&Path> {
        self.ffmpeg.as_deref()
    }

    pub async fn probe(&self, input: String) -> Result<MediaInfo, AppError> {
        let link = classify_link(&input)?;
        probe(self.extractor.as_ref(), &link).await
    }

    /// Turn analyzed media plus the user's choices into a plan.
    ///
    /// `selection` holds 0-based indices into the collection entries and is
    /// ignored for single videos.
    pub fn build_plan(
        media: &MediaInfo,
        mode: DownloadMode,
        selection: &[usize],
        base_dir: &Path,
    ) -> Result<DownloadPlan, AppError> {
        match media {
            MediaInfo::Video(target) => {
                DownloadPlan::new(mode, vec![target.clone()], base_dir.to_path_buf(), false)
            }
            MediaInfo::Collection(collection) => {
                let mut indices = selection.to_vec();
                indices.sort_unstable();
                indices.dedup();

                let targets = indices
                    .into_iter()
                    .map(|index| {
                        collection
                            .entries
                            .get(index)
                            .cloned()
                            .ok_or(AppError::InvalidSelection(index + 1))
                    })
                    .collect::<Result<Vec<DownloadTarget>, AppError>>()?;

                let destination = base_dir.join(collection_dir_name(&collection.title));
                DownloadPlan::new(mode, targets, destination, true)
            }
        }
    }

    pub async fn choose_folder(&self, current: PathBuf) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_directory(&current)
            .pick_folder()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    fn download_options(&self, plan: &DownloadPlan, target: &DownloadTarget) -> DownloadOptions {
        DownloadOptions {
            format: plan.mode.format_selector().to_string(),
            output_template: plan.output_template(target),
            extract_audio: plan
                .mode
                .audio_extraction()
                .map(|(codec, quality)| AudioExtraction {
                    codec: codec.to_string(),
                    quality: quality.to_string(),
                }),
            allow_collection: false,
            ignore_errors: false,
            ffmpeg_location: self.ffmpeg.clone(),
        }
    }

    /// Run every target of the plan, one after another.
    pub async fn execute(
        &self,
        plan: DownloadPlan,
        events: &UnboundedSender<SessionEvent>,
    ) -> SessionReport {
        let plan = match self.failure_policy {
            Some(policy) => plan.with_policy(policy),
            None => plan,
        };
        log::info!(
            "starting {} session: {} item(s) into {}",
            plan.mode.label(),
            plan.targets.len(),
            plan.destination.display()
        );

        if let Err(e) = tokio::fs::create_dir_all(&plan.destination).await {
            let reason = AppError::Io(format!(
                "Could not create {}: {}",
                plan.destination.display(),
                e
            ))
            .to_string();
            log::error!("{}", reason);

            let outcomes = plan
                .targets
                .iter()
                .map(|target| outcome_for(target, SessionOutcome::Failed(reason.clone()), None))
                .collect();
            return SessionReport::new(plan.destination, outcomes);
        }

        let total = plan.targets.len();
        let mut outcomes = Vec::with_capacity(total);

        let mut stopped = false;

        for (index, target) in plan.targets.iter().enumerate() {
            // every target still gets an outcome once the policy has stopped the run
            if stopped {
                let outcome =
                    outcome_for(target, SessionOutcome::Failed(SKIPPED_REASON.to_string()), None);
                let _ = events.send(SessionEvent::TargetFinished(outcome.clone()));
                outcomes.push(outcome);
                continue;
            }

            let _ = events.send(SessionEvent::TargetStarted {
                position: index + 1,
                total,
                title: target.title.clone(),
            });

            let options = self.download_options(&plan, target);
            let mut reporter = ProgressReporter::new();
            let mut on_progress = |event: ProgressEvent| {
                let _ = events.send(SessionEvent::Progress(reporter.observe(&event)));
            };

            let result = self
                .extractor
                .download(&target.url, &options, &mut on_progress)
                .await;

            let outcome = match result {
                Ok(output) => {
                    log::info!("downloaded {}", target.title);
                    outcome_for(target, SessionOutcome::Succeeded, output)
                }
                Err(e) => {
                    log::warn!("download of {} failed: {}", target.title, e);
                    outcome_for(target, SessionOutcome::Failed(e.to_string()), None)
                }
            };

            let failed = !outcome.succeeded();
            let _ = events.send(SessionEvent::TargetFinished(outcome.clone()));
            outcomes.push(outcome);

            if failed && plan.policy == FailurePolicy::AbortOnFirstFailure {
                log::warn!("stopping after failed target, {} left", total - index - 1);
                stopped = true;
            }
        }

        SessionReport::new(plan.destination, outcomes)
    }

    /// Run the plan on a background task and report through a channel.
    ///
    /// The destination is reconciled only once the worker task has ended,
    /// whether it finished, failed or panicked. Must be called from within a
    /// tokio runtime.
    pub fn spawn_session(&self, plan: DownloadPlan) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = self.clone();

        tokio::spawn(async move {
            let destination = plan.destination.clone();
            let worker_events = tx.clone();
            let worker =
                tokio::spawn(async move { coordinator.execute(plan, &worker_events).await });

            let mut report = match worker.await {
                Ok(report) => report,
                Err(e) => {
                    log::error!("download worker ended abnormally: {}", e);
                    SessionReport::aborted(destination, e.to_string())
                }
            };

            let dir = report.destination.clone();
            report.cleanup = tokio::task::spawn_blocking(move || reconcile(&dir))
                .await
                .unwrap_or_default();

            let _ = tx.send(SessionEvent::Finished(report));
        });

        rx
    }

    /// Same as [`spawn_session`](Self::spawn_session), as a lazy stream: the
    /// worker starts on first poll, on whatever executor polls it.
    pub fn session_stream(&self, plan: DownloadPlan) -> BoxStream<'static, SessionEvent> {
        futures::stream::unfold(
            SessionStreamState::Start {
                coordinator: self.clone(),
                plan,
            },
            |state| async move {
                let mut events = match state {
                    SessionStreamState::Start { coordinator, plan } => {
                        coordinator.spawn_session(plan)
                    }
                    SessionStreamState::Running(events) => events,
                };

                events
                    .recv()
                    .await
                    .map(|event| (event, SessionStreamState::Running(events)))
            },
        )
        .boxed()
    }
}

enum SessionStreamState {
    Start {
        coordinator: DownloadCoordinator,
        plan: DownloadPlan,
    },
    Running(UnboundedReceiver<SessionEvent>),
}

fn outcome_for(
    target: &DownloadTarget,
    outcome: SessionOutcome,
    output: Option<PathBuf>,
) -> TargetOutcome {
    TargetOutcome {
        ordinal: target.ordinal,
        title: target.title.clone(),
        outcome,
        output,
    }
}
