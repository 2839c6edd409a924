use std::path::PathBuf;

use futures::StreamExt;
use iced::widget::image;
use iced::Task;
use rfd::{AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};

use crate::api::{Thumbnail, ThumbnailClient};
use crate::application::{DownloadCoordinator, SessionEvent};
use crate::config::AppConfig;
use crate::domain::{
    AppError, DownloadMode, DownloadPlan, MediaInfo, SessionResult, SessionState,
};
use crate::ui::{DownloadMessage, DownloadView};

pub struct DownloadApp {
    view: DownloadView,
    coordinator: DownloadCoordinator,
    thumbnails: ThumbnailClient,
    session: SessionState,
}

impl DownloadApp {
    pub fn new(config: &AppConfig) -> Self {
        let coordinator = config.coordinator();
        let mut view = DownloadView::new(config.download_dir.clone());
        view.status_message = if coordinator.ffmpeg().is_some() {
            "Paste a YouTube link to start".to_string()
        } else {
            "ffmpeg not found: MP3 conversion may not work".to_string()
        };

        Self {
            view,
            coordinator,
            thumbnails: ThumbnailClient::new(),
            session: SessionState::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Ui(DownloadMessage),
    Analyzed(Result<MediaInfo, AppError>),
    /// (Thumbnail URL, decoded image)
    ThumbnailLoaded(String, Result<Thumbnail, String>),
    FolderSelected(Option<PathBuf>),
    /// Collection plan and whether the user agreed to start it
    PlanConfirmed(DownloadPlan, bool),
    Session(SessionEvent),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::Ui(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::AnalyzePressed => return analyze(app),
                DownloadMessage::DownloadPressed(mode) => return request_download(app, mode),
                DownloadMessage::ChangeFolderPressed if !app.session.is_busy() => {
                    let coordinator = app.coordinator.clone();
                    let current = app.view.download_dir.clone();
                    return Task::perform(
                        async move { coordinator.choose_folder(current).await },
                        Message::FolderSelected,
                    );
                }
                _ => {}
            }
        }
        Message::Analyzed(result) => {
            app.view.download_progress = 0.0;
            match result {
                Ok(media) => {
                    app.view.show_media(&media);
                    let thumbnail = media.thumbnail().map(str::to_string);
                    app.session.finish_analysis(Some(media));

                    if let Some(url) = thumbnail {
                        let client = app.thumbnails.clone();
                        return Task::perform(
                            async move {
                                let result = client.fetch(&url).await.map_err(|e| e.to_string());
                                (url, result)
                            },
                            |(url, result)| Message::ThumbnailLoaded(url, result),
                        );
                    }
                }
                Err(e) => {
                    app.session.finish_analysis(None);
                    app.view.status_message = e.to_string();
                    return show_error(e);
                }
            }
        }
        Message::ThumbnailLoaded(url, result) => {
            // a newer analysis may have replaced the media meanwhile
            let current = app.session.media().and_then(MediaInfo::thumbnail);
            if current == Some(url.as_str()) {
                match result {
                    Ok(thumbnail) => {
                        app.view.thumbnail = Some(image::Handle::from_rgba(
                            thumbnail.width,
                            thumbnail.height,
                            thumbnail.pixels,
                        ));
                    }
                    Err(e) => log::debug!("no thumbnail from {}: {}", url, e),
                }
            }
        }
        Message::FolderSelected(dir) => {
            if let Some(dir) = dir {
                app.view.download_dir = dir;
            }
        }
        Message::PlanConfirmed(plan, confirmed) => {
            if confirmed {
                return start_session(app, plan);
            }
            app.view.status_message = "Download cancelled".to_string();
        }
        Message::Session(event) => return on_session_event(app, event),
    }
    Task::none()
}

fn analyze(app: &mut DownloadApp) -> Task<Message> {
    if let Err(e) = app.session.begin_analysis() {
        return show_warning(e);
    }

    app.view.clear_media();
    app.view.status_message = "Analyzing link, please wait...".to_string();

    let coordinator = app.coordinator.clone();
    let link = app.view.link.clone();
    Task::perform(
        async move { coordinator.probe(link).await },
        Message::Analyzed,
    )
}

fn request_download(app: &mut DownloadApp, mode: DownloadMode) -> Task<Message> {
    if app.session.is_busy() {
        return show_warning(AppError::Busy("download"));
    }
    let Some(media) = app.session.media() else {
        return show_warning(AppError::NotAnalyzed);
    };

    let selection = app.view.selected_indices();
    let plan = match DownloadCoordinator::build_plan(
        media,
        mode,
        &selection,
        &app.view.download_dir,
    ) {
        Ok(plan) => plan,
        Err(e) => return show_warning(e),
    };

    if !plan.from_collection {
        return start_session(app, plan);
    }

    let question = format!(
        "Download {} videos as {}?\n\nThey will be saved to: {}",
        plan.targets.len(),
        plan.mode.label(),
        plan.destination.display()
    );
    Task::perform(
        async move {
            let answer = AsyncMessageDialog::new()
                .set_level(MessageLevel::Info)
                .set_title("Confirm")
                .set_description(question)
                .set_buttons(MessageButtons::YesNo)
                .show()
                .await;
            (plan, matches!(answer, MessageDialogResult::Yes))
        },
        |(plan, confirmed)| Message::PlanConfirmed(plan, confirmed),
    )
}

fn start_session(app: &mut DownloadApp, plan: DownloadPlan) -> Task<Message> {
    if let Err(e) = app.session.begin_download() {
        return show_warning(e);
    }

    app.view.download_progress = 0.0;
    app.view.status_message = "Starting download...".to_string();

    Task::stream(app.coordinator.session_stream(plan).map(Message::Session))
}

fn on_session_event(app: &mut DownloadApp, event: SessionEvent) -> Task<Message> {
    match event {
        SessionEvent::TargetStarted {
            position,
            total,
            title,
        } => {
            app.view.download_progress = 0.0;
            app.view.status_message = if total > 1 {
                format!("[{}/{}] {}", position, total, title)
            } else {
                format!("Downloading: {}", title)
            };
        }
        SessionEvent::Progress(update) => {
            if let Some(fraction) = update.fraction {
                app.view.download_progress = fraction;
            }
            app.view.status_message = update.status;
        }
        SessionEvent::TargetFinished(outcome) => {
            log::debug!("{} finished: {:?}", outcome.label(), outcome.outcome);
        }
        SessionEvent::Finished(report) => {
            app.session.finish_download();

            let summary = report.summary();
            let level = match report.result {
                SessionResult::Succeeded => {
                    app.view.download_progress = 1.0;
                    app.view.status_message = "Download complete!".to_string();
                    MessageLevel::Info
                }
                SessionResult::PartiallySucceeded => {
                    app.view.status_message = "Download finished with errors".to_string();
                    MessageLevel::Warning
                }
                SessionResult::Failed => {
                    app.view.download_progress = 0.0;
                    app.view.status_message = "Download failed".to_string();
                    MessageLevel::Error
                }
            };
            return show_dialog(level, "Download", summary);
        }
    }
    Task::none()
}

fn show_warning(error: AppError) -> Task<Message> {
    show_dialog(MessageLevel::Warning, "Warning", error.to_string())
}

fn show_error(error: AppError) -> Task<Message> {
    let level = match error {
        AppError::EmptyLink | AppError::InvalidLink => MessageLevel::Warning,
        _ => MessageLevel::Error,
    };
    show_dialog(level, "Error", error.to_string())
}

fn show_dialog(level: MessageLevel, title: &'static str, description: String) -> Task<Message> {
    Task::future(async move {
        AsyncMessageDialog::new()
            .set_level(level)
            .set_title(title)
            .set_description(description)
            .set_buttons(MessageButtons::Ok)
            .show()
            .await
    })
    .discard()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view(&app.session).map(Message::Ui)
}
