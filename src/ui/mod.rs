use std::path::PathBuf;

use iced::{
    widget::{
        button, column, image, progress_bar, row, scrollable, text, text_input, Column, Space,
    },
    Alignment, Element, Length,
};

use crate::domain::{Activity, DownloadMode, MediaInfo, SessionState};
use crate::utils::{format_duration, format_views};

/// Main view state
pub struct DownloadView {
    pub link: String,
    pub status_message: String,
    pub download_progress: f32,
    pub download_dir: PathBuf,
    /// One flag per collection entry, in entry order
    pub selection: Vec<bool>,
    pub thumbnail: Option<image::Handle>,
}

impl DownloadView {
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            link: String::new(),
            status_message: String::new(),
            download_progress: 0.0,
            download_dir,
            selection: Vec::new(),
            thumbnail: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    LinkChanged(String),
    AnalyzePressed,
    ItemToggled(usize),
    SelectAll,
    DeselectAll,
    DownloadPressed(DownloadMode),
    ChangeFolderPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::LinkChanged(link) => {
                self.link = link;
            }
            DownloadMessage::ItemToggled(index) => {
                if let Some(selected) = self.selection.get_mut(index) {
                    *selected = !*selected;
                }
            }
            DownloadMessage::SelectAll => self.selection.iter_mut().for_each(|s| *s = true),
            DownloadMessage::DeselectAll => self.selection.iter_mut().for_each(|s| *s = false),
            DownloadMessage::AnalyzePressed
            | DownloadMessage::DownloadPressed(_)
            | DownloadMessage::ChangeFolderPressed => {
                // Will be handled by the app
            }
        }
    }

    /// Forget the previous analysis before a new one starts.
    pub fn clear_media(&mut self) {
        self.selection.clear();
        self.thumbnail = None;
        self.download_progress = 0.0;
    }

    /// Every collection entry starts out selected.
    pub fn show_media(&mut self, media: &MediaInfo) {
        self.selection = match media {
            MediaInfo::Collection(collection) => vec![true; collection.member_count()],
            MediaInfo::Video(_) => Vec::new(),
        };
        self.status_message = match media {
            MediaInfo::Collection(collection) => {
                format!("Playlist ready: {} videos", collection.member_count())
            }
            MediaInfo::Video(_) => "Ready to download".to_string(),
        };
    }

    /// 0-based indices of the ticked entries.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selection
            .iter()
            .enumerate()
            .filter_map(|(index, selected)| selected.then_some(index))
            .collect()
    }

    pub fn view<'a>(&'a self, session: &'a SessionState) -> Element<'a, DownloadMessage> {
        let idle = !session.is_busy();
        let can_download = idle && session.media().is_some();

        let analyze_label = if session.activity() == Activity::Analyzing {
            "Analyzing..."
        } else {
            "Analyze link"
        };

        let link_row = row![
            text_input("Paste a YouTube link", &self.link)
                .on_input(DownloadMessage::LinkChanged)
                .on_submit(DownloadMessage::AnalyzePressed)
                .padding(10),
            button(analyze_label)
                .on_press_maybe(idle.then_some(DownloadMessage::AnalyzePressed))
                .padding([10, 20]),
        ]
        .spacing(10);

        let folder_row = row![
            text(format!("Save to: {}", self.download_dir.display())).size(14),
            Space::new().width(Length::Fill),
            button("Change folder")
                .on_press_maybe(idle.then_some(DownloadMessage::ChangeFolderPressed))
                .padding([6, 12]),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let mut content = column![
            text("YTD").size(32),
            Space::new().height(Length::Fixed(10.0)),
            link_row,
            folder_row,
        ]
        .spacing(10);

        if let Some(media) = session.media() {
            let preview: Element<'_, DownloadMessage> = match &self.thumbnail {
                Some(handle) => image(handle.clone())
                    .width(Length::Fixed(320.0))
                    .height(Length::Fixed(180.0))
                    .into(),
                None => text("No thumbnail").size(14).into(),
            };

            content = content.push(row![preview, info_panel(media)].spacing(20));

            if let MediaInfo::Collection(collection) = media {
                let items = collection.entries.iter().enumerate().map(
                    |(index, entry)| -> Element<'a, DownloadMessage> {
                        let mark = if self.selection.get(index).copied().unwrap_or(false) {
                            "[x]"
                        } else {
                            "[ ]"
                        };
                        button(text(format!("{} {}. {}", mark, index + 1, entry.title)).size(14))
                            .style(button::text)
                            .on_press_maybe(idle.then_some(DownloadMessage::ItemToggled(index)))
                            .into()
                    },
                );

                content = content
                    .push(
                        row![
                            button("Select all")
                                .on_press_maybe(idle.then_some(DownloadMessage::SelectAll)),
                            button("Deselect all")
                                .on_press_maybe(idle.then_some(DownloadMessage::DeselectAll)),
                            text(format!(
                                "{} of {} selected",
                                self.selected_indices().len(),
                                collection.member_count()
                            ))
                            .size(14),
                        ]
                        .spacing(10)
                        .align_y(Alignment::Center),
                    )
                    .push(
                        scrollable(Column::with_children(items).spacing(2))
                            .height(Length::Fixed(180.0)),
                    );
            }
        }

        content
            .push(
                row![
                    button("Download MP4")
                        .on_press_maybe(
                            can_download
                                .then_some(DownloadMessage::DownloadPressed(DownloadMode::Video))
                        )
                        .padding([10, 20]),
                    button("Download MP3")
                        .on_press_maybe(
                            can_download
                                .then_some(DownloadMessage::DownloadPressed(DownloadMode::Audio))
                        )
                        .padding([10, 20]),
                ]
                .spacing(10),
            )
            .push(progress_bar(0.0..=1.0, self.download_progress))
            .push(text(&self.status_message).size(14))
            .padding(20)
            .into()
    }
}

fn info_panel(media: &MediaInfo) -> Element<'_, DownloadMessage> {
    let mut lines: Vec<Element<'_, DownloadMessage>> = vec![text(media.title()).size(18).into()];

    match media {
        MediaInfo::Video(target) => {
            if let Some(uploader) = &target.uploader {
                lines.push(text(format!("Channel: {}", uploader)).size(14).into());
            }
            if let Some(duration) = target.duration {
                lines.push(
                    text(format!("Duration: {}", format_duration(duration)))
                        .size(14)
                        .into(),
                );
            }
            if let Some(views) = target.view_count {
                lines.push(text(format!("Views: {}", format_views(views))).size(14).into());
            }
        }
        MediaInfo::Collection(collection) => {
            if let Some(uploader) = &collection.uploader {
                lines.push(text(format!("Channel: {}", uploader)).size(14).into());
            }
            lines.push(
                text(format!("Videos: {}", collection.member_count()))
                    .size(14)
                    .into(),
            );
        }
    }

    Column::with_children(lines).spacing(4).into()
}
