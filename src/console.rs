use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::application::{reconcile, DownloadCoordinator, SessionEvent};
use crate::domain::{DownloadMode, MediaInfo, SessionOutcome, SessionState};
use crate::utils::{format_duration, format_views, parse_selection};

const RULE: &str = "============================================================";

/// Text menu front end. Reads answers from `input`, writes to `output`.
pub struct Console<R, W> {
    input: R,
    output: W,
    runtime: Runtime,
    coordinator: DownloadCoordinator,
    default_dir: PathBuf,
    session: SessionState,
}

enum Choice {
    Single(DownloadMode),
    Playlist,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(
        coordinator: DownloadCoordinator,
        default_dir: PathBuf,
        input: R,
        output: W,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            input,
            output,
            runtime,
            coordinator,
            default_dir,
            session: SessionState::default(),
        })
    }

    /// Read one trimmed line; `None` once input is exhausted.
    fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        Ok(self
            .prompt(question)?
            .map(|answer| answer.eq_ignore_ascii_case("y"))
            .unwrap_or(false))
    }

    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "{}", RULE)?;
        writeln!(self.output, "{:^60}", "YOUTUBE VIDEO DOWNLOADER")?;
        writeln!(self.output, "{}", RULE)?;
        if self.coordinator.ffmpeg().is_none() {
            writeln!(
                self.output,
                "Warning: ffmpeg not found, MP3 conversion may not work"
            )?;
        }

        loop {
            writeln!(self.output)?;
            writeln!(self.output, "MENU:")?;
            writeln!(self.output, "1. Download video (best quality)")?;
            writeln!(self.output, "2. Download audio only (MP3)")?;
            writeln!(self.output, "3. Download playlist")?;
            writeln!(self.output, "4. Exit")?;
            writeln!(self.output)?;

            let choice = match self.prompt("Choose an option (1-4): ")?.as_deref() {
                Some("1") => Choice::Single(DownloadMode::Video),
                Some("2") => Choice::Single(DownloadMode::Audio),
                Some("3") => Choice::Playlist,
                Some("4") | None => break,
                Some(_) => {
                    writeln!(self.output, "Invalid option! Try again.")?;
                    continue;
                }
            };

            if !self.handle(choice)? {
                break;
            }

            if !self.confirm("\nDownload another? (y/n): ")? {
                break;
            }
        }

        self.farewell()
    }

    fn farewell(&mut self) -> io::Result<()> {
        let cleanup = reconcile(&self.default_dir);
        for warning in &cleanup.warnings {
            writeln!(self.output, "Warning: {}", warning)?;
        }
        writeln!(self.output, "\nBye!")
    }

    /// One menu action. `Ok(false)` when input ran out mid-way.
    fn handle(&mut self, choice: Choice) -> io::Result<bool> {
        let Some(url) = self.prompt("\nPaste the YouTube link: ")? else {
            return Ok(false);
        };

        let default_dir = self.default_dir.display().to_string();
        let Some(dir) = self.prompt(&format!("Destination folder (Enter for '{}'): ", default_dir))?
        else {
            return Ok(false);
        };
        let base_dir = if dir.is_empty() {
            self.default_dir.clone()
        } else {
            PathBuf::from(dir)
        };

        if let Err(e) = self.session.begin_analysis() {
            writeln!(self.output, "Error: {}", e)?;
            return Ok(true);
        }
        writeln!(self.output, "\nAnalyzing link...")?;
        let probed = self.runtime.block_on(self.coordinator.probe(url));
        let media = match probed {
            Ok(media) => media,
            Err(e) => {
                self.session.finish_analysis(None);
                writeln!(self.output, "Error: {}", e)?;
                return Ok(true);
            }
        };
        self.session.finish_analysis(Some(media.clone()));
        self.describe(&media)?;

        let (mode, selection) = match (&media, choice) {
            (MediaInfo::Video(_), Choice::Single(mode)) => (mode, Vec::new()),
            (MediaInfo::Video(_), Choice::Playlist) => {
                writeln!(self.output, "Could not detect a playlist. Check the link.")?;
                return Ok(true);
            }
            (MediaInfo::Collection(collection), choice) => {
                let mode = match choice {
                    Choice::Single(mode) => mode,
                    Choice::Playlist => {
                        match self.prompt("Format: 1. Video (MP4)  2. Audio (MP3) [1]: ")? {
                            Some(answer) if answer == "2" => DownloadMode::Audio,
                            Some(_) => DownloadMode::Video,
                            None => return Ok(false),
                        }
                    }
                };

                let count = collection.member_count();
                let Some(answer) =
                    self.prompt("Items to download (Enter for all, e.g. 1,3,5-7): ")?
                else {
                    return Ok(false);
                };
                let selection = match parse_selection(&answer, count) {
                    Ok(selection) => selection,
                    Err(e) => {
                        writeln!(self.output, "Error: {}", e)?;
                        return Ok(true);
                    }
                };

                if !self.confirm(&format!("Download {} videos? (y/n): ", selection.len()))? {
                    writeln!(self.output, "Download cancelled.")?;
                    return Ok(true);
                }
                (mode, selection)
            }
        };

        let plan = match DownloadCoordinator::build_plan(&media, mode, &selection, &base_dir) {
            Ok(plan) => plan,
            Err(e) => {
                writeln!(self.output, "Error: {}", e)?;
                return Ok(true);
            }
        };

        if let Err(e) = self.session.begin_download() {
            writeln!(self.output, "Error: {}", e)?;
            return Ok(true);
        }
        writeln!(self.output, "\nSaving to: {}", plan.destination.display())?;

        let Self {
            runtime,
            output,
            coordinator,
            ..
        } = self;
        runtime.block_on(async {
            let mut events = coordinator.spawn_session(plan);
            while let Some(event) = events.recv().await {
                render(output, &event)?;
            }
            Ok::<(), io::Error>(())
        })?;

        self.session.finish_download();
        Ok(true)
    }

    fn describe(&mut self, media: &MediaInfo) -> io::Result<()> {
        match media {
            MediaInfo::Video(target) => {
                writeln!(self.output, "Title: {}", target.title)?;
                if let Some(uploader) = &target.uploader {
                    writeln!(self.output, "Channel: {}", uploader)?;
                }
                if let Some(duration) = target.duration {
                    writeln!(self.output, "Duration: {}", format_duration(duration))?;
                }
                let views = target
                    .view_count
                    .map(format_views)
                    .unwrap_or_else(|| "N/A".to_string());
                writeln!(self.output, "Views: {}", views)?;
            }
            MediaInfo::Collection(collection) => {
                writeln!(self.output, "Playlist: {}", collection.title)?;
                if let Some(uploader) = &collection.uploader {
                    writeln!(self.output, "Channel: {}", uploader)?;
                }
                writeln!(self.output, "Total videos: {}", collection.member_count())?;
                for (i, entry) in collection.entries.iter().enumerate() {
                    writeln!(self.output, "  {}. {}", i + 1, entry.title)?;
                }
            }
        }
        Ok(())
    }
}

fn render<W: Write>(output: &mut W, event: &SessionEvent) -> io::Result<()> {
    match event {
        SessionEvent::TargetStarted {
            position,
            total,
            title,
        } => {
            if *total > 1 {
                writeln!(output, "\n[{}/{}] {}", position, total, title)?;
            } else {
                writeln!(output, "\nDownloading: {}", title)?;
            }
        }
        SessionEvent::Progress(update) => {
            write!(output, "\r{:<60}", update.status)?;
            output.flush()?;
        }
        SessionEvent::TargetFinished(outcome) => match &outcome.outcome {
            SessionOutcome::Succeeded => writeln!(output, "\nDone: {}", outcome.title)?,
            SessionOutcome::Failed(reason) => writeln!(output, "\nFailed: {}", reason)?,
        },
        SessionEvent::Finished(report) => {
            if !report.cleanup.is_noop() {
                writeln!(output, "\nOrganizing files...")?;
                for path in &report.cleanup.promoted {
                    writeln!(output, "File fixed: {}", path.display())?;
                }
                for warning in &report.cleanup.warnings {
                    writeln!(output, "Warning: {}", warning)?;
                }
            }
            writeln!(output, "\n{}", report.summary())?;
        }
    }
    Ok(())
}
