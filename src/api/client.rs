use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::models::{DownloadOptions, ProbeScope, RawInfo, YtDlpConfig};
use super::Extractor;
use crate::domain::{ProgressEvent, ProgressPhase};

const PROGRESS_PREFIX: &str = "ytd-progress:";
const PROGRESS_TEMPLATE: &str = "download:ytd-progress:%(progress.status)s:%(progress.downloaded_bytes)s:%(progress.total_bytes)s:%(progress.total_bytes_estimate)s";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to start yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error while talking to yt-dlp: {0}")]
    Io(#[from] std::io::Error),

    /// yt-dlp ran and reported a failure; the text is its own
    #[error("{0}")]
    Failed(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Could not decode image: {0}")]
    Image(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct YtDlpClient {
    config: YtDlpConfig,
}

impl YtDlpClient {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    fn probe_args(&self, url: &str, scope: ProbeScope) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout.to_string(),
        ];

        match scope {
            ProbeScope::Single => args.push("--no-playlist".to_string()),
            ProbeScope::Flat => args.push("--flat-playlist".to_string()),
        }

        args.push(url.to_string());
        args
    }

    fn download_args(&self, url: &str, options: &DownloadOptions) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            options.format.clone(),
            "-o".to_string(),
            options.output_template.clone(),
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout.to_string(),
        ];

        args.push(if options.allow_collection {
            "--yes-playlist".to_string()
        } else {
            "--no-playlist".to_string()
        });
        args.push(if options.ignore_errors {
            "--ignore-errors".to_string()
        } else {
            "--abort-on-error".to_string()
        });

        if let Some(audio) = &options.extract_audio {
            args.extend([
                "-x".to_string(),
                "--audio-format".to_string(),
                audio.codec.clone(),
                "--audio-quality".to_string(),
                audio.quality.clone(),
            ]);
        }

        if let Some(ffmpeg) = &options.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }

        args.extend([
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            url.to_string(),
        ]);
        args
    }
}

#[async_trait]
impl Extractor for YtDlpClient {
    async fn extract_info(&self, url: &str, scope: ProbeScope) -> Result<RawInfo> {
        let args = self.probe_args(url, scope);
        log::debug!("probing: {} {}", self.config.binary.display(), args.join(" "));

        let output = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ApiError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ApiError::Failed(error_message(&stderr, output.status)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))
    }

    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Option<PathBuf>> {
        let args = self.download_args(url, options);
        log::debug!("downloading: {} {}", self.config.binary.display(), args.join(" "));

        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ApiError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ApiError::InvalidResponse("yt-dlp stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ApiError::InvalidResponse("yt-dlp stderr not captured".to_string()))?;

        let stderr_reader = tokio::spawn(async move {
            let mut text = String::new();
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            while let Ok(Some(line)) = next_lossy_line(&mut reader, &mut buf).await {
                log::debug!("yt-dlp: {}", line);
                text.push_str(&line);
                text.push('\n');
            }
            text
        });

        let parser = OutputParser::new();
        let mut destination = None;
        let mut finished = false;
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            let line = match next_lossy_line(&mut reader, &mut buf).await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("stopped reading yt-dlp output: {}", e);
                    break;
                }
            };

            if let Some(event) = parse_progress_line(&line) {
                finished = event.phase == ProgressPhase::Finished;
                progress(event);
                continue;
            }

            log::debug!("yt-dlp: {}", line);
            if let Some(path) = parser.destination(&line) {
                destination = Some(path);
            }
            if !finished && is_post_processing_line(&line) {
                finished = true;
                progress(ProgressEvent {
                    downloaded_bytes: 0,
                    total_bytes: None,
                    phase: ProgressPhase::Finished,
                });
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_reader.await.unwrap_or_default();

        if status.success() {
            Ok(destination)
        } else {
            Err(ApiError::Failed(error_message(&stderr, status)))
        }
    }
}

/// Next line of tool output with invalid UTF-8 replaced, `None` at end of stream.
async fn next_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn parse_number(field: &str) -> Option<u64> {
    match field.trim() {
        "" | "NA" | "None" => None,
        value => value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64),
    }
}

/// Parse one line printed through our progress template.
fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.splitn(4, ':');

    let phase = match fields.next()? {
        "downloading" => ProgressPhase::Downloading,
        "finished" => ProgressPhase::Finished,
        _ => return None,
    };
    let downloaded = fields.next().and_then(parse_number);
    let total = fields.next().and_then(parse_number);
    let estimate = fields.next().and_then(parse_number);
    let total_bytes = total.or(estimate).filter(|t| *t > 0);

    Some(ProgressEvent {
        downloaded_bytes: downloaded.or(total_bytes).unwrap_or(0),
        total_bytes,
        phase,
    })
}

fn is_post_processing_line(line: &str) -> bool {
    ["[ExtractAudio]", "[Merger]", "[Fixup", "[FixupM3u8]"]
        .iter()
        .any(|tag| line.starts_with(tag))
}

struct OutputParser {
    destination: Option<Regex>,
    already_downloaded: Option<Regex>,
}

impl OutputParser {
    fn new() -> Self {
        Self {
            destination: Regex::new(r"^\[(?:download|ExtractAudio)\] Destination: (.+)$").ok(),
            already_downloaded: Regex::new(r"^\[download\] (.+) has already been downloaded")
                .ok(),
        }
    }

    /// Final file named by a yt-dlp status line, if this line names one.
    fn destination(&self, line: &str) -> Option<PathBuf> {
        [&self.destination, &self.already_downloaded]
            .into_iter()
            .flatten()
            .find_map(|re| re.captures(line.trim()))
            .map(|caps| PathBuf::from(caps[1].trim()))
    }
}

/// The tool's own words for a failure: its `ERROR:` lines, else the last line.
fn error_message(stderr: &str, status: ExitStatus) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        return errors.join("\n");
    }

    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| format!("yt-dlp exited with {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::AudioExtraction;

    fn client() -> YtDlpClient {
        YtDlpClient::new(YtDlpConfig::default())
    }

    fn exit_status(code: i32) -> ExitStatus {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            ExitStatus::from_raw(code << 8)
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::ExitStatusExt;
            ExitStatus::from_raw(code as u32)
        }
    }

    #[test]
    fn test_parse_progress_known_total() {
        let event = parse_progress_line("ytd-progress:downloading:1048576:4194304:NA").unwrap();
        assert_eq!(event.downloaded_bytes, 1_048_576);
        assert_eq!(event.total_bytes, Some(4_194_304));
        assert_eq!(event.phase, ProgressPhase::Downloading);
    }

    #[test]
    fn test_parse_progress_uses_estimate() {
        let event = parse_progress_line("ytd-progress:downloading:2048:NA:10240.7").unwrap();
        assert_eq!(event.total_bytes, Some(10_240));

        let event = parse_progress_line("ytd-progress:downloading:2048:NA:NA").unwrap();
        assert_eq!(event.total_bytes, None);
    }

    #[test]
    fn test_parse_progress_finished() {
        let event = parse_progress_line("ytd-progress:finished:NA:5000:NA").unwrap();
        assert_eq!(event.phase, ProgressPhase::Finished);
        assert_eq!(event.downloaded_bytes, 5000);
    }

    #[test]
    fn test_parse_progress_ignores_other_lines() {
        assert!(parse_progress_line("[youtube] abc123: Downloading webpage").is_none());
        assert!(parse_progress_line("ytd-progress:error:NA:NA:NA").is_none());
        assert!(parse_progress_line("").is_none());
    }

    #[test]
    fn test_destination_lines() {
        let parser = OutputParser::new();
        assert_eq!(
            parser.destination("[download] Destination: downloads/Clip.mp4"),
            Some(PathBuf::from("downloads/Clip.mp4"))
        );
        assert_eq!(
            parser.destination("[ExtractAudio] Destination: downloads/Clip.mp3"),
            Some(PathBuf::from("downloads/Clip.mp3"))
        );
        assert_eq!(
            parser.destination("[download] downloads/Clip.mp4 has already been downloaded"),
            Some(PathBuf::from("downloads/Clip.mp4"))
        );
        assert_eq!(parser.destination("[info] Writing video metadata"), None);
    }

    #[test]
    fn test_error_message_keeps_tool_text() {
        let stderr = "WARNING: something odd\nERROR: [youtube] abc123: Video unavailable\n";
        assert_eq!(
            error_message(stderr, exit_status(1)),
            "ERROR: [youtube] abc123: Video unavailable"
        );
        assert_eq!(error_message("boom\n\n", exit_status(1)), "boom");
        assert!(error_message("", exit_status(2)).starts_with("yt-dlp exited with"));
    }

    #[test]
    fn test_probe_args() {
        let args = client().probe_args("https://youtu.be/abc123", ProbeScope::Single);
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--dump-single-json".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc123");

        let args = client().probe_args("https://www.youtube.com/playlist?list=PL1", ProbeScope::Flat);
        assert!(args.contains(&"--flat-playlist".to_string()));
    }

    #[test]
    fn test_download_args_audio() {
        let options = DownloadOptions {
            format: "bestaudio/best".to_string(),
            output_template: "out/%(title)s.%(ext)s".to_string(),
            extract_audio: Some(AudioExtraction {
                codec: "mp3".to_string(),
                quality: "192".to_string(),
            }),
            allow_collection: false,
            ignore_errors: false,
            ffmpeg_location: Some(PathBuf::from("/usr/bin/ffmpeg")),
        };
        let args = client().download_args("https://youtu.be/abc123", &options);
        let joined = args.join(" ");
        assert!(joined.starts_with("-f bestaudio/best -o out/%(title)s.%(ext)s"));
        assert!(joined.contains("-x --audio-format mp3 --audio-quality 192"));
        assert!(joined.contains("--ffmpeg-location /usr/bin/ffmpeg"));
        assert!(joined.contains("--no-playlist --abort-on-error"));
        assert!(args.contains(&PROGRESS_TEMPLATE.to_string()));
    }

    #[tokio::test]
    async fn test_lossy_lines_replace_invalid_bytes() {
        let mut reader: &[u8] = b"[download] Destination: Caf\xe9.mp4\r\nplain\nlast";
        let mut buf = Vec::new();

        let first = next_lossy_line(&mut reader, &mut buf).await.unwrap();
        assert_eq!(first.as_deref(), Some("[download] Destination: Caf\u{FFFD}.mp4"));
        let second = next_lossy_line(&mut reader, &mut buf).await.unwrap();
        assert_eq!(second.as_deref(), Some("plain"));
        let third = next_lossy_line(&mut reader, &mut buf).await.unwrap();
        assert_eq!(third.as_deref(), Some("last"));
        assert!(next_lossy_line(&mut reader, &mut buf).await.unwrap().is_none());
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_with_non_utf8_output() {
        let dir = tempfile::tempdir().unwrap();
        // both scripts are written before either runs
        let ok = script(
            dir.path(),
            "ok-yt-dlp",
            "printf '[download] Destination: Caf\\351.mp4\\n'\nprintf 'ytd-progress:downloading:50:100:NA\\n'\n",
        );
        let failing = script(
            dir.path(),
            "failing-yt-dlp",
            "printf 'ERROR: d\\351j\\340 vu\\n' >&2\nexit 1\n",
        );

        let options = DownloadOptions {
            format: "best[ext=mp4]/best".to_string(),
            output_template: "%(title)s.%(ext)s".to_string(),
            extract_audio: None,
            allow_collection: false,
            ignore_errors: false,
            ffmpeg_location: None,
        };

        let client = YtDlpClient::new(YtDlpConfig {
            binary: ok,
            ..YtDlpConfig::default()
        });
        let mut events = Vec::new();
        let output = client
            .download("https://youtu.be/abc123", &options, &mut |event| events.push(event))
            .await
            .unwrap();
        assert_eq!(output, Some(PathBuf::from("Caf\u{FFFD}.mp4")));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].downloaded_bytes, 50);
        assert_eq!(events[0].total_bytes, Some(100));

        let client = YtDlpClient::new(YtDlpConfig {
            binary: failing,
            ..YtDlpConfig::default()
        });
        let err = client
            .download("https://youtu.be/abc123", &options, &mut |_| {})
            .await
            .unwrap_err();
        match err {
            ApiError::Failed(message) => assert_eq!(message, "ERROR: d\u{FFFD}j\u{FFFD} vu"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_output_forced_to_utf8() {
        let args = client().probe_args("https://youtu.be/abc123", ProbeScope::Single);
        assert!(args.join(" ").contains("--encoding utf-8"));

        let options = DownloadOptions {
            format: "best[ext=mp4]/best".to_string(),
            output_template: "%(title)s.%(ext)s".to_string(),
            extract_audio: None,
            allow_collection: false,
            ignore_errors: false,
            ffmpeg_location: None,
        };
        let args = client().download_args("https://youtu.be/abc123", &options);
        assert!(args.join(" ").contains("--encoding utf-8"));
    }

    #[test]
    fn test_download_args_video_without_ffmpeg() {
        let options = DownloadOptions {
            format: "best[ext=mp4]/best".to_string(),
            output_template: "%(title)s.%(ext)s".to_string(),
            extract_audio: None,
            allow_collection: false,
            ignore_errors: false,
            ffmpeg_location: None,
        };
        let args = client().download_args("https://youtu.be/abc123", &options);
        assert!(!args.contains(&"-x".to_string()));
        assert!(!args.contains(&"--ffmpeg-location".to_string()));
    }
}
