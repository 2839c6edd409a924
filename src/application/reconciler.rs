use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::ReconcileReport;

const INTERMEDIATE_MARKER: &str = ".temp";
const LEFTOVER_SUFFIXES: [&str; 2] = [".part", ".ytdl"];
const FRAGMENT_INFIX: &str = ".part-Frag";
/// Containers yt-dlp and ffmpeg produce; nothing else is ever promoted.
const MEDIA_EXTENSIONS: [&str; 10] = [
    "mp4", "m4a", "webm", "mkv", "mp3", "opus", "ogg", "flac", "wav", "aac",
];

/// Tidy a destination directory after a session.
///
/// `<name>.temp.<ext>` files are the usable output of an interrupted fix-up
/// step; the matching `<name>.<ext>` is presumed broken and replaced. Partial
/// transfers and resume metadata are deleted on a best-effort basis.
pub fn reconcile(dir: &Path) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    let files = match list_files(dir) {
        Some(files) => files,
        None => return report,
    };

    for intermediate in &files {
        if let Some(final_path) = final_name(intermediate) {
            promote(intermediate, &final_path, &mut report);
        }
    }

    for leftover in files.iter().filter(|path| is_leftover(path)) {
        if !leftover.exists() {
            continue;
        }
        match fs::remove_file(leftover) {
            Ok(()) => {
                log::info!("removed leftover {}", leftover.display());
                report.deleted_leftovers.push(leftover.clone());
            }
            Err(e) => log::debug!("could not remove {}: {}", leftover.display(), e),
        }
    }

    report
}

fn list_files(dir: &Path) -> Option<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).ok()?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Some(files)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// `clip.temp.mp4` -> `clip.mp4`; `None` for anything without the marker.
fn final_name(path: &Path) -> Option<PathBuf> {
    let name = file_name(path)?;
    if is_leftover(path) {
        return None;
    }
    let (rest, ext) = name.rsplit_once('.')?;
    let stem = rest.strip_suffix(INTERMEDIATE_MARKER)?;
    if stem.is_empty() || !is_media_extension(ext) {
        return None;
    }
    Some(path.with_file_name(format!("{}.{}", stem, ext)))
}

fn is_media_extension(ext: &str) -> bool {
    MEDIA_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// `.part`, `.ytdl` and fragment files such as `clip.mp4.part-Frag12`.
fn is_leftover(path: &Path) -> bool {
    file_name(path)
        .map(|name| {
            LEFTOVER_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
                || name.contains(FRAGMENT_INFIX)
        })
        .unwrap_or(false)
}

fn promote(intermediate: &Path, final_path: &Path, report: &mut ReconcileReport) {
    if final_path.exists() {
        if let Err(e) = fs::remove_file(final_path) {
            let warning = format!(
                "Could not remove broken {} ({}); delete it and rename {} manually",
                final_path.display(),
                e,
                intermediate.display()
            );
            log::warn!("{}", warning);
            report.warnings.push(warning);
            return;
        }
        log::info!("removed broken {}", final_path.display());
        report.removed_stale.push(final_path.to_path_buf());
    }

    match fs::rename(intermediate, final_path) {
        Ok(()) => {
            log::info!("promoted {} to {}", intermediate.display(), final_path.display());
            report.promoted.push(final_path.to_path_buf());
        }
        Err(e) => {
            let warning = format!(
                "Could not rename {}: {}; use that file instead",
                intermediate.display(),
                e
            );
            log::warn!("{}", warning);
            report.warnings.push(warning);
        }
    }
}
