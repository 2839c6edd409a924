use crate::api::{Extractor, ProbeScope, RawInfo};
use crate::domain::{AppError, CollectionInfo, DownloadTarget, MediaInfo};

use super::link::{Link, LinkKind};

/// Fetch descriptive metadata for a validated link without downloading media.
///
/// Playlists are listed flat; only their first member is probed again so a
/// preview (thumbnail, duration) can be shown.
pub async fn probe(extractor: &dyn Extractor, link: &Link) -> Result<MediaInfo, AppError> {
    let scope = match link.kind {
        LinkKind::Single => ProbeScope::Single,
        LinkKind::Collection => ProbeScope::Flat,
    };

    let raw = extractor
        .extract_info(&link.url, scope)
        .await
        .map_err(|e| AppError::Probe(e.to_string()))?;

    if raw.entries.is_some() {
        return Ok(MediaInfo::Collection(collection(extractor, raw).await));
    }

    let url = raw
        .webpage_url
        .clone()
        .unwrap_or_else(|| link.url.clone());
    Ok(MediaInfo::Video(target(&raw, url, None)))
}

async fn collection(extractor: &dyn Extractor, raw: RawInfo) -> CollectionInfo {
    let mut entries: Vec<DownloadTarget> = raw
        .entries
        .iter()
        .flatten()
        .enumerate()
        .filter_map(|(index, entry)| {
            let entry = entry.as_ref()?;
            let url = entry_url(entry)?;
            Some(target(entry, url, Some(index + 1)))
        })
        .collect();

    if let Some(first) = entries.first_mut() {
        let preview = extractor.extract_info(&first.url, ProbeScope::Single).await;
        match preview {
            Ok(detail) => *first = enrich(first, &detail),
            Err(e) => log::warn!("could not load preview for {}: {}", first.url, e),
        }
    }

    CollectionInfo {
        title: raw.title.clone().unwrap_or_else(|| "Playlist".to_string()),
        uploader: raw.uploader().map(str::to_string),
        entries,
    }
}

fn entry_url(entry: &RawInfo) -> Option<String> {
    entry
        .url
        .clone()
        .or_else(|| entry.webpage_url.clone())
        .or_else(|| {
            entry
                .id
                .as_ref()
                .map(|id| format!("https://www.youtube.com/watch?v={}", id))
        })
}

fn target(raw: &RawInfo, url: String, ordinal: Option<usize>) -> DownloadTarget {
    let title = raw.title.clone().unwrap_or_else(|| match ordinal {
        Some(position) => format!("Video {}", position),
        None => "Untitled".to_string(),
    });

    DownloadTarget {
        url,
        title,
        duration: raw.duration.map(|seconds| seconds.round() as u64),
        view_count: raw.view_count,
        uploader: raw.uploader().map(str::to_string),
        thumbnail: raw.thumbnail.clone(),
        ordinal,
    }
}

/// Fill the gaps of a shallow playlist entry from a full probe of it.
fn enrich(shallow: &DownloadTarget, detail: &RawInfo) -> DownloadTarget {
    DownloadTarget {
        url: shallow.url.clone(),
        title: shallow.title.clone(),
        duration: shallow
            .duration
            .or(detail.duration.map(|seconds| seconds.round() as u64)),
        view_count: shallow.view_count.or(detail.view_count),
        uploader: shallow
            .uploader
            .clone()
            .or_else(|| detail.uploader().map(str::to_string)),
        thumbnail: detail.thumbnail.clone().or_else(|| shallow.thumbnail.clone()),
        ordinal: shallow.ordinal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{raw_video, FakeExtractor};
    use crate::application::link::classify_link;

    const PLAYLIST: &str = "https://www.youtube.com/playlist?list=PL123";

    fn playlist() -> RawInfo {
        RawInfo {
            title: Some("Mix".to_string()),
            uploader: Some("Someone".to_string()),
            entries: Some(vec![
                Some(raw_video("a1", "First")),
                None,
                Some(RawInfo {
                    id: Some("c3".to_string()),
                    ..Default::default()
                }),
            ]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_video() {
        let url = "https://www.youtube.com/watch?v=abc123";
        let extractor = FakeExtractor::new().with_info(
            url,
            RawInfo {
                title: Some("Clip".to_string()),
                duration: Some(125.4),
                view_count: Some(1_234_567),
                channel: Some("Channel".to_string()),
                thumbnail: Some("https://i.ytimg.com/vi/abc123/hq.jpg".to_string()),
                ..Default::default()
            },
        );

        let link = classify_link(url).unwrap();
        let media = probe(&extractor, &link).await.unwrap();

        let MediaInfo::Video(target) = media else {
            panic!("expected a single video");
        };
        assert_eq!(target.url, url);
        assert_eq!(target.duration, Some(125));
        assert_eq!(target.uploader.as_deref(), Some("Channel"));
        assert_eq!(target.ordinal, None);
        assert_eq!(
            extractor.probes.lock().unwrap().as_slice(),
            &[(url.to_string(), ProbeScope::Single)]
        );
    }

    #[tokio::test]
    async fn test_collection_keeps_ordinals_and_enriches_first() {
        let first_url = "https://www.youtube.com/watch?v=a1";
        let mut detail = raw_video("a1", "First (full)");
        detail.thumbnail = Some("https://i.ytimg.com/vi/a1/hq.jpg".to_string());
        detail.duration = Some(61.0);

        let extractor = FakeExtractor::new()
            .with_info(PLAYLIST, playlist())
            .with_info(first_url, detail);

        let link = classify_link(PLAYLIST).unwrap();
        let MediaInfo::Collection(collection) = probe(&extractor, &link).await.unwrap() else {
            panic!("expected a collection");
        };

        assert_eq!(collection.title, "Mix");
        assert_eq!(collection.member_count(), 2);
        assert_eq!(collection.entries[0].ordinal, Some(1));
        assert_eq!(collection.entries[0].title, "First");
        assert_eq!(
            collection.entries[0].thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/a1/hq.jpg")
        );
        assert_eq!(collection.entries[0].duration, Some(61));
        assert_eq!(collection.entries[1].ordinal, Some(3));
        assert_eq!(collection.entries[1].title, "Video 3");
        assert_eq!(collection.entries[1].url, "https://www.youtube.com/watch?v=c3");

        let probes = extractor.probes.lock().unwrap();
        assert_eq!(probes.len(), 2);
        assert_eq!(probes[0].1, ProbeScope::Flat);
        assert_eq!(probes[1], (first_url.to_string(), ProbeScope::Single));
    }

    #[tokio::test]
    async fn test_preview_failure_is_not_fatal() {
        let extractor = FakeExtractor::new().with_info(PLAYLIST, playlist());
        let link = classify_link(PLAYLIST).unwrap();
        let media = probe(&extractor, &link).await.unwrap();
        assert!(media.is_collection());
        assert!(media.thumbnail().is_none());
    }

    #[tokio::test]
    async fn test_probe_error_keeps_message() {
        let url = "https://youtu.be/gone";
        let extractor =
            FakeExtractor::new().with_probe_error(url, "ERROR: [youtube] gone: Video unavailable");
        let link = classify_link(url).unwrap();
        let err = probe(&extractor, &link).await.unwrap_err();
        assert_eq!(
            err,
            AppError::Probe("ERROR: [youtube] gone: Video unavailable".to_string())
        );
    }
}
