use url::Url;

use crate::domain::AppError;

const HOST_FRAGMENTS: [&str; 2] = ["youtube.com", "youtu.be"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Single,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub kind: LinkKind,
}

/// Validate user input as a YouTube link and guess what it addresses.
///
/// The guess is only a hint for the probe: whatever the extractor reports
/// (entries or not) decides in the end.
pub fn classify_link(input: &str) -> Result<Link, AppError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::EmptyLink);
    }

    let lowered = input.to_ascii_lowercase();
    if !HOST_FRAGMENTS.iter().any(|host| lowered.contains(host)) {
        return Err(AppError::InvalidLink);
    }

    let url = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let kind = match Url::parse(&url) {
        Ok(parsed) => kind_of(&parsed),
        Err(_) => LinkKind::Single,
    };

    Ok(Link { url, kind })
}

fn kind_of(url: &Url) -> LinkKind {
    let host = url.host_str().unwrap_or_default();
    if host.ends_with("youtu.be") {
        return LinkKind::Single;
    }

    if url.path().trim_end_matches('/') == "/playlist" {
        return LinkKind::Collection;
    }

    let mut has_list = false;
    let mut has_video = false;
    for (key, _) in url.query_pairs() {
        match key.as_ref() {
            "list" => has_list = true,
            "v" => has_video = true,
            _ => {}
        }
    }

    if has_list && !has_video {
        LinkKind::Collection
    } else {
        LinkKind::Single
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_links() {
        assert_eq!(classify_link("not-a-link"), Err(AppError::InvalidLink));
        assert_eq!(classify_link("https://vimeo.com/123"), Err(AppError::InvalidLink));
        assert_eq!(classify_link("   "), Err(AppError::EmptyLink));
    }

    #[test]
    fn test_accepts_video_links() {
        let link = classify_link("https://www.youtube.com/watch?v=abc123").unwrap();
        assert_eq!(link.kind, LinkKind::Single);

        let link = classify_link("https://youtu.be/abc123").unwrap();
        assert_eq!(link.kind, LinkKind::Single);
        assert_eq!(link.url, "https://youtu.be/abc123");
    }

    #[test]
    fn test_adds_missing_scheme() {
        let link = classify_link("  youtu.be/abc123 ").unwrap();
        assert_eq!(link.url, "https://youtu.be/abc123");
    }

    #[test]
    fn test_playlist_links() {
        let link = classify_link("https://www.youtube.com/playlist?list=PL123").unwrap();
        assert_eq!(link.kind, LinkKind::Collection);

        let link = classify_link("https://www.youtube.com/watch?list=PL123").unwrap();
        assert_eq!(link.kind, LinkKind::Collection);

        // a video played from inside a playlist is still one video
        let link = classify_link("https://www.youtube.com/watch?v=abc123&list=PL123").unwrap();
        assert_eq!(link.kind, LinkKind::Single);
    }
}
