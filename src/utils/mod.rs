/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Folder name for a playlist: letters, digits, spaces, `-` and `_` only.
pub fn collection_dir_name(title: &str) -> String {
    let name: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let name = sanitize_filename(&name);
    if name.is_empty() {
        "Playlist".to_string()
    } else {
        name
    }
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1}MB", bytes as f64 / 1024.0 / 1024.0)
}

/// `m:ss`, e.g. `2:05`
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Thousands-separated count, e.g. `1,234,567`
pub fn format_views(views: u64) -> String {
    let digits = views.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Parse a 1-based item list such as `1,3,5-7` into sorted 0-based indices.
///
/// Empty input selects every item.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok((0..count).collect());
    }

    let parse = |value: &str| -> Result<usize, String> {
        let number: usize = value
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number", value.trim()))?;
        if number == 0 || number > count {
            return Err(format!("{} is out of range (1-{})", number, count));
        }
        Ok(number - 1)
    };

    let mut indices = Vec::new();
    for part in input.split(',').filter(|part| !part.trim().is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(format!("range {} is backwards", part.trim()));
                }
                indices.extend(start..=end);
            }
            None => indices.push(parse(part)?),
        }
    }

    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file.mp3"), "test_file.mp3");
        assert_eq!(sanitize_filename("normal-name.mp3"), "normal-name.mp3");
    }

    #[test]
    fn test_collection_dir_name() {
        assert_eq!(collection_dir_name("Best of 2024: Vol. 1!"), "Best of 2024 Vol 1");
        assert_eq!(collection_dir_name("???"), "Playlist");
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_duration(125), "2:05");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_views(1_234_567), "1,234,567");
        assert_eq!(format_views(999), "999");
        assert_eq!(format_views(1000), "1,000");
        assert_eq!(format_megabytes(5 * 1024 * 1024 + 512 * 1024), "5.5MB");
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("", 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_selection("1, 3,5-7", 8).unwrap(), vec![0, 2, 4, 5, 6]);
        assert_eq!(parse_selection("3,1,3", 3).unwrap(), vec![0, 2]);
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("3-1", 3).is_err());
        assert!(parse_selection("abc", 3).is_err());
    }
}
