use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// Extensions recognized as audio when no configured set overrides them.
pub const DEFAULT_AUDIO_EXTENSIONS: [&str; 8] =
    ["mp3", "flac", "wav", "ogg", "m4a", "opus", "aac", "wma"];

/// Date/time prefixes stripped from track names, most specific first.
static DATE_PREFIX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}_",
        r"^\d{4}-\d{2}-\d{2}_\d{1,2}-\d{2}_",
        r"^\d{4}-\d{2}-\d{2}_",
        r"^\d{4}-\d{2}-\d{2}\s+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("date prefix pattern"))
    .collect()
});

const DATETIME_PREFIX_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]_");

/// Canonical identity of a track name: date/time prefixes stripped until no
/// pattern matches, whitespace collapsed, lower-cased. Idempotent.
///
/// A name that consists of nothing but a date prefix keeps an identity by
/// falling back to the lower-cased whole input.
pub fn normalize_track_name(name: &str) -> String {
    let mut rest = name.trim();
    loop {
        let before = rest;
        for pattern in DATE_PREFIX_PATTERNS.iter() {
            if let Some(found) = pattern.find(rest) {
                rest = rest[found.end()..].trim_start();
                break;
            }
        }
        if rest == before {
            break;
        }
    }

    let collapsed = collapse_whitespace(rest);
    if collapsed.is_empty() {
        return collapse_whitespace(name).to_lowercase();
    }
    collapsed.to_lowercase()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn default_extensions() -> HashSet<String> {
    DEFAULT_AUDIO_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

/// True when the file name carries one of the recognized audio extensions.
/// Extensions are matched case-insensitively, without the leading dot.
pub fn has_audio_extension(name: &str, extensions: &HashSet<String>) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| extensions.contains(&ext.to_string_lossy().to_lowercase()))
        .unwrap_or(false)
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Backslashes become forward slashes; references and server paths are
/// always compared and written in slash form.
pub fn to_slash_string(value: &str) -> String {
    value.replace('\\', "/")
}

pub fn path_to_slash_string(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    parts.join("/")
}

pub fn relpath_from(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(path_to_slash_string(rel))
}

/// Joins a server-relative path onto a server root with exactly one slash.
pub fn join_server_path(server_root: &str, relpath: &str) -> String {
    let root = to_slash_string(server_root);
    let root = root.trim_end_matches('/');
    let rel = to_slash_string(relpath);
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, rel)
    }
}

/// `YYYY-MM-DD_HH-MM_` prefix stamped onto copied file names.
pub fn datetime_prefix() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&DATETIME_PREFIX_FORMAT)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalize_strips_date_time_prefix() {
        assert_eq!(
            normalize_track_name("2025-01-01_12-30_Song"),
            normalize_track_name("Song")
        );
        assert_eq!(normalize_track_name("2025-01-01_12-30_Song"), "song");
    }

    #[test]
    fn normalize_strips_all_prefix_shapes() {
        for name in [
            "2025-03-04_09-15_Track Name",
            "2025-03-04_9-15_Track Name",
            "2025-03-04_Track Name",
            "2025-03-04 Track Name",
        ] {
            assert_eq!(normalize_track_name(name), "track name", "{}", name);
        }
    }

    #[test]
    fn normalize_strips_chained_prefixes() {
        assert_eq!(
            normalize_track_name("2025-01-02_11-00_2024-12-31_Song"),
            "song"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        for name in ["2025-01-01_12-30_Song", "  Mixed   Case  Name ", "", "2025-01-01_"] {
            let once = normalize_track_name(name);
            assert_eq!(normalize_track_name(&once), once, "{}", name);
        }
    }

    #[test]
    fn normalize_collapses_whitespace_and_lowercases() {
        assert_eq!(normalize_track_name("  Some   TRACK  name "), "some track name");
    }

    #[test]
    fn normalize_empty_input_yields_empty() {
        assert_eq!(normalize_track_name(""), "");
        assert_eq!(normalize_track_name("   "), "");
    }

    #[test]
    fn normalize_date_only_name_keeps_identity() {
        assert_eq!(normalize_track_name("2025-01-01_"), "2025-01-01_");
    }

    #[test]
    fn audio_extension_matching_is_case_insensitive() {
        let extensions = default_extensions();
        assert!(has_audio_extension("song.MP3", &extensions));
        assert!(has_audio_extension("song.flac", &extensions));
        assert!(!has_audio_extension("notes.txt", &extensions));
        assert!(!has_audio_extension("noext", &extensions));
    }

    #[test]
    fn join_server_path_uses_single_slash() {
        assert_eq!(join_server_path("music/server/", "/a/b.mp3"), "music/server/a/b.mp3");
        assert_eq!(join_server_path("music/server", "a/b.mp3"), "music/server/a/b.mp3");
        assert_eq!(join_server_path("music/server", ""), "music/server");
    }

    #[test]
    fn relpath_from_returns_slash_form() {
        let root = PathBuf::from("/music/root");
        let path = root.join("genre").join("artist").join("song.mp3");
        assert_eq!(
            relpath_from(&root, &path).as_deref(),
            Some("genre/artist/song.mp3")
        );
        assert_eq!(relpath_from(&PathBuf::from("/elsewhere"), &path), None);
    }

    #[test]
    fn datetime_prefix_has_expected_shape() {
        let prefix = datetime_prefix();
        assert_eq!(prefix.len(), "2025-01-01_12-30_".len());
        assert!(prefix.ends_with('_'));
    }
}
