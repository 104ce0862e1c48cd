use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use common::{normalize_track_name, to_slash_string};

/// Record grammar: `track=<path>?;` with the path running up to the first
/// `?;` on the line. Anything else in the file is ignored on read.
static TRACK_RECORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"track=([^?\n]+)\?;").expect("track record pattern"));

#[derive(Debug)]
pub enum PlaylistError {
    Io(std::io::Error),
}

impl std::fmt::Display for PlaylistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaylistError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for PlaylistError {}

impl From<std::io::Error> for PlaylistError {
    fn from(err: std::io::Error) -> Self {
        PlaylistError::Io(err)
    }
}

/// One entry per track identity: normalized key to the reference string
/// recorded in the playlist.
#[derive(Debug, Default)]
pub struct PlaylistSet {
    entries: HashMap<String, String>,
}

impl PlaylistSet {
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: String, reference: String) {
        self.entries.insert(key, reference);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// The stem of a reference string, with backslash paths normalized first so
/// Windows-style references resolve the same identity everywhere.
pub fn reference_stem(reference: &str) -> String {
    let slashed = to_slash_string(reference.trim());
    let name = slashed.rsplit('/').next().unwrap_or(&slashed);
    match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

pub struct PlaylistStore {
    path: PathBuf,
}

impl PlaylistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fails soft: a missing playlist is an empty set, unreadable content is
    /// reported and treated as empty, malformed lines are skipped.
    pub fn load(&self) -> PlaylistSet {
        let mut set = PlaylistSet::default();

        if !self.path.exists() {
            info!("Playlist {:?} not found; starting empty", self.path);
            return set;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Failed to read playlist {:?}: {}", self.path, err);
                return set;
            }
        };

        for capture in TRACK_RECORD.captures_iter(&content) {
            let reference = capture[1].trim().to_string();
            let key = normalize_track_name(&reference_stem(&reference));
            set.insert(key, reference);
        }

        info!(
            "Loaded {} unique tracks from playlist {:?}",
            set.len(),
            self.path
        );
        set
    }

    /// Appends one record, creating the file when absent. Existing content
    /// is never rewritten or reordered here.
    pub fn append(&self, reference: &str) -> Result<(), PlaylistError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "track={}?;", to_slash_string(reference))?;
        Ok(())
    }

    /// Replaces the whole file; used only by the maintenance flow. A backup
    /// copy of the previous content is written before truncation.
    pub fn rewrite(&self, references: &[String]) -> Result<(), PlaylistError> {
        if self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup)?;
            info!("Playlist backup written to {:?}", backup);
        }

        let mut content = String::new();
        for reference in references {
            let reference = to_slash_string(reference);
            if reference.ends_with('?') {
                content.push_str(&format!("track={};\n", reference));
            } else {
                content.push_str(&format!("track={}?;\n", reference));
            }
        }
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Tolerant read used by the maintenance flow: keeps file order and
    /// accepts the `?;`, `;` and `?` terminator variants.
    pub fn load_references(&self) -> Vec<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Failed to read playlist {:?}: {}", self.path, err);
                return Vec::new();
            }
        };
        parse_references(&content)
    }

    fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        self.path.with_file_name(format!("{}_backup{}", stem, ext))
    }
}

pub fn parse_references(content: &str) -> Vec<String> {
    let mut references = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        let Some(prefix) = line.get(..6) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case("track=") {
            continue;
        }
        let rest = &line[6..];
        let reference = if let Some(stripped) = rest.strip_suffix("?;") {
            stripped
        } else if let Some(stripped) = rest.strip_suffix(';') {
            stripped
        } else if let Some(stripped) = rest.strip_suffix('?') {
            stripped
        } else {
            rest
        };
        let reference = reference.trim();
        if !reference.is_empty() {
            references.push(reference.to_string());
        }
    }
    references
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_as_empty_set() {
        let dir = tempdir().unwrap();
        let store = PlaylistStore::new(dir.path().join("list.pls"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn append_then_load_round_trips_identities() {
        let dir = tempdir().unwrap();
        let store = PlaylistStore::new(dir.path().join("list.pls"));

        store.append("music/server/genre/Song One.mp3").unwrap();
        store.append("music\\server\\Other Track.flac").unwrap();

        let set = store.load();
        assert_eq!(set.len(), 2);
        assert!(set.contains("song one"));
        assert!(set.contains("other track"));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.pls");
        fs::write(
            &path,
            "garbage line\ntrack=music/a.mp3?;\nnot a record\ntrack=broken\n",
        )
        .unwrap();

        let set = PlaylistStore::new(&path).load();
        assert_eq!(set.len(), 1);
        assert!(set.contains("a"));
    }

    #[test]
    fn dated_reference_matches_undated_identity() {
        let dir = tempdir().unwrap();
        let store = PlaylistStore::new(dir.path().join("list.pls"));
        store
            .append("music/server/2025-01-01_12-30_Song.mp3")
            .unwrap();

        let set = store.load();
        assert!(set.contains(&normalize_track_name("Song")));
    }

    #[test]
    fn append_does_not_disturb_existing_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.pls");
        fs::write(&path, "track=music/first.mp3?;\n").unwrap();

        let store = PlaylistStore::new(&path);
        store.append("music/second.mp3").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "track=music/first.mp3?;\ntrack=music/second.mp3?;\n");
    }

    #[test]
    fn rewrite_backs_up_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.pls");
        fs::write(&path, "track=music/old.mp3?;\n").unwrap();

        let store = PlaylistStore::new(&path);
        store.rewrite(&["music/kept.mp3".to_string()]).unwrap();

        let backup = fs::read_to_string(dir.path().join("list_backup.pls")).unwrap();
        assert_eq!(backup, "track=music/old.mp3?;\n");
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "track=music/kept.mp3?;\n");
    }

    #[test]
    fn tolerant_parser_accepts_terminator_variants() {
        let parsed = parse_references(
            "track=music/a.mp3?;\ntrack=music/b.mp3;\ntrack=music/c.mp3?\ntrack=music/d.mp3\n;\n",
        );
        assert_eq!(
            parsed,
            vec!["music/a.mp3", "music/b.mp3", "music/c.mp3", "music/d.mp3"]
        );
    }

    #[test]
    fn reference_stem_handles_both_slash_styles() {
        assert_eq!(reference_stem("music/server/Song Name.mp3"), "Song Name");
        assert_eq!(reference_stem("music\\server\\Song.flac"), "Song");
        assert_eq!(reference_stem("bare-name"), "bare-name");
    }
}
