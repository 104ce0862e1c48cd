use std::fmt;
use std::path::Path;

use lofty::prelude::{ItemKey, TaggedFileExt};

use common::file_stem;

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub artist: String,
    pub title: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// Resolves the `(artist, title)` pair for a file. Tag read failures are not
/// errors: the file name stem stands in for the title so the upload can
/// still carry a usable identity.
pub fn read_tag(path: &Path) -> Tag {
    let stem = file_stem(path);

    let tagged_file = match lofty::read_from_path(path) {
        Ok(file) => file,
        Err(_) => {
            return Tag {
                artist: UNKNOWN.to_string(),
                title: stem,
            }
        }
    };

    let mut artist = UNKNOWN.to_string();
    let mut title = UNKNOWN.to_string();

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        if let Some(value) = tag
            .get_string(&ItemKey::TrackArtist)
            .or_else(|| tag.get_string(&ItemKey::AlbumArtist))
        {
            if !value.trim().is_empty() {
                artist = value.to_string();
            }
        }
        if let Some(value) = tag.get_string(&ItemKey::TrackTitle) {
            if !value.trim().is_empty() {
                title = value.to_string();
            }
        }
    }

    if artist == UNKNOWN && title == UNKNOWN {
        title = stem;
    }

    Tag { artist, title }
}
