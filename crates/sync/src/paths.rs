use std::path::{Component, Path};

use common::{file_name, join_server_path, relpath_from, to_slash_string};

/// Maps a local file onto its server path. A precomputed relative path wins
/// (drag-and-drop mode); otherwise the path is taken relative to the songs
/// root, falling back to the bare file name when the file lives outside it
/// (different volume).
pub fn server_path(
    local: &Path,
    songs_root: &Path,
    server_root: &str,
    precomputed_rel: Option<&str>,
) -> String {
    let rel = match precomputed_rel {
        Some(rel) => to_slash_string(rel),
        None => relpath_from(songs_root, local).unwrap_or_else(|| file_name(local)),
    };
    join_server_path(server_root, &rel)
}

/// Derives the public download URL for a server path. The prefix is located
/// by substring search and the remainder sliced off after it; this is a
/// compatibility requirement with the deployed server, not a structured
/// path-segment match.
pub fn download_link(server_path: &str, strip_prefix: &str, base_url: &str) -> String {
    let full = to_slash_string(server_path);

    let filtered = if strip_prefix.is_empty() {
        full
    } else {
        let prefix = to_slash_string(strip_prefix);
        match full.find(&prefix) {
            Some(idx) => full[idx + prefix.len()..].to_string(),
            None => full,
        }
    };

    let filtered = filtered.trim_start_matches('/');
    let base = base_url.trim_end_matches('/');
    if filtered.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, filtered)
    }
}

/// Drag-and-drop heuristic: a dropped path with at least three segments
/// contributes its last three as `genre/artist/filename`. Shorter paths get
/// no synthesized relative path and fall through to the normal mapping.
pub fn drop_relative_path(path: &Path) -> Option<String> {
    let parts: Vec<String> = path
        .components()
        .filter(|component| {
            !matches!(component, Component::RootDir | Component::Prefix(_))
        })
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect();

    if parts.len() < 3 {
        return None;
    }
    Some(parts[parts.len() - 3..].join("/"))
}
