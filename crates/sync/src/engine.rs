use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use walkdir::WalkDir;

use common::{file_name, file_stem, has_audio_extension, normalize_track_name};
use playlist::{PlaylistSet, PlaylistStore};
use remote::HttpClient;

use crate::config::SyncConfig;
use crate::paths::{download_link, drop_relative_path, server_path};
use crate::report::{RunReport, UploadOutcome};
use crate::SyncError;

/// Pacing between upload submissions so the endpoint is not hammered.
pub const UPLOAD_DELAY: Duration = Duration::from_millis(500);
/// Backoff between retry attempts for a failed submission.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub enum RunMode {
    /// Scan the configured songs root.
    Scan,
    /// Process files handed over directly (drag-and-drop).
    Dropped(Vec<PathBuf>),
}

impl RunMode {
    fn label(&self) -> &'static str {
        match self {
            RunMode::Scan => "default",
            RunMode::Dropped(_) => "drag-and-drop",
        }
    }
}

/// A file that survived playlist classification and is queued for insertion
/// (and possibly upload).
#[derive(Debug, Clone)]
pub struct Pending {
    pub local: PathBuf,
    pub relative: Option<String>,
    pub server_path: String,
}

/// Local files to consider this run, paired with the precomputed relative
/// path used in drag-and-drop mode.
pub fn collect_files(
    config: &SyncConfig,
    mode: &RunMode,
) -> Result<Vec<(PathBuf, Option<String>)>, SyncError> {
    match mode {
        RunMode::Scan => {
            if !config.songs_path.exists() {
                return Err(SyncError::MissingSource(
                    config.songs_path.display().to_string(),
                ));
            }
            let mut files = Vec::new();
            for entry in WalkDir::new(&config.songs_path)
                .into_iter()
                .filter_map(|entry| entry.ok())
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if has_audio_extension(&name, &config.supported_formats) {
                    files.push((entry.into_path(), None));
                }
            }
            Ok(files)
        }
        RunMode::Dropped(dropped) => {
            let mut files = Vec::new();
            for path in dropped {
                let name = file_name(path);
                if !has_audio_extension(&name, &config.supported_formats) {
                    info!("Skipping unsupported format: {}", path.display());
                    continue;
                }
                files.push((path.clone(), drop_relative_path(path)));
            }
            Ok(files)
        }
    }
}

/// Phase 1: a file is a playlist duplicate iff its normalized stem is
/// already a key, including keys added earlier in the same run. The first
/// of two same-key files wins; the rest are omitted silently, not failed.
pub fn classify_against_playlist(
    files: Vec<(PathBuf, Option<String>)>,
    set: &mut PlaylistSet,
    config: &SyncConfig,
) -> (Vec<Pending>, Vec<String>) {
    let mut pending = Vec::new();
    let mut duplicates = Vec::new();

    for (path, relative) in files {
        let stem = file_stem(&path);
        let key = normalize_track_name(&stem);

        if set.contains(&key) {
            info!("Playlist duplicate: '{}'", stem);
            duplicates.push(file_name(&path));
            continue;
        }

        let server = server_path(
            &path,
            &config.songs_path,
            &config.server_path,
            relative.as_deref(),
        );
        set.insert(key, server.clone());
        pending.push(Pending {
            local: path,
            relative,
            server_path: server,
        });
    }

    (pending, duplicates)
}

/// Phase 2: only phase-1 survivors are checked. A remote duplicate stays in
/// the playlist but is excluded from the upload set.
pub fn classify_against_remote(
    pending: &[Pending],
    inventory: &HashSet<String>,
) -> (Vec<Pending>, Vec<String>) {
    let mut uploads = Vec::new();
    let mut duplicates = Vec::new();

    for item in pending {
        if inventory.contains(&item.server_path) {
            info!("Already in track database: {}", item.server_path);
            duplicates.push(file_name(&item.local));
        } else {
            uploads.push(item.clone());
        }
    }

    (uploads, duplicates)
}

/// Append-only playlist inserts. This phase always runs, even with nothing
/// pending, so every run produces the same report shape.
pub fn apply_inserts(store: &PlaylistStore, pending: &[Pending], report: &mut RunReport) {
    for item in pending {
        match store.append(&item.server_path) {
            Ok(()) => {
                info!("Added to playlist: {}", item.server_path);
                report.playlist_inserts.push(item.server_path.clone());
            }
            Err(err) => {
                warn!("Failed to append {}: {}", item.server_path, err);
                report.insert_failures += 1;
            }
        }
    }
}

/// Phase 3: sequential uploads with fixed pacing; a result carrying the
/// error marker counts as failed, and failures never stop the batch.
pub fn upload_all(
    http: &HttpClient,
    config: &SyncConfig,
    uploads: &[Pending],
    report: &mut RunReport,
) {
    for (index, item) in uploads.iter().enumerate() {
        let name = file_name(&item.local);
        info!("[{}/{}] Uploading {}", index + 1, uploads.len(), name);

        let tag = metadata::read_tag(&item.local);
        let link = download_link(&item.server_path, &config.remove_prefix, &config.base_url);

        let params = [
            ("artist", tag.artist.as_str()),
            ("title", tag.title.as_str()),
            ("link", link.as_str()),
            ("file_path", item.server_path.as_str()),
        ];
        let (result, success) = http.send_track_with_retry(
            &config.upload_page,
            &config.upload_key,
            &params,
            config.max_retries,
            RETRY_BACKOFF,
        );

        if success {
            report.upload_success += 1;
        } else {
            warn!("Upload failed for {}: {}", name, result);
            report.upload_failures += 1;
        }

        report.uploads.push(UploadOutcome {
            file: name,
            full_path: item.local.display().to_string(),
            relative_path: item.relative.clone(),
            server_path: item.server_path.clone(),
            download_link: link,
            artist: tag.artist,
            title: tag.title,
            result,
            success,
        });

        thread::sleep(UPLOAD_DELAY);
    }
}

/// Drives the whole run: fetch remote inventory (fatal on error), classify
/// against playlist then remote, apply inserts, upload, report. Only the
/// inventory fetch can abort; everything after degrades per item.
pub fn run_sync(config: &SyncConfig, mode: RunMode) -> Result<RunReport, SyncError> {
    let http = HttpClient::new()?;
    let inventory = http.fetch_inventory(&config.server_tracks_url)?;

    let store = PlaylistStore::new(&config.playlist_file);
    let mut set = store.load();
    let mut report = RunReport::new(mode.label());

    let files = collect_files(config, &mode)?;
    report.scanned = files.len();
    info!("Found {} files to process", files.len());

    let (pending, playlist_duplicates) = classify_against_playlist(files, &mut set, config);
    report.playlist_duplicates = playlist_duplicates;

    let (uploads, remote_duplicates) = classify_against_remote(&pending, &inventory);
    report.remote_duplicates = remote_duplicates;

    apply_inserts(&store, &pending, &mut report);
    upload_all(&http, config, &uploads, &mut report);

    Ok(report)
}

/// Drops dropped-file arguments that do not exist on disk, warning once per
/// missing path.
pub fn existing_dropped_files(args: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for arg in args {
        let path = Path::new(arg);
        if path.exists() {
            files.push(path.to_path_buf());
        } else {
            warn!("Dropped file not found: {}", arg);
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    fn test_config(songs: &Path, playlist_file: &Path) -> SyncConfig {
        SyncConfig {
            songs_path: songs.to_path_buf(),
            playlist_file: playlist_file.to_path_buf(),
            server_path: "music/server".to_string(),
            server_tracks_url: "https://example.test/tracks".to_string(),
            upload_page: "https://example.test/add".to_string(),
            upload_key: "secret".to_string(),
            base_url: "https://dl.test".to_string(),
            remove_prefix: String::new(),
            supported_formats: common::default_extensions(),
            max_retries: 1,
            report_dir: None,
        }
    }

    #[test]
    fn new_track_is_queued_for_insert_and_upload() {
        let dir = tempdir().unwrap();
        let songs = dir.path().join("songs");
        fs::create_dir_all(&songs).unwrap();
        fs::write(songs.join("track.mp3"), b"x").unwrap();
        let config = test_config(&songs, &dir.path().join("list.pls"));

        let files = collect_files(&config, &RunMode::Scan).unwrap();
        assert_eq!(files.len(), 1);

        let mut set = PlaylistStore::new(&config.playlist_file).load();
        let (pending, duplicates) = classify_against_playlist(files, &mut set, &config);
        assert!(duplicates.is_empty());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].server_path, "music/server/track.mp3");

        let (uploads, remote_dups) = classify_against_remote(&pending, &HashSet::new());
        assert_eq!(uploads.len(), 1);
        assert!(remote_dups.is_empty());
    }

    #[test]
    fn existing_playlist_entry_is_playlist_duplicate() {
        let dir = tempdir().unwrap();
        let songs = dir.path().join("songs");
        fs::create_dir_all(&songs).unwrap();
        fs::write(songs.join("2025-01-01_12-30_Song.mp3"), b"x").unwrap();

        let playlist_path = dir.path().join("list.pls");
        let store = PlaylistStore::new(&playlist_path);
        store.append("music/server/Song.mp3").unwrap();

        let config = test_config(&songs, &playlist_path);
        let files = collect_files(&config, &RunMode::Scan).unwrap();
        let mut set = store.load();
        let (pending, duplicates) = classify_against_playlist(files, &mut set, &config);

        assert!(pending.is_empty());
        assert_eq!(duplicates, vec!["2025-01-01_12-30_Song.mp3".to_string()]);
    }

    #[test]
    fn within_run_duplicate_keeps_exactly_one() {
        let dir = tempdir().unwrap();
        let songs = dir.path().join("songs");
        fs::create_dir_all(songs.join("a")).unwrap();
        fs::create_dir_all(songs.join("b")).unwrap();
        fs::write(songs.join("a").join("Song.mp3"), b"x").unwrap();
        fs::write(songs.join("b").join("2025-01-01_12-30_Song.mp3"), b"x").unwrap();

        let config = test_config(&songs, &dir.path().join("list.pls"));
        let files = collect_files(&config, &RunMode::Scan).unwrap();
        assert_eq!(files.len(), 2);

        let mut set = PlaylistStore::new(&config.playlist_file).load();
        let (pending, duplicates) = classify_against_playlist(files, &mut set, &config);
        assert_eq!(pending.len(), 1);
        assert_eq!(duplicates.len(), 1);
    }

    #[test]
    fn remote_duplicate_is_inserted_but_not_uploaded() {
        let dir = tempdir().unwrap();
        let songs = dir.path().join("songs");
        fs::create_dir_all(&songs).unwrap();
        fs::write(songs.join("track.mp3"), b"x").unwrap();

        let playlist_path = dir.path().join("list.pls");
        let config = test_config(&songs, &playlist_path);
        let files = collect_files(&config, &RunMode::Scan).unwrap();

        let store = PlaylistStore::new(&playlist_path);
        let mut set = store.load();
        let (pending, _) = classify_against_playlist(files, &mut set, &config);

        let inventory: HashSet<String> =
            ["music/server/track.mp3".to_string()].into_iter().collect();
        let (uploads, remote_dups) = classify_against_remote(&pending, &inventory);
        assert!(uploads.is_empty());
        assert_eq!(remote_dups, vec!["track.mp3".to_string()]);

        let mut report = RunReport::new("default");
        apply_inserts(&store, &pending, &mut report);
        assert_eq!(report.playlist_inserts, vec!["music/server/track.mp3".to_string()]);
        assert!(store.load().contains("track"));
    }

    #[test]
    fn dropped_files_use_last_three_segments() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("rock").join("artist");
        fs::create_dir_all(&nested).unwrap();
        let dropped = nested.join("song.mp3");
        fs::write(&dropped, b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let config = test_config(&dir.path().join("unused"), &dir.path().join("list.pls"));
        let files = collect_files(
            &config,
            &RunMode::Dropped(vec![dropped.clone(), dir.path().join("notes.txt")]),
        )
        .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1.as_deref(), Some("rock/artist/song.mp3"));

        let mut set = PlaylistStore::new(&config.playlist_file).load();
        let (pending, _) = classify_against_playlist(files, &mut set, &config);
        assert_eq!(pending[0].server_path, "music/server/rock/artist/song.mp3");
    }

    #[test]
    fn missing_songs_root_is_fatal_in_scan_mode() {
        let dir = tempdir().unwrap();
        let config = test_config(&dir.path().join("missing"), &dir.path().join("list.pls"));
        assert!(matches!(
            collect_files(&config, &RunMode::Scan),
            Err(SyncError::MissingSource(_))
        ));
    }
}
