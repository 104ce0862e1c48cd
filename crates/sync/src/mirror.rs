use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use walkdir::WalkDir;

use common::{
    datetime_prefix, file_name, file_stem, has_audio_extension, join_server_path,
    normalize_track_name, relpath_from, to_slash_string,
};
use remote::{remote_inventory, RemoteTree};

use crate::SyncError;

/// Pacing between SFTP puts.
pub const PUT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct MirrorStats {
    pub total: usize,
    pub copied: Vec<String>,
    pub skipped: Vec<(String, String)>,
    pub failures: usize,
}

impl MirrorStats {
    pub fn print_summary(&self, title: &str) {
        println!("{}", "=".repeat(60));
        println!("{}", title);
        println!("{}", "=".repeat(60));
        println!("Copied:  {}", self.copied.len());
        println!("Skipped: {}", self.skipped.len());
        println!("Failed:  {}", self.failures);

        if !self.copied.is_empty() {
            println!("\nCopied files:");
            for name in &self.copied {
                println!("  + {}", name);
            }
        }
        if !self.skipped.is_empty() {
            println!("\nSkipped files:");
            for (name, normalized) in self.skipped.iter().take(10) {
                println!("  - {} -> {}", name, normalized);
            }
            if self.skipped.len() > 10 {
                println!("  ... and {} more", self.skipped.len() - 10);
            }
        }
    }
}

fn audio_files(source: &Path, extensions: &HashSet<String>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if has_audio_extension(&name, extensions) {
            files.push(entry.into_path());
        }
    }
    files
}

fn local_inventory(target: &Path, extensions: &HashSet<String>) -> HashMap<String, String> {
    let mut tracks = HashMap::new();
    if !target.exists() {
        return tracks;
    }
    for file in audio_files(target, extensions) {
        tracks.insert(normalize_track_name(&file_stem(&file)), file_name(&file));
    }
    tracks
}

/// Mirrors a local tree into another local folder. Destination inventory is
/// built first; files whose normalized stem already exists are skipped, the
/// rest are copied under a generation-timestamp name with their relative
/// directory structure preserved. Per-file failures skip, never abort.
pub fn mirror_local(
    source: &Path,
    target: &Path,
    extensions: &HashSet<String>,
) -> Result<MirrorStats, SyncError> {
    if !source.exists() {
        return Err(SyncError::MissingSource(source.display().to_string()));
    }
    fs::create_dir_all(target)?;

    let mut existing = local_inventory(target, extensions);
    let files = audio_files(source, extensions);

    let mut stats = MirrorStats {
        total: files.len(),
        ..Default::default()
    };
    info!("Found {} audio files in {}", files.len(), source.display());

    for (index, file) in files.iter().enumerate() {
        let name = file_name(file);
        info!("({}/{}) {}", index + 1, stats.total, name);

        let key = normalize_track_name(&file_stem(file));
        if existing.contains_key(&key) {
            stats.skipped.push((name, key));
            continue;
        }

        let rel = match file.strip_prefix(source) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => PathBuf::from(&name),
        };
        let new_name = format!("{}{}", datetime_prefix(), name);
        let target_file = match rel.parent() {
            Some(parent) => target.join(parent).join(&new_name),
            None => target.join(&new_name),
        };

        if let Some(parent) = target_file.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!("Failed to create {}: {}", parent.display(), err);
                stats.failures += 1;
                continue;
            }
        }

        match fs::copy(file, &target_file) {
            Ok(_) => {
                existing.insert(key, new_name.clone());
                stats.copied.push(new_name);
            }
            Err(err) => {
                warn!("Failed to copy {}: {}", name, err);
                stats.failures += 1;
            }
        }
    }

    Ok(stats)
}

/// Mirrors a local tree onto a remote one. A missing remote root is fatal;
/// everything below it degrades per file.
pub fn mirror_remote(
    source: &Path,
    server_root: &str,
    tree: &dyn RemoteTree,
    extensions: &HashSet<String>,
) -> Result<MirrorStats, SyncError> {
    if !source.exists() {
        return Err(SyncError::MissingSource(source.display().to_string()));
    }

    let root = to_slash_string(server_root);
    match tree.stat(&root)? {
        Some(_) => {}
        None => return Err(SyncError::MissingSource(root)),
    }

    let mut existing = remote_inventory(tree, &root, extensions);
    let files = audio_files(source, extensions);

    let mut stats = MirrorStats {
        total: files.len(),
        ..Default::default()
    };
    info!("Found {} audio files in {}", files.len(), source.display());

    for (index, file) in files.iter().enumerate() {
        let name = file_name(file);
        info!("({}/{}) {}", index + 1, stats.total, name);

        let key = normalize_track_name(&file_stem(file));
        if existing.contains_key(&key) {
            stats.skipped.push((name, key));
            continue;
        }

        let rel = relpath_from(source, file).unwrap_or_else(|| name.clone());
        let new_name = format!("{}{}", datetime_prefix(), name);
        let rel_parent = match rel.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        };
        let remote_dir = join_server_path(&root, &rel_parent);
        let remote_file = join_server_path(&remote_dir, &new_name);

        if let Err(err) = ensure_remote_dir(tree, &remote_dir) {
            warn!("Failed to prepare {}: {}", remote_dir, err);
            stats.failures += 1;
            continue;
        }

        thread::sleep(PUT_DELAY);
        match tree.put(file, &remote_file) {
            Ok(()) => {
                existing.insert(key, new_name.clone());
                stats.copied.push(new_name);
            }
            Err(err) => {
                warn!("Failed to upload {}: {}", name, err);
                stats.failures += 1;
            }
        }
    }

    Ok(stats)
}

/// Creates missing ancestors of a remote directory. The chain is collected
/// by walking upward until an existing directory is found and then created
/// closest-to-root first; a bounded loop, not recursion.
fn ensure_remote_dir(tree: &dyn RemoteTree, dir: &str) -> Result<(), remote::RemoteError> {
    if tree.stat(dir)?.is_some() {
        return Ok(());
    }

    let mut missing = vec![dir.to_string()];
    let mut current = dir.to_string();
    loop {
        let parent = match parent_of(&current) {
            Some(parent) => parent,
            None => break,
        };
        match tree.stat(&parent)? {
            Some(_) => break,
            None => {
                missing.push(parent.clone());
                current = parent;
            }
        }
    }

    for dir_to_create in missing.iter().rev() {
        if let Err(err) = tree.mkdir(dir_to_create) {
            // Another ancestor may already exist; the final put decides.
            warn!("mkdir {} failed: {}", dir_to_create, err);
        }
    }
    Ok(())
}

fn parent_of(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    let (parent, _) = trimmed.rsplit_once('/')?;
    if parent.is_empty() || parent == "." {
        return None;
    }
    Some(parent.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::default_extensions;
    use remote::LocalTree;
    use tempfile::tempdir;

    #[test]
    fn mirror_local_copies_with_timestamp_prefix() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let target = dir.path().join("dst");
        fs::create_dir_all(source.join("rock")).unwrap();
        fs::write(source.join("rock").join("Song.mp3"), b"x").unwrap();

        let stats = mirror_local(&source, &target, &default_extensions()).unwrap();
        assert_eq!(stats.copied.len(), 1);
        assert_eq!(stats.failures, 0);

        let copied: Vec<_> = fs::read_dir(target.join("rock"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(copied.len(), 1);
        assert!(copied[0].ends_with("Song.mp3"));
        assert!(copied[0].len() > "Song.mp3".len());
    }

    #[test]
    fn mirror_local_skips_existing_normalized_names() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let target = dir.path().join("dst");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(source.join("Song.mp3"), b"x").unwrap();
        fs::write(target.join("2025-01-01_12-30_Song.mp3"), b"x").unwrap();

        let stats = mirror_local(&source, &target, &default_extensions()).unwrap();
        assert!(stats.copied.is_empty());
        assert_eq!(stats.skipped.len(), 1);
        assert_eq!(stats.skipped[0].1, "song");
    }

    #[test]
    fn mirror_local_missing_source_is_fatal() {
        let dir = tempdir().unwrap();
        let result = mirror_local(
            &dir.path().join("missing"),
            &dir.path().join("dst"),
            &default_extensions(),
        );
        assert!(matches!(result, Err(SyncError::MissingSource(_))));
    }

    #[test]
    fn mirror_remote_creates_missing_ancestors() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let root = dir.path().join("remote");
        fs::create_dir_all(source.join("rock").join("artist")).unwrap();
        fs::create_dir_all(&root).unwrap();
        fs::write(source.join("rock").join("artist").join("Song.mp3"), b"x").unwrap();

        let stats = mirror_remote(
            &source,
            &root.to_string_lossy(),
            &LocalTree,
            &default_extensions(),
        )
        .unwrap();

        assert_eq!(stats.copied.len(), 1);
        assert_eq!(stats.failures, 0);
        let uploaded: Vec<_> = fs::read_dir(root.join("rock").join("artist"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(uploaded.len(), 1);
        assert!(uploaded[0].ends_with("Song.mp3"));
    }

    #[test]
    fn mirror_remote_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(&source).unwrap();

        let result = mirror_remote(
            &source,
            &dir.path().join("missing").to_string_lossy(),
            &LocalTree,
            &default_extensions(),
        );
        assert!(matches!(result, Err(SyncError::MissingSource(_))));
    }

    #[test]
    fn mirror_remote_skips_remote_duplicates() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let root = dir.path().join("remote");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&root).unwrap();
        fs::write(source.join("Song.mp3"), b"x").unwrap();
        fs::write(root.join("2024-06-01_10-00_Song.mp3"), b"x").unwrap();

        let stats = mirror_remote(
            &source,
            &root.to_string_lossy(),
            &LocalTree,
            &default_extensions(),
        )
        .unwrap();
        assert!(stats.copied.is_empty());
        assert_eq!(stats.skipped.len(), 1);
    }
}
