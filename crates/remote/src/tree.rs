use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::warn;

use common::{has_audio_extension, normalize_track_name, to_slash_string};

use crate::RemoteError;

#[derive(Debug, Clone, Copy)]
pub struct RemoteStat {
    pub is_dir: bool,
}

#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Capability consumed from the remote filesystem collaborator. `stat`
/// distinguishes not-found (`Ok(None)`) from other failures.
pub trait RemoteTree {
    fn stat(&self, path: &str) -> Result<Option<RemoteStat>, RemoteError>;
    fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;
    fn mkdir(&self, path: &str) -> Result<(), RemoteError>;
    fn put(&self, local: &Path, remote: &str) -> Result<(), RemoteError>;
}

/// Recursive inventory of a remote folder, indexed by normalized stem.
/// A missing root or an unreadable subtree yields what was readable; the
/// caller decides whether a missing root is fatal for its own operation.
pub fn remote_inventory(
    tree: &dyn RemoteTree,
    root: &str,
    extensions: &HashSet<String>,
) -> HashMap<String, String> {
    let root = to_slash_string(root);
    let mut tracks = HashMap::new();

    match tree.stat(&root) {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("Remote folder does not exist: {}", root);
            return tracks;
        }
        Err(err) => {
            warn!("Failed to stat remote folder {}: {}", root, err);
            return tracks;
        }
    }

    scan_directory(tree, &root, extensions, &mut tracks);
    tracks
}

fn scan_directory(
    tree: &dyn RemoteTree,
    current: &str,
    extensions: &HashSet<String>,
    tracks: &mut HashMap<String, String>,
) {
    let entries = match tree.list_dir(current) {
        Ok(entries) => entries,
        Err(err) => {
            // One unreadable directory must not abort the whole inventory.
            warn!("Skipping unreadable remote directory {}: {}", current, err);
            return;
        }
    };

    for entry in entries {
        let full_path = if current == "/" {
            format!("/{}", entry.name)
        } else {
            format!("{}/{}", current, entry.name)
        };

        if entry.is_dir {
            scan_directory(tree, &full_path, extensions, tracks);
        } else if has_audio_extension(&entry.name, extensions) {
            let stem = entry
                .name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(&entry.name);
            tracks.insert(normalize_track_name(stem), entry.name.clone());
        }
    }
}

/// `RemoteTree` over the local filesystem. Backs the local mirror mode and
/// stands in for the SFTP collaborator in tests.
pub struct LocalTree;

impl RemoteTree for LocalTree {
    fn stat(&self, path: &str) -> Result<Option<RemoteStat>, RemoteError> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(RemoteStat {
                is_dir: meta.is_dir(),
            })),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            entries.push(RemoteEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: file_type.is_dir(),
            });
        }
        Ok(entries)
    }

    fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        fs::create_dir(path)?;
        Ok(())
    }

    fn put(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        fs::copy(local, remote)?;
        Ok(())
    }
}
