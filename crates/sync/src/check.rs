use std::path::Path;

use tracing::info;

use common::to_slash_string;
use playlist::{PlaylistError, PlaylistStore};
use remote::RemoteTree;

/// Partition of a playlist's references into present and absent files.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub existing: Vec<String>,
    pub missing: Vec<String>,
}

impl CheckOutcome {
    pub fn total(&self) -> usize {
        self.existing.len() + self.missing.len()
    }

    pub fn print_summary(&self, playlist: &Path) {
        println!("{}", "=".repeat(60));
        println!("PLAYLIST CHECK");
        println!("{}", "=".repeat(60));
        println!("Playlist:        {}", playlist.display());
        println!("Total tracks:    {}", self.total());
        println!("Existing tracks: {}", self.existing.len());
        println!("Missing tracks:  {}", self.missing.len());

        if !self.missing.is_empty() {
            println!("\nMissing tracks:");
            for (index, track) in self.missing.iter().enumerate() {
                println!("{:3}. {}", index + 1, track);
            }
        }
    }
}

fn unquote(reference: &str) -> &str {
    let trimmed = reference.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Probes each reference on the local filesystem.
pub fn check_local(references: &[String]) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    for reference in references {
        let path = Path::new(unquote(reference));
        if path.is_file() {
            outcome.existing.push(reference.clone());
        } else {
            outcome.missing.push(reference.clone());
        }
    }
    outcome
}

/// Probes each reference on the remote tree; stat errors count as missing.
pub fn check_remote(references: &[String], tree: &dyn RemoteTree) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    for reference in references {
        let path = to_slash_string(unquote(reference));
        match tree.stat(&path) {
            Ok(Some(_)) => outcome.existing.push(reference.clone()),
            _ => outcome.missing.push(reference.clone()),
        }
    }
    outcome
}

/// Rewrites the playlist down to the existing references. `rewrite` backs
/// up the previous file first.
pub fn prune_missing(store: &PlaylistStore, outcome: &CheckOutcome) -> Result<(), PlaylistError> {
    store.rewrite(&outcome.existing)?;
    info!(
        "Removed {} missing tracks from {:?}",
        outcome.missing.len(),
        store.path()
    );
    Ok(())
}
