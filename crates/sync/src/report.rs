use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::warn;

const FILE_STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");
const HUMAN_STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub file: String,
    pub full_path: String,
    pub relative_path: Option<String>,
    pub server_path: String,
    pub download_link: String,
    pub artist: String,
    pub title: String,
    pub result: String,
    pub success: bool,
}

/// Outcome of one reconciliation run, threaded through the phases and
/// returned instead of being accumulated on long-lived processor state.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub mode: String,
    pub timestamp: String,
    pub scanned: usize,
    pub playlist_inserts: Vec<String>,
    pub insert_failures: usize,
    pub playlist_duplicates: Vec<String>,
    pub remote_duplicates: Vec<String>,
    pub uploads: Vec<UploadOutcome>,
    pub upload_success: usize,
    pub upload_failures: usize,
}

impl RunReport {
    pub fn new(mode: &str) -> Self {
        Self {
            mode: mode.to_string(),
            timestamp: now_human(),
            ..Default::default()
        }
    }

    pub fn print_summary(&self) {
        println!("{}", "=".repeat(60));
        println!("RUN REPORT ({})", self.mode);
        println!("{}", "=".repeat(60));
        println!("Files scanned:               {}", self.scanned);
        println!("Added to playlist:           {}", self.playlist_inserts.len());
        println!("Playlist insert failures:    {}", self.insert_failures);
        println!("Playlist duplicates skipped: {}", self.playlist_duplicates.len());
        println!("Already in track database:   {}", self.remote_duplicates.len());
        println!("Uploaded successfully:       {}", self.upload_success);
        println!("Upload failures:             {}", self.upload_failures);

        if !self.playlist_inserts.is_empty() {
            println!("\nAdded to playlist:");
            for reference in self.playlist_inserts.iter().take(10) {
                println!("  + {}", reference);
            }
            if self.playlist_inserts.len() > 10 {
                println!("  ... and {} more", self.playlist_inserts.len() - 10);
            }
        }

        if !self.playlist_duplicates.is_empty() {
            println!("\nPlaylist duplicates:");
            for name in self.playlist_duplicates.iter().take(5) {
                println!("  - {}", name);
            }
            if self.playlist_duplicates.len() > 5 {
                println!("  ... and {} more", self.playlist_duplicates.len() - 5);
            }
        }

        for outcome in &self.uploads {
            let mark = if outcome.success { "ok" } else { "failed" };
            println!("\n{}: {} - {}", mark, outcome.artist, outcome.title);
            println!("  file:   {}", outcome.file);
            println!("  link:   {}", outcome.download_link);
            println!("  result: {}", outcome.result);
        }
    }

    /// Writes the machine-readable summary. The run already succeeded
    /// functionally, so write failures are swallowed with a warning.
    pub fn write_json(&self, dir: Option<&Path>) -> Option<PathBuf> {
        let name = format!("report_{}.json", now_file_stamp());
        let path = dir.unwrap_or_else(|| Path::new(".")).join(name);

        let body = match serde_json::to_string_pretty(self) {
            Ok(body) => body,
            Err(err) => {
                warn!("Failed to serialize run report: {}", err);
                return None;
            }
        };
        match fs::write(&path, body) {
            Ok(()) => Some(path),
            Err(err) => {
                warn!("Failed to write run report {:?}: {}", path, err);
                None
            }
        }
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn now_human() -> String {
    now().format(&HUMAN_STAMP_FORMAT).unwrap_or_default()
}

fn now_file_stamp() -> String {
    now().format(&FILE_STAMP_FORMAT).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn report_serializes_and_writes() {
        let dir = tempdir().unwrap();
        let mut report = RunReport::new("default");
        report.scanned = 2;
        report.playlist_inserts.push("music/a.mp3".to_string());

        let path = report.write_json(Some(dir.path())).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"mode\": \"default\""));
        assert!(content.contains("music/a.mp3"));
    }

    #[test]
    fn write_failure_is_swallowed() {
        let report = RunReport::new("default");
        let missing_dir = PathBuf::from("/nonexistent/report/dir");
        assert!(report.write_json(Some(&missing_dir)).is_none());
    }
}
