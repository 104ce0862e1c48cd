pub mod check;
pub mod config;
pub mod engine;
pub mod mirror;
pub mod paths;
pub mod report;

pub use check::{check_local, check_remote, prune_missing, CheckOutcome};
pub use config::{load_config, ConfigError, SyncConfig};
pub use engine::{run_sync, RunMode};
pub use mirror::{mirror_local, mirror_remote, MirrorStats};
pub use report::{RunReport, UploadOutcome};

use playlist::PlaylistError;
use remote::RemoteError;

#[derive(Debug)]
pub enum SyncError {
    Config(ConfigError),
    Playlist(PlaylistError),
    Remote(RemoteError),
    Io(std::io::Error),
    MissingSource(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Config(err) => write!(f, "config error: {}", err),
            SyncError::Playlist(err) => write!(f, "playlist error: {}", err),
            SyncError::Remote(err) => write!(f, "remote error: {}", err),
            SyncError::Io(err) => write!(f, "io error: {}", err),
            SyncError::MissingSource(path) => {
                write!(f, "source folder does not exist: {}", path)
            }
        }
    }
}

impl std::error::Error for SyncError {}

impl From<ConfigError> for SyncError {
    fn from(err: ConfigError) -> Self {
        SyncError::Config(err)
    }
}

impl From<PlaylistError> for SyncError {
    fn from(err: PlaylistError) -> Self {
        SyncError::Playlist(err)
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        SyncError::Remote(err)
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err)
    }
}
