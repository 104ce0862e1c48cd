use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use common::default_extensions;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Raw file shape: everything optional so one pass can report every
/// missing required field at once instead of failing on the first.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    songs_path: Option<String>,
    playlist_file: Option<String>,
    server_path: Option<String>,
    server_tracks_url: Option<String>,
    upload_page: Option<String>,
    upload_key: Option<String>,
    base_url: Option<String>,
    remove_prefix: Option<String>,
    supported_formats: Option<Vec<String>>,
    max_retries: Option<u32>,
    report_dir: Option<String>,
}

/// Validated once at startup; immutable afterwards.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub songs_path: PathBuf,
    pub playlist_file: PathBuf,
    pub server_path: String,
    pub server_tracks_url: String,
    pub upload_page: String,
    pub upload_key: String,
    pub base_url: String,
    pub remove_prefix: String,
    pub supported_formats: HashSet<String>,
    pub max_retries: u32,
    pub report_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    MissingFields(Vec<&'static str>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
            ConfigError::MissingFields(fields) => {
                write!(f, "missing required config fields: {}", fields.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn load_config(path: &Path) -> Result<SyncConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<SyncConfig, ConfigError> {
    let raw: RawConfig = serde_yaml::from_str(content)?;

    let mut missing = Vec::new();
    if raw.songs_path.is_none() {
        missing.push("songs_path");
    }
    if raw.playlist_file.is_none() {
        missing.push("playlist_file");
    }
    if raw.server_path.is_none() {
        missing.push("server_path");
    }
    if raw.server_tracks_url.is_none() {
        missing.push("server_tracks_url");
    }
    if raw.upload_page.is_none() {
        missing.push("upload_page");
    }
    if raw.upload_key.is_none() {
        missing.push("upload_key");
    }
    if !missing.is_empty() {
        return Err(ConfigError::MissingFields(missing));
    }

    let supported_formats = match raw.supported_formats {
        Some(formats) => formats
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect(),
        None => default_extensions(),
    };

    Ok(SyncConfig {
        songs_path: PathBuf::from(raw.songs_path.unwrap_or_default()),
        playlist_file: PathBuf::from(raw.playlist_file.unwrap_or_default()),
        server_path: raw.server_path.unwrap_or_default(),
        server_tracks_url: raw.server_tracks_url.unwrap_or_default(),
        upload_page: raw.upload_page.unwrap_or_default(),
        upload_key: raw.upload_key.unwrap_or_default(),
        base_url: raw.base_url.unwrap_or_default(),
        remove_prefix: raw.remove_prefix.unwrap_or_default(),
        supported_formats,
        max_retries: raw.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        report_dir: raw.report_dir.map(PathBuf::from),
    })
}
