use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{info, warn};
use urlencoding::encode;

use crate::RemoteError;

use common::to_slash_string;

/// A response body containing this substring counts as a failed
/// transmission regardless of the HTTP status.
pub const ERROR_MARKER: &str = "Error";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct InventoryEntry {
    #[serde(default)]
    file_path: Option<String>,
}

/// Parses the track database payload: a JSON array of objects carrying a
/// `file_path` field. Anything else is a fatal payload error. Paths are
/// slash-normalized and trimmed before insertion.
pub fn parse_inventory_body(body: &str) -> Result<HashSet<String>, RemoteError> {
    let entries: Vec<InventoryEntry> = serde_json::from_str(body)
        .map_err(|err| RemoteError::Payload(format!("invalid track database response: {}", err)))?;

    let mut paths = HashSet::new();
    for entry in entries {
        if let Some(path) = entry.file_path {
            paths.insert(to_slash_string(&path).trim().to_string());
        }
    }
    Ok(paths)
}

pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// One GET to the track database endpoint. A non-200 status or a body
    /// that is not a JSON array is fatal for the run: no partial inventory.
    pub fn fetch_inventory(&self, url: &str) -> Result<HashSet<String>, RemoteError> {
        info!("Fetching track database from {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        if status != 200 {
            return Err(RemoteError::Status(status, body));
        }

        let paths = parse_inventory_body(&body)?;
        info!("Track database reports {} tracks", paths.len());
        Ok(paths)
    }

    /// Submits one track as percent-encoded GET parameters and returns the
    /// textual result. Transport problems become an `Error`-marked string
    /// rather than a hard failure so the batch can continue.
    pub fn send_track(&self, page: &str, key: &str, params: &[(&str, &str)]) -> String {
        let mut url_params = format!("key={}", encode(key));
        for (name, value) in params {
            url_params.push_str(&format!("&{}={}", name, encode(value)));
        }
        let url = format!("{}?{}", page, url_params);

        match self.client.get(&url).send() {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 200 {
                    response
                        .text()
                        .unwrap_or_else(|err| format!("Request Error: {}", err))
                } else {
                    format!("HTTP Error: {}", status)
                }
            }
            Err(err) => format!("Request Error: {}", err),
        }
    }

    /// Retries a failed submission with a fixed backoff. Exhausting the
    /// attempts yields the last result; the caller records it and moves on.
    pub fn send_track_with_retry(
        &self,
        page: &str,
        key: &str,
        params: &[(&str, &str)],
        max_attempts: u32,
        backoff: Duration,
    ) -> (String, bool) {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = self.send_track(page, key, params);
            let success = !result.contains(ERROR_MARKER);
            if success || attempt >= max_attempts {
                return (result, success);
            }
            warn!(
                "Submission attempt {}/{} failed: {}",
                attempt, max_attempts, result
            );
            attempt += 1;
            thread::sleep(backoff);
        }
    }
}
