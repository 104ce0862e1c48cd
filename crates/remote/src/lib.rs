mod http;
mod sftp;
mod tree;

pub use http::{parse_inventory_body, HttpClient, ERROR_MARKER};
pub use sftp::SftpTree;
pub use tree::{remote_inventory, LocalTree, RemoteEntry, RemoteStat, RemoteTree};

#[derive(Debug)]
pub enum RemoteError {
    Http(reqwest::Error),
    Status(u16, String),
    Payload(String),
    Ssh(ssh2::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Http(err) => write!(f, "http error: {}", err),
            RemoteError::Status(code, body) => write!(f, "http status {}: {}", code, body),
            RemoteError::Payload(message) => write!(f, "payload error: {}", message),
            RemoteError::Ssh(err) => write!(f, "ssh error: {}", err),
            RemoteError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Http(err)
    }
}

impl From<ssh2::Error> for RemoteError {
    fn from(err: ssh2::Error) -> Self {
        RemoteError::Ssh(err)
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        RemoteError::Io(err)
    }
}
