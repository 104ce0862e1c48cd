use std::fs::File;
use std::io;
use std::net::TcpStream;
use std::path::Path;

use ssh2::{ErrorCode, Session, Sftp};
use tracing::info;

use crate::tree::{RemoteEntry, RemoteStat, RemoteTree};
use crate::RemoteError;

// SFTP status codes for missing targets (libssh2 FX_NO_SUCH_FILE / FX_NO_SUCH_PATH).
const FX_NO_SUCH_FILE: i32 = 2;
const FX_NO_SUCH_PATH: i32 = 10;

/// `RemoteTree` over an SFTP session.
pub struct SftpTree {
    sftp: Sftp,
    _session: Session,
}

impl SftpTree {
    pub fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, RemoteError> {
        let stream = TcpStream::connect((host, port))?;
        let mut session = Session::new()?;
        session.set_tcp_stream(stream);
        session.handshake()?;
        session.userauth_password(username, password)?;
        let sftp = session.sftp()?;
        info!("Connected to {}:{}", host, port);
        Ok(Self {
            sftp,
            _session: session,
        })
    }
}

fn is_not_found(err: &ssh2::Error) -> bool {
    matches!(
        err.code(),
        ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH)
    )
}

impl RemoteTree for SftpTree {
    fn stat(&self, path: &str) -> Result<Option<RemoteStat>, RemoteError> {
        match self.sftp.stat(Path::new(path)) {
            Ok(stat) => Ok(Some(RemoteStat {
                is_dir: stat.is_dir(),
            })),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let listing = self.sftp.readdir(Path::new(path))?;
        let mut entries = Vec::new();
        for (entry_path, stat) in listing {
            let name = entry_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            entries.push(RemoteEntry {
                name,
                is_dir: stat.is_dir(),
            });
        }
        Ok(entries)
    }

    fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        self.sftp.mkdir(Path::new(path), 0o755)?;
        Ok(())
    }

    fn put(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut source = File::open(local)?;
        let mut target = self.sftp.create(Path::new(remote))?;
        io::copy(&mut source, &mut target)?;
        Ok(())
    }
}
