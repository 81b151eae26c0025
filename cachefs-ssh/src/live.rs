use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client::Handle;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, OpenFlags};
use tokio::io::AsyncRead;
use tokio::sync::Mutex;

use crate::capability::{RemoteAttrs, SftpCapability};
use crate::ClientHandler;

/// Live SFTP session backing [`SftpCapability`]. Grounded on
/// `distant-ssh`'s `SshApi`: one `SftpSession` shared behind a lock because
/// `russh_sftp` multiplexes requests over a single channel but its client
/// handle is not `Sync` across awaits from multiple cachefs worker threads
/// without serializing at this layer.
pub struct LiveSftp {
    // kept alive for the lifetime of the session; dropping it closes the
    // underlying SSH connection.
    _handle: Handle<ClientHandler>,
    sftp: Mutex<Arc<SftpSession>>,
}

impl LiveSftp {
    pub(crate) fn new(handle: Handle<ClientHandler>, sftp: SftpSession) -> Self {
        Self {
            _handle: handle,
            sftp: Mutex::new(Arc::new(sftp)),
        }
    }

    async fn session(&self) -> Arc<SftpSession> {
        self.sftp.lock().await.clone()
    }
}

/// Permission-bit mask; `FileAttributes::permissions` also carries the file
/// type in its high bits (S_IFDIR etc.), which `is_dir`/`is_symlink` decode
/// for us, so the mode we surface is just the low 12 bits.
const MODE_MASK: u32 = 0o7777;

fn attrs_to_remote(meta: FileAttributes) -> RemoteAttrs {
    RemoteAttrs {
        size: meta.size.unwrap_or(0),
        uid: meta.uid.unwrap_or(0),
        gid: meta.gid.unwrap_or(0),
        mode: meta.permissions.map(|p| p & MODE_MASK).unwrap_or(0o644),
        atime: meta.atime.unwrap_or(0) as i64,
        mtime: meta.mtime.unwrap_or(0) as i64,
        is_dir: meta.is_dir(),
        is_symlink: meta.is_symlink(),
    }
}

fn other(e: impl std::fmt::Display) -> io::Error {
    io::Error::other(e.to_string())
}

#[async_trait]
impl SftpCapability for LiveSftp {
    async fn lstat(&self, path: &str) -> io::Result<RemoteAttrs> {
        let meta = self
            .session()
            .await
            .symlink_metadata(path)
            .await
            .map_err(other)?;
        Ok(attrs_to_remote(meta))
    }

    async fn listdir(&self, path: &str) -> io::Result<Vec<String>> {
        let entries = self.session().await.read_dir(path).await.map_err(other)?;
        Ok(entries
            .filter_map(|e| {
                let name = e.file_name();
                if name == "." || name == ".." {
                    None
                } else {
                    Some(name)
                }
            })
            .collect())
    }

    async fn readlink(&self, path: &str) -> io::Result<String> {
        self.session().await.read_link(path).await.map_err(other)
    }

    async fn open_read_at(
        &self,
        path: &str,
        offset: u64,
    ) -> io::Result<Box<dyn AsyncRead + Unpin + Send>> {
        let mut file = self
            .session()
            .await
            .open_with_flags(path, OpenFlags::READ)
            .await
            .map_err(other)?;
        use tokio::io::AsyncSeekExt;
        file.seek(io::SeekFrom::Start(offset)).await?;
        Ok(Box::new(file))
    }

    async fn write_at(&self, path: &str, offset: u64, data: &[u8]) -> io::Result<()> {
        let mut file = self
            .session()
            .await
            .open_with_flags(path, OpenFlags::WRITE | OpenFlags::CREATE)
            .await
            .map_err(other)?;
        use tokio::io::{AsyncSeekExt, AsyncWriteExt};
        file.seek(io::SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn create_file(&self, path: &str, mode: u32) -> io::Result<()> {
        let session = self.session().await;
        drop(session.create(path).await.map_err(other)?);
        session
            .set_metadata(
                path,
                FileAttributes {
                    permissions: Some(mode),
                    ..Default::default()
                },
            )
            .await
            .map_err(other)
    }

    async fn mkdir(&self, path: &str) -> io::Result<()> {
        self.session().await.create_dir(path).await.map_err(other)
    }

    async fn rmdir(&self, path: &str) -> io::Result<()> {
        self.session().await.remove_dir(path).await.map_err(other)
    }

    async fn unlink(&self, path: &str) -> io::Result<()> {
        self.session()
            .await
            .remove_file(path)
            .await
            .map_err(other)
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.session().await.rename(from, to).await.map_err(other)
    }

    async fn symlink(&self, target: &str, link_path: &str) -> io::Result<()> {
        self.session()
            .await
            .symlink(target, link_path)
            .await
            .map_err(other)
    }

    async fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
        self.session()
            .await
            .set_metadata(
                path,
                FileAttributes {
                    permissions: Some(mode & MODE_MASK),
                    ..Default::default()
                },
            )
            .await
            .map_err(other)
    }

    async fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        self.session()
            .await
            .set_metadata(
                path,
                FileAttributes {
                    uid: Some(uid),
                    gid: Some(gid),
                    ..Default::default()
                },
            )
            .await
            .map_err(other)
    }

    async fn truncate(&self, path: &str, size: u64) -> io::Result<()> {
        self.session()
            .await
            .set_metadata(
                path,
                FileAttributes {
                    size: Some(size),
                    ..Default::default()
                },
            )
            .await
            .map_err(other)
    }

    async fn utime(&self, path: &str, atime: i64, mtime: i64) -> io::Result<()> {
        self.session()
            .await
            .set_metadata(
                path,
                FileAttributes {
                    atime: Some(atime as u32),
                    mtime: Some(mtime as u32),
                    ..Default::default()
                },
            )
            .await
            .map_err(other)
    }

    /// SFTP has no server-side working directory; every path below this
    /// call site must already be absolute or resolved against the base
    /// directory by the caller. This only confirms `path` exists and is a
    /// directory before cachefs commits to it as the mount's remote root.
    async fn chdir(&self, path: &str) -> io::Result<()> {
        let session = self.session().await;
        let canon = session.canonicalize(path).await.map_err(other)?;
        let meta = session.metadata(&canon).await.map_err(other)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{path} is not a directory"),
            ));
        }
        Ok(())
    }

    fn is_online(&self) -> bool {
        true
    }
}
