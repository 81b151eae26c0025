use std::io;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::capability::{RemoteAttrs, SftpCapability};

fn network_down() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "remote session unavailable")
}

/// Stands in for [`crate::LiveSftp`] when no SSH session could be
/// established or an established one has dropped. Every operation fails
/// with the same `NotConnected` error so callers have one error kind to
/// branch on regardless of which method they called.
#[derive(Default)]
pub struct OfflineCapability;

#[async_trait]
impl SftpCapability for OfflineCapability {
    async fn lstat(&self, _path: &str) -> io::Result<RemoteAttrs> {
        Err(network_down())
    }

    async fn listdir(&self, _path: &str) -> io::Result<Vec<String>> {
        Err(network_down())
    }

    async fn readlink(&self, _path: &str) -> io::Result<String> {
        Err(network_down())
    }

    async fn open_read_at(
        &self,
        _path: &str,
        _offset: u64,
    ) -> io::Result<Box<dyn AsyncRead + Unpin + Send>> {
        Err(network_down())
    }

    async fn write_at(&self, _path: &str, _offset: u64, _data: &[u8]) -> io::Result<()> {
        Err(network_down())
    }

    async fn create_file(&self, _path: &str, _mode: u32) -> io::Result<()> {
        Err(network_down())
    }

    async fn mkdir(&self, _path: &str) -> io::Result<()> {
        Err(network_down())
    }

    async fn rmdir(&self, _path: &str) -> io::Result<()> {
        Err(network_down())
    }

    async fn unlink(&self, _path: &str) -> io::Result<()> {
        Err(network_down())
    }

    async fn rename(&self, _from: &str, _to: &str) -> io::Result<()> {
        Err(network_down())
    }

    async fn symlink(&self, _target: &str, _link_path: &str) -> io::Result<()> {
        Err(network_down())
    }

    async fn chmod(&self, _path: &str, _mode: u32) -> io::Result<()> {
        Err(network_down())
    }

    async fn chown(&self, _path: &str, _uid: u32, _gid: u32) -> io::Result<()> {
        Err(network_down())
    }

    async fn truncate(&self, _path: &str, _size: u64) -> io::Result<()> {
        Err(network_down())
    }

    async fn utime(&self, _path: &str, _atime: i64, _mtime: i64) -> io::Result<()> {
        Err(network_down())
    }

    async fn chdir(&self, _path: &str) -> io::Result<()> {
        Err(network_down())
    }

    fn is_online(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_operation_reports_not_connected() {
        let cap = OfflineCapability;
        assert_eq!(
            cap.lstat("/foo").await.unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert_eq!(
            cap.listdir("/foo").await.unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert_eq!(
            cap.mkdir("/foo").await.unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
    }
}
