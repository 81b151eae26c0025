use std::io;

use async_trait::async_trait;
use tokio::io::AsyncRead;

/// A flattened, `stat`-like view of a remote path: `{atime, gid, mode,
/// mtime, size, uid}` plus the two type bits callers need without a
/// separate `lstat` round-trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteAttrs {
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    /// Unix permission bits only (no file-type bits); matches what
    /// `fuser::FileAttr::perm` expects.
    pub mode: u32,
    pub atime: i64,
    pub mtime: i64,
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// The capability interface consumed by the connection manager. Implemented
/// by a live SFTP session ([`crate::LiveSftp`]) and by an offline stub
/// ([`crate::OfflineCapability`]); the dispatcher and caches only ever see
/// `dyn SftpCapability`.
#[async_trait]
pub trait SftpCapability: Send + Sync {
    /// `lstat`: attributes of the path itself (does not follow a terminal
    /// symlink).
    async fn lstat(&self, path: &str) -> io::Result<RemoteAttrs>;

    /// Directory listing, excluding `.`/`..` (the dispatcher prepends
    /// those per spec's `DirListing` convention).
    async fn listdir(&self, path: &str) -> io::Result<Vec<String>>;

    /// Target of a symlink.
    async fn readlink(&self, path: &str) -> io::Result<String>;

    /// Opens `path` for reading and seeks to `offset`, returning a reader
    /// positioned there. Used by the data cache to fetch one or two
    /// consecutive blocks in a single open.
    async fn open_read_at(
        &self,
        path: &str,
        offset: u64,
    ) -> io::Result<Box<dyn AsyncRead + Unpin + Send>>;

    /// Opens (without truncating) `path` and writes `data` at `offset`.
    async fn write_at(&self, path: &str, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Creates an empty file with the given permission bits (`create` +
    /// `chmod` + `close`).
    async fn create_file(&self, path: &str, mode: u32) -> io::Result<()>;

    async fn mkdir(&self, path: &str) -> io::Result<()>;
    async fn rmdir(&self, path: &str) -> io::Result<()>;
    async fn unlink(&self, path: &str) -> io::Result<()>;
    async fn rename(&self, from: &str, to: &str) -> io::Result<()>;
    async fn symlink(&self, target: &str, link_path: &str) -> io::Result<()>;
    async fn chmod(&self, path: &str, mode: u32) -> io::Result<()>;
    async fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()>;
    async fn truncate(&self, path: &str, size: u64) -> io::Result<()>;
    async fn utime(&self, path: &str, atime: i64, mtime: i64) -> io::Result<()>;
    async fn chdir(&self, path: &str) -> io::Result<()>;

    /// True for a live session, false for [`crate::OfflineCapability`]. Lets
    /// the dispatcher decide whether a metadata invalidation that precedes a
    /// mutation should actually run (I6: mutating metadata writes are
    /// suppressed while offline so stale entries survive to be re-fetched).
    fn is_online(&self) -> bool;
}
