//! Data cache (C3): a block-granular, on-disk cache of remote file
//! contents. Blocks are written atomically (write to a temp file, then
//! rename into place) so a reader never observes a partially written
//! block, which the original tool's direct `open(...).write()` did not
//! guarantee.

use std::io;
use std::path::{Path, PathBuf};

use cachefs_ssh::SftpCapability;
use log::debug;
use tokio::io::AsyncWriteExt;

use crate::pathmap;

pub const BLOCK_SIZE: u64 = 131_072;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FsStats {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

pub struct DataCache {
    data_dir: PathBuf,
}

impl DataCache {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Reads `size` bytes at `offset` from `virtual_path`, fetching any
    /// missing blocks from `remote_path` via `cap` first. The block range
    /// is computed so it never reaches past the byte the caller actually
    /// asked for (the original's `range(a, b+1)` over-iterated by one
    /// block on an exactly block-aligned read; this does not).
    pub async fn read(
        &self,
        virtual_path: &str,
        remote_path: &str,
        cap: &dyn SftpCapability,
        size: u64,
        offset: u64,
    ) -> io::Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }

        let first_block = offset / BLOCK_SIZE;
        let last_byte = offset + size - 1;
        let last_block = last_byte / BLOCK_SIZE;

        let mut out = Vec::with_capacity(size as usize);
        let mut block_num = first_block;
        while block_num <= last_block {
            let block_path = pathmap::to_block_path(&self.data_dir, virtual_path, block_num);

            let block_data = match tokio::fs::read(&block_path).await {
                Ok(data) => data,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.fetch_blocks(virtual_path, remote_path, cap, block_num, last_block)
                        .await?;
                    tokio::fs::read(&block_path).await.unwrap_or_default()
                }
                Err(e) => return Err(e),
            };

            let block_start = block_num * BLOCK_SIZE;
            let want_start = offset.max(block_start) - block_start;
            let want_end = (offset + size).min(block_start + BLOCK_SIZE) - block_start;
            if (want_start as usize) < block_data.len() {
                let end = (want_end as usize).min(block_data.len());
                out.extend_from_slice(&block_data[want_start as usize..end]);
            }

            block_num += 1;
        }

        Ok(out)
    }

    /// Fetches one block (the one actually missed) or, when a second
    /// consecutive block will also be needed, both in a single remote open
    /// — the burst-read optimization from the original implementation,
    /// realized here as a single bounded read rather than a paramiko
    /// prefetch hint (see `cachefs_ssh::read_up_to`).
    async fn fetch_blocks(
        &self,
        virtual_path: &str,
        remote_path: &str,
        cap: &dyn SftpCapability,
        block_num: u64,
        last_block: u64,
    ) -> io::Result<()> {
        let fetch_two = block_num < last_block;
        let burst = if fetch_two { 2 * BLOCK_SIZE } else { BLOCK_SIZE };

        let reader = cap
            .open_read_at(remote_path, block_num * BLOCK_SIZE)
            .await?;
        let data = cachefs_ssh::read_up_to(reader, burst as usize).await?;

        for (i, chunk) in data.chunks(BLOCK_SIZE as usize).enumerate() {
            let block_path =
                pathmap::to_block_path(&self.data_dir, virtual_path, block_num + i as u64);
            write_block_atomic(&block_path, chunk).await?;
        }
        Ok(())
    }

    /// Deletes every cached block for `virtual_path` whose ctime predates
    /// `mtime`, or every block unconditionally when `mtime` is `None` (a
    /// full invalidation, e.g. on `unlink`/`rename`).
    pub async fn remove_stale_blocks(&self, virtual_path: &str, mtime: Option<i64>) -> io::Result<()> {
        let trimmed = virtual_path.trim_start_matches('/');
        let full_path = self.data_dir.join(trimmed);
        let (parent, file_name) = match (full_path.parent(), full_path.file_name()) {
            (Some(p), Some(f)) => (p.to_path_buf(), f.to_string_lossy().into_owned()),
            _ => return Ok(()),
        };

        let mut entries = match tokio::fs::read_dir(&parent).await {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let prefix = format!("{file_name}-block");
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(&prefix) {
                continue;
            }
            let stale = match mtime {
                None => true,
                Some(mtime) => {
                    let meta = entry.metadata().await?;
                    let ctime = file_ctime(&meta);
                    ctime < mtime
                }
            };
            if stale {
                debug!("removing stale block {:?}", entry.path());
                let _ = tokio::fs::remove_file(entry.path()).await;
            }
        }
        Ok(())
    }

    /// Local `statvfs` on the data cache directory under `virtual_path`.
    /// Returns a zeroed [`FsStats`] when no block has been cached yet for
    /// this path, rather than the original's implicit `None`.
    pub fn statvfs(&self, virtual_path: &str) -> io::Result<FsStats> {
        let trimmed = virtual_path.trim_start_matches('/');
        let full_path = self.data_dir.join(trimmed);
        let parent = match full_path.parent() {
            Some(p) if p.exists() => p,
            _ => return Ok(FsStats::default()),
        };

        match nix::sys::statvfs::statvfs(parent) {
            Ok(s) => Ok(FsStats {
                blocks: s.blocks(),
                bfree: s.blocks_free(),
                bavail: s.blocks_available(),
                files: s.files(),
                ffree: s.files_free(),
                bsize: s.block_size() as u32,
                namelen: s.name_max() as u32,
                frsize: s.fragment_size() as u32,
            }),
            Err(_) => Ok(FsStats::default()),
        }
    }
}

async fn write_block_atomic(block_path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = block_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = block_path.with_extension("tmp");
    let mut tmp = tokio::fs::File::create(&tmp_path).await?;
    tmp.write_all(data).await?;
    tmp.flush().await?;
    tokio::fs::rename(&tmp_path, block_path).await
}

fn file_ctime(meta: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::task::{Context, Poll};

    use async_trait::async_trait;
    use cachefs_ssh::RemoteAttrs;
    use tokio::io::{AsyncRead, ReadBuf};

    /// An in-memory stand-in for a live SFTP session: one fixed file whose
    /// bytes back every `open_read_at`/`write_at` call, with every fetch
    /// recorded (offset, bytes requested) so tests can assert on the
    /// burst-fetch/prefetch-pairing behavior without a real network.
    struct FakeSftp {
        file: StdMutex<Vec<u8>>,
        fetches: StdMutex<Vec<(u64, usize)>>,
        open_calls: AtomicUsize,
    }

    impl FakeSftp {
        fn new(contents: Vec<u8>) -> Self {
            Self {
                file: StdMutex::new(contents),
                fetches: StdMutex::new(Vec::new()),
                open_calls: AtomicUsize::new(0),
            }
        }

        fn open_call_count(&self) -> usize {
            self.open_calls.load(Ordering::SeqCst)
        }

        fn fetches(&self) -> Vec<(u64, usize)> {
            self.fetches.lock().unwrap().clone()
        }
    }

    struct FakeReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl AsyncRead for FakeReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let remaining = &this.data[this.pos..];
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            this.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    #[async_trait]
    impl SftpCapability for FakeSftp {
        async fn lstat(&self, _path: &str) -> io::Result<RemoteAttrs> {
            let len = self.file.lock().unwrap().len() as u64;
            Ok(RemoteAttrs {
                size: len,
                uid: 0,
                gid: 0,
                mode: 0o644,
                atime: 0,
                mtime: 0,
                is_dir: false,
                is_symlink: false,
            })
        }

        async fn listdir(&self, _path: &str) -> io::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn readlink(&self, _path: &str) -> io::Result<String> {
            Err(io::Error::other("not a symlink"))
        }

        async fn open_read_at(
            &self,
            _path: &str,
            offset: u64,
        ) -> io::Result<Box<dyn AsyncRead + Unpin + Send>> {
            self.open_calls.fetch_add(1, Ordering::SeqCst);
            let data = self.file.lock().unwrap();
            let start = (offset as usize).min(data.len());
            let tail = data[start..].to_vec();
            self.fetches.lock().unwrap().push((offset, tail.len()));
            Ok(Box::new(FakeReader { data: tail, pos: 0 }))
        }

        async fn write_at(&self, _path: &str, offset: u64, data: &[u8]) -> io::Result<()> {
            let mut file = self.file.lock().unwrap();
            let end = offset as usize + data.len();
            if file.len() < end {
                file.resize(end, 0);
            }
            file[offset as usize..end].copy_from_slice(data);
            Ok(())
        }

        async fn create_file(&self, _path: &str, _mode: u32) -> io::Result<()> {
            Ok(())
        }
        async fn mkdir(&self, _path: &str) -> io::Result<()> {
            Ok(())
        }
        async fn rmdir(&self, _path: &str) -> io::Result<()> {
            Ok(())
        }
        async fn unlink(&self, _path: &str) -> io::Result<()> {
            Ok(())
        }
        async fn rename(&self, _from: &str, _to: &str) -> io::Result<()> {
            Ok(())
        }
        async fn symlink(&self, _target: &str, _link_path: &str) -> io::Result<()> {
            Ok(())
        }
        async fn chmod(&self, _path: &str, _mode: u32) -> io::Result<()> {
            Ok(())
        }
        async fn chown(&self, _path: &str, _uid: u32, _gid: u32) -> io::Result<()> {
            Ok(())
        }
        async fn truncate(&self, _path: &str, _size: u64) -> io::Result<()> {
            Ok(())
        }
        async fn utime(&self, _path: &str, _atime: i64, _mtime: i64) -> io::Result<()> {
            Ok(())
        }
        async fn chdir(&self, _path: &str) -> io::Result<()> {
            Ok(())
        }
        fn is_online(&self) -> bool {
            true
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    /// Scenario 1 (cold read): a 300,000-byte remote file, `read(p, 200000,
    /// 0)` returns exactly the requested bytes and a following read of the
    /// same range issues no further remote opens.
    #[tokio::test]
    async fn cold_read_is_exact_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DataCache::new(dir.path().to_path_buf());
        let remote = FakeSftp::new(pattern(300_000));

        let first = cache
            .read("/big.bin", "big.bin", &remote, 200_000, 0)
            .await
            .unwrap();
        assert_eq!(first.len(), 200_000);
        assert_eq!(first, pattern(300_000)[0..200_000]);

        let calls_after_first = remote.open_call_count();
        assert!(calls_after_first > 0);

        let second = cache
            .read("/big.bin", "big.bin", &remote, 200_000, 0)
            .await
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(
            remote.open_call_count(),
            calls_after_first,
            "a fully cached range must not issue another remote open"
        );
    }

    /// P1: a read past the end of a file returns only the bytes that
    /// exist, never more than `size`.
    #[tokio::test]
    async fn read_past_eof_returns_only_existing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DataCache::new(dir.path().to_path_buf());
        let remote = FakeSftp::new(pattern(100));

        let buf = cache
            .read("/short.bin", "short.bin", &remote, 1000, 50)
            .await
            .unwrap();
        assert_eq!(buf.len(), 50);
        assert_eq!(buf, pattern(100)[50..100]);
    }

    /// A block-aligned read must never perform a zero-length extra
    /// iteration and must return exactly `size` bytes (REDESIGN FLAGS: the
    /// off-by-one in the original's inclusive upper bound).
    #[tokio::test]
    async fn block_aligned_read_returns_exactly_size_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DataCache::new(dir.path().to_path_buf());
        let remote = FakeSftp::new(pattern(BLOCK_SIZE as usize * 3));

        let buf = cache
            .read("/aligned.bin", "aligned.bin", &remote, BLOCK_SIZE, 0)
            .await
            .unwrap();
        assert_eq!(buf.len(), BLOCK_SIZE as usize);
    }

    /// Scenario 6 (prefetch pairing): a read that needs two consecutive
    /// blocks fetches both in a single remote open (burst = 2·B); a read
    /// whose requested range lands entirely in one block — because it's
    /// the last block of the range — opens just that one block (burst =
    /// B).
    #[tokio::test]
    async fn prefetch_pairs_blocks_except_on_the_final_one() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DataCache::new(dir.path().to_path_buf());
        let remote = FakeSftp::new(pattern(BLOCK_SIZE as usize * 7));

        // Spans block 0 and block 1: block 0 is not the last block this
        // read needs, so both are fetched together.
        let _ = cache
            .read("/p.bin", "p.bin", &remote, BLOCK_SIZE + 100, 0)
            .await
            .unwrap();
        assert_eq!(remote.open_call_count(), 1);
        let fetches = remote.fetches();
        assert_eq!(fetches[0], (0, 2 * BLOCK_SIZE as usize));

        // Lands entirely within the file's last block: that block is both
        // the first and the last this read needs, so only it is fetched.
        let remote2 = FakeSftp::new(pattern(BLOCK_SIZE as usize * 7));
        let _ = cache
            .read("/q.bin", "q.bin", &remote2, 100, 6 * BLOCK_SIZE)
            .await
            .unwrap();
        assert_eq!(remote2.open_call_count(), 1);
        let fetches2 = remote2.fetches();
        assert_eq!(fetches2[0], (6 * BLOCK_SIZE, BLOCK_SIZE as usize));
    }

    /// R1: writing a non-aligned range spanning two blocks and reading it
    /// back (as a whole, and as arbitrary sub-ranges) returns identical
    /// bytes.
    #[tokio::test]
    async fn write_then_read_round_trips_across_a_block_boundary() {
        // Mirrors `CacheFs::write_for`: prime the cache, mutate the remote
        // file directly, invalidate every local block unconditionally,
        // then read back. C3 has no `write` operation of its own (spec.md
        // §4.3) — the dispatcher invalidates and lets the next read
        // refetch, so this exercises that full path rather than a
        // since-removed `DataCache::write`.
        let dir = tempfile::tempdir().unwrap();
        let cache = DataCache::new(dir.path().to_path_buf());
        let original = pattern(BLOCK_SIZE as usize * 2);
        let remote = FakeSftp::new(original.clone());

        // Prime both blocks in the local cache with the original content.
        let _ = cache
            .read("/rw.bin", "rw.bin", &remote, BLOCK_SIZE * 2, 0)
            .await
            .unwrap();

        let offset = BLOCK_SIZE - 100;
        let payload = pattern(500);
        remote.write_at("rw.bin", offset, &payload).await.unwrap();
        cache.remove_stale_blocks("/rw.bin", None).await.unwrap();

        let whole = cache
            .read("/rw.bin", "rw.bin", &remote, payload.len() as u64, offset)
            .await
            .unwrap();
        assert_eq!(whole, payload);

        let sub = cache
            .read("/rw.bin", "rw.bin", &remote, 50, offset + 100)
            .await
            .unwrap();
        assert_eq!(sub, payload[100..150]);

        // The untouched portion of the touched block must come back as
        // the real remote content, not a zero-filled reconstruction of a
        // block that was deleted and never refetched there.
        let untouched = cache
            .read("/rw.bin", "rw.bin", &remote, 50, offset - 50)
            .await
            .unwrap();
        assert_eq!(untouched, original[(offset - 50) as usize..offset as usize]);
    }

    /// I2/P6: `remove_stale_blocks` with a `newer_than` cutoff only removes
    /// blocks whose ctime predates it; `None` removes everything
    /// unconditionally (the full invalidation `unlink`/`rename` need, P5).
    #[tokio::test]
    async fn remove_stale_blocks_respects_the_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DataCache::new(dir.path().to_path_buf());
        let remote = FakeSftp::new(pattern(BLOCK_SIZE as usize * 2));

        let _ = cache
            .read("/s.bin", "s.bin", &remote, BLOCK_SIZE, 0)
            .await
            .unwrap();
        let block0 = pathmap::to_block_path(dir.path(), "/s.bin", 0);
        assert!(block0.exists());

        let far_future = epoch_secs_in_future(1);
        cache
            .remove_stale_blocks("/s.bin", Some(far_future))
            .await
            .unwrap();
        assert!(
            !block0.exists(),
            "a block older than the cutoff must be removed"
        );

        let _ = cache
            .read("/s.bin", "s.bin", &remote, BLOCK_SIZE, 0)
            .await
            .unwrap();
        assert!(block0.exists());
        cache.remove_stale_blocks("/s.bin", None).await.unwrap();
        assert!(
            !block0.exists(),
            "an unconditional invalidation must remove every block regardless of age"
        );
    }

    fn epoch_secs_in_future(days: i64) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        now + days * 86_400
    }
}
