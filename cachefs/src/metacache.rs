//! Metadata cache (C4): TTL'd on-disk memoisation of `lstat`/`readdir`/
//! `readlink` results, keyed by [`pathmap::to_cache_key`]. Freshness is
//! judged by the entry file's own change-time on disk rather than a
//! timestamp recorded inside it, per spec §4.4 — so an operator can also
//! force an early refresh with a plain `touch`/`rm`.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use serde_json::{json, Value};

use crate::datacache::DataCache;
use crate::pathmap;

const GETATTR_FILE: &str = "getattr";
const READDIR_FILE: &str = "readdir";
const READLINK_FILE: &str = "readlink";

/// The six fixed keys of an `AttrRecord` (spec §3). `mode` carries the full
/// POSIX `st_mode` — permission bits *and* the `S_IFMT` type bits — since
/// the cached record is the only place a subsequent `getattr` learns
/// whether a path is a directory, a symlink, or a regular file without an
/// extra remote round-trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrFields {
    pub atime: i64,
    pub gid: u32,
    pub mode: u32,
    pub mtime: i64,
    pub size: u64,
    pub uid: u32,
}

/// A cached `getattr` result: either a full record, or the empty-mapping
/// negative marker meaning "the remote reported this path as not found"
/// (I3). Unlike the original (which left this to a stray `json.dump(d,
/// None)` that never actually wrote anything — see DESIGN.md), the negative
/// marker here is always a literal persisted `{}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrRecord {
    Negative,
    Present(AttrFields),
}

impl AttrRecord {
    fn to_json(self) -> Value {
        match self {
            AttrRecord::Negative => json!({}),
            AttrRecord::Present(f) => json!({
                "atime": f.atime,
                "gid": f.gid,
                "mode": f.mode,
                "mtime": f.mtime,
                "size": f.size,
                "uid": f.uid,
            }),
        }
    }

    fn from_json(value: &Value) -> io::Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid_data("getattr entry is not a JSON object"))?;
        if obj.is_empty() {
            return Ok(AttrRecord::Negative);
        }
        let field_i64 = |key: &str| -> io::Result<i64> {
            obj.get(key)
                .and_then(Value::as_i64)
                .ok_or_else(|| invalid_data(key))
        };
        let field_u64 = |key: &str| -> io::Result<u64> {
            obj.get(key)
                .and_then(Value::as_u64)
                .ok_or_else(|| invalid_data(key))
        };
        Ok(AttrRecord::Present(AttrFields {
            atime: field_i64("atime")?,
            gid: field_u64("gid")? as u32,
            mode: field_u64("mode")? as u32,
            mtime: field_i64("mtime")?,
            size: field_u64("size")?,
            uid: field_u64("uid")? as u32,
        }))
    }
}

fn invalid_data(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("malformed {what} in metadata entry"))
}

pub struct MetadataCache {
    metadata_dir: PathBuf,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(metadata_dir: PathBuf, ttl: Duration) -> Self {
        Self { metadata_dir, ttl }
    }

    fn entry_dir(&self, virtual_path: &str) -> PathBuf {
        self.metadata_dir.join(pathmap::to_cache_key(virtual_path))
    }

    fn entry_path(&self, virtual_path: &str, kind: &str) -> PathBuf {
        self.entry_dir(virtual_path).join(kind)
    }

    /// Reads `kind`'s entry for `virtual_path` if present and not yet
    /// expired, deleting it in place if it has aged past the TTL (the
    /// "expired entries are removed lazily on next access" lifecycle rule).
    async fn read_entry(&self, virtual_path: &str, kind: &str) -> io::Result<Option<Value>> {
        let path = self.entry_path(virtual_path, kind);
        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        if self.is_expired(&meta) {
            debug!("metadata entry {path:?} expired, discarding");
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path).await?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| invalid_data(&e.to_string()))?;
        Ok(Some(value))
    }

    fn is_expired(&self, meta: &std::fs::Metadata) -> bool {
        let ctime = file_ctime(meta);
        let age = SystemTime::now()
            .duration_since(ctime)
            .unwrap_or(Duration::ZERO);
        age > self.ttl
    }

    /// Pretty-printed, four-space-indented JSON, written atomically
    /// (temp file + rename) so a concurrent reader never observes a torn
    /// entry (§5).
    async fn write_entry(&self, virtual_path: &str, kind: &str, value: &Value) -> io::Result<()> {
        let dir = self.entry_dir(virtual_path);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(kind);
        let tmp_path = dir.join(format!("{kind}.tmp"));

        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(
            &mut buf,
            serde_json::ser::PrettyFormatter::with_indent(b"    "),
        );
        serde::Serialize::serialize(value, &mut serializer).map_err(io::Error::other)?;

        tokio::fs::write(&tmp_path, &buf).await?;
        tokio::fs::rename(&tmp_path, &path).await
    }

    // -- getattr --------------------------------------------------------

    pub async fn cached_getattr(&self, virtual_path: &str) -> io::Result<Option<AttrRecord>> {
        match self.read_entry(virtual_path, GETATTR_FILE).await? {
            Some(value) => Ok(Some(AttrRecord::from_json(&value)?)),
            None => Ok(None),
        }
    }

    /// Persists `record`, cross-invalidating the data cache per I2/I3:
    /// a negative record purges every block file for the path; a fresh
    /// positive record evicts blocks older than its `mtime`.
    pub async fn store_getattr(
        &self,
        virtual_path: &str,
        record: AttrRecord,
        data_cache: &DataCache,
    ) -> io::Result<()> {
        match record {
            AttrRecord::Negative => data_cache.remove_stale_blocks(virtual_path, None).await?,
            AttrRecord::Present(f) => {
                data_cache
                    .remove_stale_blocks(virtual_path, Some(f.mtime))
                    .await?
            }
        }
        self.write_entry(virtual_path, GETATTR_FILE, &record.to_json()).await
    }

    // -- readdir ----------------------------------------------------------

    pub async fn cached_readdir(&self, virtual_path: &str) -> io::Result<Option<Vec<String>>> {
        match self.read_entry(virtual_path, READDIR_FILE).await? {
            Some(Value::Array(items)) => Ok(Some(
                items
                    .into_iter()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect(),
            )),
            Some(_) => Err(invalid_data("readdir entry")),
            None => Ok(None),
        }
    }

    pub async fn store_readdir(&self, virtual_path: &str, listing: &[String]) -> io::Result<()> {
        self.write_entry(virtual_path, READDIR_FILE, &json!(listing)).await
    }

    // -- readlink -----------------------------------------------------------

    pub async fn cached_readlink(&self, virtual_path: &str) -> io::Result<Option<String>> {
        match self.read_entry(virtual_path, READLINK_FILE).await? {
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(invalid_data("readlink entry")),
            None => Ok(None),
        }
    }

    pub async fn store_readlink(&self, virtual_path: &str, target: &str) -> io::Result<()> {
        self.write_entry(virtual_path, READLINK_FILE, &json!(target)).await
    }

    // -- invalidation -----------------------------------------------------

    /// Removes every cached entry for `virtual_path`. Skipped while
    /// offline (I6) so a stale-but-present answer stays servable until the
    /// TTL lapses and a live session can refresh it.
    pub async fn delete_metadata(&self, virtual_path: &str, online: bool) -> io::Result<()> {
        if !online {
            debug!("offline: skipping metadata invalidation for {virtual_path}");
            return Ok(());
        }
        let dir = self.entry_dir(virtual_path);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("failed to remove metadata entry {dir:?}: {e}");
                Err(e)
            }
        }
    }

    /// Invalidates the parent directory's `readdir` entry (I4): creating or
    /// removing a name under a directory must not leave a stale listing
    /// behind.
    pub async fn delete_parent_metadata(&self, virtual_path: &str, online: bool) -> io::Result<()> {
        let (parent, _name) = pathmap::split_parent(virtual_path);
        self.delete_metadata(&parent, online).await
    }
}

fn file_ctime(meta: &std::fs::Metadata) -> SystemTime {
    use std::os::unix::fs::MetadataExt;
    let secs = meta.ctime();
    let nanos = meta.ctime_nsec();
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos as u32)
    } else {
        UNIX_EPOCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn negative_record_round_trips_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path().to_path_buf(), Duration::from_secs(300));
        let data = DataCache::new(dir.path().join("data"));

        cache
            .store_getattr("/missing", AttrRecord::Negative, &data)
            .await
            .unwrap();
        let raw = tokio::fs::read_to_string(dir.path().join("%missing").join(GETATTR_FILE))
            .await
            .unwrap();
        assert_eq!(raw.trim(), "{}");

        let cached = cache.cached_getattr("/missing").await.unwrap();
        assert_eq!(cached, Some(AttrRecord::Negative));
    }

    #[tokio::test]
    async fn present_record_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path().to_path_buf(), Duration::from_secs(300));
        let data = DataCache::new(dir.path().join("data"));

        let fields = AttrFields {
            atime: 1,
            gid: 2,
            mode: 0o100644,
            mtime: 3,
            size: 4096,
            uid: 5,
        };
        cache
            .store_getattr("/a.txt", AttrRecord::Present(fields), &data)
            .await
            .unwrap();
        let cached = cache.cached_getattr("/a.txt").await.unwrap();
        assert_eq!(cached, Some(AttrRecord::Present(fields)));
    }

    #[tokio::test]
    async fn expired_entry_is_discarded_on_access() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path().to_path_buf(), Duration::from_millis(1));
        let data = DataCache::new(dir.path().join("data"));

        cache
            .store_readdir("/d", &[".".into(), "..".into(), "a".into()])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let cached = cache.cached_readdir("/d").await.unwrap();
        assert_eq!(cached, None);
        let _ = data.statvfs("/d");
    }

    #[tokio::test]
    async fn delete_metadata_is_noop_offline() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::new(dir.path().to_path_buf(), Duration::from_secs(300));
        cache
            .store_readdir("/d", &[".".into(), "..".into(), "a".into()])
            .await
            .unwrap();
        cache.delete_metadata("/d", false).await.unwrap();
        assert_eq!(
            cache.cached_readdir("/d").await.unwrap(),
            Some(vec![".".into(), "..".into(), "a".into()])
        );
        cache.delete_metadata("/d", true).await.unwrap();
        assert_eq!(cache.cached_readdir("/d").await.unwrap(), None);
    }
}
