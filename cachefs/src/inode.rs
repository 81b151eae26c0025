//! `InodeTable`: bridges `fuser`'s inode-addressed callbacks to the
//! cache's path-addressed keys. The original `fusepy` bindings dispatch by
//! path directly; `fuser` is lower-level and hands every callback a `u64`
//! inode number instead, so something has to remember which virtual path
//! each inode stands for. Populated lazily on `lookup`/`create`/`mkdir`/
//! `symlink`/`readdir`, the way a passthrough FUSE filesystem must.

use std::collections::HashMap;
use std::sync::Mutex;

/// The FUSE root directory is always inode 1.
pub const ROOT_INO: u64 = 1;

struct Inner {
    path_of: HashMap<u64, String>,
    ino_of: HashMap<String, u64>,
    next_ino: u64,
}

/// No entry is ever evicted: the cache-size Non-goal (§1) applies here too,
/// and a client holding a stale `u64` across a `forget` it never sent is
/// worse than a table that only grows.
pub struct InodeTable {
    inner: Mutex<Inner>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let mut path_of = HashMap::new();
        let mut ino_of = HashMap::new();
        path_of.insert(ROOT_INO, "/".to_string());
        ino_of.insert("/".to_string(), ROOT_INO);
        Self {
            inner: Mutex::new(Inner {
                path_of,
                ino_of,
                next_ino: ROOT_INO + 1,
            }),
        }
    }

    /// The virtual path for a previously-interned inode, if any.
    pub fn path(&self, ino: u64) -> Option<String> {
        self.inner.lock().unwrap().path_of.get(&ino).cloned()
    }

    /// Returns the inode for `path`, assigning a fresh one if this is the
    /// first time the path has been seen.
    pub fn intern(&self, path: &str) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&ino) = inner.ino_of.get(path) {
            return ino;
        }
        let ino = inner.next_ino;
        inner.next_ino += 1;
        inner.path_of.insert(ino, path.to_string());
        inner.ino_of.insert(path.to_string(), ino);
        ino
    }

    /// Updates the table in place after a successful remote `rename`, so a
    /// client that already holds `from`'s inode keeps working against the
    /// renamed file instead of silently pointing at a path that no longer
    /// exists.
    pub fn rename(&self, from: &str, to: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ino) = inner.ino_of.remove(from) {
            inner.path_of.insert(ino, to.to_string());
            inner.ino_of.insert(to.to_string(), ino);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_preseeded() {
        let t = InodeTable::new();
        assert_eq!(t.path(ROOT_INO).as_deref(), Some("/"));
    }

    #[test]
    fn intern_is_stable_and_unique() {
        let t = InodeTable::new();
        let a = t.intern("/docs/a.txt");
        let b = t.intern("/docs/b.txt");
        assert_ne!(a, b);
        assert_eq!(t.intern("/docs/a.txt"), a);
        assert_eq!(t.path(a).as_deref(), Some("/docs/a.txt"));
    }

    #[test]
    fn rename_repoints_existing_inode() {
        let t = InodeTable::new();
        let ino = t.intern("/docs/a.txt");
        t.rename("/docs/a.txt", "/docs/b.txt");
        assert_eq!(t.path(ino).as_deref(), Some("/docs/b.txt"));
        assert_eq!(t.intern("/docs/b.txt"), ino);
    }
}
