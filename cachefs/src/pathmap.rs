//! Translates between the three path spaces cachefs juggles: the path FUSE
//! hands us (always absolute, rooted at the mountpoint), the path the SFTP
//! capability expects (rooted at the configured remote directory), and the
//! on-disk cache key derived from it.

use std::path::{Path, PathBuf};

/// Joins the configured remote base directory with a FUSE-visible path to
/// produce the path passed to [`cachefs_ssh::SftpCapability`]. A base of
/// `"."` (the default when no `--remotedir` is given: the remote home
/// directory, wherever the SFTP session's server-side cwd lands) is treated
/// as an empty prefix rather than literally prepended, so paths stay
/// relative instead of growing a useless `./` on every lookup.
pub fn to_remote(remote_dir: &str, virtual_path: &str) -> String {
    let trimmed = virtual_path.trim_start_matches('/');
    let base = remote_dir.trim_end_matches('/');
    let base = if base == "." { "" } else { base };
    if trimmed.is_empty() {
        if base.is_empty() {
            ".".to_string()
        } else {
            base.to_string()
        }
    } else if base.is_empty() {
        trimmed.to_string()
    } else {
        format!("{base}/{trimmed}")
    }
}

/// Appends a FUSE entry name to its parent's virtual path, producing the
/// child's virtual path the way `fuser`'s inode-addressed callbacks need it
/// joined back together (`lookup`, `create`, `mkdir`, ... all hand us
/// `(parent_ino, name)` rather than a full path).
pub fn join(parent: &str, name: &std::ffi::OsStr) -> String {
    let name = name.to_string_lossy();
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Derives a filesystem-safe cache-key directory name from a virtual path,
/// replacing path separators with `%` the way the original tool's metadata
/// store does, so nested paths don't require creating nested directories.
pub fn to_cache_key(virtual_path: &str) -> String {
    let trimmed = virtual_path.trim_start_matches('/');
    if trimmed.is_empty() {
        "%".to_string()
    } else {
        trimmed.replace(['/', '\\'], "%")
    }
}

/// Builds the on-disk path for block `block_num` of `virtual_path` under
/// `data_dir`.
pub fn to_block_path(data_dir: &Path, virtual_path: &str, block_num: u64) -> PathBuf {
    let trimmed = virtual_path.trim_start_matches('/');
    let mut path = data_dir.join(trimmed);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.set_file_name(format!("{file_name}-block{block_num}"));
    path
}

/// Splits a virtual path into `(parent, file_name)`, matching Python's
/// `os.path.split` semantics used by the original for parent invalidation:
/// the root's parent is itself.
pub fn split_parent(virtual_path: &str) -> (String, String) {
    let trimmed = virtual_path.trim_end_matches('/');
    if trimmed.is_empty() {
        return ("/".to_string(), String::new());
    }
    match trimmed.rfind('/') {
        Some(0) => ("/".to_string(), trimmed[1..].to_string()),
        Some(idx) => (trimmed[..idx].to_string(), trimmed[idx + 1..].to_string()),
        None => ("/".to_string(), trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_path_joins_base_and_virtual() {
        assert_eq!(to_remote("/home/alice", "/docs/a.txt"), "/home/alice/docs/a.txt");
        assert_eq!(to_remote("/home/alice", "/"), "/home/alice");
    }

    #[test]
    fn remote_path_with_dot_base_stays_relative() {
        assert_eq!(to_remote(".", "/docs/a.txt"), "docs/a.txt");
        assert_eq!(to_remote(".", "/"), ".");
    }

    #[test]
    fn join_appends_name_to_parent() {
        assert_eq!(join("/", std::ffi::OsStr::new("a.txt")), "/a.txt");
        assert_eq!(join("/docs", std::ffi::OsStr::new("a.txt")), "/docs/a.txt");
    }

    #[test]
    fn cache_key_flattens_separators() {
        assert_eq!(to_cache_key("/docs/a.txt"), "docs%a.txt");
        assert_eq!(to_cache_key("/"), "%");
    }

    #[test]
    fn block_path_suffixes_file_name() {
        let p = to_block_path(Path::new("/cache/data"), "/docs/a.txt", 3);
        assert_eq!(p, Path::new("/cache/data/docs/a.txt-block3"));
    }

    #[test]
    fn split_parent_matches_os_path_split() {
        assert_eq!(split_parent("/docs/a.txt"), ("/docs".to_string(), "a.txt".to_string()));
        assert_eq!(split_parent("/a.txt"), ("/".to_string(), "a.txt".to_string()));
        assert_eq!(split_parent("/"), ("/".to_string(), String::new()));
    }
}
