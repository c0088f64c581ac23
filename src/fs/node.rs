use super::backend::{AclQuadruple, NodeBackend, NodeError, NodeStat};
use super::FsKind;
use std::io::Read;
use std::sync::Arc;
use tracing::warn;

/// A readonly view over a path in some filesystem (spec §3, C2). Nodes are
/// immutable value objects; traversal synthesizes child nodes from parent +
/// name rather than mutating one in place.
#[derive(Clone)]
pub struct ReadonlyFile {
    backend: Arc<dyn NodeBackend>,
    pub fs_kind: FsKind,
    pub path: String,
    pub name: String,
    pub parent: Option<String>,
}

impl std::fmt::Debug for ReadonlyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadonlyFile")
            .field("fs_kind", &self.fs_kind)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ReadonlyFile {
    #[must_use]
    pub fn new(backend: Arc<dyn NodeBackend>, fs_kind: FsKind, path: String) -> Self {
        let separator = fs_kind.separator();
        let trimmed = path.trim_end_matches(separator);
        let name = trimmed
            .rsplit(separator)
            .next()
            .unwrap_or(trimmed)
            .to_string();
        let parent = trimmed.rsplit_once(separator).map(|(head, _)| {
            if head.is_empty() {
                separator.to_string()
            } else {
                head.to_string()
            }
        });
        Self {
            backend,
            fs_kind,
            path,
            name,
            parent,
        }
    }

    /// Synthesizes a child node from this directory plus a name.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let sep = self.fs_kind.separator();
        let base = self.path.trim_end_matches(sep);
        let path = format!("{base}{sep}{name}");
        Self::new(Arc::clone(&self.backend), self.fs_kind, path)
    }

    fn stat(&self) -> Result<NodeStat, NodeError> {
        self.backend.stat(&self.path)
    }

    pub fn exists(&self) -> Result<bool, NodeError> {
        Ok(self.stat()?.exists)
    }

    pub fn is_directory(&self) -> Result<bool, NodeError> {
        Ok(self.stat()?.is_directory)
    }

    pub fn is_regular_file(&self) -> Result<bool, NodeError> {
        Ok(self.stat()?.is_regular_file)
    }

    pub fn can_read(&self) -> Result<bool, NodeError> {
        Ok(self.stat()?.can_read)
    }

    pub fn is_hidden(&self) -> Result<bool, NodeError> {
        Ok(self.stat()?.is_hidden)
    }

    pub fn last_modified_millis(&self) -> Result<i64, NodeError> {
        Ok(self.stat()?.last_modified_millis)
    }

    /// The last-modified timestamp as a UTC `DateTime`, for display and log
    /// lines where raw epoch millis aren't useful to a human reader. Falls
    /// back to the Unix epoch if the underlying millis can't be represented
    /// (e.g. a filesystem reporting a bogus pre-epoch value).
    pub fn modified_time(&self) -> Result<chrono::DateTime<chrono::Utc>, NodeError> {
        let millis = self.last_modified_millis()?;
        Ok(chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }

    pub fn length(&self) -> Result<u64, NodeError> {
        Ok(self.stat()?.length)
    }

    /// Display URL for this node (spec §3). For local filesystems this is
    /// the path itself; SMB/NFS types could map to a share URL, but since
    /// `path` already carries the `smb://`/`nfs://` prefix this is uniform.
    #[must_use]
    pub fn display_url(&self) -> String {
        self.path.clone()
    }

    /// Returns children in the order depth-first traversal must visit them:
    /// lexicographic comparison of each child's full path, with directory
    /// names treated as if suffixed by the path separator (spec §4.2). This
    /// is what keeps `foo` (a directory) sorted before `foo.bar` (a file).
    pub fn list_files(&self) -> Result<Vec<Self>, NodeError> {
        let child_paths = self.backend.list_children(&self.path)?;
        let mut children: Vec<Self> = child_paths
            .into_iter()
            .map(|path| Self::new(Arc::clone(&self.backend), self.fs_kind, path))
            .collect();

        let sep = self.fs_kind.separator();
        children.sort_by(|a, b| {
            let a_is_dir = a.is_directory().unwrap_or(false);
            let b_is_dir = b.is_directory().unwrap_or(false);
            let a_key = sort_key(&a.path, a_is_dir, sep);
            let b_key = sort_key(&b.path, b_is_dir, sep);
            a_key.cmp(&b_key)
        });

        Ok(children)
    }

    /// Opens a content byte stream, transparently preserving the
    /// last-accessed timestamp when `preserve_access_time` is set and this
    /// filesystem mutates atime on read (spec §4.2).
    pub fn read_content(
        &self,
        preserve_access_time: bool,
    ) -> Result<Box<dyn Read + Send>, NodeError> {
        if preserve_access_time && self.backend.mutates_access_time_on_read() {
            let saved_atime = self.backend.read_access_time(&self.path)?;
            let inner = self.backend.read_content(&self.path)?;
            return Ok(Box::new(AccessTimePreservingReader {
                inner,
                backend: Arc::clone(&self.backend),
                path: self.path.clone(),
                saved_atime,
                restored: false,
            }));
        }
        self.backend.read_content(&self.path)
    }

    pub fn read_acl(&self) -> Result<AclQuadruple, NodeError> {
        self.backend.read_acl(&self.path)
    }

    pub fn read_share_acl(&self) -> Result<Vec<crate::acl::RawAce>, NodeError> {
        self.backend.read_share_acl(&self.path)
    }

    #[must_use]
    pub fn supports_acl(&self) -> bool {
        self.backend.supports_acl()
    }
}

/// Adjusted sort key implementing spec §4.2's directory-as-if-suffixed rule
/// without needing to allocate a new string per comparison on the hot path
/// unless the entry is actually a directory.
fn sort_key(path: &str, is_dir: bool, sep: char) -> String {
    if is_dir && !path.ends_with(sep) {
        let mut key = path.to_string();
        key.push(sep);
        key
    } else {
        path.to_string()
    }
}

/// Scoped access-time preservation (spec §4.2, §9 design note): records the
/// pre-read timestamp and restores it on stream close. Restoration failures
/// are logged at warning and never fatal.
pub struct AccessTimePreservingReader {
    inner: Box<dyn Read + Send>,
    backend: Arc<dyn NodeBackend>,
    path: String,
    saved_atime: i64,
    restored: bool,
}

impl Read for AccessTimePreservingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for AccessTimePreservingReader {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        if let Err(error) = self.backend.set_access_time(&self.path, self.saved_atime) {
            warn!(path = %self.path, %error, "failed to restore last-access time after content read");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_suffixes_directories() {
        assert_eq!(sort_key("/root/foo", true, '/'), "/root/foo/");
        assert_eq!(sort_key("/root/foo.bar", false, '/'), "/root/foo.bar");
    }

    #[test]
    fn sort_key_orders_dir_before_dotted_sibling() {
        let foo_dir = sort_key("/root/foo", true, '/');
        let foo_bar = sort_key("/root/foo.bar", false, '/');
        let abc = sort_key("/root/abc", false, '/');
        let mut keys = vec![foo_bar.clone(), foo_dir.clone(), abc.clone()];
        keys.sort();
        assert_eq!(keys, vec![abc, foo_dir, foo_bar]);
    }

    #[test]
    fn child_path_join_uses_fs_separator() {
        use super::super::posix::PosixFileSystem;
        use super::super::FileSystemType;
        let fs = PosixFileSystem::new();
        let root = fs.open("/tmp", &Default::default()).unwrap();
        let child = root.child("a.txt");
        assert_eq!(child.path, "/tmp/a.txt");
        assert_eq!(child.name, "a.txt");
    }

    #[test]
    fn modified_time_renders_a_real_file_in_the_current_year() {
        use super::super::posix::PosixFileSystem;
        use super::super::FileSystemType;
        let dir = std::env::temp_dir().join("fscrawl_node_modified_time_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"x").unwrap();

        let fs = PosixFileSystem::new();
        let root = fs.open(dir.to_str().unwrap(), &Default::default()).unwrap();
        let file = root.child("a.txt");

        let modified = file.modified_time().unwrap();
        assert!(modified.timestamp() > 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
