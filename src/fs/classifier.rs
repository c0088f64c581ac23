use super::node::ReadonlyFile;
use crate::config::Credentials;
use crate::error::UnknownFileSystemError;
use crate::fs::backend::NodeError;

/// Capability set a concrete filesystem type answers (spec §4.1, §9 design
/// note: "Replace class-based inheritance with a capability set").
pub trait FileSystemType: Send + Sync {
    /// Does this path belong to me? Matched by case-insensitive URL prefix
    /// (`smb://`, `nfs://`) or by path shape; registration order breaks
    /// ties (spec §4.1).
    fn is_path(&self, path: &str) -> bool;

    /// Creates a node for this path.
    fn open(&self, path: &str, credentials: &Credentials) -> Result<ReadonlyFile, NodeError>;

    fn supports_acl(&self) -> bool;

    fn requires_credentials(&self) -> bool {
        false
    }
}

/// Holds an ordered list of filesystem types and dispatches `getFile` to the
/// first one that claims a path (spec §4.1). Registration order is
/// `{windows, smb, nfs, posix}` (SPEC_FULL §2): the URL-prefixed schemes are
/// checked before the catch-all local-path fallback.
pub struct PathClassifier {
    types: Vec<Box<dyn FileSystemType>>,
}

impl PathClassifier {
    #[must_use]
    pub fn new(types: Vec<Box<dyn FileSystemType>>) -> Self {
        Self { types }
    }

    /// Returns the first registered type whose `is_path` matches, and asks
    /// it to resolve the node. Fails with `UnknownFileSystemError` if no
    /// type claims the path prefix; a node that exists but is unreadable is
    /// a `RepositoryDocumentError` raised by the resolved type itself, not
    /// here.
    pub fn get_file(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<ReadonlyFile, ClassifyError> {
        for fs_type in &self.types {
            if fs_type.is_path(path) {
                return fs_type
                    .open(path, credentials)
                    .map_err(ClassifyError::Node);
            }
        }
        Err(ClassifyError::Unknown(UnknownFileSystemError {
            path: path.to_string(),
        }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Unknown(#[from] UnknownFileSystemError),
    #[error(transparent)]
    Node(#[from] NodeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{NfsFileSystem, PosixFileSystem, SmbClient, SmbFileSystem, WindowsFileSystem};
    use std::sync::Arc;

    fn classifier() -> PathClassifier {
        PathClassifier::new(vec![
            Box::new(WindowsFileSystem::new()),
            Box::new(SmbFileSystem::new(Arc::new(crate::fs::smb::testing::FakeSmbClient::default()))),
            Box::new(NfsFileSystem::new()),
            Box::new(PosixFileSystem::new()),
        ])
    }

    #[test]
    fn unregistered_prefix_is_unknown() {
        let classifier = classifier();
        let result = classifier.get_file("ftp://host/path", &Credentials::default());
        assert!(matches!(result, Err(ClassifyError::Unknown(_))));
    }

    #[test]
    fn smb_prefix_dispatches_to_smb_type() {
        let classifier = classifier();
        let node = classifier
            .get_file("smb://host/share/", &Credentials::default())
            .unwrap();
        assert_eq!(node.fs_kind, crate::fs::FsKind::Smb);
    }

    #[test]
    fn posix_path_is_catch_all() {
        let classifier = classifier();
        let node = classifier.get_file("/tmp", &Credentials::default()).unwrap();
        assert_eq!(node.fs_kind, crate::fs::FsKind::Posix);
    }
}
