use crate::acl::RawAce;
use crate::error::{RepositoryDocumentError, RepositoryError};
use std::io::Read;

/// Either tier of the §7 error taxonomy that a backend operation can raise.
/// `DirectoryListing` and `UnknownFileSystem` are raised above this layer
/// (by the iterator and classifier respectively), not by the backend.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Document(#[from] RepositoryDocumentError),
    #[error(transparent)]
    Transient(#[from] RepositoryError),
}

impl From<NodeError> for crate::error::CrawlError {
    fn from(error: NodeError) -> Self {
        match error {
            NodeError::Document(error) => Self::Document(error),
            NodeError::Transient(error) => Self::Repository(error),
        }
    }
}

/// The metadata half of a readonly-file node (spec §3).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeStat {
    pub exists: bool,
    pub is_directory: bool,
    pub is_regular_file: bool,
    pub can_read: bool,
    pub is_hidden: bool,
    pub last_modified_millis: i64,
    pub length: u64,
}

/// File ACL, inherited ACL, container-inherit ACL, file-inherit ACL (spec
/// §3 "ACL quadruple"). Empty vectors for filesystems without ACL support.
#[derive(Clone, Debug, Default)]
pub struct AclQuadruple {
    pub file_acl: Vec<RawAce>,
    pub inherited_acl: Vec<RawAce>,
    pub container_inherit_acl: Vec<RawAce>,
    pub file_inherit_acl: Vec<RawAce>,
}

/// The per-filesystem-type operations `ReadonlyFile` delegates to. This is
/// the "small shared utility invoked by each variant's methods" called for
/// in spec §9, replacing class-based inheritance with one implementation
/// per named type plus a uniform caller.
pub trait NodeBackend: Send + Sync + std::fmt::Debug {
    /// Stats a path. Must not fail for a path that simply doesn't exist —
    /// that's `NodeStat { exists: false, .. }`, not an error; errors are
    /// reserved for I/O failure (permission, transient network).
    fn stat(&self, path: &str) -> Result<NodeStat, NodeError>;

    /// Absolute child paths of a directory, in arbitrary order — ordering
    /// is imposed by the caller (spec §4.2).
    fn list_children(&self, path: &str) -> Result<Vec<String>, NodeError>;

    /// Opens a content byte stream. `DirEntryIOError` from reads propagates
    /// as-is per spec §4.2's error taxonomy note.
    fn read_content(&self, path: &str) -> Result<Box<dyn Read + Send>, NodeError>;

    /// Reads the ACL quadruple. Filesystems without ACL support return
    /// `Ok(AclQuadruple::default())`.
    fn read_acl(&self, path: &str) -> Result<AclQuadruple, NodeError>;

    /// Reads the share-level ACL (SMB only; empty elsewhere).
    fn read_share_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
        let _ = path;
        Ok(Vec::new())
    }

    /// Whether this backend can answer `read_acl`/`read_share_acl` at all.
    fn supports_acl(&self) -> bool;

    /// Whether connecting requires `Credentials` (SMB).
    fn requires_credentials(&self) -> bool {
        false
    }

    /// Whether merely reading a file's bytes mutates its last-accessed
    /// timestamp on this filesystem (Windows, SMB — spec §4.2).
    fn mutates_access_time_on_read(&self) -> bool {
        false
    }

    /// Reads the current last-accessed-time, in millis since epoch, for the
    /// access-time preservation contract (spec §4.2, §9). Only meaningful
    /// when `mutates_access_time_on_read` is true.
    fn read_access_time(&self, path: &str) -> Result<i64, NodeError> {
        let _ = path;
        Ok(0)
    }

    /// Restores a previously recorded last-accessed-time. Failures here are
    /// logged at warning and never fatal (spec §4.2).
    fn set_access_time(&self, path: &str, millis: i64) -> Result<(), NodeError> {
        let _ = (path, millis);
        Ok(())
    }
}
