use super::backend::{AclQuadruple, NodeBackend, NodeError, NodeStat};
use super::classifier::FileSystemType;
use super::node::ReadonlyFile;
use super::posix::PosixBackend;
use super::FsKind;
use crate::config::Credentials;
use std::io::Read;
use std::sync::Arc;

/// Mounted NFS filesystem. Spec §9 open question: the original source
/// carries two parallel code paths for NFS (a direct NFS URL type and a
/// NetApp-mounted-as-local type); this collapses both into one `nfs://`
/// type whose backend treats the path after the authority as an already
/// locally-mounted path, delegating to the same `std::fs` calls the POSIX
/// backend uses. Whether a NetApp mount must survive process restarts is
/// left for the mount-manager collaborator this design doesn't implement.
#[derive(Debug, Default)]
pub struct NfsFileSystem;

impl NfsFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileSystemType for NfsFileSystem {
    fn is_path(&self, path: &str) -> bool {
        path.starts_with("nfs://")
    }

    fn open(&self, path: &str, _credentials: &Credentials) -> Result<ReadonlyFile, NodeError> {
        Ok(ReadonlyFile::new(
            Arc::new(NfsBackend),
            FsKind::Nfs,
            path.to_string(),
        ))
    }

    fn supports_acl(&self) -> bool {
        false
    }
}

/// Strips the `nfs://host` authority, leaving the locally-mounted path.
fn mount_path(path: &str) -> String {
    let rest = path.strip_prefix("nfs://").unwrap_or(path);
    match rest.find('/') {
        Some(index) => rest[index..].to_string(),
        None => "/".to_string(),
    }
}

#[derive(Debug)]
struct NfsBackend;

impl NodeBackend for NfsBackend {
    fn stat(&self, path: &str) -> Result<NodeStat, NodeError> {
        PosixBackend.stat(&mount_path(path))
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, NodeError> {
        let mounted = mount_path(path);
        let authority = &path[..path.len() - mounted.len()];
        let children = PosixBackend.list_children(&mounted)?;
        Ok(children
            .into_iter()
            .map(|child| format!("{authority}{child}"))
            .collect())
    }

    fn read_content(&self, path: &str) -> Result<Box<dyn Read + Send>, NodeError> {
        PosixBackend.read_content(&mount_path(path))
    }

    fn read_acl(&self, _path: &str) -> Result<AclQuadruple, NodeError> {
        Ok(AclQuadruple::default())
    }

    fn supports_acl(&self) -> bool {
        false
    }
}
