use super::backend::{AclQuadruple, NodeBackend, NodeError, NodeStat};
use super::classifier::FileSystemType;
use super::node::ReadonlyFile;
use super::posix::is_windows_path;
use super::FsKind;
use crate::config::Credentials;
use crate::error::{RepositoryDocumentError, RepositoryError};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Local Windows filesystem (spec §3, §6: case-insensitive path equality,
/// supports ACLs). Real Windows ACL/timestamp interop is an external
/// collaborator (spec §1); this backend reads what `std::fs` exposes on
/// any platform and leaves the native ACL read as an injectable seam for
/// the platform-specific crate a real deployment would link in.
#[derive(Debug, Default)]
pub struct WindowsFileSystem;

impl WindowsFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileSystemType for WindowsFileSystem {
    fn is_path(&self, path: &str) -> bool {
        is_windows_path(path)
    }

    fn open(&self, path: &str, _credentials: &Credentials) -> Result<ReadonlyFile, NodeError> {
        Ok(ReadonlyFile::new(
            Arc::new(WindowsBackend),
            FsKind::Windows,
            path.to_string(),
        ))
    }

    fn supports_acl(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct WindowsBackend;

impl NodeBackend for WindowsBackend {
    fn stat(&self, path: &str) -> Result<NodeStat, NodeError> {
        let p = Path::new(path);
        match fs::metadata(p) {
            Ok(metadata) => {
                let last_modified_millis = metadata
                    .modified()
                    .ok()
                    .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
                    .map_or(0, |d| d.as_millis() as i64);
                Ok(NodeStat {
                    exists: true,
                    is_directory: metadata.is_dir(),
                    is_regular_file: metadata.is_file(),
                    can_read: !metadata.permissions().readonly() || metadata.is_file(),
                    is_hidden: p
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with('.')),
                    last_modified_millis,
                    length: metadata.len(),
                })
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(NodeStat::default()),
            Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(NodeError::Document(RepositoryDocumentError::AccessDenied {
                    path: PathBuf::from(path),
                }))
            }
            Err(error) => Err(NodeError::Transient(RepositoryError::Io {
                path: PathBuf::from(path),
                source: error,
            })),
        }
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, NodeError> {
        let entries = fs::read_dir(path).map_err(|error| NodeError::Transient(RepositoryError::Io {
            path: PathBuf::from(path),
            source: error,
        }))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| NodeError::Transient(RepositoryError::Io {
                path: PathBuf::from(path),
                source: error,
            }))?;
            if let Some(name) = entry.file_name().to_str() {
                children.push(format!(r"{}\{name}", path.trim_end_matches('\\')));
            }
        }
        Ok(children)
    }

    fn read_content(&self, path: &str) -> Result<Box<dyn Read + Send>, NodeError> {
        let file = fs::File::open(path).map_err(|error| NodeError::Transient(RepositoryError::Io {
            path: PathBuf::from(path),
            source: error,
        }))?;
        Ok(Box::new(file))
    }

    /// Real Windows DACL resolution is native-interop territory (spec §1);
    /// this returns an empty, determinate ACL so the document factory
    /// treats the file as having no file-level entries rather than
    /// blocking on an unimplemented syscall.
    fn read_acl(&self, _path: &str) -> Result<AclQuadruple, NodeError> {
        Ok(AclQuadruple::default())
    }

    fn supports_acl(&self) -> bool {
        true
    }

    fn mutates_access_time_on_read(&self) -> bool {
        true
    }

    fn read_access_time(&self, path: &str) -> Result<i64, NodeError> {
        let metadata = fs::metadata(path).map_err(|error| NodeError::Transient(RepositoryError::Io {
            path: PathBuf::from(path),
            source: error,
        }))?;
        Ok(metadata
            .accessed()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_millis() as i64))
    }

    // Restoring atime needs a native SetFileTime call; left as a no-op seam
    // here (logged by the caller on failure, never fatal — spec §4.2).
}
