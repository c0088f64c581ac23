use super::backend::{AclQuadruple, NodeBackend, NodeError, NodeStat};
use super::classifier::FileSystemType;
use super::node::ReadonlyFile;
use super::FsKind;
use crate::config::Credentials;
use crate::error::{RepositoryDocumentError, RepositoryError};
use std::fs;
use std::io::Read;
use std::os::unix::fs::MetadataExt as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Local POSIX filesystem (spec §3, §6: case-sensitive path equality, no
/// ACL support — POSIX permission bits aren't modeled as an ACL by this
/// connector).
#[derive(Debug, Default)]
pub struct PosixFileSystem;

impl PosixFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileSystemType for PosixFileSystem {
    fn is_path(&self, path: &str) -> bool {
        // Catch-all for plain local paths, but not for an arbitrary
        // "scheme://" URL some other (unregistered) type should have
        // claimed — otherwise no path could ever resolve to `Unknown`.
        !path.contains("://") && !is_windows_path(path)
    }

    fn open(&self, path: &str, _credentials: &Credentials) -> Result<ReadonlyFile, NodeError> {
        Ok(ReadonlyFile::new(
            Arc::new(PosixBackend),
            FsKind::Posix,
            path.to_string(),
        ))
    }

    fn supports_acl(&self) -> bool {
        false
    }
}

pub(crate) fn is_windows_path(path: &str) -> bool {
    path.starts_with(r"\\")
        || path
            .as_bytes()
            .get(1)
            .is_some_and(|&b| b == b':' && path.as_bytes().first().is_some_and(u8::is_ascii_alphabetic))
}

#[derive(Debug)]
pub(crate) struct PosixBackend;

impl PosixBackend {
    fn metadata_to_stat(path: &Path, metadata: &fs::Metadata) -> NodeStat {
        let last_modified_millis = metadata
            .modified()
            .ok()
            .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_millis() as i64);
        NodeStat {
            exists: true,
            is_directory: metadata.is_dir(),
            is_regular_file: metadata.is_file(),
            can_read: readable(metadata),
            is_hidden: path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.')),
            last_modified_millis,
            length: metadata.len(),
        }
    }
}

fn readable(metadata: &fs::Metadata) -> bool {
    // Best-effort: world/owner readable bit. A real permission check needs
    // the caller's uid/gid, which this connector resolves externally.
    metadata.mode() & 0o444 != 0
}

impl NodeBackend for PosixBackend {
    fn stat(&self, path: &str) -> Result<NodeStat, NodeError> {
        let p = Path::new(path);
        match fs::symlink_metadata(p).and_then(|sym| {
            if sym.file_type().is_symlink() {
                fs::metadata(p)
            } else {
                Ok(sym)
            }
        }) {
            Ok(metadata) => Ok(Self::metadata_to_stat(p, &metadata)),
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
        let entries = fs::read_dir(path).map_err(|error| classify_list_error(path, error))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| classify_list_error(path, error))?;
            if let Some(name) = entry.file_name().to_str() {
                children.push(format!("{}/{name}", path.trim_end_matches('/')));
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

    fn read_acl(&self, _path: &str) -> Result<AclQuadruple, NodeError> {
        Ok(AclQuadruple::default())
    }

    fn supports_acl(&self) -> bool {
        false
    }
}

fn classify_list_error(path: &str, error: std::io::Error) -> NodeError {
    match error.kind() {
        std::io::ErrorKind::PermissionDenied => {
            NodeError::Document(RepositoryDocumentError::AccessDenied {
                path: PathBuf::from(path),
            })
        }
        std::io::ErrorKind::NotFound => NodeError::Document(RepositoryDocumentError::NotFound {
            path: PathBuf::from(path),
        }),
        _ => NodeError::Transient(RepositoryError::Io {
            path: PathBuf::from(path),
            source: error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_local_paths_not_smb_or_nfs() {
        let fs = PosixFileSystem::new();
        assert!(fs.is_path("/etc/passwd"));
        assert!(!fs.is_path("smb://host/share/"));
        assert!(!fs.is_path("nfs://host/path"));
    }

    #[test]
    fn detects_windows_drive_and_unc_paths() {
        assert!(is_windows_path(r"C:\Users\bob"));
        assert!(is_windows_path(r"\\host\share\path"));
        assert!(!is_windows_path("/tmp"));
    }

    #[test]
    fn stat_reports_missing_file_as_not_error() {
        let backend = PosixBackend;
        let stat = backend.stat("/does/not/exist/at/all").unwrap();
        assert!(!stat.exists);
    }

    #[test]
    fn lists_and_stats_a_real_directory() {
        let dir = std::env::temp_dir().join("fscrawl_posix_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), b"hello").unwrap();

        let backend = PosixBackend;
        let children = backend.list_children(dir.to_str().unwrap()).unwrap();
        assert_eq!(children.len(), 1);
        let stat = backend.stat(&children[0]).unwrap();
        assert!(stat.exists);
        assert!(stat.is_regular_file);
        assert_eq!(stat.length, 5);

        fs::remove_dir_all(&dir).unwrap();
    }
}
