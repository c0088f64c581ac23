use super::backend::{AclQuadruple, NodeBackend, NodeError, NodeStat};
use super::classifier::FileSystemType;
use super::node::ReadonlyFile;
use super::FsKind;
use crate::acl::RawAce;
use crate::config::Credentials;
use crate::error::RepositoryError;
use std::io::Read;
use std::sync::Arc;

/// The native SMB/CIFS protocol operations this connector needs. A real
/// deployment links a platform SMB client behind this trait (spec §1: "SMB
/// access" native interop is out of scope for this design); tests and the
/// demo binary use [`testing::FakeSmbClient`].
pub trait SmbClient: Send + Sync + std::fmt::Debug {
    fn stat(&self, path: &str) -> Result<NodeStat, NodeError>;
    fn list_children(&self, path: &str) -> Result<Vec<String>, NodeError>;
    fn read_content(&self, path: &str) -> Result<Box<dyn Read + Send>, NodeError>;
    /// The file's own ACL plus the three inherited/propagating sets (spec
    /// §3 "ACL quadruple"): what it inherited from its parent, and — for a
    /// directory — what it passes on to child containers and child files.
    fn read_file_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError>;
    fn read_inherited_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
        let _ = path;
        Ok(Vec::new())
    }
    fn read_container_inherit_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
        let _ = path;
        Ok(Vec::new())
    }
    fn read_file_inherit_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
        let _ = path;
        Ok(Vec::new())
    }
    fn read_share_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError>;
}

/// Remote SMB/CIFS share (spec §3, §6: requires credentials, supports
/// ACLs, access-time mutates on read).
#[derive(Debug)]
pub struct SmbFileSystem {
    client: Arc<dyn SmbClient>,
}

impl SmbFileSystem {
    #[must_use]
    pub fn new(client: Arc<dyn SmbClient>) -> Self {
        Self { client }
    }
}

impl FileSystemType for SmbFileSystem {
    fn is_path(&self, path: &str) -> bool {
        path.to_ascii_lowercase().starts_with("smb://")
    }

    fn open(&self, path: &str, credentials: &Credentials) -> Result<ReadonlyFile, NodeError> {
        if credentials.user.is_none() {
            return Err(NodeError::Transient(RepositoryError::AuthExpired {
                path: path.into(),
            }));
        }
        Ok(ReadonlyFile::new(
            Arc::new(SmbBackend {
                client: Arc::clone(&self.client),
            }),
            FsKind::Smb,
            path.to_string(),
        ))
    }

    fn supports_acl(&self) -> bool {
        true
    }

    fn requires_credentials(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct SmbBackend {
    client: Arc<dyn SmbClient>,
}

impl NodeBackend for SmbBackend {
    fn stat(&self, path: &str) -> Result<NodeStat, NodeError> {
        self.client.stat(path)
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, NodeError> {
        self.client.list_children(path)
    }

    fn read_content(&self, path: &str) -> Result<Box<dyn Read + Send>, NodeError> {
        self.client.read_content(path)
    }

    fn read_acl(&self, path: &str) -> Result<AclQuadruple, NodeError> {
        Ok(AclQuadruple {
            file_acl: self.client.read_file_acl(path)?,
            inherited_acl: self.client.read_inherited_acl(path)?,
            container_inherit_acl: self.client.read_container_inherit_acl(path)?,
            file_inherit_acl: self.client.read_file_inherit_acl(path)?,
        })
    }

    fn read_share_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
        self.client.read_share_acl(path)
    }

    fn supports_acl(&self) -> bool {
        true
    }

    fn requires_credentials(&self) -> bool {
        true
    }

    fn mutates_access_time_on_read(&self) -> bool {
        true
    }
}

/// In-memory double for [`SmbClient`], used by the crate's own tests and
/// available to downstream integration tests that want to exercise the SMB
/// path without a real share.
pub mod testing {
    use super::{NodeError, NodeStat, RawAce, SmbClient};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct FakeEntry {
        pub stat: NodeStat,
        pub content: Vec<u8>,
        pub file_acl: Vec<RawAce>,
        pub inherited_acl: Vec<RawAce>,
        pub container_inherit_acl: Vec<RawAce>,
        pub file_inherit_acl: Vec<RawAce>,
        pub share_acl: Vec<RawAce>,
    }

    /// A fake SMB share backed by an in-memory map from path to entry.
    #[derive(Debug, Default)]
    pub struct FakeSmbClient {
        entries: Mutex<HashMap<String, FakeEntry>>,
        children: Mutex<HashMap<String, Vec<String>>>,
    }

    impl FakeSmbClient {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert_dir(&self, path: &str, children: Vec<String>) {
            self.entries.lock().unwrap().insert(
                path.to_string(),
                FakeEntry {
                    stat: NodeStat {
                        exists: true,
                        is_directory: true,
                        ..NodeStat::default()
                    },
                    ..FakeEntry::default()
                },
            );
            self.children
                .lock()
                .unwrap()
                .insert(path.to_string(), children);
        }

        pub fn insert_file(&self, path: &str, entry: FakeEntry) {
            self.entries.lock().unwrap().insert(path.to_string(), entry);
        }
    }

    impl SmbClient for FakeSmbClient {
        fn stat(&self, path: &str) -> Result<NodeStat, NodeError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(path)
                .map(|e| e.stat)
                .unwrap_or_default())
        }

        fn list_children(&self, path: &str) -> Result<Vec<String>, NodeError> {
            Ok(self
                .children
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .unwrap_or_default())
        }

        fn read_content(&self, path: &str) -> Result<Box<dyn std::io::Read + Send>, NodeError> {
            let content = self
                .entries
                .lock()
                .unwrap()
                .get(path)
                .map(|e| e.content.clone())
                .unwrap_or_default();
            Ok(Box::new(Cursor::new(content)))
        }

        fn read_file_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(path)
                .map(|e| e.file_acl.clone())
                .unwrap_or_default())
        }

        fn read_inherited_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(path)
                .map(|e| e.inherited_acl.clone())
                .unwrap_or_default())
        }

        fn read_container_inherit_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(path)
                .map(|e| e.container_inherit_acl.clone())
                .unwrap_or_default())
        }

        fn read_file_inherit_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(path)
                .map(|e| e.file_inherit_acl.clone())
                .unwrap_or_default())
        }

        fn read_share_acl(&self, path: &str) -> Result<Vec<RawAce>, NodeError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(path)
                .map(|e| e.share_acl.clone())
                .unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::{FakeEntry, FakeSmbClient};

    #[test]
    fn rejects_missing_credentials() {
        let client = Arc::new(FakeSmbClient::new());
        let fs = SmbFileSystem::new(client);
        let result = fs.open("smb://host/share/", &Credentials::default());
        assert!(result.is_err());
    }

    #[test]
    fn opens_with_credentials_and_reads_fake_content() {
        let client = Arc::new(FakeSmbClient::new());
        client.insert_file(
            "smb://host/share/f.txt",
            FakeEntry {
                stat: NodeStat {
                    exists: true,
                    is_regular_file: true,
                    length: 5,
                    ..NodeStat::default()
                },
                content: b"hello".to_vec(),
                ..FakeEntry::default()
            },
        );
        let fs = SmbFileSystem::new(client);
        let creds = Credentials {
            user: Some("alice".into()),
            ..Credentials::default()
        };
        let node = fs.open("smb://host/share/f.txt", &creds).unwrap();
        assert!(node.is_regular_file().unwrap());
        let mut buf = Vec::new();
        node.read_content(false).unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }
}
