//! Document factory (spec §4.6, C6): turns a visited file node plus root
//! context into the 1–3 documents the sink receives.
use crate::acl::{Acl, AclBuilder, InheritFrom, InheritanceType};
use crate::config::FileSystemConfig;
use crate::error::CrawlError;
use crate::fs::{FsKind, NodeError, ReadonlyFile};
use std::io::Read;
use tracing::warn;

/// A unit of work for the sink: either file content or a synthetic ACL
/// record (spec §3 "Document").
pub enum Document {
    Content(ContentDocument),
    Acl(AclDocument),
}

impl Document {
    #[must_use]
    pub fn docid(&self) -> &str {
        match self {
            Self::Content(doc) => &doc.docid,
            Self::Acl(doc) => &doc.docid,
        }
    }
}

/// One regular file (spec §3 "Content document"). `mime_type`/`content` are
/// populated lazily: the sink may never call them, e.g. when
/// `ifModifiedSince` already told it the document is unchanged.
pub struct ContentDocument {
    pub docid: String,
    pub display_url: String,
    pub last_modified_millis: i64,
    pub content_length: u64,
    pub is_public: bool,
    pub acl: Option<Acl>,
    pub acl_inherit_from: InheritFrom,
    node: ReadonlyFile,
    preserve_access_time: bool,
}

impl ContentDocument {
    #[must_use]
    pub const fn feed_type(&self) -> &'static str {
        "contenturl"
    }

    /// Sniffs a MIME type from the path. Real MIME detection is an external
    /// collaborator (spec §1); this is the fallback a deployment without
    /// one still needs.
    #[must_use]
    pub fn mime_type(&self) -> String {
        guess_mime_type(&self.docid)
    }

    /// Opens the file's content stream, preserving access time per the
    /// filesystem's mutation behavior and the configured reset flags.
    pub fn content(&self) -> Result<Box<dyn Read + Send>, NodeError> {
        self.node.read_content(self.preserve_access_time)
    }
}

/// Which of the three synthetic ACL document sub-kinds this is (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AclDocumentKind {
    Share,
    ContainerInherit,
    FileInherit,
}

/// A synthetic ACL document: `shareAcl:<root>`, `foldersAcl:<dir>`, or
/// `filesAcl:<dir>` (spec §3, §6 "Docid format").
pub struct AclDocument {
    pub docid: String,
    pub kind: AclDocumentKind,
    pub acl: Acl,
    pub inherit_from: InheritFrom,
    pub inheritance_type: InheritanceType,
}

fn guess_mime_type(path: &str) -> String {
    let extension = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match extension.as_str() {
        "txt" | "log" | "csv" => "text/plain",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// The docid a node's parent-inheritance pointer should resolve to. `.parent`
/// is computed from the path string with trailing separators trimmed, which
/// for a node one level below the root can disagree textually with
/// `root.path` when the root itself was given with a trailing separator
/// (e.g. `smb://host/share/`). Compares both sides with trailing separators
/// trimmed and falls back to `root.path` verbatim on a match, so the
/// resulting docid always matches what [`DocumentFactory::share_acl_document`]
/// and the root's own inheritance documents actually emit.
fn parent_docid_path(node: &ReadonlyFile, root: &ReadonlyFile) -> String {
    let separator = node.fs_kind.separator();
    match &node.parent {
        Some(parent) if parent.trim_end_matches(separator) == root.path.trim_end_matches(separator) => {
            root.path.clone()
        }
        Some(parent) => parent.clone(),
        None => root.path.clone(),
    }
}

/// Consults the ACL model and the configured ACL mode to produce documents
/// for a visited node (spec §4.6).
pub struct DocumentFactory {
    push_acls: bool,
    mark_all_documents_public: bool,
    use_authz_on_acl_error: bool,
    last_access_reset_flag_for_smb: bool,
    last_access_reset_flag_for_local_windows: bool,
    acl_builder: AclBuilder,
}

impl DocumentFactory {
    #[must_use]
    pub fn new(config: &FileSystemConfig) -> Self {
        Self {
            push_acls: config.push_acls,
            mark_all_documents_public: config.mark_all_documents_public,
            use_authz_on_acl_error: config.use_authz_on_acl_error,
            last_access_reset_flag_for_smb: config.last_access_reset_flag_for_smb,
            last_access_reset_flag_for_local_windows: config.last_access_reset_flag_for_local_windows,
            acl_builder: AclBuilder::new(config),
        }
    }

    /// Directories emit their two inheritance ACL documents when push-ACLs
    /// is on; everything else emits one content document (spec §4.6).
    pub fn get_documents(
        &self,
        file: &ReadonlyFile,
        root: &ReadonlyFile,
    ) -> Result<Vec<Document>, CrawlError> {
        if file.is_directory()? && self.push_acls {
            return self.acl_documents_for_directory(file, root);
        }
        Ok(vec![self.content_document(file, root)?])
    }

    fn preserve_access_time_for(&self, file: &ReadonlyFile) -> bool {
        match file.fs_kind {
            FsKind::Smb => self.last_access_reset_flag_for_smb,
            FsKind::Windows => self.last_access_reset_flag_for_local_windows,
            FsKind::Posix | FsKind::Nfs => false,
        }
    }

    fn acl_documents_for_directory(
        &self,
        dir: &ReadonlyFile,
        root: &ReadonlyFile,
    ) -> Result<Vec<Document>, CrawlError> {
        let quadruple = dir.read_acl()?;
        let is_root = dir.path == root.path;

        let (container_inherit_from, file_inherit_from) = if is_root {
            (
                InheritFrom::Share(root.path.clone()),
                InheritFrom::Share(root.path.clone()),
            )
        } else {
            let parent = parent_docid_path(dir, root);
            (
                InheritFrom::ParentContainers(parent.clone()),
                InheritFrom::ParentFiles(parent),
            )
        };

        let mut container_acl = self.acl_builder.build(&quadruple.container_inherit_acl);
        let mut file_acl = self.acl_builder.build(&quadruple.file_inherit_acl);
        if is_root {
            // Root-special-case (spec §4.6): there is no parent to own the
            // inherited sets, so they're folded into the root's own docs.
            let inherited = self.acl_builder.build(&quadruple.inherited_acl);
            container_acl.flatten_in(&inherited);
            file_acl.flatten_in(&inherited);
        }

        Ok(vec![
            Document::Acl(AclDocument {
                docid: format!("foldersAcl:{}", dir.path),
                kind: AclDocumentKind::ContainerInherit,
                acl: container_acl,
                inherit_from: container_inherit_from,
                inheritance_type: InheritanceType::ChildOverrides,
            }),
            Document::Acl(AclDocument {
                docid: format!("filesAcl:{}", dir.path),
                kind: AclDocumentKind::FileInherit,
                acl: file_acl,
                inherit_from: file_inherit_from,
                inheritance_type: InheritanceType::ChildOverrides,
            }),
        ])
    }

    /// The root's own share-ACL document, emitted once per cycle ahead of
    /// everything else when directories-returned mode is on (spec §4.7
    /// step 4).
    pub fn share_acl_document(&self, root: &ReadonlyFile) -> Result<Document, CrawlError> {
        let share_acl = root.read_share_acl()?;
        Ok(Document::Acl(AclDocument {
            docid: format!("shareAcl:{}", root.path),
            kind: AclDocumentKind::Share,
            acl: self.acl_builder.build(&share_acl),
            inherit_from: InheritFrom::None,
            inheritance_type: InheritanceType::AndBothPermit,
        }))
    }

    fn content_document(
        &self,
        file: &ReadonlyFile,
        root: &ReadonlyFile,
    ) -> Result<Document, CrawlError> {
        let docid = file.path.clone();
        let display_url = file.display_url();
        let last_modified_millis = file.last_modified_millis()?;
        let content_length = file.length()?;
        let preserve_access_time = self.preserve_access_time_for(file);

        if self.mark_all_documents_public {
            return Ok(Document::Content(ContentDocument {
                docid,
                display_url,
                last_modified_millis,
                content_length,
                is_public: true,
                acl: None,
                acl_inherit_from: InheritFrom::None,
                node: file.clone(),
                preserve_access_time,
            }));
        }

        if !self.push_acls || !file.supports_acl() {
            return Ok(Document::Content(ContentDocument {
                docid,
                display_url,
                last_modified_millis,
                content_length,
                is_public: false,
                acl: None,
                acl_inherit_from: InheritFrom::None,
                node: file.clone(),
                preserve_access_time,
            }));
        }

        let is_root = file.path == root.path;
        let inherit_from = if is_root {
            InheritFrom::Share(root.path.clone())
        } else {
            InheritFrom::ParentFiles(parent_docid_path(file, root))
        };

        let quadruple = match file.read_acl() {
            Ok(quadruple) => quadruple,
            Err(error) if self.use_authz_on_acl_error => {
                warn!(path = %file.path, %error, "ACL read failed; falling back to per-request authorization");
                return Ok(Document::Content(ContentDocument {
                    docid,
                    display_url,
                    last_modified_millis,
                    content_length,
                    is_public: false,
                    acl: Some(Acl::indeterminate()),
                    acl_inherit_from: InheritFrom::None,
                    node: file.clone(),
                    preserve_access_time,
                }));
            }
            Err(error) => return Err(error.into()),
        };

        let mut acl = self.acl_builder.build(&quadruple.file_acl);
        if is_root {
            let inherited = self.acl_builder.build(&quadruple.inherited_acl);
            acl.flatten_in(&inherited);
        }

        Ok(Document::Content(ContentDocument {
            docid,
            display_url,
            last_modified_millis,
            content_length,
            is_public: false,
            acl: Some(acl),
            acl_inherit_from: inherit_from,
            node: file.clone(),
            preserve_access_time,
        }))
    }
}
