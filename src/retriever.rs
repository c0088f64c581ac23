//! On-demand metadata/content lookup by document id (spec §4.9, C9). Used
//! by the sink to fetch bytes and fresh metadata after a document has been
//! queued; must be reentrant since the sink may call it from arbitrary
//! threads (spec §5).
use crate::config::{Credentials, FileSystemConfig};
use crate::document::{ContentDocument, Document, DocumentFactory};
use crate::error::CrawlError;
use crate::fs::{ClassifyError, NodeError, PathClassifier};
use std::io::Read;
use std::sync::Arc;

/// A document id is either a reserved-prefix ACL pointer or an exact path
/// (spec §3, §6 "Docid format"). Metadata/content lookups only make sense
/// for content docids; a caller holding an ACL docid has nothing to
/// re-fetch from the filesystem.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    #[error(transparent)]
    Crawl(#[from] CrawlError),
    #[error("docid {0} refers to a synthetic ACL document, not a filesystem path")]
    NotAContentDocument(String),
    #[error("{0}: refers to a directory, which carries no content")]
    IsDirectory(String),
}

/// Stateless, reentrant retriever: holds only the shared, read-only
/// collaborators every lookup needs (spec §5 "Credentials are read-only
/// after startup").
pub struct Retriever {
    classifier: Arc<PathClassifier>,
    credentials: Credentials,
    factory: DocumentFactory,
    max_document_size: u64,
}

impl Retriever {
    #[must_use]
    pub fn new(classifier: Arc<PathClassifier>, config: &FileSystemConfig, max_document_size: u64) -> Self {
        Self {
            classifier,
            credentials: config.credentials.clone(),
            factory: DocumentFactory::new(config),
            max_document_size,
        }
    }

    /// Re-opens `docid` and produces a fresh content document. Four failure
    /// modes (spec §4.9): unknown prefix, permanent document error
    /// (missing/unreadable/empty/oversize), transient I/O, or the docid
    /// naming a synthetic ACL record.
    pub fn get_metadata(&self, docid: &str) -> Result<ContentDocument, RetrieverError> {
        if is_acl_docid(docid) {
            return Err(RetrieverError::NotAContentDocument(docid.to_string()));
        }

        let root = self.open(docid)?;
        if root.is_directory().map_err(CrawlError::from)? {
            return Err(RetrieverError::IsDirectory(docid.to_string()));
        }
        if !root.can_read().map_err(CrawlError::from)? {
            return Err(CrawlError::from(NodeError::Document(
                crate::error::RepositoryDocumentError::AccessDenied {
                    path: docid.into(),
                },
            ))
            .into());
        }
        let length = root.length().map_err(CrawlError::from)?;
        if length == 0 {
            return Err(CrawlError::from(NodeError::Document(
                crate::error::RepositoryDocumentError::Empty { path: docid.into() },
            ))
            .into());
        }
        if length > self.max_document_size {
            return Err(CrawlError::from(NodeError::Document(
                crate::error::RepositoryDocumentError::Oversize {
                    path: docid.into(),
                    size: length,
                },
            ))
            .into());
        }

        match self.factory.get_documents(&root, &root)? {
            mut docs if docs.len() == 1 => match docs.remove(0) {
                Document::Content(content) => Ok(content),
                Document::Acl(_) => Err(RetrieverError::NotAContentDocument(docid.to_string())),
            },
            _ => Err(RetrieverError::NotAContentDocument(docid.to_string())),
        }
    }

    /// Returns the content byte stream for `docid`, or `Ok(None)` when the
    /// docid names a directory (spec §4.9: "directories carry no bytes").
    pub fn get_content(&self, docid: &str) -> Result<Option<Box<dyn Read + Send>>, RetrieverError> {
        match self.get_metadata(docid) {
            Ok(document) => Ok(Some(document.content().map_err(CrawlError::from)?)),
            Err(RetrieverError::IsDirectory(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn open(&self, path: &str) -> Result<crate::fs::ReadonlyFile, RetrieverError> {
        self.classifier
            .get_file(path, &self.credentials)
            .map_err(|error| match error {
                ClassifyError::Unknown(error) => CrawlError::UnknownFileSystem(error).into(),
                ClassifyError::Node(error) => CrawlError::from(error).into(),
            })
    }
}

fn is_acl_docid(docid: &str) -> bool {
    docid.starts_with("shareAcl:") || docid.starts_with("foldersAcl:") || docid.starts_with("filesAcl:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystemType, PosixFileSystem};
    use std::fs;

    fn retriever(max_document_size: u64) -> Retriever {
        let classifier = Arc::new(PathClassifier::new(vec![Box::new(PosixFileSystem::new())]));
        let mut cfg = FileSystemConfig::default();
        cfg.start_paths.push("/tmp".into());
        Retriever::new(classifier, &cfg, max_document_size)
    }

    #[test]
    fn acl_docid_is_rejected() {
        let retriever = retriever(1024);
        let result = retriever.get_metadata("shareAcl:/root");
        assert!(matches!(
            result,
            Err(RetrieverError::NotAContentDocument(_))
        ));
    }

    #[test]
    fn directory_has_no_content() {
        let dir = std::env::temp_dir().join("fscrawl_retriever_dir_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let retriever = retriever(1024);
        let content = retriever.get_content(dir.to_str().unwrap()).unwrap();
        assert!(content.is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn oversize_file_is_rejected() {
        let dir = std::env::temp_dir().join("fscrawl_retriever_oversize_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("big.bin"), vec![0u8; 64]).unwrap();

        let retriever = retriever(8);
        let result = retriever.get_metadata(dir.join("big.bin").to_str().unwrap());
        assert!(result.is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn reads_fresh_content_for_a_file() {
        let dir = std::env::temp_dir().join("fscrawl_retriever_content_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("f.txt"), b"hello").unwrap();

        let retriever = retriever(1024);
        let mut buf = Vec::new();
        retriever
            .get_content(dir.join("f.txt").to_str().unwrap())
            .unwrap()
            .unwrap()
            .read_to_end(&mut buf)
            .unwrap();
        assert_eq!(buf, b"hello");

        fs::remove_dir_all(&dir).unwrap();
    }
}
