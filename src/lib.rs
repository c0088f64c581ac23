//! The traversal subsystem of a multi-root filesystem crawler: a per-root
//! lazy depth-first file iterator, a thread-pool-based lister that runs one
//! traverser per configured root under a shared schedule, the
//! incremental-vs-full crawl decision, and the ACL document factory that
//! translates filesystem ACLs into inheritance-aware document graphs.
//!
//! The downstream document sink, the configuration loader's UI, MIME-type
//! detection beyond a best-effort fallback, and native Windows/SMB interop
//! are external collaborators this crate consumes through trait seams
//! ([`sink::DocumentAcceptor`], [`fs::NodeBackend`], [`fs::smb::SmbClient`])
//! rather than implements.

mod acl;
mod config;
mod document;
mod error;
mod fs;
mod iterator;
mod lister;
mod matcher;
mod retriever;
mod sink;
mod traverser;

pub use acl::{
    Acl, AclBuilder, AclFormat, InheritFrom, InheritanceType, Principal, RawAce, SecurityLevel,
};
pub use config::{Credentials, FileSystemConfig};
pub use document::{AclDocument, AclDocumentKind, ContentDocument, Document, DocumentFactory};
pub use error::{
    ConfigError, CrawlError, DirectoryListingError, RepositoryDocumentError, RepositoryError,
    UnknownFileSystemError,
};
pub use fs::{
    AccessTimePreservingReader, ClassifyError, FileSystemType, FsKind, NfsFileSystem, NodeBackend,
    NodeError, NodeStat, PathClassifier, PosixFileSystem, ReadonlyFile, SmbClient, SmbFileSystem,
    WindowsFileSystem,
};
pub use iterator::FileIterator;
pub use lister::{Lister, Schedule};
pub use matcher::{Matcher, MatcherError};
pub use retriever::{Retriever, RetrieverError};
pub use sink::{DocumentAcceptor, SinkError};
pub use traverser::{Traverser, ERROR_DELAY};

#[cfg(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "android"
))]
#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Wires the filesystem types this crate ships behind one [`PathClassifier`],
/// in the tie-breaking order `SPEC_FULL.md` §2 fixes: the URL-prefixed
/// remote/virtual schemes before the catch-all local-path fallback.
#[must_use]
pub fn default_classifier(smb_client: std::sync::Arc<dyn SmbClient>) -> PathClassifier {
    PathClassifier::new(vec![
        Box::new(WindowsFileSystem::new()),
        Box::new(SmbFileSystem::new(smb_client)),
        Box::new(NfsFileSystem::new()),
        Box::new(PosixFileSystem::new()),
    ])
}

/// Same ordering, without an SMB collaborator wired in — for callers (the
/// demo binary) that only ever crawl local POSIX/Windows/NFS roots and have
/// no SMB credentials to offer.
#[must_use]
pub fn local_classifier() -> PathClassifier {
    PathClassifier::new(vec![
        Box::new(WindowsFileSystem::new()),
        Box::new(NfsFileSystem::new()),
        Box::new(PosixFileSystem::new()),
    ])
}
