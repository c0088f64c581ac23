//! Three-tier error taxonomy for the traversal subsystem (spec §7).
use std::path::PathBuf;
use thiserror::Error;

/// No registered [`crate::fs::FileSystemType`] claims a path. Not retried.
#[derive(Debug, Error)]
#[error("no filesystem type claims path {path}")]
pub struct UnknownFileSystemError {
    pub path: String,
}

/// Permanent, document-scoped failure: missing, access-denied, malformed
/// metadata, oversize, or empty. Logged and the crawl continues with the
/// next document.
#[derive(Debug, Error)]
pub enum RepositoryDocumentError {
    #[error("{path}: does not exist")]
    NotFound { path: PathBuf },
    #[error("{path}: permission denied")]
    AccessDenied { path: PathBuf },
    #[error("{path}: malformed metadata: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("{path}: exceeds maximum document size ({size} bytes)")]
    Oversize { path: PathBuf, size: u64 },
    #[error("{path}: empty file")]
    Empty { path: PathBuf },
}

/// Transient failure: server unreachable, timeout, authentication expired.
/// The caller should back off and retry.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{path}: transient I/O error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: authentication expired or rejected")]
    AuthExpired { path: PathBuf },
    #[error("server unreachable: {0}")]
    Unreachable(String),
}

/// Not authorized to enumerate a directory. Distinct from
/// [`RepositoryDocumentError`] because the subtree is skipped but sibling
/// subtrees must keep traversing (spec §7).
#[derive(Debug, Error)]
#[error("{path}: directory listing denied: {source}")]
pub struct DirectoryListingError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Unifying error for call sites (the traverser's per-cycle result) that
/// need a single error type spanning all tiers.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    UnknownFileSystem(#[from] UnknownFileSystemError),
    #[error(transparent)]
    Document(#[from] RepositoryDocumentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    DirectoryListing(#[from] DirectoryListingError),
}

/// Configuration is invalid at construction (spec §6 mutual-exclusivity of
/// `pushAcls` and `markAllDocumentsPublic`, unknown filesystem prefixes in
/// `startPaths`, etc).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pushAcls and markAllDocumentsPublic are mutually exclusive")]
    ConflictingAclMode,
    #[error("startPaths must contain at least one root")]
    NoStartPaths,
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}
