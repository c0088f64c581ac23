//! One root's scheduled crawl cycle (spec §4.7, C7).
use crate::config::{Credentials, FileSystemConfig};
use crate::document::DocumentFactory;
use crate::error::{CrawlError, RepositoryError};
use crate::fs::{ClassifyError, PathClassifier, ReadonlyFile};
use crate::iterator::FileIterator;
use crate::matcher::{Matcher, MatcherError};
use crate::sink::DocumentAcceptor;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed error-delay a traverser sleeps after a transient failure (spec
/// §4.7 step 7, §4.8 "ERROR_DELAY").
pub const ERROR_DELAY: Duration = Duration::from_secs(5 * 60);

/// One configured root's traversal state and cycle logic. Owns its own
/// `lastTraversal`/`lastFullTraversal` timestamps (spec §3, §5 "owned by
/// one traverser, no cross-thread sync").
pub struct Traverser {
    classifier: Arc<PathClassifier>,
    credentials: Credentials,
    root_path: String,
    matcher: Matcher,
    factory: DocumentFactory,
    push_acls: bool,
    supports_inherited_acls: bool,
    mark_all_documents_public: bool,
    cushion_millis: i64,
    full_traversal_interval_millis: Option<i64>,
    last_traversal: AtomicI64,
    last_full_traversal: AtomicI64,
}

impl Traverser {
    pub fn new(
        classifier: Arc<PathClassifier>,
        root_path: String,
        config: &FileSystemConfig,
    ) -> Result<Self, MatcherError> {
        let matcher = Matcher::new(
            &config.effective_include_patterns(),
            &config.exclude_patterns,
        )?;
        Ok(Self {
            classifier,
            credentials: config.credentials.clone(),
            root_path,
            matcher,
            factory: DocumentFactory::new(config),
            push_acls: config.push_acls,
            supports_inherited_acls: config.supports_inherited_acls,
            mark_all_documents_public: config.mark_all_documents_public,
            cushion_millis: config.if_modified_since_cushion().as_millis() as i64,
            full_traversal_interval_millis: config
                .full_traversal_interval()
                .map(|d| d.as_millis() as i64),
            last_traversal: AtomicI64::new(0),
            last_full_traversal: AtomicI64::new(0),
        })
    }

    /// Runs one crawl cycle for this root. `sink.flush()` always runs, even
    /// if the cycle itself errors (spec §4.7 step 9).
    pub fn call(
        &self,
        sink: &dyn DocumentAcceptor,
        shutdown: &AtomicBool,
    ) -> Result<(), CrawlError> {
        let result = self.run_cycle(sink, shutdown);
        if let Err(error) = sink.flush() {
            warn!(root = %self.root_path, %error, "sink flush failed");
        }
        result
    }

    fn run_cycle(&self, sink: &dyn DocumentAcceptor, shutdown: &AtomicBool) -> Result<(), CrawlError> {
        let root = self.open_root()?;
        let start_time = now_millis();
        let if_modified_since = self.compute_if_modified_since(start_time);

        let directories_returned = root.supports_acl()
            && self.push_acls
            && self.supports_inherited_acls
            && !self.mark_all_documents_public;

        let mut iter =
            FileIterator::new(&root, &self.matcher, if_modified_since, directories_returned)?;

        if directories_returned {
            let share_doc = self.factory.share_acl_document(&root)?;
            if let Err(error) = sink.take(share_doc) {
                warn!(root = %self.root_path, %error, "failed to submit share ACL document");
            }
            // The root directory itself is never yielded by the iterator
            // (it only yields *children*), so its own container-inherit and
            // file-inherit documents are emitted here explicitly rather
            // than relying on the walk to surface them (spec §3
            // "inheritance graph": "the root directory's two inheritance
            // docs both point to the share-ACL doc").
            for doc in self.factory.get_documents(&root, &root)? {
                if let Err(error) = sink.take(doc) {
                    warn!(root = %self.root_path, %error, "failed to submit root ACL document");
                }
            }
        }

        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!(root = %self.root_path, "shutdown observed mid-cycle; exiting");
                return Ok(());
            }

            let file = match iter.next() {
                Ok(Some(file)) => file,
                Ok(None) => break,
                Err(error) => {
                    warn!(root = %self.root_path, %error, "transient error walking directory tree; retrying after error delay");
                    sleep_unless_shutdown(ERROR_DELAY, shutdown);
                    continue;
                }
            };

            if let Err(error) = self.process_one(&file, &root, sink) {
                match error {
                    CrawlError::Document(error) => {
                        warn!(root = %self.root_path, %error, "permanent document error; skipping");
                    }
                    CrawlError::Repository(error) => {
                        warn!(root = %self.root_path, %error, "transient error; will retry after error delay");
                        iter.push_back(file);
                        sleep_unless_shutdown(ERROR_DELAY, shutdown);
                    }
                    other => {
                        warn!(root = %self.root_path, error = %other, "unexpected error producing documents; skipping");
                    }
                }
            }
        }

        self.last_traversal.store(start_time, Ordering::SeqCst);
        if self.last_full_traversal.load(Ordering::SeqCst) == 0 {
            self.last_full_traversal.store(start_time, Ordering::SeqCst);
        }
        info!(
            root = %self.root_path,
            finished_at = %millis_to_utc(start_time),
            "crawl cycle complete"
        );
        Ok(())
    }

    fn process_one(
        &self,
        file: &ReadonlyFile,
        root: &ReadonlyFile,
        sink: &dyn DocumentAcceptor,
    ) -> Result<(), CrawlError> {
        let documents = self.factory.get_documents(file, root)?;
        for document in documents {
            sink.take(document).map_err(|error| {
                CrawlError::Repository(RepositoryError::Unreachable(error.0))
            })?;
        }
        Ok(())
    }

    fn open_root(&self) -> Result<ReadonlyFile, CrawlError> {
        self.classifier
            .get_file(&self.root_path, &self.credentials)
            .map_err(|error| {
                warn!(root = %self.root_path, %error, "failed to open root");
                match error {
                    ClassifyError::Unknown(error) => CrawlError::UnknownFileSystem(error),
                    ClassifyError::Node(error) => error.into(),
                }
            })
    }

    /// Spec §4.7 step 2: force a full traversal when `fullTraversalInterval`
    /// has elapsed, resetting `lastFullTraversal` immediately; otherwise the
    /// cutoff is `lastTraversal` minus the configured cushion.
    fn compute_if_modified_since(&self, now: i64) -> i64 {
        let last_full = self.last_full_traversal.load(Ordering::SeqCst);
        let forced_full = self
            .full_traversal_interval_millis
            .is_some_and(|interval| now - last_full >= interval);

        if forced_full {
            self.last_full_traversal.store(now, Ordering::SeqCst);
            return 0;
        }

        (self.last_traversal.load(Ordering::SeqCst) - self.cushion_millis).max(0)
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

/// Renders an epoch-millis timestamp as RFC 3339 for log lines, the same
/// human-readable-timestamp need `ReadonlyFile::modified_time` serves for
/// file metadata.
fn millis_to_utc(millis: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Sleeps in short increments so a shutdown request interrupts the wait
/// promptly instead of blocking for the full error delay (spec §5
/// "Suspension points", "Cancellation").
fn sleep_unless_shutdown(duration: Duration, shutdown: &AtomicBool) {
    const POLL: Duration = Duration::from_millis(200);
    let mut remaining = duration;
    while remaining > Duration::ZERO {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let step = remaining.min(POLL);
        std::thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystemType, PosixFileSystem};
    use crate::sink::testing::RecordingSink;
    use std::fs;

    fn classifier() -> Arc<PathClassifier> {
        Arc::new(PathClassifier::new(vec![Box::new(PosixFileSystem::new())]))
    }

    #[test]
    fn emits_content_documents_in_order() {
        let dir = std::env::temp_dir().join("fscrawl_traverser_order_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("b")).unwrap();
        fs::write(dir.join("a.txt"), b"x").unwrap();
        fs::write(dir.join("b").join("c.txt"), b"x").unwrap();

        let config = {
            let mut cfg = FileSystemConfig::default();
            cfg.start_paths.push(dir.to_str().unwrap().to_string());
            cfg
        };
        let traverser =
            Traverser::new(classifier(), dir.to_str().unwrap().to_string(), &config).unwrap();
        let sink = RecordingSink::new();
        let shutdown = AtomicBool::new(false);

        traverser.call(&sink, &shutdown).unwrap();

        let expected_a = dir.join("a.txt").to_str().unwrap().to_string();
        let expected_c = dir.join("b").join("c.txt").to_str().unwrap().to_string();
        assert_eq!(sink.docids(), vec![expected_a, expected_c]);
        assert_eq!(sink.flush_count(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn second_cycle_skips_unmodified_files_within_cushion() {
        let dir = std::env::temp_dir().join("fscrawl_traverser_incremental_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), b"x").unwrap();

        let config = {
            let mut cfg = FileSystemConfig::default();
            cfg.start_paths.push(dir.to_str().unwrap().to_string());
            cfg.full_traversal_interval_days = -1;
            // Zero cushion so the cutoff is exactly `lastTraversal`: the file
            // was written strictly before the first cycle starts, so it's
            // skipped on the second cycle without needing a real time gap.
            cfg.if_modified_since_cushion_minutes = 0;
            cfg
        };
        let traverser =
            Traverser::new(classifier(), dir.to_str().unwrap().to_string(), &config).unwrap();
        let shutdown = AtomicBool::new(false);

        let first = RecordingSink::new();
        traverser.call(&first, &shutdown).unwrap();
        assert_eq!(first.docids().len(), 1);

        let second = RecordingSink::new();
        traverser.call(&second, &shutdown).unwrap();
        assert!(second.docids().is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unknown_filesystem_prefix_errors_without_panicking() {
        let config = {
            let mut cfg = FileSystemConfig::default();
            cfg.start_paths.push("ftp://host/path".into());
            cfg
        };
        let traverser =
            Traverser::new(classifier(), "ftp://host/path".into(), &config).unwrap();
        let sink = RecordingSink::new();
        let shutdown = AtomicBool::new(false);

        let result = traverser.call(&sink, &shutdown);
        assert!(result.is_err());
        assert_eq!(sink.flush_count(), 1);
    }

    /// Spec §8 end-to-end scenario 2: an SMB root with one file emits the
    /// share ACL, then the root's two inheritance documents, then the
    /// file's content document inheriting from `filesAcl:<root>`.
    #[test]
    fn smb_tree_emits_acl_documents_in_scenario_order() {
        use crate::fs::smb::testing::{FakeEntry, FakeSmbClient};
        use crate::fs::{NodeStat, PathClassifier, SmbFileSystem};

        let root_path = "smb://h/s/";
        let file_path = "smb://h/s/f";

        let client = Arc::new(FakeSmbClient::new());
        client.insert_dir(root_path, vec![file_path.to_string()]);
        client.insert_file(
            file_path,
            FakeEntry {
                stat: NodeStat {
                    exists: true,
                    is_regular_file: true,
                    can_read: true,
                    length: 5,
                    ..NodeStat::default()
                },
                content: b"hello".to_vec(),
                ..FakeEntry::default()
            },
        );

        let classifier = Arc::new(PathClassifier::new(vec![Box::new(SmbFileSystem::new(
            client,
        ))]));
        let config = {
            let mut cfg = FileSystemConfig::default();
            cfg.start_paths.push(root_path.to_string());
            cfg.push_acls = true;
            cfg.supports_inherited_acls = true;
            cfg.credentials.user = Some("alice".into());
            cfg
        };
        let traverser = Traverser::new(classifier, root_path.to_string(), &config).unwrap();
        let sink = RecordingSink::new();
        let shutdown = AtomicBool::new(false);

        traverser.call(&sink, &shutdown).unwrap();

        assert_eq!(
            sink.docids(),
            vec![
                format!("shareAcl:{root_path}"),
                format!("foldersAcl:{root_path}"),
                format!("filesAcl:{root_path}"),
                file_path.to_string(),
            ]
        );
    }
}
