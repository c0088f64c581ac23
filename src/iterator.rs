//! Lazy, ordered, pushback-capable depth-first walk of one root (spec §4.5).
use crate::error::{DirectoryListingError, RepositoryError};
use crate::fs::{NodeError, ReadonlyFile};
use crate::matcher::Matcher;
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

struct Frame {
    remaining: VecDeque<ReadonlyFile>,
}

/// One root's traversal state: an explicit stack of `(directory,
/// remaining-children)` frames plus a single-slot pushback buffer (spec
/// §4.5, §9 "use an explicit stack ... traversal must be restartable").
pub struct FileIterator<'a> {
    matcher: &'a Matcher,
    if_modified_since: i64,
    directories_returned: bool,
    stack: Vec<Frame>,
    pending: Option<ReadonlyFile>,
}

impl<'a> FileIterator<'a> {
    /// Builds an iterator rooted at `root`. A forbidden root listing yields
    /// an iterator that produces nothing (logged, not an error); a
    /// transient failure listing the root propagates so the caller can
    /// retry the whole cycle.
    pub fn new(
        root: &ReadonlyFile,
        matcher: &'a Matcher,
        if_modified_since: i64,
        directories_returned: bool,
    ) -> Result<Self, RepositoryError> {
        let mut stack = Vec::new();
        match expand(root) {
            Ok(children) => stack.push(Frame {
                remaining: children.into(),
            }),
            Err(ExpandError::Repository(error)) => return Err(error),
            Err(ExpandError::Listing(error)) => {
                warn!(
                    path = %error.path.display(),
                    error = %error.source,
                    "root directory listing failed; cycle will emit nothing"
                );
            }
        }
        Ok(Self {
            matcher,
            if_modified_since,
            directories_returned,
            stack,
            pending: None,
        })
    }

    /// Returns the next accepted file or directory in depth-first order, or
    /// `None` at end-of-stream (spec §4.5 algorithm).
    pub fn next(&mut self) -> Result<Option<ReadonlyFile>, RepositoryError> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }

        while let Some(frame) = self.stack.last_mut() {
            let Some(child) = frame.remaining.pop_front() else {
                self.stack.pop();
                continue;
            };

            let Some(is_dir) = stat_or_skip(child.is_directory(), &child.path)? else {
                continue;
            };
            let Some(is_hidden) = stat_or_skip(child.is_hidden(), &child.path)? else {
                continue;
            };

            if is_hidden {
                debug!(path = %child.path, "skipping hidden path");
                continue;
            }

            if is_dir {
                match expand(&child) {
                    Ok(children) => self.stack.push(Frame {
                        remaining: children.into(),
                    }),
                    Err(ExpandError::Repository(error)) => return Err(error),
                    Err(ExpandError::Listing(error)) => {
                        warn!(
                            path = %error.path.display(),
                            error = %error.source,
                            "skipping forbidden directory subtree"
                        );
                        continue;
                    }
                }
                if self.directories_returned {
                    return Ok(Some(child));
                }
                continue;
            }

            let Some(can_read) = stat_or_skip(child.can_read(), &child.path)? else {
                continue;
            };
            if !can_read {
                debug!(path = %child.path, "skipping unreadable file");
                continue;
            }

            if !self.matcher.is_accepted(&child.path) {
                continue;
            }

            let Some(last_modified) = stat_or_skip(child.last_modified_millis(), &child.path)?
            else {
                continue;
            };
            if last_modified < self.if_modified_since {
                continue;
            }

            return Ok(Some(child));
        }

        Ok(None)
    }

    /// Stores the single pending item; calling this twice before an
    /// intervening `next()` is a programming error.
    pub fn push_back(&mut self, file: ReadonlyFile) {
        assert!(
            self.pending.is_none(),
            "push_back called with a pending item already buffered"
        );
        self.pending = Some(file);
    }
}

enum ExpandError {
    Repository(RepositoryError),
    Listing(DirectoryListingError),
}

/// Lists and sorts a directory's children, classifying a listing failure
/// into the hybrid `DirectoryListing` (skip-the-subtree) tier versus the
/// `Repository` (bubble-for-retry) tier (spec §4.2, §7).
fn expand(dir: &ReadonlyFile) -> Result<Vec<ReadonlyFile>, ExpandError> {
    dir.list_files().map_err(|error| match error {
        NodeError::Transient(error) => ExpandError::Repository(error),
        NodeError::Document(error) => ExpandError::Listing(DirectoryListingError {
            path: PathBuf::from(dir.path.clone()),
            source: io::Error::other(error.to_string()),
        }),
    })
}

/// Permanent (`RepositoryDocument`) stat errors on one candidate child are
/// logged and treated as "skip this entry"; transient errors bubble so the
/// caller can pause and retry the whole cycle.
fn stat_or_skip<T>(result: Result<T, NodeError>, path: &str) -> Result<Option<T>, RepositoryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(NodeError::Document(error)) => {
            debug!(path, %error, "skipping entry after stat error");
            Ok(None)
        }
        Err(NodeError::Transient(error)) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystemType, PosixFileSystem};
    use std::fs;

    fn matcher() -> Matcher {
        Matcher::new(&[String::new()], &[]).unwrap()
    }

    fn root_of(dir: &std::path::Path) -> ReadonlyFile {
        PosixFileSystem::new()
            .open(dir.to_str().unwrap(), &Default::default())
            .unwrap()
    }

    #[test]
    fn visits_depth_first_in_adjusted_lexicographic_order() {
        let dir = std::env::temp_dir().join("fscrawl_iter_order_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("foo")).unwrap();
        fs::write(dir.join("abc"), b"x").unwrap();
        fs::write(dir.join("foo.bar"), b"x").unwrap();
        fs::write(dir.join("foo").join("x"), b"x").unwrap();

        let matcher = matcher();
        let root = root_of(&dir);
        let mut iter = FileIterator::new(&root, &matcher, 0, false).unwrap();

        let mut paths = Vec::new();
        while let Some(file) = iter.next().unwrap() {
            paths.push(file.name.clone());
        }
        assert_eq!(paths, vec!["abc", "x", "foo.bar"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn push_back_is_idempotent_with_next() {
        let dir = std::env::temp_dir().join("fscrawl_iter_pushback_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), b"x").unwrap();

        let matcher = matcher();
        let root = root_of(&dir);
        let mut iter = FileIterator::new(&root, &matcher, 0, false).unwrap();

        let first = iter.next().unwrap().unwrap();
        iter.push_back(first.clone());
        let replayed = iter.next().unwrap().unwrap();
        assert_eq!(replayed.path, first.path);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn skips_hidden_entries() {
        let dir = std::env::temp_dir().join("fscrawl_iter_hidden_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(".secret"), b"x").unwrap();
        fs::write(dir.join("visible.txt"), b"x").unwrap();

        let matcher = matcher();
        let root = root_of(&dir);
        let mut iter = FileIterator::new(&root, &matcher, 0, false).unwrap();

        let mut names = Vec::new();
        while let Some(file) = iter.next().unwrap() {
            names.push(file.name.clone());
        }
        assert_eq!(names, vec!["visible.txt"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn if_modified_since_filters_stale_files() {
        let dir = std::env::temp_dir().join("fscrawl_iter_ims_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), b"x").unwrap();

        let matcher = matcher();
        let root = root_of(&dir);
        let far_future = i64::MAX;
        let mut iter = FileIterator::new(&root, &matcher, far_future, false).unwrap();
        assert!(iter.next().unwrap().is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn if_modified_since_keeps_files_at_or_after_the_cutoff() {
        let dir = std::env::temp_dir().join("fscrawl_iter_ims_cutoff_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("old.txt"), b"x").unwrap();
        fs::write(dir.join("new.txt"), b"x").unwrap();

        let old_time = filetime::FileTime::from_unix_time(1_000_000, 0);
        let cutoff_time = filetime::FileTime::from_unix_time(2_000_000, 0);
        let new_time = filetime::FileTime::from_unix_time(3_000_000, 0);
        filetime::set_file_mtime(dir.join("old.txt"), old_time).unwrap();
        filetime::set_file_mtime(dir.join("new.txt"), new_time).unwrap();

        let matcher = matcher();
        let root = root_of(&dir);
        let mut iter =
            FileIterator::new(&root, &matcher, cutoff_time.seconds() * 1000, false).unwrap();

        let mut names = Vec::new();
        while let Some(file) = iter.next().unwrap() {
            names.push(file.name.clone());
        }
        assert_eq!(names, vec!["new.txt"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn include_exclude_matcher_filters_entries() {
        let dir = std::env::temp_dir().join("fscrawl_iter_matcher_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("keep.txt"), b"x").unwrap();
        fs::write(dir.join("drop.log"), b"x").unwrap();

        let excludes_log = Matcher::new(&[String::new()], &[r"regexp:.*\.log$".into()]).unwrap();
        let root = root_of(&dir);
        let mut iter = FileIterator::new(&root, &excludes_log, 0, false).unwrap();

        let mut names = Vec::new();
        while let Some(file) = iter.next().unwrap() {
            names.push(file.name.clone());
        }
        assert_eq!(names, vec!["keep.txt"]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
