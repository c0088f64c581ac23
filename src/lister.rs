//! Worker pool + sleep/interrupt loop running all traversers under a shared
//! schedule (spec §4.8, C8).
use crate::sink::DocumentAcceptor;
use crate::traverser::{Traverser, ERROR_DELAY};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::warn;

/// Near-maximum finite duration standing in for "sleep forever"; any
/// shutdown or reconfiguration wakes it promptly via polling (spec §4.8:
/// "a sleep of infinity is represented as a near-maximum finite duration").
const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// External collaborator consumed by the lister (spec §3 "Schedule").
pub trait Schedule: Send + Sync {
    /// Advisory documents-per-minute rate; not enforced by this crate.
    fn rate(&self) -> u32;
    /// Seconds between retries; negative means infinite (never retry).
    fn retry_delay(&self) -> i64;
    fn is_disabled(&self) -> bool;
    fn in_scheduled_interval(&self) -> bool;
    /// Seconds until the next scheduled window opens.
    fn next_scheduled_interval(&self) -> u64;
    fn should_run(&self) -> bool;
}

/// Runs every configured root's `Traverser` under a shared schedule using a
/// fixed-size pool, sized from configuration (spec §4.8). The pool and
/// traverser set are atomically replaceable on reconfiguration (spec §5
/// "shared resources").
pub struct Lister {
    traversers: RwLock<Vec<Arc<Traverser>>>,
    thread_pool_size: AtomicUsize,
    sink: Arc<dyn DocumentAcceptor>,
    schedule: Arc<dyn Schedule>,
    shutdown: Arc<AtomicBool>,
    completed: Arc<AtomicBool>,
    /// Bumped by `reconfigure()`. The schedule-sleep loop snapshots this
    /// before sleeping and wakes early the moment it changes, so a
    /// reconfiguration is never left waiting out the remainder of a stale
    /// sleep (spec §4.8, §5 "Interrupts are delivered to the lister's
    /// sleep, distinct from shutdown").
    generation: AtomicU64,
}

impl Lister {
    #[must_use]
    pub fn new(
        traversers: Vec<Traverser>,
        thread_pool_size: usize,
        sink: Arc<dyn DocumentAcceptor>,
        schedule: Arc<dyn Schedule>,
    ) -> Self {
        Self {
            traversers: RwLock::new(traversers.into_iter().map(Arc::new).collect()),
            thread_pool_size: AtomicUsize::new(thread_pool_size.max(1)),
            sink,
            schedule,
            shutdown: Arc::new(AtomicBool::new(false)),
            completed: Arc::new(AtomicBool::new(false)),
            generation: AtomicU64::new(0),
        }
    }

    /// Replaces the traverser set and pool size. In-flight work started
    /// under the old configuration keeps running to completion; the next
    /// cycle picks up the new set (spec §4.8, §5). Interrupts a sleep
    /// currently in progress in [`Lister::run`] so the new schedule/pool
    /// size takes effect within one scheduler tick instead of waiting out
    /// whatever delay was already in flight.
    pub fn reconfigure(&self, traversers: Vec<Traverser>, thread_pool_size: usize) {
        *self.traversers.write().unwrap() = traversers.into_iter().map(Arc::new).collect();
        self.thread_pool_size
            .store(thread_pool_size.max(1), Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// The main scheduling loop (spec §4.8). Blocking; callers typically
    /// run this on a dedicated thread and stop it with
    /// [`Lister::shutdown_and_wait`].
    pub fn run(&self) {
        self.completed.store(false, Ordering::SeqCst);
        while !self.shutdown.load(Ordering::SeqCst) {
            self.sleep_until_scheduled();
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            if self.schedule.is_disabled() || !self.schedule.should_run() {
                continue;
            }

            let had_error = self.run_all_traversers();
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let delay = if had_error {
                ERROR_DELAY
            } else {
                self.retry_delay_duration()
            };
            self.sleep_interruptible(delay);
        }
        self.completed.store(true, Ordering::SeqCst);
    }

    /// Requests shutdown, waits up to `timeout` for the run loop to drain,
    /// then calls `sink.cancel()` unconditionally (spec §4.8 "Shutdown").
    pub fn shutdown_and_wait(&self, timeout: Duration) {
        self.shutdown.store(true, Ordering::SeqCst);
        let start = Instant::now();
        while !self.completed.load(Ordering::SeqCst) && start.elapsed() < timeout {
            std::thread::sleep(Duration::from_millis(100));
        }
        if !self.completed.load(Ordering::SeqCst) {
            warn!("lister did not terminate within the shutdown timeout");
        }
        self.sink.cancel();
    }

    fn sleep_until_scheduled(&self) {
        if self.schedule.is_disabled() {
            self.sleep_interruptible(MAX_DELAY);
        } else if !self.schedule.in_scheduled_interval() {
            let wait = Duration::from_secs(self.schedule.next_scheduled_interval());
            self.sleep_interruptible(wait);
        }
    }

    /// Sleeps up to `duration` in short polling increments, waking early on
    /// either a shutdown request or a `reconfigure()` call made while
    /// asleep (spec §4.8, §5 "Interrupts are delivered to the lister's
    /// sleep, distinct from shutdown").
    fn sleep_interruptible(&self, duration: Duration) {
        const POLL: Duration = Duration::from_millis(200);
        let observed_generation = self.generation.load(Ordering::SeqCst);
        let mut remaining = duration;
        while remaining > Duration::ZERO {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }
            if self.generation.load(Ordering::SeqCst) != observed_generation {
                return;
            }
            let step = remaining.min(POLL);
            std::thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }

    fn retry_delay_duration(&self) -> Duration {
        let seconds = self.schedule.retry_delay();
        if seconds < 0 {
            MAX_DELAY
        } else {
            Duration::from_secs(seconds as u64)
        }
    }

    /// Dispatches every configured root onto the pool and waits for all to
    /// finish this cycle, returning whether any traverser errored (spec
    /// §4.8, §5 "the lister dispatches N traverser tasks onto a fixed pool
    /// and waits for all to complete each cycle").
    fn run_all_traversers(&self) -> bool {
        let traversers = self.traversers.read().unwrap().clone();
        if traversers.is_empty() {
            return false;
        }

        let (tx, rx) = crossbeam_channel::unbounded::<Arc<Traverser>>();
        for traverser in &traversers {
            let _ = tx.send(Arc::clone(traverser));
        }
        drop(tx);

        let had_error = AtomicBool::new(false);
        let worker_count = self
            .thread_pool_size
            .load(Ordering::SeqCst)
            .min(traversers.len());

        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                let rx = rx.clone();
                let sink = Arc::clone(&self.sink);
                let shutdown = Arc::clone(&self.shutdown);
                let had_error = &had_error;
                scope.spawn(move || {
                    while let Ok(traverser) = rx.recv() {
                        if shutdown.load(Ordering::SeqCst) {
                            break;
                        }
                        if let Err(error) = traverser.call(sink.as_ref(), shutdown.as_ref()) {
                            warn!(%error, "traverser cycle ended with an error");
                            had_error.store(true, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        had_error.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileSystemConfig;
    use crate::fs::{FileSystemType, PathClassifier, PosixFileSystem};
    use crate::sink::testing::RecordingSink;
    use std::fs;

    struct AlwaysRunSchedule;

    impl Schedule for AlwaysRunSchedule {
        fn rate(&self) -> u32 {
            0
        }
        fn retry_delay(&self) -> i64 {
            0
        }
        fn is_disabled(&self) -> bool {
            false
        }
        fn in_scheduled_interval(&self) -> bool {
            true
        }
        fn next_scheduled_interval(&self) -> u64 {
            0
        }
        fn should_run(&self) -> bool {
            true
        }
    }

    #[test]
    fn runs_a_cycle_and_shuts_down_cleanly() {
        let dir = std::env::temp_dir().join("fscrawl_lister_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), b"x").unwrap();

        let classifier = Arc::new(PathClassifier::new(vec![Box::new(PosixFileSystem::new())]));
        let mut cfg = FileSystemConfig::default();
        cfg.start_paths.push(dir.to_str().unwrap().to_string());
        let traverser =
            Traverser::new(classifier, dir.to_str().unwrap().to_string(), &cfg).unwrap();

        let sink: Arc<dyn DocumentAcceptor> = Arc::new(RecordingSink::new());
        let lister = Arc::new(Lister::new(
            vec![traverser],
            2,
            Arc::clone(&sink),
            Arc::new(AlwaysRunSchedule),
        ));

        let run_handle = {
            let lister = Arc::clone(&lister);
            std::thread::spawn(move || lister.run())
        };

        std::thread::sleep(Duration::from_millis(300));
        lister.shutdown_and_wait(Duration::from_secs(5));
        run_handle.join().unwrap();

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn reconfigure_wakes_a_pending_sleep_promptly() {
        let sink: Arc<dyn DocumentAcceptor> = Arc::new(RecordingSink::new());
        let lister = Arc::new(Lister::new(
            Vec::new(),
            1,
            Arc::clone(&sink),
            Arc::new(AlwaysRunSchedule),
        ));

        let start = Instant::now();
        let sleeper = {
            let lister = Arc::clone(&lister);
            std::thread::spawn(move || lister.sleep_interruptible(MAX_DELAY))
        };

        std::thread::sleep(Duration::from_millis(200));
        lister.reconfigure(Vec::new(), 1);
        sleeper.join().unwrap();

        assert!(
            start.elapsed() < Duration::from_secs(2),
            "reconfigure should interrupt a near-maximum sleep almost immediately"
        );
    }
}
