//! Completion coordination for concurrent test groups
//!
//! Tests in a group run concurrently; the report must flush exactly once,
//! after the last completion. The decision to flush is taken inside the
//! critical section so two racing completions cannot both win, and the flush
//! I/O itself happens after the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::facade::Reporter;
use crate::Error;

/// Lifecycle of one test group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPhase {
    /// No tests registered yet
    Idle,
    /// Tests registered, none finished
    Registering,
    /// Some tests finished, more outstanding
    Draining,
    /// Last test finished and the flush was claimed
    Flushed,
}

#[derive(Debug, Default)]
struct GroupState {
    expected: usize,
    completed: usize,
    flushed: bool,
}

impl GroupState {
    fn phase(&self) -> GroupPhase {
        if self.flushed {
            GroupPhase::Flushed
        } else if self.completed == 0 {
            if self.expected == 0 {
                GroupPhase::Idle
            } else {
                GroupPhase::Registering
            }
        } else {
            GroupPhase::Draining
        }
    }
}

/// Tracks expected versus completed tests per group and flushes once
#[derive(Debug)]
pub struct CompletionCoordinator {
    reporter: Arc<Reporter>,
    groups: Mutex<HashMap<String, GroupState>>,
}

impl CompletionCoordinator {
    pub fn new(reporter: Arc<Reporter>) -> Self {
        Self {
            reporter,
            groups: Mutex::new(HashMap::new()),
        }
    }

    fn groups(&self) -> std::sync::MutexGuard<'_, HashMap<String, GroupState>> {
        self.groups.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Announce `count` more tests for a group
    ///
    /// Registration after the group has flushed is rejected; the report for
    /// that group is already final.
    pub fn register(&self, group: &str, count: usize) -> Result<(), Error> {
        let mut groups = self.groups();
        let state = groups.entry(group.to_string()).or_default();
        if state.flushed {
            return Err(Error::report(format!(
                "group {:?} already flushed; cannot register more tests",
                group
            )));
        }
        state.expected += count;
        debug!(
            "Group {:?}: {} registered ({} expected total)",
            group, count, state.expected
        );
        Ok(())
    }

    /// Record one completed test; flushes the report when it was the last
    ///
    /// The completion that observes `completed == expected` claims the flush
    /// while still holding the lock. The write to disk happens after the lock
    /// is dropped so slow I/O never blocks other groups.
    pub fn complete(&self, group: &str) -> Result<(), Error> {
        let should_flush = {
            let mut groups = self.groups();
            let state = groups.get_mut(group).ok_or_else(|| {
                Error::report(format!("group {:?} was never registered", group))
            })?;

            if state.completed >= state.expected {
                return Err(Error::report(format!(
                    "group {:?}: more completions than registrations",
                    group
                )));
            }

            state.completed += 1;
            debug!(
                "Group {:?}: {}/{} complete",
                group, state.completed, state.expected
            );

            if state.completed == state.expected && !state.flushed {
                state.flushed = true;
                true
            } else {
                false
            }
        };

        if should_flush {
            info!("Group {:?} complete; flushing report", group);
            self.reporter.sink()?.flush()?;
        }
        Ok(())
    }

    /// Force a flush regardless of outstanding tests
    ///
    /// Used on abnormal shutdown so partial results still reach disk. Marks
    /// every known group flushed.
    pub fn flush_now(&self) -> Result<(), Error> {
        {
            let mut groups = self.groups();
            for (name, state) in groups.iter_mut() {
                if !state.flushed {
                    warn!(
                        "Group {:?} flushed early with {}/{} complete",
                        name, state.completed, state.expected
                    );
                    state.flushed = true;
                }
            }
        }
        self.reporter.sink()?.flush()
    }

    /// Current phase of a group
    pub fn phase(&self, group: &str) -> GroupPhase {
        self.groups()
            .get(group)
            .map(GroupState::phase)
            .unwrap_or(GroupPhase::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::sink::{EntryId, ReportSink, StepLevel};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sink counting flushes instead of writing files
    #[derive(Debug, Default)]
    struct CountingSink {
        flushes: AtomicUsize,
    }

    impl ReportSink for CountingSink {
        fn create_entry(&self, _name: &str, _description: &str) -> Result<EntryId, Error> {
            Ok(EntryId(0))
        }
        fn log_step(&self, _: EntryId, _: StepLevel, _: &str) -> Result<(), Error> {
            Ok(())
        }
        fn attach_screenshot(&self, _: EntryId, _: &Path, _: &str) -> Result<(), Error> {
            Ok(())
        }
        fn flush(&self) -> Result<(), Error> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn coordinator() -> (Arc<CompletionCoordinator>, Arc<CountingSink>) {
        let sink = Arc::new(CountingSink::default());
        let sink_for_factory = Arc::clone(&sink);
        let reporter = Arc::new(Reporter::new(Box::new(move || {
            Ok(Arc::clone(&sink_for_factory) as Arc<dyn ReportSink>)
        })));
        (Arc::new(CompletionCoordinator::new(reporter)), sink)
    }

    #[test]
    fn test_flush_fires_on_last_completion_only() {
        let (coordinator, sink) = coordinator();
        coordinator.register("login", 3).unwrap();

        coordinator.complete("login").unwrap();
        coordinator.complete("login").unwrap();
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.phase("login"), GroupPhase::Draining);

        coordinator.complete("login").unwrap();
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.phase("login"), GroupPhase::Flushed);
    }

    #[test]
    fn test_concurrent_completions_flush_exactly_once() {
        let (coordinator, sink) = coordinator();
        let n = 32;
        coordinator.register("race", n).unwrap();

        let handles: Vec<_> = (0..n)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                std::thread::spawn(move || coordinator.complete("race").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_incremental_registration_defers_flush() {
        let (coordinator, sink) = coordinator();
        coordinator.register("suite", 1).unwrap();
        coordinator.register("suite", 1).unwrap();

        coordinator.complete("suite").unwrap();
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 0);
        coordinator.complete("suite").unwrap();
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_overcompletion_rejected() {
        let (coordinator, _sink) = coordinator();
        coordinator.register("one", 1).unwrap();
        coordinator.complete("one").unwrap();
        assert!(coordinator.complete("one").is_err());
    }

    #[test]
    fn test_unknown_group_rejected() {
        let (coordinator, _sink) = coordinator();
        assert!(coordinator.complete("ghost").is_err());
    }

    #[test]
    fn test_register_after_flush_rejected() {
        let (coordinator, _sink) = coordinator();
        coordinator.register("done", 1).unwrap();
        coordinator.complete("done").unwrap();
        assert!(coordinator.register("done", 1).is_err());
    }

    #[test]
    fn test_flush_now_marks_groups_flushed() {
        let (coordinator, sink) = coordinator();
        coordinator.register("partial", 5).unwrap();
        coordinator.complete("partial").unwrap();

        coordinator.flush_now().unwrap();
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.phase("partial"), GroupPhase::Flushed);
    }

    #[test]
    fn test_phases_progress() {
        let (coordinator, _sink) = coordinator();
        assert_eq!(coordinator.phase("g"), GroupPhase::Idle);
        coordinator.register("g", 2).unwrap();
        assert_eq!(coordinator.phase("g"), GroupPhase::Registering);
        coordinator.complete("g").unwrap();
        assert_eq!(coordinator.phase("g"), GroupPhase::Draining);
        coordinator.complete("g").unwrap();
        assert_eq!(coordinator.phase("g"), GroupPhase::Flushed);
    }
}
