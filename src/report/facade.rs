//! Lazily constructed report facade
//!
//! The sink is built at most once no matter how many tasks race to reach it:
//! a lock-free fast path answers after construction, and the slow path
//! re-checks under a mutex before invoking the factory.

use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

use super::sink::{EntryId, ReportSink, StepLevel};
use crate::Error;

type SinkFactory = Box<dyn Fn() -> Result<Arc<dyn ReportSink>, Error> + Send + Sync>;

/// Process-wide entry point to the report sink
pub struct Reporter {
    sink: OnceLock<Arc<dyn ReportSink>>,
    init_lock: Mutex<()>,
    factory: SinkFactory,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("initialized", &self.sink.get().is_some())
            .finish()
    }
}

impl Reporter {
    pub fn new(factory: SinkFactory) -> Self {
        Self {
            sink: OnceLock::new(),
            init_lock: Mutex::new(()),
            factory,
        }
    }

    /// The sink, building it on first use
    ///
    /// If construction fails the error is returned and a later call retries;
    /// a successful construction is permanent.
    pub fn sink(&self) -> Result<Arc<dyn ReportSink>, Error> {
        if let Some(sink) = self.sink.get() {
            return Ok(Arc::clone(sink));
        }

        let _guard = self.init_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sink) = self.sink.get() {
            return Ok(Arc::clone(sink));
        }

        let sink = (self.factory)()?;
        let _ = self.sink.set(Arc::clone(&sink));
        Ok(sink)
    }

    /// Whether the sink has been constructed
    pub fn is_initialized(&self) -> bool {
        self.sink.get().is_some()
    }

    /// Log a step, swallowing reporting failures
    ///
    /// Reporting must never change a test's outcome, so errors only warn.
    pub fn try_log_step(&self, entry: EntryId, level: StepLevel, message: &str) {
        match self.sink() {
            Ok(sink) => {
                if let Err(e) = sink.log_step(entry, level, message) {
                    warn!("Failed to log report step: {}", e);
                }
            }
            Err(e) => warn!("Report sink unavailable: {}", e),
        }
    }

    /// Attach a screenshot, swallowing reporting failures
    pub fn try_attach_screenshot(&self, entry: EntryId, path: &std::path::Path, caption: &str) {
        match self.sink() {
            Ok(sink) => {
                if let Err(e) = sink.attach_screenshot(entry, path, caption) {
                    warn!("Failed to attach screenshot: {}", e);
                }
            }
            Err(e) => warn!("Report sink unavailable: {}", e),
        }
    }
}
