//! Test reporting
//!
//! A [`ReportSink`] persists entries and steps, the [`Reporter`] facade builds
//! it lazily and at most once, and the [`CompletionCoordinator`] decides when
//! the artifact is flushed for a group of concurrent tests.

pub mod coordinator;
pub mod facade;
pub mod sink;

pub use coordinator::{CompletionCoordinator, GroupPhase};
pub use facade::Reporter;
pub use sink::{EntryId, JsonReportSink, ReportSink, StepLevel};
