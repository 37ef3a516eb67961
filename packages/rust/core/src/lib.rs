//! Pipeline orchestration for mrfscan.
//!
//! Wires the index stream, worker fan-out, and result aggregation into a
//! single [`run_scan`] entry point:
//! - [`pipeline`] — the staged scan pipeline and progress hooks
//! - [`scheduler`] — [`FanoutScheduler`], the bounded worker pool
//! - [`aggregate`] — per-worker report merging

pub mod aggregate;
pub mod pipeline;
pub mod scheduler;

pub use aggregate::{Merged, WorkerReport};
pub use pipeline::{ScanProgress, ScanResult, SilentProgress, run_scan};
pub use scheduler::FanoutScheduler;
