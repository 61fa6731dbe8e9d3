//! The grid executor contract (spec §4.4) and its SGE implementation.
//!
//! A `GridExecutor` shapes submit command lines, extracts job ids from
//! submit output, builds kill and queue-status commands, and parses the
//! opaque text a grid scheduler prints back. Modeled on the pack's
//! Slurm `JobState`-enum backend (per-state matching, terminal-state
//! classification) adapted to SGE's `qstat` single-letter state codes.

pub mod cache;
pub mod sge;
pub mod status;

use std::path::Path;

use wfe_core::{TaskConfig, TaskRun, WfeError};

pub use cache::QueueStatusCache;
pub use sge::SgeExecutor;
pub use status::{QueueStatus, QueueStatusMap};

/// Contract every grid backend must provide (spec §4.4).
pub trait GridExecutor: Send + Sync {
    /// Executor name, used for config scoping (`executor.$<name>...`)
    /// and job-name prefixing.
    fn name(&self) -> &'static str;

    /// Build the argv for submitting `task` via the wrapper script at
    /// `wrapper_path`.
    fn submit_command_line(&self, task: &TaskRun, config: &TaskConfig, wrapper_path: &Path) -> Vec<String>;

    /// Extract the backend job id from captured submit stdout.
    fn parse_job_id(&self, submit_output: &str) -> Result<String, WfeError>;

    /// Build the argv to force-terminate a submitted job.
    fn kill_task_command(&self, job_id: &str) -> Vec<String>;

    /// Build the argv to query queue status, optionally scoped to one queue.
    fn queue_status_command(&self, queue: Option<&str>) -> Vec<String>;

    /// Parse a queue-status report into a job id -> status map.
    fn parse_queue_status(&self, text: &str) -> QueueStatusMap;
}
