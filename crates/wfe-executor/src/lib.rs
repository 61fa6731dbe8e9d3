//! Session-scoped executors (spec §4, "AbstractExecutor"): the object a
//! caller holds for the lifetime of a session, combining one
//! `TaskPollingMonitor` with a backend-specific way of turning a
//! `TaskRun` into a `TaskHandler`.

pub mod grid;
pub mod local;
pub mod nope;

use std::sync::Arc;

use wfe_core::{TaskConfig, TaskResult, TaskRun, WfeError};
use wfe_monitor::TaskPollingMonitor;

pub use grid::GridSessionExecutor;
pub use local::LocalExecutor;
pub use nope::NopeExecutor;

/// A callback invoked exactly once, from the monitor's poll loop, when a
/// submitted task completes.
pub type CompletionCallback = Box<dyn FnOnce(TaskResult) + Send>;

/// One executor instance per session (spec §4): owns a monitor and knows
/// how to turn an incoming `TaskRun` into the right kind of handler.
#[async_trait::async_trait]
pub trait AbstractExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build the backend-appropriate handler for `task` and admit it to
    /// this executor's monitor.
    async fn submit(
        &self,
        task: TaskRun,
        config: TaskConfig,
        on_complete: CompletionCallback,
    ) -> Result<(), WfeError>;

    fn monitor(&self) -> &Arc<TaskPollingMonitor>;
}
