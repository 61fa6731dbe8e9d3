//! Task handlers: the per-task lifecycle driver a `TaskPollingMonitor`
//! polls (spec §4.2). Each backend (local, native, grid, the no-op test
//! double) implements `TaskHandler` over the same state machine.

pub mod grid;
pub mod local;
pub mod native;
pub mod nope;

use wfe_core::{TaskResult, TaskRun, TaskStatus, WfeError};

pub use grid::GridTaskHandler;
pub use local::LocalTaskHandler;
pub use native::NativeTaskHandler;
pub use nope::NopeTaskHandler;

/// Discriminates handler backends for diagnostics/dump purposes (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Local,
    Native,
    Grid,
    Nope,
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Local => "local",
            Self::Native => "native",
            Self::Grid => "grid",
            Self::Nope => "nope",
        };
        write!(f, "{s}")
    }
}

/// The polled lifecycle of a single submitted task (spec §4.2).
///
/// `submit` is called once, then the monitor repeatedly calls
/// `check_if_running` until it returns `true`, after which it repeatedly
/// calls `check_if_completed` until that returns `Some`. `kill` can be
/// called at any point after `submit` and must be idempotent.
#[async_trait::async_trait]
pub trait TaskHandler: Send + Sync {
    /// Submit the task for execution. Transitions `New` -> `Submitted`.
    async fn submit(&mut self) -> Result<(), WfeError>;

    /// Non-blocking check: has the task started running?
    /// Transitions `Submitted` -> `Running` when true.
    async fn check_if_running(&mut self) -> Result<bool, WfeError>;

    /// Non-blocking check: has the task finished? Transitions to
    /// `Completed` and returns the result exactly once.
    async fn check_if_completed(&mut self) -> Result<Option<TaskResult>, WfeError>;

    /// Force-terminate the task. Safe to call multiple times or on a task
    /// that has already completed.
    async fn kill(&mut self);

    fn status(&self) -> TaskStatus;

    fn task(&self) -> &TaskRun;

    fn kind(&self) -> HandlerKind;
}
