//! No-op test-double handler (spec §9 Open Question: kept as an
//! intentional one-tick state machine rather than made to mimic real
//! timing, since tests rely on its determinism).

use wfe_core::{TaskOutput, TaskResult, TaskRun, TaskStatus, WfeError};

use crate::HandlerKind;

/// Transitions New -> Submitted on `submit`, Submitted -> Running on the
/// first `check_if_running`, and completes immediately on the first
/// `check_if_completed` call after that — no process or closure involved.
pub struct NopeTaskHandler {
    task: TaskRun,
    status: TaskStatus,
}

impl NopeTaskHandler {
    pub fn new(task: TaskRun) -> Self {
        Self { task, status: TaskStatus::New }
    }
}

#[async_trait::async_trait]
impl crate::TaskHandler for NopeTaskHandler {
    async fn submit(&mut self) -> Result<(), WfeError> {
        self.status = TaskStatus::Submitted;
        Ok(())
    }

    async fn check_if_running(&mut self) -> Result<bool, WfeError> {
        if self.status == TaskStatus::Submitted {
            self.status = TaskStatus::Running;
        }
        Ok(self.status == TaskStatus::Running)
    }

    async fn check_if_completed(&mut self) -> Result<Option<TaskResult>, WfeError> {
        if self.status != TaskStatus::Running {
            return Ok(None);
        }
        self.status = TaskStatus::Completed;
        Ok(Some(TaskResult {
            exit_status: Some(0),
            stdout: Some(TaskOutput::Path(self.task.cmd_output_file())),
            error: None,
        }))
    }

    async fn kill(&mut self) {
        self.status = TaskStatus::Completed;
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn task(&self) -> &TaskRun {
        &self.task
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Nope
    }
}
