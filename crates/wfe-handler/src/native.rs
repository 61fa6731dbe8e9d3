//! Native-closure task handler (spec §4.2, "Native handler" / spec §9).
//!
//! Runs `TaskPayload::Native`'s deferred closure on the blocking-task
//! worker pool rather than spawning an external process, and folds its
//! return value or captured panic/error into the same `TaskResult` shape
//! SHELL tasks produce.

use tokio::task::JoinHandle;
use wfe_core::{
    NativeCodeResult, TaskOutput, TaskPayload, TaskResult, TaskRun, TaskStatus, WfeError,
};

use crate::HandlerKind;

enum Slot {
    Pending(wfe_core::NativeCode),
    Running(JoinHandle<NativeCodeResult>),
    Done,
}

pub struct NativeTaskHandler {
    name: String,
    slot: Slot,
    status: TaskStatus,
    placeholder: TaskRun,
}

impl NativeTaskHandler {
    /// Requires `task.payload` to be `TaskPayload::Native`; the closure is
    /// moved out of the payload and the run's name/work_directory/stdin
    /// are kept for diagnostics via `task()`.
    pub fn new(task: TaskRun) -> Result<Self, WfeError> {
        let TaskRun { name, work_directory, payload, stdin, .. } = task;
        let code = match payload {
            TaskPayload::Native { code } => code,
            TaskPayload::Shell { .. } => {
                return Err(WfeError::Submit(format!(
                    "task '{name}' is not a native task"
                )));
            }
        };
        let placeholder = TaskRun {
            name: name.clone(),
            work_directory,
            payload: TaskPayload::Shell { script: String::new() },
            stdin,
            result: TaskResult::default(),
        };
        Ok(Self {
            name,
            slot: Slot::Pending(code),
            status: TaskStatus::New,
            placeholder,
        })
    }
}

#[async_trait::async_trait]
impl crate::TaskHandler for NativeTaskHandler {
    async fn submit(&mut self) -> Result<(), WfeError> {
        let Slot::Pending(code) = std::mem::replace(&mut self.slot, Slot::Done) else {
            return Err(WfeError::Submit(format!("task '{}' already submitted", self.name)));
        };
        let handle = tokio::task::spawn_blocking(code);
        self.slot = Slot::Running(handle);
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
        let Slot::Running(handle) = &mut self.slot else {
            return Ok(None);
        };
        if !handle.is_finished() {
            return Ok(None);
        }
        let Slot::Running(handle) = std::mem::replace(&mut self.slot, Slot::Done) else {
            unreachable!("checked above");
        };
        self.status = TaskStatus::Completed;
        let outcome = handle
            .await
            .map_err(|e| WfeError::Exec(format!("native task '{}' panicked: {e}", self.name)))?;
        Ok(Some(match outcome {
            Ok(value) => TaskResult {
                exit_status: None,
                stdout: Some(TaskOutput::Value(value)),
                error: None,
            },
            Err(err) => TaskResult {
                exit_status: None,
                stdout: None,
                error: Some(err),
            },
        }))
    }

    async fn kill(&mut self) {
        if let Slot::Running(handle) = &self.slot {
            handle.abort();
        }
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn task(&self) -> &TaskRun {
        &self.placeholder
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Native
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskHandler;

    #[tokio::test]
    async fn successful_closure_yields_value_output() {
        let task = TaskRun::native("native1", "/tmp", Box::new(|| Ok(Box::new(7i32) as Box<dyn std::any::Any + Send>)));
        let mut handler = NativeTaskHandler::new(task).unwrap();
        handler.submit().await.unwrap();
        assert!(handler.check_if_running().await.unwrap());
        let result = loop {
            if let Some(r) = handler.check_if_completed().await.unwrap() {
                break r;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        };
        assert!(matches!(result.stdout, Some(TaskOutput::Value(_))));
        assert!(result.error.is_none());
        assert_eq!(handler.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn failing_closure_yields_error_output() {
        let task = TaskRun::native(
            "native2",
            "/tmp",
            Box::new(|| Err(wfe_core::NativeError("boom".to_string()))),
        );
        let mut handler = NativeTaskHandler::new(task).unwrap();
        handler.submit().await.unwrap();
        let result = loop {
            if let Some(r) = handler.check_if_completed().await.unwrap() {
                break r;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        };
        assert!(result.stdout.is_none());
        assert!(result.error.is_some());
    }
}
