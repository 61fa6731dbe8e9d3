//! Local-process task handler (spec §4.2, "LocalProcess handler").

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::process::Child;
use tracing::warn;
use wfe_core::{TaskConfig, TaskOutput, TaskResult, TaskRun, TaskStatus, WfeError};

use crate::HandlerKind;

const KILL_GRACE: Duration = Duration::from_secs(5);

/// Runs a SHELL task's wrapper script as a direct child of this process.
pub struct LocalTaskHandler {
    task: TaskRun,
    config: TaskConfig,
    wrapper_path: PathBuf,
    status: TaskStatus,
    child: Option<Child>,
    submitted_at: Option<Instant>,
}

impl LocalTaskHandler {
    pub fn new(task: TaskRun, config: TaskConfig, wrapper_path: PathBuf) -> Self {
        Self {
            task,
            config,
            wrapper_path,
            status: TaskStatus::New,
            child: None,
            submitted_at: None,
        }
    }
}

#[async_trait::async_trait]
impl crate::TaskHandler for LocalTaskHandler {
    async fn submit(&mut self) -> Result<(), WfeError> {
        let stdin = self.task.stdin.clone();
        let child = wfe_process::spawn_wrapper(
            &self.task.work_directory,
            &self.config.effective_shell(),
            &self.wrapper_path,
            stdin,
        )
        .await
        .map_err(|e| WfeError::Submit(e.to_string()))?;
        self.child = Some(child);
        self.submitted_at = Some(Instant::now());
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
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };

        match child.try_wait().map_err(WfeError::exec)? {
            Some(exit_status) => {
                let exit_code = exit_status.code().unwrap_or(143);
                self.status = TaskStatus::Completed;
                self.child = None;
                Ok(Some(TaskResult {
                    exit_status: Some(exit_code),
                    stdout: Some(TaskOutput::Path(self.task.cmd_output_file())),
                    error: None,
                }))
            }
            None => {
                let submitted_at = self.submitted_at.expect("submitted_at set before spawn");
                if !wfe_process::duration_exceeded(submitted_at, self.config.max_duration) {
                    return Ok(None);
                }
                warn!(task = %self.task.name, "killing local task: exceeded maxDuration");
                wfe_process::kill_process_group(child);
                let exit_code = wfe_process::wait_briefly(child, KILL_GRACE)
                    .await
                    .unwrap_or(143);
                self.status = TaskStatus::Completed;
                self.child = None;
                Ok(Some(TaskResult {
                    exit_status: Some(exit_code),
                    stdout: Some(TaskOutput::Path(self.task.cmd_output_file())),
                    error: None,
                }))
            }
        }
    }

    async fn kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            wfe_process::kill_process_group(child);
        } else {
            warn!(task = %self.task.name, "kill called with no active process");
        }
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn task(&self) -> &TaskRun {
        &self.task
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskHandler;

    fn write_wrapper(dir: &std::path::Path, body: &str) -> PathBuf {
        let path = dir.join(".command.sh");
        std::fs::write(&path, body).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    #[tokio::test]
    async fn completes_with_the_wrapper_script_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let wrapper = write_wrapper(dir.path(), "#!/bin/sh\nexit 3\n");
        let task = TaskRun::shell("t1", dir.path(), "exit 3");
        let mut handler = LocalTaskHandler::new(task, TaskConfig::default(), wrapper);

        handler.submit().await.unwrap();
        assert_eq!(handler.status(), TaskStatus::Submitted);
        assert!(handler.check_if_running().await.unwrap());
        assert_eq!(handler.status(), TaskStatus::Running);

        let result = loop {
            if let Some(r) = handler.check_if_completed().await.unwrap() {
                break r;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert_eq!(result.exit_status, Some(3));
        assert_eq!(handler.status(), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn max_duration_kills_a_long_running_task() {
        let dir = tempfile::tempdir().unwrap();
        let wrapper = write_wrapper(dir.path(), "#!/bin/sh\nsleep 30\n");
        let task = TaskRun::shell("t2", dir.path(), "sleep 30");
        let config = TaskConfig {
            max_duration: Some(Duration::from_millis(20)),
            ..TaskConfig::default()
        };
        let mut handler = LocalTaskHandler::new(task, config, wrapper);

        handler.submit().await.unwrap();
        handler.check_if_running().await.unwrap();

        let result = loop {
            tokio::time::sleep(Duration::from_millis(30)).await;
            if let Some(r) = handler.check_if_completed().await.unwrap() {
                break r;
            }
        };
        assert_eq!(handler.status(), TaskStatus::Completed);
        assert!(result.exit_status.is_some());
    }

    #[tokio::test]
    async fn kill_is_idempotent_after_completion() {
        let dir = tempfile::tempdir().unwrap();
        let wrapper = write_wrapper(dir.path(), "#!/bin/sh\nexit 0\n");
        let task = TaskRun::shell("t3", dir.path(), "exit 0");
        let mut handler = LocalTaskHandler::new(task, TaskConfig::default(), wrapper);

        handler.submit().await.unwrap();
        loop {
            if handler.check_if_completed().await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handler.kill().await;
        handler.kill().await;
    }
}
