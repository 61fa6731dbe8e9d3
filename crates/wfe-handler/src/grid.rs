//! Grid-backend task handler (spec §4.2, "Grid handler"): submits via a
//! `GridExecutor`'s shaped command, tracks the backend job id, and polls a
//! shared `QueueStatusCache` instead of shelling out per task.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::warn;
use wfe_core::{TaskConfig, TaskOutput, TaskResult, TaskRun, TaskStatus, WfeError};
use wfe_grid::{GridExecutor, QueueStatus, QueueStatusCache};

use crate::HandlerKind;

/// Runs a SHELL task on a grid scheduler backend `G` (e.g. SGE).
pub struct GridTaskHandler<G: GridExecutor> {
    task: TaskRun,
    config: TaskConfig,
    wrapper_path: PathBuf,
    executor: G,
    cache: Arc<QueueStatusCache<G>>,
    exit_read_timeout: Duration,
    status: TaskStatus,
    job_id: Option<String>,
    vanished_at: Option<Instant>,
}

impl<G: GridExecutor> GridTaskHandler<G> {
    pub fn new(
        task: TaskRun,
        config: TaskConfig,
        wrapper_path: PathBuf,
        executor: G,
        cache: Arc<QueueStatusCache<G>>,
        exit_read_timeout: Duration,
    ) -> Self {
        Self {
            task,
            config,
            wrapper_path,
            executor,
            cache,
            exit_read_timeout,
            status: TaskStatus::New,
            job_id: None,
            vanished_at: None,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }
}

#[async_trait::async_trait]
impl<G: GridExecutor> crate::TaskHandler for GridTaskHandler<G> {
    async fn submit(&mut self) -> Result<(), WfeError> {
        let argv = self.executor.submit_command_line(&self.task, &self.config, &self.wrapper_path);
        let Some((program, args)) = argv.split_first() else {
            return Err(WfeError::Submit("empty submit command line".to_string()));
        };
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.task.work_directory)
            .output()
            .await
            .map_err(|e| WfeError::Submit(format!("failed to run '{program}': {e}")))?;

        if !output.status.success() {
            return Err(WfeError::Submit(format!(
                "{} exited with {}: {}",
                self.executor.name(),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let job_id = self.executor.parse_job_id(&stdout)?;
        self.job_id = Some(job_id);
        self.status = TaskStatus::Submitted;
        Ok(())
    }

    async fn check_if_running(&mut self) -> Result<bool, WfeError> {
        let Some(job_id) = self.job_id.clone() else {
            return Ok(false);
        };
        match self.cache.status_of(&job_id).await {
            Some(QueueStatus::Pending) | Some(QueueStatus::Hold) => Ok(false),
            _ => {
                // Running, Error, Unknown, or vanished from the queue
                // report (already finished) all mean "not merely queued".
                self.status = TaskStatus::Running;
                Ok(true)
            }
        }
    }

    async fn check_if_completed(&mut self) -> Result<Option<TaskResult>, WfeError> {
        let exit_file = self.task.cmd_exit_file();
        if let Ok(text) = tokio::fs::read_to_string(&exit_file).await {
            let exit_code = text.trim().parse::<i32>().unwrap_or(143);
            self.status = TaskStatus::Completed;
            return Ok(Some(TaskResult {
                exit_status: Some(exit_code),
                stdout: Some(TaskOutput::Path(self.task.cmd_output_file())),
                error: None,
            }));
        }

        let Some(job_id) = self.job_id.clone() else {
            return Ok(None);
        };
        let still_queued = matches!(
            self.cache.status_of(&job_id).await,
            Some(QueueStatus::Running) | Some(QueueStatus::Pending) | Some(QueueStatus::Hold)
        );
        if still_queued {
            self.vanished_at = None;
            return Ok(None);
        }

        let vanished_at = *self.vanished_at.get_or_insert_with(Instant::now);
        if vanished_at.elapsed() < self.exit_read_timeout {
            return Ok(None);
        }

        warn!(
            task = %self.task.name,
            job_id,
            "exit file never appeared within exitReadTimeout after job left the queue"
        );
        self.status = TaskStatus::Completed;
        Ok(Some(TaskResult {
            exit_status: Some(143),
            stdout: Some(TaskOutput::Path(self.task.cmd_output_file())),
            error: None,
        }))
    }

    async fn kill(&mut self) {
        let Some(job_id) = &self.job_id else { return };
        let argv = self.executor.kill_task_command(job_id);
        let Some((program, args)) = argv.split_first() else { return };
        if let Err(e) = Command::new(program).args(args).output().await {
            warn!(error = %e, job_id, "failed to send kill command to grid backend");
        }
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn task(&self) -> &TaskRun {
        &self.task
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Grid
    }
}
