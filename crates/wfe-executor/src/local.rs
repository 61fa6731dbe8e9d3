//! `LocalExecutor`: runs SHELL tasks as direct child processes on this
//! host, NATIVE tasks on the shared blocking-task worker pool.

use std::sync::Arc;

use wfe_core::{BashWrapperBuilder, DefaultBashWrapperBuilder, TaskConfig, TaskKind, TaskRun, WfeError};
use wfe_handler::{LocalTaskHandler, NativeTaskHandler};
use wfe_monitor::TaskPollingMonitor;

use crate::{AbstractExecutor, CompletionCallback};

pub struct LocalExecutor {
    monitor: Arc<TaskPollingMonitor>,
    wrapper_builder: DefaultBashWrapperBuilder,
}

impl LocalExecutor {
    pub fn new(monitor: Arc<TaskPollingMonitor>) -> Self {
        Self { monitor, wrapper_builder: DefaultBashWrapperBuilder }
    }
}

#[async_trait::async_trait]
impl AbstractExecutor for LocalExecutor {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn submit(
        &self,
        task: TaskRun,
        config: TaskConfig,
        on_complete: CompletionCallback,
    ) -> Result<(), WfeError> {
        if task.kind() == TaskKind::Native {
            let handler = NativeTaskHandler::new(task)?;
            return self.monitor.schedule(Box::new(handler), on_complete).await;
        }

        self.wrapper_builder.build(&task, &config.effective_shell(), &[], &[])?;
        let wrapper_path = task.cmd_wrapper_file();
        let handler = LocalTaskHandler::new(task, config, wrapper_path);
        self.monitor.schedule(Box::new(handler), on_complete).await
    }

    fn monitor(&self) -> &Arc<TaskPollingMonitor> {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    fn settings() -> wfe_config::ExecutorSettings {
        wfe_config::ExecutorSettings {
            queue_size: 4,
            poll_interval: std::time::Duration::from_millis(5),
            queue_stat_interval: std::time::Duration::from_secs(60),
            dump_interval: std::time::Duration::from_secs(600),
            exit_read_timeout: std::time::Duration::from_secs(90),
        }
    }

    /// Surfaces the local handler's `warn!` on maxDuration kill and the
    /// monitor's dump events when a test is run with `--nocapture`,
    /// matching the teacher's practice of wiring a subscriber in tests
    /// rather than letting `tracing` events vanish silently.
    fn init_tracing() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        });
    }

    #[tokio::test]
    async fn runs_echo_and_captures_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = TaskPollingMonitor::new("local", settings());
        let executor = LocalExecutor::new(monitor);

        let task = TaskRun::shell("echo-task", dir.path(), "echo hi");
        let (tx, rx) = tokio::sync::oneshot::channel();
        executor
            .submit(task, TaskConfig::default(), Box::new(move |r| {
                let _ = tx.send(r);
            }))
            .await
            .unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), rx)
            .await
            .expect("task completed in time")
            .unwrap();
        assert_eq!(result.exit_status, Some(0));
        executor.monitor().shutdown().await;
    }

    #[tokio::test]
    async fn max_duration_kills_long_running_task() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let monitor = TaskPollingMonitor::new("local", settings());
        let executor = LocalExecutor::new(monitor);

        let task = TaskRun::shell("sleepy", dir.path(), "sleep 30");
        let config = TaskConfig {
            max_duration: Some(std::time::Duration::from_millis(50)),
            ..TaskConfig::default()
        };
        let (tx, rx) = tokio::sync::oneshot::channel();
        executor
            .submit(task, config, Box::new(move |r| {
                let _ = tx.send(r);
            }))
            .await
            .unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), rx)
            .await
            .expect("watchdog kills task within the timeout")
            .unwrap();
        // Killed via SIGKILL rather than exiting on its own: either the OS
        // reports a signal-terminated status (no code) or the synthesized
        // sentinel from the grace-period fallback.
        assert_ne!(result.exit_status, Some(0));
        executor.monitor().shutdown().await;
    }
}
