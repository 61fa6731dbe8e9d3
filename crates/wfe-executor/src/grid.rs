//! `GridSessionExecutor<G>`: submits SHELL tasks through a grid backend
//! (spec §4.4), NATIVE tasks still run on the local worker pool.

use std::sync::Arc;
use std::time::Duration;

use wfe_core::{BashWrapperBuilder, DefaultBashWrapperBuilder, TaskConfig, TaskKind, TaskRun, WfeError};
use wfe_grid::{GridExecutor, QueueStatusCache};
use wfe_handler::{GridTaskHandler, NativeTaskHandler};
use wfe_monitor::TaskPollingMonitor;

use crate::{AbstractExecutor, CompletionCallback};

pub struct GridSessionExecutor<G: GridExecutor + Clone + 'static> {
    monitor: Arc<TaskPollingMonitor>,
    grid: G,
    cache: Arc<QueueStatusCache<G>>,
    wrapper_builder: DefaultBashWrapperBuilder,
    exit_read_timeout: Duration,
}

impl<G: GridExecutor + Clone + 'static> GridSessionExecutor<G> {
    pub fn new(
        monitor: Arc<TaskPollingMonitor>,
        grid: G,
        queue: Option<String>,
        queue_stat_interval: Duration,
        exit_read_timeout: Duration,
    ) -> Self {
        let cache = Arc::new(QueueStatusCache::new(grid.clone(), queue, queue_stat_interval));
        Self { monitor, grid, cache, wrapper_builder: DefaultBashWrapperBuilder, exit_read_timeout }
    }
}

#[async_trait::async_trait]
impl<G: GridExecutor + Clone + 'static> AbstractExecutor for GridSessionExecutor<G> {
    fn name(&self) -> &'static str {
        self.grid.name()
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
        let handler = GridTaskHandler::new(
            task,
            config,
            wrapper_path,
            self.grid.clone(),
            Arc::clone(&self.cache),
            self.exit_read_timeout,
        );
        self.monitor.schedule(Box::new(handler), on_complete).await
    }

    fn monitor(&self) -> &Arc<TaskPollingMonitor> {
        &self.monitor
    }
}
