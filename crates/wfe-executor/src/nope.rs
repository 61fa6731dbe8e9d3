//! `NopeExecutor`: the no-backend test double (spec §9 Open Question).
//! Every submitted task, SHELL or NATIVE, becomes a `NopeTaskHandler`
//! that completes on its first poll — no process, no closure, no grid
//! command ever runs.

use std::sync::Arc;

use wfe_core::{TaskConfig, TaskRun, WfeError};
use wfe_handler::NopeTaskHandler;
use wfe_monitor::TaskPollingMonitor;

use crate::{AbstractExecutor, CompletionCallback};

pub struct NopeExecutor {
    monitor: Arc<TaskPollingMonitor>,
}

impl NopeExecutor {
    pub fn new(monitor: Arc<TaskPollingMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait::async_trait]
impl AbstractExecutor for NopeExecutor {
    fn name(&self) -> &'static str {
        "nope"
    }

    async fn submit(
        &self,
        task: TaskRun,
        _config: TaskConfig,
        on_complete: CompletionCallback,
    ) -> Result<(), WfeError> {
        let handler = NopeTaskHandler::new(task);
        self.monitor.schedule(Box::new(handler), on_complete).await
    }

    fn monitor(&self) -> &Arc<TaskPollingMonitor> {
        &self.monitor
    }
}
