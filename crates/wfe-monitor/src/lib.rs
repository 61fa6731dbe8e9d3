//! `TaskPollingMonitor`: the single polling loop a session's executor
//! hands every submitted task to (spec §4.3). One monitor owns a bounded
//! admission queue, a dedicated background poll task, and periodic
//! diagnostics dumps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore};
use tracing::info;
use wfe_config::ExecutorSettings;
use wfe_core::{TaskResult, WfeError};
use wfe_handler::TaskHandler;

type CompletionCallback = Box<dyn FnOnce(TaskResult) + Send>;

struct Entry {
    handler: Box<dyn TaskHandler>,
    on_complete: Option<CompletionCallback>,
    admitted_at: Instant,
    _permit: OwnedSemaphorePermit,
}

struct Inner {
    active: Vec<Entry>,
    last_dump: Instant,
}

/// Polls every admitted task's handler to completion, bounding how many
/// tasks may be in flight at once (spec §4.3 "queueSize").
pub struct TaskPollingMonitor {
    inner: Arc<Mutex<Inner>>,
    semaphore: Arc<Semaphore>,
    settings: ExecutorSettings,
    shutdown: Arc<Notify>,
    shutting_down: Arc<AtomicBool>,
    poll_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    label: String,
}

impl TaskPollingMonitor {
    pub fn new(label: impl Into<String>, settings: ExecutorSettings) -> Arc<Self> {
        let label = label.into();
        let inner = Arc::new(Mutex::new(Inner { active: Vec::new(), last_dump: Instant::now() }));
        let semaphore = Arc::new(Semaphore::new(settings.queue_size.max(1)));
        let shutdown = Arc::new(Notify::new());

        let monitor = Arc::new(Self {
            inner: Arc::clone(&inner),
            semaphore,
            settings,
            shutdown: Arc::clone(&shutdown),
            shutting_down: Arc::new(AtomicBool::new(false)),
            poll_task: Mutex::new(None),
            label,
        });

        let poll_label = monitor.label.clone();
        let poll_inner = Arc::clone(&inner);
        let poll_interval = settings.poll_interval;
        let dump_interval = settings.dump_interval;
        let handle = tokio::spawn(async move {
            poll_loop(poll_label, poll_inner, poll_interval, dump_interval, shutdown).await;
        });
        // Safe: no other task can observe `monitor` before this returns.
        if let Ok(mut guard) = monitor.poll_task.try_lock() {
            *guard = Some(handle);
        }

        monitor
    }

    /// Admit a task, blocking until a queue slot is free. Submits the
    /// handler immediately on admission; `on_complete` fires once, from
    /// the poll loop, when the handler reports completion.
    pub async fn schedule(
        &self,
        mut handler: Box<dyn TaskHandler>,
        on_complete: impl FnOnce(TaskResult) + Send + 'static,
    ) -> Result<(), WfeError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(WfeError::Shutdown);
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| WfeError::Shutdown)?;

        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(WfeError::Shutdown);
        }

        handler.submit().await?;

        let entry = Entry {
            handler,
            on_complete: Some(Box::new(on_complete)),
            admitted_at: Instant::now(),
            _permit: permit,
        };
        self.inner.lock().await.active.push(entry);
        Ok(())
    }

    /// Number of admission-queue slots not currently occupied by an
    /// in-flight task.
    pub fn available_capacity(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn settings(&self) -> ExecutorSettings {
        self.settings
    }

    /// Kill every in-flight handler, drain their completion callbacks with
    /// a synthetic error result (spec §4.3/§5: "abandoned with an error
    /// status"), and stop the poll loop. Idempotent; a second call is a
    /// no-op.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let abandoned = {
            let mut inner = self.inner.lock().await;
            for entry in &mut inner.active {
                entry.handler.kill().await;
            }
            std::mem::take(&mut inner.active)
        };

        self.shutdown.notify_waiters();

        for mut entry in abandoned {
            if let Some(cb) = entry.on_complete.take() {
                cb(force_completed_result(&WfeError::Shutdown));
            }
        }

        let handle = self.poll_task.lock().await.take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }
}

/// Build the `TaskResult` a handler is force-completed with when a
/// `check*` call errors or the monitor abandons it at shutdown (spec §7,
/// `ExecError`/`ShutdownError`: "record as handler's exit status; complete
/// the handler").
fn force_completed_result(err: &WfeError) -> TaskResult {
    TaskResult {
        exit_status: Some(wfe_core::synthetic_exit_code(err)),
        stdout: None,
        error: Some(wfe_core::NativeError(err.to_string())),
    }
}

async fn poll_loop(
    label: String,
    inner: Arc<Mutex<Inner>>,
    poll_interval: Duration,
    dump_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_once(&label, &inner, dump_interval).await;
            }
            _ = shutdown.notified() => {
                break;
            }
        }
    }
}

async fn poll_once(label: &str, inner: &Arc<Mutex<Inner>>, dump_interval: Duration) {
    let mut inner = inner.lock().await;
    let mut completed_indices = Vec::new();

    for (idx, entry) in inner.active.iter_mut().enumerate() {
        let running = match entry.handler.check_if_running().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(executor = label, error = %e, "check_if_running failed");
                entry.handler.kill().await;
                completed_indices.push((idx, force_completed_result(&e)));
                continue;
            }
        };
        if !running {
            continue;
        }
        match entry.handler.check_if_completed().await {
            Ok(Some(result)) => completed_indices.push((idx, result)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(executor = label, error = %e, "check_if_completed failed");
                entry.handler.kill().await;
                completed_indices.push((idx, force_completed_result(&e)));
            }
        }
    }

    // Remove back-to-front so earlier indices stay valid, preserving the
    // relative order of everything still active.
    let mut finished = Vec::with_capacity(completed_indices.len());
    for (idx, result) in completed_indices.into_iter().rev() {
        finished.push((inner.active.remove(idx), result));
    }

    if inner.last_dump.elapsed() >= dump_interval {
        let (mut submitted, mut running) = (0usize, 0usize);
        for entry in &inner.active {
            match entry.handler.status() {
                wfe_core::TaskStatus::Submitted => submitted += 1,
                wfe_core::TaskStatus::Running => running += 1,
                _ => {}
            }
        }
        info!(
            executor = label,
            active = inner.active.len(),
            submitted,
            running,
            "task monitor diagnostics dump"
        );
        for entry in &inner.active {
            info!(
                executor = label,
                task = %entry.handler.task().name,
                status = %entry.handler.status(),
                kind = %entry.handler.kind(),
                elapsed_ms = entry.admitted_at.elapsed().as_millis() as u64,
                "active task"
            );
        }
        inner.last_dump = Instant::now();
    }

    drop(inner);

    for (mut entry, result) in finished.into_iter().rev() {
        if let Some(cb) = entry.on_complete.take() {
            cb(result);
        }
    }
}
