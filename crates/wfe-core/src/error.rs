//! Domain error kinds for the task execution subsystem (see spec §7).

/// Errors surfaced by the task execution subsystem.
///
/// Each variant corresponds to one row of the error-handling table:
/// configuration errors fail fast at session start, submit errors
/// propagate to the caller of `schedule`, exec/parse/timeout errors are
/// absorbed by the handler that produced them, and shutdown errors
/// reject admission after the monitor has begun stopping.
#[derive(thiserror::Error, Debug)]
pub enum WfeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("submit failed: {0}")]
    Submit(String),

    #[error("execution failed: {0}")]
    Exec(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("monitor is shutting down, cannot admit new task")]
    Shutdown,
}

impl WfeError {
    /// Best-effort classification of a lower-level error raised while
    /// spawning or waiting on a backend, used by handlers that need to
    /// record a `WfeError` without losing the original context.
    pub fn exec(err: impl std::fmt::Display) -> Self {
        Self::Exec(err.to_string())
    }
}
