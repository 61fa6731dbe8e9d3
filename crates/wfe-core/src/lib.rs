//! Shared data model for the task execution subsystem: `TaskRun`,
//! `TaskConfig`, the `TaskStatus` state machine enum, duration
//! parsing, and the `BashWrapperBuilder` contract that handlers consume.

pub mod bash_wrapper;
pub mod duration;
pub mod error;
pub mod types;

pub use bash_wrapper::{BashWrapperBuilder, DefaultBashWrapperBuilder, FileMapping};
pub use duration::{format_duration, format_hms, parse_duration};
pub use error::WfeError;
pub use types::{
    NativeCode, NativeCodeResult, NativeError, TaskConfig, TaskKind, TaskOutput, TaskPayload,
    TaskResult, TaskRun, TaskStatus, sanitize_name, synthetic_exit_code,
};
