//! The task data model (spec §3): `TaskRun`, `TaskConfig`, `TaskStatus`.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::WfeError;

/// A handler's lifecycle state. Transitions are monotonic forward-only;
/// `Completed` is absorbing (spec §3, TaskHandler invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    New,
    Submitted,
    Running,
    Completed,
}

impl TaskStatus {
    /// True once the handler has reached its absorbing state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
        };
        write!(f, "{s}")
    }
}

/// A unit of backend-independent work: either a shell script or a
/// deferred native closure (spec §3, `TaskRun.type`).
pub enum TaskPayload {
    Shell {
        script: String,
    },
    Native {
        /// Deferred computation. Invoked at most once by the handler that
        /// owns this `TaskRun`; captures both the return value and any
        /// raised error into a single discriminated result (spec §9).
        code: NativeCode,
    },
}

impl std::fmt::Debug for TaskPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shell { script } => f.debug_struct("Shell").field("script", script).finish(),
            Self::Native { .. } => f.debug_struct("Native").finish_non_exhaustive(),
        }
    }
}

/// An opaque callable handed to the native worker pool. Returns either a
/// boxed value on success or a `NativeError` on failure.
pub type NativeCode = Box<dyn FnOnce() -> NativeCodeResult + Send + 'static>;
pub type NativeCodeResult = Result<Box<dyn Any + Send>, NativeError>;

/// Captured failure from a native task's deferred computation.
#[derive(Debug, Clone)]
pub struct NativeError(pub String);

impl std::fmt::Display for NativeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NativeError {}

/// Output produced by a completed task (spec §3, `TaskRun.stdout`).
pub enum TaskOutput {
    /// SHELL tasks: path to the captured `.command.out` file.
    Path(PathBuf),
    /// NATIVE tasks: the in-memory return value.
    Value(Box<dyn Any + Send>),
}

/// Mutable result slot, populated by the owning handler at or before
/// `Completed` (spec §3 invariant: for NATIVE, exactly one of
/// `stdout`/`error` is set at completion).
#[derive(Default)]
pub struct TaskResult {
    pub exit_status: Option<i32>,
    pub stdout: Option<TaskOutput>,
    pub error: Option<NativeError>,
}

impl TaskResult {
    /// Holds for any completed SHELL task and for NATIVE tasks that
    /// obey the "exactly one of stdout/error" invariant.
    pub fn is_consistent(&self, kind: TaskKind) -> bool {
        match kind {
            TaskKind::Shell => self.exit_status.is_some(),
            TaskKind::Native => self.stdout.is_some() ^ self.error.is_some(),
        }
    }
}

/// Discriminant mirroring `TaskPayload` without owning the payload,
/// used where only the kind (not the data) is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Shell,
    Native,
}

/// A single unit of work with its inputs and a work directory (spec §3).
pub struct TaskRun {
    pub name: String,
    pub work_directory: PathBuf,
    pub payload: TaskPayload,
    pub stdin: Option<Vec<u8>>,
    pub result: TaskResult,
}

impl TaskRun {
    pub fn shell(name: impl Into<String>, work_directory: impl Into<PathBuf>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            work_directory: work_directory.into(),
            payload: TaskPayload::Shell { script: script.into() },
            stdin: None,
            result: TaskResult::default(),
        }
    }

    pub fn native(name: impl Into<String>, work_directory: impl Into<PathBuf>, code: NativeCode) -> Self {
        Self {
            name: name.into(),
            work_directory: work_directory.into(),
            payload: TaskPayload::Native { code },
            stdin: None,
            result: TaskResult::default(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self.payload {
            TaskPayload::Shell { .. } => TaskKind::Shell,
            TaskPayload::Native { .. } => TaskKind::Native,
        }
    }

    /// Job name with every run of non-alphanumeric characters collapsed
    /// to a single underscore (spec §3). Used verbatim by every grid
    /// executor for job naming, not just SGE.
    pub fn sanitized_name(&self) -> String {
        sanitize_name(&self.name)
    }

    pub fn cmd_wrapper_file(&self) -> PathBuf {
        self.work_directory.join(".command.sh")
    }

    pub fn cmd_output_file(&self) -> PathBuf {
        self.work_directory.join(".command.out")
    }

    pub fn cmd_exit_file(&self) -> PathBuf {
        self.work_directory.join(".command.exitcode")
    }
}

/// Replace runs of non-alphanumeric characters with a single `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out
}

fn default_shell() -> Vec<String> {
    vec!["bash".to_string()]
}

/// Recognized per-task options (spec §3, `TaskConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub queue: Option<String>,
    pub max_memory: Option<String>,
    #[serde(default, with = "duration_opt_serde")]
    pub max_duration: Option<Duration>,
    pub cluster_options: Option<String>,
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,
    pub name: Option<String>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            queue: None,
            max_memory: None,
            max_duration: None,
            cluster_options: None,
            shell: default_shell(),
            name: None,
        }
    }
}

impl TaskConfig {
    /// Effective shell argv: falls back to `["bash"]` when the config
    /// supplies an explicitly empty list (spec is silent on this case;
    /// an empty argv would otherwise produce an unrunnable command).
    pub fn effective_shell(&self) -> Vec<String> {
        if self.shell.is_empty() {
            default_shell()
        } else {
            self.shell.clone()
        }
    }

    /// Cluster options split on whitespace, inserted verbatim into the
    /// grid submit command (spec §4.4).
    pub fn cluster_option_tokens(&self) -> Vec<&str> {
        self.cluster_options
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

mod duration_opt_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_str(&crate::duration::format_duration(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Millis(u64),
            None,
        }
        let repr = Option::<Repr>::deserialize(d)?;
        match repr {
            None | Some(Repr::None) => Ok(None),
            Some(Repr::Millis(ms)) => Ok(Some(Duration::from_millis(ms))),
            Some(Repr::Str(s)) => parse_duration(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Map a captured [`WfeError`] into a synthetic exit code, used when a
/// handler must complete a task without a real backend exit status
/// (timeout enforcement, exit-file read timeout — spec §4.2/§7).
pub fn synthetic_exit_code(_err: &WfeError) -> i32 {
    143
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_non_alphanumeric_runs() {
        assert_eq!(sanitize_name("task x"), "task_x");
        assert_eq!(sanitize_name("a--b__c"), "a_b_c");
        assert_eq!(sanitize_name("plain"), "plain");
    }

    #[test]
    fn status_ordering_is_monotonic() {
        assert!(TaskStatus::New < TaskStatus::Submitted);
        assert!(TaskStatus::Submitted < TaskStatus::Running);
        assert!(TaskStatus::Running < TaskStatus::Completed);
        assert!(TaskStatus::Completed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn path_helpers_are_rooted_in_work_directory() {
        let task = TaskRun::shell("t1", "/work/ab/cd1234", "echo hi");
        assert_eq!(task.cmd_wrapper_file(), PathBuf::from("/work/ab/cd1234/.command.sh"));
        assert_eq!(task.cmd_output_file(), PathBuf::from("/work/ab/cd1234/.command.out"));
        assert_eq!(task.cmd_exit_file(), PathBuf::from("/work/ab/cd1234/.command.exitcode"));
    }

    #[test]
    fn task_config_default_shell_is_bash() {
        let cfg = TaskConfig::default();
        assert_eq!(cfg.effective_shell(), vec!["bash".to_string()]);
    }

    #[test]
    fn empty_shell_list_falls_back_to_bash() {
        let cfg = TaskConfig {
            shell: vec![],
            ..TaskConfig::default()
        };
        assert_eq!(cfg.effective_shell(), vec!["bash".to_string()]);
    }

    #[test]
    fn cluster_options_split_on_whitespace() {
        let cfg = TaskConfig {
            cluster_options: Some("-extra opt".to_string()),
            ..TaskConfig::default()
        };
        assert_eq!(cfg.cluster_option_tokens(), vec!["-extra", "opt"]);
    }

    #[test]
    fn task_config_roundtrips_through_toml_with_string_duration() {
        let cfg = TaskConfig {
            queue: Some("my-queue".to_string()),
            max_memory: Some("2GB".to_string()),
            max_duration: Some(Duration::from_secs(3 * 3600)),
            cluster_options: Some("-extra opt".to_string()),
            shell: vec!["bash".to_string()],
            name: Some("task x".to_string()),
        };
        let text = toml::to_string(&cfg).unwrap();
        let back: TaskConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.max_duration, Some(Duration::from_secs(3 * 3600)));
        assert_eq!(back.queue.as_deref(), Some("my-queue"));
    }

    #[test]
    fn task_config_accepts_raw_millis_duration() {
        let toml_text = "max_duration = 1500\nshell = [\"bash\"]\n";
        let cfg: TaskConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(cfg.max_duration, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn native_result_invariant_requires_exactly_one_of_stdout_or_error() {
        let mut result = TaskResult::default();
        assert!(!result.is_consistent(TaskKind::Native));
        result.stdout = Some(TaskOutput::Value(Box::new(42i32)));
        assert!(result.is_consistent(TaskKind::Native));
        result.error = Some(NativeError("boom".to_string()));
        assert!(!result.is_consistent(TaskKind::Native));
    }
}
