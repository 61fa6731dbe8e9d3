//! Grid job state, shared by every `GridExecutor` implementation.

use std::collections::HashMap;

/// A backend job's reported state (spec §4.4 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    Running,
    Pending,
    Hold,
    Error,
    Unknown,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "RUNNING",
            Self::Pending => "PENDING",
            Self::Hold => "HOLD",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Map of backend job id to its last-observed status.
pub type QueueStatusMap = HashMap<String, QueueStatus>;
