//! Session-level configuration resolution for the task execution
//! subsystem: duration parsing lives in `wfe-core`; this crate adds the
//! two-level executor-scoped lookup over a session config tree.

pub mod config;
pub mod merge;
pub mod path;

pub use config::{ExecutorDefaults, ExecutorSettings, SessionConfig};
pub use merge::merge_toml_values;
pub use path::expand_home;
