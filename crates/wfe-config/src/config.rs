//! Session-level executor config resolution (spec §4.1, §6).
//!
//! The `executor` key is either a bare string (naming the executor to
//! use, no scoped settings) or a table. Within the table, per-executor
//! overrides live under a `$<name>` key (e.g. `$sge`); bare keys at the
//! top of the table are defaults shared across executors.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use wfe_core::WfeError;
use wfe_core::duration::parse_duration;

/// Top-level session configuration surface (spec §6).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    executor: Option<toml::Value>,
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, WfeError> {
        toml::from_str(text).map_err(|e| WfeError::Config(format!("invalid session config: {e}")))
    }

    /// Load from a file path, expanding a leading `~` against `HOME`
    /// first (spec §6). A missing file is a `ConfigError`, not silently
    /// treated as empty — unlike `TaskConfig` resolution, a session that
    /// names a config file expects it to exist.
    pub fn from_file(path: &str) -> Result<Self, WfeError> {
        let resolved = crate::path::expand_home(path);
        let text = Self::read_file(&resolved)
            .map_err(|e| WfeError::Config(format!("{e:#}")))?;
        Self::from_toml_str(&text)
    }

    fn read_file(resolved: &std::path::Path) -> anyhow::Result<String> {
        std::fs::read_to_string(resolved)
            .with_context(|| format!("failed to read session config '{}'", resolved.display()))
    }

    pub fn empty() -> Self {
        Self { executor: None }
    }

    /// True when `executor` is a bare string rather than a table — in
    /// this shape only caller-supplied defaults ever apply (spec §4.1).
    pub fn executor_is_bare_name(&self) -> bool {
        matches!(self.executor, Some(toml::Value::String(_)))
    }

    fn executor_table(&self) -> Option<&toml::value::Table> {
        self.executor.as_ref().and_then(|v| v.as_table())
    }

    fn resolve_raw<'a>(&'a self, executor_name: Option<&str>, param: &str) -> Option<&'a toml::Value> {
        let table = self.executor_table()?;
        if let Some(name) = executor_name {
            let scoped_key = format!("${name}");
            if let Some(scoped) = table.get(&scoped_key).and_then(|v| v.as_table()) {
                if let Some(value) = scoped.get(param) {
                    return Some(value);
                }
            }
        }
        table.get(param)
    }

    /// Generic resolver implementing the 3-step lookup in spec §4.1:
    /// executor-scoped, then executor-global, then the caller default.
    pub fn get_param<T, F>(&self, param: &str, executor_name: Option<&str>, default: T, convert: F) -> Result<T, WfeError>
    where
        F: FnOnce(&toml::Value) -> Result<T, WfeError>,
    {
        match self.resolve_raw(executor_name, param) {
            Some(value) => convert(value),
            None => Ok(default),
        }
    }

    pub fn get_queue_size(&self, executor_name: Option<&str>, default: usize) -> Result<usize, WfeError> {
        self.get_param("queueSize", executor_name, default, |v| {
            v.as_integer()
                .filter(|n| *n >= 0)
                .map(|n| n as usize)
                .ok_or_else(|| WfeError::Config(format!("queueSize must be a non-negative integer, got {v}")))
        })
    }

    pub fn get_poll_interval(&self, executor_name: Option<&str>, default: Duration) -> Result<Duration, WfeError> {
        self.get_duration("pollInterval", executor_name, default)
    }

    pub fn get_queue_stat_interval(&self, executor_name: Option<&str>, default: Duration) -> Result<Duration, WfeError> {
        self.get_duration("queueStatInterval", executor_name, default)
    }

    pub fn get_dump_interval(&self, executor_name: Option<&str>, default: Duration) -> Result<Duration, WfeError> {
        self.get_duration("dumpInterval", executor_name, default)
    }

    pub fn get_exit_read_timeout(&self, executor_name: Option<&str>, default: Duration) -> Result<Duration, WfeError> {
        self.get_duration("exitReadTimeout", executor_name, default)
    }

    fn get_duration(&self, param: &str, executor_name: Option<&str>, default: Duration) -> Result<Duration, WfeError> {
        self.get_param(param, executor_name, default, duration_from_toml_value)
    }
}

fn duration_from_toml_value(value: &toml::Value) -> Result<Duration, WfeError> {
    match value {
        toml::Value::String(s) => parse_duration(s),
        toml::Value::Integer(n) if *n >= 0 => Ok(Duration::from_millis(*n as u64)),
        other => Err(WfeError::Config(format!(
            "expected a duration string or non-negative integer, got {other}"
        ))),
    }
}

/// Caller-supplied fallbacks for `TaskPollingMonitor` construction
/// (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct ExecutorDefaults {
    pub queue_size: usize,
    pub poll_interval: Duration,
    pub queue_stat_interval: Duration,
    pub dump_interval: Duration,
    pub exit_read_timeout: Duration,
}

impl Default for ExecutorDefaults {
    fn default() -> Self {
        Self {
            queue_size: 100,
            poll_interval: Duration::from_millis(500),
            queue_stat_interval: Duration::from_secs(60),
            dump_interval: Duration::from_secs(5 * 60),
            exit_read_timeout: Duration::from_secs(90),
        }
    }
}

/// Fully resolved per-executor monitor settings.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorSettings {
    pub queue_size: usize,
    pub poll_interval: Duration,
    pub queue_stat_interval: Duration,
    pub dump_interval: Duration,
    pub exit_read_timeout: Duration,
}

impl SessionConfig {
    pub fn resolve_executor_settings(
        &self,
        executor_name: Option<&str>,
        defaults: ExecutorDefaults,
    ) -> Result<ExecutorSettings, WfeError> {
        Ok(ExecutorSettings {
            queue_size: self.get_queue_size(executor_name, defaults.queue_size)?,
            poll_interval: self.get_poll_interval(executor_name, defaults.poll_interval)?,
            queue_stat_interval: self.get_queue_stat_interval(executor_name, defaults.queue_stat_interval)?,
            dump_interval: self.get_dump_interval(executor_name, defaults.dump_interval)?,
            exit_read_timeout: self.get_exit_read_timeout(executor_name, defaults.exit_read_timeout)?,
        })
    }
}
