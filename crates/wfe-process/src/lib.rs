//! Local process spawning, output capture, and `maxDuration` enforcement
//! for SHELL tasks executed directly on this host (spec §4.2, local handler).
//!
//! Grounded in the teacher's `spawn_tool`/`wait_and_capture` pair: a child
//! is spawned detached from blocking waits so the caller can poll it, stdin
//! is piped to a background task with warning-only failure handling, and a
//! duration watchdog mirrors the RSS-watcher poll-and-signal shape but keys
//! off wall-clock elapsed time instead of resident memory.

pub mod duration_watchdog;

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::warn;

pub use duration_watchdog::duration_exceeded;

/// Spawn `wrapper_path` (already built and made executable by the caller)
/// with `shell[0]` as its interpreter, rooted at `work_dir`.
///
/// The wrapper script owns its own output redirection to the task's
/// capture file (it performs `exec > ... 2>&1` internally), so this
/// function leaves the child's stdout/stderr as inherited-to-null; only
/// stdin is wired up here, piped in on a background task when present.
pub async fn spawn_wrapper(
    work_dir: &Path,
    shell: &[String],
    wrapper_path: &Path,
    stdin_data: Option<Vec<u8>>,
) -> Result<Child> {
    let shell_bin = shell.first().map(String::as_str).unwrap_or("bash");
    let mut cmd = Command::new(shell_bin);
    cmd.arg(wrapper_path);
    cmd.current_dir(work_dir);
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Make the child its own process group leader so `kill_process_group`'s
        // `kill(-pid, SIGKILL)` reaches it (and any grandchildren it spawns)
        // without touching our own group.
        cmd.process_group(0);
    }

    if stdin_data.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    let mut child = cmd.spawn().context("failed to spawn wrapper script")?;

    if let Some(data) = stdin_data {
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&data).await {
                    warn!(error = %e, "failed writing stdin to local task process");
                    return;
                }
                if let Err(e) = stdin.shutdown().await {
                    warn!(error = %e, "failed closing stdin to local task process");
                }
            });
        } else {
            warn!("stdin data was provided but no piped stdin handle was available");
        }
    }

    Ok(child)
}

/// Forcefully terminate a child's process group.
///
/// Mirrors the teacher's `kill_child_process_group`: send `SIGKILL` to the
/// negated PID (the process group) when the PID is known, falling back to
/// tokio's own `start_kill` otherwise.
pub fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: kill() is async-signal-safe; negative PID targets the group.
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
            return;
        }
    }
    let _ = child.start_kill();
}

/// Wait briefly for a child to report its exit after being killed, so a
/// genuine exit code is used when the kernel reaps it promptly.
pub async fn wait_briefly(child: &mut Child, grace: std::time::Duration) -> Option<i32> {
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => Some(status.code().unwrap_or(143)),
        _ => None,
    }
}
