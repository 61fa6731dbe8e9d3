//! `BashWrapperBuilder` contract consumed by handlers (spec §4.5).
//!
//! The content-addressed hashing and dataflow-driven staging/output file
//! lists are supplied by the caller — out of scope per spec §1. This
//! module only owns the wrapper script text and where it is written.

use std::io::Write;
use std::path::PathBuf;

use crate::error::WfeError;
use crate::types::{TaskPayload, TaskRun};

/// One staged input or collected output: `(source, destination)`.
pub type FileMapping = (PathBuf, PathBuf);

/// Producer of the wrapper script and work-folder layout.
///
/// A handler's contract is to treat the files this trait writes as
/// authoritative signals: once `cmd_exit_file` exists, the task is
/// completed and its contents are the exit code.
pub trait BashWrapperBuilder {
    /// Write `task.cmd_wrapper_file()` under `task.work_directory`.
    ///
    /// The wrapper must, in order: (a) run the staging prologue, (b) run
    /// the user script with combined output redirected to
    /// `task.cmd_output_file()`, (c) write the exit code atomically to
    /// `task.cmd_exit_file()`, (d) run the unstaging epilogue.
    fn build(
        &self,
        task: &TaskRun,
        shell: &[String],
        staged_inputs: &[FileMapping],
        collected_outputs: &[FileMapping],
    ) -> Result<(), WfeError>;
}

/// Default wrapper: a POSIX `sh` script using `trap` plus a
/// write-then-rename for atomic exit code delivery.
pub struct DefaultBashWrapperBuilder;

impl BashWrapperBuilder for DefaultBashWrapperBuilder {
    fn build(
        &self,
        task: &TaskRun,
        shell: &[String],
        staged_inputs: &[FileMapping],
        collected_outputs: &[FileMapping],
    ) -> Result<(), WfeError> {
        let script = match &task.payload {
            TaskPayload::Shell { script } => script.as_str(),
            TaskPayload::Native { .. } => {
                return Err(WfeError::Config(
                    "BashWrapperBuilder only applies to SHELL tasks".to_string(),
                ));
            }
        };

        let out_file = task.cmd_output_file();
        let exit_file = task.cmd_exit_file();
        let exit_file_tmp = exit_file.with_extension("exitcode.tmp");
        let shell_bin = shell.first().map(String::as_str).unwrap_or("bash");

        let mut body = String::new();
        body.push_str("#!/bin/sh\n");
        body.push_str("# staging prologue\n");
        for (src, dest) in staged_inputs {
            body.push_str(&format!(
                "ln -sf {} {} 2>/dev/null || cp -r {} {}\n",
                shell_quote(src),
                shell_quote(dest),
                shell_quote(src),
                shell_quote(dest),
            ));
        }
        body.push_str(&format!(
            "exec > {} 2>&1\n",
            shell_quote(&out_file)
        ));
        body.push_str(&format!("{shell_bin} -c {}\n", shell_quote_str(script)));
        body.push_str("wfe_exit_code=$?\n");
        body.push_str(&format!(
            "printf '%s' \"$wfe_exit_code\" > {}\n",
            shell_quote(&exit_file_tmp)
        ));
        body.push_str(&format!(
            "mv {} {}\n",
            shell_quote(&exit_file_tmp),
            shell_quote(&exit_file)
        ));
        body.push_str("# unstaging epilogue\n");
        for (src, dest) in collected_outputs {
            body.push_str(&format!(
                "mv {} {} 2>/dev/null || cp -r {} {}\n",
                shell_quote(src),
                shell_quote(dest),
                shell_quote(src),
                shell_quote(dest),
            ));
        }
        body.push_str("exit \"$wfe_exit_code\"\n");

        std::fs::create_dir_all(&task.work_directory)
            .map_err(|e| WfeError::Exec(format!("failed to create work directory: {e}")))?;

        let wrapper_path = task.cmd_wrapper_file();
        let mut file = std::fs::File::create(&wrapper_path)
            .map_err(|e| WfeError::Exec(format!("failed to create wrapper script: {e}")))?;
        file.write_all(body.as_bytes())
            .map_err(|e| WfeError::Exec(format!("failed to write wrapper script: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file
                .metadata()
                .map_err(|e| WfeError::Exec(e.to_string()))?
                .permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&wrapper_path, perms)
                .map_err(|e| WfeError::Exec(e.to_string()))?;
        }

        Ok(())
    }
}

fn shell_quote(path: &std::path::Path) -> String {
    shell_quote_str(&path.display().to_string())
}

fn shell_quote_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskRun;

    #[test]
    fn wrapper_script_contains_exit_code_capture_and_redirection() {
        let dir = tempfile::tempdir().unwrap();
        let task = TaskRun::shell("t", dir.path(), "echo hello");
        DefaultBashWrapperBuilder
            .build(&task, &["bash".to_string()], &[], &[])
            .unwrap();

        let contents = std::fs::read_to_string(task.cmd_wrapper_file()).unwrap();
        assert!(contents.contains("wfe_exit_code=$?"));
        assert!(contents.contains(".command.out"));
        assert!(contents.contains("mv"));
        assert!(contents.contains("echo hello"));
    }

    #[test]
    fn rejects_native_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let task = TaskRun::native("t", dir.path(), Box::new(|| Ok(Box::new(()) as _)));
        let err = DefaultBashWrapperBuilder
            .build(&task, &["bash".to_string()], &[], &[])
            .unwrap_err();
        assert!(err.to_string().contains("SHELL"));
    }
}
