//! SGE (Sun/Son of Grid Engine) concrete shaping rules (spec §4.4).

use std::path::Path;

use tracing::warn;
use wfe_core::{TaskConfig, TaskRun, WfeError, format_hms};

use crate::status::{QueueStatus, QueueStatusMap};
use crate::GridExecutor;

/// SGE backend: `qsub`/`qdel`/`qstat` text contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct SgeExecutor;

impl GridExecutor for SgeExecutor {
    fn name(&self) -> &'static str {
        "sge"
    }

    fn submit_command_line(&self, task: &TaskRun, config: &TaskConfig, wrapper_path: &Path) -> Vec<String> {
        let mut cmd = vec![
            "qsub".to_string(),
            "-wd".to_string(),
            task.work_directory.display().to_string(),
            "-N".to_string(),
            format!("nf-{}", task.sanitized_name()),
            "-o".to_string(),
            "/dev/null".to_string(),
            "-j".to_string(),
            "y".to_string(),
            "-terse".to_string(),
            "-V".to_string(),
        ];

        if let Some(queue) = &config.queue {
            cmd.push("-q".to_string());
            cmd.push(queue.clone());
        }

        if let Some(max_duration) = config.max_duration {
            cmd.push("-l".to_string());
            cmd.push(format!("h_rt={}", format_hms(max_duration)));
        }

        if let Some(max_memory) = &config.max_memory {
            cmd.push("-l".to_string());
            cmd.push(format!("virtual_free={}", strip_trailing_b(max_memory)));
        }

        for token in config.cluster_option_tokens() {
            cmd.push(token.to_string());
        }

        let basename = wrapper_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| wrapper_path.display().to_string());
        cmd.push(basename);

        cmd
    }

    fn parse_job_id(&self, submit_output: &str) -> Result<String, WfeError> {
        submit_output
            .split_whitespace()
            .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
            .last()
            .map(str::to_string)
            .ok_or_else(|| WfeError::Parse(format!("no job id found in qsub output: {submit_output:?}")))
    }

    fn kill_task_command(&self, job_id: &str) -> Vec<String> {
        vec!["qdel".to_string(), "-j".to_string(), job_id.to_string()]
    }

    fn queue_status_command(&self, queue: Option<&str>) -> Vec<String> {
        match queue {
            Some(q) => vec!["qstat".to_string(), "-q".to_string(), q.to_string()],
            None => vec!["qstat".to_string()],
        }
    }

    fn parse_queue_status(&self, text: &str) -> QueueStatusMap {
        let mut map = QueueStatusMap::new();
        let mut past_header = false;
        for line in text.lines() {
            if !past_header {
                if line.trim_start().starts_with("---") {
                    past_header = true;
                }
                continue;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (Some(job_id), Some(state_code)) = (fields.first(), fields.get(4)) else {
                warn!(line, "skipping malformed qstat line");
                continue;
            };
            map.insert(job_id.to_string(), classify_state(state_code));
        }
        map
    }
}

fn classify_state(code: &str) -> QueueStatus {
    match code {
        "r" | "t" | "s" | "R" => QueueStatus::Running,
        "qw" => QueueStatus::Pending,
        "hqw" | "hRwq" => QueueStatus::Hold,
        other if other == "Eqw" || other.starts_with('E') => QueueStatus::Error,
        _ => QueueStatus::Unknown,
    }
}

fn strip_trailing_b(value: &str) -> String {
    if let Some(stripped) = value.strip_suffix('B') {
        stripped.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_task(work_dir: &str, name: &str) -> TaskRun {
        TaskRun::shell(name, work_dir, "echo hi")
    }

    #[test]
    fn submit_shaping_matches_spec_scenario_1() {
        let task = sample_task("/abc", "task x");
        let config = TaskConfig {
            queue: Some("my-queue".to_string()),
            max_memory: Some("2GB".to_string()),
            max_duration: Some(Duration::from_secs(3 * 3600)),
            cluster_options: Some("-extra opt".to_string()),
            ..TaskConfig::default()
        };
        let cmd = SgeExecutor.submit_command_line(&task, &config, Path::new(".job.sh"));
        assert_eq!(
            cmd.join(" "),
            "qsub -wd /abc -N nf-task_x -o /dev/null -j y -terse -V -q my-queue -l h_rt=03:00:00 -l virtual_free=2G -extra opt .job.sh"
        );
    }

    #[test]
    fn submit_shaping_omits_absent_options() {
        let task = sample_task("/abc", "plain");
        let config = TaskConfig::default();
        let cmd = SgeExecutor.submit_command_line(&task, &config, Path::new(".job.sh"));
        assert_eq!(
            cmd.join(" "),
            "qsub -wd /abc -N nf-plain -o /dev/null -j y -terse -V .job.sh"
        );
    }

    #[test]
    fn parse_job_id_takes_last_digit_token() {
        let id = SgeExecutor.parse_job_id("blah\n..\n6472\n").unwrap();
        assert_eq!(id, "6472");
    }

    #[test]
    fn parse_job_id_tolerates_preamble_on_same_line() {
        let id = SgeExecutor.parse_job_id("your job 6472 (\"task\") submitted").unwrap();
        assert_eq!(id, "6472");
    }

    #[test]
    fn parse_job_id_errors_when_absent() {
        assert!(SgeExecutor.parse_job_id("no digits here").is_err());
    }

    #[test]
    fn parse_job_id_takes_the_last_token_when_a_line_has_two() {
        let id = SgeExecutor.parse_job_id("6472 7000\n").unwrap();
        assert_eq!(id, "7000");
    }

    #[test]
    fn kill_command_is_qdel() {
        assert_eq!(
            SgeExecutor.kill_task_command("123"),
            vec!["qdel".to_string(), "-j".to_string(), "123".to_string()]
        );
    }

    #[test]
    fn queue_status_command_with_and_without_queue() {
        assert_eq!(SgeExecutor.queue_status_command(None), vec!["qstat"]);
        assert_eq!(
            SgeExecutor.queue_status_command(Some("short")),
            vec!["qstat".to_string(), "-q".to_string(), "short".to_string()]
        );
    }

    #[test]
    fn parse_queue_status_maps_five_states() {
        let text = "job-ID  prior   name       user    state submit/start at\n\
                     -----------------------------------------------------------\n\
                     7548318 0.50000 job1 user r 07/26/2026 00:00:00 all.q@node1\n\
                     7548348 0.50000 job2 user r 07/26/2026 00:00:00 all.q@node2\n\
                     7548349 0.50000 job3 user hqw 07/26/2026 00:00:00\n\
                     7548904 0.50000 job4 user qw 07/26/2026 00:00:00\n\
                     7548960 0.50000 job5 user Eqw 07/26/2026 00:00:00\n";
        let map = SgeExecutor.parse_queue_status(text);
        assert_eq!(map.len(), 5);
        assert_eq!(map["7548318"], QueueStatus::Running);
        assert_eq!(map["7548348"], QueueStatus::Running);
        assert_eq!(map["7548349"], QueueStatus::Hold);
        assert_eq!(map["7548904"], QueueStatus::Pending);
        assert_eq!(map["7548960"], QueueStatus::Error);
    }

    #[test]
    fn virtual_free_strips_trailing_b_only() {
        assert_eq!(strip_trailing_b("2GB"), "2G");
        assert_eq!(strip_trailing_b("500MB"), "500M");
        assert_eq!(strip_trailing_b("2G"), "2G");
    }
}
