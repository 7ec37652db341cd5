//! Lint runner adapter for `pre-commit`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument};

use crate::io::process::{CommandOutput, run_command};

/// Which files the lint run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintScope {
    /// Files staged in the version-control index (default hook behavior).
    Staged,
    /// All tracked files.
    AllFiles,
}

impl LintScope {
    pub fn from_all_files(all_files: bool) -> Self {
        if all_files {
            Self::AllFiles
        } else {
            Self::Staged
        }
    }
}

/// Parameters for one lint invocation.
#[derive(Debug, Clone)]
pub struct LintRequest {
    /// Working directory for the lint process.
    pub workdir: PathBuf,
    /// Base argv; the scope flag is appended.
    pub command: Vec<String>,
    pub scope: LintScope,
    /// Variables layered over the inherited environment.
    pub env_overlay: Vec<(String, String)>,
    /// Path to write the captured lint output.
    pub log_path: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

/// Outcome of one lint run.
#[derive(Debug, Clone)]
pub struct LintOutcome {
    pub exit_code: i32,
    /// Stdout and stderr, concatenated.
    pub combined_output: String,
}

impl LintOutcome {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Abstraction over the lint tool so the loop can be driven by scripted
/// outcomes in tests.
pub trait LintRunner {
    fn run(&self, request: &LintRequest) -> Result<LintOutcome>;
}

/// Lint runner that spawns the configured `pre-commit` command.
pub struct PreCommitRunner;

impl LintRunner for PreCommitRunner {
    #[instrument(skip_all, fields(scope = ?request.scope))]
    fn run(&self, request: &LintRequest) -> Result<LintOutcome> {
        let argv = lint_argv(&request.command, request.scope);
        let program = argv
            .first()
            .ok_or_else(|| anyhow!("lint command is empty"))?;
        info!(command = ?argv, "running lint");

        let mut cmd = Command::new(program);
        cmd.args(&argv[1..]).current_dir(&request.workdir);
        for (key, value) in &request.env_overlay {
            cmd.env(key, value);
        }

        let output = run_command(cmd, None, request.timeout, request.output_limit_bytes)
            .with_context(|| format!("run lint command {argv:?}"))?;
        write_lint_log(&request.log_path, &output)?;

        debug!(exit_code = output.exit_code(), "lint finished");
        Ok(LintOutcome {
            exit_code: output.exit_code(),
            combined_output: output.combined(),
        })
    }
}

/// Full argv for a lint run: configured command plus the scope flag.
pub fn lint_argv(command: &[String], scope: LintScope) -> Vec<String> {
    let mut argv = command.to_vec();
    if scope == LintScope::AllFiles {
        argv.push("--all-files".to_string());
    }
    argv
}

fn write_lint_log(path: &Path, output: &CommandOutput) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create lint log dir {}", parent.display()))?;
    }
    fs::write(path, output.combined()).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_scope_uses_base_argv() {
        let command = vec!["pre-commit".to_string(), "run".to_string()];
        assert_eq!(lint_argv(&command, LintScope::Staged), command);
    }

    #[test]
    fn all_files_scope_appends_flag() {
        let command = vec!["pre-commit".to_string(), "run".to_string()];
        assert_eq!(
            lint_argv(&command, LintScope::AllFiles),
            vec!["pre-commit", "run", "--all-files"]
        );
    }

    #[test]
    fn runner_reports_failure_and_writes_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = LintRequest {
            workdir: temp.path().to_path_buf(),
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo style error; exit 1".to_string(),
            ],
            scope: LintScope::Staged,
            env_overlay: Vec::new(),
            log_path: temp.path().join("logs/lint.log"),
            timeout: Duration::from_secs(10),
            output_limit_bytes: 64 * 1024,
        };

        let outcome = PreCommitRunner.run(&request).expect("lint run");
        assert_eq!(outcome.exit_code, 1);
        assert!(!outcome.passed());
        assert!(outcome.combined_output.contains("style error"));

        let log = fs::read_to_string(&request.log_path).expect("read log");
        assert!(log.contains("style error"));
    }

    #[test]
    fn runner_applies_env_overlay() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = LintRequest {
            workdir: temp.path().to_path_buf(),
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "printf '%s' \"$PRE_COMMIT_HOME\"".to_string(),
            ],
            scope: LintScope::Staged,
            env_overlay: vec![("PRE_COMMIT_HOME".to_string(), "/tmp/pc-home".to_string())],
            log_path: temp.path().join("lint.log"),
            timeout: Duration::from_secs(10),
            output_limit_bytes: 1024,
        };

        let outcome = PreCommitRunner.run(&request).expect("lint run");
        assert!(outcome.passed());
        assert_eq!(outcome.combined_output, "/tmp/pc-home");
    }

    #[test]
    fn missing_lint_binary_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = LintRequest {
            workdir: temp.path().to_path_buf(),
            command: vec!["hookfix-no-such-lint".to_string()],
            scope: LintScope::Staged,
            env_overlay: Vec::new(),
            log_path: temp.path().join("lint.log"),
            timeout: Duration::from_secs(1),
            output_limit_bytes: 1024,
        };

        assert!(PreCommitRunner.run(&request).is_err());
    }
}
