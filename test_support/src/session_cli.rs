//! Helpers for running the `testsession` binary in integration tests.

use anyhow::{Context, Result};
use assert_cmd::Command;
use session_env::{CONFIG_PATH_ENV, SCREEN_SIZE_ENV, TESTSESSION_PARAMS_ENV};
use std::path::Path;

/// Captured output from a `testsession` invocation.
#[derive(Debug)]
pub struct SessionRun {
    /// Standard output as lossy UTF-8.
    pub stdout: String,
    /// Standard error as lossy UTF-8.
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
}

impl SessionRun {
    /// Trimmed first line of standard output.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.stdout.lines().next().unwrap_or_default().trim()
    }
}

/// Run `testsession` in `current_dir` with `args`.
///
/// Session parameters, screen size and config path variables inherited from
/// the test process are cleared so each run sees only what `envs` supplies.
///
/// # Errors
///
/// Returns an error when the binary cannot be located or executed.
pub fn run_testsession_in(
    current_dir: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<SessionRun> {
    let mut cmd = Command::cargo_bin("testsession").context("locate testsession binary")?;
    cmd.current_dir(current_dir)
        .env_remove(TESTSESSION_PARAMS_ENV)
        .env_remove(SCREEN_SIZE_ENV)
        .env_remove(CONFIG_PATH_ENV)
        .args(args);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    let output = cmd.output().context("run testsession command")?;
    Ok(SessionRun {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    })
}
