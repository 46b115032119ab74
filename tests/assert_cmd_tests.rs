//! Integration tests for CLI execution using `assert_cmd`.
//!
//! These tests invoke the compiled binary and check what it prints and which
//! files it leaves behind.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use test_support::run_testsession_in;

fn start_in(dir: &Path, envs: &[(&str, &str)]) -> Result<String> {
    let state_dir = dir.to_str().context("temp dir should be UTF-8")?;
    let run = run_testsession_in(
        dir,
        &["--state-dir", state_dir, "start", "--database", "ss_tmpdb"],
        envs,
    )?;
    ensure!(run.success, "start should succeed: {}", run.stderr);
    Ok(run.first_line().to_owned())
}

#[test]
fn start_show_end_lifecycle() -> Result<()> {
    let temp = tempdir().context("create temp dir for lifecycle test")?;
    let state = start_in(temp.path(), &[("TESTSESSION_PARAMS", "theme=simple")])?;
    ensure!(Path::new(&state).exists(), "start should create {state}");

    let shown = run_testsession_in(temp.path(), &["show", &state], &[])?;
    ensure!(shown.success, "show should succeed: {}", shown.stderr);
    let value: serde_json::Value = serde_json::from_str(&shown.stdout)?;
    ensure!(value["database"] == "ss_tmpdb", "database recorded");
    ensure!(value["theme"] == "simple", "params merged: {value}");

    let ended = run_testsession_in(temp.path(), &["end", &state], &[])?;
    ensure!(ended.success, "end should succeed: {}", ended.stderr);
    ensure!(!Path::new(&state).exists(), "end should remove {state}");
    Ok(())
}

#[test]
fn emails_without_a_match_fails() -> Result<()> {
    let temp = tempdir().context("create temp dir for email test")?;
    let state = start_in(temp.path(), &[])?;
    let mut cmd = Command::cargo_bin("testsession").context("locate testsession binary")?;
    cmd.current_dir(temp.path())
        .args(["emails", &state, "--to", "nobody@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no email matched to=nobody@example.com"));
    Ok(())
}

#[test]
fn check_fixtures_lists_records() -> Result<()> {
    let temp = tempdir().context("create temp dir for fixture test")?;
    let file = temp.path().join("site.yml");
    fs::write(
        &file,
        "Page:\n  home:\n    Title: Home\n  about:\n    Parent: =>Page.home\n",
    )
    .with_context(|| format!("write {}", file.display()))?;
    let mut cmd = Command::cargo_bin("testsession").context("locate testsession binary")?;
    cmd.current_dir(temp.path())
        .args(["check-fixtures", "site.yml"])
        .assert()
        .success()
        .stdout("Page.home = 1\nPage.about = 2\n");
    Ok(())
}

#[test]
fn check_fixtures_reports_unresolved_references() -> Result<()> {
    let temp = tempdir().context("create temp dir for fixture test")?;
    fs::write(
        temp.path().join("broken.yml"),
        "Page:\n  about:\n    Parent: =>Page.missing\n",
    )?;
    let run = run_testsession_in(temp.path(), &["check-fixtures", "broken.yml"], &[])?;
    ensure!(!run.success, "unresolved references should fail");
    ensure!(
        run.stderr.contains("Page.about.Parent -> =>Page.missing"),
        "stderr should name the reference: {}",
        run.stderr
    );
    Ok(())
}

#[test]
fn missing_subcommand_prints_usage() -> Result<()> {
    let mut cmd = Command::cargo_bin("testsession").context("locate testsession binary")?;
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}
