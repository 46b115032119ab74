//! Unit tests for command dispatch.

use super::*;
use crate::cli::Assignment;
use crate::email::{Mailer, OutgoingEmail};
use anyhow::{Context, ensure};
use rstest::{fixture, rstest};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn cli(&self, command: Commands) -> Cli {
        Cli {
            state_dir: Some(self.root()),
            command: Some(command),
            ..Cli::default()
        }
    }

    fn run(&self, command: Commands) -> anyhow::Result<String> {
        let mut out = Vec::new();
        run_with_output(&self.cli(command), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn start(&self) -> anyhow::Result<PathBuf> {
        let printed = self.run(Commands::Start(StartArgs {
            database: "ss_tmpdb".to_owned(),
            fixture: None,
            import_database: None,
            require_default_records: false,
            mailer: None,
        }))?;
        Ok(PathBuf::from(printed.trim()))
    }
}

#[fixture]
fn workspace() -> Workspace {
    Workspace {
        dir: tempfile::tempdir().expect("temp dir"),
    }
}

#[rstest]
fn start_prints_a_state_file_inside_state_dir(workspace: Workspace) -> anyhow::Result<()> {
    let state = workspace.start()?;
    ensure!(state.starts_with(workspace.root()), "state file should live in state_dir");
    let shown = workspace.run(Commands::Show {
        state: state.clone(),
    })?;
    let value: serde_json::Value = serde_json::from_str(&shown)?;
    ensure!(value["database"] == json!("ss_tmpdb"), "database should be recorded");
    ensure!(
        value["mailer"] == json!(crate::email::TEST_MAILER),
        "test mailer should be the default"
    );
    Ok(())
}

#[rstest]
fn show_prints_pretty_json(workspace: Workspace) -> anyhow::Result<()> {
    let state = workspace.start()?;
    let shown = workspace.run(Commands::Show { state })?;
    insta::assert_snapshot!(shown.trim_end(), @r#"
    {
      "database": "ss_tmpdb",
      "mailer": "testsession::email::TestMailer"
    }
    "#);
    Ok(())
}

#[rstest]
fn set_merges_parsed_values(workspace: Workspace) -> anyhow::Result<()> {
    let state = workspace.start()?;
    workspace.run(Commands::Set {
        state: state.clone(),
        assignments: vec![
            Assignment {
                key: "requireDefaultRecords".to_owned(),
                value: json!(true),
            },
            Assignment {
                key: "theme".to_owned(),
                value: json!("simple"),
            },
        ],
    })?;
    let utf8 = Utf8PathBuf::from_path_buf(state).map_err(|_| anyhow::anyhow!("utf-8 path"))?;
    let (store, handle) = StateStore::open(&utf8)?;
    let current = store.read(&handle)?;
    ensure!(current.database() == Some("ss_tmpdb"), "existing keys survive");
    ensure!(current.require_default_records(), "new keys are merged");
    Ok(())
}

#[rstest]
fn date_then_time_pins_both_parts(workspace: Workspace) -> anyhow::Result<()> {
    let state = workspace.start()?;
    workspace.run(Commands::Date {
        state: state.clone(),
        date: "2009-10-31".to_owned(),
    })?;
    let printed = workspace.run(Commands::Time {
        state,
        time: "17:05:00".to_owned(),
    })?;
    ensure!(printed.trim() == "2009-10-31 17:05:00", "got {printed}");
    Ok(())
}

#[rstest]
fn invalid_date_is_rejected(workspace: Workspace) -> anyhow::Result<()> {
    let state = workspace.start()?;
    let result = workspace.run(Commands::Date {
        state,
        date: "31/10/2009".to_owned(),
    });
    ensure!(result.is_err(), "malformed date should fail");
    Ok(())
}

#[rstest]
fn emails_prints_latest_match_and_fails_when_none(workspace: Workspace) -> anyhow::Result<()> {
    let state = workspace.start()?;
    let utf8 = Utf8PathBuf::from_path_buf(state.clone()).map_err(|_| anyhow::anyhow!("utf-8"))?;
    let (store, handle) = StateStore::open(&utf8)?;
    let mailer = TestMailer::new(store, handle);
    for subject in ["first", "second"] {
        mailer.send_plain(OutgoingEmail {
            to: "a@b.com".to_owned(),
            from: "site@b.com".to_owned(),
            subject: subject.to_owned(),
            body: "hello".to_owned(),
            ..OutgoingEmail::default()
        })?;
    }

    let printed = workspace.run(Commands::Emails(EmailArgs {
        state: state.clone(),
        to: Some("a@b.com".to_owned()),
        from: None,
        subject: None,
        content: None,
    }))?;
    let email: serde_json::Value = serde_json::from_str(&printed)?;
    ensure!(email["subject"] == json!("second"), "latest match wins");

    workspace.run(Commands::ClearEmails {
        state: state.clone(),
    })?;
    let err = workspace
        .run(Commands::Emails(EmailArgs {
            state,
            to: Some("a@b.com".to_owned()),
            from: None,
            subject: None,
            content: None,
        }))
        .err()
        .context("cleared emails should not match")?;
    ensure!(
        err.to_string() == "no email matched to=a@b.com",
        "unexpected error: {err}"
    );
    Ok(())
}

#[rstest]
fn end_is_idempotent(workspace: Workspace) -> anyhow::Result<()> {
    let state = workspace.start()?;
    workspace.run(Commands::End {
        state: state.clone(),
    })?;
    ensure!(!state.exists(), "state file should be removed");
    workspace.run(Commands::End { state })?;
    Ok(())
}

#[rstest]
fn check_fixtures_lists_resolved_records(workspace: Workspace) -> anyhow::Result<()> {
    let file = workspace.root().join("site.yml");
    fs::write(
        &file,
        "Page:\n  about:\n    Title: About\n    Parent: =>Page.home\n  home:\n    Title: Home\n",
    )?;
    let printed = workspace.run(Commands::CheckFixtures { file })?;
    ensure!(
        printed == "Page.about = 1\nPage.home = 2\n",
        "unexpected listing: {printed}"
    );
    Ok(())
}

#[rstest]
fn check_fixtures_reports_unresolved_references(workspace: Workspace) -> anyhow::Result<()> {
    let file = workspace.root().join("broken.yml");
    fs::write(&file, "Page:\n  about:\n    Parent: =>Page.missing\n")?;
    let err = workspace
        .run(Commands::CheckFixtures { file })
        .err()
        .context("unresolved reference should fail")?;
    ensure!(
        format!("{err:#}").contains("Page.missing"),
        "error should name the reference: {err:#}"
    );
    Ok(())
}

#[test]
fn missing_command_is_an_error() {
    let mut out = Vec::new();
    let err = run_with_output(&Cli::default(), &mut out).expect_err("no command");
    assert!(err.downcast_ref::<RunnerError>().is_some());
}

#[rstest]
#[case(EmailQuery::default(), "any email")]
#[case(EmailQuery::default().sent_to("a@b.com").with_subject("/Welcome/i"), "to=a@b.com, subject=/Welcome/i")]
fn queries_are_described(#[case] query: EmailQuery, #[case] expected: &str) {
    assert_eq!(describe_query(&query), expected);
}
