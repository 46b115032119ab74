//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution. Results are written to the supplied writer so
//! tests can capture them.

mod error;

pub use error::RunnerError;

use crate::cli::{Cli, Commands, EmailArgs, StartArgs};
use crate::email::{EmailQuery, TestMailer};
use crate::fixture::{FixtureSet, MemoryStore, TypeCatalog};
use crate::session::SessionOptions;
use crate::state::{self, SessionHandle, SessionState, StateStore};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;
use std::path::Path;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info};

/// Execute the parsed [`Cli`] command, writing results to stdout.
///
/// # Errors
///
/// Returns an error when the command fails.
pub fn run(cli: &Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_output(cli, &mut out)
}

/// Execute the parsed [`Cli`] command, writing results to `out`.
///
/// # Errors
///
/// Returns an error when the command fails or `out` cannot be written.
pub fn run_with_output<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let command = cli.command.clone().ok_or(RunnerError::MissingCommand)?;
    debug!(target: "testsession::runner", ?command, "dispatching command");
    match command {
        Commands::Start(args) => handle_start(cli, &args, out),
        Commands::Show { state } => {
            let (store, handle) = open_state(&state)?;
            let current = store.read(&handle)?;
            write_json(out, &current)
        }
        Commands::Set { state, assignments } => {
            let (store, handle) = open_state(&state)?;
            let mut patch = SessionState::new();
            for assignment in assignments {
                patch.insert(assignment.key, assignment.value);
            }
            let merged = store
                .apply(&handle, &patch)
                .with_context(|| format!("updating session state {handle}"))?;
            write_json(out, &merged)
        }
        Commands::Date {
            state: state_path,
            date,
        } => {
            pin_clock(&state_path, out, |current, now| {
                state::set_current_date(current, &date, now)
            })
        }
        Commands::Time {
            state: state_path,
            time,
        } => {
            pin_clock(&state_path, out, |current, now| {
                state::set_current_time(current, &time, now)
            })
        }
        Commands::Emails(args) => handle_emails(&args, out),
        Commands::ClearEmails { state } => {
            let (store, handle) = open_state(&state)?;
            TestMailer::new(store, handle).clear_emails()?;
            Ok(())
        }
        Commands::End { state } => {
            let path = utf8_path(&state)?;
            let dir = path
                .parent()
                .filter(|parent| !parent.as_str().is_empty())
                .unwrap_or_else(|| Utf8Path::new("."));
            let handle = SessionHandle::from_path(path.clone());
            StateStore::in_dir(dir).destroy(&handle)?;
            info!(target: "testsession::runner", %handle, "ended session");
            Ok(())
        }
        Commands::CheckFixtures { file } => handle_check_fixtures(cli, &file, out),
    }
}

fn handle_start<W: Write>(cli: &Cli, args: &StartArgs, out: &mut W) -> Result<()> {
    let store = match &cli.state_dir {
        Some(dir) => StateStore::in_dir(&utf8_path(dir)?),
        None => StateStore::in_temp_dir()?,
    };
    let mut options = SessionOptions::from_env(args.database.as_str());
    if let Some(fixture) = &args.fixture {
        options = options.with_fixture(&utf8_path(fixture)?);
    }
    if let Some(dump) = &args.import_database {
        options = options.with_import_database(&utf8_path(dump)?);
    }
    if args.require_default_records {
        options = options.with_require_default_records(true);
    }
    if let Some(mailer) = &args.mailer {
        options = options.with_mailer(mailer.as_str());
    }
    let handle = store
        .create(options.state())
        .context("creating session state")?;
    info!(target: "testsession::runner", %handle, "started session");
    writeln!(out, "{handle}")?;
    Ok(())
}

fn handle_emails<W: Write>(args: &EmailArgs, out: &mut W) -> Result<()> {
    let (store, handle) = open_state(&args.state)?;
    let query = EmailQuery {
        to: args.to.clone(),
        from: args.from.clone(),
        subject: args.subject.clone(),
        content: args.content.clone(),
    };
    let found = TestMailer::new(store, handle).find_email(&query)?;
    let email = found.ok_or_else(|| RunnerError::NoMatchingEmail {
        query: describe_query(&query),
    })?;
    write_json(out, &email)
}

fn handle_check_fixtures<W: Write>(cli: &Cli, file: &Path, out: &mut W) -> Result<()> {
    let path = utf8_path(file)?;
    let catalog = match &cli.catalog {
        Some(catalog_path) => {
            let catalog_file = utf8_path(catalog_path)?;
            let src = fs::read_to_string(&catalog_file)
                .with_context(|| format!("reading type catalog {catalog_file}"))?;
            TypeCatalog::from_yaml(catalog_file.as_str(), &src)?
        }
        None => TypeCatalog::open(),
    };
    let yaml =
        fs::read_to_string(&path).with_context(|| format!("reading fixture file {path}"))?;

    let mut fixtures = FixtureSet::new(MemoryStore::default(), catalog);
    fixtures.load_fixture_file(path.as_str(), &yaml)?;
    let defined: Vec<String> = fixtures
        .registry()
        .entries()
        .map(|(key, id)| format!("{key} = {id}"))
        .collect();
    fixtures
        .finish()
        .with_context(|| format!("resolving references in {path}"))?;
    for line in defined {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn pin_clock<W, F>(state_path: &Path, out: &mut W, pin: F) -> Result<()>
where
    W: Write,
    F: FnOnce(&mut SessionState, PrimitiveDateTime) -> Result<PrimitiveDateTime, state::StateError>,
{
    let (store, handle) = open_state(state_path)?;
    let mut current = store.read(&handle)?;
    let now_utc = OffsetDateTime::now_utc();
    let pinned = pin(
        &mut current,
        PrimitiveDateTime::new(now_utc.date(), now_utc.time()),
    )?;
    store.write(&handle, &current)?;
    let datetime = current
        .get(state::DATETIME)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    debug!(target: "testsession::runner", %pinned, "pinned simulated clock");
    writeln!(out, "{datetime}")?;
    Ok(())
}

fn open_state(path: &Path) -> Result<(StateStore, SessionHandle)> {
    let state_path = utf8_path(path)?;
    StateStore::open(&state_path).with_context(|| format!("opening session state {state_path}"))
}

fn utf8_path(path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|original| RunnerError::NonUtf8Path { path: original })
}

fn write_json<W: Write, T: serde::Serialize>(out: &mut W, value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serialising output")?;
    writeln!(out, "{rendered}")?;
    Ok(())
}

fn describe_query(query: &EmailQuery) -> String {
    let parts: Vec<String> = [
        ("to", &query.to),
        ("from", &query.from),
        ("subject", &query.subject),
        ("content", &query.content),
    ]
    .into_iter()
    .filter_map(|(field, value)| value.as_ref().map(|v| format!("{field}={v}")))
    .collect();
    if parts.is_empty() {
        "any email".to_owned()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests;
