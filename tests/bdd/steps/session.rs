//! Step definitions for the session lifecycle.

use crate::bdd::doubles::FakeApplication;
use crate::bdd::fixtures::{RefCellOptionExt, TestWorld};
use anyhow::{Context, Result, ensure};
use camino::Utf8Path;
use rstest_bdd_macros::{given, then, when};
use testsession::session::{SessionController, SessionOptions};
use testsession::state::StateStore;

fn install_controller(world: &TestWorld, app: FakeApplication) -> Result<()> {
    let root = world.temp_root()?;
    world
        .controller
        .set_value(SessionController::new(app, StateStore::in_dir(&root)));
    Ok(())
}

fn begin(world: &TestWorld, options: &SessionOptions) -> Result<()> {
    let outcome = world
        .controller
        .with_mut(|controller| controller.begin(options))
        .context("session controller has not been created")?;
    match outcome {
        Ok(handle) => {
            world.state_path.set(handle.path().to_owned());
            world.session_error.clear();
        }
        Err(err) => world.session_error.set(err.to_string()),
    }
    Ok(())
}

fn application_calls(world: &TestWorld) -> Result<Vec<&'static str>> {
    world
        .controller
        .with_ref(|controller| controller.app().calls.clone())
        .context("session controller has not been created")
}

#[given("a session controller")]
fn session_controller(world: &TestWorld) -> Result<()> {
    install_controller(world, FakeApplication::default())
}

#[given("a session controller whose application applies database {database:string}")]
fn session_controller_applying(world: &TestWorld, database: String) -> Result<()> {
    install_controller(world, FakeApplication::applying_database(database))
}

#[given("a started session")]
fn started_session(world: &TestWorld) -> Result<()> {
    install_controller(world, FakeApplication::default())?;
    begin(world, &SessionOptions::new("ss_tmpdb"))?;
    ensure!(
        world.session_error.get().is_none(),
        "session should start cleanly"
    );
    Ok(())
}

#[when("a session is started with database {database:string}")]
fn start_session(world: &TestWorld, database: String) -> Result<()> {
    begin(world, &SessionOptions::new(database))
}

#[when("a session is started with database {database:string} importing {dump:string} with default records")]
fn start_session_importing(world: &TestWorld, database: String, dump: String) -> Result<()> {
    let options = SessionOptions::new(database)
        .with_import_database(Utf8Path::new(&dump))
        .with_require_default_records(true);
    begin(world, &options)
}

#[when("a session is started with database {database:string} and fixture {fixture:string}")]
fn start_session_with_fixture(world: &TestWorld, database: String, fixture: String) -> Result<()> {
    let options = SessionOptions::new(database).with_fixture(Utf8Path::new(&fixture));
    begin(world, &options)
}

#[when("the session is ended")]
fn end_session(world: &TestWorld) -> Result<()> {
    let report = world
        .controller
        .with_mut(SessionController::end)
        .context("session controller has not been created")?;
    world.teardown.set_value(report);
    Ok(())
}

#[then("the session phase is {phase:string}")]
fn session_phase(world: &TestWorld, phase: String) -> Result<()> {
    let actual = world
        .controller
        .with_ref(|controller| controller.phase().to_string())
        .context("session controller has not been created")?;
    ensure!(actual == phase, "expected phase '{phase}', got '{actual}'");
    Ok(())
}

#[then("the state file records database {database:string}")]
fn state_records_database(world: &TestWorld, database: String) -> Result<()> {
    let state = world
        .controller
        .with_ref(SessionController::state)
        .context("session controller has not been created")??;
    ensure!(
        state.database() == Some(database.as_str()),
        "expected database '{database}', got {:?}",
        state.database()
    );
    Ok(())
}

#[then("the state file is gone")]
fn state_file_is_gone(world: &TestWorld) -> Result<()> {
    let path = world.state_path.get().context("no session was started")?;
    ensure!(!path.exists(), "state file {path} should be removed");
    Ok(())
}

#[then("the application was asked to {call:string}")]
fn application_was_asked(world: &TestWorld, call: String) -> Result<()> {
    let calls = application_calls(world)?;
    ensure!(
        calls.contains(&call.as_str()),
        "expected a call to {call}, got {calls:?}"
    );
    Ok(())
}

#[then("the application was not asked to {call:string}")]
fn application_was_not_asked(world: &TestWorld, call: String) -> Result<()> {
    let calls = application_calls(world)?;
    ensure!(
        !calls.contains(&call.as_str()),
        "expected no call to {call}, got {calls:?}"
    );
    Ok(())
}

#[then("the session error mentions {fragment:string}")]
fn session_error_mentions(world: &TestWorld, fragment: String) -> Result<()> {
    let error = world
        .session_error
        .get()
        .context("expected a session error")?;
    ensure!(
        error.contains(&fragment),
        "expected session error to contain '{fragment}', got '{error}'"
    );
    Ok(())
}

#[then("teardown is clean")]
fn teardown_is_clean(world: &TestWorld) -> Result<()> {
    let clean = world
        .teardown
        .with_ref(|report| report.is_clean())
        .context("the session has not been ended")?;
    ensure!(clean, "teardown reported failures");
    Ok(())
}
