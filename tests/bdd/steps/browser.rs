//! Step definitions for the browser helpers, driven against
//! [`FakeBrowser`](crate::bdd::doubles::FakeBrowser).

use crate::bdd::doubles::FakeBrowser;
use crate::bdd::fixtures::{RefCellOptionExt, TestWorld};
use anyhow::{Context, Result, ensure};
use camino::Utf8Path;
use rstest_bdd_macros::{given, then, when};
use std::time::Duration;
use testsession::browser::{AjaxWatcher, ScreenSize, ScreenshotRecorder, ScriptErrorMonitor, WaitOutcome};
use testsession::report::FailureReport;

fn install_watcher(world: &TestWorld, pattern: &str, timeout: Duration) -> Result<()> {
    let watcher = AjaxWatcher::new(&[pattern], timeout)?
        .with_settle(Duration::ZERO)
        .with_poll_interval(Duration::from_millis(1));
    world.ajax.set_value(watcher);
    Ok(())
}

#[given("a browser")]
fn a_browser(world: &TestWorld) -> Result<()> {
    world.browser.set_value(FakeBrowser::default());
    Ok(())
}

#[given("a browser whose page stays busy for {polls:usize} polls")]
fn busy_browser(world: &TestWorld, polls: usize) -> Result<()> {
    world.browser.set_value(FakeBrowser {
        busy_polls: polls,
        ..FakeBrowser::default()
    });
    Ok(())
}

#[given("an AJAX watcher for steps matching {pattern:string}")]
fn ajax_watcher(world: &TestWorld, pattern: String) -> Result<()> {
    install_watcher(world, &pattern, Duration::from_secs(2))
}

#[given("an AJAX watcher for steps matching {pattern:string} with a {millis:usize} ms timeout")]
fn ajax_watcher_with_timeout(world: &TestWorld, pattern: String, millis: usize) -> Result<()> {
    let timeout = Duration::from_millis(u64::try_from(millis)?);
    install_watcher(world, &pattern, timeout)
}

#[given("the page has raised the script error {message:string}")]
fn page_raised_error(world: &TestWorld, message: String) -> Result<()> {
    world
        .browser
        .with_mut(|browser| browser.script_errors.push(message))
        .context("browser has not been created")
}

#[when("the step {text:string} runs")]
fn step_runs(world: &TestWorld, text: String) -> Result<()> {
    let mut browser_slot = world.browser.borrow_mut();
    let browser = browser_slot.as_mut().context("browser has not been created")?;
    let watcher_slot = world.ajax.borrow();
    let watcher = watcher_slot.as_ref().context("AJAX watcher has not been created")?;
    watcher.before_step(browser, &text)?;
    let outcome = match watcher.after_step(browser, &text)? {
        Some(WaitOutcome::Settled) => "settled",
        Some(WaitOutcome::TimedOut) => "timed out",
        None => "skipped",
    };
    world.ajax_outcome.set(outcome.to_owned());
    Ok(())
}

#[when("the step finishes")]
fn step_finishes(world: &TestWorld) -> Result<()> {
    let outcome = world
        .browser
        .with_mut(|browser| ScriptErrorMonitor.ensure_clean(browser))
        .context("browser has not been created")?;
    match outcome {
        Ok(()) => world.browser_error.clear(),
        Err(err) => world.browser_error.set(err.to_string()),
    }
    Ok(())
}

#[when("the window is resized from {value:string}")]
fn resize_from(world: &TestWorld, value: String) -> Result<()> {
    let size = ScreenSize::from_env_value(&value)?;
    world
        .browser
        .with_mut(|browser| size.apply(browser))
        .context("browser has not been created")??;
    Ok(())
}

#[when("a failure screenshot is recorded for {feature:string} line {line:usize}")]
fn record_screenshot(world: &TestWorld, feature: String, line: usize) -> Result<()> {
    let dir = world.temp_root()?.join("screenshots");
    let recorder = ScreenshotRecorder::new(Some(dir));
    let line_number = u32::try_from(line)?;
    let saved = world
        .browser
        .with_mut(|browser| recorder.record(browser, Utf8Path::new(&feature), line_number))
        .context("browser has not been created")??
        .context("recorder should save a screenshot")?;
    world.screenshot.set(saved);
    Ok(())
}

#[then("the AJAX wait outcome is {outcome:string}")]
fn ajax_outcome(world: &TestWorld, outcome: String) -> Result<()> {
    let actual = world.ajax_outcome.get().context("no step has run")?;
    ensure!(actual == outcome, "expected '{outcome}', got '{actual}'");
    Ok(())
}

#[then("the step fails with a script error mentioning {fragment:string}")]
fn step_failed_with_script_error(world: &TestWorld, fragment: String) -> Result<()> {
    let error = world
        .browser_error
        .get()
        .context("expected a script error failure")?;
    ensure!(
        error.contains(&fragment),
        "expected '{fragment}' in '{error}'"
    );
    Ok(())
}

#[then("the step passes")]
fn step_passes(world: &TestWorld) -> Result<()> {
    let error = world.browser_error.get();
    ensure!(error.is_none(), "unexpected failure {error:?}");
    Ok(())
}

#[then("the window is {width:usize} by {height:usize}")]
fn window_size(world: &TestWorld, width: usize, height: usize) -> Result<()> {
    let size = world
        .browser
        .with_ref(|browser| browser.size)
        .context("browser has not been created")?
        .context("window was never resized")?;
    let expected = ScreenSize {
        width: u32::try_from(width)?,
        height: u32::try_from(height)?,
    };
    ensure!(size == expected, "expected {expected}, got {size}");
    Ok(())
}

#[then("the screenshot is saved as {name:string}")]
fn screenshot_saved_as(world: &TestWorld, name: String) -> Result<()> {
    let path = world.screenshot.get().context("no screenshot recorded")?;
    ensure!(path.file_name() == Some(name.as_str()), "unexpected path {path}");
    ensure!(path.exists(), "screenshot {path} should exist");
    let report = FailureReport::new("step failed").with_screenshot(path.clone());
    ensure!(
        report.to_string().contains(&format!("screenshot: {path}")),
        "failure report should name the screenshot"
    );
    Ok(())
}
