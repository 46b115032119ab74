//! Fixture modules for BDD scenarios.
//!
//! The `TestWorld` struct holds all state for BDD scenarios. Non-Clone types
//! use `RefCell<Option<T>>` directly, while Clone types use `Slot<T>`.

// The `#[fixture]` macro generates types that cannot have doc comments attached
#![allow(
    missing_docs,
    reason = "Generated fixture types cannot have doc comments attached"
)]

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd::Slot;
use std::cell::RefCell;
use tempfile::TempDir;
use testsession::browser::AjaxWatcher;
use testsession::fixture::{FixtureSet, MemoryStore};
use testsession::session::{SessionController, TeardownReport};

use super::doubles::{FakeApplication, FakeBrowser};

/// Combined test world for all BDD scenarios.
#[derive(Default)]
pub struct TestWorld {
    /// Scratch directory for state files and screenshots.
    pub temp_dir: RefCell<Option<TempDir>>,

    // Fixture state
    /// Fixture set under test.
    pub fixtures: RefCell<Option<FixtureSet<MemoryStore>>>,
    /// Error text from the last failed fixture operation.
    pub fixture_error: Slot<String>,

    // Session state
    /// Controller driving the fake application.
    pub controller: RefCell<Option<SessionController<FakeApplication>>>,
    /// State file of the running session.
    pub state_path: Slot<Utf8PathBuf>,
    /// Error text from the last failed session operation.
    pub session_error: Slot<String>,
    /// Report of the last teardown.
    pub teardown: RefCell<Option<TeardownReport>>,

    // Browser state
    /// Browser double.
    pub browser: RefCell<Option<FakeBrowser>>,
    /// Watcher deciding which steps wait for AJAX.
    pub ajax: RefCell<Option<AjaxWatcher>>,
    /// Outcome of the last watched step: `settled`, `timed out`, or
    /// `skipped`.
    pub ajax_outcome: Slot<String>,
    /// Error text from the last failed browser operation.
    pub browser_error: Slot<String>,
    /// Path of the last recorded screenshot.
    pub screenshot: Slot<Utf8PathBuf>,
}

impl TestWorld {
    /// Root of the scenario's scratch directory, created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or its path is
    /// not UTF-8.
    pub fn temp_root(&self) -> Result<Utf8PathBuf> {
        let mut slot = self.temp_dir.borrow_mut();
        if slot.is_none() {
            *slot = Some(tempfile::tempdir().context("create scenario directory")?);
        }
        let dir = slot.as_ref().context("scenario directory should exist")?;
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir {}", path.display()))
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        if let Some(mut controller) = self.controller.borrow_mut().take() {
            let _report = controller.end();
        }
    }
}

/// Fixture providing a fresh `TestWorld` for each scenario.
#[fixture]
pub fn world() -> TestWorld {
    TestWorld::default()
}

/// Helper trait extensions for `RefCell<Option<T>>`.
pub trait RefCellOptionExt<T> {
    /// Set the value inside the `RefCell`.
    fn set_value(&self, value: T);
    /// Borrow the inner value immutably and apply a function.
    fn with_ref<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R>;
    /// Borrow the inner value mutably and apply a function.
    fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R>;
}

impl<T> RefCellOptionExt<T> for RefCell<Option<T>> {
    fn set_value(&self, value: T) {
        *self.borrow_mut() = Some(value);
    }

    fn with_ref<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.borrow().as_ref().map(f)
    }

    fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.borrow_mut().as_mut().map(f)
    }
}
