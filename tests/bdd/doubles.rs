//! In-process stand-ins for the application under test and the browser.

use serde_json::Value;
use testsession::CollaboratorError;
use testsession::browser::{BrowserDriver, ScreenSize};
use testsession::session::Application;
use testsession::state::{DATABASE, SessionHandle, SessionState};
use camino::Utf8Path;

/// Application double that echoes the requested parameters and records
/// which lifecycle calls it received.
#[derive(Debug, Default)]
pub struct FakeApplication {
    /// Lifecycle calls in the order they arrived.
    pub calls: Vec<&'static str>,
    /// Database reported back instead of the requested one.
    pub applied_database: Option<String>,
}

impl FakeApplication {
    /// Report `database` as applied, whatever was requested.
    pub fn applying_database(database: impl Into<String>) -> Self {
        Self {
            applied_database: Some(database.into()),
            ..Self::default()
        }
    }
}

impl Application for FakeApplication {
    fn start_session(
        &mut self,
        _handle: &SessionHandle,
        requested: &SessionState,
    ) -> Result<SessionState, CollaboratorError> {
        self.calls.push("start_session");
        let mut applied = requested.clone();
        if let Some(database) = &self.applied_database {
            applied.insert(DATABASE, database.as_str());
        }
        Ok(applied)
    }

    fn import_database(
        &mut self,
        _dump: &Utf8Path,
        _require_default_records: bool,
    ) -> Result<(), CollaboratorError> {
        self.calls.push("import_database");
        Ok(())
    }

    fn require_default_records(&mut self) -> Result<(), CollaboratorError> {
        self.calls.push("require_default_records");
        Ok(())
    }

    fn load_fixture_file(&mut self, _path: &Utf8Path) -> Result<(), CollaboratorError> {
        self.calls.push("load_fixture_file");
        Ok(())
    }

    fn empty_database(&mut self) -> Result<(), CollaboratorError> {
        self.calls.push("empty_database");
        Ok(())
    }

    fn end_session(&mut self, _handle: &SessionHandle) -> Result<(), CollaboratorError> {
        self.calls.push("end_session");
        Ok(())
    }
}

const READ_ERRORS: &str = "window.__testsessionErrors || []";
const RESET_ERRORS: &str = "window.__testsessionErrors = [];";

/// Browser double with a scripted AJAX status and script error list.
#[derive(Debug, Default)]
pub struct FakeBrowser {
    /// Status polls still to answer with `waiting`.
    pub busy_polls: usize,
    /// Errors the page reports as captured.
    pub script_errors: Vec<String>,
    /// Scripts executed so far.
    pub executed: Vec<String>,
    /// Current window size.
    pub size: Option<ScreenSize>,
    /// Current page URL.
    pub url: String,
}

impl BrowserDriver for FakeBrowser {
    fn visit(&mut self, url: &str) -> Result<(), CollaboratorError> {
        url.clone_into(&mut self.url);
        Ok(())
    }

    fn current_url(&self) -> Result<String, CollaboratorError> {
        Ok(self.url.clone())
    }

    fn execute_script(&mut self, script: &str) -> Result<(), CollaboratorError> {
        if script.trim() == RESET_ERRORS {
            self.script_errors.clear();
        }
        self.executed.push(script.to_owned());
        Ok(())
    }

    fn evaluate_script(&mut self, expression: &str) -> Result<Value, CollaboratorError> {
        if expression.trim() == READ_ERRORS {
            return Ok(Value::from(self.script_errors.clone()));
        }
        if self.busy_polls == 0 {
            return Ok(Value::from("success"));
        }
        self.busy_polls = self.busy_polls.saturating_sub(1);
        Ok(Value::from("waiting"))
    }

    fn resize_window(&mut self, size: ScreenSize) -> Result<(), CollaboratorError> {
        self.size = Some(size);
        Ok(())
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, CollaboratorError> {
        Ok(b"\x89PNG".to_vec())
    }
}
