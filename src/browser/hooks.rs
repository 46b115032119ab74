//! Per-step diagnostics: script error capture and failure screenshots.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::fs;
use std::io;
use tracing::info;

use super::{BrowserDriver, BrowserError};

const INSTALL_COLLECTOR: &str = r"window.__testsessionErrors = window.__testsessionErrors || [];
window.onerror = function (message, file, line, column, error) {
    var msg = message + ' in ' + file + ':' + line + ':' + column;
    if (error !== undefined && error.stack !== undefined) {
        msg += '\nSTACKTRACE:\n' + error.stack;
    }
    window.__testsessionErrors.push('[captured JavaScript error] ' + msg);
};
if (typeof window.jQuery !== 'undefined') {
    window.jQuery('body').ajaxError(function (event, xhr, settings, exception) {
        if (exception === 'abort') { return; }
        window.onerror(event.type + ': ' + settings.type + ' ' + settings.url + ' ' + exception + ' ' + xhr.responseText);
    });
}";

const READ_ERRORS: &str = "window.__testsessionErrors || []";
const RESET_ERRORS: &str = "window.__testsessionErrors = [];";

/// Captures client-side script errors raised while a step runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptErrorMonitor;

impl ScriptErrorMonitor {
    /// Install the error collector.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Driver`] when the script cannot run.
    pub fn before_step<D: BrowserDriver + ?Sized>(self, driver: &mut D) -> Result<(), BrowserError> {
        driver
            .execute_script(INSTALL_COLLECTOR)
            .map_err(BrowserError::driver("install the script error collector"))
    }

    /// Collected errors, oldest first. The collector is emptied afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Driver`] when the page cannot be queried.
    pub fn after_step<D: BrowserDriver + ?Sized>(
        self,
        driver: &mut D,
    ) -> Result<Vec<String>, BrowserError> {
        let collected = driver
            .evaluate_script(READ_ERRORS)
            .map_err(BrowserError::driver("read script errors"))?;
        driver
            .execute_script(RESET_ERRORS)
            .map_err(BrowserError::driver("reset script errors"))?;
        Ok(match collected {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(text) => text,
                    other => other.to_string(),
                })
                .collect(),
            Value::Null => Vec::new(),
            Value::String(text) => vec![text],
            other => vec![other.to_string()],
        })
    }

    /// Like [`ScriptErrorMonitor::after_step`], failing when anything was
    /// captured.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::ScriptErrors`] with the captured messages.
    pub fn ensure_clean<D: BrowserDriver + ?Sized>(self, driver: &mut D) -> Result<(), BrowserError> {
        let errors = self.after_step(driver)?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BrowserError::ScriptErrors { errors })
        }
    }
}

/// Saves a screenshot when a step fails.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotRecorder {
    dir: Option<Utf8PathBuf>,
}

impl ScreenshotRecorder {
    /// Save into `dir`; `None` disables screenshots.
    #[must_use]
    pub const fn new(dir: Option<Utf8PathBuf>) -> Self {
        Self { dir }
    }

    /// Target directory, if any.
    #[must_use]
    pub fn dir(&self) -> Option<&Utf8Path> {
        self.dir.as_deref()
    }

    /// File name used for a failure at `line` of `feature_file`.
    #[must_use]
    pub fn file_name(feature_file: &Utf8Path, line: u32) -> String {
        let stem = feature_file.file_stem().unwrap_or("scenario");
        format!("{stem}_{line}.png")
    }

    /// Capture the page and write it as `<feature-stem>_<line>.png`.
    ///
    /// Returns the written path, or `None` when no directory is configured.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Screenshot`] when the directory cannot be
    /// created or written and [`BrowserError::Driver`] when the capture fails.
    pub fn record<D: BrowserDriver + ?Sized>(
        &self,
        driver: &mut D,
        feature_file: &Utf8Path,
        line: u32,
    ) -> Result<Option<Utf8PathBuf>, BrowserError> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(None);
        };
        fs::create_dir_all(dir).map_err(|source| BrowserError::Screenshot {
            path: dir.to_owned(),
            source,
        })?;
        if !dir.is_dir() {
            return Err(BrowserError::Screenshot {
                path: dir.to_owned(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }
        let image = driver
            .screenshot()
            .map_err(BrowserError::driver("capture a screenshot"))?;
        let path = dir.join(Self::file_name(feature_file, line));
        fs::write(&path, image).map_err(|source| BrowserError::Screenshot {
            path: path.clone(),
            source,
        })?;
        info!(target: "testsession::browser", %path, "saved screenshot");
        Ok(Some(path))
    }
}
