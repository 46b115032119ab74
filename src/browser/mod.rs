//! Browser automation helpers used around scenario steps.
//!
//! The crate does not ship a driver. Callers implement [`BrowserDriver`] over
//! their automation client; the helpers here only issue scripts, read
//! results, and write files.

mod ajax;
mod error;
mod hooks;
mod location;
mod screen;

pub use ajax::{AJAX_SETTLE_DELAY, AjaxWatcher, DEFAULT_AJAX_TIMEOUT, WaitOutcome};
pub use error::BrowserError;
pub use hooks::{ScreenshotRecorder, ScriptErrorMonitor};
pub use location::{current_url_is_similar_to, is_current_url_similar_to, join_url_parts};
pub use screen::ScreenSize;

use serde_json::Value;

use crate::CollaboratorError;

/// Minimal browser automation surface.
#[cfg_attr(test, mockall::automock)]
pub trait BrowserDriver {
    /// Navigate to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when navigation fails.
    fn visit(&mut self, url: &str) -> Result<(), CollaboratorError>;

    /// URL of the current page.
    ///
    /// # Errors
    ///
    /// Returns an error when the driver cannot report it.
    fn current_url(&self) -> Result<String, CollaboratorError>;

    /// Run `script` in the page, discarding its result.
    ///
    /// # Errors
    ///
    /// Returns an error when the script cannot run.
    fn execute_script(&mut self, script: &str) -> Result<(), CollaboratorError>;

    /// Evaluate the JavaScript expression `expression` and return its value.
    ///
    /// # Errors
    ///
    /// Returns an error when evaluation fails.
    fn evaluate_script(&mut self, expression: &str) -> Result<Value, CollaboratorError>;

    /// Resize the window.
    ///
    /// # Errors
    ///
    /// Returns an error when the window cannot be resized.
    fn resize_window(&mut self, size: ScreenSize) -> Result<(), CollaboratorError>;

    /// Capture the visible page as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error when the driver cannot capture screenshots.
    fn screenshot(&mut self) -> Result<Vec<u8>, CollaboratorError>;
}
