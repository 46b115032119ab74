//! Errors raised by browser helpers.

use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

use crate::CollaboratorError;

/// Errors raised while driving or inspecting the browser.
#[derive(Debug, Error, Diagnostic)]
pub enum BrowserError {
    /// The browser driver reported a failure.
    #[error("browser driver failed to {action}")]
    #[diagnostic(code(testsession::browser::driver))]
    Driver {
        /// Operation that failed.
        action: &'static str,
        /// Driver failure.
        #[source]
        source: CollaboratorError,
    },

    /// The configured AJAX step fragments do not form a valid expression.
    #[error("invalid AJAX step pattern '{pattern}'")]
    #[diagnostic(
        code(testsession::browser::invalid_ajax_pattern),
        help("each entry in ajax_steps is a regular expression fragment")
    )]
    InvalidAjaxPattern {
        /// Combined expression.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },

    /// A screenshot could not be written.
    #[error("failed to save screenshot to {path}")]
    #[diagnostic(code(testsession::browser::screenshot))]
    Screenshot {
        /// Target file or directory.
        path: Utf8PathBuf,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },

    /// Client-side script errors were captured during a step.
    #[error("captured {} client-side script error(s): {}", errors.len(), errors.join("; "))]
    #[diagnostic(code(testsession::browser::script_errors))]
    ScriptErrors {
        /// Captured messages, oldest first.
        errors: Vec<String>,
    },

    /// A screen size was not formatted as `WIDTHxHEIGHT`.
    #[error("invalid screen size '{value}': {reason}")]
    #[diagnostic(
        code(testsession::browser::invalid_screen_size),
        help("use WIDTHxHEIGHT, for example 1280x1024")
    )]
    InvalidScreenSize {
        /// Rejected value.
        value: String,
        /// Explanation of the failure.
        reason: &'static str,
    },

    /// A URL could not be built or parsed.
    #[error("invalid URL '{url}': {reason}")]
    #[diagnostic(code(testsession::browser::invalid_url))]
    InvalidUrl {
        /// Offending input.
        url: String,
        /// Explanation of the failure.
        reason: String,
    },
}

impl BrowserError {
    pub(crate) fn driver(action: &'static str) -> impl FnOnce(CollaboratorError) -> Self {
        move |source| Self::Driver { action, source }
    }
}
