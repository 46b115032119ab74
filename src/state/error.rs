//! Error types for the session state store.

use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Errors raised while persisting or interpreting session state.
#[derive(Debug, Error, Diagnostic)]
pub enum StateError {
    /// The state file could not be created, read, written, or removed.
    #[error("failed to {action} session state at {path}")]
    #[diagnostic(code(testsession::state::io))]
    Io {
        /// Operation that failed, for example "read" or "write".
        action: &'static str,
        /// Path of the backing state file.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },

    /// The state file does not hold a JSON object.
    #[error("session state at {path} is corrupt")]
    #[diagnostic(
        code(testsession::state::corrupt),
        help("remove the file or end the session to start from a clean state")
    )]
    Corrupt {
        /// Path of the backing state file.
        path: Utf8PathBuf,
        /// Parser error describing the malformed content.
        #[source]
        source: serde_json::Error,
    },

    /// A date or time override did not match the expected format.
    #[error("invalid {expected} value '{value}'")]
    #[diagnostic(code(testsession::state::invalid_datetime))]
    InvalidDatetime {
        /// Format that was expected, for example `YYYY-MM-DD`.
        expected: &'static str,
        /// Rejected input.
        value: String,
    },

    /// The `emails` entry exists but is not a list of email records.
    #[error("session state holds malformed email records")]
    #[diagnostic(code(testsession::state::invalid_emails))]
    InvalidEmails {
        /// Deserialisation error for the `emails` entry.
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    pub(crate) fn io(action: &'static str, path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
