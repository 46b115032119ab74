//! Captured email records and the test mail transport.
//!
//! The application under test installs [`TestMailer`] instead of a real
//! transport. Every message is appended to the `emails` list of the shared
//! session state so steps running in the test driver can assert on it.

mod link;
mod mailer;
mod query;

pub use link::find_link;
pub use mailer::{Mailer, OutgoingEmail, TestMailer};
pub use query::{EmailQuery, FieldMatcher, find_email};

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::StateError;

/// Value stored under the `mailer` session key to select [`TestMailer`].
pub const TEST_MAILER: &str = "testsession::email::TestMailer";

/// Body format of a captured email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    /// Plain-text message.
    Plain,
    /// Multi-part HTML message.
    Html,
}

/// One email captured by the test mailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    /// Body format.
    #[serde(rename = "type")]
    pub kind: EmailKind,
    /// Recipient address.
    pub to: String,
    /// Sender address.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Message body, HTML for [`EmailKind::Html`].
    pub content: String,
    /// Plain-text alternative body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_content: Option<String>,
    /// Names of attached files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attached_files: Vec<String>,
    /// Additional headers.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub custom_headers: IndexMap<String, String>,
}

/// Errors raised while recording or querying emails.
#[derive(Debug, Error, Diagnostic)]
pub enum EmailError {
    /// Reading or writing the shared session state failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    State(#[from] StateError),

    /// A `/pattern/flags` predicate could not be compiled.
    #[error("invalid email pattern '{pattern}': {reason}")]
    #[diagnostic(
        code(testsession::email::invalid_pattern),
        help("patterns look like /expression/flags with flags drawn from i, m, s, x")
    )]
    InvalidPattern {
        /// Predicate as supplied.
        pattern: String,
        /// Explanation of the failure.
        reason: String,
    },
}
