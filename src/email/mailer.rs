//! Mail transport that records messages in the shared session state.

use indexmap::IndexMap;
use tracing::debug;

use super::{EmailError, EmailKind, EmailQuery, EmailRecord, find_email};
use crate::state::{SessionHandle, SessionState, StateStore};

/// Message handed to a [`Mailer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: String,
    /// Sender address.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Body; HTML when sent through [`Mailer::send_html`].
    pub body: String,
    /// Plain-text alternative for HTML messages.
    pub plain_body: Option<String>,
    /// Names of attached files.
    pub attached_files: Vec<String>,
    /// Additional headers.
    pub custom_headers: IndexMap<String, String>,
}

/// Outgoing mail transport used by the application under test.
pub trait Mailer {
    /// Send a plain-text message.
    ///
    /// # Errors
    ///
    /// Returns an error when the message cannot be delivered or recorded.
    fn send_plain(&self, email: OutgoingEmail) -> Result<(), EmailError>;

    /// Send a multi-part HTML message.
    ///
    /// # Errors
    ///
    /// Returns an error when the message cannot be delivered or recorded.
    fn send_html(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// Records messages instead of sending them.
///
/// Each call re-reads the state file, so messages recorded by another
/// process are never lost by a stale in-memory copy.
#[derive(Debug, Clone)]
pub struct TestMailer {
    store: StateStore,
    handle: SessionHandle,
}

impl TestMailer {
    /// Record into the state file behind `handle`.
    #[must_use]
    pub const fn new(store: StateStore, handle: SessionHandle) -> Self {
        Self { store, handle }
    }

    /// All recorded emails, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::State`] when the state cannot be read.
    pub fn emails(&self) -> Result<Vec<EmailRecord>, EmailError> {
        Ok(self.store.read(&self.handle)?.emails()?)
    }

    /// Most recently recorded email matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::State`] when the state cannot be read and
    /// [`EmailError::InvalidPattern`] for malformed predicates.
    pub fn find_email(&self, query: &EmailQuery) -> Result<Option<EmailRecord>, EmailError> {
        let emails = self.emails()?;
        Ok(find_email(&emails, query)?.cloned())
    }

    /// Forget every recorded email.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::State`] when the state cannot be updated.
    pub fn clear_emails(&self) -> Result<(), EmailError> {
        let mut patch = SessionState::new();
        patch.clear_emails();
        self.store.apply(&self.handle, &patch)?;
        Ok(())
    }

    fn record(&self, email: EmailRecord) -> Result<(), EmailError> {
        let mut state = self.store.read(&self.handle)?;
        debug!(
            target: "testsession::email",
            to = %email.to,
            subject = %email.subject,
            "recording email"
        );
        state.push_email(email)?;
        self.store.write(&self.handle, &state)?;
        Ok(())
    }
}

impl Mailer for TestMailer {
    fn send_plain(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        self.record(EmailRecord {
            kind: EmailKind::Plain,
            plain_content: Some(email.body.clone()),
            to: email.to,
            from: email.from,
            subject: email.subject,
            content: email.body,
            attached_files: email.attached_files,
            custom_headers: email.custom_headers,
        })
    }

    fn send_html(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        self.record(EmailRecord {
            kind: EmailKind::Html,
            plain_content: email.plain_body,
            to: email.to,
            from: email.from,
            subject: email.subject,
            content: email.body,
            attached_files: email.attached_files,
            custom_headers: email.custom_headers,
        })
    }
}
