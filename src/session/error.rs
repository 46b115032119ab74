//! Error types for the session lifecycle.

use miette::Diagnostic;
use thiserror::Error;

use super::SessionPhase;
use crate::CollaboratorError;
use crate::state::StateError;

/// Errors raised while starting or driving a test session.
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    /// The shared state file could not be used.
    #[error(transparent)]
    #[diagnostic(transparent)]
    State(#[from] StateError),

    /// The application applied different parameters from those requested.
    #[error("application applied {key} '{applied}' but '{requested}' was requested")]
    #[diagnostic(
        code(testsession::session::setup_confirmation_mismatch),
        help("check that the application under test honours the session parameters")
    )]
    SetupConfirmationMismatch {
        /// Parameter that differs.
        key: &'static str,
        /// Value sent to the application.
        requested: String,
        /// Value echoed back by the application.
        applied: String,
    },

    /// No database name was supplied.
    #[error("a session needs a temporary database name")]
    #[diagnostic(code(testsession::session::missing_database))]
    MissingDatabase,

    /// The requested operation is not valid in the current phase.
    #[error("cannot {action} a session that is {from}")]
    #[diagnostic(code(testsession::session::invalid_transition))]
    InvalidTransition {
        /// Phase the session was in.
        from: SessionPhase,
        /// Operation that was attempted.
        action: &'static str,
    },

    /// The application under test reported a failure.
    #[error("application failed to {stage}")]
    #[diagnostic(code(testsession::session::application))]
    Application {
        /// Lifecycle step that failed.
        stage: &'static str,
        /// Collaborator failure.
        #[source]
        source: CollaboratorError,
    },
}

impl SessionError {
    pub(crate) fn application(stage: &'static str) -> impl FnOnce(CollaboratorError) -> Self {
        move |source| Self::Application { stage, source }
    }
}
