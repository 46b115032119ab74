//! Per-scenario session lifecycle.
//!
//! A [`SessionController`] creates the shared state file, asks the
//! application under test to adopt it, checks the parameters the application
//! echoes back, and prepares the requested data. At scenario end it tears
//! everything down on a best-effort basis.
//!
//! ```text
//! Idle -> Starting -> Ready -> TornDown
//!            |          |
//!            +-> Failed +--> (end) -> TornDown
//! ```

mod artifacts;
mod assets;
mod controller;
mod error;
mod options;

pub use artifacts::{Artifact, ArtifactKind, ArtifactTracker};
pub use assets::AssetPreparer;
pub use controller::{Application, SessionController, TeardownFailure, TeardownReport};
pub use error::SessionError;
pub use options::SessionOptions;

use std::fmt;

/// Lifecycle phase of a [`SessionController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No session has been started.
    #[default]
    Idle,
    /// The state file exists and the application is being configured.
    Starting,
    /// Setup completed; the scenario may run.
    Ready,
    /// Teardown has run.
    TornDown,
    /// Setup failed; only teardown is allowed.
    Failed,
}

impl SessionPhase {
    /// Whether a new session may begin from this phase.
    #[must_use]
    pub const fn can_begin(self) -> bool {
        matches!(self, Self::Idle | Self::TornDown)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::TornDown => "torn down",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}
