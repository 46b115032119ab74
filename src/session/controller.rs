//! Drives the application under test through one scenario.

use camino::Utf8Path;
use tracing::{info, warn};

use super::{ArtifactTracker, SessionError, SessionOptions, SessionPhase};
use crate::CollaboratorError;
use crate::email::TestMailer;
use crate::state::{DATABASE, MAILER, SessionHandle, SessionState, StateStore};

/// The application under test, as seen by the session lifecycle.
#[cfg_attr(test, mockall::automock)]
pub trait Application {
    /// Adopt the state file behind `handle` and return the parameters that
    /// were actually applied.
    ///
    /// # Errors
    ///
    /// Returns an error when the application refuses the session.
    fn start_session(
        &mut self,
        handle: &SessionHandle,
        requested: &SessionState,
    ) -> Result<SessionState, CollaboratorError>;

    /// Replace the temporary database with a dump.
    ///
    /// # Errors
    ///
    /// Returns an error when the import fails.
    fn import_database(
        &mut self,
        dump: &Utf8Path,
        require_default_records: bool,
    ) -> Result<(), CollaboratorError>;

    /// Create the application's default records.
    ///
    /// # Errors
    ///
    /// Returns an error when the records cannot be created.
    fn require_default_records(&mut self) -> Result<(), CollaboratorError>;

    /// Load a fixture file into the temporary database.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be loaded.
    fn load_fixture_file(&mut self, path: &Utf8Path) -> Result<(), CollaboratorError>;

    /// Remove every record from the temporary database.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be emptied.
    fn empty_database(&mut self) -> Result<(), CollaboratorError>;

    /// Stop using the state file behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns an error when the application cannot end the session.
    fn end_session(&mut self, handle: &SessionHandle) -> Result<(), CollaboratorError>;
}

/// One teardown step that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Step that failed.
    pub stage: &'static str,
    /// Rendered error.
    pub message: String,
}

/// Outcome of [`SessionController::end`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Steps that failed, in the order they ran.
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// Whether every step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, stage: &'static str, err: &dyn std::error::Error) {
        warn!(target: "testsession::session", stage, error = %err, "teardown step failed");
        self.failures.push(TeardownFailure {
            stage,
            message: err.to_string(),
        });
    }
}

/// Coordinates setup and teardown of one scenario's session.
#[derive(Debug)]
pub struct SessionController<A> {
    app: A,
    store: StateStore,
    phase: SessionPhase,
    handle: Option<SessionHandle>,
    artifacts: ArtifactTracker,
}

impl<A: Application> SessionController<A> {
    /// Controller creating state files through `store`.
    #[must_use]
    pub fn new(app: A, store: StateStore) -> Self {
        Self {
            app,
            store,
            phase: SessionPhase::Idle,
            handle: None,
            artifacts: ArtifactTracker::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// State file of the running session.
    #[must_use]
    pub const fn handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    /// Paths created during the scenario, removed at teardown.
    pub const fn artifacts_mut(&mut self) -> &mut ArtifactTracker {
        &mut self.artifacts
    }

    /// The application collaborator.
    #[must_use]
    pub const fn app(&self) -> &A {
        &self.app
    }

    /// Mutable access to the application collaborator.
    pub const fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// Start a session.
    ///
    /// The application must echo back the requested database name, and the
    /// requested mailer when it reports one. A failure after the state file
    /// exists leaves the controller [`SessionPhase::Failed`]; call
    /// [`SessionController::end`] to clean up.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the controller is
    /// idle or torn down, [`SessionError::MissingDatabase`] without a
    /// database name, and the first setup failure otherwise.
    pub fn begin(&mut self, options: &SessionOptions) -> Result<SessionHandle, SessionError> {
        if !self.phase.can_begin() {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                action: "begin",
            });
        }
        let database = options
            .database()
            .ok_or(SessionError::MissingDatabase)?
            .to_owned();
        self.phase = SessionPhase::Starting;
        info!(target: "testsession::session", %database, "starting session");
        match self.start(options, &database) {
            Ok(handle) => {
                self.phase = SessionPhase::Ready;
                info!(target: "testsession::session", path = %handle, "session ready");
                Ok(handle)
            }
            Err(err) => {
                self.phase = SessionPhase::Failed;
                Err(err)
            }
        }
    }

    fn start(
        &mut self,
        options: &SessionOptions,
        database: &str,
    ) -> Result<SessionHandle, SessionError> {
        let requested = options.state();
        let handle = self.store.create(requested)?;
        self.handle = Some(handle.clone());

        let applied = self
            .app
            .start_session(&handle, requested)
            .map_err(SessionError::application("start the session"))?;
        confirm(DATABASE, Some(database), applied.database(), true)?;
        confirm(MAILER, requested.mailer(), applied.mailer(), false)?;
        let state = self.store.apply(&handle, &applied)?;

        let require_defaults = state.require_default_records();
        if let Some(dump) = state.import_database_path() {
            self.app
                .import_database(&dump, require_defaults)
                .map_err(SessionError::application("import the database"))?;
        } else if require_defaults {
            self.app
                .require_default_records()
                .map_err(SessionError::application("create default records"))?;
        }
        if let Some(fixture) = state.fixture() {
            self.app
                .load_fixture_file(&fixture)
                .map_err(SessionError::application("load the fixture file"))?;
        }
        Ok(handle)
    }

    /// Current shared state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] without a state file and
    /// [`SessionError::State`] when it cannot be read.
    pub fn state(&self) -> Result<SessionState, SessionError> {
        let handle = self.require_handle("read the state of")?;
        Ok(self.store.read(handle)?)
    }

    /// Merge `patch` into the shared state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] without a state file and
    /// [`SessionError::State`] for read or write failures.
    pub fn apply_state(&self, patch: &SessionState) -> Result<SessionState, SessionError> {
        let handle = self.require_handle("update the state of")?;
        Ok(self.store.apply(handle, patch)?)
    }

    /// Test mailer recording into this session's state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] without a state file.
    pub fn mailer(&self) -> Result<TestMailer, SessionError> {
        let handle = self.require_handle("read the emails of")?;
        Ok(TestMailer::new(self.store.clone(), handle.clone()))
    }

    fn require_handle(&self, action: &'static str) -> Result<&SessionHandle, SessionError> {
        self.handle.as_ref().ok_or(SessionError::InvalidTransition {
            from: self.phase,
            action,
        })
    }

    /// Tear the session down.
    ///
    /// Empties the database, removes created files newest first, destroys
    /// the state file, then tells the application the session ended. Every
    /// step runs even when an earlier one fails; failures are logged and
    /// returned in the report. Ending an idle or torn-down session does
    /// nothing.
    pub fn end(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.phase.can_begin() {
            return report;
        }
        info!(target: "testsession::session", phase = %self.phase, "tearing down session");

        if let Err(err) = self.app.empty_database() {
            report.record("empty the database", err.as_ref());
        }
        for (path, err) in self.artifacts.remove_all() {
            warn!(target: "testsession::session", %path, "could not remove artifact");
            report.record("remove artifacts", &err);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = self.store.destroy(&handle) {
                report.record("destroy the state file", &err);
            }
            if let Err(err) = self.app.end_session(&handle) {
                report.record("end the session", err.as_ref());
            }
        }
        self.phase = SessionPhase::TornDown;
        report
    }
}

fn confirm(
    key: &'static str,
    requested: Option<&str>,
    applied: Option<&str>,
    required: bool,
) -> Result<(), SessionError> {
    let Some(expected) = requested else {
        return Ok(());
    };
    match applied {
        Some(actual) if actual == expected => Ok(()),
        None if !required => Ok(()),
        other => Err(SessionError::SetupConfirmationMismatch {
            key,
            requested: expected.to_owned(),
            applied: other.unwrap_or_default().to_owned(),
        }),
    }
}
