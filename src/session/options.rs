//! Parameters requested when a session starts.

use camino::Utf8Path;
use serde_json::Value;
use session_env::TESTSESSION_PARAMS_ENV;
use url::form_urlencoded;

use crate::email::TEST_MAILER;
use crate::state::{
    DATABASE, FIXTURE, IMPORT_DATABASE_PATH, MAILER, REQUIRE_DEFAULT_RECORDS, SessionState,
};

/// Session parameters sent to the application under test.
///
/// # Examples
///
/// ```
/// use testsession::session::SessionOptions;
///
/// let options = SessionOptions::from_params("ss_tmpdb_1", Some("fixture=site.yml&mailer=Noop"));
/// assert_eq!(options.database(), Some("ss_tmpdb_1"));
/// assert_eq!(options.state().mailer(), Some("Noop"));
/// assert_eq!(options.state().fixture().as_deref().map(|p| p.as_str()), Some("site.yml"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    state: SessionState,
}

impl SessionOptions {
    /// Request `database` with the test mailer installed.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        let mut state = SessionState::new();
        state.insert(DATABASE, database.into());
        state.insert(MAILER, TEST_MAILER);
        Self { state }
    }

    /// Merge a URL-encoded query string over the defaults.
    ///
    /// Parameters from the query string win over `database` and `mailer`.
    /// Values are kept as strings.
    #[must_use]
    pub fn from_params(database: impl Into<String>, raw_params: Option<&str>) -> Self {
        let mut options = Self::new(database);
        let params = raw_params.map(str::trim).unwrap_or_default();
        for (key, value) in form_urlencoded::parse(params.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            options.state.insert(key.into_owned(), value.into_owned());
        }
        options
    }

    /// Like [`SessionOptions::from_params`], reading `TESTSESSION_PARAMS`.
    #[must_use]
    pub fn from_env(database: impl Into<String>) -> Self {
        let params = std::env::var(TESTSESSION_PARAMS_ENV).ok();
        Self::from_params(database, params.as_deref())
    }

    /// Override the mail transport.
    #[must_use]
    pub fn with_mailer(mut self, mailer: impl Into<String>) -> Self {
        self.state.insert(MAILER, mailer.into());
        self
    }

    /// Load a fixture file once the session has started.
    #[must_use]
    pub fn with_fixture(mut self, path: &Utf8Path) -> Self {
        self.state.insert(FIXTURE, path.as_str());
        self
    }

    /// Import a database dump once the session has started.
    #[must_use]
    pub fn with_import_database(mut self, path: &Utf8Path) -> Self {
        self.state.insert(IMPORT_DATABASE_PATH, path.as_str());
        self
    }

    /// Ask the application to create its default records.
    #[must_use]
    pub fn with_require_default_records(mut self, enabled: bool) -> Self {
        self.state.insert(REQUIRE_DEFAULT_RECORDS, enabled);
        self
    }

    /// Set an arbitrary parameter.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.insert(key, value);
        self
    }

    /// Requested database name.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.state.database()
    }

    /// Requested state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }
}
