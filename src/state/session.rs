//! Typed view over the shared session state blob.
//!
//! The blob is a JSON object written by both the test driver and the
//! application under test. Unknown keys are preserved verbatim so either side
//! may store data the other does not understand.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::PrimitiveDateTime;

use super::StateError;
use super::clock;
use crate::email::EmailRecord;

/// JSON object backing a [`SessionState`].
pub type StateMap = serde_json::Map<String, Value>;

/// Key naming the temporary database used by the session.
pub const DATABASE: &str = "database";
/// Key naming the mail transport the application should install.
pub const MAILER: &str = "mailer";
/// Key holding an optional fixture file loaded at session start.
pub const FIXTURE: &str = "fixture";
/// Key holding an optional database dump imported at session start.
pub const IMPORT_DATABASE_PATH: &str = "importDatabasePath";
/// Key toggling creation of default records at session start.
pub const REQUIRE_DEFAULT_RECORDS: &str = "requireDefaultRecords";
/// Key holding the simulated current date and time.
pub const DATETIME: &str = "datetime";
/// Key holding the list of captured emails.
pub const EMAILS: &str = "emails";

/// Key-value state shared between the test driver and the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState(StateMap);

impl SessionState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object.
    #[must_use]
    pub const fn from_map(map: StateMap) -> Self {
        Self(map)
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &StateMap {
        &self.0
    }

    /// Consume the state returning the underlying JSON object.
    #[must_use]
    pub fn into_map(self) -> StateMap {
        self.0
    }

    /// Look up a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Store a raw value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Overwrite keys present in `patch`, keeping all others.
    pub fn merge(&mut self, patch: &Self) {
        for (key, value) in &patch.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Return `true` when no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn str_value(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Name of the temporary database.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.str_value(DATABASE)
    }

    /// Opaque reference to the mail transport.
    #[must_use]
    pub fn mailer(&self) -> Option<&str> {
        self.str_value(MAILER)
    }

    /// Fixture file to load at session start.
    #[must_use]
    pub fn fixture(&self) -> Option<Utf8PathBuf> {
        self.str_value(FIXTURE).map(Utf8PathBuf::from)
    }

    /// Database dump to import at session start.
    #[must_use]
    pub fn import_database_path(&self) -> Option<Utf8PathBuf> {
        self.str_value(IMPORT_DATABASE_PATH).map(Utf8PathBuf::from)
    }

    /// Whether default records should be created at session start.
    ///
    /// Booleans, non-zero numbers, and the strings `"1"` and `"true"` are
    /// truthy. Values arriving through query strings are always strings.
    #[must_use]
    pub fn require_default_records(&self) -> bool {
        match self.0.get(REQUIRE_DEFAULT_RECORDS) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => {
                number.as_i64().is_some_and(|n| n != 0) || number.as_u64().is_some_and(|n| n != 0)
            }
            Some(Value::String(text)) => matches!(text.trim(), "1" | "true"),
            _ => false,
        }
    }

    /// Simulated current date and time, when one has been set.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidDatetime`] when the stored value is not
    /// formatted as `YYYY-MM-DD HH:MM:SS`.
    pub fn datetime(&self) -> Result<Option<PrimitiveDateTime>, StateError> {
        self.str_value(DATETIME).map(clock::parse_datetime).transpose()
    }

    /// Store the simulated current date and time.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidDatetime`] if the value cannot be
    /// formatted.
    pub fn set_datetime(&mut self, datetime: PrimitiveDateTime) -> Result<(), StateError> {
        let formatted = clock::format_datetime(datetime)?;
        self.insert(DATETIME, formatted);
        Ok(())
    }

    /// Emails recorded by the test mailer, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidEmails`] when the entry is present but is
    /// not a list of email records.
    pub fn emails(&self) -> Result<Vec<EmailRecord>, StateError> {
        match self.0.get(EMAILS) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|source| StateError::InvalidEmails { source }),
        }
    }

    /// Append an email record.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidEmails`] when existing records are
    /// malformed.
    pub fn push_email(&mut self, email: EmailRecord) -> Result<(), StateError> {
        let mut emails = self.emails()?;
        emails.push(email);
        let value =
            serde_json::to_value(emails).map_err(|source| StateError::InvalidEmails { source })?;
        self.insert(EMAILS, value);
        Ok(())
    }

    /// Drop every recorded email.
    pub fn clear_emails(&mut self) {
        self.insert(EMAILS, Value::Array(Vec::new()));
    }
}

impl From<StateMap> for SessionState {
    fn from(map: StateMap) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for SessionState {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
