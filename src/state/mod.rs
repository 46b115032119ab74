//! File-backed session state shared between processes.
//!
//! The test driver creates a state file at scenario start and hands its path
//! to the application under test. Both processes then read and write the same
//! JSON object. Writes replace the whole file through an atomic rename, so a
//! reader never observes a partially written document, but no locking is
//! performed: concurrent writers race and the last rename wins.
//!
//! # Examples
//!
//! ```
//! use testsession::state::{SessionState, StateStore};
//!
//! let dir = tempfile::tempdir()?;
//! let store = StateStore::in_dir(camino::Utf8Path::from_path(dir.path()).expect("utf-8"));
//! let mut initial = SessionState::new();
//! initial.insert("database", "test1");
//! let handle = store.create(&initial)?;
//! assert_eq!(store.read(&handle)?.database(), Some("test1"));
//! store.destroy(&handle)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod clock;
mod error;
mod session;

pub use clock::{set_current_date, set_current_time};
pub use error::StateError;
pub use session::{
    DATABASE, DATETIME, EMAILS, FIXTURE, IMPORT_DATABASE_PATH, MAILER, REQUIRE_DEFAULT_RECORDS,
    SessionState, StateMap,
};

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::Error as _;
use std::fs;
use std::io::{self, Write};
use tempfile::Builder;
use tracing::debug;

const STATE_PREFIX: &str = "testsession.";
const STATE_SUFFIX: &str = ".json";

/// Location of one session's state file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(Utf8PathBuf);

impl SessionHandle {
    /// Refer to an existing state file, typically one created by another
    /// process.
    #[must_use]
    pub fn from_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self(path.into())
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creates, reads, writes, and destroys session state files.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: Utf8PathBuf,
}

impl StateStore {
    /// Store new state files inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Utf8Path) -> Self {
        Self {
            dir: dir.to_owned(),
        }
    }

    /// Store new state files in the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] when the temporary directory path is not
    /// valid UTF-8.
    pub fn in_temp_dir() -> Result<Self, StateError> {
        let temp = std::env::temp_dir();
        let dir = Utf8PathBuf::from_path_buf(temp).map_err(|path| {
            StateError::io(
                "locate",
                path.to_string_lossy().into_owned(),
                io::Error::new(io::ErrorKind::InvalidData, "temporary directory is not UTF-8"),
            )
        })?;
        Ok(Self { dir })
    }

    /// Attach to a state file created elsewhere, typically by the test
    /// driver when called from the application under test.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] when the file does not exist or is not a
    /// regular file.
    pub fn open(path: &Utf8Path) -> Result<(Self, SessionHandle), StateError> {
        let metadata = fs::metadata(path).map_err(|source| StateError::io("open", path, source))?;
        if !metadata.is_file() {
            return Err(StateError::io(
                "open",
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let dir = path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        Ok((Self::in_dir(dir), SessionHandle::from_path(path)))
    }

    /// Directory receiving new state files.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Persist `initial` to a new, uniquely named state file.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] when the directory is not writable.
    pub fn create(&self, initial: &SessionState) -> Result<SessionHandle, StateError> {
        let file = Builder::new()
            .prefix(STATE_PREFIX)
            .suffix(STATE_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(|source| StateError::io("create", self.dir.as_path(), source))?;
        let (_file, path) = file
            .keep()
            .map_err(|err| StateError::io("create", self.dir.as_path(), err.error))?;
        let handle = Utf8PathBuf::from_path_buf(path)
            .map(SessionHandle)
            .map_err(|path| {
                StateError::io(
                    "create",
                    path.to_string_lossy().into_owned(),
                    io::Error::new(io::ErrorKind::InvalidData, "state path is not UTF-8"),
                )
            })?;
        self.write(&handle, initial)?;
        debug!(target: "testsession::state", path = %handle, "created session state");
        Ok(handle)
    }

    /// Read the current state.
    ///
    /// An empty file reads as an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] when the file cannot be read and
    /// [`StateError::Corrupt`] when it does not hold a JSON object.
    pub fn read(&self, handle: &SessionHandle) -> Result<SessionState, StateError> {
        let path = handle.path();
        let content =
            fs::read_to_string(path).map_err(|source| StateError::io("read", path, source))?;
        if content.trim().is_empty() {
            return Ok(SessionState::new());
        }
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
                path: path.to_owned(),
                source,
            })?;
        match value {
            serde_json::Value::Object(map) => Ok(SessionState::from_map(map)),
            other => Err(StateError::Corrupt {
                path: path.to_owned(),
                source: serde_json::Error::custom(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )),
            }),
        }
    }

    /// Replace the state with `state`.
    ///
    /// The new content is written to a sibling temporary file which is then
    /// renamed over the state file.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] when the file cannot be written.
    pub fn write(&self, handle: &SessionHandle, state: &SessionState) -> Result<(), StateError> {
        let path = handle.path();
        let parent = path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .unwrap_or(self.dir.as_path());
        let body = serde_json::to_vec_pretty(state).map_err(|source| StateError::Corrupt {
            path: path.to_owned(),
            source,
        })?;
        let mut tmp = Builder::new()
            .prefix(".testsession-write.")
            .tempfile_in(parent)
            .map_err(|source| StateError::io("write", path, source))?;
        tmp.write_all(&body)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|source| StateError::io("write", path, source))?;
        tmp.persist(path)
            .map_err(|err| StateError::io("write", path, err.error))?;
        Ok(())
    }

    /// Merge `patch` into the stored state and persist the result.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures.
    pub fn apply(
        &self,
        handle: &SessionHandle,
        patch: &SessionState,
    ) -> Result<SessionState, StateError> {
        let mut state = self.read(handle)?;
        state.merge(patch);
        self.write(handle, &state)?;
        Ok(state)
    }

    /// Remove the state file. Removing an absent file succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] for failures other than a missing file.
    pub fn destroy(&self, handle: &SessionHandle) -> Result<(), StateError> {
        match fs::remove_file(handle.path()) {
            Ok(()) => {
                debug!(target: "testsession::state", path = %handle, "destroyed session state");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::io("remove", handle.path(), source)),
        }
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
