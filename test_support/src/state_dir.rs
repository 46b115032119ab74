//! Temporary state directories with a ready-made session.
//!
//! Each [`StateDir`] owns a fresh temporary directory, a [`StateStore`] rooted
//! in it, and one state file created from the supplied initial values. The
//! directory and everything in it is removed when the value drops.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use testsession::state::{SessionHandle, SessionState, StateStore};

/// A temporary directory holding one session's state file.
#[derive(Debug)]
pub struct StateDir {
    _dir: TempDir,
    root: Utf8PathBuf,
    store: StateStore,
    handle: SessionHandle,
}

impl StateDir {
    /// Create a temporary directory and a state file holding `initial`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or the state file cannot be
    /// created.
    pub fn with_state(initial: &SessionState) -> Result<Self> {
        let dir = tempfile::tempdir().context("create temporary state directory")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir {}", path.display()))?;
        let store = StateStore::in_dir(&root);
        let handle = store.create(initial).context("create session state")?;
        Ok(Self {
            _dir: dir,
            root,
            store,
            handle,
        })
    }

    /// Create a state directory whose session names `database`.
    ///
    /// # Errors
    ///
    /// See [`StateDir::with_state`].
    pub fn for_database(database: &str) -> Result<Self> {
        let mut initial = SessionState::new();
        initial.insert(testsession::state::DATABASE, database);
        Self::with_state(&initial)
    }

    /// Root of the temporary directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Store rooted in the temporary directory.
    #[must_use]
    pub const fn store(&self) -> &StateStore {
        &self.store
    }

    /// Handle of the session created at construction.
    #[must_use]
    pub const fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// A second store opened from the state file path, as another process
    /// would see it.
    ///
    /// # Errors
    ///
    /// Returns an error when the state file cannot be opened.
    pub fn reopen(&self) -> Result<(StateStore, SessionHandle)> {
        StateStore::open(self.handle.path()).context("reopen session state")
    }
}
