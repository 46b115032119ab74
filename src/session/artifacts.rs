//! Filesystem paths created during a scenario.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use tracing::debug;

/// Whether an artifact is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// A path created during the scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Created path.
    pub path: Utf8PathBuf,
    /// File or directory.
    pub kind: ArtifactKind,
}

/// Records created paths so teardown can remove them, newest first.
#[derive(Debug, Default)]
pub struct ArtifactTracker {
    created: Vec<Artifact>,
}

impl ArtifactTracker {
    /// Empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a created file.
    pub fn record_file(&mut self, path: impl Into<Utf8PathBuf>) {
        self.created.push(Artifact {
            path: path.into(),
            kind: ArtifactKind::File,
        });
    }

    /// Remember a created directory.
    pub fn record_directory(&mut self, path: impl Into<Utf8PathBuf>) {
        self.created.push(Artifact {
            path: path.into(),
            kind: ArtifactKind::Directory,
        });
    }

    /// Created paths in creation order.
    #[must_use]
    pub fn created(&self) -> &[Artifact] {
        &self.created
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Remove every tracked path in reverse creation order.
    ///
    /// Paths that no longer exist are skipped. Failures are returned rather
    /// than stopping the sweep, and the tracker is empty afterwards, so a
    /// second call does nothing.
    pub fn remove_all(&mut self) -> Vec<(Utf8PathBuf, io::Error)> {
        let mut failures = Vec::new();
        for artifact in self.created.drain(..).rev() {
            match remove(&artifact.path, artifact.kind) {
                Ok(()) => {
                    debug!(target: "testsession::session", path = %artifact.path, "removed artifact");
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => failures.push((artifact.path, err)),
            }
        }
        failures
    }
}

fn remove(path: &Utf8Path, kind: ArtifactKind) -> io::Result<()> {
    match kind {
        ArtifactKind::File => fs::remove_file(path),
        ArtifactKind::Directory => fs::remove_dir_all(path),
    }
}
