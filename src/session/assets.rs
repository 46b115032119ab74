//! Materialises file and folder fixtures under the assets directory.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::fs;
use std::io;

use super::ArtifactTracker;
use crate::fixture::{FieldMap, FixtureError, TypeDescriptor, TypeKind};

const FILENAME_FIELD: &str = "Filename";
const NAME_FIELD: &str = "Name";

/// Copies fixture files into the web root and creates fixture folders.
///
/// Sources are looked up by basename in `files_path`; targets live under
/// `assets_root/assets_dir`.
#[derive(Debug, Clone)]
pub struct AssetPreparer {
    files_path: Utf8PathBuf,
    assets_root: Utf8PathBuf,
    assets_dir: String,
}

impl AssetPreparer {
    /// Prepare assets under `assets_root/assets`.
    #[must_use]
    pub fn new(files_path: impl Into<Utf8PathBuf>, assets_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            files_path: files_path.into(),
            assets_root: assets_root.into(),
            assets_dir: "assets".to_owned(),
        }
    }

    /// Use a different assets directory name.
    #[must_use]
    pub fn with_assets_dir(mut self, assets_dir: impl Into<String>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    /// Create the file or folder behind a fixture and fill in its
    /// `Filename` and `Name` fields. Plain records are left alone.
    ///
    /// The relative path comes from the `Filename` field when present,
    /// otherwise from the identifier. Every created path is recorded in
    /// `tracker`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::AssetSourceMissing`] when a file's source does
    /// not exist and [`FixtureError::AssetIo`] for filesystem failures or
    /// paths escaping the assets directory.
    pub fn prepare(
        &self,
        descriptor: &TypeDescriptor,
        identifier: &str,
        fields: &mut FieldMap,
        tracker: &mut ArtifactTracker,
    ) -> Result<(), FixtureError> {
        if descriptor.kind == TypeKind::Record {
            return Ok(());
        }
        let requested = fields
            .get(FILENAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or(identifier);
        let relative = self.relative_path(requested)?;
        let target = self.assets_root.join(&self.assets_dir).join(&relative);
        let basename = relative.file_name().unwrap_or(identifier).to_owned();

        if descriptor.kind == TypeKind::Folder {
            ensure_dir(&target, &self.assets_root, tracker)?;
        } else {
            let source = self.files_path.join(&basename);
            if !source.is_file() {
                return Err(FixtureError::AssetSourceMissing { path: source });
            }
            if let Some(parent) = target.parent() {
                ensure_dir(parent, &self.assets_root, tracker)?;
            }
            let existed = target.exists();
            fs::copy(&source, &target).map_err(|err| FixtureError::asset_io("copy", &target, err))?;
            if !existed {
                tracker.record_file(&target);
            }
        }

        fields.insert(
            FILENAME_FIELD.to_owned(),
            Value::from(format!("{}/{relative}", self.assets_dir)),
        );
        fields
            .entry(NAME_FIELD.to_owned())
            .or_insert_with(|| Value::from(basename));
        Ok(())
    }

    fn relative_path(&self, requested: &str) -> Result<Utf8PathBuf, FixtureError> {
        let trimmed = requested.trim().trim_start_matches('/');
        let without_prefix = Utf8Path::new(trimmed)
            .strip_prefix(&self.assets_dir)
            .unwrap_or_else(|_| Utf8Path::new(trimmed));
        let mut relative = Utf8PathBuf::new();
        for component in without_prefix.components() {
            match component {
                Utf8Component::Normal(part) => relative.push(part),
                Utf8Component::CurDir => {}
                _ => {
                    return Err(FixtureError::asset_io(
                        "resolve",
                        requested,
                        io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "asset paths must stay inside the assets directory",
                        ),
                    ));
                }
            }
        }
        if relative.as_str().is_empty() {
            return Err(FixtureError::asset_io(
                "resolve",
                requested,
                io::Error::new(io::ErrorKind::InvalidInput, "asset path is empty"),
            ));
        }
        Ok(relative)
    }
}

/// Create `dir` and any missing ancestors below `boundary`, recording each.
fn ensure_dir(
    dir: &Utf8Path,
    boundary: &Utf8Path,
    tracker: &mut ArtifactTracker,
) -> Result<(), FixtureError> {
    let missing: Vec<&Utf8Path> = dir
        .ancestors()
        .take_while(|path| *path != boundary && !path.exists())
        .collect();
    for path in missing.into_iter().rev() {
        fs::create_dir(path).map_err(|err| FixtureError::asset_io("create", path, err))?;
        tracker.record_directory(path);
    }
    Ok(())
}
