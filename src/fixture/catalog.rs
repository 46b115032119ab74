//! Mapping from the labels used in scenario steps to concrete types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{FieldMap, FixtureError};

/// What a type's fixtures represent on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Plain database record.
    #[default]
    Record,
    /// Uploaded file copied into the assets directory.
    File,
    /// Directory under the assets directory.
    Folder,
}

/// Description of one fixture type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Concrete type name used by the record store.
    pub name: String,
    /// Human-readable singular name, for example `redirector page`.
    #[serde(default)]
    pub singular_name: Option<String>,
    /// Field labels keyed by label, mapping to field names.
    #[serde(default)]
    pub field_labels: IndexMap<String, String>,
    /// Fields that must be set when the record is created.
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Record, file, or folder.
    #[serde(default)]
    pub kind: TypeKind,
}

impl TypeDescriptor {
    /// Plain record type without labels or required fields.
    #[must_use]
    pub fn record(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            singular_name: None,
            field_labels: IndexMap::new(),
            required_fields: Vec::new(),
            kind: TypeKind::Record,
        }
    }

    /// Set the kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the singular name.
    #[must_use]
    pub fn with_singular_name(mut self, singular_name: impl Into<String>) -> Self {
        self.singular_name = Some(singular_name.into());
        self
    }

    /// Map a field label to a field name.
    #[must_use]
    pub fn with_field_label(mut self, label: impl Into<String>, field: impl Into<String>) -> Self {
        self.field_labels.insert(label.into(), field.into());
        self
    }

    /// Mark a field as required at creation.
    #[must_use]
    pub fn with_required_field(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }

    /// Whether `field` must be set when the record is created.
    #[must_use]
    pub fn is_required(&self, field: &str) -> bool {
        self.required_fields.iter().any(|required| required == field)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    open: bool,
    #[serde(default)]
    types: Vec<TypeDescriptor>,
}

/// Resolves step labels such as `"redirector page"` to [`TypeDescriptor`]s.
///
/// A strict catalog only knows the types inserted into it. An open catalog
/// additionally accepts any label, treating its title-cased form as a plain
/// record type.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: IndexMap<String, TypeDescriptor>,
    open: bool,
}

impl TypeCatalog {
    /// Empty strict catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty open catalog.
    #[must_use]
    pub fn open() -> Self {
        Self {
            types: IndexMap::new(),
            open: true,
        }
    }

    /// Whether unknown labels resolve to plain record types.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Register a type, replacing any previous descriptor of the same name.
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Builder form of [`TypeCatalog::insert`].
    #[must_use]
    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Load a catalog from YAML.
    ///
    /// ```yaml
    /// open: true
    /// types:
    ///   - name: RedirectorPage
    ///     singular_name: redirector page
    ///     required_fields: [ExternalURL]
    ///   - name: Image
    ///     kind: file
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::InvalidDocument`] when the YAML does not
    /// describe a catalog.
    pub fn from_yaml(name: &str, src: &str) -> Result<Self, FixtureError> {
        let file: CatalogFile =
            serde_saphyr::from_str(src).map_err(|err| FixtureError::InvalidDocument {
                name: name.to_owned(),
                reason: err.to_string(),
            })?;
        let mut catalog = Self {
            types: IndexMap::new(),
            open: file.open,
        };
        for descriptor in file.types {
            catalog.insert(descriptor);
        }
        Ok(catalog)
    }

    /// Resolve a step label or type name.
    ///
    /// The label is trimmed, each word title-cased, and spaces removed; a
    /// registered type of that name wins. Otherwise a type whose singular
    /// name matches the label case-insensitively is used.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::UnknownType`] when nothing matches in a strict
    /// catalog, or when the label is blank.
    pub fn resolve(&self, label: &str) -> Result<TypeDescriptor, FixtureError> {
        let unknown = || FixtureError::UnknownType {
            label: label.to_owned(),
        };
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(unknown());
        }
        let name = type_name_for(trimmed);
        if let Some(descriptor) = self.types.get(&name) {
            return Ok(descriptor.clone());
        }
        let by_singular = self.types.values().find(|descriptor| {
            descriptor
                .singular_name
                .as_deref()
                .is_some_and(|singular| singular.trim().eq_ignore_ascii_case(trimmed))
        });
        match by_singular {
            Some(descriptor) => Ok(descriptor.clone()),
            None if self.open => Ok(TypeDescriptor::record(name)),
            None => Err(unknown()),
        }
    }

    /// Replace field labels by field names.
    ///
    /// Keys that are not labels of the type are kept as written.
    #[must_use]
    pub fn convert_fields(descriptor: &TypeDescriptor, fields: FieldMap) -> FieldMap {
        fields
            .into_iter()
            .map(|(key, value)| {
                let field = descriptor.field_labels.get(&key).cloned().unwrap_or(key);
                (field, value)
            })
            .collect()
    }
}

/// Title-case each word and drop whitespace: `"redirector page"` becomes
/// `RedirectorPage`.
fn type_name_for(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect()
}
