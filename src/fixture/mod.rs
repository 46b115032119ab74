//! Named test records and lazy cross-references between them.
//!
//! Fixtures are created through a [`RecordStore`], the narrow data-access
//! contract of the application under test. The [`FixtureRegistry`] remembers
//! which `(type, identifier)` pair produced which [`RecordId`], and the
//! [`ReferenceResolver`] rewrites `=>Type.identifier` tokens in field values
//! into ids, deferring references to records that do not exist yet.
//! [`FixtureSet`] bundles these with a [`TypeCatalog`] for use by scenario
//! steps.
//!
//! # Examples
//!
//! ```
//! use testsession::fixture::{FieldMap, FixtureSet, MemoryStore, TypeCatalog};
//!
//! let mut fixtures = FixtureSet::new(MemoryStore::default(), TypeCatalog::open());
//! let about = FieldMap::from_iter([("Parent".to_owned(), "=>Page.Home".into())]);
//! fixtures.create("page", "About", about)?;
//! let home = fixtures.create("page", "Home", FieldMap::new())?;
//! fixtures.finish()?;
//! # let _ = home;
//! # Ok::<(), testsession::fixture::FixtureError>(())
//! ```

mod catalog;
mod error;
mod reference;
mod registry;
mod resolver;
mod set;
mod store;
mod yaml;

pub use catalog::{TypeCatalog, TypeDescriptor, TypeKind};
pub use error::FixtureError;
pub use reference::{REFERENCE_PREFIX, Reference};
pub use registry::FixtureRegistry;
pub use resolver::{DeferredReference, ReferenceResolver};
pub use set::FixtureSet;
pub use store::{MemoryStore, RecordStore, StoredRecord};
pub use yaml::{FixtureBatch, FixtureDocument, parse_batch, parse_fixture_file};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field values of a fixture record, in declaration order.
pub type FieldMap = IndexMap<String, serde_json::Value>;

/// Field holding a parent relation.
pub const PARENT_ID_FIELD: &str = "ParentID";

/// Identifier assigned to a record by the [`RecordStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecordId> for serde_json::Value {
    fn from(id: RecordId) -> Self {
        Self::from(id.0)
    }
}

/// `(type, identifier)` pair naming one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixtureKey {
    /// Concrete type name, for example `Page`.
    pub type_name: String,
    /// Scenario-local identifier, for example `Home`.
    pub identifier: String,
}

impl FixtureKey {
    /// Build a key.
    #[must_use]
    pub fn new(type_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for FixtureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.identifier)
    }
}
