//! Scenario-scoped map from fixture names to record ids.

use indexmap::IndexMap;
use tracing::debug;

use super::{FieldMap, FixtureError, FixtureKey, RecordId, RecordStore, StoredRecord};

/// Tracks which `(type, identifier)` produced which record.
///
/// Lookups fall back to the [`RecordStore`], so records created outside the
/// registry (for example by a fixture file loaded by the application at
/// session start) can still be referenced.
#[derive(Debug)]
pub struct FixtureRegistry<S> {
    store: S,
    ids: IndexMap<FixtureKey, RecordId>,
}

impl<S: RecordStore> FixtureRegistry<S> {
    /// Start an empty registry over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            ids: IndexMap::new(),
        }
    }

    /// Create a record and remember its id.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Duplicate`] when the identifier is already
    /// known for the type and [`FixtureError::Store`] when the store rejects
    /// the record.
    pub fn define(
        &mut self,
        type_name: &str,
        identifier: &str,
        fields: &FieldMap,
    ) -> Result<RecordId, FixtureError> {
        if self.get(type_name, identifier).is_some() {
            return Err(FixtureError::Duplicate {
                type_name: type_name.to_owned(),
                identifier: identifier.to_owned(),
            });
        }
        let id = self
            .store
            .create_object(type_name, identifier, fields)
            .map_err(|source| FixtureError::Store {
                type_name: type_name.to_owned(),
                identifier: identifier.to_owned(),
                source,
            })?;
        debug!(target: "testsession::fixture", %type_name, %identifier, %id, "defined fixture");
        self.ids.insert(FixtureKey::new(type_name, identifier), id);
        Ok(id)
    }

    /// Id of a known record, or `None`.
    #[must_use]
    pub fn get(&self, type_name: &str, identifier: &str) -> Option<RecordId> {
        self.ids
            .get(&FixtureKey::new(type_name, identifier))
            .copied()
            .or_else(|| self.store.get_id(type_name, identifier))
    }

    /// Id of a record that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Unknown`] when no record is known.
    pub fn id_for(&self, type_name: &str, identifier: &str) -> Result<RecordId, FixtureError> {
        self.get(type_name, identifier)
            .ok_or_else(|| FixtureError::unknown(type_name, identifier))
    }

    /// Full record as held by the store.
    #[must_use]
    pub fn record(&self, type_name: &str, identifier: &str) -> Option<StoredRecord> {
        self.store.get(type_name, identifier)
    }

    /// Merge `fields` into an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Store`] when the store rejects the update.
    pub fn update(
        &mut self,
        type_name: &str,
        identifier: &str,
        id: RecordId,
        fields: &FieldMap,
    ) -> Result<(), FixtureError> {
        self.store
            .update_object(type_name, id, fields)
            .map_err(|source| FixtureError::Store {
                type_name: type_name.to_owned(),
                identifier: identifier.to_owned(),
                source,
            })
    }

    /// Update the record when it exists, otherwise define it.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn upsert(
        &mut self,
        type_name: &str,
        identifier: &str,
        fields: &FieldMap,
    ) -> Result<RecordId, FixtureError> {
        if let Some(id) = self.get(type_name, identifier) {
            self.update(type_name, identifier, id, fields)?;
            return Ok(id);
        }
        self.define(type_name, identifier, fields)
    }

    /// Fixtures defined through this registry, in definition order.
    pub fn entries(&self) -> impl Iterator<Item = (&FixtureKey, RecordId)> {
        self.ids.iter().map(|(key, id)| (key, *id))
    }

    /// Forget every mapping. Records in the store are left alone.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Borrow the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Give back the underlying store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::MemoryStore;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn registry() -> FixtureRegistry<MemoryStore> {
        FixtureRegistry::new(MemoryStore::default())
    }

    #[rstest]
    fn get_is_stable_after_define(mut registry: FixtureRegistry<MemoryStore>) {
        let id = registry
            .define("Page", "Home", &FieldMap::new())
            .expect("define");
        for _ in 0..3 {
            assert_eq!(registry.get("Page", "Home"), Some(id));
        }
        assert_eq!(registry.id_for("Page", "Home").expect("id"), id);
    }

    #[rstest]
    fn redefining_fails(mut registry: FixtureRegistry<MemoryStore>) {
        registry
            .define("Page", "Home", &FieldMap::new())
            .expect("define");
        let err = registry
            .define("Page", "Home", &FieldMap::new())
            .expect_err("duplicate");
        assert!(matches!(err, FixtureError::Duplicate { .. }));
    }

    #[rstest]
    fn identifiers_are_scoped_per_type(mut registry: FixtureRegistry<MemoryStore>) {
        registry
            .define("Page", "Home", &FieldMap::new())
            .expect("define page");
        registry
            .define("Group", "Home", &FieldMap::new())
            .expect("define group");
    }

    #[rstest]
    fn missing_lookups(registry: FixtureRegistry<MemoryStore>) {
        assert_eq!(registry.get("Page", "Nope"), None);
        let err = registry.id_for("Page", "Nope").expect_err("unknown");
        assert!(matches!(err, FixtureError::Unknown { .. }));
    }

    #[test]
    fn records_created_outside_are_visible() {
        let mut store = MemoryStore::default();
        let id = store
            .create_object("Page", "Preloaded", &FieldMap::new())
            .expect("seed");
        let registry = FixtureRegistry::new(store);
        assert_eq!(registry.get("Page", "Preloaded"), Some(id));
        assert_eq!(registry.entries().count(), 0);
    }

    #[rstest]
    fn upsert_updates_in_place(mut registry: FixtureRegistry<MemoryStore>) {
        let id = registry
            .define("Page", "Home", &FieldMap::new())
            .expect("define");
        let fields = FieldMap::from_iter([("Title".to_owned(), json!("Welcome"))]);
        assert_eq!(registry.upsert("Page", "Home", &fields).expect("upsert"), id);
        let record = registry.record("Page", "Home").expect("record");
        assert_eq!(record.fields.get("Title"), Some(&json!("Welcome")));
    }
}
