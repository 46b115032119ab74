//! Data-access contract used to persist fixtures.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::{FieldMap, FixtureKey, RecordId};
use crate::CollaboratorError;

/// A record as seen through the [`RecordStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Store-assigned id.
    pub id: RecordId,
    /// Current field values.
    pub fields: FieldMap,
}

/// Minimal persistence interface of the application under test.
///
/// Implementations wrap the host ORM; [`MemoryStore`] backs tests and the
/// `check-fixtures` command.
pub trait RecordStore {
    /// Persist a new record and return its id.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's failure unchanged.
    fn create_object(
        &mut self,
        type_name: &str,
        identifier: &str,
        fields: &FieldMap,
    ) -> Result<RecordId, CollaboratorError>;

    /// Merge `fields` into an existing record.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's failure unchanged.
    fn update_object(
        &mut self,
        type_name: &str,
        id: RecordId,
        fields: &FieldMap,
    ) -> Result<(), CollaboratorError>;

    /// Look up a record by identifier.
    fn get(&self, type_name: &str, identifier: &str) -> Option<StoredRecord>;

    /// Look up a record id by identifier.
    fn get_id(&self, type_name: &str, identifier: &str) -> Option<RecordId> {
        self.get(type_name, identifier).map(|record| record.id)
    }
}

/// In-memory [`RecordStore`] with per-type auto-increment ids starting at 1.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: IndexMap<FixtureKey, StoredRecord>,
    next_ids: HashMap<String, u64>,
}

impl MemoryStore {
    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stored records in creation order.
    pub fn records(&self) -> impl Iterator<Item = (&FixtureKey, &StoredRecord)> {
        self.records.iter()
    }
}

impl RecordStore for MemoryStore {
    fn create_object(
        &mut self,
        type_name: &str,
        identifier: &str,
        fields: &FieldMap,
    ) -> Result<RecordId, CollaboratorError> {
        let key = FixtureKey::new(type_name, identifier);
        if self.records.contains_key(&key) {
            return Err(format!("{key} already exists").into());
        }
        let next = self.next_ids.entry(type_name.to_owned()).or_insert(1);
        let id = RecordId::new(*next);
        *next += 1;
        self.records.insert(
            key,
            StoredRecord {
                id,
                fields: fields.clone(),
            },
        );
        Ok(id)
    }

    fn update_object(
        &mut self,
        type_name: &str,
        id: RecordId,
        fields: &FieldMap,
    ) -> Result<(), CollaboratorError> {
        let record = self
            .records
            .iter_mut()
            .find(|(key, record)| key.type_name == type_name && record.id == id)
            .map(|(_, record)| record)
            .ok_or_else(|| format!("no {type_name} record with id {id}"))?;
        for (field, value) in fields {
            record.fields.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    fn get(&self, type_name: &str, identifier: &str) -> Option<StoredRecord> {
        self.records
            .get(&FixtureKey::new(type_name, identifier))
            .cloned()
    }
}
