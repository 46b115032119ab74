//! Scenario-facing façade over catalog, registry, and resolver.

use serde_json::Value;
use tracing::info;

use super::{
    DeferredReference, FieldMap, FixtureError, FixtureRegistry, PARENT_ID_FIELD, RecordId,
    RecordStore, Reference, ReferenceResolver, TypeCatalog, TypeDescriptor, parse_batch,
    parse_fixture_file,
};

/// All fixtures of one scenario.
#[derive(Debug)]
pub struct FixtureSet<S> {
    catalog: TypeCatalog,
    registry: FixtureRegistry<S>,
    resolver: ReferenceResolver,
}

impl<S: RecordStore> FixtureSet<S> {
    /// Start an empty set over `store`.
    #[must_use]
    pub fn new(store: S, catalog: TypeCatalog) -> Self {
        Self {
            catalog,
            registry: FixtureRegistry::new(store),
            resolver: ReferenceResolver::new(),
        }
    }

    /// Type catalog used for label resolution.
    #[must_use]
    pub const fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Registry of defined fixtures.
    #[must_use]
    pub const fn registry(&self) -> &FixtureRegistry<S> {
        &self.registry
    }

    /// References waiting for their targets.
    #[must_use]
    pub fn pending(&self) -> &[DeferredReference] {
        self.resolver.pending()
    }

    /// Define a record from a step such as `Given a "page" "Home"`.
    ///
    /// Field labels are converted to field names first.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::UnknownType`] for unknown labels plus any
    /// definition failure.
    pub fn create(
        &mut self,
        label: &str,
        identifier: &str,
        fields: FieldMap,
    ) -> Result<RecordId, FixtureError> {
        self.create_with(label, identifier, fields, |_, _| Ok(()))
    }

    /// Like [`FixtureSet::create`], letting `prepare` adjust the converted
    /// fields before the record is written. File and folder fixtures use
    /// this to materialise their assets.
    ///
    /// # Errors
    ///
    /// Returns failures from `prepare` plus those of [`FixtureSet::create`].
    pub fn create_with<F>(
        &mut self,
        label: &str,
        identifier: &str,
        fields: FieldMap,
        prepare: F,
    ) -> Result<RecordId, FixtureError>
    where
        F: FnOnce(&TypeDescriptor, &mut FieldMap) -> Result<(), FixtureError>,
    {
        let descriptor = self.catalog.resolve(label)?;
        let mut converted = TypeCatalog::convert_fields(&descriptor, fields);
        prepare(&descriptor, &mut converted)?;
        self.resolver.define(
            &mut self.registry,
            &self.catalog,
            &descriptor,
            identifier,
            converted,
        )
    }

    /// Merge fields into an existing record, or define it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::UnknownType`] for unknown labels plus any
    /// definition or update failure.
    pub fn create_or_update(
        &mut self,
        label: &str,
        identifier: &str,
        fields: FieldMap,
    ) -> Result<RecordId, FixtureError> {
        let descriptor = self.catalog.resolve(label)?;
        let converted = TypeCatalog::convert_fields(&descriptor, fields);
        if self.registry.get(&descriptor.name, identifier).is_some() {
            return self.resolver.update(
                &mut self.registry,
                &self.catalog,
                &descriptor,
                identifier,
                converted,
            );
        }
        self.resolver.define(
            &mut self.registry,
            &self.catalog,
            &descriptor,
            identifier,
            converted,
        )
    }

    /// Define every record of a YAML batch of `label` records.
    ///
    /// # Errors
    ///
    /// Returns YAML errors plus any definition failure.
    pub fn load_yaml(&mut self, label: &str, yaml: &str) -> Result<Vec<RecordId>, FixtureError> {
        let descriptor = self.catalog.resolve(label)?;
        let batch = parse_batch(label, yaml)?;
        self.resolver
            .apply_batch(&mut self.registry, &self.catalog, &descriptor, batch)
    }

    /// Define every record of a fixture file keyed by type.
    ///
    /// Returns the number of records defined.
    ///
    /// # Errors
    ///
    /// Returns YAML errors, unknown types, and definition failures.
    pub fn load_fixture_file(&mut self, name: &str, yaml: &str) -> Result<usize, FixtureError> {
        let document = parse_fixture_file(name, yaml)?;
        let mut defined = 0;
        for (type_label, batch) in document {
            let descriptor = self.catalog.resolve(&type_label)?;
            defined += self
                .resolver
                .apply_batch(&mut self.registry, &self.catalog, &descriptor, batch)?
                .len();
        }
        info!(target: "testsession::fixture", %name, defined, "loaded fixture file");
        Ok(defined)
    }

    /// Relate two records, creating either when missing.
    ///
    /// `child` makes the first record a child of the second; `parent` makes
    /// it the parent. Both set the child's `ParentID`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::InvalidRelation`] for other relations, plus
    /// label, definition, and update failures.
    pub fn relate(
        &mut self,
        label: &str,
        identifier: &str,
        relation: &str,
        other_label: &str,
        other_identifier: &str,
    ) -> Result<(), FixtureError> {
        let is_child = match relation.trim().to_ascii_lowercase().as_str() {
            "child" => true,
            "parent" => false,
            _ => {
                return Err(FixtureError::InvalidRelation {
                    relation: relation.to_owned(),
                });
            }
        };
        let descriptor = self.catalog.resolve(label)?;
        let other = self.catalog.resolve(other_label)?;
        let id = self.ensure(&descriptor, identifier)?;
        let other_id = self.ensure(&other, other_identifier)?;
        let (child, child_identifier, child_id, parent_id) = if is_child {
            (&descriptor, identifier, id, other_id)
        } else {
            (&other, other_identifier, other_id, id)
        };
        let patch = FieldMap::from_iter([(PARENT_ID_FIELD.to_owned(), parent_id.into())]);
        self.registry
            .update(&child.name, child_identifier, child_id, &patch)
    }

    fn ensure(
        &mut self,
        descriptor: &TypeDescriptor,
        identifier: &str,
    ) -> Result<RecordId, FixtureError> {
        if let Some(id) = self.registry.get(&descriptor.name, identifier) {
            return Ok(id);
        }
        self.resolver.define(
            &mut self.registry,
            &self.catalog,
            descriptor,
            identifier,
            FieldMap::new(),
        )
    }

    /// Step-argument transform for `=>Type.identifier` values.
    ///
    /// Other values pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Unknown`] when the referenced record does not
    /// exist, plus reference syntax and lookup failures.
    pub fn resolve_argument(&self, value: &str) -> Result<String, FixtureError> {
        let Some(reference) = Reference::parse(value)? else {
            return Ok(value.to_owned());
        };
        let token = Value::String(value.trim().to_owned());
        match ReferenceResolver::resolve_value(&self.registry, &self.catalog, &token)? {
            Some(Value::String(text)) => Ok(text),
            Some(other) => Ok(other.to_string()),
            None => {
                let type_name = self.catalog.resolve(reference.type_name())?.name;
                let identifier = reference
                    .candidates()
                    .first()
                    .map_or_else(String::new, |(identifier, _)| (*identifier).to_owned());
                Err(FixtureError::Unknown {
                    type_name,
                    identifier,
                })
            }
        }
    }

    /// End of scenario: resolve what can be resolved and forget every
    /// fixture.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Unresolved`] when references were never
    /// satisfied. The set is cleared either way.
    pub fn finish(&mut self) -> Result<(), FixtureError> {
        let outcome = self.resolver.finish(&mut self.registry, &self.catalog);
        self.resolver.clear();
        self.registry.clear();
        outcome
    }

    /// Give back the underlying store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.registry.into_store()
    }
}
