//! Two-phase resolution of `=>Type.identifier` references.
//!
//! A field whose reference target does not exist yet is left out when the
//! record is created and queued as a [`DeferredReference`]. Every later
//! definition flushes the queue, patching records in place once their
//! targets exist. A token whose remainder contains dots waits for the full
//! remainder to be defined as an identifier; splitting it into identifier
//! and field path is only tried when the scenario finishes. Whatever is
//! still queued then is reported as [`FixtureError::Unresolved`].

use std::mem;

use serde_json::Value;
use tracing::debug;

use super::{
    FieldMap, FixtureBatch, FixtureError, FixtureKey, FixtureRegistry, RecordId, RecordStore,
    Reference, TypeCatalog, TypeDescriptor,
};

/// A field waiting for its reference target to be defined.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredReference {
    /// Record owning the field.
    pub owner: FixtureKey,
    /// Id of the owning record.
    pub owner_id: RecordId,
    /// Field to patch.
    pub field: String,
    /// Field value as written, containing at least one reference.
    pub value: Value,
}

impl DeferredReference {
    fn describe(&self) -> String {
        let target = match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        format!("{}.{} -> {target}", self.owner, self.field)
    }
}

enum Resolution {
    Ready(Value),
    Waiting(String),
}

/// How far a lookup may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Only exact identifiers; more records may still be defined.
    Eager,
    /// Identifier and field-path splits against what exists now.
    Final,
}

/// Queue of deferred references for one scenario.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    pending: Vec<DeferredReference>,
}

impl ReferenceResolver {
    /// Empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// References still waiting for their targets.
    #[must_use]
    pub fn pending(&self) -> &[DeferredReference] {
        &self.pending
    }

    /// Drop every queued reference.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Resolve every reference in `value` against the records defined now.
    ///
    /// Strings holding a reference become the target's id, or the value of
    /// the referenced field when the token names one. Arrays are resolved
    /// element by element. Returns `Ok(None)` when any target is not defined
    /// yet.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::MalformedReference`],
    /// [`FixtureError::AmbiguousReference`], or [`FixtureError::UnknownType`]
    /// for references that can never resolve.
    pub fn resolve_value<S: RecordStore>(
        registry: &FixtureRegistry<S>,
        catalog: &TypeCatalog,
        value: &Value,
    ) -> Result<Option<Value>, FixtureError> {
        Ok(match Self::resolve(registry, catalog, value, Pass::Final)? {
            Resolution::Ready(resolved) => Some(resolved),
            Resolution::Waiting(_) => None,
        })
    }

    fn resolve<S: RecordStore>(
        registry: &FixtureRegistry<S>,
        catalog: &TypeCatalog,
        value: &Value,
        pass: Pass,
    ) -> Result<Resolution, FixtureError> {
        match value {
            Value::String(text) => {
                let Some(reference) = Reference::parse(text)? else {
                    return Ok(Resolution::Ready(value.clone()));
                };
                Ok(Self::lookup(registry, catalog, &reference, pass)?
                    .map_or_else(|| Resolution::Waiting(text.clone()), Resolution::Ready))
            }
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    match Self::resolve(registry, catalog, item, pass)? {
                        Resolution::Ready(ready) => resolved.push(ready),
                        waiting @ Resolution::Waiting(_) => return Ok(waiting),
                    }
                }
                Ok(Resolution::Ready(Value::Array(resolved)))
            }
            other => Ok(Resolution::Ready(other.clone())),
        }
    }

    fn lookup<S: RecordStore>(
        registry: &FixtureRegistry<S>,
        catalog: &TypeCatalog,
        reference: &Reference,
        pass: Pass,
    ) -> Result<Option<Value>, FixtureError> {
        let type_name = catalog.resolve(reference.type_name())?.name;
        let candidates = reference.candidates();
        let Some(((identifier, _), splits)) = candidates.split_first() else {
            return Ok(None);
        };
        if let Some(id) = registry.get(&type_name, identifier) {
            return Ok(Some(id.into()));
        }
        if pass == Pass::Eager {
            return Ok(None);
        }
        let matches: Vec<_> = splits
            .iter()
            .filter_map(|&(head, field_path)| {
                let path = field_path?;
                let value = if path == "ID" {
                    registry.get(&type_name, head).map(Value::from)
                } else {
                    registry
                        .record(&type_name, head)
                        .and_then(|record| field_at_path(&record.fields, path))
                };
                value.map(|found| (head, found))
            })
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [(_, value)] => Ok(Some(value.clone())),
            several => Err(FixtureError::AmbiguousReference {
                reference: reference.to_string(),
                candidates: several
                    .iter()
                    .map(|(head, _)| format!("{type_name}.{head}"))
                    .collect(),
            }),
        }
    }

    /// Create one record, deferring fields whose targets are missing.
    ///
    /// Queued references from earlier definitions are flushed afterwards,
    /// so a record defined later in a batch satisfies earlier references to
    /// it. Once the record is written the call succeeds; a queued reference
    /// that fails to patch stays queued and surfaces from
    /// [`ReferenceResolver::finish`].
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::RequiredReference`] when a required field
    /// cannot be resolved yet, plus any registry or lookup failure raised
    /// before the record is written.
    pub fn define<S: RecordStore>(
        &mut self,
        registry: &mut FixtureRegistry<S>,
        catalog: &TypeCatalog,
        descriptor: &TypeDescriptor,
        identifier: &str,
        fields: FieldMap,
    ) -> Result<RecordId, FixtureError> {
        let owner = FixtureKey::new(&descriptor.name, identifier);
        let (ready, deferred) = Self::partition(registry, catalog, descriptor, &owner, fields)?;
        let id = registry.define(&descriptor.name, identifier, &ready)?;
        self.queue(&owner, id, deferred);
        self.flush(registry, catalog);
        Ok(id)
    }

    /// Merge fields into an existing record, deferring unresolved ones.
    ///
    /// # Errors
    ///
    /// Propagates registry and lookup failures raised before the update is
    /// written.
    pub fn update<S: RecordStore>(
        &mut self,
        registry: &mut FixtureRegistry<S>,
        catalog: &TypeCatalog,
        descriptor: &TypeDescriptor,
        identifier: &str,
        fields: FieldMap,
    ) -> Result<RecordId, FixtureError> {
        let id = registry.id_for(&descriptor.name, identifier)?;
        let owner = FixtureKey::new(&descriptor.name, identifier);
        let updatable = TypeDescriptor {
            required_fields: Vec::new(),
            ..descriptor.clone()
        };
        let (ready, deferred) = Self::partition(registry, catalog, &updatable, &owner, fields)?;
        if !ready.is_empty() {
            registry.update(&descriptor.name, identifier, id, &ready)?;
        }
        self.queue(&owner, id, deferred);
        self.flush(registry, catalog);
        Ok(id)
    }

    fn partition<S: RecordStore>(
        registry: &FixtureRegistry<S>,
        catalog: &TypeCatalog,
        descriptor: &TypeDescriptor,
        owner: &FixtureKey,
        fields: FieldMap,
    ) -> Result<(FieldMap, Vec<(String, Value)>), FixtureError> {
        let mut ready = FieldMap::new();
        let mut deferred = Vec::new();
        for (field, value) in fields {
            let required = descriptor.is_required(&field);
            let mut outcome = Self::resolve(registry, catalog, &value, Pass::Eager)?;
            if required && matches!(outcome, Resolution::Waiting(_)) {
                outcome = Self::resolve(registry, catalog, &value, Pass::Final)?;
            }
            match outcome {
                Resolution::Ready(resolved) => {
                    ready.insert(field, resolved);
                }
                Resolution::Waiting(reference) if required => {
                    return Err(FixtureError::RequiredReference {
                        owner: owner.to_string(),
                        field,
                        reference,
                    });
                }
                Resolution::Waiting(reference) => {
                    debug!(
                        target: "testsession::fixture",
                        %owner,
                        %field,
                        %reference,
                        "deferring reference"
                    );
                    deferred.push((field, value));
                }
            }
        }
        Ok((ready, deferred))
    }

    fn queue(&mut self, owner: &FixtureKey, owner_id: RecordId, deferred: Vec<(String, Value)>) {
        self.pending
            .extend(deferred.into_iter().map(|(field, value)| DeferredReference {
                owner: owner.clone(),
                owner_id,
                field,
                value,
            }));
    }

    /// Create every record of a batch, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first record that cannot be written.
    pub fn apply_batch<S: RecordStore>(
        &mut self,
        registry: &mut FixtureRegistry<S>,
        catalog: &TypeCatalog,
        descriptor: &TypeDescriptor,
        batch: FixtureBatch,
    ) -> Result<Vec<RecordId>, FixtureError> {
        batch
            .into_iter()
            .map(|(identifier, fields)| {
                self.define(registry, catalog, descriptor, &identifier, fields)
            })
            .collect()
    }

    /// Patch every queued reference whose exact target now exists.
    ///
    /// Returns how many references were resolved. Entries that fail to
    /// patch stay queued.
    pub fn flush<S: RecordStore>(
        &mut self,
        registry: &mut FixtureRegistry<S>,
        catalog: &TypeCatalog,
    ) -> usize {
        let (resolved, failures) = self.settle(registry, catalog, Pass::Eager);
        for err in failures {
            debug!(target: "testsession::fixture", error = %err, "deferred reference not patched");
        }
        resolved
    }

    fn settle<S: RecordStore>(
        &mut self,
        registry: &mut FixtureRegistry<S>,
        catalog: &TypeCatalog,
        pass: Pass,
    ) -> (usize, Vec<FixtureError>) {
        let mut resolved = 0;
        let mut failures = Vec::new();
        let mut waiting = Vec::new();
        for entry in mem::take(&mut self.pending) {
            match Self::patch(registry, catalog, &entry, pass) {
                Ok(true) => resolved += 1,
                Ok(false) => waiting.push(entry),
                Err(err) => {
                    failures.push(err);
                    waiting.push(entry);
                }
            }
        }
        self.pending = waiting;
        (resolved, failures)
    }

    fn patch<S: RecordStore>(
        registry: &mut FixtureRegistry<S>,
        catalog: &TypeCatalog,
        entry: &DeferredReference,
        pass: Pass,
    ) -> Result<bool, FixtureError> {
        let Resolution::Ready(value) = Self::resolve(registry, catalog, &entry.value, pass)? else {
            return Ok(false);
        };
        debug!(
            target: "testsession::fixture",
            owner = %entry.owner,
            field = %entry.field,
            "resolved deferred reference"
        );
        let patch = FieldMap::from_iter([(entry.field.clone(), value)]);
        registry.update(
            &entry.owner.type_name,
            &entry.owner.identifier,
            entry.owner_id,
            &patch,
        )?;
        Ok(true)
    }

    /// Resolve everything still queued and fail if anything is left.
    ///
    /// Exact identifiers are flushed first, then identifier and field-path
    /// splits are retried until no further reference resolves, so a field
    /// path may point at a field that was itself deferred. The queue is
    /// empty afterwards either way.
    ///
    /// # Errors
    ///
    /// Returns the first lookup or store failure of the last round, or
    /// [`FixtureError::Unresolved`] listing every reference whose target was
    /// never defined.
    pub fn finish<S: RecordStore>(
        &mut self,
        registry: &mut FixtureRegistry<S>,
        catalog: &TypeCatalog,
    ) -> Result<(), FixtureError> {
        self.flush(registry, catalog);
        let failures = loop {
            let (resolved, round_failures) = self.settle(registry, catalog, Pass::Final);
            if resolved == 0 || self.pending.is_empty() {
                break round_failures;
            }
        };
        let pending = mem::take(&mut self.pending);
        if let Some(err) = failures.into_iter().next() {
            return Err(err);
        }
        if pending.is_empty() {
            return Ok(());
        }
        Err(FixtureError::Unresolved {
            references: pending.iter().map(DeferredReference::describe).collect(),
        })
    }
}

fn field_at_path(fields: &FieldMap, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current.clone())
}
