//! Step definitions for named fixtures and lazy references.

use crate::bdd::fixtures::{RefCellOptionExt, TestWorld};
use anyhow::{Context, Result, ensure};
use rstest_bdd_macros::{given, then, when};
use serde_json::Value;
use testsession::fixture::{FieldMap, FixtureError, FixtureSet, MemoryStore, TypeCatalog};

fn record_outcome<T>(world: &TestWorld, outcome: Option<Result<T, FixtureError>>) -> Result<()> {
    match outcome.context("fixture set has not been created")? {
        Ok(_) => world.fixture_error.clear(),
        Err(err) => world.fixture_error.set(err.to_string()),
    }
    Ok(())
}

#[given("an empty fixture set")]
fn empty_fixture_set(world: &TestWorld) -> Result<()> {
    world
        .fixtures
        .set_value(FixtureSet::new(MemoryStore::default(), TypeCatalog::open()));
    Ok(())
}

#[when("the {label:string} fixture {identifier:string} is created")]
fn create_fixture(world: &TestWorld, label: String, identifier: String) -> Result<()> {
    let outcome = world
        .fixtures
        .with_mut(|set| set.create(&label, &identifier, FieldMap::new()));
    record_outcome(world, outcome)
}

#[when("the {label:string} fixture {identifier:string} is created with {field:string} set to {value:string}")]
fn create_fixture_with_field(
    world: &TestWorld,
    label: String,
    identifier: String,
    field: String,
    value: String,
) -> Result<()> {
    let fields = FieldMap::from_iter([(field, Value::String(value))]);
    let outcome = world
        .fixtures
        .with_mut(|set| set.create(&label, &identifier, fields));
    record_outcome(world, outcome)
}

#[when("the {label:string} fixture {identifier:string} is made a {relation:string} of the {other_label:string} fixture {other:string}")]
fn relate_fixtures(
    world: &TestWorld,
    label: String,
    identifier: String,
    relation: String,
    other_label: String,
    other: String,
) -> Result<()> {
    let outcome = world
        .fixtures
        .with_mut(|set| set.relate(&label, &identifier, &relation, &other_label, &other));
    record_outcome(world, outcome)
}

#[when("the fixture set is finished")]
fn finish_fixture_set(world: &TestWorld) -> Result<()> {
    let outcome = world.fixtures.with_mut(FixtureSet::finish);
    record_outcome(world, outcome)
}

#[then("the pending reference count is {count:usize}")]
fn pending_reference_count(world: &TestWorld, count: usize) -> Result<()> {
    let pending = world
        .fixtures
        .with_ref(|set| set.pending().len())
        .context("fixture set has not been created")?;
    ensure!(pending == count, "expected {count} pending references, got {pending}");
    Ok(())
}

#[then("the {label:string} fixture {identifier:string} field {field:string} holds the id of {target:string}")]
fn field_holds_id(
    world: &TestWorld,
    label: String,
    identifier: String,
    field: String,
    target: String,
) -> Result<()> {
    let (actual, expected) = world
        .fixtures
        .with_ref(|set| -> Result<(Option<Value>, Value)> {
            let type_name = set.catalog().resolve(&label)?.name;
            let target_id = set.registry().id_for(&type_name, &target)?;
            let actual = set
                .registry()
                .record(&type_name, &identifier)
                .and_then(|record| record.fields.get(&field).cloned());
            Ok((actual, Value::from(target_id)))
        })
        .context("fixture set has not been created")??;
    ensure!(
        actual.as_ref() == Some(&expected),
        "expected {identifier}.{field} to be {expected}, got {actual:?}"
    );
    Ok(())
}

#[then("the fixture error mentions {fragment:string}")]
fn fixture_error_mentions(world: &TestWorld, fragment: String) -> Result<()> {
    let error = world
        .fixture_error
        .get()
        .context("expected a fixture error")?;
    ensure!(
        error.contains(&fragment),
        "expected fixture error to contain '{fragment}', got '{error}'"
    );
    Ok(())
}

#[then("there is no fixture error")]
fn no_fixture_error(world: &TestWorld) -> Result<()> {
    let error = world.fixture_error.get();
    ensure!(error.is_none(), "unexpected fixture error {error:?}");
    Ok(())
}
