//! BDD test module providing fixtures, collaborator doubles, and step
//! definitions.
//!
//! Step definitions are registered via `#[given]`, `#[when]`, and `#[then]`
//! attribute macros from rstest-bdd.

pub mod doubles;
pub mod fixtures;
pub mod steps;
