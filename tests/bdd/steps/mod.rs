//! Step definitions for BDD scenarios.
//!
//! Steps are organised by domain (fixtures, sessions, emails, browser).
//! Failures of the code under test are stored in the world so later steps
//! can assert on them; step errors are reserved for broken scenarios.

#![expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step signatures take owned parameters"
)]

mod browser;
mod email;
mod fixtures;
mod session;
