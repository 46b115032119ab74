//! Test session core library.
//!
//! Supports browser-driven acceptance tests that run against a live
//! application process. The test driver and the application share a
//! file-backed [`state`] blob for the duration of a scenario, scenario data
//! is built through a [`fixture`] registry that resolves `=>Type.identifier`
//! references lazily, and a [`session`] controller coordinates setup and
//! teardown. The [`email`], [`browser`], and [`report`] modules cover the
//! surrounding step support, while [`cli`] and [`runner`] expose the state
//! file to operators.

pub mod browser;
pub mod cli;
pub mod email;
pub mod fixture;
pub mod report;
pub mod runner;
pub mod session;
pub mod state;

/// Error returned by external collaborators such as the record store, the
/// application under test, or the browser driver.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;
