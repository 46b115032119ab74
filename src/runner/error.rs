//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. Since `#[expect]` fails when the lint
// doesn't fire, `#[allow]` is used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// No subcommand was supplied.
    #[error("no command given")]
    #[diagnostic(
        code(testsession::runner::missing_command),
        help("run `testsession --help` to list the commands")
    )]
    MissingCommand,

    /// A path argument is not valid UTF-8.
    #[error("path {} is not valid UTF-8", path.display())]
    #[diagnostic(code(testsession::runner::non_utf8_path))]
    NonUtf8Path {
        /// Offending path.
        path: PathBuf,
    },

    /// No recorded email matched the query.
    #[error("no email matched {query}")]
    #[diagnostic(code(testsession::runner::no_matching_email))]
    NoMatchingEmail {
        /// Rendered predicates.
        query: String,
    },
}
