//! Error types for fixture creation and reference resolution.

use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

use crate::CollaboratorError;

/// Errors raised while defining fixtures or resolving references.
#[derive(Debug, Error, Diagnostic)]
pub enum FixtureError {
    /// The identifier is already registered for the type.
    #[error("fixture {type_name}.{identifier} is already defined")]
    #[diagnostic(
        code(testsession::fixture::duplicate),
        help("identifiers must be unique per type within a scenario")
    )]
    Duplicate {
        /// Concrete type name.
        type_name: String,
        /// Repeated identifier.
        identifier: String,
    },

    /// No record is registered for the identifier.
    #[error("no fixture {type_name}.{identifier} has been defined")]
    #[diagnostic(code(testsession::fixture::unknown))]
    Unknown {
        /// Concrete type name.
        type_name: String,
        /// Missing identifier.
        identifier: String,
    },

    /// Deferred references were still pending when the scenario finished.
    #[error("unresolved fixture references: {}", references.join(", "))]
    #[diagnostic(
        code(testsession::fixture::unresolved),
        help("define the referenced records or remove the references")
    )]
    Unresolved {
        /// Pending references as `Owner.identifier.Field -> =>Target.identifier`.
        references: Vec<String>,
    },

    /// A field required at creation time points at a record that does not
    /// exist yet.
    #[error("field {field} of {owner} is required at creation but {reference} is not defined")]
    #[diagnostic(
        code(testsession::fixture::required_reference),
        help("define the referenced record before the one that requires it")
    )]
    RequiredReference {
        /// Record being created, as `Type.identifier`.
        owner: String,
        /// Required field.
        field: String,
        /// Unresolved reference token.
        reference: String,
    },

    /// More than one registered record matches a reference.
    #[error("reference {reference} is ambiguous between {}", candidates.join(" and "))]
    #[diagnostic(code(testsession::fixture::ambiguous_reference))]
    AmbiguousReference {
        /// Reference token as written.
        reference: String,
        /// Matching `Type.identifier` keys.
        candidates: Vec<String>,
    },

    /// A value starting with `=>` is not a valid reference.
    #[error("malformed fixture reference '{reference}': {reason}")]
    #[diagnostic(
        code(testsession::fixture::malformed_reference),
        help("references look like =>Type.identifier or =>Type.identifier.Field")
    )]
    MalformedReference {
        /// Reference token as written.
        reference: String,
        /// Explanation of the problem.
        reason: String,
    },

    /// A human label does not name a known type.
    #[error("unknown fixture type '{label}'")]
    #[diagnostic(code(testsession::fixture::unknown_type))]
    UnknownType {
        /// Label as written in the step.
        label: String,
    },

    /// Fixture YAML could not be parsed.
    #[error("failed to parse fixture YAML '{name}'")]
    #[diagnostic(code(testsession::fixture::invalid_yaml))]
    InvalidYaml {
        /// Name of the YAML source.
        name: String,
        /// Parser diagnostic with the offending span.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
    },

    /// Fixture YAML parsed but has the wrong shape.
    #[error("fixture document '{name}' is invalid: {reason}")]
    #[diagnostic(code(testsession::fixture::invalid_document))]
    InvalidDocument {
        /// Name of the YAML source.
        name: String,
        /// Explanation of the problem.
        reason: String,
    },

    /// The record store rejected an operation.
    #[error("record store failed for {type_name}.{identifier}")]
    #[diagnostic(code(testsession::fixture::store))]
    Store {
        /// Concrete type name.
        type_name: String,
        /// Identifier of the affected record.
        identifier: String,
        /// Collaborator failure.
        #[source]
        source: CollaboratorError,
    },

    /// The source file for a file fixture does not exist.
    #[error("fixture source file {path} does not exist")]
    #[diagnostic(
        code(testsession::fixture::asset_source_missing),
        help("place the file in the configured fixture files directory")
    )]
    AssetSourceMissing {
        /// Expected source path.
        path: Utf8PathBuf,
    },

    /// Preparing a file or folder fixture failed.
    #[error("failed to {action} fixture asset {path}")]
    #[diagnostic(code(testsession::fixture::asset_io))]
    AssetIo {
        /// Operation that failed.
        action: &'static str,
        /// Affected path.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },

    /// A relation other than `child` or `parent` was requested.
    #[error("unsupported fixture relation '{relation}'")]
    #[diagnostic(
        code(testsession::fixture::invalid_relation),
        help("use 'child' or 'parent'")
    )]
    InvalidRelation {
        /// Relation as written.
        relation: String,
    },
}

impl FixtureError {
    pub(crate) fn unknown(type_name: &str, identifier: &str) -> Self {
        Self::Unknown {
            type_name: type_name.to_owned(),
            identifier: identifier.to_owned(),
        }
    }

    pub(crate) fn asset_io(action: &'static str, path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::AssetIo {
            action,
            path: path.into(),
            source,
        }
    }
}
