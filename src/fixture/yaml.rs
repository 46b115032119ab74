//! YAML fixture documents.
//!
//! Two shapes are accepted. A batch maps identifiers to field maps and backs
//! the "following records" step:
//!
//! ```yaml
//! home:
//!   Title: Home
//! about:
//!   Title: About
//!   Parent: =>Page.home
//! ```
//!
//! A fixture file nests batches under type names. Parse errors carry a
//! [`miette`] span pointing at the offending location, plus a hint for
//! common mistakes such as tab indentation.

// Version-dependent unused_assignments false positives from the miette and
// thiserror derives; `#[expect]` cannot be used because the lint does not
// always fire.
#![allow(clippy::allow_attributes, clippy::allow_attributes_without_reason)]

use indexmap::IndexMap;
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value;
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

use super::{FieldMap, FixtureError};

/// Records of one type keyed by identifier.
pub type FixtureBatch = IndexMap<String, FieldMap>;

/// Batches keyed by type name or label.
pub type FixtureDocument = IndexMap<String, FixtureBatch>;

const YAML_HINTS: [(&str, &str); 3] = [
    (
        "did not find expected '-'",
        "Start list items with '-' and ensure proper indentation.",
    ),
    (
        "mapping values are not allowed",
        "Quote values containing ':' such as timestamps or URLs.",
    ),
    (
        "found character that cannot start any token",
        "Quote values starting with '@', '`' or '%'.",
    ),
];

#[allow(unused_assignments)]
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(testsession::fixture::yaml))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

/// Byte offset of a 1-based line and column, clamped to the line end.
fn byte_index(src: &str, loc: Location) -> usize {
    let target_line = usize::try_from(loc.line().saturating_sub(1)).unwrap_or(usize::MAX);
    let target_column = usize::try_from(loc.column().saturating_sub(1)).unwrap_or(usize::MAX);
    let mut offset = 0usize;
    for (idx, segment) in src.split_inclusive('\n').enumerate() {
        if idx == target_line {
            let line = segment.trim_end_matches(['\n', '\r']);
            let column_offset = line
                .char_indices()
                .nth(target_column)
                .map_or(line.len(), |(byte_idx, _)| byte_idx);
            return offset + column_offset;
        }
        offset += segment.len();
    }
    src.len()
}

fn to_span(src: &str, loc: Location) -> SourceSpan {
    let at = byte_index(src, loc);
    let len = src
        .get(at..)
        .and_then(|rest| rest.chars().next())
        .filter(|c| *c != '\n' && *c != '\r')
        .map_or(0, char::len_utf8);
    SourceSpan::new(at.into(), len)
}

fn hint_for(message: &str, src: &str, loc: Option<Location>) -> Option<String> {
    let tab_indented = loc.is_some_and(|l| {
        let line_idx = usize::try_from(l.line().saturating_sub(1)).unwrap_or(usize::MAX);
        src.lines()
            .nth(line_idx)
            .is_some_and(|line| line.chars().take_while(|c| c.is_whitespace()).any(|c| c == '\t'))
    });
    if tab_indented {
        return Some("Use spaces for indentation; tabs are invalid in YAML.".to_owned());
    }
    let lower = message.to_lowercase();
    YAML_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, hint)| (*hint).to_owned())
}

fn map_yaml_error(err: YamlError, src: &str, name: &str) -> FixtureError {
    let loc = err.location();
    let (line, column, span) =
        loc.map_or((1, 1, None), |l| (l.line(), l.column(), Some(to_span(src, l))));
    let detail = err.to_string();
    let help = hint_for(&detail, src, loc);
    FixtureError::InvalidYaml {
        name: name.to_owned(),
        source: Box::new(YamlDiagnostic {
            src: NamedSource::new(name, src.to_owned()),
            span,
            help,
            source: err,
            message: format!("YAML parse error at line {line}, column {column}: {detail}"),
        }),
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> FixtureError {
    FixtureError::InvalidDocument {
        name: name.to_owned(),
        reason: reason.into(),
    }
}

fn parse_value(name: &str, src: &str) -> Result<Value, FixtureError> {
    serde_saphyr::from_str::<Value>(src).map_err(|err| map_yaml_error(err, src, name))
}

fn batch_from_value(name: &str, context: &str, value: Value) -> Result<FixtureBatch, FixtureError> {
    let records = match value {
        Value::Null => return Ok(FixtureBatch::new()),
        Value::Object(records) => records,
        _ => return Err(invalid(name, format!("{context} must map identifiers to fields"))),
    };
    records
        .into_iter()
        .map(|(identifier, fields)| match fields {
            Value::Null => Ok((identifier, FieldMap::new())),
            Value::Object(map) => Ok((identifier, map.into_iter().collect())),
            _ => Err(invalid(
                name,
                format!("fields of {context} record '{identifier}' must be a mapping"),
            )),
        })
        .collect()
}

/// Parse an identifier-to-fields batch.
///
/// Records without fields may be written as `identifier:` with no value.
///
/// # Errors
///
/// Returns [`FixtureError::InvalidYaml`] for syntax errors and
/// [`FixtureError::InvalidDocument`] when the document is not a mapping of
/// mappings.
pub fn parse_batch(name: &str, src: &str) -> Result<FixtureBatch, FixtureError> {
    let value = parse_value(name, src)?;
    batch_from_value(name, "batch", value)
}

/// Parse a fixture file keyed by type.
///
/// # Errors
///
/// Returns [`FixtureError::InvalidYaml`] for syntax errors and
/// [`FixtureError::InvalidDocument`] when the document does not nest field
/// mappings under identifiers under types.
pub fn parse_fixture_file(name: &str, src: &str) -> Result<FixtureDocument, FixtureError> {
    let types = match parse_value(name, src)? {
        Value::Null => return Ok(FixtureDocument::new()),
        Value::Object(types) => types,
        _ => return Err(invalid(name, "top level must map types to records")),
    };
    types
        .into_iter()
        .map(|(type_label, records)| {
            let batch = batch_from_value(name, &type_label, records)?;
            Ok((type_label, batch))
        })
        .collect()
}
