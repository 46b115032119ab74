//! Parsing of `=>Type.identifier[.field]` tokens.

use std::fmt;

use super::FixtureError;

/// Marker introducing a fixture reference.
pub const REFERENCE_PREFIX: &str = "=>";

/// A parsed `=>Type.remainder` token.
///
/// Identifiers may themselves contain dots, so the split between identifier
/// and field path is decided at resolution time. See
/// [`Reference::candidates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    type_name: String,
    remainder: String,
}

impl Reference {
    /// Parse `value` when it starts with [`REFERENCE_PREFIX`].
    ///
    /// Returns `Ok(None)` for ordinary values.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::MalformedReference`] when the type or
    /// identifier is missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use testsession::fixture::Reference;
    ///
    /// let reference = Reference::parse("=>Page.home.Title")?.expect("reference");
    /// assert_eq!(reference.type_name(), "Page");
    /// assert_eq!(
    ///     reference.candidates(),
    ///     [("home.Title", None), ("home", Some("Title"))]
    /// );
    /// assert!(Reference::parse("plain text")?.is_none());
    /// # Ok::<(), testsession::fixture::FixtureError>(())
    /// ```
    pub fn parse(value: &str) -> Result<Option<Self>, FixtureError> {
        let Some(body) = value.trim().strip_prefix(REFERENCE_PREFIX) else {
            return Ok(None);
        };
        let malformed = |reason: &str| FixtureError::MalformedReference {
            reference: value.to_owned(),
            reason: reason.to_owned(),
        };
        let (raw_type, remainder) = body
            .split_once('.')
            .ok_or_else(|| malformed("expected '.' between type and identifier"))?;
        let type_name = raw_type.trim();
        if type_name.is_empty() {
            return Err(malformed("type name is empty"));
        }
        if remainder.is_empty() || remainder.starts_with('.') {
            return Err(malformed("identifier is empty"));
        }
        Ok(Some(Self {
            type_name: type_name.to_owned(),
            remainder: remainder.to_owned(),
        }))
    }

    /// Type part of the token.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Replace the type part, typically with a catalog-resolved name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Possible `(identifier, field path)` splits, longest identifier first.
    #[must_use]
    pub fn candidates(&self) -> Vec<(&str, Option<&str>)> {
        let mut candidates = vec![(self.remainder.as_str(), None)];
        let mut end = self.remainder.len();
        while let Some(dot) = self.remainder.get(..end).and_then(|head| head.rfind('.')) {
            let identifier = self.remainder.get(..dot).unwrap_or_default();
            let path = self.remainder.get(dot + 1..).unwrap_or_default();
            if !identifier.is_empty() && !path.is_empty() {
                candidates.push((identifier, Some(path)));
            }
            end = dot;
        }
        candidates
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REFERENCE_PREFIX}{}.{}", self.type_name, self.remainder)
    }
}
