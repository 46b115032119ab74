//! Email lookup predicates.
//!
//! A predicate value starting with `/` is a regular expression written as
//! `/expression/flags`; anything else must match the field exactly. Values
//! that legitimately begin with a slash are therefore always treated as
//! patterns.

use regex::{Regex, RegexBuilder};

use super::{EmailError, EmailRecord};

/// How a single email field is compared.
#[derive(Debug, Clone)]
pub enum FieldMatcher {
    /// The field must equal the value.
    Exact(String),
    /// The field must contain a match for the expression.
    Pattern(Regex),
}

impl FieldMatcher {
    /// Interpret a predicate value, sniffing the leading `/`.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidPattern`] for a missing closing
    /// delimiter, an unknown flag, or an invalid expression.
    pub fn parse(value: &str) -> Result<Self, EmailError> {
        let Some(body) = value.strip_prefix('/') else {
            return Ok(Self::Exact(value.to_owned()));
        };
        let invalid = |reason: &str| EmailError::InvalidPattern {
            pattern: value.to_owned(),
            reason: reason.to_owned(),
        };
        let (expression, flags) = body
            .rsplit_once('/')
            .ok_or_else(|| invalid("missing closing '/' delimiter"))?;
        let mut builder = RegexBuilder::new(expression);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => return Err(invalid(&format!("unsupported flag '{other}'"))),
            };
        }
        builder
            .build()
            .map(Self::Pattern)
            .map_err(|err| invalid(&err.to_string()))
    }

    /// Test a field value.
    #[must_use]
    pub fn matches(&self, field: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == field,
            Self::Pattern(regex) => regex.is_match(field),
        }
    }
}

/// Predicates over the `to`, `from`, `subject`, and `content` fields.
///
/// Unset or empty predicates match every email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailQuery {
    /// Recipient predicate.
    pub to: Option<String>,
    /// Sender predicate.
    pub from: Option<String>,
    /// Subject predicate.
    pub subject: Option<String>,
    /// Body predicate.
    pub content: Option<String>,
}

impl EmailQuery {
    /// Query matching every email.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the recipient to match.
    #[must_use]
    pub fn sent_to(mut self, value: impl Into<String>) -> Self {
        self.to = Some(value.into());
        self
    }

    /// Require the sender to match.
    #[must_use]
    pub fn sent_from(mut self, value: impl Into<String>) -> Self {
        self.from = Some(value.into());
        self
    }

    /// Require the subject to match.
    #[must_use]
    pub fn with_subject(mut self, value: impl Into<String>) -> Self {
        self.subject = Some(value.into());
        self
    }

    /// Require the body to match.
    #[must_use]
    pub fn with_content(mut self, value: impl Into<String>) -> Self {
        self.content = Some(value.into());
        self
    }

    fn compile(&self) -> Result<CompiledQuery, EmailError> {
        let field = |value: Option<&String>| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| FieldMatcher::parse(v))
                .transpose()
        };
        Ok(CompiledQuery {
            to: field(self.to.as_ref())?,
            from: field(self.from.as_ref())?,
            subject: field(self.subject.as_ref())?,
            content: field(self.content.as_ref())?,
        })
    }
}

struct CompiledQuery {
    to: Option<FieldMatcher>,
    from: Option<FieldMatcher>,
    subject: Option<FieldMatcher>,
    content: Option<FieldMatcher>,
}

impl CompiledQuery {
    fn matches(&self, email: &EmailRecord) -> bool {
        [
            (&self.to, email.to.as_str()),
            (&self.from, email.from.as_str()),
            (&self.subject, email.subject.as_str()),
            (&self.content, email.content.as_str()),
        ]
        .into_iter()
        .all(|(matcher, field)| matcher.as_ref().is_none_or(|m| m.matches(field)))
    }
}

/// Return the most recently recorded email satisfying `query`.
///
/// # Errors
///
/// Returns [`EmailError::InvalidPattern`] when a predicate is malformed.
///
/// # Examples
///
/// ```
/// use testsession::email::{EmailKind, EmailQuery, EmailRecord, find_email};
///
/// let email = EmailRecord {
///     kind: EmailKind::Plain,
///     to: "a@b.com".into(),
///     from: "site@example.com".into(),
///     subject: "Welcome".into(),
///     content: "Hello".into(),
///     plain_content: None,
///     attached_files: Vec::new(),
///     custom_headers: Default::default(),
/// };
/// let emails = [email];
/// let found = find_email(&emails, &EmailQuery::new().with_subject("/welc/i"))?;
/// assert!(found.is_some());
/// # Ok::<(), testsession::email::EmailError>(())
/// ```
pub fn find_email<'a>(
    emails: &'a [EmailRecord],
    query: &EmailQuery,
) -> Result<Option<&'a EmailRecord>, EmailError> {
    let compiled = query.compile()?;
    Ok(emails.iter().rev().find(|email| compiled.matches(email)))
}
