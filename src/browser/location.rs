//! URL joining and loose comparison.

use indexmap::IndexMap;
use url::{ParseError, Url};

use super::{BrowserDriver, BrowserError};

const RELATIVE_BASE: &str = "http://localhost/";

/// Join URL parts with single forward slashes.
///
/// Leading and trailing slashes are trimmed from every part before joining.
///
/// ```
/// use testsession::browser::join_url_parts;
///
/// let url = join_url_parts(&["http://example.com/", "/admin/", "pages"])?;
/// assert_eq!(url, "http://example.com/admin/pages");
/// # Ok::<(), testsession::browser::BrowserError>(())
/// ```
///
/// # Errors
///
/// Returns [`BrowserError::InvalidUrl`] when `parts` is empty.
pub fn join_url_parts<S: AsRef<str>>(parts: &[S]) -> Result<String, BrowserError> {
    if parts.is_empty() {
        return Err(BrowserError::InvalidUrl {
            url: String::new(),
            reason: "need at least one URL part".to_owned(),
        });
    }
    Ok(parts
        .iter()
        .map(|part| part.as_ref().trim_matches('/'))
        .collect::<Vec<_>>()
        .join("/"))
}

/// Whether `current` is close enough to `expected`.
///
/// Paths must be equal. The fragment is compared only when `expected` has
/// one, and every query variable in `expected` must appear in `current` with
/// the same value; extra variables in `current` are ignored. Relative URLs
/// are accepted on either side.
///
/// # Errors
///
/// Returns [`BrowserError::InvalidUrl`] when either URL cannot be parsed.
pub fn is_current_url_similar_to(current: &str, expected: &str) -> Result<bool, BrowserError> {
    let current_url = parse_loose(current)?;
    let expected_url = parse_loose(expected)?;

    if current_url.path() != expected_url.path() {
        return Ok(false);
    }
    if expected_url.fragment().is_some() && current_url.fragment() != expected_url.fragment() {
        return Ok(false);
    }
    let current_vars: IndexMap<_, _> = current_url.query_pairs().collect();
    Ok(expected_url
        .query_pairs()
        .all(|(name, value)| current_vars.get(&name) == Some(&value)))
}

/// [`is_current_url_similar_to`] against the driver's current URL.
///
/// # Errors
///
/// Returns [`BrowserError::Driver`] when the URL cannot be read and
/// [`BrowserError::InvalidUrl`] when either URL cannot be parsed.
pub fn current_url_is_similar_to<D: BrowserDriver + ?Sized>(
    driver: &D,
    expected: &str,
) -> Result<bool, BrowserError> {
    let current = driver
        .current_url()
        .map_err(BrowserError::driver("read the current URL"))?;
    is_current_url_similar_to(&current, expected)
}

fn parse_loose(raw: &str) -> Result<Url, BrowserError> {
    let invalid = |err: ParseError| BrowserError::InvalidUrl {
        url: raw.to_owned(),
        reason: err.to_string(),
    };
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_BASE)
            .and_then(|base| base.join(raw))
            .map_err(invalid),
        Err(err) => Err(invalid(err)),
    }
}
