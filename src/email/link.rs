//! Anchor lookup inside captured HTML bodies.

use regex::Regex;

use super::EmailError;

fn compile(pattern: &str) -> Result<Regex, EmailError> {
    Regex::new(pattern).map_err(|err| EmailError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: err.to_string(),
    })
}

fn normalise_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Return the `href` of the first anchor whose visible text contains `text`.
///
/// Markup nested inside the anchor is ignored and whitespace is collapsed
/// before comparing. Entity-encoded ampersands in the `href` are decoded.
///
/// # Errors
///
/// Returns [`EmailError::InvalidPattern`] if the internal expressions fail to
/// compile.
///
/// # Examples
///
/// ```
/// use testsession::email::find_link;
///
/// let html = r#"<p>Please <a href="/reset?t=1&amp;u=2">reset   <b>now</b></a></p>"#;
/// assert_eq!(find_link(html, "reset now")?, Some("/reset?t=1&u=2".to_owned()));
/// # Ok::<(), testsession::email::EmailError>(())
/// ```
pub fn find_link(html: &str, text: &str) -> Result<Option<String>, EmailError> {
    let anchor = compile(r"(?is)<a\b([^>]*)>(.*?)</a\s*>")?;
    let href = compile(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)?;
    let tags = compile(r"(?s)<[^>]*>")?;
    let wanted = normalise_whitespace(text);

    for captures in anchor.captures_iter(html) {
        let attributes = captures.get(1).map_or("", |m| m.as_str());
        let inner = captures.get(2).map_or("", |m| m.as_str());
        let visible = normalise_whitespace(&decode_entities(&tags.replace_all(inner, " ")));
        if !visible.contains(&wanted) {
            continue;
        }
        let target = href.captures(attributes).and_then(|c| {
            c.get(1)
                .or_else(|| c.get(2))
                .or_else(|| c.get(3))
                .map(|m| decode_entities(m.as_str()))
        });
        if target.is_some() {
            return Ok(target);
        }
    }
    Ok(None)
}
