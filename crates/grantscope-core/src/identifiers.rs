//! Identifier splitting, quoting and canonicalization.
//!
//! Snowflake folds unquoted identifiers to upper case and compares them
//! case-insensitively, while quoted identifiers keep their exact spelling.
//! Every name that crosses the spec/warehouse boundary is brought into one
//! canonical spelling so the two sides can be compared with plain equality:
//! simple segments are lower-cased, anything else is double-quoted verbatim.

use regex::Regex;
use std::sync::OnceLock;

/// Matches segments that never need quoting.
fn simple_segment() -> &'static Regex {
    static SIMPLE: OnceLock<Regex> = OnceLock::new();
    SIMPLE.get_or_init(|| Regex::new(r"^[0-9a-zA-Z_]*$").expect("Invalid regex pattern"))
}

fn is_simple(segment: &str) -> bool {
    simple_segment().is_match(segment)
}

/// Returns true for `"..."`-style segments.
pub fn is_quoted(segment: &str) -> bool {
    segment.len() >= 2 && segment.starts_with('"') && segment.ends_with('"')
}

/// A wildcard segment: `*` alone, or a simple prefix followed by `*`.
pub fn is_wildcard(segment: &str) -> bool {
    segment
        .strip_suffix('*')
        .is_some_and(|prefix| is_simple(prefix))
}

/// Splits a qualified name on dots that are not inside double quotes.
///
/// Empty segments are kept (`"db."` yields `["db", ""]`) so that name-shape
/// validation sees exactly what the user wrote.
pub fn split_name(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in name.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '.' if !in_quotes => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

fn quote(segment: &str) -> String {
    format!("\"{}\"", segment.replace('"', "\"\""))
}

/// Quotes every segment of a qualified name that contains characters outside
/// `[0-9a-zA-Z_]` and is not already quoted. Wildcard segments are untouched.
pub fn quote_identifier(name: &str) -> String {
    split_name(name)
        .iter()
        .map(|segment| {
            if is_simple(segment) || is_quoted(segment) || is_wildcard(segment) {
                segment.clone()
            } else {
                quote(segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Quotes a user or role name as a whole.
///
/// Principals are never qualified, so `blake.enyart@gmail.com` becomes
/// `"blake.enyart@gmail.com"` rather than being split at the dot.
pub fn quote_principal(name: &str) -> String {
    if is_simple(name) || is_quoted(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

/// A quoted identifier that Snowflake would also match unquoted: simple
/// characters only and no lower-case letters, e.g. `"EVENTS"`.
fn folds_unquoted(segment: &str) -> Option<&str> {
    let inner = segment.strip_prefix('"')?.strip_suffix('"')?;
    let folds = !inner.is_empty() && is_simple(inner) && !inner.chars().any(|c| c.is_ascii_lowercase());
    folds.then_some(inner)
}

fn canonical_segment(segment: &str) -> String {
    if let Some(inner) = folds_unquoted(segment) {
        inner.to_lowercase()
    } else if is_quoted(segment) {
        segment.to_string()
    } else if is_simple(segment) || is_wildcard(segment) {
        segment.to_lowercase()
    } else {
        quote(segment)
    }
}

/// The comparison form of a qualified object name.
pub fn canonical_name(name: &str) -> String {
    split_name(name.trim())
        .iter()
        .map(|segment| canonical_segment(segment))
        .collect::<Vec<_>>()
        .join(".")
}

/// The comparison form of a user or role name.
pub fn canonical_principal(name: &str) -> String {
    let name = name.trim();
    if let Some(inner) = folds_unquoted(name) {
        inner.to_lowercase()
    } else if is_quoted(name) {
        name.to_string()
    } else if is_simple(name) {
        name.to_lowercase()
    } else {
        quote(name)
    }
}

/// Builds a canonical qualified name from raw, unquoted parts as returned by
/// `SHOW` commands.
pub fn canonical_from_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(|part| {
            if is_simple(part) {
                part.to_lowercase()
            } else {
                quote(part)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// The leading segment of a qualified name.
pub fn database_of(name: &str) -> String {
    split_name(name).into_iter().next().unwrap_or_default()
}

/// The first two segments of a qualified name, joined.
pub fn schema_of(name: &str) -> String {
    split_name(name)
        .into_iter()
        .take(2)
        .collect::<Vec<_>>()
        .join(".")
}
