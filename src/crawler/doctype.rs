//! Document type detection from the leading bytes of a page

use crate::crawler::fetcher::DOCTYPE_PREFIX_LEN;

/// Label used when no known declaration matches
pub const UNKNOWN_DOCUMENT_TYPE: &str = "Unknown";

/// Known declarations, lower-cased with whitespace collapsed, and their labels
const DOCTYPES: &[(&str, &str)] = &[
    ("<!doctype html>", "HTML5"),
    (
        "<!doctype html public \"-//w3c//dtd html 4.01 transitional//en\"",
        "HTML 4.01 Transitional",
    ),
    (
        "<!doctype html public \"-//w3c//dtd html 4.01 frameset//en\"",
        "HTML 4.01 Frameset",
    ),
    (
        "<!doctype html public \"-//w3c//dtd html 4.01 strict//en\"",
        "HTML 4.01 Strict",
    ),
    // The published Strict identifier carries no variant name
    (
        "<!doctype html public \"-//w3c//dtd html 4.01//en\"",
        "HTML 4.01 Strict",
    ),
    (
        "<!doctype html public \"-//w3c//dtd xhtml 1.0 transitional//en\"",
        "XHTML 1.0 Transitional",
    ),
    (
        "<!doctype html public \"-//w3c//dtd xhtml 1.0 strict//en\"",
        "XHTML 1.0 Strict",
    ),
    (
        "<!doctype html public \"-//w3c//dtd xhtml 1.0 frameset//en\"",
        "XHTML 1.0 Frameset",
    ),
];

/// Classifies a document by the declaration at the start of its body
///
/// Only the first `DOCTYPE_PREFIX_LEN` bytes are considered. Matching is
/// case-insensitive and prefix-based; a leading byte-order mark and
/// whitespace are skipped, and runs of whitespace compare equal to one space.
///
/// # Example
///
/// ```
/// use url_analyzer::crawler::detect_document_type;
///
/// assert_eq!(detect_document_type(b"<!DOCTYPE html><html></html>"), "HTML5");
/// assert_eq!(detect_document_type(b"<html></html>"), "Unknown");
/// ```
pub fn detect_document_type(prefix: &[u8]) -> &'static str {
    let window = &prefix[..prefix.len().min(DOCTYPE_PREFIX_LEN)];
    let lowered = String::from_utf8_lossy(window).to_lowercase();
    let normalized = collapse_whitespace(lowered.trim_start_matches('\u{feff}').trim_start());

    DOCTYPES
        .iter()
        .find(|(declaration, _)| normalized.starts_with(declaration))
        .map(|(_, label)| *label)
        .unwrap_or(UNKNOWN_DOCUMENT_TYPE)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
