//! HTML parser for extracting page metrics
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - Heading counts per level
//! - Whether the page carries a login form
//! - Absolute hyperlinks to classify and validate

use scraper::{Html, Selector};

/// Number of elements found for each heading level `h1` through `h6`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadingCounts {
    levels: [u32; 6],
}

impl HeadingCounts {
    pub fn from_levels(levels: [u32; 6]) -> Self {
        Self { levels }
    }

    /// Counts for `h1` through `h6`, in order
    pub fn levels(&self) -> [u32; 6] {
        self.levels
    }

    /// Count for one level (1-based); out-of-range levels count zero
    pub fn level(&self, level: usize) -> u32 {
        level
            .checked_sub(1)
            .and_then(|i| self.levels.get(i))
            .copied()
            .unwrap_or(0)
    }

    pub fn increment(&mut self, level: usize) {
        if let Some(count) = level.checked_sub(1).and_then(|i| self.levels.get_mut(i)) {
            *count += 1;
        }
    }

    pub fn h1(&self) -> u32 {
        self.levels[0]
    }

    pub fn h2(&self) -> u32 {
        self.levels[1]
    }

    pub fn total(&self) -> u32 {
        self.levels.iter().sum()
    }
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    /// The page title (from the first <title> tag)
    pub title: Option<String>,

    /// Heading element counts
    pub headings: HeadingCounts,

    /// True if any `<input type="password">` is present
    pub has_login_form: bool,

    /// Targets of `<a href>` elements that start with `http`, in document order
    pub absolute_links: Vec<String>,
}

/// Parses HTML content and extracts page metrics
///
/// HTML parsing is lenient: malformed markup still yields a document tree,
/// so this never fails.
///
/// # Link Extraction Rules
///
/// Only `<a href>` targets beginning with `http` are collected. Relative
/// links, fragments and other schemes (`mailto:`, `javascript:`) are
/// ignored and counted in neither link bucket.
///
/// # Example
///
/// ```
/// use url_analyzer::crawler::parse_page;
///
/// let html = r#"<html><head><title>Test</title></head><body><h1>Hi</h1><a href="https://a.example/">A</a></body></html>"#;
/// let metrics = parse_page(html);
/// assert_eq!(metrics.title, Some("Test".to_string()));
/// assert_eq!(metrics.headings.h1(), 1);
/// assert_eq!(metrics.absolute_links.len(), 1);
/// ```
pub fn parse_page(html: &str) -> PageMetrics {
    let document = Html::parse_document(html);

    PageMetrics {
        title: extract_title(&document),
        headings: count_headings(&document),
        has_login_form: has_password_input(&document),
        absolute_links: extract_absolute_links(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn count_headings(document: &Html) -> HeadingCounts {
    let mut counts = HeadingCounts::default();

    if let Ok(selector) = Selector::parse("h1, h2, h3, h4, h5, h6") {
        for element in document.select(&selector) {
            let level = element
                .value()
                .name()
                .strip_prefix('h')
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(level) = level {
                counts.increment(level);
            }
        }
    }

    counts
}

fn has_password_input(document: &Html) -> bool {
    let Ok(selector) = Selector::parse("input[type]") else {
        return false;
    };

    document.select(&selector).any(|element| {
        element
            .value()
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("password"))
    })
}

fn extract_absolute_links(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| href.starts_with("http"))
        .map(str::to_string)
        .collect()
}
