//! Translation quality validation module.
//!
//! Machine translation services routinely mangle the parts of a gettext
//! string that the program fills in at runtime. This module checks that
//! printf placeholders, HTML tags and URLs survive the round trip. Findings
//! are warnings only: a translation is never rejected on their account.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing warnings about a translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Non-critical warnings about potential issues
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the report has any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean
    pub fn is_clean(&self) -> bool {
        !self.has_warnings()
    }
}

/// Validator for translated catalog strings.
pub struct TranslationValidator;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Compare a translation against its source string.
    ///
    /// Checks that:
    /// - printf placeholders (`%s`, `%d`, `%1$s`, `%.2f`, ...) are preserved as a multiset
    /// - HTML tags are preserved
    /// - URLs are preserved
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let orig_placeholders = Self::extract_placeholders(original);
        let trans_placeholders = Self::extract_placeholders(translated);
        if orig_placeholders != trans_placeholders {
            report.warnings.push(format!(
                "Placeholder mismatch: original has {:?}, translation has {:?}",
                orig_placeholders, trans_placeholders
            ));
        }

        let orig_tags = Self::extract_html_tags(original);
        let trans_tags = Self::extract_html_tags(translated);
        if orig_tags != trans_tags {
            report.warnings.push(format!(
                "HTML tag mismatch: original has {:?}, translation has {:?}",
                orig_tags, trans_tags
            ));
        }

        let orig_urls = Self::extract_urls(original);
        let trans_urls = Self::extract_urls(translated);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        report
    }

    /// Extract printf placeholders, sorted so reordering is not flagged.
    ///
    /// Positional arguments exist precisely so translators can reorder them.
    fn extract_placeholders(text: &str) -> Vec<String> {
        let regex = PLACEHOLDER_REGEX.get_or_init(|| {
            Regex::new(r"%(?:\d+\$)?[-+ 0#']*\d*(?:\.\d+)?[bcdeEfFgGosuxX%]").unwrap()
        });

        let mut found: Vec<String> = regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .filter(|p| p != "%%")
            .collect();
        found.sort();
        found
    }

    /// Extract HTML tag names in order of appearance (`<a href>` -> `a`, `</a>` -> `/a`)
    fn extract_html_tags(text: &str) -> Vec<String> {
        let regex = HTML_TAG_REGEX
            .get_or_init(|| Regex::new(r"<(/?[a-zA-Z][a-zA-Z0-9]*)[^<>]*>").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_lowercase()))
            .collect()
    }

    /// Extract all URLs from text
    fn extract_urls(text: &str) -> Vec<String> {
        let regex =
            URL_REGEX.get_or_init(|| Regex::new(r#"https?://[^\s<>"')]+"#).unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
