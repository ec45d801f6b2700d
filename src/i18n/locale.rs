//! Locale type: one translation target.

use serde::Serialize;

/// A translation target.
///
/// `code` is what gets sent to providers (after per-provider normalization),
/// `catalog_tag` is what catalog files are named after.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Locale {
    /// Provider-facing language code (e.g., "fr", "zh-cn")
    code: String,

    /// English display name (e.g., "French")
    display_name: String,

    /// Region-qualified catalog tag (e.g., "fr_FR")
    catalog_tag: String,
}

impl Locale {
    /// Create a locale. The code is stored lowercase.
    pub fn new(
        code: impl Into<String>,
        display_name: impl Into<String>,
        catalog_tag: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into().trim().to_lowercase(),
            display_name: display_name.into(),
            catalog_tag: catalog_tag.into(),
        }
    }

    /// Get the provider-facing language code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Get the English display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Get the catalog naming tag.
    pub fn catalog_tag(&self) -> &str {
        &self.catalog_tag
    }

    /// Primary language subtag ("zh" for "zh-cn", "pt" for "pt_br").
    pub fn language(&self) -> &str {
        self.code
            .split(['-', '_'])
            .next()
            .unwrap_or(&self.code)
    }

    /// Whether this locale is the same language as `source_language`.
    ///
    /// Compares primary subtags, so "en" matches "en-gb".
    pub fn matches_language(&self, source_language: &str) -> bool {
        let source = source_language
            .split(['-', '_'])
            .next()
            .unwrap_or(source_language);
        self.language().eq_ignore_ascii_case(source)
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lowercases_code() {
        let locale = Locale::new(" ZH-CN ", "Chinese (Simplified)", "zh_CN");
        assert_eq!(locale.code(), "zh-cn");
        assert_eq!(locale.catalog_tag(), "zh_CN");
        assert_eq!(locale.display_name(), "Chinese (Simplified)");
    }

    #[test]
    fn test_language_subtag() {
        assert_eq!(Locale::new("zh-cn", "", "").language(), "zh");
        assert_eq!(Locale::new("pt_br", "", "").language(), "pt");
        assert_eq!(Locale::new("fr", "", "").language(), "fr");
    }

    #[test]
    fn test_matches_language() {
        let english = Locale::new("en-gb", "English (UK)", "en_GB");
        assert!(english.matches_language("en"));
        assert!(english.matches_language("EN-us"));
        assert!(!english.matches_language("fr"));
    }

    #[test]
    fn test_display() {
        let french = Locale::new("fr", "French", "fr_FR");
        assert_eq!(french.to_string(), "French (fr)");
    }

    #[test]
    fn test_equality_and_clone() {
        let a = Locale::new("de", "German", "de_DE");
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Locale::new("de", "German", "de_AT"));
    }
}
