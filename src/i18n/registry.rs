//! Locale registry: the table of languages a run can target.
//!
//! The registry is a plain value built once per run and passed around
//! explicitly. It starts from a built-in table and can be replaced by the
//! same two JSON files the catalog tooling has always used:
//!
//! - `languages.json`: `{ "fr": "French", ... }`
//! - `locale_map.json`: `{ "fr": "fr_FR", ... }` (missing codes fall back to the code itself)

use crate::i18n::Locale;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Ordered set of known locales.
#[derive(Debug, Clone)]
pub struct LocaleRegistry {
    locales: Vec<Locale>,
}

impl LocaleRegistry {
    /// Build a registry from an explicit list. Later duplicates are dropped.
    pub fn new(locales: Vec<Locale>) -> Self {
        let mut unique: Vec<Locale> = Vec::with_capacity(locales.len());
        for locale in locales {
            if !unique.iter().any(|l| l.code() == locale.code()) {
                unique.push(locale);
            }
        }
        Self { locales: unique }
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_LOCALES
                .iter()
                .map(|(code, name, tag)| Locale::new(*code, *name, *tag))
                .collect(),
        )
    }

    /// Build a registry from `{code: name}` and `{code: tag}` JSON documents.
    pub fn from_json(languages_json: &str, locale_map_json: Option<&str>) -> Result<Self> {
        let languages: BTreeMap<String, String> =
            serde_json::from_str(languages_json).context("Failed to parse languages JSON")?;
        let locale_map: BTreeMap<String, String> = match locale_map_json {
            Some(json) => serde_json::from_str(json).context("Failed to parse locale map JSON")?,
            None => BTreeMap::new(),
        };

        if languages.is_empty() {
            bail!("Languages JSON does not define any language");
        }

        let locales = languages
            .into_iter()
            .map(|(code, name)| {
                let tag = locale_map.get(&code).cloned().unwrap_or_else(|| code.clone());
                Locale::new(code, name, tag)
            })
            .collect();

        Ok(Self::new(locales))
    }

    /// Load a registry from the two JSON files on disk.
    pub fn from_files(languages_file: &Path, locale_map_file: Option<&Path>) -> Result<Self> {
        let languages = std::fs::read_to_string(languages_file).with_context(|| {
            format!("Failed to read languages file {}", languages_file.display())
        })?;
        let locale_map = match locale_map_file {
            Some(path) => Some(std::fs::read_to_string(path).with_context(|| {
                format!("Failed to read locale map file {}", path.display())
            })?),
            None => None,
        };

        Self::from_json(&languages, locale_map.as_deref())
    }

    /// Get a locale by its code (case-insensitive).
    pub fn get_by_code(&self, code: &str) -> Option<&Locale> {
        let code = code.trim();
        self.locales
            .iter()
            .find(|locale| locale.code().eq_ignore_ascii_case(code))
    }

    /// Get all locales in registry order.
    pub fn list_all(&self) -> &[Locale] {
        &self.locales
    }

    /// Resolve a selection of codes. An empty selection means every locale.
    ///
    /// Unknown codes are an error; duplicates are collapsed, keeping the
    /// first occurrence.
    pub fn select<S: AsRef<str>>(&self, codes: &[S]) -> Result<Vec<Locale>> {
        if codes.is_empty() {
            return Ok(self.locales.clone());
        }

        let mut selected: Vec<Locale> = Vec::with_capacity(codes.len());
        for code in codes {
            let code = code.as_ref();
            let locale = match self.get_by_code(code) {
                Some(locale) => locale,
                None => bail!("Unknown language code: '{}'", code),
            };
            if !selected.contains(locale) {
                selected.push(locale.clone());
            }
        }
        Ok(selected)
    }

    /// Number of known locales.
    pub fn len(&self) -> usize {
        self.locales.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }
}

impl Default for LocaleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// (code, English name, catalog tag) for the built-in registry.
const BUILTIN_LOCALES: &[(&str, &str, &str)] = &[
    ("ar", "Arabic", "ar"),
    ("bg", "Bulgarian", "bg_BG"),
    ("bn", "Bengali", "bn_BD"),
    ("cs", "Czech", "cs_CZ"),
    ("da", "Danish", "da_DK"),
    ("de", "German", "de_DE"),
    ("el", "Greek", "el"),
    ("es", "Spanish", "es_ES"),
    ("fa", "Persian", "fa_IR"),
    ("fi", "Finnish", "fi"),
    ("fr", "French", "fr_FR"),
    ("he", "Hebrew", "he_IL"),
    ("hi", "Hindi", "hi_IN"),
    ("hu", "Hungarian", "hu_HU"),
    ("id", "Indonesian", "id_ID"),
    ("it", "Italian", "it_IT"),
    ("ja", "Japanese", "ja"),
    ("ko", "Korean", "ko_KR"),
    ("nl", "Dutch", "nl_NL"),
    ("no", "Norwegian", "nb_NO"),
    ("pl", "Polish", "pl_PL"),
    ("pt", "Portuguese", "pt_PT"),
    ("ro", "Romanian", "ro_RO"),
    ("ru", "Russian", "ru_RU"),
    ("sv", "Swedish", "sv_SE"),
    ("th", "Thai", "th"),
    ("tr", "Turkish", "tr_TR"),
    ("uk", "Ukrainian", "uk"),
    ("vi", "Vietnamese", "vi"),
    ("zh-cn", "Chinese (Simplified)", "zh_CN"),
    ("zh-tw", "Chinese (Traditional)", "zh_TW"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== Built-in Table Tests ====================

    #[test]
    fn test_builtin_contains_french() {
        let registry = LocaleRegistry::builtin();
        let french = registry.get_by_code("fr").expect("fr should exist");
        assert_eq!(french.display_name(), "French");
        assert_eq!(french.catalog_tag(), "fr_FR");
    }

    #[test]
    fn test_builtin_codes_are_unique() {
        let registry = LocaleRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN_LOCALES.len());
    }

    #[test]
    fn test_get_by_code_is_case_insensitive() {
        let registry = LocaleRegistry::builtin();
        assert!(registry.get_by_code("ZH-CN").is_some());
        assert!(registry.get_by_code(" de ").is_some());
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        let registry = LocaleRegistry::builtin();
        assert!(registry.get_by_code("xx").is_none());
        assert!(registry.get_by_code("").is_none());
    }

    // ==================== Selection Tests ====================

    #[test]
    fn test_select_empty_means_all() {
        let registry = LocaleRegistry::builtin();
        let selected = registry.select::<&str>(&[]).unwrap();
        assert_eq!(selected.len(), registry.len());
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let registry = LocaleRegistry::builtin();
        let selected = registry.select(&["ja", "fr", "de"]).unwrap();
        let codes: Vec<&str> = selected.iter().map(|l| l.code()).collect();
        assert_eq!(codes, vec!["ja", "fr", "de"]);
    }

    #[test]
    fn test_select_collapses_duplicates() {
        let registry = LocaleRegistry::builtin();
        let selected = registry.select(&["fr", "FR", "fr"]).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_select_unknown_code_fails() {
        let registry = LocaleRegistry::builtin();
        let err = registry.select(&["fr", "klingon"]).unwrap_err();
        assert!(err.to_string().contains("klingon"));
    }

    // ==================== JSON Loading Tests ====================

    #[test]
    fn test_from_json_with_locale_map() {
        let registry = LocaleRegistry::from_json(
            r#"{"fr": "French", "pt-br": "Portuguese (Brazil)"}"#,
            Some(r#"{"fr": "fr_CA"}"#),
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get_by_code("fr").unwrap().catalog_tag(), "fr_CA");
        // Missing from the map: tag falls back to the code
        assert_eq!(
            registry.get_by_code("pt-br").unwrap().catalog_tag(),
            "pt-br"
        );
    }

    #[test]
    fn test_from_json_rejects_empty_languages() {
        assert!(LocaleRegistry::from_json("{}", None).is_err());
    }

    #[test]
    fn test_from_json_rejects_malformed_json() {
        let err = LocaleRegistry::from_json("[1, 2", None).unwrap_err();
        assert!(err.to_string().contains("languages JSON"));
    }

    #[test]
    fn test_from_files() {
        let dir = TempDir::new().unwrap();
        let languages = dir.path().join("languages.json");
        let locale_map = dir.path().join("locale_map.json");
        std::fs::write(&languages, r#"{"de": "German"}"#).unwrap();
        std::fs::write(&locale_map, r#"{"de": "de_CH"}"#).unwrap();

        let registry = LocaleRegistry::from_files(&languages, Some(&locale_map)).unwrap();
        assert_eq!(registry.get_by_code("de").unwrap().catalog_tag(), "de_CH");
    }

    #[test]
    fn test_from_files_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = LocaleRegistry::from_files(&dir.path().join("nope.json"), None).unwrap_err();
        assert!(err.to_string().contains("Failed to read languages file"));
    }
}
