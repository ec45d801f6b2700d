//! Core records passed between the template reader, the resolution engine,
//! the batch coordinator and the catalog writer.

use crate::providers::ProviderKind;
use serde::Serialize;

/// Separator gettext places between a message context and its msgid.
pub const CONTEXT_SEPARATOR: char = '\u{4}';

/// One translatable string from the template. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEntry {
    /// Lookup key: `msgid`, or `msgctxt \u{4} msgid` when a context exists
    pub id: String,
    pub source_text: String,
    pub context: Option<String>,
    /// `msgid_plural`, when the entry has plural forms
    pub plural: Option<String>,
    /// `path:line` references from `#:` comments
    pub references: Vec<String>,
}

impl MessageEntry {
    /// Build an entry, deriving its id from the context and source text.
    pub fn new(
        source_text: impl Into<String>,
        context: Option<String>,
        plural: Option<String>,
    ) -> Self {
        let source_text = source_text.into();
        let id = match &context {
            Some(ctx) => format!("{}{}{}", ctx, CONTEXT_SEPARATOR, source_text),
            None => source_text.clone(),
        };
        Self {
            id,
            source_text,
            context,
            plural,
            references: Vec::new(),
        }
    }

    /// Plain entry without context or plural.
    pub fn simple(source_text: impl Into<String>) -> Self {
        Self::new(source_text, None, None)
    }

    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }
}

/// Final outcome for one (entry, locale) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResult {
    pub entry_id: String,
    pub locale_code: String,
    /// Accepted translation, or the source text when unresolved
    pub translated_text: String,
    pub succeeded: bool,
    /// Provider that produced the accepted translation
    pub provider: Option<ProviderKind>,
    /// Accepted output identical to the source text
    pub needs_review: bool,
}

impl TranslationResult {
    /// A resolved pair.
    pub fn translated(
        entry: &MessageEntry,
        locale_code: &str,
        text: String,
        provider: Option<ProviderKind>,
        needs_review: bool,
    ) -> Self {
        Self {
            entry_id: entry.id.clone(),
            locale_code: locale_code.to_string(),
            translated_text: text,
            succeeded: true,
            provider,
            needs_review,
        }
    }

    /// An unresolved pair carrying the source text as degraded fallback.
    pub fn fallback(entry: &MessageEntry, locale_code: &str) -> Self {
        Self {
            entry_id: entry.id.clone(),
            locale_code: locale_code.to_string(),
            translated_text: entry.source_text.clone(),
            succeeded: false,
            provider: None,
            needs_review: false,
        }
    }
}

/// How a single provider call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failure,
    Timeout,
}

/// One provider call made while resolving a pair. Reporting only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationAttempt {
    pub provider: ProviderKind,
    /// 1-based attempt number against this provider
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_entry_id_is_msgid() {
        let entry = MessageEntry::simple("Clock In");
        assert_eq!(entry.id, "Clock In");
        assert!(entry.context.is_none());
        assert!(entry.plural.is_none());
    }

    #[test]
    fn test_context_entry_id_uses_separator() {
        let entry = MessageEntry::new("Post", Some("verb".to_string()), None);
        assert_eq!(entry.id, "verb\u{4}Post");
        assert_eq!(entry.source_text, "Post");
    }

    #[test]
    fn test_same_msgid_different_context_differs() {
        let noun = MessageEntry::new("Post", Some("noun".to_string()), None);
        let verb = MessageEntry::new("Post", Some("verb".to_string()), None);
        assert_ne!(noun.id, verb.id);
    }

    #[test]
    fn test_fallback_result_carries_source() {
        let entry = MessageEntry::simple("Clock Out");
        let result = TranslationResult::fallback(&entry, "fr");
        assert!(!result.succeeded);
        assert_eq!(result.translated_text, "Clock Out");
        assert_eq!(result.locale_code, "fr");
        assert!(result.provider.is_none());
    }

    #[test]
    fn test_translated_result() {
        let entry = MessageEntry::simple("Clock In");
        let result = TranslationResult::translated(
            &entry,
            "fr",
            "Pointer l'arrivée".to_string(),
            Some(ProviderKind::Google),
            false,
        );
        assert!(result.succeeded);
        assert_eq!(result.entry_id, "Clock In");
        assert_eq!(result.provider, Some(ProviderKind::Google));
    }

    #[test]
    fn test_attempt_outcome_serializes_lowercase() {
        let json = serde_json::to_string(&AttemptOutcome::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }
}
