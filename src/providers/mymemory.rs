use super::{
    fetch_body, normalize_language, normalize_output, parse_json, ProviderKind, TranslationProvider,
};
use crate::error::{truncate, ProviderError};
use crate::i18n::Locale;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Error texts MyMemory puts in place of a translation.
const ERROR_PHRASES: [&str; 3] = [
    "QUERY LENGTH LIMIT",
    "IS AN INVALID",
    "INVALID LANGUAGE PAIR",
];

/// Adapter for the MyMemory translation memory API.
///
/// MyMemory reports most failures inside an HTTP 200 body: `responseStatus`
/// carries the real status (sometimes as a string) and quota exhaustion is
/// announced by a "MYMEMORY WARNING" text in place of the translation.
#[derive(Debug, Clone)]
pub struct MyMemoryProvider {
    client: reqwest::Client,
    base_url: String,
    source_language: String,
    email: Option<String>,
}

impl MyMemoryProvider {
    pub fn new(client: reqwest::Client, base_url: &str, source_language: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            source_language: normalize_language(ProviderKind::MyMemory, source_language),
            email: None,
        }
    }

    /// Contact email sent as `de`, which raises the anonymous daily quota.
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.trim().is_empty());
        self
    }

    fn response_status(body: &Value) -> Option<u16> {
        match body.get("responseStatus")? {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn interpret(body: &Value) -> Result<String, ProviderError> {
        let translated = body
            .get("responseData")
            .and_then(|d| d.get("translatedText"))
            .and_then(|t| t.as_str())
            .unwrap_or_default();
        let details = body
            .get("responseDetails")
            .and_then(|d| d.as_str())
            .unwrap_or_default();

        let upper_text = translated.to_uppercase();
        let upper_details = details.to_uppercase();

        if upper_text.contains("MYMEMORY WARNING") || upper_details.contains("MYMEMORY WARNING") {
            return Err(ProviderError::RateLimited(truncate(translated, 120).to_string()));
        }

        let status = Self::response_status(body).unwrap_or(200);

        // A translation may legitimately say "invalid"; in the text only
        // MyMemory's own error phrases count unless the status is an error
        let text_error = ERROR_PHRASES.iter().any(|p| upper_text.contains(p))
            || (status != 200 && upper_text.contains("INVALID"));
        let details_error = ["QUERY LENGTH LIMIT", "INVALID"]
            .iter()
            .any(|m| upper_details.contains(m));
        if text_error || details_error {
            let message = if details.is_empty() { translated } else { details };
            return Err(ProviderError::InvalidResponse(format!(
                "responseStatus {}: {}",
                status,
                truncate(message, 120)
            )));
        }

        if status != 200 {
            return Err(match reqwest::StatusCode::from_u16(status) {
                Ok(code) => ProviderError::from_status(code, details),
                Err(_) => ProviderError::Unavailable(format!("responseStatus {}", status)),
            });
        }

        if translated.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "missing responseData.translatedText".to_string(),
            ));
        }

        Ok(translated.to_string())
    }
}

#[async_trait]
impl TranslationProvider for MyMemoryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MyMemory
    }

    async fn translate(
        &self,
        text: &str,
        target: &Locale,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let langpair = format!(
            "{}|{}",
            self.source_language,
            normalize_language(ProviderKind::MyMemory, target.code())
        );

        let mut request = self
            .client
            .get(format!("{}/get", self.base_url))
            .query(&[("q", text), ("langpair", langpair.as_str())]);
        if let Some(email) = &self.email {
            request = request.query(&[("de", email.as_str())]);
        }

        let body = fetch_body(request, timeout).await?;
        let json = parse_json(&body)?;
        normalize_output(&Self::interpret(&json)?)
    }
}
