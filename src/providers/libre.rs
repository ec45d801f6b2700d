use super::{
    fetch_body, normalize_language, normalize_output, parse_json, ProviderKind, TranslationProvider,
};
use crate::error::{truncate, ProviderError};
use crate::i18n::Locale;
use async_trait::async_trait;
use std::time::Duration;

/// Adapter for a LibreTranslate instance.
#[derive(Debug, Clone)]
pub struct LibreProvider {
    client: reqwest::Client,
    base_url: String,
    source_language: String,
    api_key: Option<String>,
}

impl LibreProvider {
    pub fn new(client: reqwest::Client, base_url: &str, source_language: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            source_language: normalize_language(ProviderKind::Libre, source_language),
            api_key: None,
        }
    }

    /// API key for instances that require one.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    fn interpret(body: &serde_json::Value) -> Result<String, ProviderError> {
        if let Some(error) = body.get("error") {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ProviderError::Unavailable(truncate(&message, 120).to_string()));
        }

        body.get("translatedText")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse("missing translatedText".to_string()))
    }
}

#[async_trait]
impl TranslationProvider for LibreProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Libre
    }

    async fn translate(
        &self,
        text: &str,
        target: &Locale,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let target_code = normalize_language(ProviderKind::Libre, target.code());
        let mut form = vec![
            ("q", text),
            ("source", self.source_language.as_str()),
            ("target", target_code.as_str()),
            ("format", "text"),
        ];
        if let Some(key) = &self.api_key {
            form.push(("api_key", key.as_str()));
        }

        let request = self
            .client
            .post(format!("{}/translate", self.base_url))
            .form(&form);

        let body = fetch_body(request, timeout).await?;
        let json = parse_json(&body)?;
        normalize_output(&Self::interpret(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn spanish() -> Locale {
        Locale::new("es", "Spanish", "es_ES")
    }

    #[test]
    fn test_interpret_success() {
        let result = LibreProvider::interpret(&json!({"translatedText": "Fichar entrada"}));
        assert_eq!(result.unwrap(), "Fichar entrada");
    }

    #[test]
    fn test_interpret_error_body() {
        let result = LibreProvider::interpret(&json!({"error": "Visit https://portal.libretranslate.com to get an API key"}));
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn test_interpret_missing_field() {
        let result = LibreProvider::interpret(&json!({"detectedLanguage": {}}));
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    // ==================== Integration Tests with Wiremock ====================

    #[tokio::test]
    async fn test_translate_posts_form() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_string_contains("q=Clock+In"))
            .and(body_string_contains("source=en"))
            .and(body_string_contains("target=es"))
            .and(body_string_contains("format=text"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"translatedText": "Fichar entrada"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = LibreProvider::new(reqwest::Client::new(), &mock_server.uri(), "en");
        let result = provider
            .translate("Clock In", &spanish(), Duration::from_secs(5))
            .await;

        assert_eq!(result.unwrap(), "Fichar entrada");
    }

    #[tokio::test]
    async fn test_translate_includes_api_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_string_contains("api_key=secret-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"translatedText": "Hola"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = LibreProvider::new(reqwest::Client::new(), &mock_server.uri(), "en")
            .with_api_key(Some("secret-key".to_string()));
        let result = provider
            .translate("Hello", &spanish(), Duration::from_secs(5))
            .await;

        assert_eq!(result.unwrap(), "Hola");
    }

    #[tokio::test]
    async fn test_translate_403_is_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"error": "API key required"})),
            )
            .mount(&mock_server)
            .await;

        let provider = LibreProvider::new(reqwest::Client::new(), &mock_server.uri(), "en");
        let result = provider
            .translate("Hello", &spanish(), Duration::from_secs(5))
            .await;

        match result {
            Err(ProviderError::Unavailable(msg)) => assert!(msg.contains("API key required")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_translate_504_is_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(504))
            .mount(&mock_server)
            .await;

        let provider = LibreProvider::new(reqwest::Client::new(), &mock_server.uri(), "en");
        let result = provider
            .translate("Hello", &spanish(), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }
}
