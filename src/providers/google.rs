use super::{
    fetch_body, normalize_language, normalize_output, parse_json, ProviderKind, TranslationProvider,
};
use crate::error::ProviderError;
use crate::i18n::Locale;
use async_trait::async_trait;
use std::time::Duration;

/// Adapter for the public Google Translate web endpoint (`client=gtx`).
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
    source_language: String,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client, base_url: &str, source_language: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            source_language: normalize_language(ProviderKind::Google, source_language),
        }
    }

    /// Join the translated segments of a `translate_a/single` response.
    ///
    /// The body is a nested array; long inputs are split into sentences and
    /// each segment's translation sits at `[0][i][0]`.
    fn extract_translation(body: &serde_json::Value) -> Result<String, ProviderError> {
        let segments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("response is not a segment array".to_string())
            })?;

        let text: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(|s| s.as_str()))
            .collect();

        Ok(text)
    }
}

#[async_trait]
impl TranslationProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn translate(
        &self,
        text: &str,
        target: &Locale,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let target_code = normalize_language(ProviderKind::Google, target.code());
        let request = self
            .client
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_language.as_str()),
                ("tl", target_code.as_str()),
                ("dt", "t"),
                ("q", text),
            ]);

        let body = fetch_body(request, timeout).await?;
        let json = parse_json(&body)?;
        normalize_output(&Self::extract_translation(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn french() -> Locale {
        Locale::new("fr", "French", "fr_FR")
    }

    fn provider(server: &MockServer) -> GoogleProvider {
        GoogleProvider::new(reqwest::Client::new(), &server.uri(), "en")
    }

    // ==================== Response Parsing Tests ====================

    #[test]
    fn test_extract_translation_joins_segments() {
        let body = serde_json::json!([
            [["Bonjour. ", "Hello. ", null, null, 10], ["Au revoir.", "Goodbye.", null, null, 10]],
            null,
            "en"
        ]);
        assert_eq!(
            GoogleProvider::extract_translation(&body).unwrap(),
            "Bonjour. Au revoir."
        );
    }

    #[test]
    fn test_extract_translation_rejects_objects() {
        let body = serde_json::json!({"error": "nope"});
        assert!(matches!(
            GoogleProvider::extract_translation(&body),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let provider = GoogleProvider::new(reqwest::Client::new(), "http://localhost:1/", "en");
        assert_eq!(provider.base_url, "http://localhost:1");
    }

    // ==================== Integration Tests with Wiremock ====================

    #[tokio::test]
    async fn test_translate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("sl", "en"))
            .and(query_param("tl", "fr"))
            .and(query_param("q", "Clock In"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                [["Pointer l&#39;arrivée", "Clock In", null, null, 10]],
                null,
                "en"
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .translate("Clock In", &french(), Duration::from_secs(5))
            .await;

        assert_eq!(result.unwrap(), "Pointer l'arrivée");
    }

    #[tokio::test]
    async fn test_translate_normalizes_chinese_target() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("tl", "zh-cn"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([[["打卡", "Clock In"]]])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let chinese = Locale::new("zh_CN", "Chinese (Simplified)", "zh_CN");
        let result = provider(&mock_server)
            .translate("Clock In", &chinese, Duration::from_secs(5))
            .await;

        assert_eq!(result.unwrap(), "打卡");
    }

    #[tokio::test]
    async fn test_translate_429_is_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .translate("Clock In", &french(), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(ProviderError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_translate_html_body_is_invalid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .translate("Clock In", &french(), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_translate_empty_segments_is_invalid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[]])))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .translate("Clock In", &french(), Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_translate_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([[["Bonjour", "Hello"]]]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .translate("Hello", &french(), Duration::from_millis(50))
            .await;

        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_translate_connection_refused_is_unavailable() {
        // Port 1 on localhost is never listening
        let provider = GoogleProvider::new(reqwest::Client::new(), "http://127.0.0.1:1", "en");
        let result = provider
            .translate("Hello", &french(), Duration::from_secs(2))
            .await;

        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }
}
