//! Error types shared across the crate.
//!
//! Provider adapters report one of four failure kinds. The resolution engine
//! decides what each kind means for the retry budget; exhausting the whole
//! chain is a resolution outcome, not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds reported by a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No usable response within the call timeout
    #[error("timed out: {0}")]
    Timeout(String),

    /// The provider asked us to slow down (HTTP 429, quota warnings)
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider refused the request or could not be reached
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The provider answered, but not with a usable translation
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Transient failures are retried against the same provider.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Timeout(_) | ProviderError::RateLimited(_))
    }

    /// Map a non-success HTTP status to a failure kind.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = format!("HTTP {}: {}", status.as_u16(), truncate(body, 120));
        match status.as_u16() {
            429 => ProviderError::RateLimited(detail),
            408 | 504 => ProviderError::Timeout(detail),
            _ => ProviderError::Unavailable(detail),
        }
    }

    /// Map a transport-level reqwest error to a failure kind.
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout(error.to_string())
        } else if error.is_decode() {
            ProviderError::InvalidResponse(error.to_string())
        } else {
            ProviderError::Unavailable(error.to_string())
        }
    }
}

/// Errors raised while reading templates or writing catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Malformed PO/POT input
    #[error("{origin}:{line}: {message}")]
    Parse {
        origin: String,
        line: usize,
        message: String,
    },

    /// Results that do not line up with the template entries
    #[error("catalog for {locale} does not match the template: {message}")]
    Mismatch { locale: String, message: String },

    /// Filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Cut `text` to at most `max` characters on a char boundary.
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    // ==================== Status Mapping Tests ====================

    #[test]
    fn test_from_status_429_is_rate_limited() {
        let err = ProviderError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, ProviderError::RateLimited(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_status_gateway_timeout_is_timeout() {
        let err = ProviderError::from_status(StatusCode::GATEWAY_TIMEOUT, "");
        assert!(matches!(err, ProviderError::Timeout(_)));
        let err = ProviderError::from_status(StatusCode::REQUEST_TIMEOUT, "");
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[test]
    fn test_from_status_other_errors_are_unavailable() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let err = ProviderError::from_status(status, "nope");
            assert!(
                matches!(err, ProviderError::Unavailable(_)),
                "{} should map to Unavailable",
                status
            );
            assert!(!err.is_transient());
        }
    }

    #[test]
    fn test_from_status_includes_code_and_body() {
        let err = ProviderError::from_status(StatusCode::FORBIDDEN, "API key required");
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("API key required"));
    }

    #[test]
    fn test_from_status_truncates_long_bodies() {
        let body = "x".repeat(500);
        let err = ProviderError::from_status(StatusCode::BAD_GATEWAY, &body);
        assert!(err.to_string().len() < 200);
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_invalid_response_is_not_transient() {
        assert!(!ProviderError::InvalidResponse("garbled".into()).is_transient());
        assert!(!ProviderError::Unavailable("down".into()).is_transient());
        assert!(ProviderError::Timeout("slow".into()).is_transient());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn test_catalog_parse_error_display() {
        let err = CatalogError::Parse {
            origin: "plugin.pot".to_string(),
            line: 12,
            message: "unterminated string".to_string(),
        };
        assert_eq!(err.to_string(), "plugin.pot:12: unterminated string");
    }
}
