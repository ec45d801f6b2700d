//! Translation provider adapters.
//!
//! Every remote service sits behind the `TranslationProvider` trait and
//! answers a single request: translate one string into one locale, or fail
//! with one of the four `ProviderError` kinds. The adapters own all of the
//! per-service quirks (language code spellings, error payloads inside HTTP
//! 200 bodies, HTML-escaped output) so the resolution engine only ever sees
//! text or a classified failure.
//!
//! # Example
//!
//! ```rust,ignore
//! use po_autotranslate::providers::{ProviderChain, ProviderEndpoints, ProviderKind};
//!
//! let chain = ProviderChain::from_kinds(
//!     &[ProviderKind::Google, ProviderKind::MyMemory],
//!     &ProviderEndpoints::default(),
//!     reqwest::Client::new(),
//!     "en",
//!     Duration::from_secs(12),
//! );
//! ```

mod google;
mod libre;
mod mymemory;

pub use google::GoogleProvider;
pub use libre::LibreProvider;
pub use mymemory::MyMemoryProvider;

use crate::error::ProviderError;
use crate::i18n::Locale;
use anyhow::bail;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Default public endpoints
pub const DEFAULT_GOOGLE_URL: &str = "https://translate.googleapis.com";
pub const DEFAULT_MYMEMORY_URL: &str = "https://api.mymemory.translated.net";
pub const DEFAULT_LIBRE_URL: &str = "https://libretranslate.com";

/// The closed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    MyMemory,
    Libre,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Google,
        ProviderKind::MyMemory,
        ProviderKind::Libre,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::MyMemory => "mymemory",
            ProviderKind::Libre => "libre",
        }
    }

    /// Parse a comma-separated chain such as `google,mymemory`.
    ///
    /// Order is kept, duplicates are dropped, and an empty list is an error.
    pub fn parse_list(list: &str) -> anyhow::Result<Vec<ProviderKind>> {
        let mut kinds = Vec::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind: ProviderKind = name.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            bail!("Provider list is empty");
        }
        Ok(kinds)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "mymemory" => Ok(ProviderKind::MyMemory),
            "libre" | "libretranslate" => Ok(ProviderKind::Libre),
            other => bail!(
                "Unknown provider '{}' (expected one of: google, mymemory, libre)",
                other
            ),
        }
    }
}

/// Uniform interface over one remote translation service.
///
/// Implementations hold nothing but an HTTP client and static settings, so
/// a single instance is shared by every worker.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Which provider this adapter speaks to
    fn kind(&self) -> ProviderKind;

    /// Translate `text` into `target`, giving up after `timeout`.
    async fn translate(
        &self,
        text: &str,
        target: &Locale,
        timeout: Duration,
    ) -> Result<String, ProviderError>;
}

/// Position and call budget of one provider in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    /// Lower ranks are tried first
    pub priority_rank: u32,
    pub call_timeout: Duration,
}

/// One entry of a `ProviderChain`.
#[derive(Clone)]
pub struct ChainLink {
    pub spec: ProviderSpec,
    pub adapter: Arc<dyn TranslationProvider>,
}

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLink")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Strict priority list of providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderChain {
    links: Vec<ChainLink>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. Links stay sorted by rank; equal ranks keep insertion order.
    pub fn with(mut self, spec: ProviderSpec, adapter: Arc<dyn TranslationProvider>) -> Self {
        self.links.push(ChainLink { spec, adapter });
        self.links.sort_by_key(|link| link.spec.priority_rank);
        self
    }

    /// Build HTTP adapters for `kinds`, ranked by their position in the list.
    pub fn from_kinds(
        kinds: &[ProviderKind],
        endpoints: &ProviderEndpoints,
        client: reqwest::Client,
        source_language: &str,
        call_timeout: Duration,
    ) -> Self {
        kinds
            .iter()
            .enumerate()
            .fold(Self::new(), |chain, (rank, kind)| {
                let spec = ProviderSpec {
                    kind: *kind,
                    priority_rank: rank as u32,
                    call_timeout,
                };
                let adapter = build_adapter(*kind, endpoints, client.clone(), source_language);
                chain.with(spec, adapter)
            })
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.links.iter().map(|link| link.spec.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Base URLs and optional credentials for the HTTP adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub google_url: String,
    pub mymemory_url: String,
    pub libre_url: String,
    pub libre_api_key: Option<String>,
    /// Raises the MyMemory anonymous daily quota
    pub mymemory_email: Option<String>,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            google_url: DEFAULT_GOOGLE_URL.to_string(),
            mymemory_url: DEFAULT_MYMEMORY_URL.to_string(),
            libre_url: DEFAULT_LIBRE_URL.to_string(),
            libre_api_key: None,
            mymemory_email: None,
        }
    }
}

/// Construct the HTTP adapter for `kind`.
pub fn build_adapter(
    kind: ProviderKind,
    endpoints: &ProviderEndpoints,
    client: reqwest::Client,
    source_language: &str,
) -> Arc<dyn TranslationProvider> {
    match kind {
        ProviderKind::Google => Arc::new(GoogleProvider::new(
            client,
            &endpoints.google_url,
            source_language,
        )),
        ProviderKind::MyMemory => Arc::new(
            MyMemoryProvider::new(client, &endpoints.mymemory_url, source_language)
                .with_email(endpoints.mymemory_email.clone()),
        ),
        ProviderKind::Libre => Arc::new(
            LibreProvider::new(client, &endpoints.libre_url, source_language)
                .with_api_key(endpoints.libre_api_key.clone()),
        ),
    }
}

/// Spell a language code the way `kind` expects it.
pub fn normalize_language(kind: ProviderKind, code: &str) -> String {
    let lc = code.trim().to_lowercase();
    let simplified = matches!(
        lc.as_str(),
        "zh" | "zh_cn" | "zh-cn" | "zh-hans" | "zh_sg" | "zh_hans"
    );
    let traditional = matches!(lc.as_str(), "zh_tw" | "zh-tw" | "zh-hant");

    match kind {
        ProviderKind::Google if simplified => "zh-cn".to_string(),
        ProviderKind::Google if traditional => "zh-tw".to_string(),
        ProviderKind::MyMemory if simplified => "ZH-CN".to_string(),
        ProviderKind::MyMemory if traditional => "ZH-TW".to_string(),
        ProviderKind::Libre if simplified || traditional => "zh".to_string(),
        ProviderKind::MyMemory | ProviderKind::Libre if lc == "iw" => "he".to_string(),
        _ => lc,
    }
}

/// Send a request and return the body of a successful response.
///
/// Non-success statuses and transport failures are classified here so
/// every adapter maps them the same way.
pub(crate) async fn fetch_body(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<String, ProviderError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ProviderError::from_transport(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        return Err(ProviderError::from_status(status, &body));
    }

    response
        .text()
        .await
        .map_err(|e| ProviderError::from_transport(&e))
}

/// Parse a JSON body, mapping failures to `InvalidResponse`.
pub(crate) fn parse_json(body: &str) -> Result<serde_json::Value, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "unparseable body ({}): {}",
            e,
            crate::error::truncate(body, 80)
        ))
    })
}

/// Clean up raw provider output and reject garbage.
pub fn normalize_output(raw: &str) -> Result<String, ProviderError> {
    let decoded = decode_html_entities(raw);
    let text = decoded.trim();

    if text.is_empty() {
        return Err(ProviderError::InvalidResponse(
            "empty translation received".to_string(),
        ));
    }
    if text.contains('\u{FFFD}') {
        return Err(ProviderError::InvalidResponse(
            "output contains replacement characters".to_string(),
        ));
    }
    if text.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return Err(ProviderError::InvalidResponse(
            "output contains control characters".to_string(),
        ));
    }

    Ok(text.to_string())
}

/// Decode the HTML entities translation services leave in their output.
///
/// Handles the common named entities plus decimal and hex references.
/// Anything unrecognised is kept verbatim.
pub fn decode_html_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];

        let decoded = candidate
            .find(';')
            .filter(|&semi| semi > 1 && semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
