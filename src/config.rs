use crate::batch::BatchSettings;
use crate::engine::{EchoPolicy, ResolutionSettings};
use crate::i18n::{Locale, LocaleRegistry};
use crate::providers::{
    ProviderChain, ProviderEndpoints, ProviderKind, DEFAULT_GOOGLE_URL, DEFAULT_LIBRE_URL,
    DEFAULT_MYMEMORY_URL,
};
use crate::retry::RetryConfig;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Input / output
    pub pot_file: Option<PathBuf>,
    pub output_dir: PathBuf,

    // Provider chain
    pub providers: Vec<ProviderKind>,
    pub call_timeout: Duration,
    pub endpoints: ProviderEndpoints,

    // Retry / backoff
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,

    // Batch
    pub concurrency: usize,
    pub run_timeout: Option<Duration>,

    // Languages
    pub target_languages: Vec<String>,
    pub source_language: String,
    pub echo_policy: EchoPolicy,
    pub languages_file: Option<PathBuf>,
    pub locale_map_file: Option<PathBuf>,
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub pot_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub providers: Option<String>,
    pub max_retries: Option<u32>,
    pub languages: Option<String>,
    pub concurrency: Option<usize>,
    pub run_timeout_secs: Option<u64>,
    pub echo_policy: Option<EchoPolicy>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().trim_matches('"').trim_matches('\'').to_string())
                .filter(|v| !v.is_empty())
        };

        let config = Self {
            pot_file: var("POT_FILE").map(PathBuf::from),
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("languages")),

            providers: match var("PROVIDERS") {
                Some(list) => ProviderKind::parse_list(&list).context("Invalid PROVIDERS")?,
                None => ProviderKind::ALL.to_vec(),
            },
            call_timeout: Duration::from_secs(parse_var(&var, "CALL_TIMEOUT_SECS", 12)?),
            endpoints: ProviderEndpoints {
                google_url: var("GOOGLE_TRANSLATE_URL")
                    .unwrap_or_else(|| DEFAULT_GOOGLE_URL.to_string()),
                mymemory_url: var("MYMEMORY_URL")
                    .unwrap_or_else(|| DEFAULT_MYMEMORY_URL.to_string()),
                libre_url: var("LIBRETRANSLATE_URL")
                    .unwrap_or_else(|| DEFAULT_LIBRE_URL.to_string()),
                libre_api_key: var("LIBRETRANSLATE_API_KEY"),
                mymemory_email: var("MYMEMORY_EMAIL"),
            },

            max_retries: parse_var(&var, "MAX_RETRIES", 3)?,
            base_backoff: Duration::from_millis(parse_var(&var, "BASE_BACKOFF_MS", 1000)?),
            backoff_multiplier: parse_var(&var, "BACKOFF_MULTIPLIER", 2.0)?,
            max_backoff: Duration::from_millis(parse_var(&var, "MAX_BACKOFF_MS", 5000)?),

            concurrency: parse_var(&var, "CONCURRENCY", 4)?,
            run_timeout: match parse_var::<u64, _>(&var, "RUN_TIMEOUT_SECS", 0)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },

            target_languages: var("TARGET_LANGUAGES")
                .map(|list| split_list(&list))
                .unwrap_or_default(),
            source_language: var("SOURCE_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            echo_policy: parse_var(&var, "ECHO_POLICY", EchoPolicy::Accept)?,
            languages_file: var("LANGUAGES_FILE").map(PathBuf::from),
            locale_map_file: var("LOCALE_MAP_FILE").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line values, then re-validate.
    pub fn apply_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(pot_file) = overrides.pot_file {
            self.pot_file = Some(pot_file);
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(providers) = overrides.providers {
            self.providers = ProviderKind::parse_list(&providers).context("Invalid --providers")?;
        }
        if let Some(max_retries) = overrides.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(languages) = overrides.languages {
            self.target_languages = split_list(&languages);
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(secs) = overrides.run_timeout_secs {
            self.run_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(echo_policy) = overrides.echo_policy {
            self.echo_policy = echo_policy;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            bail!("At least one provider must be configured");
        }
        if self.max_retries == 0 {
            bail!("MAX_RETRIES must be at least 1");
        }
        if self.concurrency == 0 {
            bail!("CONCURRENCY must be at least 1");
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            bail!(
                "BACKOFF_MULTIPLIER must be a finite number >= 1.0, got {}",
                self.backoff_multiplier
            );
        }
        if self.call_timeout.is_zero() {
            bail!("CALL_TIMEOUT_SECS must be greater than 0");
        }
        if self.max_backoff < self.base_backoff {
            bail!(
                "MAX_BACKOFF_MS ({}) must not be below BASE_BACKOFF_MS ({})",
                self.max_backoff.as_millis(),
                self.base_backoff.as_millis()
            );
        }
        Ok(())
    }

    /// Template path, required by the translate command.
    pub fn pot_file(&self) -> Result<&PathBuf> {
        self.pot_file
            .as_ref()
            .context("POT_FILE not set (use --pot or the POT_FILE variable)")
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries, self.base_backoff)
            .with_max_delay(self.max_backoff)
            .with_backoff_multiplier(self.backoff_multiplier)
    }

    pub fn resolution_settings(&self) -> ResolutionSettings {
        ResolutionSettings {
            retry: self.retry_config(),
            echo_policy: self.echo_policy,
            source_language: self.source_language.clone(),
        }
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            concurrency: self.concurrency,
            run_timeout: self.run_timeout,
        }
    }

    pub fn build_chain(&self, client: reqwest::Client) -> ProviderChain {
        ProviderChain::from_kinds(
            &self.providers,
            &self.endpoints,
            client,
            &self.source_language,
            self.call_timeout,
        )
    }

    /// Built-in locale table, or the JSON files when `LANGUAGES_FILE` is set.
    pub fn registry(&self) -> Result<LocaleRegistry> {
        match &self.languages_file {
            Some(languages_file) => {
                LocaleRegistry::from_files(languages_file, self.locale_map_file.as_deref())
            }
            None => Ok(LocaleRegistry::builtin()),
        }
    }

    /// Locales to translate into, in selection order.
    pub fn selected_locales(&self, registry: &LocaleRegistry) -> Result<Vec<Locale>> {
        registry
            .select(&self.target_languages)
            .context("Invalid TARGET_LANGUAGES / --languages")
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}
