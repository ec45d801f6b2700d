//! Resolution engine: turns one (entry, locale) pair into one result.
//!
//! Providers are tried strictly in chain order. Each provider gets a retry
//! budget for transient failures (`Timeout`, `RateLimited`) with exponential
//! backoff between attempts; non-transient failures move straight on to the
//! next provider. When the chain runs out the pair degrades to its source
//! text. Every suspension point races against the run's `CancelToken`.

use crate::cancel::CancelToken;
use crate::error::ProviderError;
use crate::events::{AttemptEvent, EventSink, Phase};
use crate::i18n::{Locale, TranslationValidator};
use crate::model::{AttemptOutcome, MessageEntry, TranslationAttempt, TranslationResult};
use crate::providers::{ChainLink, ProviderChain, ProviderKind};
use crate::retry::RetryConfig;
use anyhow::bail;
use std::str::FromStr;
use tracing::{debug, warn};

/// What to do with a provider answer identical to the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EchoPolicy {
    /// Keep it, flagged `needs_review`
    #[default]
    Accept,
    /// Treat it as `InvalidResponse` and fall through
    Reject,
}

impl FromStr for EchoPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Ok(EchoPolicy::Accept),
            "reject" => Ok(EchoPolicy::Reject),
            other => bail!("Invalid echo policy '{}' (expected accept or reject)", other),
        }
    }
}

/// Per-run knobs for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionSettings {
    pub retry: RetryConfig,
    pub echo_policy: EchoPolicy,
    /// Language the template is written in
    pub source_language: String,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            echo_policy: EchoPolicy::default(),
            source_language: "en".to_string(),
        }
    }
}

/// How a resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Resolved without calling any provider (empty source, source-language target)
    Trivial,
    /// A provider's answer was accepted
    Translated,
    /// Every provider failed; the result carries the source text
    Exhausted,
    /// The run was interrupted; the result carries the source text
    Cancelled,
}

/// Result of one pair plus the attempts made to get it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub result: TranslationResult,
    pub attempts: Vec<TranslationAttempt>,
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    /// A pair the run never got to.
    pub fn cancelled(entry: &MessageEntry, locale: &Locale) -> Self {
        Self {
            result: TranslationResult::fallback(entry, locale.code()),
            attempts: Vec::new(),
            outcome: ResolutionOutcome::Cancelled,
        }
    }
}

/// Where a pair is in its walk down the chain.
#[derive(Debug)]
enum PairState {
    /// About to make the first call to the current provider
    Pending,
    /// About to make attempt `n` (2-based) after a backoff
    Retrying(u32),
    /// The current provider is done; advance to the next one
    FailedProvider,
    Succeeded {
        text: String,
        provider: ProviderKind,
        needs_review: bool,
    },
    ExhaustedChain,
    Cancelled,
}

/// Stateless resolver shared by every worker of a batch.
pub struct ResolutionEngine {
    chain: ProviderChain,
    settings: ResolutionSettings,
    events: EventSink,
}

impl ResolutionEngine {
    pub fn new(chain: ProviderChain, settings: ResolutionSettings) -> Self {
        Self {
            chain,
            settings,
            events: EventSink::disabled(),
        }
    }

    /// Report attempt-level progress to `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn settings(&self) -> &ResolutionSettings {
        &self.settings
    }

    /// Resolve one pair. Never fails: exhaustion and cancellation are outcomes.
    pub async fn resolve(
        &self,
        entry: &MessageEntry,
        locale: &Locale,
        cancel: &CancelToken,
    ) -> Resolution {
        if entry.source_text.trim().is_empty() {
            return self.trivial(entry, locale, String::new());
        }
        if locale.matches_language(&self.settings.source_language) {
            return self.trivial(entry, locale, entry.source_text.clone());
        }
        if cancel.is_cancelled() {
            return Resolution::cancelled(entry, locale);
        }

        let links = self.chain.links();
        let mut attempts = Vec::new();
        let mut index = 0;
        let mut state = if links.is_empty() {
            PairState::ExhaustedChain
        } else {
            PairState::Pending
        };

        loop {
            state = match state {
                PairState::Pending => {
                    self.call(&links[index], entry, locale, 1, cancel, &mut attempts)
                        .await
                }
                PairState::Retrying(attempt) => {
                    let delay = self.settings.retry.delay_for_attempt(attempt - 1);
                    debug!(
                        "{} attempt {}/{} for '{}' ({}): waiting {:?}",
                        links[index].spec.kind,
                        attempt,
                        self.max_attempts(),
                        entry.id,
                        locale.code(),
                        delay
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => PairState::Cancelled,
                        _ = tokio::time::sleep(delay) => {
                            self.call(&links[index], entry, locale, attempt, cancel, &mut attempts)
                                .await
                        }
                    }
                }
                PairState::FailedProvider => {
                    index += 1;
                    if index < links.len() {
                        debug!(
                            "Switching to {} for '{}' ({})",
                            links[index].spec.kind,
                            entry.id,
                            locale.code()
                        );
                        PairState::Pending
                    } else {
                        PairState::ExhaustedChain
                    }
                }
                PairState::Succeeded {
                    text,
                    provider,
                    needs_review,
                } => {
                    let result = TranslationResult::translated(
                        entry,
                        locale.code(),
                        text,
                        Some(provider),
                        needs_review,
                    );
                    return Resolution {
                        result,
                        attempts,
                        outcome: ResolutionOutcome::Translated,
                    };
                }
                PairState::ExhaustedChain => {
                    warn!(
                        "All providers exhausted for '{}' ({}) after {} attempts; keeping source text",
                        entry.id,
                        locale.code(),
                        attempts.len()
                    );
                    self.events.attempt(AttemptEvent {
                        phase: Phase::Exhausted,
                        locale: locale.code().to_string(),
                        entry_id: entry.id.clone(),
                        provider: None,
                        attempt: 0,
                        detail: None,
                    });
                    return Resolution {
                        result: TranslationResult::fallback(entry, locale.code()),
                        attempts,
                        outcome: ResolutionOutcome::Exhausted,
                    };
                }
                PairState::Cancelled => {
                    debug!("Resolution of '{}' ({}) cancelled", entry.id, locale.code());
                    return Resolution {
                        result: TranslationResult::fallback(entry, locale.code()),
                        attempts,
                        outcome: ResolutionOutcome::Cancelled,
                    };
                }
            };
        }
    }

    fn max_attempts(&self) -> u32 {
        self.settings.retry.max_attempts.max(1)
    }

    fn trivial(&self, entry: &MessageEntry, locale: &Locale, text: String) -> Resolution {
        Resolution {
            result: TranslationResult::translated(entry, locale.code(), text, None, false),
            attempts: Vec::new(),
            outcome: ResolutionOutcome::Trivial,
        }
    }

    /// Make one call and decide the next state.
    async fn call(
        &self,
        link: &ChainLink,
        entry: &MessageEntry,
        locale: &Locale,
        attempt: u32,
        cancel: &CancelToken,
        attempts: &mut Vec<TranslationAttempt>,
    ) -> PairState {
        let kind = link.spec.kind;
        let timeout = link.spec.call_timeout;
        self.emit(Phase::Attempt, entry, locale, kind, attempt, None);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PairState::Cancelled,
            outcome = tokio::time::timeout(
                timeout,
                link.adapter.translate(&entry.source_text, locale, timeout),
            ) => outcome,
        };

        let accepted = outcome
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout(format!(
                    "no response within {:?}",
                    timeout
                )))
            })
            .and_then(|raw| self.accept(entry, raw));

        match accepted {
            Ok((text, needs_review)) => {
                attempts.push(TranslationAttempt {
                    provider: kind,
                    attempt,
                    outcome: AttemptOutcome::Success,
                    error: None,
                });
                self.emit(Phase::Success, entry, locale, kind, attempt, None);

                let report = TranslationValidator::validate(&entry.source_text, &text);
                if report.has_warnings() {
                    warn!(
                        "Translation validation warnings for '{}' ({}) from {}: {:?}",
                        entry.id,
                        locale.code(),
                        kind,
                        report.warnings
                    );
                }
                if needs_review {
                    debug!(
                        "{} echoed '{}' ({}) unchanged; flagged for review",
                        kind,
                        entry.id,
                        locale.code()
                    );
                }

                PairState::Succeeded {
                    text,
                    provider: kind,
                    needs_review,
                }
            }
            Err(error) => {
                let max_attempts = self.max_attempts();
                warn!(
                    "{} failed for '{}' ({}) on attempt {}/{}: {}",
                    kind,
                    entry.id,
                    locale.code(),
                    attempt,
                    max_attempts,
                    error
                );
                attempts.push(TranslationAttempt {
                    provider: kind,
                    attempt,
                    outcome: match error {
                        ProviderError::Timeout(_) => AttemptOutcome::Timeout,
                        _ => AttemptOutcome::Failure,
                    },
                    error: Some(error.to_string()),
                });
                self.emit(
                    Phase::Failure,
                    entry,
                    locale,
                    kind,
                    attempt,
                    Some(error.to_string()),
                );

                if error.is_transient() && attempt < max_attempts {
                    PairState::Retrying(attempt + 1)
                } else {
                    PairState::FailedProvider
                }
            }
        }
    }

    /// Final acceptance check on provider output.
    ///
    /// Returns the text to keep and whether it needs human review.
    fn accept(&self, entry: &MessageEntry, raw: String) -> Result<(String, bool), ProviderError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "empty translation received".to_string(),
            ));
        }

        let echoed = text == entry.source_text.trim();
        match (echoed, self.settings.echo_policy) {
            (true, EchoPolicy::Reject) => Err(ProviderError::InvalidResponse(
                "output echoes the source text".to_string(),
            )),
            (echoed, _) => Ok((wrap_like(&entry.source_text, text), echoed)),
        }
    }

    fn emit(
        &self,
        phase: Phase,
        entry: &MessageEntry,
        locale: &Locale,
        provider: ProviderKind,
        attempt: u32,
        detail: Option<String>,
    ) {
        self.events.attempt(AttemptEvent {
            phase,
            locale: locale.code().to_string(),
            entry_id: entry.id.clone(),
            provider: Some(provider),
            attempt,
            detail,
        });
    }
}

/// Give `text` the leading and trailing whitespace of `source`.
///
/// gettext tooling requires msgid and msgstr to agree on surrounding
/// newlines, and providers strip them.
fn wrap_like(source: &str, text: &str) -> String {
    let leading = &source[..source.len() - source.trim_start().len()];
    let trailing = &source[source.trim_end().len()..];
    format!("{}{}{}", leading, text, trailing)
}
