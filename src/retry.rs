use std::time::Duration;

/// Retry budget and exponential backoff for one provider in the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts per provider (including the first one)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles the delay each time)
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    /// Set the maximum delay between retries
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Preset: public translation endpoints (3 attempts per provider)
    /// Delays: 1s, 2s = 3s worst-case wait per provider
    pub fn provider_call() -> Self {
        Self::new(3, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(2.0)
    }

    /// Delay to wait before the given attempt (0-indexed).
    ///
    /// The first attempt never waits; attempt `n` waits
    /// `initial_delay * backoff_multiplier^(n-1)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        // `as` saturates, so an infinite product lands on u64::MAX before the cap
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }

    /// Worst-case time spent sleeping while one provider burns its budget.
    pub fn total_delay(&self) -> Duration {
        (0..self.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::provider_call()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ==================== Builder Tests ====================

    #[test]
    fn test_retry_config_new_sets_defaults() {
        let config = RetryConfig::new(5, Duration::from_millis(100));

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(30)); // default
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON); // default
    }

    #[test]
    fn test_retry_config_builder_pattern() {
        let config = RetryConfig::new(2, Duration::from_millis(50))
            .with_max_delay(Duration::from_secs(10))
            .with_backoff_multiplier(1.5);

        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.initial_delay, Duration::from_millis(50));
        assert_eq!(config.max_delay, Duration::from_secs(10));
        assert!((config.backoff_multiplier - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retry_config_provider_call_preset() {
        let config = RetryConfig::provider_call();

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(5));
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_is_provider_call() {
        assert_eq!(RetryConfig::default(), RetryConfig::provider_call());
    }

    // ==================== Delay Calculation Tests ====================

    #[test]
    fn test_delay_first_attempt_always_zero() {
        let configs = vec![
            RetryConfig::provider_call(),
            RetryConfig::new(10, Duration::from_secs(5)),
            RetryConfig::new(1, Duration::from_millis(1)),
        ];

        for config in configs {
            assert_eq!(
                config.delay_for_attempt(0),
                Duration::ZERO,
                "First attempt should always have zero delay"
            );
        }
    }

    #[test]
    fn test_delay_calculation_with_multiplier_1() {
        let config = RetryConfig::new(5, Duration::from_secs(1)).with_backoff_multiplier(1.0);

        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_calculation_with_multiplier_3() {
        let config = RetryConfig::new(5, Duration::from_millis(100))
            .with_backoff_multiplier(3.0)
            .with_max_delay(Duration::from_secs(60));

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100)); // 100ms * 3^0
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(300)); // 100ms * 3^1
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(900)); // 100ms * 3^2
    }

    #[test]
    fn test_delay_max_capping_strict() {
        let config = RetryConfig::new(10, Duration::from_secs(2))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(2.0);

        // attempt 1: 2s, attempt 2: 4s, attempt 3: 8s (capped to 5s)
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(9), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_huge_attempt_does_not_overflow() {
        let config = RetryConfig::new(u32::MAX, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(7));
        assert_eq!(config.delay_for_attempt(5000), Duration::from_secs(7));
    }

    #[test]
    fn test_total_delay_provider_call() {
        // 0 + 1s + 2s
        assert_eq!(
            RetryConfig::provider_call().total_delay(),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_total_delay_single_attempt_is_zero() {
        let config = RetryConfig::new(1, Duration::from_secs(10));
        assert_eq!(config.total_delay(), Duration::ZERO);
    }

    // ==================== Properties ====================

    proptest! {
        #[test]
        fn prop_delay_never_exceeds_cap(
            initial_ms in 0u64..10_000,
            cap_ms in 0u64..60_000,
            multiplier in 1.0f64..8.0,
            attempt in 0u32..64,
        ) {
            let config = RetryConfig::new(64, Duration::from_millis(initial_ms))
                .with_max_delay(Duration::from_millis(cap_ms))
                .with_backoff_multiplier(multiplier);
            prop_assert!(config.delay_for_attempt(attempt) <= Duration::from_millis(cap_ms));
        }

        #[test]
        fn prop_delay_is_monotonic_for_growing_multiplier(
            initial_ms in 1u64..1_000,
            multiplier in 1.0f64..4.0,
            attempt in 1u32..30,
        ) {
            let config = RetryConfig::new(64, Duration::from_millis(initial_ms))
                .with_max_delay(Duration::from_secs(3600))
                .with_backoff_multiplier(multiplier);
            prop_assert!(config.delay_for_attempt(attempt) <= config.delay_for_attempt(attempt + 1));
        }
    }
}
