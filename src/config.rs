use std::env;
use std::time::Duration;

use crate::error::{Result, StudioError};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub overload_probability: f64,
    pub history_capacity: usize,
    pub list_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    pub retry: RetryPolicy,
    pub backend: BackendConfig,
    pub history_limit: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_retries = env_parse("GENSTUDIO_MAX_RETRIES").unwrap_or(defaults.max_retries);
        let base_backoff = env_parse("GENSTUDIO_BACKOFF_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.base_backoff);

        RetryPolicy {
            max_retries,
            base_backoff,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    /// Delay to wait after `attempt` failed transiently, before the next one.
    /// Grows linearly: `base * attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(attempt)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(2000),
            overload_probability: 0.2,
            history_capacity: 10,
            list_delay: Duration::from_millis(700),
        }
    }
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let min_delay = env_parse("GENSTUDIO_MIN_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.min_delay);
        let max_delay = env_parse("GENSTUDIO_MAX_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_delay);
        let overload_probability = env_parse("GENSTUDIO_OVERLOAD_PROBABILITY")
            .unwrap_or(defaults.overload_probability);
        let history_capacity =
            env_parse("GENSTUDIO_HISTORY_CAPACITY").unwrap_or(defaults.history_capacity);

        BackendConfig {
            min_delay,
            max_delay,
            overload_probability,
            history_capacity,
            list_delay: defaults.list_delay,
        }
    }

    pub fn with_delay_range(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_overload_probability(mut self, probability: f64) -> Self {
        self.overload_probability = probability;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_list_delay(mut self, list_delay: Duration) -> Self {
        self.list_delay = list_delay;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_delay > self.max_delay {
            return Err(StudioError::ConfigError(format!(
                "min delay {}ms exceeds max delay {}ms",
                self.min_delay.as_millis(),
                self.max_delay.as_millis()
            )));
        }
        if !(0.0..=1.0).contains(&self.overload_probability) {
            return Err(StudioError::ConfigError(format!(
                "overload probability {} is outside [0, 1]",
                self.overload_probability
            )));
        }
        if self.history_capacity == 0 {
            return Err(StudioError::ConfigError(
                "history capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            retry: RetryPolicy::default(),
            backend: BackendConfig::default(),
            history_limit: 5,
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let history_limit = env_parse("GENSTUDIO_HISTORY_LIMIT").unwrap_or(5);

        StudioConfig {
            retry: RetryPolicy::from_env(),
            backend: BackendConfig::from_env(),
            history_limit,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse().ok())
}
