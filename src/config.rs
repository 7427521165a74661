//! Configuration for a boosted batch.

use crate::error::BoostError;
use std::time::Duration;

/// How a non-200 status code is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Every non-200 status is retried.
    RetryAll,
    /// Only 408, 425, 429 and 5xx are retried; any other non-200 status
    /// resolves the task as rejected.
    RetryTransient,
}

impl StatusPolicy {
    /// Returns `true` if a response with this status should be retried.
    pub fn is_retryable(&self, status: u16) -> bool {
        match self {
            StatusPolicy::RetryAll => true,
            StatusPolicy::RetryTransient => {
                matches!(status, 408 | 425 | 429) || (500..600).contains(&status)
            }
        }
    }
}

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct BoostConfig {
    /// Upper bound on parallel workers.
    pub worker_count: usize,
    /// Maximum number of attempts per task.
    pub max_tries: u32,
    /// Timeout for a single attempt.
    pub timeout: Duration,
    /// Report progress through the log.
    pub verbose: bool,
    /// Decode successful HTTP bodies as JSON.
    pub parse_json: bool,
    /// Classification of non-200 statuses.
    pub status_policy: StatusPolicy,
    /// Optional limit on attempts per second across all workers.
    pub max_requests_per_second: Option<f64>,
}

impl BoostConfig {
    /// Create a new configuration builder.
    pub fn builder() -> BoostConfigBuilder {
        BoostConfigBuilder::new()
    }

    /// Check that every value is usable before any work starts.
    pub fn validate(&self) -> Result<(), BoostError> {
        if self.worker_count == 0 {
            return Err(BoostError::InvalidConfig("worker_count must be at least 1".into()));
        }
        if self.max_tries == 0 {
            return Err(BoostError::InvalidConfig("max_tries must be at least 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(BoostError::InvalidConfig("timeout must be greater than zero".into()));
        }
        if let Some(rps) = self.max_requests_per_second {
            if !rps.is_finite() || rps <= 0.0 {
                return Err(BoostError::InvalidConfig(format!(
                    "max_requests_per_second must be positive, got {}",
                    rps
                )));
            }
            if rps < 1.0 && Duration::try_from_secs_f64(1.0 / rps).is_err() {
                return Err(BoostError::InvalidConfig(format!(
                    "max_requests_per_second {} is too small to schedule",
                    rps
                )));
            }
        }
        Ok(())
    }
}

impl Default for BoostConfig {
    fn default() -> Self {
        BoostConfigBuilder::new().build()
    }
}

/// Builder for `BoostConfig`.
pub struct BoostConfigBuilder {
    worker_count: Option<usize>,
    max_tries: Option<u32>,
    timeout: Option<Duration>,
    verbose: Option<bool>,
    parse_json: Option<bool>,
    status_policy: Option<StatusPolicy>,
    max_requests_per_second: Option<f64>,
}

impl BoostConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            worker_count: None,
            max_tries: None,
            timeout: None,
            verbose: None,
            parse_json: None,
            status_policy: None,
            max_requests_per_second: None,
        }
    }

    /// Set the maximum number of parallel workers.
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Set the maximum number of attempts per task.
    pub fn max_tries(mut self, tries: u32) -> Self {
        self.max_tries = Some(tries);
        self
    }

    /// Set the timeout applied to every attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable or disable progress reporting.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Enable or disable JSON decoding of successful HTTP bodies.
    pub fn parse_json(mut self, parse: bool) -> Self {
        self.parse_json = Some(parse);
        self
    }

    /// Set how non-200 statuses are classified.
    pub fn status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = Some(policy);
        self
    }

    /// Limit the number of attempts started per second across all workers.
    pub fn max_requests_per_second(mut self, rps: f64) -> Self {
        self.max_requests_per_second = Some(rps);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> BoostConfig {
        BoostConfig {
            worker_count: self.worker_count.unwrap_or(32),
            max_tries: self.max_tries.unwrap_or(5),
            timeout: self.timeout.unwrap_or(Duration::from_secs(10)),
            verbose: self.verbose.unwrap_or(true),
            parse_json: self.parse_json.unwrap_or(true),
            status_policy: self.status_policy.unwrap_or(StatusPolicy::RetryAll),
            max_requests_per_second: self.max_requests_per_second,
        }
    }
}

impl Default for BoostConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = BoostConfig::default();
        assert_eq!(config.worker_count, 32);
        assert_eq!(config.max_tries, 5);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.verbose);
        assert!(config.parse_json);
        assert_eq!(config.status_policy, StatusPolicy::RetryAll);
        assert!(config.max_requests_per_second.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        let zero_workers = BoostConfig::builder().worker_count(0).build();
        assert!(matches!(zero_workers.validate(), Err(BoostError::InvalidConfig(_))));

        let zero_tries = BoostConfig::builder().max_tries(0).build();
        assert!(matches!(zero_tries.validate(), Err(BoostError::InvalidConfig(_))));

        let zero_timeout = BoostConfig::builder().timeout(Duration::ZERO).build();
        assert!(matches!(zero_timeout.validate(), Err(BoostError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_bad_rate_limit() {
        for rps in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = BoostConfig::builder().max_requests_per_second(rps).build();
            assert!(config.validate().is_err(), "rate {} accepted", rps);
        }
    }

    #[test]
    fn rejects_rate_limit_with_unrepresentable_period() {
        let config = BoostConfig::builder().max_requests_per_second(1e-20).build();
        assert!(matches!(config.validate(), Err(BoostError::InvalidConfig(_))));

        let slow = BoostConfig::builder().max_requests_per_second(0.01).build();
        assert!(slow.validate().is_ok());
    }

    #[test]
    fn retry_transient_only_retries_transient_statuses() {
        let policy = StatusPolicy::RetryTransient;
        assert!(policy.is_retryable(503));
        assert!(policy.is_retryable(429));
        assert!(policy.is_retryable(408));
        assert!(!policy.is_retryable(404));
        assert!(!policy.is_retryable(401));
        assert!(StatusPolicy::RetryAll.is_retryable(404));
    }
}
