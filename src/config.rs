//! Defaults for waits, retries, and page sizes.
//!
//! Providers usually receive these as part of their configuration block. Every
//! field is optional; missing fields take the defaults below.
//!
//! ```
//! use provider_waiters::config::WaiterConfig;
//! use serde_json::json;
//!
//! let config = WaiterConfig::from_json(json!({"timeout_secs": 900})).unwrap();
//! assert_eq!(config.timeout_secs, 900);
//! assert_eq!(config.page_size, 50);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::pager::Pagination;
use crate::poller::PollSpec;
use crate::retry::RetryPolicy;
use crate::status::Status;

/// Tunables shared by every wait, retry, and listing a provider performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaiterConfig {
    /// Seconds between describe calls.
    pub poll_interval_secs: u64,
    /// Seconds before a wait times out.
    pub timeout_secs: u64,
    /// Seconds to wait before the first describe call.
    pub delay_secs: u64,
    /// Items requested per page.
    pub page_size: u32,
    /// Seconds before an SDK call stops being retried.
    pub retry_timeout_secs: u64,
    /// Milliseconds to wait after the first retryable failure.
    pub retry_initial_wait_ms: u64,
    /// Milliseconds added to the wait after each further failure.
    pub retry_increment_ms: u64,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            timeout_secs: 600,
            delay_secs: 0,
            page_size: 50,
            retry_timeout_secs: 300,
            retry_initial_wait_ms: 3000,
            retry_increment_ms: 5000,
        }
    }
}

impl WaiterConfig {
    /// Parse and validate a configuration block. `null` yields the defaults.
    pub fn from_json(value: Value) -> Result<Self, Error> {
        let config: Self = if value.is_null() {
            Self::default()
        } else {
            serde_json::from_value(value)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that intervals, timeouts, and page sizes are usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.poll_interval_secs == 0 {
            return Err(Error::Configuration(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(Error::Configuration(
                "page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// A poll spec for `goal_states` using these timings.
    pub fn poll_spec<S: Status>(&self, goal_states: impl IntoIterator<Item = S>) -> PollSpec<S> {
        PollSpec::new(goal_states)
            .with_interval(Duration::from_secs(self.poll_interval_secs))
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_delay(Duration::from_secs(self.delay_secs))
    }

    /// A deletion-wait spec using these timings.
    pub fn absent_spec<S: Status>(&self) -> PollSpec<S> {
        PollSpec {
            until_absent: true,
            ..self.poll_spec(Vec::new())
        }
    }

    /// The retry policy for SDK calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.retry_timeout_secs),
            initial_wait: Duration::from_millis(self.retry_initial_wait_ms),
            increment: Duration::from_millis(self.retry_increment_ms),
        }
    }

    /// Counted pagination with the configured page size.
    pub fn page_number(&self) -> Pagination {
        Pagination::PageNumber {
            page_size: self.page_size,
        }
    }

    /// Token pagination with the configured page size.
    pub fn next_token(&self) -> Pagination {
        Pagination::NextToken {
            max_results: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = WaiterConfig::from_json(Value::Null).unwrap();
        assert_eq!(config, WaiterConfig::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.page_number(), Pagination::PageNumber { page_size: 50 });
    }

    #[test]
    fn test_partial_override() {
        let config =
            WaiterConfig::from_json(json!({"poll_interval_secs": 2, "page_size": 100})).unwrap();
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(config.next_token(), Pagination::NextToken { max_results: 100 });

        let spec = config.poll_spec(["Available".to_string()]);
        assert_eq!(spec.interval, Duration::from_secs(2));
        assert_eq!(spec.timeout, Duration::from_secs(600));
        assert!(!spec.until_absent);

        let spec: PollSpec<String> = config.absent_spec();
        assert!(spec.until_absent);
        assert!(spec.goal_states.is_empty());
    }

    #[test]
    fn test_rejects_zero_values() {
        for field in ["poll_interval_secs", "timeout_secs", "page_size"] {
            let err = WaiterConfig::from_json(json!({ field: 0 })).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{}", field);
        }
    }

    #[test]
    fn test_rejects_wrong_types() {
        let err = WaiterConfig::from_json(json!({"timeout_secs": "ten"})).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
