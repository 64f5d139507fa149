//! Per-query configuration
//!
//! [`QueryOptions`] holds optional overrides. A device keeps one set of
//! defaults and every call may pass another; the two are merged field by
//! field and resolved into a [`QueryConfig`] before the query runs.

use serde::{Deserialize, Serialize};
use smartmeter_core::Verbosity;
use std::time::Duration;

/// Retries after a retryable failure, unless overridden
pub const DEFAULT_RETRY: u32 = 0;

/// Pause before re-sending a command, unless overridden
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Time allowed for one attempt to reach a terminal line, unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Optional per-query overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Number of re-sends allowed after retryable failures
    pub retry: Option<u32>,
    /// Pause between attempts (milliseconds when serialized)
    #[serde(with = "millis")]
    pub retry_interval: Option<Duration>,
    /// Budget for one attempt (milliseconds when serialized)
    #[serde(with = "millis")]
    pub timeout: Option<Duration>,
    pub verbosity: Option<Verbosity>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry(mut self, count: u32) -> Self {
        self.retry = Some(count);
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Layer `overrides` on top of `self`; fields set in `overrides` win
    pub fn merge(&self, overrides: &QueryOptions) -> QueryOptions {
        QueryOptions {
            retry: overrides.retry.or(self.retry),
            retry_interval: overrides.retry_interval.or(self.retry_interval),
            timeout: overrides.timeout.or(self.timeout),
            verbosity: overrides.verbosity.or(self.verbosity),
        }
    }

    /// Fill unset fields with the defaults
    pub fn resolve(&self) -> QueryConfig {
        QueryConfig {
            retry: self.retry.unwrap_or(DEFAULT_RETRY),
            retry_interval: self.retry_interval.unwrap_or(DEFAULT_RETRY_INTERVAL),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            verbosity: self.verbosity.unwrap_or_default(),
        }
    }
}

/// Fully resolved settings of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    pub retry: u32,
    pub retry_interval: Duration,
    pub timeout: Duration,
    pub verbosity: Verbosity,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryOptions::default().resolve()
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
