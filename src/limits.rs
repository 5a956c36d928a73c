//! Resource-limit configuration
//!
//! Bounds enforced before and during a parse: token count, buffer size and
//! nesting depth fail warehouse construction; the timeout budgets bound the
//! dispatch pass. No canonical values exist for these bounds, so all of
//! them are configurable with conservative defaults.

use std::time::Duration;

/// Recognized resource-limit options
///
/// Deserializable from configuration files; every field falls back to its
/// default when absent, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum number of tokens accepted from the tokenizer
    pub max_tokens: usize,
    /// Maximum size of the normalized source buffer in bytes
    pub max_bytes: usize,
    /// Maximum structural nesting depth of open tokens
    pub max_nesting: usize,
    /// Soft budget for a single collector invocation, in seconds.
    /// Enforcement is cooperative: an overrun is detected after the
    /// invocation returns and recorded as a collector failure.
    pub per_collector_timeout_seconds: Option<f64>,
    /// Wall-clock budget for the whole dispatch pass, in seconds
    pub total_timeout_seconds: Option<f64>,
    /// Promote the first collector failure to a fatal dispatch error
    pub raise_on_collector_error: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        ResourceLimits {
            max_tokens: 1_000_000,
            max_bytes: 16 * 1024 * 1024,
            max_nesting: 128,
            per_collector_timeout_seconds: None,
            total_timeout_seconds: None,
            raise_on_collector_error: false,
        }
    }
}

impl ResourceLimits {
    /// The total dispatch budget as a `Duration`, if one is configured
    pub fn total_timeout(&self) -> Option<Duration> {
        seconds_to_duration(self.total_timeout_seconds)
    }

    /// The per-invocation budget as a `Duration`, if one is configured
    pub fn per_collector_timeout(&self) -> Option<Duration> {
        seconds_to_duration(self.per_collector_timeout_seconds)
    }
}

/// Non-finite and non-positive budgets are treated as "no budget"
fn seconds_to_duration(seconds: Option<f64>) -> Option<Duration> {
    match seconds {
        Some(s) if s.is_finite() && s > 0.0 => Some(Duration::from_secs_f64(s)),
        _ => None,
    }
}
