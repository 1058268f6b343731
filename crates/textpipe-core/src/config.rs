use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::budget::BudgetPolicy;

const fn default_decode_concurrency() -> usize {
    8
}

/// Processor behaviour options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Token ceiling and warning thresholds.
    #[serde(default)]
    pub budget: BudgetPolicy,
    /// Optional per-request timeout. `None` waits for the endpoint indefinitely.
    #[serde(default)]
    pub request_timeout: Option<Duration>,
    /// Maximum number of files decoded at the same time.
    #[serde(default = "default_decode_concurrency")]
    pub decode_concurrency: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            budget: BudgetPolicy::default(),
            request_timeout: None,
            decode_concurrency: default_decode_concurrency(),
        }
    }
}

impl ProcessorConfig {
    pub fn token_ceiling(mut self, ceiling: usize) -> Self {
        self.budget.ceiling = ceiling;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn decode_concurrency(mut self, concurrency: usize) -> Self {
        self.decode_concurrency = concurrency.max(1);
        self
    }

    /// Builds a config from defaults overridden by environment variables.
    ///
    /// Environment variables:
    /// - `TEXTPIPE_TOKEN_CEILING`: hard token ceiling (default 200000).
    /// - `TEXTPIPE_WARN_FRACTION` / `TEXTPIPE_SEVERE_FRACTION`: warning thresholds in `(0, 1]`.
    /// - `TEXTPIPE_REQUEST_TIMEOUT_SECS`: optional request timeout; unset or `0` disables it.
    /// - `TEXTPIPE_DECODE_CONCURRENCY`: parallel file decodes (default 8).
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ceiling) = parse_var::<usize>(&lookup, "TEXTPIPE_TOKEN_CEILING") {
            config.budget.ceiling = ceiling;
        }
        let warn_fraction = parse_var::<f64>(&lookup, "TEXTPIPE_WARN_FRACTION")
            .unwrap_or(config.budget.warn_fraction);
        let severe_fraction = parse_var::<f64>(&lookup, "TEXTPIPE_SEVERE_FRACTION")
            .unwrap_or(config.budget.severe_fraction);
        config.budget = config.budget.with_fractions(warn_fraction, severe_fraction);
        if let Some(secs) = parse_var::<u64>(&lookup, "TEXTPIPE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(n) = parse_var::<usize>(&lookup, "TEXTPIPE_DECODE_CONCURRENCY") {
            config.decode_concurrency = n.max(1);
        }
        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(event = "config.invalid_env", domain = "config", key, value = trimmed);
            None
        }
    }
}
