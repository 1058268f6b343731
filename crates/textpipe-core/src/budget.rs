use serde::{Deserialize, Serialize};

use crate::tokenizer::TokenizerAdapter;

/// Default per-request token ceiling.
pub const DEFAULT_TOKEN_CEILING: usize = 200_000;

const fn default_warn_fraction() -> f64 {
    0.8
}

const fn default_severe_fraction() -> f64 {
    0.9
}

/// Ceiling and warning thresholds used by the budget guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPolicy {
    /// Hard maximum token count per request.
    pub ceiling: usize,
    /// Fraction of the ceiling at which a soft warning starts.
    #[serde(default = "default_warn_fraction")]
    pub warn_fraction: f64,
    /// Fraction of the ceiling at which the severe warning starts.
    #[serde(default = "default_severe_fraction")]
    pub severe_fraction: f64,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self::with_ceiling(DEFAULT_TOKEN_CEILING)
    }
}

impl BudgetPolicy {
    pub fn with_ceiling(ceiling: usize) -> Self {
        Self {
            ceiling,
            warn_fraction: default_warn_fraction(),
            severe_fraction: default_severe_fraction(),
        }
    }

    /// Overrides both warning fractions. Values outside `(0, 1]` fall back to defaults.
    pub fn with_fractions(mut self, warn: f64, severe: f64) -> Self {
        self.warn_fraction = sanitize_fraction(warn, default_warn_fraction());
        self.severe_fraction = sanitize_fraction(severe, default_severe_fraction());
        self
    }

    fn threshold(&self, fraction: f64) -> f64 {
        self.ceiling as f64 * fraction
    }

    /// Classifies a token count against this policy.
    pub fn evaluate_count(&self, count: usize) -> BudgetEvaluation {
        let value = count as f64;
        BudgetEvaluation {
            count,
            ceiling: self.ceiling,
            admitted: count <= self.ceiling,
            warn: value >= self.threshold(self.warn_fraction),
            severe: value >= self.threshold(self.severe_fraction),
        }
    }
}

fn sanitize_fraction(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        value
    } else {
        fallback
    }
}

/// Coarse display level of a budget evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLevel {
    Normal,
    Warning,
    Severe,
    Exceeded,
}

/// Result of checking one payload against the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEvaluation {
    pub count: usize,
    pub ceiling: usize,
    /// `count <= ceiling`.
    pub admitted: bool,
    pub warn: bool,
    pub severe: bool,
}

impl BudgetEvaluation {
    pub fn level(&self) -> BudgetLevel {
        if !self.admitted {
            BudgetLevel::Exceeded
        } else if self.severe {
            BudgetLevel::Severe
        } else if self.warn {
            BudgetLevel::Warning
        } else {
            BudgetLevel::Normal
        }
    }

    /// Tokens left before the ceiling (zero when over).
    pub fn remaining(&self) -> usize {
        self.ceiling.saturating_sub(self.count)
    }
}

/// Counts payload tokens and applies a [`BudgetPolicy`].
#[derive(Clone)]
pub struct BudgetGuard {
    tokenizer: TokenizerAdapter,
    policy: BudgetPolicy,
}

impl BudgetGuard {
    pub fn new(tokenizer: TokenizerAdapter, policy: BudgetPolicy) -> Self {
        Self { tokenizer, policy }
    }

    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    pub fn count(&self, payload: &str) -> usize {
        self.tokenizer.count(payload)
    }

    pub fn evaluate(&self, payload: &str) -> BudgetEvaluation {
        self.policy.evaluate_count(self.count(payload))
    }
}
