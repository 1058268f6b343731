//! Token counting behind a small trait so the budget guard never depends on a
//! specific BPE implementation.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::errors::TokenizerError;

/// Counts tokens in a string.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;
}

/// `cl100k_base` counter backed by `tiktoken-rs`.
///
/// The BPE tables are built on first use and shared for the lifetime of the
/// counter. An initialisation failure is remembered and reported on every call.
#[derive(Default)]
pub struct TikTokenCounter {
    bpe: OnceCell<Result<CoreBPE, String>>,
}

impl TikTokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn bpe(&self) -> Result<&CoreBPE, TokenizerError> {
        self.bpe
            .get_or_init(|| tiktoken_rs::cl100k_base().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|message| TokenizerError(format!("cl100k_base unavailable: {message}")))
    }
}

impl TokenCounter for TikTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.bpe()?.encode_with_special_tokens(text).len())
    }
}

/// Counts whitespace-separated words. Cheap and strictly additive.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.split_whitespace().count())
    }
}

/// Infallible facade over a [`TokenCounter`].
///
/// Counting failures (errors or panics inside the counter) are logged and
/// reported as zero tokens so that a broken tokenizer never locks the user
/// out of the session.
#[derive(Clone)]
pub struct TokenizerAdapter {
    counter: Arc<dyn TokenCounter>,
}

impl TokenizerAdapter {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }

    /// Adapter over the default `cl100k_base` counter.
    pub fn tiktoken() -> Self {
        Self::new(Arc::new(TikTokenCounter::new()))
    }

    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let counter = &self.counter;
        match catch_unwind(AssertUnwindSafe(|| counter.count_tokens(text))) {
            Ok(Ok(count)) => count,
            Ok(Err(err)) => {
                warn!(
                    event = "tokenizer.count_failed",
                    domain = "budget",
                    text_len = text.len() as u64,
                    error = %err,
                    "token count failed; reporting zero"
                );
                0
            }
            Err(_) => {
                warn!(
                    event = "tokenizer.count_panicked",
                    domain = "budget",
                    text_len = text.len() as u64,
                    "token counter panicked; reporting zero"
                );
                0
            }
        }
    }
}

impl Default for TokenizerAdapter {
    fn default() -> Self {
        Self::tiktoken()
    }
}
