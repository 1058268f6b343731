use std::time::Duration;

/// Reason a submission cannot start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitBlocker {
    /// One or more credential fields are blank.
    #[error("credentials are incomplete")]
    MissingCredentials,
    /// Primary text is blank and no files are attached.
    #[error("no text or files to process")]
    EmptyInput,
    /// Token estimate is above the ceiling.
    #[error("token estimate {count} exceeds ceiling {ceiling}")]
    OverBudget { count: usize, ceiling: usize },
    /// Attached files are still being decoded.
    #[error("file decoding is still in progress")]
    DecodingInFlight,
    /// Another submission has not finished yet.
    #[error("a submission is already in flight")]
    InFlight,
}

/// Errors produced while turning one file handle into text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileDecodeError {
    /// Reading the underlying bytes failed.
    #[error("failed to read {name}: {message}")]
    Read { name: String, message: String },
}

impl FileDecodeError {
    /// Returns the file name the error belongs to.
    pub fn file_name(&self) -> &str {
        match self {
            Self::Read { name, .. } => name,
        }
    }
}

/// Failure raised by a token counter implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tokenizer error: {0}")]
pub struct TokenizerError(pub String);

/// Credential store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("credential store I/O failed ({path}): {message}")]
    Io { path: String, message: String },
    #[error("credential store is corrupt ({path}): {message}")]
    Corrupt { path: String, message: String },
    #[error("no configuration directory available for the credential store")]
    NoConfigDir,
}

/// Top-level error type for the processing API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// Invalid processor or client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Submission preconditions are not met.
    #[error("submission blocked: {0}")]
    Blocked(SubmitBlocker),
    /// An edit would push the token estimate over the ceiling.
    #[error("token budget exceeded: {count} of {ceiling}")]
    BudgetExceeded { count: usize, ceiling: usize },
    /// Session inputs cannot change while a submission is running.
    #[error("session is busy with a submission")]
    Busy,
    /// Session holds a result that must be reset before editing.
    #[error("session holds a result; reset before editing")]
    ResultPending,
    /// File index does not exist in the session.
    #[error("no file at index {index} (session has {len})")]
    FileIndex { index: usize, len: usize },
    /// Remote endpoint answered with a non-success status.
    #[error("endpoint returned status {status}: {message}")]
    Http { status: u16, message: String },
    /// Request could not be sent or the response body could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// Request exceeded the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl ProcessError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns the HTTP status code when the endpoint rejected the request.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<SubmitBlocker> for ProcessError {
    fn from(value: SubmitBlocker) -> Self {
        ProcessError::Blocked(value)
    }
}
