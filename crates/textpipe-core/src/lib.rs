//! Text aggregation, token budgeting and one-shot submission to an Azure
//! OpenAI Responses deployment.
//!
//! A [`Processor`] holds one session: primary text plus an ordered list of
//! attached files. The same canonical payload drives both the live token
//! estimate and the request body.
//!
//! ```no_run
//! use textpipe_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ProcessError> {
//! let processor = Processor::builder()
//!     .credentials(CredentialSet::new("https://my-resource.openai.azure.com", "api-key"))
//!     .build()?;
//!
//! processor.set_primary_text("Summarize the attached notes.")?;
//! processor
//!     .add_files(vec![FileHandle::from_path("notes.txt")])
//!     .await?;
//!
//! if let SubmitOutcome::Succeeded(text) = processor.submit().await? {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

/// Payload construction from primary text and decoded files.
pub mod aggregate;
/// Token ceiling policy and evaluation.
pub mod budget;
/// Responses API client contract and the `reqwest` implementation.
pub mod client;
/// Processor configuration.
pub mod config;
/// Endpoint credentials and their persistence.
pub mod credentials;
/// Response envelope parsing.
pub mod envelope;
/// Public error types.
pub mod errors;
/// Result download artifacts.
pub mod export;
/// Concurrent file decoding.
pub mod loader;
/// User-facing notifications.
pub mod notify;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Session state and submission.
pub mod processor;
/// Token counting.
pub mod tokenizer;

pub use aggregate::{DecodedFile, aggregate};
pub use budget::{
    BudgetEvaluation, BudgetGuard, BudgetLevel, BudgetPolicy, DEFAULT_TOKEN_CEILING,
};
pub use client::{AzureResponsesClient, ResponsesClient, ResponsesRequest};
pub use config::ProcessorConfig;
pub use credentials::{
    CredentialSet, CredentialStore, FileCredentialStore, MemoryCredentialStore,
};
pub use errors::{FileDecodeError, ProcessError, StoreError, SubmitBlocker, TokenizerError};
pub use export::ResultArtifact;
pub use loader::{FileHandle, FileTextLoader, LoadReport};
pub use notify::{Notification, NotificationLog, NotificationSink, Severity, TracingSink};
pub use observability::init_observability;
pub use processor::{
    FAILURE_MESSAGE, ProcessingResult, ProcessingState, Processor, ProcessorBuilder, SubmitOutcome,
};
pub use tokenizer::{TokenCounter, TokenizerAdapter};
