//! Common imports for driving a processing session.
pub use crate::{
    BudgetEvaluation, CredentialSet, CredentialStore, FileCredentialStore, FileHandle,
    Notification, NotificationSink, ProcessError, ProcessingResult, ProcessingState, Processor,
    ProcessorConfig, ResultArtifact, SubmitBlocker, SubmitOutcome,
};
