//! Session state and the submission state machine.
//!
//! A [`Processor`] owns one session: the primary text, the ordered attached
//! files, their decoded contents, and the processing state. Every mutating
//! operation recomputes the budget evaluation from the canonical payload.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, error, info};

use crate::aggregate::{DecodedFile, aggregate};
use crate::budget::{BudgetEvaluation, BudgetGuard};
use crate::client::{AzureResponsesClient, ResponsesClient, ResponsesRequest};
use crate::config::ProcessorConfig;
use crate::credentials::CredentialSet;
use crate::envelope;
use crate::errors::{ProcessError, SubmitBlocker};
use crate::export::ResultArtifact;
use crate::loader::{FileDecodeFailure, FileHandle, FileTextLoader, LoadReport};
use crate::notify::{Notification, NotificationSink, TracingSink};
use crate::tokenizer::TokenizerAdapter;

/// Message shown for any failed submission. Status codes are only logged.
pub const FAILURE_MESSAGE: &str = "An error occurred while processing your request. Please check your configuration and try again.";

/// Where the session is in its request lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Submitting,
    Succeeded {
        text: String,
    },
    Failed {
        message: String,
    },
}

/// The single visible outcome of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingResult {
    None,
    Success(String),
    Failure(String),
}

/// What a call to [`Processor::submit`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another submission was already in flight; nothing was sent.
    Ignored,
    Succeeded(String),
    Failed(String),
}

struct SessionState {
    primary_text: String,
    files: Vec<FileHandle>,
    file_revision: u64,
    decoded: Vec<DecodedFile>,
    decoded_revision: u64,
    decode_failures: Vec<FileDecodeFailure>,
    budget: BudgetEvaluation,
    state: ProcessingState,
}

impl SessionState {
    fn new(budget: BudgetEvaluation) -> Self {
        Self {
            primary_text: String::new(),
            files: Vec::new(),
            file_revision: 0,
            decoded: Vec::new(),
            decoded_revision: 0,
            decode_failures: Vec::new(),
            budget,
            state: ProcessingState::Idle,
        }
    }

    fn decoding(&self) -> bool {
        self.decoded_revision != self.file_revision
    }

    fn payload(&self) -> String {
        aggregate(&self.primary_text, &self.decoded)
    }

    fn has_content(&self) -> bool {
        !self.primary_text.trim().is_empty() || !self.files.is_empty()
    }

    fn ensure_editable(&self) -> Result<(), ProcessError> {
        match self.state {
            ProcessingState::Submitting => Err(ProcessError::Busy),
            ProcessingState::Succeeded { .. } => Err(ProcessError::ResultPending),
            ProcessingState::Idle | ProcessingState::Failed { .. } => Ok(()),
        }
    }

    /// Editing after a failure starts a fresh attempt.
    fn touch(&mut self) {
        if matches!(self.state, ProcessingState::Failed { .. }) {
            self.state = ProcessingState::Idle;
        }
    }

    fn blocker(&self, credentials: Option<&CredentialSet>) -> Option<SubmitBlocker> {
        if self.state == ProcessingState::Submitting {
            return Some(SubmitBlocker::InFlight);
        }
        if !credentials.is_some_and(CredentialSet::is_complete) {
            return Some(SubmitBlocker::MissingCredentials);
        }
        if !self.has_content() {
            return Some(SubmitBlocker::EmptyInput);
        }
        if self.decoding() {
            return Some(SubmitBlocker::DecodingInFlight);
        }
        if !self.budget.admitted {
            return Some(SubmitBlocker::OverBudget {
                count: self.budget.count,
                ceiling: self.budget.ceiling,
            });
        }
        None
    }
}

struct ProcessorInner {
    session_id: uuid::Uuid,
    config: ProcessorConfig,
    guard: BudgetGuard,
    loader: FileTextLoader,
    client: Arc<dyn ResponsesClient>,
    notifier: Arc<dyn NotificationSink>,
    credentials: RwLock<Option<CredentialSet>>,
    session: Mutex<SessionState>,
}

/// Entry point for editing a session and submitting it.
///
/// Cloning is cheap; all clones share the same session.
#[derive(Clone)]
pub struct Processor {
    inner: Arc<ProcessorInner>,
}

impl Processor {
    pub fn builder() -> ProcessorBuilder {
        ProcessorBuilder::default()
    }

    fn session(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(|p| p.into_inner())
    }

    fn notify(&self, notification: Notification) {
        self.inner.notifier.notify(notification);
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.inner.session_id
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.inner.config
    }

    /// Replaces the credentials. An in-flight request keeps the set it started with.
    pub fn set_credentials(&self, credentials: Option<CredentialSet>) {
        *self
            .inner
            .credentials
            .write()
            .unwrap_or_else(|p| p.into_inner()) = credentials;
    }

    pub fn credentials(&self) -> Option<CredentialSet> {
        self.inner
            .credentials
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some_and(|c| c.is_complete())
    }

    pub fn primary_text(&self) -> String {
        self.session().primary_text.clone()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.session()
            .files
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Decoded files from the most recent completed load.
    pub fn decoded_files(&self) -> Vec<DecodedFile> {
        self.session().decoded.clone()
    }

    pub fn decode_failures(&self) -> Vec<FileDecodeFailure> {
        self.session().decode_failures.clone()
    }

    /// True while the attached files have not all been decoded.
    pub fn is_decoding(&self) -> bool {
        self.session().decoding()
    }

    /// The canonical payload for the current session.
    pub fn payload(&self) -> String {
        self.session().payload()
    }

    /// Budget evaluation of the current payload.
    pub fn budget(&self) -> BudgetEvaluation {
        self.session().budget
    }

    pub fn state(&self) -> ProcessingState {
        self.session().state.clone()
    }

    pub fn result(&self) -> ProcessingResult {
        match self.state() {
            ProcessingState::Succeeded { text } => ProcessingResult::Success(text),
            ProcessingState::Failed { message } => ProcessingResult::Failure(message),
            ProcessingState::Idle | ProcessingState::Submitting => ProcessingResult::None,
        }
    }

    /// Replaces the primary text, unless the result would exceed the ceiling.
    ///
    /// An over-ceiling edit is still accepted when it lowers the estimate, so a
    /// session pushed over by its files can be trimmed back down.
    pub fn set_primary_text(
        &self,
        text: impl Into<String>,
    ) -> Result<BudgetEvaluation, ProcessError> {
        let text = text.into();
        let rejected = {
            let mut session = self.session();
            session.ensure_editable()?;
            let candidate = self
                .inner
                .guard
                .evaluate(&aggregate(&text, &session.decoded));
            if !candidate.admitted && candidate.count > session.budget.count {
                candidate
            } else {
                session.primary_text = text;
                session.budget = candidate;
                session.touch();
                return Ok(candidate);
            }
        };
        debug!(
            event = "budget.edit_rejected",
            domain = "budget",
            session_id = %self.inner.session_id,
            count = rejected.count as u64,
            ceiling = rejected.ceiling as u64
        );
        self.notify(Notification::warning(
            "Token Limit Exceeded",
            format!(
                "This edit would bring the content to {} tokens; the maximum is {}.",
                rejected.count, rejected.ceiling
            ),
        ));
        Err(ProcessError::BudgetExceeded {
            count: rejected.count,
            ceiling: rejected.ceiling,
        })
    }

    /// Appends files and decodes the new file sequence.
    pub async fn add_files(&self, files: Vec<FileHandle>) -> Result<LoadReport, ProcessError> {
        {
            let mut session = self.session();
            session.ensure_editable()?;
            session.files.extend(files);
            session.file_revision += 1;
            session.touch();
        }
        self.refresh_files().await
    }

    /// Removes the file at `index` and decodes the remaining sequence.
    pub async fn remove_file(&self, index: usize) -> Result<LoadReport, ProcessError> {
        {
            let mut session = self.session();
            session.ensure_editable()?;
            let len = session.files.len();
            if index >= len {
                return Err(ProcessError::FileIndex { index, len });
            }
            session.files.remove(index);
            session.file_revision += 1;
            session.touch();
        }
        self.refresh_files().await
    }

    /// Decodes the current file sequence if it changed since the last load.
    ///
    /// A load overtaken by a newer file change is discarded.
    pub async fn refresh_files(&self) -> Result<LoadReport, ProcessError> {
        let (revision, files) = {
            let session = self.session();
            if !session.decoding() {
                return Ok(LoadReport {
                    contents: session.decoded.iter().map(|f| f.content.clone()).collect(),
                    failures: session.decode_failures.clone(),
                });
            }
            (session.file_revision, session.files.clone())
        };

        let report = self.inner.loader.load(&files).await;

        let budget = {
            let mut session = self.session();
            if session.file_revision != revision {
                debug!(
                    event = "loader.load_superseded",
                    domain = "loader",
                    session_id = %self.inner.session_id,
                    revision,
                    current = session.file_revision
                );
                return Ok(report);
            }
            session.decoded = files
                .iter()
                .zip(&report.contents)
                .map(|(file, content)| DecodedFile::new(file.name(), content.clone()))
                .collect();
            session.decoded_revision = revision;
            session.decode_failures = report.failures.clone();
            let budget = self.inner.guard.evaluate(&session.payload());
            session.budget = budget;
            budget
        };

        info!(
            event = "loader.files_loaded",
            domain = "loader",
            session_id = %self.inner.session_id,
            files = files.len() as u64,
            failures = report.failures.len() as u64,
            tokens = budget.count as u64
        );
        for failure in &report.failures {
            self.notify(Notification::warning(
                "File Read Failed",
                format!(
                    "{} will be sent as empty text: {}",
                    failure.error.file_name(),
                    failure.error
                ),
            ));
        }
        if !budget.admitted {
            self.notify(Notification::warning(
                "Token Limit Exceeded",
                format!(
                    "Content has {} tokens; the maximum is {}. Remove files or shorten the text.",
                    budget.count, budget.ceiling
                ),
            ));
        }
        Ok(report)
    }

    /// Returns why a submission would be refused right now, if anything.
    pub fn check_submit(&self) -> Result<(), SubmitBlocker> {
        let credentials = self.credentials();
        match self.session().blocker(credentials.as_ref()) {
            Some(blocker) => Err(blocker),
            None => Ok(()),
        }
    }

    pub fn can_submit(&self) -> bool {
        self.check_submit().is_ok()
    }

    /// Sends the current payload once.
    ///
    /// Returns `Ok(SubmitOutcome::Ignored)` while another submission is in
    /// flight and `Err(ProcessError::Blocked(..))` for any other unmet
    /// precondition. The request runs to completion even if this future is
    /// dropped.
    pub async fn submit(&self) -> Result<SubmitOutcome, ProcessError> {
        let credentials = self.credentials();
        let admitted = {
            let mut session = self.session();
            match session.blocker(credentials.as_ref()) {
                Some(SubmitBlocker::InFlight) => None,
                Some(blocker) => Some(Err(blocker)),
                None => {
                    session.state = ProcessingState::Submitting;
                    Some(Ok((session.payload(), session.budget)))
                }
            }
        };

        let (payload, budget) = match admitted {
            None => {
                debug!(
                    event = "submit.ignored",
                    domain = "submit",
                    session_id = %self.inner.session_id,
                    "submission already in flight"
                );
                return Ok(SubmitOutcome::Ignored);
            }
            Some(Err(blocker)) => {
                self.notify(blocker_notification(&blocker));
                return Err(blocker.into());
            }
            Some(Ok(admitted)) => admitted,
        };
        let Some(credentials) = credentials else {
            // `blocker` already rejected missing credentials.
            return Err(SubmitBlocker::MissingCredentials.into());
        };

        let submission_id = uuid::Uuid::new_v4();
        let request = ResponsesRequest::new(credentials.model.clone(), payload);
        info!(
            event = "submit.started",
            domain = "submit",
            session_id = %self.inner.session_id,
            submission_id = %submission_id,
            model = credentials.model.as_str(),
            payload_len = request.input.len() as u64,
            tokens = budget.count as u64
        );

        let this = self.clone();
        let task = tokio::spawn(async move {
            let result = this.send(&credentials, &request).await;
            this.finish_submission(submission_id, result)
        });
        match task.await {
            Ok(outcome) => Ok(outcome),
            Err(join_error) => Ok(self.finish_submission(
                submission_id,
                Err(ProcessError::transport(format!(
                    "submission task ended unexpectedly: {join_error}"
                ))),
            )),
        }
    }

    async fn send(
        &self,
        credentials: &CredentialSet,
        request: &ResponsesRequest,
    ) -> Result<String, ProcessError> {
        let call = self.inner.client.create_response(credentials, request);
        match self.inner.config.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .unwrap_or(Err(ProcessError::Timeout(timeout))),
            None => call.await,
        }
    }

    fn finish_submission(
        &self,
        submission_id: uuid::Uuid,
        result: Result<String, ProcessError>,
    ) -> SubmitOutcome {
        match result {
            Ok(body) => {
                let text = envelope::result_text(&body);
                {
                    let mut session = self.session();
                    if session.state != ProcessingState::Submitting {
                        return SubmitOutcome::Ignored;
                    }
                    session.state = ProcessingState::Succeeded { text: text.clone() };
                }
                info!(
                    event = "submit.succeeded",
                    domain = "submit",
                    session_id = %self.inner.session_id,
                    submission_id = %submission_id,
                    result_len = text.len() as u64
                );
                self.notify(Notification::info(
                    "Processing Complete",
                    "Your content has been processed successfully!",
                ));
                SubmitOutcome::Succeeded(text)
            }
            Err(err) => {
                {
                    let mut session = self.session();
                    if session.state != ProcessingState::Submitting {
                        return SubmitOutcome::Ignored;
                    }
                    session.state = ProcessingState::Failed {
                        message: FAILURE_MESSAGE.to_string(),
                    };
                }
                error!(
                    event = "submit.failed",
                    domain = "submit",
                    session_id = %self.inner.session_id,
                    submission_id = %submission_id,
                    status = ?err.status_code(),
                    error = %err
                );
                self.notify(Notification::error("Processing Failed", FAILURE_MESSAGE));
                SubmitOutcome::Failed(FAILURE_MESSAGE.to_string())
            }
        }
    }

    /// Clears result, text and files. Refused while a submission is running.
    pub fn reset(&self) -> Result<(), ProcessError> {
        let budget = self.inner.guard.evaluate("");
        let mut session = self.session();
        if session.state == ProcessingState::Submitting {
            return Err(ProcessError::Busy);
        }
        let next_revision = session.file_revision + 1;
        *session = SessionState {
            file_revision: next_revision,
            decoded_revision: next_revision,
            ..SessionState::new(budget)
        };
        info!(event = "session.reset", domain = "session", session_id = %self.inner.session_id);
        Ok(())
    }

    /// The successful result packaged for download.
    pub fn download(&self) -> Option<ResultArtifact> {
        match self.state() {
            ProcessingState::Succeeded { text } => Some(ResultArtifact::today(text)),
            _ => None,
        }
    }
}

fn blocker_notification(blocker: &SubmitBlocker) -> Notification {
    match blocker {
        SubmitBlocker::MissingCredentials => Notification::error(
            "Configuration Missing",
            "Please configure your Azure OpenAI credentials first.",
        ),
        SubmitBlocker::EmptyInput => Notification::error(
            "No Content",
            "Please enter some text or upload files to process.",
        ),
        SubmitBlocker::OverBudget { count, ceiling } => Notification::error(
            "Token Limit Exceeded",
            format!("Content has {count} tokens; the maximum is {ceiling}."),
        ),
        SubmitBlocker::DecodingInFlight => Notification::warning(
            "Files Loading",
            "Please wait until all files have been read.",
        ),
        SubmitBlocker::InFlight => Notification::info(
            "Processing",
            "A request is already being processed.",
        ),
    }
}

/// Builder for [`Processor`].
#[derive(Default)]
pub struct ProcessorBuilder {
    config: Option<ProcessorConfig>,
    tokenizer: Option<TokenizerAdapter>,
    client: Option<Arc<dyn ResponsesClient>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    credentials: Option<CredentialSet>,
}

impl ProcessorBuilder {
    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Token counter used for budgeting. Defaults to `cl100k_base`.
    pub fn tokenizer(mut self, tokenizer: TokenizerAdapter) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Responses client. Defaults to [`AzureResponsesClient`].
    pub fn client(mut self, client: Arc<dyn ResponsesClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Notification sink. Defaults to [`TracingSink`].
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn credentials(mut self, credentials: CredentialSet) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Result<Processor, ProcessError> {
        let config = self.config.unwrap_or_default();
        if config.budget.ceiling == 0 {
            return Err(ProcessError::Config(
                "token ceiling must be greater than 0".into(),
            ));
        }
        let client: Arc<dyn ResponsesClient> = match self.client {
            Some(client) => client,
            None => Arc::new(AzureResponsesClient::new()?),
        };
        let guard = BudgetGuard::new(self.tokenizer.unwrap_or_default(), config.budget.clone());
        let budget = guard.evaluate("");
        let inner = ProcessorInner {
            session_id: uuid::Uuid::new_v4(),
            loader: FileTextLoader::new(config.decode_concurrency),
            guard,
            config,
            client,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingSink)),
            credentials: RwLock::new(self.credentials),
            session: Mutex::new(SessionState::new(budget)),
        };
        Ok(Processor {
            inner: Arc::new(inner),
        })
    }
}
