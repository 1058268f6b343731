//! Outbound Responses API calls.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::CredentialSet;
use crate::errors::ProcessError;

/// JSON body sent to the Responses endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    /// The aggregated payload.
    pub input: String,
}

impl ResponsesRequest {
    pub fn new(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
        }
    }
}

/// Sends one Responses request and returns the raw success body.
///
/// Any non-2xx status must be reported as [`ProcessError::Http`]; failures to
/// connect or read the body as [`ProcessError::Transport`].
#[async_trait::async_trait]
pub trait ResponsesClient: Send + Sync {
    async fn create_response(
        &self,
        credentials: &CredentialSet,
        request: &ResponsesRequest,
    ) -> Result<String, ProcessError>;
}

/// `reqwest` client for Azure OpenAI's `/openai/v1/responses` route.
///
/// Performs a single attempt. No client-level timeout is set; callers bound
/// the wait through `ProcessorConfig::request_timeout` if they need to.
#[derive(Clone, Debug)]
pub struct AzureResponsesClient {
    client: reqwest::Client,
}

impl AzureResponsesClient {
    pub fn new() -> Result<Self, ProcessError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProcessError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client (for custom TLS or proxy settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ResponsesClient for AzureResponsesClient {
    async fn create_response(
        &self,
        credentials: &CredentialSet,
        request: &ResponsesRequest,
    ) -> Result<String, ProcessError> {
        let url = credentials.responses_url();
        debug!(
            event = "http.request_configured",
            domain = "http",
            model = request.model.as_str(),
            api_version = credentials.api_version.as_str(),
            input_len = request.input.len() as u64,
            "sending responses request"
        );

        let response = self
            .client
            .post(&url)
            .header("api-key", &credentials.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProcessError::transport(format!("responses request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProcessError::transport(format!("failed to read response body: {e}")))?;
        if !status.is_success() {
            return Err(ProcessError::Http {
                status: status.as_u16(),
                message: body,
            });
        }
        debug!(
            event = "http.request_succeeded",
            domain = "http",
            status = status.as_u16(),
            response_bytes = body.len() as u64
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_model_and_input_only() {
        let body = serde_json::to_value(ResponsesRequest::new("o3-pro-2", "Hello")).unwrap();
        assert_eq!(body, serde_json::json!({"model": "o3-pro-2", "input": "Hello"}));
    }
}
