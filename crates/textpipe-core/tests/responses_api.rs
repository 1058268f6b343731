use std::sync::Arc;

use serde_json::json;
use textpipe_core::envelope::NO_TEXT_PLACEHOLDER;
use textpipe_core::prelude::*;
use textpipe_core::{
    AzureResponsesClient, FAILURE_MESSAGE, NotificationLog, ResponsesClient, ResponsesRequest,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

fn processor_for(server: &MockServer) -> (Processor, Arc<NotificationLog>) {
    let log = Arc::new(NotificationLog::new());
    let processor = Processor::builder()
        .credentials(CredentialSet::new(format!("{}/", server.uri()), "secret-key"))
        .notifier(log.clone())
        .build()
        .unwrap();
    (processor, log)
}

fn responses_route() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/openai/v1/responses"))
        .and(query_param("api-version", "preview"))
        .and(header("api-key", "secret-key"))
}

#[tokio::test]
async fn hello_is_sent_and_output_text_returned() {
    let server = MockServer::start().await;
    responses_route()
        .and(body_json(json!({"model": "o3-pro-2", "input": "Hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [{"type": "output_text", "text": "Hi there"}]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (processor, log) = processor_for(&server);
    processor.set_primary_text("Hello").unwrap();

    let outcome = processor.submit().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Succeeded("Hi there\n".into()));
    assert_eq!(processor.result(), ProcessingResult::Success("Hi there\n".into()));
    assert_eq!(log.titles(), vec!["Processing Complete"]);
}

#[tokio::test]
async fn file_only_payload_is_the_request_input() {
    let server = MockServer::start().await;
    responses_route()
        .and(body_json(json!({
            "model": "o3-pro-2",
            "input": "\n\n--- Content from a.txt ---\ndata"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "ok"}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (processor, _) = processor_for(&server);
    processor
        .add_files(vec![FileHandle::from_bytes("a.txt", "data")])
        .await
        .unwrap();

    assert_eq!(
        processor.submit().await.unwrap(),
        SubmitOutcome::Succeeded("ok\n".into())
    );
}

#[tokio::test]
async fn server_error_fails_and_keeps_inputs() {
    let server = MockServer::start().await;
    responses_route()
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let (processor, log) = processor_for(&server);
    processor.set_primary_text("Hello").unwrap();
    processor
        .add_files(vec![FileHandle::from_bytes("a.txt", "data")])
        .await
        .unwrap();

    let outcome = processor.submit().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Failed(FAILURE_MESSAGE.into()));
    assert_eq!(processor.result(), ProcessingResult::Failure(FAILURE_MESSAGE.into()));
    assert_eq!(processor.primary_text(), "Hello");
    assert_eq!(processor.file_names(), vec!["a.txt"]);
    assert_eq!(log.titles(), vec!["Processing Failed"]);
}

#[tokio::test]
async fn envelope_without_text_yields_placeholder() {
    let server = MockServer::start().await;
    responses_route()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": [{"type": "reasoning", "summary": []}]
        })))
        .mount(&server)
        .await;

    let (processor, _) = processor_for(&server);
    processor.set_primary_text("Hello").unwrap();

    assert_eq!(
        processor.submit().await.unwrap(),
        SubmitOutcome::Succeeded(NO_TEXT_PLACEHOLDER.into())
    );
    assert_eq!(processor.download().unwrap().contents, NO_TEXT_PLACEHOLDER);
}

#[tokio::test]
async fn client_reports_status_and_body_on_rejection() {
    let server = MockServer::start().await;
    responses_route()
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let client = AzureResponsesClient::new().unwrap();
    let creds = CredentialSet::new(server.uri(), "secret-key");
    let err = client
        .create_response(&creds, &ResponsesRequest::new("o3-pro-2", "x"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ProcessError::Http {
            status: 401,
            message: "bad key".into()
        }
    );
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    let client = AzureResponsesClient::new().unwrap();
    let creds = CredentialSet::new("http://127.0.0.1:9", "secret-key");
    let err = client
        .create_response(&creds, &ResponsesRequest::new("o3-pro-2", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::Transport(_)));
    assert_eq!(err.status_code(), None);
}
