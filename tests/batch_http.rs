//! HTTP-level batch lifecycle tests against a mock server.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unillm::batch::{BatchItemStatus, BatchJob, BatchJobState};
use unillm::providers::anthropic::{AnthropicBatchChatModel, AnthropicClient};
use unillm::providers::gemini::{GeminiBatchChatModel, GeminiService};
use unillm::types::{ChatMessage, ChatRequest};

fn anthropic_model(server: &MockServer) -> AnthropicBatchChatModel {
    AnthropicBatchChatModel::new(AnthropicClient::new("test-key").with_base_url(server.uri()))
}

fn gemini_model(server: &MockServer) -> GeminiBatchChatModel {
    GeminiBatchChatModel::new(
        GeminiService::new("test-key").with_base_url(server.uri()),
        "gemini-2.5-flash",
    )
}

#[tokio::test]
async fn anthropic_create_returns_incomplete_while_in_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/batches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msgbatch_123",
            "processing_status": "in_progress",
            "request_counts": {"processing": 1, "succeeded": 0, "errored": 0, "canceled": 0, "expired": 0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let requests = vec![ChatRequest::new(
        "claude-sonnet-4-20250514",
        vec![ChatMessage::user("hello")],
    )];
    let job = anthropic_model(&server)
        .create_batch_inline(&requests)
        .await
        .unwrap();

    let BatchJob::Incomplete { name, state, .. } = job else {
        panic!("expected Incomplete, got {job:?}");
    };
    assert_eq!(name.id(), "msgbatch_123");
    assert_eq!(state, BatchJobState::Running);
}

#[tokio::test]
async fn anthropic_ended_batch_fetches_jsonl_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/batches/msgbatch_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msgbatch_123",
            "processing_status": "ended",
            "results_url": format!("{}/messages/batches/msgbatch_123/results", server.uri()),
            "request_counts": {"processing": 0, "succeeded": 1, "errored": 1, "canceled": 0, "expired": 0}
        })))
        .mount(&server)
        .await;

    let results_body = concat!(
        r#"{"custom_id": "request-1", "result": {"type": "succeeded", "message": {"id": "msg_1", "model": "claude-sonnet-4-20250514", "content": [{"type": "text", "text": "Paris"}], "stop_reason": "end_turn", "usage": {"input_tokens": 4, "output_tokens": 1}}}}"#,
        "\n",
        r#"{"custom_id": "request-2", "result": {"type": "errored", "error": {"type": "invalid_request_error", "message": "max_tokens too large"}}}"#,
        "\n",
    );
    Mock::given(method("GET"))
        .and(path("/messages/batches/msgbatch_123/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_body))
        .mount(&server)
        .await;

    let name = AnthropicBatchChatModel::batch_name("msgbatch_123").unwrap();
    let job = anthropic_model(&server)
        .retrieve_batch_results(&name)
        .await
        .unwrap();

    let BatchJob::Success { results, counts, .. } = job else {
        panic!("expected Success, got {job:?}");
    };
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, BatchItemStatus::Succeeded);
    assert_eq!(
        results[0].response.as_ref().unwrap().text.as_deref(),
        Some("Paris")
    );
    assert_eq!(results[1].status, BatchItemStatus::Errored);
    assert_eq!(results[1].error.as_deref(), Some("max_tokens too large"));
    assert_eq!(counts.unwrap().succeeded, 1);
}

#[tokio::test]
async fn anthropic_all_errored_batch_with_results_fans_out_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/batches/msgbatch_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msgbatch_123",
            "processing_status": "ended",
            "results_url": format!("{}/messages/batches/msgbatch_123/results", server.uri()),
            "request_counts": {"processing": 0, "succeeded": 0, "errored": 2, "canceled": 0, "expired": 0}
        })))
        .mount(&server)
        .await;

    let results_body = concat!(
        r#"{"custom_id": "request-1", "result": {"type": "errored", "error": {"type": "invalid_request_error", "message": "max_tokens too large"}}}"#,
        "\n",
        r#"{"custom_id": "request-2", "result": {"type": "errored", "error": {"type": "overloaded_error", "message": "Overloaded"}}}"#,
        "\n",
    );
    Mock::given(method("GET"))
        .and(path("/messages/batches/msgbatch_123/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_body))
        .expect(1)
        .mount(&server)
        .await;

    let name = AnthropicBatchChatModel::batch_name("msgbatch_123").unwrap();
    let job = anthropic_model(&server)
        .retrieve_batch_results(&name)
        .await
        .unwrap();

    // Published per-item outcomes win over the all-failed remap.
    let BatchJob::Success { results, .. } = job else {
        panic!("expected Success, got {job:?}");
    };
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.status == BatchItemStatus::Errored));
    assert_eq!(results[0].error.as_deref(), Some("max_tokens too large"));
}

#[tokio::test]
async fn anthropic_listing_does_not_fetch_result_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/batches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "msgbatch_done", "processing_status": "ended",
                 "results_url": format!("{}/messages/batches/msgbatch_done/results", server.uri()),
                 "request_counts": {"processing": 0, "succeeded": 3, "errored": 0, "canceled": 0, "expired": 0}}
            ],
            "has_more": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/messages/batches/msgbatch_done/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(0)
        .mount(&server)
        .await;

    let page = anthropic_model(&server)
        .list_batch_jobs(None, None)
        .await
        .unwrap();

    assert_eq!(page.jobs.len(), 1);
    assert!(matches!(
        page.jobs[0],
        BatchJob::Incomplete {
            state: BatchJobState::Running,
            ..
        }
    ));
    // expect(0) on the results mock is verified when the server drops.
}

#[tokio::test]
async fn anthropic_list_paginates_with_last_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/batches"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "msgbatch_1", "processing_status": "in_progress",
                 "request_counts": {"processing": 1, "succeeded": 0, "errored": 0, "canceled": 0, "expired": 0}},
                {"id": "msgbatch_2", "processing_status": "canceling",
                 "request_counts": {"processing": 1, "succeeded": 0, "errored": 0, "canceled": 0, "expired": 0}}
            ],
            "has_more": true,
            "first_id": "msgbatch_1",
            "last_id": "msgbatch_2"
        })))
        .mount(&server)
        .await;

    let page = anthropic_model(&server)
        .list_batch_jobs(Some(2), None)
        .await
        .unwrap();

    assert_eq!(page.jobs.len(), 2);
    assert!(page.has_more);
    assert_eq!(page.next_page_token.as_deref(), Some("msgbatch_2"));
    assert!(matches!(
        page.jobs[1],
        BatchJob::Incomplete {
            state: BatchJobState::Canceling,
            ..
        }
    ));
}

#[tokio::test]
async fn gemini_create_inline_returns_incomplete_pending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:batchGenerateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "batches/abc-123",
            "metadata": {
                "@type": "type.googleapis.com/google.ai.generativelanguage.v1main.GenerateContentBatch",
                "state": "BATCH_STATE_PENDING"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let requests = vec![ChatRequest::new(
        "gemini-2.5-flash",
        vec![ChatMessage::user("hello")],
    )];
    let job = gemini_model(&server)
        .create_batch_inline("test batch", 0, &requests)
        .await
        .unwrap();

    let BatchJob::Incomplete { name, state, .. } = job else {
        panic!("expected Incomplete, got {job:?}");
    };
    assert_eq!(name.id(), "batches/abc-123");
    assert_eq!(state, BatchJobState::Pending);
}

#[tokio::test]
async fn gemini_finished_operation_fans_out_inline_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/batches/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "batches/abc-123",
            "metadata": {"state": "BATCH_STATE_SUCCEEDED"},
            "done": true,
            "response": {
                "inlinedResponses": {
                    "inlinedResponses": [
                        {"response": {"candidates": [{"content": {"role": "model", "parts": [{"text": "Paris"}]}, "finishReason": "STOP"}]}},
                        {"error": {"code": 4, "message": "Deadline expired before operation could complete."}}
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let name = GeminiBatchChatModel::batch_name("batches/abc-123").unwrap();
    let job = gemini_model(&server)
        .retrieve_batch_results(&name)
        .await
        .unwrap();

    let BatchJob::Success { results, .. } = job else {
        panic!("expected Success, got {job:?}");
    };
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].response.as_ref().unwrap().text.as_deref(),
        Some("Paris")
    );
    assert_eq!(results[1].status, BatchItemStatus::Errored);
}

#[tokio::test]
async fn gemini_failed_operation_carries_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/batches/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "batches/abc-123",
            "metadata": {"state": "BATCH_STATE_FAILED"},
            "done": true,
            "error": {"code": 13, "message": "internal error"}
        })))
        .mount(&server)
        .await;

    let name = GeminiBatchChatModel::batch_name("batches/abc-123").unwrap();
    let job = gemini_model(&server)
        .retrieve_batch_results(&name)
        .await
        .unwrap();

    let BatchJob::Error {
        state,
        code,
        message,
        ..
    } = job
    else {
        panic!("expected Error, got {job:?}");
    };
    assert_eq!(state, BatchJobState::Failed);
    assert_eq!(code, Some(13));
    assert_eq!(message.as_deref(), Some("internal error"));
}

#[tokio::test]
async fn gemini_list_maps_each_operation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/batches"))
        .and(query_param("pageSize", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "operations": [
                {"name": "batches/a", "metadata": {"state": "BATCH_STATE_RUNNING"}},
                {"name": "batches/b", "metadata": {"state": "BATCH_STATE_CANCELLED"}, "done": true,
                 "error": {"code": 1, "message": "cancelled"}}
            ],
            "nextPageToken": "tok-2"
        })))
        .mount(&server)
        .await;

    let page = gemini_model(&server)
        .list_batch_jobs(Some(10), None)
        .await
        .unwrap();

    assert_eq!(page.jobs.len(), 2);
    assert!(page.has_more);
    assert_eq!(page.next_page_token.as_deref(), Some("tok-2"));
    assert!(matches!(page.jobs[0], BatchJob::Incomplete { .. }));
    assert!(matches!(page.jobs[1], BatchJob::Error { .. }));
}

#[tokio::test]
async fn gemini_cancel_and_delete_hit_their_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batches/abc-123:cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/batches/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let model = gemini_model(&server);
    let name = GeminiBatchChatModel::batch_name("batches/abc-123").unwrap();
    model.cancel_batch_job(&name).await.unwrap();
    model.delete_batch_job(&name).await.unwrap();
}

#[tokio::test]
async fn api_errors_surface_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/messages/batches/msgbatch_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "type": "error",
            "error": {"type": "not_found_error", "message": "batch not found"}
        })))
        .mount(&server)
        .await;

    let name = AnthropicBatchChatModel::batch_name("msgbatch_missing").unwrap();
    let err = anthropic_model(&server)
        .retrieve_batch_results(&name)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("batch not found"));
}
