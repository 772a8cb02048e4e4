//! Anthropic batch chat model over the Message Batches API.

use super::client::AnthropicClient;
use super::types::{
    AnthropicBatchItemOutcome, AnthropicBatchRequestItem, AnthropicBatchResultLine,
    AnthropicChatRequest, AnthropicCreateBatchRequest, AnthropicMessageBatch,
};
use crate::batch::{
    BatchItemResult, BatchItemStatus, BatchJob, BatchJobState, BatchName, BatchPage,
    BatchRequestCounts,
};
use crate::error::LlmError;
use crate::types::{ChatRequest, ChatResponse};

/// Required prefix of Anthropic batch ids
pub const ANTHROPIC_BATCH_PREFIX: &str = "msgbatch_";

/// Batch chat model for Anthropic.
///
/// Stateless besides the client: every call round-trips through the API, so
/// one instance is safe to share across tasks.
#[derive(Debug, Clone)]
pub struct AnthropicBatchChatModel {
    client: AnthropicClient,
}

impl AnthropicBatchChatModel {
    pub fn new(client: AnthropicClient) -> Self {
        Self { client }
    }

    /// Validate a raw id into a batch name
    pub fn batch_name(value: impl Into<String>) -> Result<BatchName, LlmError> {
        BatchName::of(value, ANTHROPIC_BATCH_PREFIX)
    }

    /// Submit a batch of chat requests (POST /messages/batches)
    pub async fn create_batch_inline(
        &self,
        requests: &[ChatRequest],
    ) -> Result<BatchJob<ChatResponse>, LlmError> {
        if requests.is_empty() {
            return Err(LlmError::InvalidParameter(
                "batch requests cannot be empty".to_string(),
            ));
        }
        let items = requests
            .iter()
            .map(|request| {
                Ok(AnthropicBatchRequestItem {
                    custom_id: format!("request-{}", uuid::Uuid::new_v4()),
                    params: AnthropicChatRequest::from_chat_request(request)?,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        let batch = self
            .client
            .create_batch(&AnthropicCreateBatchRequest { requests: items })
            .await?;
        map_batch(batch)
    }

    /// Poll a batch and, when it has ended, fetch its per-item results.
    ///
    /// This is the only operation that downloads the results document; an
    /// ended batch with a results URL always resolves to `Success`, even
    /// when every item inside it errored.
    pub async fn retrieve_batch_results(
        &self,
        name: &BatchName,
    ) -> Result<BatchJob<ChatResponse>, LlmError> {
        let batch = self.client.get_batch(name.id()).await?;
        if batch.processing_status == "ended" && batch.results_url.is_some() {
            let name = BatchName::of(batch.id.clone(), ANTHROPIC_BATCH_PREFIX)?;
            let counts = map_counts(&batch);
            let lines = self.client.get_batch_results(name.id()).await?;
            let results = lines.into_iter().map(convert_result_line).collect();
            return Ok(BatchJob::Success {
                name,
                results,
                counts: Some(counts),
            });
        }
        map_batch(batch)
    }

    /// Request cancellation (POST /messages/batches/{id}/cancel)
    pub async fn cancel_batch_job(
        &self,
        name: &BatchName,
    ) -> Result<BatchJob<ChatResponse>, LlmError> {
        let batch = self.client.cancel_batch(name.id()).await?;
        map_batch(batch)
    }

    /// The Anthropic API has no delete endpoint for batches.
    pub async fn delete_batch_job(&self, _name: &BatchName) -> Result<(), LlmError> {
        Err(LlmError::UnsupportedOperation(
            "Anthropic API does not support deleting batches".to_string(),
        ))
    }

    /// List batches, one page at a time (GET /messages/batches).
    ///
    /// Listing never downloads result documents; ended batches show up as
    /// `Incomplete` until the caller retrieves them individually.
    pub async fn list_batch_jobs(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<BatchPage<ChatResponse>, LlmError> {
        let page = self.client.list_batches(page_size, page_token).await?;
        let has_more = page.has_more;
        let next_page_token = if has_more { page.last_id } else { None };

        let jobs = page
            .data
            .into_iter()
            .map(map_batch)
            .collect::<Result<Vec<_>, LlmError>>()?;
        Ok(BatchPage {
            jobs,
            next_page_token,
            has_more,
        })
    }
}

fn map_counts(batch: &AnthropicMessageBatch) -> BatchRequestCounts {
    BatchRequestCounts {
        processing: batch.request_counts.processing,
        succeeded: batch.request_counts.succeeded,
        errored: batch.request_counts.errored,
        cancelled: batch.request_counts.canceled,
        expired: batch.request_counts.expired,
    }
}

/// Map a batch resource without touching the results document.
///
/// The all-failed remap applies only when no results URL exists; once the
/// provider published a results document, per-item outcomes are
/// authoritative and retrieval fans them out.
fn map_batch(batch: AnthropicMessageBatch) -> Result<BatchJob<ChatResponse>, LlmError> {
    let name = BatchName::of(batch.id.clone(), ANTHROPIC_BATCH_PREFIX)?;
    let counts = map_counts(&batch);

    if batch.processing_status == "ended" {
        if batch.results_url.is_none() && counts.succeeded == 0 && counts.errored > 0 {
            return Ok(BatchJob::Error {
                name,
                state: BatchJobState::Failed,
                code: None,
                message: Some("All requests in batch failed".to_string()),
                details: Vec::new(),
            });
        }
        // Ended with pending results, or with a document we are not
        // fetching in this call.
        return Ok(BatchJob::Incomplete {
            name,
            state: BatchJobState::Running,
            counts: Some(counts),
        });
    }

    Ok(BatchJob::Incomplete {
        name,
        state: map_processing_status(&batch),
        counts: Some(counts),
    })
}

fn map_processing_status(batch: &AnthropicMessageBatch) -> BatchJobState {
    match batch.processing_status.as_str() {
        "in_progress" => {
            if batch.cancel_initiated_at.is_some() {
                BatchJobState::Canceling
            } else {
                BatchJobState::Running
            }
        }
        "canceling" => BatchJobState::Canceling,
        other => {
            tracing::debug!("unknown Anthropic processing status: {other}");
            BatchJobState::Unspecified
        }
    }
}

fn convert_result_line(line: AnthropicBatchResultLine) -> BatchItemResult<ChatResponse> {
    let custom_id = Some(line.custom_id);
    match line.result {
        AnthropicBatchItemOutcome::Succeeded { message } => {
            BatchItemResult::succeeded(custom_id, message.into_chat_response())
        }
        AnthropicBatchItemOutcome::Errored { error } => {
            let message = error
                .get("message")
                .or_else(|| error.get("error").and_then(|e| e.get("message")))
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            BatchItemResult::errored(custom_id, message)
        }
        AnthropicBatchItemOutcome::Canceled => {
            BatchItemResult::terminal(custom_id, BatchItemStatus::Cancelled)
        }
        AnthropicBatchItemOutcome::Expired => {
            BatchItemResult::terminal(custom_id, BatchItemStatus::Expired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> AnthropicBatchChatModel {
        AnthropicBatchChatModel::new(AnthropicClient::new("test-key"))
    }

    fn batch(status: &str) -> AnthropicMessageBatch {
        serde_json::from_value(serde_json::json!({
            "id": "msgbatch_abc",
            "processing_status": status,
            "request_counts": {"processing": 0, "succeeded": 0, "errored": 0, "canceled": 0, "expired": 0}
        }))
        .unwrap()
    }

    #[test]
    fn batch_name_requires_msgbatch_prefix() {
        assert!(AnthropicBatchChatModel::batch_name("msgbatch_abc").is_ok());
        assert!(AnthropicBatchChatModel::batch_name("batches/abc").is_err());
        assert!(AnthropicBatchChatModel::batch_name("").is_err());
    }

    #[test]
    fn in_progress_batch_is_incomplete_running() {
        let mut wire = batch("in_progress");
        wire.request_counts.processing = 3;
        let job = map_batch(wire).unwrap();
        let BatchJob::Incomplete { state, counts, .. } = job else {
            panic!("expected Incomplete");
        };
        assert_eq!(state, BatchJobState::Running);
        assert_eq!(counts.unwrap().processing, 3);
    }

    #[test]
    fn cancel_initiated_batch_reports_canceling() {
        let mut wire = batch("in_progress");
        wire.cancel_initiated_at = Some("2026-01-01T00:00:00Z".to_string());
        let job = map_batch(wire).unwrap();
        assert!(matches!(
            job,
            BatchJob::Incomplete {
                state: BatchJobState::Canceling,
                ..
            }
        ));
    }

    #[test]
    fn all_errored_batch_without_results_url_becomes_batch_error() {
        let mut wire = batch("ended");
        wire.request_counts.errored = 4;
        let job = map_batch(wire).unwrap();
        let BatchJob::Error { message, state, .. } = job else {
            panic!("expected Error");
        };
        assert_eq!(message.as_deref(), Some("All requests in batch failed"));
        assert_eq!(state, BatchJobState::Failed);
    }

    #[test]
    fn all_errored_batch_with_results_url_is_not_remapped_to_error() {
        let mut wire = batch("ended");
        wire.request_counts.errored = 4;
        wire.results_url = Some("https://api.anthropic.com/results".to_string());
        let job = map_batch(wire).unwrap();
        // Per-item outcomes in the results document are authoritative;
        // retrieval fans them out instead.
        assert!(matches!(
            job,
            BatchJob::Incomplete {
                state: BatchJobState::Running,
                ..
            }
        ));
    }

    #[test]
    fn ended_without_results_url_stays_incomplete() {
        let mut wire = batch("ended");
        wire.request_counts.succeeded = 2;
        let job = map_batch(wire).unwrap();
        assert!(matches!(job, BatchJob::Incomplete { .. }));
    }

    #[test]
    fn unknown_processing_status_maps_to_unspecified() {
        let job = map_batch(batch("archived")).unwrap();
        assert!(matches!(
            job,
            BatchJob::Incomplete {
                state: BatchJobState::Unspecified,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn delete_is_unsupported() {
        let name = AnthropicBatchChatModel::batch_name("msgbatch_abc").unwrap();
        let err = model().delete_batch_job(&name).await.unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedOperation(_)));
        assert!(err.to_string().contains("does not support deleting"));
    }

    #[test]
    fn errored_result_lines_extract_the_error_message() {
        let line: AnthropicBatchResultLine = serde_json::from_value(serde_json::json!({
            "custom_id": "req-2",
            "result": {
                "type": "errored",
                "error": {"type": "invalid_request_error", "message": "max_tokens too large"}
            }
        }))
        .unwrap();
        let item = convert_result_line(line);
        assert_eq!(item.status, BatchItemStatus::Errored);
        assert_eq!(item.error.as_deref(), Some("max_tokens too large"));
        assert_eq!(item.custom_id.as_deref(), Some("req-2"));
    }
}
