//! Generic Gemini batch processing over long-running operations.
//!
//! One processor drives the full lifecycle; the [`BatchRequestPreparer`]
//! strategy supplies the per-modality pieces (endpoint verb, wire request
//! mapping, result extraction).

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::files::GeminiFile;
use super::service::GeminiService;
use super::types::{
    BatchCreatePayload, BatchCreateRequest, BatchInlinedRequest, BatchInlinedRequests,
    BatchInputConfig, Operation, parse_operation_payload,
};
use crate::batch::{BatchItemResult, BatchJob, BatchJobState, BatchName, BatchPage};
use crate::error::LlmError;

/// Required prefix of Gemini batch operation names
pub const GEMINI_BATCH_PREFIX: &str = "batches/";

/// Per-modality strategy for a Gemini batch.
pub trait BatchRequestPreparer: Send + Sync {
    /// Provider-neutral request type submitted by callers
    type Request: Send + Sync;
    /// Wire request placed in the batch payload
    type WireRequest: Serialize + Send + Sync;
    /// Typed `response` payload of the finished operation
    type WireResponse: DeserializeOwned + Send;
    /// Provider-neutral per-item output
    type Output: Send;

    /// Batch verb, e.g. `batchGenerateContent`
    fn endpoint(&self) -> &'static str;

    /// Model the batch runs against
    fn model(&self) -> &str;

    /// Validate the request set before submission
    fn validate(&self, requests: &[Self::Request]) -> Result<(), LlmError> {
        let _ = requests;
        Ok(())
    }

    fn prepare(&self, request: &Self::Request) -> Result<Self::WireRequest, LlmError>;

    /// Map the finished operation payload to per-item results. A missing
    /// payload means the batch produced nothing.
    fn extract_results(
        &self,
        response: Option<Self::WireResponse>,
    ) -> Vec<BatchItemResult<Self::Output>>;
}

/// Batch lifecycle driver shared by the chat, embedding and image models.
pub struct GeminiBatchProcessor<P: BatchRequestPreparer> {
    service: GeminiService,
    preparer: P,
}

impl<P: BatchRequestPreparer> GeminiBatchProcessor<P> {
    pub fn new(service: GeminiService, preparer: P) -> Self {
        Self { service, preparer }
    }

    pub fn preparer(&self) -> &P {
        &self.preparer
    }

    /// Validate a raw operation name into a batch name
    pub fn batch_name(value: impl Into<String>) -> Result<BatchName, LlmError> {
        BatchName::of(value, GEMINI_BATCH_PREFIX)
    }

    /// Submit an inline batch. The returned job is always `Incomplete`; poll
    /// with [`Self::retrieve_batch_results`] until it resolves.
    pub async fn create_batch_inline(
        &self,
        display_name: &str,
        priority: i64,
        requests: &[P::Request],
    ) -> Result<BatchJob<P::Output>, LlmError> {
        if requests.is_empty() {
            return Err(LlmError::InvalidParameter(
                "batch requests cannot be empty".to_string(),
            ));
        }
        self.preparer.validate(requests)?;

        let inlined = requests
            .iter()
            .map(|request| {
                Ok(BatchInlinedRequest {
                    request: self.preparer.prepare(request)?,
                    metadata: serde_json::Map::new(),
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        let body = BatchCreateRequest {
            batch: BatchCreatePayload {
                display_name: display_name.to_string(),
                input_config: BatchInputConfig {
                    requests: Some(BatchInlinedRequests { requests: inlined }),
                    file_name: None,
                },
                priority,
            },
        };
        let operation = self
            .service
            .batch_create(self.preparer.model(), self.preparer.endpoint(), &body)
            .await?;
        self.to_batch_job(operation)
    }

    /// Submit a batch whose requests were uploaded as a JSONL file.
    pub async fn create_batch_from_file(
        &self,
        display_name: &str,
        priority: i64,
        file: &GeminiFile,
    ) -> Result<BatchJob<P::Output>, LlmError> {
        let body = BatchCreateRequest::<P::WireRequest> {
            batch: BatchCreatePayload {
                display_name: display_name.to_string(),
                input_config: BatchInputConfig {
                    requests: None,
                    file_name: Some(file.name().to_string()),
                },
                priority,
            },
        };
        let operation = self
            .service
            .batch_create(self.preparer.model(), self.preparer.endpoint(), &body)
            .await?;
        self.to_batch_job(operation)
    }

    /// Poll the operation and map it to its current lifecycle stage.
    pub async fn retrieve_batch_results(
        &self,
        name: &BatchName,
    ) -> Result<BatchJob<P::Output>, LlmError> {
        let operation = self.service.batch_retrieve(name.id()).await?;
        self.to_batch_job(operation)
    }

    /// Request cancellation. Cancellation is asynchronous; poll to observe
    /// the final state.
    pub async fn cancel_batch_job(&self, name: &BatchName) -> Result<(), LlmError> {
        self.service.batch_cancel(name.id()).await
    }

    /// Delete the operation record.
    pub async fn delete_batch_job(&self, name: &BatchName) -> Result<(), LlmError> {
        self.service.batch_delete(name.id()).await
    }

    /// List batch operations, one page at a time.
    pub async fn list_batch_jobs(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<BatchPage<P::Output>, LlmError> {
        let page = self.service.batch_list(page_size, page_token).await?;
        let next_page_token = page.next_page_token;
        let has_more = next_page_token.is_some();

        let mut jobs = Vec::with_capacity(page.operations.len());
        for operation in page.operations {
            jobs.push(self.to_batch_job(operation)?);
        }
        Ok(BatchPage {
            jobs,
            next_page_token,
            has_more,
        })
    }

    fn to_batch_job(
        &self,
        operation: Operation<serde_json::Value>,
    ) -> Result<BatchJob<P::Output>, LlmError> {
        let state = map_batch_state(operation.state());
        let name = BatchName::of(operation.name, GEMINI_BATCH_PREFIX)?;

        if !operation.done {
            return Ok(BatchJob::Incomplete {
                name,
                state,
                counts: None,
            });
        }
        if let Some(status) = operation.error {
            return Ok(BatchJob::Error {
                name,
                state,
                code: status.code,
                message: status.message,
                details: status.details,
            });
        }

        let payload = parse_operation_payload::<P::WireResponse>(operation.response)?;
        Ok(BatchJob::Success {
            name,
            results: self.preparer.extract_results(payload),
            counts: None,
        })
    }
}

fn map_batch_state(state: Option<&str>) -> BatchJobState {
    match state {
        Some("BATCH_STATE_PENDING") => BatchJobState::Pending,
        Some("BATCH_STATE_RUNNING") => BatchJobState::Running,
        Some("BATCH_STATE_SUCCEEDED") => BatchJobState::Succeeded,
        Some("BATCH_STATE_FAILED") => BatchJobState::Failed,
        Some("BATCH_STATE_CANCELLED") => BatchJobState::Cancelled,
        Some("BATCH_STATE_EXPIRED") => BatchJobState::Expired,
        other => {
            if let Some(value) = other {
                tracing::debug!("unknown Gemini batch state: {value}");
            }
            BatchJobState::Unspecified
        }
    }
}
