//! Batch models for the Gemini chat, embedding and image modalities.

use super::batch::{BatchRequestPreparer, GeminiBatchProcessor};
use super::files::GeminiFile;
use super::service::{ASYNC_BATCH_EMBED_CONTENT, BATCH_GENERATE_CONTENT, GeminiService};
use super::types::{
    BatchCreateResponse, GeminiContent, GeminiEmbedContentRequest, GeminiEmbedContentResponse,
    GeminiGenerateContentRequest, GeminiGenerateContentResponse, GeminiPart, GeminiStatus,
};
use crate::batch::{BatchItemResult, BatchJob, BatchName, BatchPage};
use crate::error::LlmError;
use crate::types::{ChatRequest, ChatResponse, Embedding, GeneratedImage};

fn status_message(status: GeminiStatus) -> String {
    status
        .message
        .unwrap_or_else(|| format!("batch item failed with code {:?}", status.code))
}

/// Chat request preparer: every request must target the same model.
pub struct ChatRequestPreparer {
    model: String,
}

impl BatchRequestPreparer for ChatRequestPreparer {
    type Request = ChatRequest;
    type WireRequest = GeminiGenerateContentRequest;
    type WireResponse = BatchCreateResponse<GeminiGenerateContentResponse>;
    type Output = ChatResponse;

    fn endpoint(&self) -> &'static str {
        BATCH_GENERATE_CONTENT
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn validate(&self, requests: &[ChatRequest]) -> Result<(), LlmError> {
        if requests.iter().any(|r| r.model != self.model) {
            return Err(LlmError::InvalidParameter(
                "Batch requests cannot contain ChatRequest objects with different models"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn prepare(&self, request: &ChatRequest) -> Result<GeminiGenerateContentRequest, LlmError> {
        GeminiGenerateContentRequest::from_chat_request(request)
    }

    fn extract_results(
        &self,
        response: Option<Self::WireResponse>,
    ) -> Vec<BatchItemResult<ChatResponse>> {
        let wrappers = response
            .and_then(|r| r.inlined_responses)
            .map(|r| r.inlined_responses)
            .unwrap_or_default();

        wrappers
            .into_iter()
            .map(|wrapper| match (wrapper.response, wrapper.error) {
                (Some(wire), _) => BatchItemResult::succeeded(None, wire.into_chat_response()),
                (None, Some(status)) => BatchItemResult::errored(None, status_message(status)),
                (None, None) => BatchItemResult::errored(
                    None,
                    "batch item carried neither a response nor an error".to_string(),
                ),
            })
            .collect()
    }
}

/// Batch chat model for Gemini.
pub struct GeminiBatchChatModel {
    processor: GeminiBatchProcessor<ChatRequestPreparer>,
}

impl GeminiBatchChatModel {
    pub fn new(service: GeminiService, model: impl Into<String>) -> Self {
        Self {
            processor: GeminiBatchProcessor::new(
                service,
                ChatRequestPreparer {
                    model: model.into(),
                },
            ),
        }
    }

    pub fn batch_name(value: impl Into<String>) -> Result<BatchName, LlmError> {
        GeminiBatchProcessor::<ChatRequestPreparer>::batch_name(value)
    }

    pub async fn create_batch_inline(
        &self,
        display_name: &str,
        priority: i64,
        requests: &[ChatRequest],
    ) -> Result<BatchJob<ChatResponse>, LlmError> {
        self.processor
            .create_batch_inline(display_name, priority, requests)
            .await
    }

    pub async fn create_batch_from_file(
        &self,
        display_name: &str,
        priority: i64,
        file: &GeminiFile,
    ) -> Result<BatchJob<ChatResponse>, LlmError> {
        self.processor
            .create_batch_from_file(display_name, priority, file)
            .await
    }

    pub async fn retrieve_batch_results(
        &self,
        name: &BatchName,
    ) -> Result<BatchJob<ChatResponse>, LlmError> {
        self.processor.retrieve_batch_results(name).await
    }

    pub async fn cancel_batch_job(&self, name: &BatchName) -> Result<(), LlmError> {
        self.processor.cancel_batch_job(name).await
    }

    pub async fn delete_batch_job(&self, name: &BatchName) -> Result<(), LlmError> {
        self.processor.delete_batch_job(name).await
    }

    pub async fn list_batch_jobs(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<BatchPage<ChatResponse>, LlmError> {
        self.processor.list_batch_jobs(page_size, page_token).await
    }
}

/// Embedding request preparer for `asyncBatchEmbedContent`.
pub struct EmbeddingRequestPreparer {
    model: String,
    output_dimensionality: Option<u32>,
}

impl BatchRequestPreparer for EmbeddingRequestPreparer {
    type Request = String;
    type WireRequest = GeminiEmbedContentRequest;
    type WireResponse = BatchCreateResponse<GeminiEmbedContentResponse>;
    type Output = Embedding;

    fn endpoint(&self) -> &'static str {
        ASYNC_BATCH_EMBED_CONTENT
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn prepare(&self, request: &String) -> Result<GeminiEmbedContentRequest, LlmError> {
        if request.trim().is_empty() {
            return Err(LlmError::InvalidParameter(
                "text to embed cannot be blank".to_string(),
            ));
        }
        Ok(GeminiEmbedContentRequest {
            model: Some(format!("models/{}", self.model)),
            content: GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(request)],
            },
            output_dimensionality: self.output_dimensionality,
        })
    }

    fn extract_results(
        &self,
        response: Option<Self::WireResponse>,
    ) -> Vec<BatchItemResult<Embedding>> {
        let wrappers = response
            .and_then(|r| r.inlined_responses)
            .map(|r| r.inlined_responses)
            .unwrap_or_default();

        wrappers
            .into_iter()
            .map(|wrapper| match (wrapper.response, wrapper.error) {
                (Some(wire), _) => match wire.embedding {
                    Some(embedding) => BatchItemResult::succeeded(
                        None,
                        Embedding {
                            values: embedding.values,
                        },
                    ),
                    None => BatchItemResult::errored(
                        None,
                        "batch item response contains no embedding".to_string(),
                    ),
                },
                (None, Some(status)) => BatchItemResult::errored(None, status_message(status)),
                (None, None) => BatchItemResult::errored(
                    None,
                    "batch item carried neither a response nor an error".to_string(),
                ),
            })
            .collect()
    }
}

/// Batch embedding model for Gemini.
pub struct GeminiBatchEmbeddingModel {
    processor: GeminiBatchProcessor<EmbeddingRequestPreparer>,
}

impl GeminiBatchEmbeddingModel {
    pub fn new(service: GeminiService, model: impl Into<String>) -> Self {
        Self::with_output_dimensionality(service, model, None)
    }

    pub fn with_output_dimensionality(
        service: GeminiService,
        model: impl Into<String>,
        output_dimensionality: Option<u32>,
    ) -> Self {
        Self {
            processor: GeminiBatchProcessor::new(
                service,
                EmbeddingRequestPreparer {
                    model: model.into(),
                    output_dimensionality,
                },
            ),
        }
    }

    pub async fn create_batch_inline(
        &self,
        display_name: &str,
        priority: i64,
        texts: &[String],
    ) -> Result<BatchJob<Embedding>, LlmError> {
        self.processor
            .create_batch_inline(display_name, priority, texts)
            .await
    }

    pub async fn retrieve_batch_results(
        &self,
        name: &BatchName,
    ) -> Result<BatchJob<Embedding>, LlmError> {
        self.processor.retrieve_batch_results(name).await
    }

    pub async fn cancel_batch_job(&self, name: &BatchName) -> Result<(), LlmError> {
        self.processor.cancel_batch_job(name).await
    }

    pub async fn delete_batch_job(&self, name: &BatchName) -> Result<(), LlmError> {
        self.processor.delete_batch_job(name).await
    }

    pub async fn list_batch_jobs(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<BatchPage<Embedding>, LlmError> {
        self.processor.list_batch_jobs(page_size, page_token).await
    }
}

/// Image request preparer: prompts in, inline image data out.
pub struct ImageRequestPreparer {
    model: String,
}

impl BatchRequestPreparer for ImageRequestPreparer {
    type Request = String;
    type WireRequest = GeminiGenerateContentRequest;
    type WireResponse = BatchCreateResponse<GeminiGenerateContentResponse>;
    type Output = GeneratedImage;

    fn endpoint(&self) -> &'static str {
        BATCH_GENERATE_CONTENT
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn prepare(&self, prompt: &String) -> Result<GeminiGenerateContentRequest, LlmError> {
        if prompt.trim().is_empty() {
            return Err(LlmError::InvalidParameter(
                "image prompt cannot be blank".to_string(),
            ));
        }
        Ok(GeminiGenerateContentRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::text(prompt)],
            }],
            system_instruction: None,
            generation_config: None,
            tools: None,
        })
    }

    fn extract_results(
        &self,
        response: Option<Self::WireResponse>,
    ) -> Vec<BatchItemResult<GeneratedImage>> {
        let wrappers = response
            .and_then(|r| r.inlined_responses)
            .map(|r| r.inlined_responses)
            .unwrap_or_default();

        wrappers
            .into_iter()
            .map(|wrapper| match (wrapper.response, wrapper.error) {
                (Some(wire), _) => match wire.into_generated_image() {
                    Ok(image) => BatchItemResult::succeeded(None, image),
                    Err(error) => BatchItemResult::errored(None, error.to_string()),
                },
                (None, Some(status)) => BatchItemResult::errored(None, status_message(status)),
                (None, None) => BatchItemResult::errored(
                    None,
                    "batch item carried neither a response nor an error".to_string(),
                ),
            })
            .collect()
    }
}

/// Batch image generation model for Gemini.
pub struct GeminiBatchImageModel {
    processor: GeminiBatchProcessor<ImageRequestPreparer>,
}

impl GeminiBatchImageModel {
    pub fn new(service: GeminiService, model: impl Into<String>) -> Self {
        Self {
            processor: GeminiBatchProcessor::new(
                service,
                ImageRequestPreparer {
                    model: model.into(),
                },
            ),
        }
    }

    pub async fn create_batch_inline(
        &self,
        display_name: &str,
        priority: i64,
        prompts: &[String],
    ) -> Result<BatchJob<GeneratedImage>, LlmError> {
        self.processor
            .create_batch_inline(display_name, priority, prompts)
            .await
    }

    pub async fn retrieve_batch_results(
        &self,
        name: &BatchName,
    ) -> Result<BatchJob<GeneratedImage>, LlmError> {
        self.processor.retrieve_batch_results(name).await
    }

    pub async fn cancel_batch_job(&self, name: &BatchName) -> Result<(), LlmError> {
        self.processor.cancel_batch_job(name).await
    }

    pub async fn delete_batch_job(&self, name: &BatchName) -> Result<(), LlmError> {
        self.processor.delete_batch_job(name).await
    }

    pub async fn list_batch_jobs(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<BatchPage<GeneratedImage>, LlmError> {
        self.processor.list_batch_jobs(page_size, page_token).await
    }
}
