//! Gemini HTTP service: generateContent, embedContent, batch operations and
//! model listing.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::streaming::GeminiEventConverter;
use super::types::*;
use crate::error::LlmError;
use crate::retry::{RetryOptions, maybe_retry};
use crate::stream::{ChatStream, sse_stream};
use crate::types::{ChatRequest, ChatResponse, Embedding, ModelInfo};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Batch verb for chat generation
pub const BATCH_GENERATE_CONTENT: &str = "batchGenerateContent";
/// Batch verb for embeddings
pub const ASYNC_BATCH_EMBED_CONTENT: &str = "asyncBatchEmbedContent";

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiService {
    api_key: SecretString,
    base_url: String,
    http_client: reqwest::Client,
    retry_options: Option<RetryOptions>,
}

impl GeminiService {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: reqwest::Client::new(),
            retry_options: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn with_retry_options(mut self, options: RetryOptions) -> Self {
        self.retry_options = Some(options);
        self
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(self.api_key.expose_secret())
                .map_err(|e| LlmError::ConfigurationError(format!("Invalid API key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.chars().take(200).collect());
        Err(LlmError::api_error(status.as_u16(), message))
    }

    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        url: String,
        what: &str,
    ) -> Result<T, LlmError> {
        let call = || {
            let url = url.clone();
            async move {
                let response = self
                    .http_client
                    .get(&url)
                    .headers(self.headers()?)
                    .send()
                    .await?;
                let response = Self::check_status(response).await?;
                let json = response.json::<serde_json::Value>().await?;
                serde_json::from_value::<T>(json).map_err(|e| {
                    LlmError::ParseError(format!("Failed to parse Gemini {what} response: {e}"))
                })
            }
        };
        maybe_retry(self.retry_options.clone(), call).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned + Send>(
        &self,
        url: String,
        body: &B,
        what: &str,
    ) -> Result<T, LlmError> {
        let call = || {
            let url = url.clone();
            async move {
                let response = self
                    .http_client
                    .post(&url)
                    .headers(self.headers()?)
                    .json(body)
                    .send()
                    .await?;
                let response = Self::check_status(response).await?;
                let json = response.json::<serde_json::Value>().await?;
                serde_json::from_value::<T>(json).map_err(|e| {
                    LlmError::ParseError(format!("Failed to parse Gemini {what} response: {e}"))
                })
            }
        };
        maybe_retry(self.retry_options.clone(), call).await
    }

    /// Generate content (POST /models/{model}:generateContent)
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GeminiGenerateContentRequest,
    ) -> Result<GeminiGenerateContentResponse, LlmError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        self.post_json(url, request, "generateContent").await
    }

    /// Send a provider-neutral chat request
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let body = GeminiGenerateContentRequest::from_chat_request(request)?;
        let wire = self.generate_content(&request.model, &body).await?;
        Ok(wire.into_chat_response())
    }

    /// Send a streaming chat request
    /// (POST /models/{model}:streamGenerateContent?alt=sse)
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, LlmError> {
        let body = GeminiGenerateContentRequest::from_chat_request(request)?;
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );

        let response = self
            .http_client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        // Requesting a thinking budget is the opt-in for reasoning echo.
        let converter = GeminiEventConverter::new()
            .with_return_thinking(request.thinking_budget_tokens.is_some());
        Ok(sse_stream(response, converter))
    }

    /// Count the tokens a request would consume
    /// (POST /models/{model}:countTokens)
    pub async fn count_tokens(&self, request: &ChatRequest) -> Result<u32, LlmError> {
        let wire = GeminiGenerateContentRequest::from_chat_request(request)?;
        let body = GeminiCountTokensRequest {
            contents: wire.contents,
        };
        let url = format!("{}/models/{}:countTokens", self.base_url, request.model);
        let response: GeminiCountTokensResponse =
            self.post_json(url, &body, "countTokens").await?;
        Ok(response.total_tokens)
    }

    /// Embed a text (POST /models/{model}:embedContent)
    pub async fn embed_content(
        &self,
        model: &str,
        request: &GeminiEmbedContentRequest,
    ) -> Result<Embedding, LlmError> {
        let url = format!("{}/models/{model}:embedContent", self.base_url);
        let wire: GeminiEmbedContentResponse = self.post_json(url, request, "embedContent").await?;
        let embedding = wire.embedding.ok_or_else(|| {
            LlmError::ParseError("embedContent response contains no embedding".to_string())
        })?;
        Ok(Embedding {
            values: embedding.values,
        })
    }

    /// List available models (GET /models)
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let url = format!("{}/models", self.base_url);
        let wire: GeminiModelsResponse = self.get_json(url, "models").await?;
        Ok(wire
            .models
            .into_iter()
            .map(|entry| ModelInfo {
                id: entry.name,
                display_name: entry.display_name,
                created_at: None,
            })
            .collect())
    }

    /// Create a batch (POST /models/{model}:{endpoint})
    pub async fn batch_create<B: Serialize + Sync>(
        &self,
        model: &str,
        endpoint: &str,
        body: &B,
    ) -> Result<Operation<serde_json::Value>, LlmError> {
        let url = format!("{}/models/{model}:{endpoint}", self.base_url);
        self.post_json(url, body, "batch create").await
    }

    /// Retrieve a batch operation (GET /{name})
    pub async fn batch_retrieve(
        &self,
        name: &str,
    ) -> Result<Operation<serde_json::Value>, LlmError> {
        let url = format!("{}/{name}", self.base_url);
        self.get_json(url, "batch retrieve").await
    }

    /// Request batch cancellation (POST /{name}:cancel)
    pub async fn batch_cancel(&self, name: &str) -> Result<(), LlmError> {
        let url = format!("{}/{name}:cancel", self.base_url);

        let call = || {
            let url = url.clone();
            async move {
                let response = self
                    .http_client
                    .post(&url)
                    .headers(self.headers()?)
                    .json(&serde_json::json!({}))
                    .send()
                    .await?;
                Self::check_status(response).await?;
                Ok(())
            }
        };
        maybe_retry(self.retry_options.clone(), call).await
    }

    /// Delete a batch operation (DELETE /{name})
    pub async fn batch_delete(&self, name: &str) -> Result<(), LlmError> {
        let url = format!("{}/{name}", self.base_url);

        let call = || {
            let url = url.clone();
            async move {
                let response = self
                    .http_client
                    .delete(&url)
                    .headers(self.headers()?)
                    .send()
                    .await?;
                Self::check_status(response).await?;
                Ok(())
            }
        };
        maybe_retry(self.retry_options.clone(), call).await
    }

    /// List batch operations (GET /batches)
    pub async fn batch_list(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<ListOperationsResponse, LlmError> {
        let mut url = format!("{}/batches", self.base_url);
        let mut qs = Vec::new();
        if let Some(size) = page_size {
            qs.push(format!("pageSize={size}"));
        }
        if let Some(token) = page_token {
            qs.push(format!("pageToken={}", urlencoding::encode(&token)));
        }
        if !qs.is_empty() {
            url.push('?');
            url.push_str(&qs.join("&"));
        }
        self.get_json(url, "batch list").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let service = GeminiService::new("test-key").with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(service.base_url, "http://localhost:8080/v1beta");
    }

    #[test]
    fn headers_carry_goog_api_key() {
        let service = GeminiService::new("test-key");
        let headers = service.headers().unwrap();
        assert_eq!(headers.get("x-goog-api-key").unwrap(), "test-key");
    }
}
