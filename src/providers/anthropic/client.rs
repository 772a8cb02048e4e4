//! Anthropic HTTP client: Messages API, Message Batches API, model listing.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use super::streaming::AnthropicEventConverter;
use super::types::*;
use crate::error::LlmError;
use crate::retry::{RetryOptions, maybe_retry};
use crate::stream::{ChatStream, sse_stream};
use crate::types::{ChatRequest, ChatResponse, ModelInfo};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Anthropic API client
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    api_key: SecretString,
    base_url: String,
    http_client: reqwest::Client,
    retry_options: Option<RetryOptions>,
}

impl AnthropicClient {
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
            "x-api-key",
            HeaderValue::from_str(self.api_key.expose_secret())
                .map_err(|e| LlmError::ConfigurationError(format!("Invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AnthropicErrorResponse>(&body)
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| body.chars().take(200).collect());
        Err(LlmError::api_error(status.as_u16(), message))
    }

    /// Send a chat request (POST /messages)
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let body = AnthropicChatRequest::from_chat_request(request)?;
        let url = format!("{}/messages", self.base_url);

        let call = || {
            let url = url.clone();
            let body = body.clone();
            async move {
                let response = self
                    .http_client
                    .post(&url)
                    .headers(self.headers()?)
                    .json(&body)
                    .send()
                    .await?;
                let response = Self::check_status(response).await?;
                let json = response.json::<serde_json::Value>().await?;
                serde_json::from_value::<AnthropicChatResponse>(json).map_err(|e| {
                    LlmError::ParseError(format!("Failed to parse Anthropic chat response: {e}"))
                })
            }
        };

        let wire = maybe_retry(self.retry_options.clone(), call).await?;
        Ok(wire.into_chat_response())
    }

    /// Send a streaming chat request (POST /messages with `"stream": true`)
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, LlmError> {
        let mut body = AnthropicChatRequest::from_chat_request(request)?;
        body.stream = Some(true);
        let url = format!("{}/messages", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        // Requesting a thinking budget is the opt-in for reasoning echo.
        let converter = AnthropicEventConverter::new()
            .with_return_thinking(request.thinking_budget_tokens.is_some());
        Ok(sse_stream(response, converter))
    }

    /// Count the input tokens a request would consume
    /// (POST /messages/count_tokens)
    pub async fn count_tokens(&self, request: &ChatRequest) -> Result<u32, LlmError> {
        let body = AnthropicCountTokensRequest::from_chat_request(request)?;
        let url = format!("{}/messages/count_tokens", self.base_url);

        let call = || {
            let url = url.clone();
            let body = body.clone();
            async move {
                let response = self
                    .http_client
                    .post(&url)
                    .headers(self.headers()?)
                    .json(&body)
                    .send()
                    .await?;
                let response = Self::check_status(response).await?;
                let json = response.json::<serde_json::Value>().await?;
                serde_json::from_value::<AnthropicCountTokensResponse>(json).map_err(|e| {
                    LlmError::ParseError(format!(
                        "Failed to parse Anthropic count tokens response: {e}"
                    ))
                })
            }
        };

        let wire = maybe_retry(self.retry_options.clone(), call).await?;
        Ok(wire.input_tokens)
    }

    /// List available models (GET /models)
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let url = format!("{}/models", self.base_url);

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
                serde_json::from_value::<AnthropicModelsResponse>(json).map_err(|e| {
                    LlmError::ParseError(format!("Failed to parse Anthropic models response: {e}"))
                })
            }
        };

        let wire = maybe_retry(self.retry_options.clone(), call).await?;
        Ok(wire
            .data
            .into_iter()
            .map(|entry| ModelInfo {
                id: entry.id,
                display_name: entry.display_name,
                created_at: entry.created_at,
            })
            .collect())
    }

    /// Create a message batch (POST /messages/batches)
    pub async fn create_batch(
        &self,
        request: &AnthropicCreateBatchRequest,
    ) -> Result<AnthropicMessageBatch, LlmError> {
        let url = format!("{}/messages/batches", self.base_url);

        let call = || {
            let url = url.clone();
            async move {
                let response = self
                    .http_client
                    .post(&url)
                    .headers(self.headers()?)
                    .json(request)
                    .send()
                    .await?;
                let response = Self::check_status(response).await?;
                let json = response.json::<serde_json::Value>().await?;
                serde_json::from_value::<AnthropicMessageBatch>(json).map_err(|e| {
                    LlmError::ParseError(format!(
                        "Failed to parse Anthropic message batch create response: {e}"
                    ))
                })
            }
        };

        maybe_retry(self.retry_options.clone(), call).await
    }

    /// Retrieve a message batch (GET /messages/batches/{id})
    pub async fn get_batch(&self, batch_id: &str) -> Result<AnthropicMessageBatch, LlmError> {
        let url = format!("{}/messages/batches/{batch_id}", self.base_url);

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
                serde_json::from_value::<AnthropicMessageBatch>(json).map_err(|e| {
                    LlmError::ParseError(format!(
                        "Failed to parse Anthropic message batch get response: {e}"
                    ))
                })
            }
        };

        maybe_retry(self.retry_options.clone(), call).await
    }

    /// Cancel a message batch (POST /messages/batches/{id}/cancel)
    pub async fn cancel_batch(&self, batch_id: &str) -> Result<AnthropicMessageBatch, LlmError> {
        let url = format!("{}/messages/batches/{batch_id}/cancel", self.base_url);

        let call = || {
            let url = url.clone();
            async move {
                let response = self
                    .http_client
                    .post(&url)
                    .headers(self.headers()?)
                    .send()
                    .await?;
                let response = Self::check_status(response).await?;
                let json = response.json::<serde_json::Value>().await?;
                serde_json::from_value::<AnthropicMessageBatch>(json).map_err(|e| {
                    LlmError::ParseError(format!(
                        "Failed to parse Anthropic message batch cancel response: {e}"
                    ))
                })
            }
        };

        maybe_retry(self.retry_options.clone(), call).await
    }

    /// List message batches (GET /messages/batches)
    pub async fn list_batches(
        &self,
        limit: Option<u32>,
        after_id: Option<String>,
    ) -> Result<AnthropicListBatchesResponse, LlmError> {
        let mut url = format!("{}/messages/batches", self.base_url);
        let mut qs = Vec::new();
        if let Some(after) = after_id {
            qs.push(format!("after_id={}", urlencoding::encode(&after)));
        }
        if let Some(limit) = limit {
            qs.push(format!("limit={limit}"));
        }
        if !qs.is_empty() {
            url.push('?');
            url.push_str(&qs.join("&"));
        }

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
                serde_json::from_value::<AnthropicListBatchesResponse>(json).map_err(|e| {
                    LlmError::ParseError(format!(
                        "Failed to parse Anthropic message batches list response: {e}"
                    ))
                })
            }
        };

        maybe_retry(self.retry_options.clone(), call).await
    }

    /// Fetch batch results (GET /messages/batches/{id}/results, JSONL body)
    pub async fn get_batch_results(
        &self,
        batch_id: &str,
    ) -> Result<Vec<AnthropicBatchResultLine>, LlmError> {
        let url = format!("{}/messages/batches/{batch_id}/results", self.base_url);

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
                let body = response.text().await?;
                let mut lines = Vec::new();
                for line in body.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let parsed =
                        serde_json::from_str::<AnthropicBatchResultLine>(line).map_err(|e| {
                            LlmError::ParseError(format!(
                                "Failed to parse Anthropic batch result line: {e}"
                            ))
                        })?;
                    lines.push(parsed);
                }
                Ok(lines)
            }
        };

        maybe_retry(self.retry_options.clone(), call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = AnthropicClient::new("test-key").with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn headers_carry_api_key_and_version() {
        let client = AnthropicClient::new("test-key");
        let headers = client.headers().unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "test-key");
        assert_eq!(headers.get("anthropic-version").unwrap(), API_VERSION);
    }
}
