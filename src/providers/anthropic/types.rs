//! Anthropic wire types (Messages API and Message Batches API).

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::types::{ChatRequest, ChatResponse, FinishReason, MessageRole, ToolCall, Usage};

/// Messages API request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<AnthropicThinking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicThinking {
    #[serde(rename = "type")]
    pub thinking_type: String,
    pub budget_tokens: u32,
}

impl AnthropicThinking {
    pub fn enabled(budget_tokens: u32) -> Self {
        Self {
            thinking_type: "enabled".to_string(),
            budget_tokens,
        }
    }
}

// The API requires max_tokens; used when the caller leaves it unset.
const DEFAULT_MAX_TOKENS: u32 = 4096;

impl AnthropicChatRequest {
    /// Build the wire request from a provider-neutral chat request.
    ///
    /// System messages move into the top-level `system` field; the rest of
    /// the conversation becomes the `messages` array.
    pub fn from_chat_request(request: &ChatRequest) -> Result<Self, LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::InvalidParameter(
                "messages cannot be empty".to_string(),
            ));
        }

        let mut system_parts: Vec<&str> = Vec::new();
        let mut messages = Vec::new();
        for message in &request.messages {
            match message.role {
                MessageRole::System => system_parts.push(&message.content),
                MessageRole::User | MessageRole::Tool => messages.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: message.content.clone(),
                }),
                MessageRole::Assistant => messages.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: message.content.clone(),
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n"))
        };

        let tools = request.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.parameters.clone(),
                })
                .collect()
        });

        Ok(Self {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            system,
            temperature: request.temperature,
            tools,
            thinking: request
                .thinking_budget_tokens
                .map(AnthropicThinking::enabled),
            stream: None,
        })
    }
}

/// Token counting request (POST /messages/count_tokens).
///
/// Same shape as a chat request minus `max_tokens`, which the endpoint
/// rejects.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicCountTokensRequest {
    pub model: String,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<AnthropicThinking>,
}

impl AnthropicCountTokensRequest {
    pub fn from_chat_request(request: &ChatRequest) -> Result<Self, LlmError> {
        let chat = AnthropicChatRequest::from_chat_request(request)?;
        Ok(Self {
            model: chat.model,
            messages: chat.messages,
            system: chat.system,
            tools: chat.tools,
            thinking: chat.thinking,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicCountTokensResponse {
    pub input_tokens: u32,
}

/// Messages API response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicChatResponse {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub content: Vec<AnthropicContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl From<AnthropicUsage> for Usage {
    fn from(usage: AnthropicUsage) -> Self {
        Usage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
            thinking_tokens: None,
        }
    }
}

pub(crate) fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "stop_sequence" => FinishReason::StopSequence,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

impl AnthropicChatResponse {
    /// Map the wire response into the provider-neutral response type.
    ///
    /// Text blocks join with newlines; thinking blocks concatenate.
    pub fn into_chat_response(self) -> ChatResponse {
        let mut texts: Vec<String> = Vec::new();
        let mut thinking = String::new();
        let mut thinking_signature: Option<String> = None;
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        for block in self.content {
            match block {
                AnthropicContentBlock::Text { text } => texts.push(text),
                AnthropicContentBlock::Thinking {
                    thinking: t,
                    signature,
                } => {
                    thinking.push_str(&t);
                    if signature.is_some() {
                        thinking_signature = signature;
                    }
                }
                AnthropicContentBlock::RedactedThinking { .. } => {
                    tracing::debug!("skipping redacted thinking block");
                }
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall {
                        id,
                        name,
                        arguments: input.to_string(),
                    });
                }
            }
        }

        let text = {
            let joined = texts.join("\n");
            if joined.trim().is_empty() { None } else { Some(joined) }
        };

        ChatResponse {
            id: Some(self.id),
            model: Some(self.model),
            text,
            thinking: if thinking.is_empty() { None } else { Some(thinking) },
            thinking_signature,
            tool_calls,
            usage: self.usage.map(Usage::from),
            finish_reason: self.stop_reason.as_deref().map(map_stop_reason),
        }
    }
}

/// Message batch resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessageBatch {
    pub id: String,
    pub processing_status: String,
    #[serde(default)]
    pub request_counts: AnthropicRequestCounts,
    pub results_url: Option<String>,
    #[allow(dead_code)]
    pub created_at: Option<String>,
    #[allow(dead_code)]
    pub ended_at: Option<String>,
    pub cancel_initiated_at: Option<String>,
    #[allow(dead_code)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnthropicRequestCounts {
    #[serde(default)]
    pub processing: u64,
    #[serde(default)]
    pub succeeded: u64,
    #[serde(default)]
    pub errored: u64,
    #[serde(default)]
    pub canceled: u64,
    #[serde(default)]
    pub expired: u64,
}

/// Batch creation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicCreateBatchRequest {
    pub requests: Vec<AnthropicBatchRequestItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicBatchRequestItem {
    pub custom_id: String,
    pub params: AnthropicChatRequest,
}

/// Batch list page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicListBatchesResponse {
    #[serde(default)]
    pub data: Vec<AnthropicMessageBatch>,
    #[serde(default)]
    pub has_more: bool,
    #[allow(dead_code)]
    pub first_id: Option<String>,
    pub last_id: Option<String>,
}

/// One line of the JSONL results document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicBatchResultLine {
    pub custom_id: String,
    pub result: AnthropicBatchItemOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicBatchItemOutcome {
    Succeeded { message: AnthropicChatResponse },
    Errored { error: serde_json::Value },
    Canceled,
    Expired,
}

/// Error envelope returned on non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorResponse {
    pub error: AnthropicErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorDetail {
    #[allow(dead_code)]
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub message: Option<String>,
}

/// Model listing response
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicModelsResponse {
    #[serde(default)]
    pub data: Vec<AnthropicModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicModelEntry {
    pub id: String,
    pub display_name: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
