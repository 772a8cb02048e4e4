//! Gemini wire types (generateContent, embedContent and the batch
//! long-running operation envelope).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::types::{
    ChatRequest, ChatResponse, FinishReason, GeneratedImage, MessageRole, ToolCall, Usage,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set when this part carries model reasoning rather than answer text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFunctionCall {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

/// generateContent request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerateContentRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<GeminiThinkingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiThinkingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_thoughts: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFunctionDeclaration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
}

impl GeminiGenerateContentRequest {
    /// Build the wire request from a provider-neutral chat request.
    ///
    /// System messages become the `systemInstruction`; user and assistant
    /// turns map to `user` / `model` roles.
    pub fn from_chat_request(request: &ChatRequest) -> Result<Self, LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::InvalidParameter(
                "messages cannot be empty".to_string(),
            ));
        }

        let mut system_parts: Vec<GeminiPart> = Vec::new();
        let mut contents = Vec::new();
        for message in &request.messages {
            match message.role {
                MessageRole::System => system_parts.push(GeminiPart::text(&message.content)),
                MessageRole::User | MessageRole::Tool => contents.push(GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart::text(&message.content)],
                }),
                MessageRole::Assistant => contents.push(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![GeminiPart::text(&message.content)],
                }),
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        let thinking_config = request
            .thinking_budget_tokens
            .map(|budget| GeminiThinkingConfig {
                thinking_budget: Some(budget),
                include_thoughts: Some(true),
            });
        let generation_config =
            if request.max_tokens.is_none() && request.temperature.is_none() && thinking_config.is_none() {
                None
            } else {
                Some(GeminiGenerationConfig {
                    max_output_tokens: request.max_tokens,
                    temperature: request.temperature,
                    thinking_config,
                })
            };

        let tools = request.tools.as_ref().map(|tools| {
            vec![GeminiTool {
                function_declarations: tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        });

        Ok(Self {
            contents,
            system_instruction,
            generation_config,
            tools,
        })
    }
}

/// generateContent response body (shared by unary and stream chunks)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerateContentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thoughts_token_count: Option<u32>,
}

impl From<GeminiUsageMetadata> for Usage {
    fn from(metadata: GeminiUsageMetadata) -> Self {
        Usage {
            prompt_tokens: metadata.prompt_token_count,
            completion_tokens: metadata.candidates_token_count,
            total_tokens: metadata.total_token_count,
            thinking_tokens: metadata.thoughts_token_count,
        }
    }
}

pub(crate) fn map_finish_reason(reason: &str, saw_tool_call: bool) -> FinishReason {
    match reason {
        "STOP" => {
            if saw_tool_call {
                FinishReason::ToolCalls
            } else {
                FinishReason::Stop
            }
        }
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        "MALFORMED_FUNCTION_CALL" => FinishReason::Error,
        other => FinishReason::Other(other.to_string()),
    }
}

impl GeminiGenerateContentResponse {
    /// Map the wire response into the provider-neutral response type.
    pub fn into_chat_response(self) -> ChatResponse {
        let mut text = String::new();
        let mut thinking = String::new();
        let mut thinking_signature: Option<String> = None;
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut finish_reason = None;

        if let Some(candidate) = self.candidates.into_iter().next() {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(signature) = part.thought_signature {
                        thinking_signature = Some(signature);
                    }
                    if let Some(call) = part.function_call {
                        tool_calls.push(ToolCall {
                            id: format!("call_{}", uuid::Uuid::new_v4()),
                            name: call.name,
                            arguments: call
                                .args
                                .map(|a| a.to_string())
                                .unwrap_or_else(|| "{}".to_string()),
                        });
                        continue;
                    }
                    if let Some(part_text) = part.text {
                        if part.thought.unwrap_or(false) {
                            thinking.push_str(&part_text);
                        } else {
                            text.push_str(&part_text);
                        }
                    }
                }
            }
            finish_reason = candidate
                .finish_reason
                .as_deref()
                .map(|r| map_finish_reason(r, !tool_calls.is_empty()));
        }

        ChatResponse {
            id: self.response_id,
            model: self.model_version,
            text: if text.trim().is_empty() { None } else { Some(text) },
            thinking: if thinking.is_empty() { None } else { Some(thinking) },
            thinking_signature,
            tool_calls,
            usage: self.usage_metadata.map(Usage::from),
            finish_reason,
        }
    }

    /// Extract the first generated image from an image-generation response.
    pub fn into_generated_image(self) -> Result<GeneratedImage, LlmError> {
        for candidate in self.candidates {
            let Some(content) = candidate.content else {
                continue;
            };
            for part in content.parts {
                if let Some(inline) = part.inline_data {
                    return Ok(GeneratedImage {
                        base64_data: inline.data,
                        mime_type: inline.mime_type,
                    });
                }
            }
        }
        Err(LlmError::ParseError(
            "response contains no inline image data".to_string(),
        ))
    }
}

/// countTokens request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCountTokensRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCountTokensResponse {
    #[serde(default)]
    pub total_tokens: u32,
}

/// embedContent request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiEmbedContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub content: GeminiContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dimensionality: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiEmbedContentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<GeminiContentEmbedding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiContentEmbedding {
    #[serde(default)]
    pub values: Vec<f32>,
}

/// Long-running operation envelope returned by the batch endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation<T> {
    pub name: String,
    /// Free-form metadata map; carries the `state` string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GeminiStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
}

impl<T> Operation<T> {
    /// The `state` string from operation metadata, if present
    pub fn state(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("state"))
            .and_then(|v| v.as_str())
    }
}

/// google.rpc.Status payload of a failed operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

/// Batch creation body for inline requests
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest<T> {
    pub batch: BatchCreatePayload<T>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreatePayload<T> {
    pub display_name: String,
    pub input_config: BatchInputConfig<T>,
    pub priority: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInputConfig<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<BatchInlinedRequests<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInlinedRequests<T> {
    pub requests: Vec<BatchInlinedRequest<T>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInlinedRequest<T> {
    pub request: T,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Operation `response` payload for inline batches
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResponse<T> {
    pub inlined_responses: Option<BatchInlinedResponses<T>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInlinedResponses<T> {
    #[serde(default = "Vec::new")]
    pub inlined_responses: Vec<BatchInlinedResponseWrapper<T>>,
}

/// Exactly one of `response` / `error` is set per item
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInlinedResponseWrapper<T> {
    pub response: Option<T>,
    pub error: Option<GeminiStatus>,
}

/// Batch listing page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOperationsResponse {
    #[serde(default)]
    pub operations: Vec<Operation<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Model listing response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModelsResponse {
    #[serde(default)]
    pub models: Vec<GeminiModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModelEntry {
    pub name: String,
    pub display_name: Option<String>,
}

pub(crate) fn parse_operation_payload<T: DeserializeOwned>(
    response: Option<serde_json::Value>,
) -> Result<Option<T>, LlmError> {
    match response {
        Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
            LlmError::ParseError(format!("Failed to parse Gemini batch response payload: {e}"))
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    #[test]
    fn chat_request_maps_roles_and_system_instruction() {
        let request = ChatRequest::new(
            "gemini-2.5-flash",
            vec![
                ChatMessage::system("answer in French"),
                ChatMessage::user("capital of France?"),
                ChatMessage::assistant("Paris"),
            ],
        )
        .with_max_tokens(128);

        let wire = GeminiGenerateContentRequest::from_chat_request(&request).unwrap();
        assert!(wire.system_instruction.is_some());
        assert_eq!(wire.contents.len(), 2);
        assert_eq!(wire.contents[0].role.as_deref(), Some("user"));
        assert_eq!(wire.contents[1].role.as_deref(), Some("model"));
        assert_eq!(
            wire.generation_config.unwrap().max_output_tokens,
            Some(128)
        );
    }

    #[test]
    fn response_mapping_separates_thought_parts() {
        let wire: GeminiGenerateContentResponse = serde_json::from_value(serde_json::json!({
            "responseId": "resp-1",
            "modelVersion": "gemini-2.5-flash",
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "considering the question", "thought": true},
                        {"text": "Paris", "thoughtSignature": "sig=="}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6, "thoughtsTokenCount": 3}
        }))
        .unwrap();

        let response = wire.into_chat_response();
        assert_eq!(response.text.as_deref(), Some("Paris"));
        assert_eq!(response.thinking.as_deref(), Some("considering the question"));
        assert_eq!(response.thinking_signature.as_deref(), Some("sig=="));
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().thinking_tokens, Some(3));
    }

    #[test]
    fn function_call_parts_become_tool_calls() {
        let wire: GeminiGenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "get_weather", "args": {"city": "Paris"}}}]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let response = wire.into_chat_response();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "get_weather");
        assert_eq!(response.tool_calls[0].arguments, "{\"city\":\"Paris\"}");
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(response.text, None);
    }

    #[test]
    fn operation_state_reads_from_metadata() {
        let op: Operation<serde_json::Value> = serde_json::from_value(serde_json::json!({
            "name": "batches/abc",
            "metadata": {
                "@type": "type.googleapis.com/google.ai.generativelanguage.v1main.GenerateContentBatch",
                "state": "BATCH_STATE_RUNNING"
            }
        }))
        .unwrap();
        assert_eq!(op.state(), Some("BATCH_STATE_RUNNING"));
        assert!(!op.done);
    }

    #[test]
    fn inlined_responses_deserialize_with_nested_wrapper() {
        let payload: BatchCreateResponse<GeminiGenerateContentResponse> =
            serde_json::from_value(serde_json::json!({
                "@type": "type.googleapis.com/google.ai.generativelanguage.v1main.GenerateContentBatchOutput",
                "inlinedResponses": {
                    "inlinedResponses": [
                        {"response": {"candidates": [{"content": {"parts": [{"text": "ok"}], "role": "model"}}]}},
                        {"error": {"code": 4, "message": "Deadline expired"}}
                    ]
                }
            }))
            .unwrap();
        let wrappers = payload.inlined_responses.unwrap().inlined_responses;
        assert_eq!(wrappers.len(), 2);
        assert!(wrappers[0].response.is_some());
        assert_eq!(wrappers[1].error.as_ref().unwrap().code, Some(4));
    }
}
