//! Anthropic streaming event conversion.
//!
//! Translates Messages API SSE frames (`message_start`, `content_block_*`,
//! `message_delta`, `message_stop`) into chat stream events, accumulating
//! the final response along the way.

use std::collections::HashMap;

use serde::Deserialize;

use super::types::{AnthropicUsage, map_stop_reason};
use crate::error::LlmError;
use crate::stream::builder::StreamResponseBuilder;
use crate::stream::events::ChatStreamEvent;
use crate::stream::sse::SseEventConverter;
use crate::types::{ResponseMetadata, Usage};

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    message: Option<AnthropicStreamMessage>,
    index: Option<usize>,
    content_block: Option<AnthropicStreamContentBlock>,
    delta: Option<AnthropicStreamDelta>,
    usage: Option<AnthropicUsage>,
    error: Option<AnthropicStreamError>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamMessage {
    id: Option<String>,
    model: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamDelta {
    #[serde(rename = "type")]
    delta_type: Option<String>,
    text: Option<String>,
    thinking: Option<String>,
    signature: Option<String>,
    partial_json: Option<String>,
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamError {
    #[allow(dead_code)]
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
enum BlockKind {
    Text,
    Thinking,
    Tool { id: String },
}

/// Stateful converter for Anthropic SSE frames.
///
/// Owns the response accumulator; `message_stop` (or stream exhaustion)
/// consumes it into the terminal `StreamEnd` event.
pub struct AnthropicEventConverter {
    builder: Option<StreamResponseBuilder>,
    blocks: HashMap<usize, BlockKind>,
    return_thinking: bool,
}

impl AnthropicEventConverter {
    pub fn new() -> Self {
        Self {
            builder: Some(StreamResponseBuilder::new()),
            blocks: HashMap::new(),
            return_thinking: true,
        }
    }

    /// Control whether reasoning deltas are surfaced and recorded.
    pub fn with_return_thinking(mut self, return_thinking: bool) -> Self {
        self.return_thinking = return_thinking;
        self.builder = self
            .builder
            .take()
            .map(|b| b.with_return_thinking(return_thinking));
        self
    }

    fn emit(
        &mut self,
        out: &mut Vec<Result<ChatStreamEvent, LlmError>>,
        event: ChatStreamEvent,
    ) {
        if let Some(builder) = self.builder.as_mut() {
            builder.append(&event);
        }
        out.push(Ok(event));
    }

    fn finish(&mut self) -> Vec<Result<ChatStreamEvent, LlmError>> {
        match self.builder.take() {
            Some(builder) => match builder.build() {
                Ok(response) => vec![Ok(ChatStreamEvent::StreamEnd { response })],
                Err(e) => vec![Err(e)],
            },
            None => Vec::new(),
        }
    }

    fn convert_parsed(&mut self, event: AnthropicStreamEvent) -> Vec<Result<ChatStreamEvent, LlmError>> {
        let mut out = Vec::new();
        match event.event_type.as_str() {
            "ping" => {}
            "message_start" => {
                if let Some(message) = event.message {
                    let metadata = ResponseMetadata {
                        id: message.id,
                        model: message.model,
                        created_at: Some(chrono::Utc::now()),
                    };
                    self.emit(&mut out, ChatStreamEvent::StreamStart { metadata });
                    if let Some(usage) = message.usage {
                        self.emit(
                            &mut out,
                            ChatStreamEvent::UsageUpdate {
                                usage: Usage::from(usage),
                            },
                        );
                    }
                }
            }
            "content_block_start" => {
                let index = event.index.unwrap_or(0);
                if let Some(block) = event.content_block {
                    match block.block_type.as_str() {
                        "tool_use" => {
                            let id = block.id.unwrap_or_default();
                            self.blocks.insert(index, BlockKind::Tool { id: id.clone() });
                            self.emit(
                                &mut out,
                                ChatStreamEvent::ToolCallDelta {
                                    id,
                                    function_name: block.name,
                                    arguments_delta: None,
                                    index: Some(index),
                                },
                            );
                        }
                        "thinking" | "redacted_thinking" => {
                            self.blocks.insert(index, BlockKind::Thinking);
                        }
                        _ => {
                            self.blocks.insert(index, BlockKind::Text);
                        }
                    }
                }
            }
            "content_block_delta" => {
                let index = event.index.unwrap_or(0);
                if let Some(delta) = event.delta {
                    match delta.delta_type.as_deref() {
                        Some("text_delta") => {
                            if let Some(text) = delta.text {
                                self.emit(
                                    &mut out,
                                    ChatStreamEvent::ContentDelta {
                                        delta: text,
                                        index: Some(index),
                                    },
                                );
                            }
                        }
                        Some("thinking_delta") => {
                            if let Some(thinking) = delta.thinking
                                && self.return_thinking
                            {
                                self.emit(
                                    &mut out,
                                    ChatStreamEvent::ThinkingDelta { delta: thinking },
                                );
                            }
                        }
                        Some("signature_delta") => {
                            if let Some(signature) = delta.signature
                                && self.return_thinking
                            {
                                self.emit(
                                    &mut out,
                                    ChatStreamEvent::ThinkingSignatureDelta { delta: signature },
                                );
                            }
                        }
                        Some("input_json_delta") => {
                            let id = match self.blocks.get(&index) {
                                Some(BlockKind::Tool { id }) => id.clone(),
                                _ => String::new(),
                            };
                            if let Some(partial_json) = delta.partial_json {
                                self.emit(
                                    &mut out,
                                    ChatStreamEvent::ToolCallDelta {
                                        id,
                                        function_name: None,
                                        arguments_delta: Some(partial_json),
                                        index: Some(index),
                                    },
                                );
                            }
                        }
                        other => {
                            tracing::debug!("ignoring unknown content delta type: {other:?}");
                        }
                    }
                }
            }
            "content_block_stop" => {
                let index = event.index.unwrap_or(0);
                if matches!(self.blocks.get(&index), Some(BlockKind::Tool { .. })) {
                    self.emit(&mut out, ChatStreamEvent::ToolCallEnd { index });
                }
            }
            "message_delta" => {
                if let Some(delta) = event.delta
                    && let Some(stop_reason) = delta.stop_reason
                    && let Some(builder) = self.builder.as_mut()
                {
                    builder.set_finish_reason(map_stop_reason(&stop_reason));
                }
                if let Some(usage) = event.usage {
                    self.emit(
                        &mut out,
                        ChatStreamEvent::UsageUpdate {
                            usage: Usage::from(usage),
                        },
                    );
                }
            }
            "message_stop" => {
                out.extend(self.finish());
            }
            "error" => {
                let message = event
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "unknown stream error".to_string());
                self.builder = None;
                out.push(Ok(ChatStreamEvent::Error { error: message }));
            }
            other => {
                tracing::debug!("ignoring unknown Anthropic stream event: {other}");
            }
        }
        out
    }
}

impl Default for AnthropicEventConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl SseEventConverter for AnthropicEventConverter {
    fn convert_event(
        &mut self,
        event: &eventsource_stream::Event,
    ) -> Vec<Result<ChatStreamEvent, LlmError>> {
        if event.data.trim() == "[DONE]" {
            return self.finish();
        }
        match serde_json::from_str::<AnthropicStreamEvent>(&event.data) {
            Ok(parsed) => self.convert_parsed(parsed),
            Err(e) => {
                tracing::warn!("failed to parse Anthropic stream event: {e}");
                vec![Err(LlmError::ParseError(format!(
                    "Failed to parse Anthropic stream event: {e}, data: {}",
                    event.data
                )))]
            }
        }
    }

    fn handle_stream_end(&mut self) -> Vec<Result<ChatStreamEvent, LlmError>> {
        self.finish()
    }
}
