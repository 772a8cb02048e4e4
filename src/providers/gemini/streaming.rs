//! Conversion of Gemini SSE chunks into chat stream events.

use tracing::warn;

use super::types::{GeminiGenerateContentResponse, map_finish_reason};
use crate::error::LlmError;
use crate::stream::{ChatStreamEvent, SseEventConverter, StreamResponseBuilder};
use crate::types::{ResponseMetadata, Usage};

/// Folds `streamGenerateContent` chunks into [`ChatStreamEvent`]s.
///
/// Every chunk is a complete `GenerateContentResponse`; parts within it map
/// to deltas. Gemini sends whole function calls, so each one becomes a
/// `ToolCallDelta` immediately followed by `ToolCallEnd`.
pub struct GeminiEventConverter {
    builder: Option<StreamResponseBuilder>,
    started: bool,
    tool_index: usize,
    saw_tool_call: bool,
    return_thinking: bool,
}

impl GeminiEventConverter {
    pub fn new() -> Self {
        Self {
            builder: Some(StreamResponseBuilder::new()),
            started: false,
            tool_index: 0,
            saw_tool_call: false,
            return_thinking: true,
        }
    }

    /// Control whether thought parts are surfaced and recorded.
    pub fn with_return_thinking(mut self, return_thinking: bool) -> Self {
        self.return_thinking = return_thinking;
        self.builder = self
            .builder
            .take()
            .map(|b| b.with_return_thinking(return_thinking));
        self
    }

    fn emit(&mut self, event: ChatStreamEvent, out: &mut Vec<Result<ChatStreamEvent, LlmError>>) {
        if let Some(builder) = self.builder.as_mut() {
            builder.append(&event);
        }
        out.push(Ok(event));
    }

    fn finish(&mut self) -> Vec<Result<ChatStreamEvent, LlmError>> {
        match self.builder.take() {
            Some(builder) => match builder.build() {
                Ok(response) => vec![Ok(ChatStreamEvent::StreamEnd { response })],
                Err(error) => vec![Err(error)],
            },
            None => Vec::new(),
        }
    }

    fn convert_chunk(
        &mut self,
        chunk: GeminiGenerateContentResponse,
    ) -> Vec<Result<ChatStreamEvent, LlmError>> {
        let mut out = Vec::new();

        if !self.started {
            self.started = true;
            self.emit(
                ChatStreamEvent::StreamStart {
                    metadata: ResponseMetadata {
                        id: chunk.response_id.clone(),
                        model: chunk.model_version.clone(),
                        created_at: None,
                    },
                },
                &mut out,
            );
        }

        let mut finish_reason = None;
        if let Some(candidate) = chunk.candidates.into_iter().next() {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(signature) = part.thought_signature
                        && self.return_thinking
                    {
                        self.emit(
                            ChatStreamEvent::ThinkingSignatureDelta { delta: signature },
                            &mut out,
                        );
                    }
                    if let Some(call) = part.function_call {
                        let index = self.tool_index;
                        self.tool_index += 1;
                        self.saw_tool_call = true;
                        self.emit(
                            ChatStreamEvent::ToolCallDelta {
                                id: format!("call_{}", uuid::Uuid::new_v4()),
                                function_name: Some(call.name),
                                arguments_delta: call.args.map(|a| a.to_string()),
                                index: Some(index),
                            },
                            &mut out,
                        );
                        self.emit(ChatStreamEvent::ToolCallEnd { index }, &mut out);
                        continue;
                    }
                    if let Some(text) = part.text {
                        if part.thought.unwrap_or(false) {
                            if self.return_thinking {
                                self.emit(ChatStreamEvent::ThinkingDelta { delta: text }, &mut out);
                            }
                        } else {
                            self.emit(
                                ChatStreamEvent::ContentDelta {
                                    delta: text,
                                    index: Some(0),
                                },
                                &mut out,
                            );
                        }
                    }
                }
            }
            finish_reason = candidate.finish_reason;
        }

        if let Some(reason) = finish_reason
            && let Some(builder) = self.builder.as_mut()
        {
            builder.set_finish_reason(map_finish_reason(&reason, self.saw_tool_call));
        }

        if let Some(metadata) = chunk.usage_metadata {
            self.emit(
                ChatStreamEvent::UsageUpdate {
                    usage: Usage::from(metadata),
                },
                &mut out,
            );
        }

        out
    }
}

impl Default for GeminiEventConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl SseEventConverter for GeminiEventConverter {
    fn convert_event(
        &mut self,
        event: &eventsource_stream::Event,
    ) -> Vec<Result<ChatStreamEvent, LlmError>> {
        if event.data.trim() == "[DONE]" {
            return self.finish();
        }
        match serde_json::from_str::<GeminiGenerateContentResponse>(&event.data) {
            Ok(chunk) => self.convert_chunk(chunk),
            Err(error) => {
                warn!("failed to parse Gemini stream chunk: {error}");
                vec![Err(LlmError::ParseError(format!(
                    "Failed to parse Gemini stream chunk: {error}, data: {}",
                    event.data
                )))]
            }
        }
    }

    fn handle_stream_end(&mut self) -> Vec<Result<ChatStreamEvent, LlmError>> {
        self.finish()
    }
}
