//! Aggregation of partial stream events into a final response.

use std::collections::BTreeMap;

use crate::error::LlmError;
use crate::stream::events::ChatStreamEvent;
use crate::types::{ChatResponse, FinishReason, ResponseMetadata, ToolCall, Usage};

/// Externally observable increment produced by one appended event
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// New text content
    Text(String),
    /// New thinking content
    Thinking(String),
    /// New thinking signature content
    ThinkingSignature(String),
    /// A tool call finished accumulating
    ToolCallCompleted(ToolCall),
}

#[derive(Debug, Default)]
struct ToolCallBuilder {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallBuilder {
    fn finish(self) -> ToolCall {
        let arguments = if self.arguments.trim().is_empty() {
            "{}".to_string()
        } else {
            self.arguments
        };
        ToolCall {
            id: self.id,
            name: self.name,
            arguments,
        }
    }
}

/// Accumulator that folds stream events into one [`ChatResponse`].
///
/// Single-writer: owned by exactly one consumer, mutated via `&mut self`,
/// then consumed by [`StreamResponseBuilder::build`]. Feeding the same event
/// sequence always yields the same response.
#[derive(Debug, Default)]
pub struct StreamResponseBuilder {
    metadata: ResponseMetadata,
    text: String,
    thinking: String,
    thinking_signature: String,
    open_tools: BTreeMap<usize, ToolCallBuilder>,
    tool_calls: Vec<ToolCall>,
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
    return_thinking: bool,
}

impl StreamResponseBuilder {
    pub fn new() -> Self {
        Self {
            return_thinking: true,
            ..Self::default()
        }
    }

    /// Control whether reasoning deltas are recorded. When disabled,
    /// thinking and signature deltas contribute nothing.
    pub fn with_return_thinking(mut self, return_thinking: bool) -> Self {
        self.return_thinking = return_thinking;
        self
    }

    /// Record the finish reason; last write wins.
    pub fn set_finish_reason(&mut self, reason: FinishReason) {
        self.finish_reason = Some(reason);
    }

    /// Whether any tool call has started or completed so far
    pub fn has_tool_activity(&self) -> bool {
        !self.open_tools.is_empty() || !self.tool_calls.is_empty()
    }

    /// Fold one partial event into the accumulated state.
    ///
    /// Returns the increment a caller may want to surface to handlers, if
    /// the event produced one.
    pub fn append(&mut self, event: &ChatStreamEvent) -> Option<StreamUpdate> {
        match event {
            ChatStreamEvent::StreamStart { metadata } => {
                if metadata.id.is_some() {
                    self.metadata.id = metadata.id.clone();
                }
                if metadata.model.is_some() {
                    self.metadata.model = metadata.model.clone();
                }
                if metadata.created_at.is_some() {
                    self.metadata.created_at = metadata.created_at;
                }
                None
            }
            ChatStreamEvent::ContentDelta { delta, .. } => {
                self.text.push_str(delta);
                Some(StreamUpdate::Text(delta.clone()))
            }
            ChatStreamEvent::ThinkingDelta { delta } => {
                if !self.return_thinking {
                    return None;
                }
                self.thinking.push_str(delta);
                Some(StreamUpdate::Thinking(delta.clone()))
            }
            ChatStreamEvent::ThinkingSignatureDelta { delta } => {
                if !self.return_thinking {
                    return None;
                }
                self.thinking_signature.push_str(delta);
                Some(StreamUpdate::ThinkingSignature(delta.clone()))
            }
            ChatStreamEvent::ToolCallDelta {
                id,
                function_name,
                arguments_delta,
                index,
            } => {
                let entry = self.open_tools.entry(index.unwrap_or(0)).or_default();
                if entry.id.is_empty() && !id.is_empty() {
                    entry.id = id.clone();
                }
                if let Some(name) = function_name
                    && entry.name.is_empty()
                {
                    entry.name = name.clone();
                }
                if let Some(fragment) = arguments_delta {
                    entry.arguments.push_str(fragment);
                }
                None
            }
            ChatStreamEvent::ToolCallEnd { index } => {
                let tool_call = self.open_tools.remove(index)?.finish();
                self.tool_calls.push(tool_call.clone());
                Some(StreamUpdate::ToolCallCompleted(tool_call))
            }
            ChatStreamEvent::UsageUpdate { usage } => {
                self.usage.get_or_insert_with(Usage::default).merge_from(usage);
                None
            }
            ChatStreamEvent::StreamEnd { .. } | ChatStreamEvent::Error { .. } => None,
        }
    }

    /// Consume the builder and produce the final immutable response.
    ///
    /// A stream that produced neither text nor tool calls is a protocol
    /// violation and fails with [`LlmError::StreamError`].
    pub fn build(mut self) -> Result<ChatResponse, LlmError> {
        // Tool blocks the provider never closed finalize in index order.
        let leftover = std::mem::take(&mut self.open_tools);
        for (_, open) in leftover {
            self.tool_calls.push(open.finish());
        }

        if self.text.trim().is_empty() && self.tool_calls.is_empty() {
            return Err(LlmError::StreamError(
                "stream produced neither text content nor tool calls".to_string(),
            ));
        }

        let text = if self.text.trim().is_empty() {
            None
        } else {
            Some(self.text)
        };
        let thinking = if self.thinking.is_empty() {
            None
        } else {
            Some(self.thinking)
        };
        let thinking_signature = if self.thinking_signature.is_empty() {
            None
        } else {
            Some(self.thinking_signature)
        };

        Ok(ChatResponse {
            id: self.metadata.id,
            model: self.metadata.model,
            text,
            thinking,
            thinking_signature,
            tool_calls: self.tool_calls,
            usage: self.usage,
            finish_reason: self.finish_reason,
        })
    }
}
