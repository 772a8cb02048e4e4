#![allow(clippy::large_enum_variant)]
//! Streaming event types for real-time responses

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::types::{ChatResponse, ResponseMetadata, Usage};

/// Chat streaming event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatStreamEvent {
    /// Stream start event with metadata
    StreamStart {
        /// Response metadata
        metadata: ResponseMetadata,
    },
    /// Content delta (incremental text)
    ContentDelta {
        /// The incremental text content
        delta: String,
        /// Index of the content block this delta belongs to
        index: Option<usize>,
    },
    /// Thinking/reasoning content delta (for models that support internal reasoning)
    ThinkingDelta {
        /// The incremental thinking content
        delta: String,
    },
    /// Thinking signature delta (opaque verification data for reasoning blocks)
    ThinkingSignatureDelta {
        /// The incremental signature content
        delta: String,
    },
    /// Tool call delta
    ToolCallDelta {
        /// Tool call ID
        id: String,
        /// Function name (if this is the start of a tool call)
        function_name: Option<String>,
        /// Incremental arguments
        arguments_delta: Option<String>,
        /// Index of the tool call
        index: Option<usize>,
    },
    /// Tool call finished accumulating arguments
    ToolCallEnd {
        /// Index of the tool call
        index: usize,
    },
    /// Usage statistics update
    UsageUpdate {
        /// Token usage information
        usage: Usage,
    },
    /// Stream end event with final response
    StreamEnd {
        /// Final response
        response: ChatResponse,
    },
    /// Error occurred during streaming
    Error {
        /// Error message
        error: String,
    },
}

/// Chat stream type
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamEvent, LlmError>> + Send>>;
