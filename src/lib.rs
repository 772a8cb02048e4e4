//! # unillm
//!
//! A unified LLM client library for Rust.
//!
//! One set of request, response and streaming types covers the Anthropic
//! Messages API and the Google Gemini API. The two capabilities the crate
//! is built around:
//!
//! - **Streaming aggregation**: SSE partial events fold into a single final
//!   [`ChatResponse`](types::ChatResponse), while
//!   [`drive_stream`](stream::drive_stream) fires ordered handler callbacks
//!   with exactly one terminal callback per stream.
//! - **Batch jobs**: create, poll, cancel, delete and list provider batches
//!   through one [`BatchJob`](batch::BatchJob) lifecycle, with per-item
//!   result fan-out.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use unillm::providers::anthropic::AnthropicClient;
//! use unillm::types::{ChatMessage, ChatRequest};
//!
//! # async fn run() -> Result<(), unillm::error::LlmError> {
//! let client = AnthropicClient::new("api-key");
//! let request = ChatRequest::new(
//!     "claude-sonnet-4-20250514",
//!     vec![ChatMessage::user("capital of France?")],
//! );
//! let response = client.chat(&request).await?;
//! println!("{}", response.text_or_empty());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod error;
pub mod providers;
pub mod retry;
pub mod stream;
pub mod types;

pub use batch::{
    BatchItemResult, BatchItemStatus, BatchJob, BatchJobState, BatchName, BatchPage,
    BatchRequestCounts,
};
pub use error::LlmError;
pub use retry::{BackoffRetryExecutor, RetryOptions};
pub use stream::{
    ChatStream, ChatStreamEvent, StreamHandler, StreamResponseBuilder, drive_stream,
};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Embedding, FinishReason, GeneratedImage, MessageRole,
    ModelInfo, ResponseMetadata, ToolCall, ToolDefinition, Usage,
};
