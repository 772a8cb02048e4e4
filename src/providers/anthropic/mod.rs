//! Anthropic provider: Messages API client, streaming conversion and the
//! Message Batches model.

pub mod batch;
pub mod client;
pub mod streaming;
pub mod types;

pub use batch::{ANTHROPIC_BATCH_PREFIX, AnthropicBatchChatModel};
pub use client::AnthropicClient;
pub use streaming::AnthropicEventConverter;
