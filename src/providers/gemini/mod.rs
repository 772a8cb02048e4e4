//! Gemini provider: generateContent client, streaming conversion and the
//! long-running batch models.

pub mod batch;
pub mod batch_models;
pub mod files;
pub mod service;
pub mod streaming;
pub mod types;

pub use batch::{BatchRequestPreparer, GEMINI_BATCH_PREFIX, GeminiBatchProcessor};
pub use batch_models::{GeminiBatchChatModel, GeminiBatchEmbeddingModel, GeminiBatchImageModel};
pub use files::{GeminiFile, write_batch_to_file};
pub use service::GeminiService;
pub use streaming::GeminiEventConverter;
