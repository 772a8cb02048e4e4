//! Streaming support: event model, SSE conversion, response aggregation
//! and handler fan-out.

pub mod builder;
pub mod events;
pub mod handler;
pub mod sse;

pub use builder::{StreamResponseBuilder, StreamUpdate};
pub use events::{ChatStream, ChatStreamEvent};
pub use handler::{StreamHandler, drive_stream};
pub use sse::{SseEventConverter, sse_stream};
