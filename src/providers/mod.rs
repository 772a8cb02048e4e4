//! Provider implementations.

pub mod anthropic;
pub mod gemini;
