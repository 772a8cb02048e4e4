//! Error handling types for unillm.
//!
//! One crate-wide error enum, shared by both providers.

use thiserror::Error;

/// Main error type for the library
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Failed to parse a provider response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Remote API returned a non-success status
    #[error("API error {code}: {message}")]
    ApiError {
        /// HTTP status code
        code: u16,
        /// Error message from the provider
        message: String,
        /// Structured error details, when the provider returned any
        details: Option<serde_json::Value>,
    },

    /// Invalid parameter supplied by the caller
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input supplied by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Operation not supported by the provider
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Streaming protocol violation
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LlmError {
    /// Create an API error without structured details
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create an API error with structured details
    pub fn api_error_with_details(
        code: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Whether a retry may succeed for this error
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) => true,
            Self::ApiError { code, .. } => *code == 429 || (500..=599).contains(code),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::JsonError(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::api_error(500, "server").is_retryable());
        assert!(LlmError::api_error(429, "rate limited").is_retryable());
        assert!(!LlmError::api_error(400, "bad request").is_retryable());
        assert!(LlmError::HttpError("connection reset".into()).is_retryable());
        assert!(!LlmError::InvalidInput("blank".into()).is_retryable());
    }
}
