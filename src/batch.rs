//! Provider-neutral batch job vocabulary.
//!
//! Batch jobs are long-running server-side operations. This module holds the
//! types shared by the Anthropic and Gemini batch models: validated names,
//! the job state machine, tagged outcome unions and pagination.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Validated batch job identifier.
///
/// Each provider requires its own name prefix; validation happens
/// synchronously at construction so malformed names never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchName(String);

impl BatchName {
    /// Validate `value` against the provider's required prefix.
    pub fn of(value: impl Into<String>, required_prefix: &str) -> Result<Self, LlmError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(LlmError::InvalidInput(
                "Batch name cannot be blank".to_string(),
            ));
        }
        if !value.starts_with(required_prefix) {
            return Err(LlmError::InvalidInput(format!(
                "Batch name must start with '{required_prefix}'"
            )));
        }
        Ok(Self(value))
    }

    /// The raw provider-side identifier
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Batch job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobState {
    /// State missing or not recognized; new server states degrade here
    Unspecified,
    Pending,
    Running,
    Canceling,
    Cancelled,
    Succeeded,
    Failed,
    Expired,
}

/// Per-state request counters reported while a batch runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequestCounts {
    pub processing: u64,
    pub succeeded: u64,
    pub errored: u64,
    pub cancelled: u64,
    pub expired: u64,
}

/// Terminal status of one item inside a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    Succeeded,
    Errored,
    Cancelled,
    Expired,
}

/// Result of one submitted batch item.
///
/// N submitted items come back as N results; `custom_id` carries the
/// caller-side identity through the round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItemResult<T> {
    pub custom_id: Option<String>,
    pub status: BatchItemStatus,
    /// Payload for succeeded items
    pub response: Option<T>,
    /// Error message for errored items
    pub error: Option<String>,
}

impl<T> BatchItemResult<T> {
    pub fn succeeded(custom_id: Option<String>, response: T) -> Self {
        Self {
            custom_id,
            status: BatchItemStatus::Succeeded,
            response: Some(response),
            error: None,
        }
    }

    pub fn errored(custom_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            custom_id,
            status: BatchItemStatus::Errored,
            response: None,
            error: Some(error.into()),
        }
    }

    pub fn terminal(custom_id: Option<String>, status: BatchItemStatus) -> Self {
        Self {
            custom_id,
            status,
            response: None,
            error: None,
        }
    }
}

/// Outcome of a batch job inspection, exhaustively matchable
#[derive(Debug, Clone, PartialEq)]
pub enum BatchJob<T> {
    /// Still being processed, or results not yet available
    Incomplete {
        name: BatchName,
        state: BatchJobState,
        counts: Option<BatchRequestCounts>,
    },
    /// Finished; per-item results are available
    Success {
        name: BatchName,
        results: Vec<BatchItemResult<T>>,
        counts: Option<BatchRequestCounts>,
    },
    /// Failed as a whole
    Error {
        name: BatchName,
        state: BatchJobState,
        code: Option<i64>,
        message: Option<String>,
        details: Vec<serde_json::Value>,
    },
}

impl<T> BatchJob<T> {
    pub fn name(&self) -> &BatchName {
        match self {
            Self::Incomplete { name, .. } | Self::Success { name, .. } | Self::Error { name, .. } => {
                name
            }
        }
    }
}

/// One page of batch jobs
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPage<T> {
    pub jobs: Vec<BatchJob<T>>,
    /// Opaque token for the next page, if any
    pub next_page_token: Option<String>,
    pub has_more: bool,
}
