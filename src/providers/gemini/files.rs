//! File handles for file-backed batches.

use std::path::Path;

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::LlmError;

/// Required prefix of Gemini file resource names
pub const GEMINI_FILE_PREFIX: &str = "files/";

/// Handle to a file previously uploaded through the Files API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiFile {
    name: String,
}

impl GeminiFile {
    pub fn new(name: impl Into<String>) -> Result<Self, LlmError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LlmError::InvalidInput(
                "File name cannot be blank".to_string(),
            ));
        }
        if !name.starts_with(GEMINI_FILE_PREFIX) {
            return Err(LlmError::InvalidInput(format!(
                "File name must start with '{GEMINI_FILE_PREFIX}'"
            )));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Serialize)]
struct BatchFileLine<'a, T> {
    request: &'a T,
}

/// Write wire requests as a JSONL document ready for upload, one
/// `{"request": ...}` object per line.
pub async fn write_batch_to_file<T: Serialize>(
    requests: &[T],
    path: &Path,
) -> Result<(), LlmError> {
    if requests.is_empty() {
        return Err(LlmError::InvalidParameter(
            "batch requests cannot be empty".to_string(),
        ));
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| LlmError::InternalError(format!("failed to create batch file: {e}")))?;
    for request in requests {
        let line = serde_json::to_string(&BatchFileLine { request })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| LlmError::InternalError(format!("failed to write batch file: {e}")))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| LlmError::InternalError(format!("failed to write batch file: {e}")))?;
    }
    file.flush()
        .await
        .map_err(|e| LlmError::InternalError(format!("failed to flush batch file: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_requires_files_prefix() {
        assert!(GeminiFile::new("files/abc123").is_ok());
        assert!(GeminiFile::new("abc123").is_err());
        assert!(GeminiFile::new("  ").is_err());
    }

    #[tokio::test]
    async fn writes_one_request_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.jsonl");
        let requests = vec![
            serde_json::json!({"contents": [{"parts": [{"text": "a"}]}]}),
            serde_json::json!({"contents": [{"parts": [{"text": "b"}]}]}),
        ];

        write_batch_to_file(&requests, &path).await.unwrap();

        let body = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert!(first.get("request").is_some());
    }

    #[tokio::test]
    async fn empty_request_set_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.jsonl");
        let requests: Vec<serde_json::Value> = Vec::new();
        assert!(write_batch_to_file(&requests, &path).await.is_err());
    }
}
