//! Correlation token codec.
//!
//! The analysis service stores an opaque string map on each job and echoes it
//! back in every job state change event. That map is the only state carried
//! from submission to completion, so it holds everything needed to resume:
//! the job descriptor, a redacted file context and the write credential.
//!
//! Each field is an independently serialized JSON string. The write credential
//! travels in its own field so the redacted file context never duplicates it.
//! A `schema` field tags the layout; tokens without it are read as schema 1.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{FileContext, JobDescriptor};

pub const CORRELATION_SCHEMA_VERSION: &str = "1";

/// Upper bound the analysis service enforces on correlation data.
pub const MAX_CORRELATION_BYTES: usize = 8 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    #[error("Failed to serialize correlation field '{field}': {source}")]
    Serialize {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse correlation field '{field}': {source}")]
    Parse {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Correlation data is malformed: {0}")]
    Malformed(String),

    #[error("Unsupported correlation schema: {0}")]
    UnsupportedSchema(String),

    #[error("Correlation data is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub job: String,
    pub file_context: String,
    pub file_write_token: String,
}

impl CorrelationToken {
    /// Read a token from the `correlationData` object of a job event.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CorrelationError> {
        Self::deserialize(value).map_err(|e| CorrelationError::Malformed(e.to_string()))
    }

    /// String map as submitted to the analysis service.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(schema) = &self.schema {
            map.insert("schema".to_string(), schema.clone());
        }
        map.insert("job".to_string(), self.job.clone());
        map.insert("fileContext".to_string(), self.file_context.clone());
        map.insert("fileWriteToken".to_string(), self.file_write_token.clone());
        map
    }

    /// Size as counted by the analysis service (keys plus values).
    pub fn encoded_len(&self) -> usize {
        self.to_map().iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

/// Build the token for a job about to be submitted.
pub fn encode(
    job: &JobDescriptor,
    file_context: &FileContext,
) -> Result<CorrelationToken, CorrelationError> {
    let token = CorrelationToken {
        schema: Some(CORRELATION_SCHEMA_VERSION.to_string()),
        job: to_field("job", job)?,
        file_context: to_field("fileContext", &file_context.redacted())?,
        file_write_token: to_field("fileWriteToken", &file_context.file_write_token)?,
    };

    let size = token.encoded_len();
    if size > MAX_CORRELATION_BYTES {
        return Err(CorrelationError::TooLarge {
            size,
            limit: MAX_CORRELATION_BYTES,
        });
    }

    Ok(token)
}

/// Recover the job and file context from an echoed token. The write credential
/// is re-attached; the download locator and read credential stay absent.
pub fn decode(token: &CorrelationToken) -> Result<(JobDescriptor, FileContext), CorrelationError> {
    match token.schema.as_deref() {
        None | Some(CORRELATION_SCHEMA_VERSION) => {}
        Some(other) => return Err(CorrelationError::UnsupportedSchema(other.to_string())),
    }

    let job: JobDescriptor = from_field("job", &token.job)?;
    let mut file_context: FileContext = from_field("fileContext", &token.file_context)?;
    file_context.file_write_token = from_field("fileWriteToken", &token.file_write_token)?;

    Ok((job, file_context))
}

fn to_field<T: Serialize>(field: &'static str, value: &T) -> Result<String, CorrelationError> {
    serde_json::to_string(value).map_err(|source| CorrelationError::Serialize { field, source })
}

fn from_field<T: for<'de> Deserialize<'de>>(
    field: &'static str,
    raw: &str,
) -> Result<T, CorrelationError> {
    serde_json::from_str(raw).map_err(|source| CorrelationError::Parse { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_context() -> FileContext {
        FileContext {
            request_id: Some("req-1".to_string()),
            skill_id: Some("skill-1".to_string()),
            file_id: "file-1".to_string(),
            file_name: Some("clip.mp4".to_string()),
            file_size: Some(1024),
            file_format: Some("mp4".to_string()),
            file_type: Some("VIDEO".to_string()),
            file_download_url: Some("https://files.example.com/1/content".to_string()),
            file_read_token: Some("read-secret".to_string()),
            file_write_token: Some("write-secret".to_string()),
        }
    }

    #[test]
    fn test_round_trip_restores_job_and_write_token() {
        let job = JobDescriptor::generate("VideoAnalyzerTransform_en-US");
        let ctx = sample_context();

        let token = encode(&job, &ctx).unwrap();
        let (decoded_job, decoded_ctx) = decode(&token).unwrap();

        assert_eq!(decoded_job, job);
        assert_eq!(decoded_ctx.file_write_token, ctx.file_write_token);
        assert_eq!(decoded_ctx.file_id, ctx.file_id);
        assert_eq!(decoded_ctx.request_id, ctx.request_id);
        assert!(decoded_ctx.file_download_url.is_none());
        assert!(decoded_ctx.file_read_token.is_none());
    }

    #[test]
    fn test_encoded_file_context_carries_no_secrets() {
        let job = JobDescriptor::generate("p");
        let token = encode(&job, &sample_context()).unwrap();

        assert!(!token.file_context.contains("write-secret"));
        assert!(!token.file_context.contains("read-secret"));
        assert!(!token.file_context.contains("files.example.com"));
        assert_eq!(token.file_write_token, "\"write-secret\"");
        assert_eq!(token.schema.as_deref(), Some(CORRELATION_SCHEMA_VERSION));
    }

    #[test]
    fn test_missing_write_token_round_trips_as_none() {
        let job = JobDescriptor::generate("p");
        let ctx = FileContext {
            file_id: "f".to_string(),
            ..Default::default()
        };
        let token = encode(&job, &ctx).unwrap();
        assert_eq!(token.file_write_token, "null");
        let (_, decoded) = decode(&token).unwrap();
        assert!(decoded.file_write_token.is_none());
    }

    #[test]
    fn test_token_from_event_value() {
        let job = JobDescriptor::generate("p");
        let token = encode(&job, &sample_context()).unwrap();
        let value = serde_json::to_value(token.to_map()).unwrap();

        let parsed = CorrelationToken::from_value(&value).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_token_without_schema_is_accepted() {
        let job = JobDescriptor::generate("p");
        let mut token = encode(&job, &sample_context()).unwrap();
        token.schema = None;
        assert!(decode(&token).is_ok());
    }

    #[test]
    fn test_unknown_schema_is_rejected() {
        let job = JobDescriptor::generate("p");
        let mut token = encode(&job, &sample_context()).unwrap();
        token.schema = Some("99".to_string());
        assert!(matches!(
            decode(&token),
            Err(CorrelationError::UnsupportedSchema(s)) if s == "99"
        ));
    }

    #[test]
    fn test_garbage_fields_fail_to_decode() {
        let value = json!({"job": "{not json", "fileContext": "{}", "fileWriteToken": "null"});
        let token = CorrelationToken::from_value(&value).unwrap();
        assert!(matches!(
            decode(&token),
            Err(CorrelationError::Parse { field: "job", .. })
        ));

        assert!(CorrelationToken::from_value(&json!({"job": "{}"})).is_err());
        assert!(CorrelationToken::from_value(&json!("text")).is_err());
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let job = JobDescriptor::generate("p");
        let ctx = FileContext {
            file_id: "f".to_string(),
            file_name: Some("x".repeat(MAX_CORRELATION_BYTES)),
            ..Default::default()
        };
        assert!(matches!(
            encode(&job, &ctx),
            Err(CorrelationError::TooLarge { .. })
        ));
    }
}
