use serde::{Deserialize, Serialize};

/// The file a skill invocation targets, plus the credentials needed to read it
/// and to write cards back onto it.
///
/// # Security Note
///
/// `file_read_token` and `file_write_token` are bearer credentials. Never log a
/// `FileContext` with `{:?}` at info level or above; log `file_id` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContext {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub skill_id: Option<String>,
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_format: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    /// Download locator handed to the analysis service as job input.
    #[serde(default, rename = "fileDownloadURL")]
    pub file_download_url: Option<String>,
    #[serde(default)]
    pub file_read_token: Option<String>,
    #[serde(default)]
    pub file_write_token: Option<String>,
}

impl FileContext {
    /// Copy without the download locator and both credentials.
    ///
    /// This is the shape that travels inside a correlation token.
    pub fn redacted(&self) -> Self {
        Self {
            file_download_url: None,
            file_read_token: None,
            file_write_token: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_clears_locator_and_credentials() {
        let ctx = FileContext {
            file_id: "42".to_string(),
            file_name: Some("clip.mp4".to_string()),
            file_download_url: Some("https://example.com/content".to_string()),
            file_read_token: Some("read".to_string()),
            file_write_token: Some("write".to_string()),
            ..Default::default()
        };

        let redacted = ctx.redacted();
        assert_eq!(redacted.file_id, "42");
        assert_eq!(redacted.file_name.as_deref(), Some("clip.mp4"));
        assert!(redacted.file_download_url.is_none());
        assert!(redacted.file_read_token.is_none());
        assert!(redacted.file_write_token.is_none());
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let ctx = FileContext {
            file_id: "42".to_string(),
            file_download_url: Some("u".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["fileId"], "42");
        assert_eq!(value["fileDownloadURL"], "u");
        // Redacted fields are present as null, not omitted
        assert!(value["fileWriteToken"].is_null());
        assert!(value.as_object().unwrap().contains_key("fileWriteToken"));
    }
}
