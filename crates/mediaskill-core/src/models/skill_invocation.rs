//! Skill invocation payload sent by the file platform when a file needs analysis.

use serde::Deserialize;

use super::FileContext;

pub const SKILL_INVOCATION_TYPE: &str = "skill_invocation";

const VIDEO_FORMATS: &[&str] = &[
    "3g2", "3gp", "avi", "flv", "m2v", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "mts",
    "ogg", "qt", "ts", "webm", "wmv",
];
const AUDIO_FORMATS: &[&str] = &[
    "aac", "aif", "aifc", "aiff", "amr", "au", "flac", "m4a", "mp3", "ra", "wav", "wma",
];

#[derive(Debug, Clone, Deserialize)]
pub struct SkillInvocation {
    #[serde(rename = "type")]
    pub invocation_type: String,
    pub id: String,
    pub skill: SkillRef,
    pub token: InvocationTokens,
    pub source: SourceFile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvocationTokens {
    pub read: AccessToken,
    pub write: AccessToken,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl SkillInvocation {
    /// Cheap shape check used before attempting a full parse.
    pub fn is_invocation(body: &serde_json::Value) -> bool {
        body.get("type").and_then(|t| t.as_str()) == Some(SKILL_INVOCATION_TYPE)
    }

    /// Build the file context for this invocation. `files_api_url` is the file
    /// platform's API base, e.g. `https://api.box.com/2.0`.
    pub fn file_context(&self, files_api_url: &str) -> FileContext {
        let file_format = self
            .source
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase());
        let file_type = file_format.as_deref().map(file_type_for_format);

        FileContext {
            request_id: Some(self.id.clone()),
            skill_id: Some(self.skill.id.clone()),
            file_id: self.source.id.clone(),
            file_name: Some(self.source.name.clone()),
            file_size: self.source.size,
            file_format,
            file_type: file_type.map(str::to_string),
            file_download_url: Some(format!(
                "{}/files/{}/content?access_token={}",
                files_api_url.trim_end_matches('/'),
                self.source.id,
                self.token.read.access_token
            )),
            file_read_token: Some(self.token.read.access_token.clone()),
            file_write_token: Some(self.token.write.access_token.clone()),
        }
    }
}

fn file_type_for_format(format: &str) -> &'static str {
    if VIDEO_FORMATS.contains(&format) {
        "VIDEO"
    } else if AUDIO_FORMATS.contains(&format) {
        "AUDIO"
    } else {
        "OTHER"
    }
}
