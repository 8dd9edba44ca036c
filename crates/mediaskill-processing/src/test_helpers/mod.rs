//! Test helpers for pipeline and API tests
//!
//! In-memory collaborator fakes and fixtures. No network access is needed.

pub mod fakes;

pub use fakes::{FakeBlobStore, FakeMediaClient, FakeSubscriptionClient, RecordingSkillsWriter};

use mediaskill_core::{AzureConfig, BaseConfig, Config, FileContext, LogFormat, SkillConfig};

/// Configuration suitable for tests; nothing is read from the environment.
pub fn test_config() -> Config {
    Config {
        base: BaseConfig {
            server_port: 0,
            environment: "test".to_string(),
            trust_proxy: false,
            log_level: None,
            log_format: LogFormat::Text,
            max_body_bytes: 1024 * 1024,
            http_timeout_secs: 5,
        },
        azure: AzureConfig {
            aad_client_id: "client".to_string(),
            aad_secret: "secret".to_string(),
            aad_tenant_id: "tenant".to_string(),
            aad_authority: "https://login.example.com".to_string(),
            subscription_id: "sub".to_string(),
            resource_group: "rg".to_string(),
            account_name: "acct".to_string(),
            region: "westus2".to_string(),
            arm_endpoint: "https://management.example.com".to_string(),
        },
        skill: SkillConfig {
            language: "en-US".to_string(),
            webhook_endpoint: "https://skill.example.com/".to_string(),
            files_api_url: "https://api.box.example.com/2.0".to_string(),
            completion_max_workers: 2,
            completion_queue_size: 8,
        },
    }
}

pub fn sample_file_context() -> FileContext {
    FileContext {
        request_id: Some("inv-1".to_string()),
        skill_id: Some("skill-1".to_string()),
        file_id: "file-1".to_string(),
        file_name: Some("clip.mp4".to_string()),
        file_size: Some(2048),
        file_format: Some("mp4".to_string()),
        file_type: Some("VIDEO".to_string()),
        file_download_url: Some(
            "https://api.box.example.com/2.0/files/file-1/content?access_token=read".to_string(),
        ),
        file_read_token: Some("read".to_string()),
        file_write_token: Some("write".to_string()),
    }
}
