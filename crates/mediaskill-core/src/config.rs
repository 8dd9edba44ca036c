//! Configuration module
//!
//! Configuration is read once at startup from the environment (with `.env`
//! support) and passed to every component that needs it. Nothing reads the
//! environment after startup.

use std::env;
use std::fmt;

const SERVER_PORT: u16 = 8000;
const HTTP_TIMEOUT_SECS: u64 = 60;
const MAX_BODY_BYTES: usize = 1024 * 1024;
const COMPLETION_MAX_WORKERS: usize = 4;
const COMPLETION_QUEUE_SIZE: usize = 64;
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_AAD_AUTHORITY: &str = "https://login.microsoftonline.com";
const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";
const DEFAULT_BOX_API_URL: &str = "https://api.box.com/2.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Process and HTTP server settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    /// Honour `X-Forwarded-For` when running behind a proxy
    pub trust_proxy: bool,
    /// Fallback filter when `RUST_LOG` is not set
    pub log_level: Option<String>,
    pub log_format: LogFormat,
    pub max_body_bytes: usize,
    pub http_timeout_secs: u64,
}

/// Azure AD credentials and the media services account
#[derive(Clone)]
pub struct AzureConfig {
    pub aad_client_id: String,
    pub aad_secret: String,
    pub aad_tenant_id: String,
    pub aad_authority: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
    pub region: String,
    pub arm_endpoint: String,
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("aad_client_id", &self.aad_client_id)
            .field("aad_secret", &"<redacted>")
            .field("aad_tenant_id", &self.aad_tenant_id)
            .field("aad_authority", &self.aad_authority)
            .field("subscription_id", &self.subscription_id)
            .field("resource_group", &self.resource_group)
            .field("account_name", &self.account_name)
            .field("region", &self.region)
            .field("arm_endpoint", &self.arm_endpoint)
            .finish()
    }
}

impl AzureConfig {
    /// ARM resource id of the media services account. Used as the scope of the
    /// event subscription.
    pub fn account_scope(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Media/mediaServices/{}",
            self.subscription_id, self.resource_group, self.account_name
        )
    }
}

/// Skill behaviour: analysis language, webhook endpoint, result writing and
/// the completion worker pool
#[derive(Clone, Debug)]
pub struct SkillConfig {
    pub language: String,
    /// Public URL the event bus delivers job events to
    pub webhook_endpoint: String,
    pub files_api_url: String,
    pub completion_max_workers: usize,
    pub completion_queue_size: usize,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub azure: AzureConfig,
    pub skill: SkillConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            trust_proxy: env::var("TRUST_PROXY")
                .or_else(|_| env::var("PROXY"))
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            log_level: env::var("LOG_LEVEL").ok().filter(|s| !s.is_empty()),
            log_format,
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| MAX_BODY_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_BODY_BYTES),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(HTTP_TIMEOUT_SECS),
        };

        let azure = AzureConfig {
            aad_client_id: required("AAD_CLIENT_ID")?,
            aad_secret: required("AAD_SECRET")?,
            aad_tenant_id: required("AAD_TENANT_ID")?,
            aad_authority: env::var("AAD_AUTHORITY")
                .unwrap_or_else(|_| DEFAULT_AAD_AUTHORITY.to_string()),
            subscription_id: required("SUBSCRIPTION_ID")?,
            resource_group: required("RESOURCE_GROUP")?,
            account_name: required("ACCOUNT_NAME")?,
            region: required("REGION")?,
            arm_endpoint: env::var("ARM_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ARM_ENDPOINT.to_string()),
        };

        let skill = SkillConfig {
            language: env::var("LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string()),
            webhook_endpoint: required("ENDPOINT")?,
            files_api_url: env::var("BOX_API_URL")
                .unwrap_or_else(|_| DEFAULT_BOX_API_URL.to_string()),
            completion_max_workers: env::var("COMPLETION_MAX_WORKERS")
                .unwrap_or_else(|_| COMPLETION_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(COMPLETION_MAX_WORKERS),
            completion_queue_size: env::var("COMPLETION_QUEUE_SIZE")
                .unwrap_or_else(|_| COMPLETION_QUEUE_SIZE.to_string())
                .parse()
                .unwrap_or(COMPLETION_QUEUE_SIZE),
        };

        let config = Config { base, azure, skill };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.skill.webhook_endpoint.starts_with("https://")
            && !self.skill.webhook_endpoint.starts_with("http://")
        {
            return Err(anyhow::anyhow!("ENDPOINT must be an absolute http(s) URL"));
        }

        if self.is_production() && !self.skill.webhook_endpoint.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "ENDPOINT must use https in production; the event bus rejects plain http"
            ));
        }

        if self.skill.language.trim().is_empty() {
            return Err(anyhow::anyhow!("LANGUAGE must not be empty"));
        }

        if self.skill.completion_max_workers == 0 {
            return Err(anyhow::anyhow!("COMPLETION_MAX_WORKERS must be at least 1"));
        }

        if self.skill.completion_queue_size == 0 {
            return Err(anyhow::anyhow!("COMPLETION_QUEUE_SIZE must be at least 1"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn language(&self) -> &str {
        &self.skill.language
    }
}

fn required(name: &str) -> Result<String, anyhow::Error> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} must be set", name))
}
