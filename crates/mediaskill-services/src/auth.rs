//! Azure AD client-credentials token provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use mediaskill_core::AzureConfig;

use crate::error::{ServiceError, ServiceResult};
use crate::http::{ensure_success, read_json};

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for management API calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> ServiceResult<String>;
}

/// Fixed token, for tests and local tooling.
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> ServiceResult<String> {
        Ok(self.0.clone())
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Service principal login against the AAD v1 token endpoint.
pub struct AadTokenProvider {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    resource: String,
    cached: Mutex<Option<CachedToken>>,
}

impl Debug for AadTokenProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AadTokenProvider")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Lifetime>,
}

/// The v1 endpoint reports `expires_in` as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lifetime {
    Secs(u64),
    Text(String),
}

impl Lifetime {
    fn as_secs(&self) -> Option<u64> {
        match self {
            Lifetime::Secs(secs) => Some(*secs),
            Lifetime::Text(text) => text.parse().ok(),
        }
    }
}

impl AadTokenProvider {
    pub fn new(http_client: Client, config: &AzureConfig) -> Self {
        Self {
            http_client,
            token_url: format!(
                "{}/{}/oauth2/token",
                config.aad_authority.trim_end_matches('/'),
                config.aad_tenant_id
            ),
            client_id: config.aad_client_id.clone(),
            client_secret: config.aad_secret.clone(),
            resource: format!("{}/", config.arm_endpoint.trim_end_matches('/')),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> ServiceResult<CachedToken> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("resource", self.resource.as_str()),
            ])
            .send()
            .await?;

        let response = match ensure_success("token", response).await {
            Ok(response) => response,
            Err(ServiceError::Http { status, body }) => {
                return Err(ServiceError::Auth(format!("{} - {}", status, body)))
            }
            Err(e) => return Err(e),
        };

        let token: TokenResponse = read_json(response).await?;
        let lifetime = token
            .expires_in
            .as_ref()
            .and_then(Lifetime::as_secs)
            .map(Duration::from_secs)
            .unwrap_or(Duration::ZERO);

        tracing::debug!(
            client_id = %self.client_id,
            expires_in_secs = lifetime.as_secs(),
            "Acquired management token"
        );

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}

#[async_trait]
impl TokenProvider for AadTokenProvider {
    async fn bearer_token(&self) -> ServiceResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}
