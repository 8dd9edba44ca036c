//! Construction of the external service clients

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use mediaskill_core::Config;
use mediaskill_services::{
    AadTokenProvider, AzureMediaClient, BoxSkillsWriter, EventGridClient, SasBlobClient,
    TokenProvider,
};

use crate::state::Collaborators;

pub fn initialize_collaborators(config: &Config) -> Result<Collaborators> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.base.http_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let tokens: Arc<dyn TokenProvider> =
        Arc::new(AadTokenProvider::new(http_client.clone(), &config.azure));

    let media = AzureMediaClient::new(http_client.clone(), tokens.clone(), &config.azure);
    let subscriptions =
        EventGridClient::new(http_client.clone(), tokens, config.azure.arm_endpoint.clone());
    let blobs = SasBlobClient::new(http_client.clone());
    let writer = BoxSkillsWriter::new(http_client, config.skill.files_api_url.clone());

    tracing::info!(
        arm_endpoint = %config.azure.arm_endpoint,
        files_api_url = %config.skill.files_api_url,
        timeout_secs = config.base.http_timeout_secs,
        "External service clients initialized"
    );

    Ok(Collaborators {
        media: Arc::new(media),
        subscriptions: Arc::new(subscriptions),
        blobs: Arc::new(blobs),
        writer: Arc::new(writer),
    })
}
