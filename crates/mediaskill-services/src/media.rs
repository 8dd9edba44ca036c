//! Azure Media Services client (ARM REST API).

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use mediaskill_core::AzureConfig;

use crate::auth::TokenProvider;
use crate::error::{ServiceError, ServiceResult};
use crate::http::{ensure_success, read_json};
use crate::traits::{CreatedJob, DeleteOutcome, JobSubmission, MediaJobClient, RemoteResource};

pub const MEDIA_API_VERSION: &str = "2018-07-01";

const VIDEO_ANALYZER_PRESET: &str = "#Microsoft.Media.VideoAnalyzerPreset";
const JOB_INPUT_HTTP: &str = "#Microsoft.Media.JobInputHttp";
const JOB_OUTPUT_ASSET: &str = "#Microsoft.Media.JobOutputAsset";

pub struct AzureMediaClient {
    http_client: Client,
    tokens: Arc<dyn TokenProvider>,
    /// `{arm}/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Media/mediaServices/{account}`
    account_url: String,
    location: String,
}

impl Debug for AzureMediaClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AzureMediaClient")
            .field("account_url", &self.account_url)
            .field("location", &self.location)
            .finish()
    }
}

#[derive(Deserialize)]
struct JobResponse {
    #[serde(default)]
    properties: JobProperties,
}

#[derive(Deserialize, Default)]
struct JobProperties {
    #[serde(default)]
    state: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerSasResponse {
    #[serde(default)]
    asset_container_sas_urls: Vec<String>,
}

impl AzureMediaClient {
    pub fn new(http_client: Client, tokens: Arc<dyn TokenProvider>, config: &AzureConfig) -> Self {
        Self {
            http_client,
            tokens,
            account_url: format!(
                "{}{}",
                config.arm_endpoint.trim_end_matches('/'),
                config.account_scope()
            ),
            location: config.region.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.account_url, path, MEDIA_API_VERSION
        )
    }

    async fn authorized(&self, request: RequestBuilder) -> ServiceResult<RequestBuilder> {
        let token = self.tokens.bearer_token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn delete(&self, resource: &str, path: &str) -> ServiceResult<DeleteOutcome> {
        let request = self.authorized(self.http_client.delete(self.url(path))).await?;
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::AlreadyGone);
        }
        ensure_success(resource, response).await?;
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait]
impl MediaJobClient for AzureMediaClient {
    async fn get_profile(&self, name: &str) -> ServiceResult<Option<RemoteResource>> {
        let path = format!("transforms/{}", name);
        let request = self.authorized(self.http_client.get(self.url(&path))).await?;
        let response = request.send().await?;

        match ensure_success(&path, response).await {
            Ok(response) => Ok(Some(read_json(response).await?)),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_profile(&self, name: &str, language: &str) -> ServiceResult<()> {
        let path = format!("transforms/{}", name);
        let body = json!({
            "location": self.location,
            "properties": {
                "description": format!("Video analysis ({})", language),
                "outputs": [{
                    "preset": {
                        "@odata.type": VIDEO_ANALYZER_PRESET,
                        "audioLanguage": language
                    }
                }]
            }
        });

        let request = self.authorized(self.http_client.put(self.url(&path))).await?;
        let response = request.json(&body).send().await?;
        ensure_success(&path, response).await?;

        tracing::info!(profile = %name, language = %language, "Created analysis profile");
        Ok(())
    }

    async fn create_asset(&self, name: &str) -> ServiceResult<()> {
        let path = format!("assets/{}", name);
        let request = self.authorized(self.http_client.put(self.url(&path))).await?;
        let response = request.json(&json!({ "properties": {} })).send().await?;
        ensure_success(&path, response).await?;
        Ok(())
    }

    async fn create_job(&self, submission: &JobSubmission) -> ServiceResult<CreatedJob> {
        let path = format!(
            "transforms/{}/jobs/{}",
            submission.profile_name, submission.job_name
        );
        let body = json!({
            "properties": {
                "input": {
                    "@odata.type": JOB_INPUT_HTTP,
                    "files": [submission.input_url]
                },
                "outputs": [{
                    "@odata.type": JOB_OUTPUT_ASSET,
                    "assetName": submission.output_asset_name
                }],
                "correlationData": submission.correlation_data
            }
        });

        let request = self.authorized(self.http_client.put(self.url(&path))).await?;
        let response = request.json(&body).send().await?;
        let response = ensure_success(&path, response).await?;
        let job: JobResponse = read_json(response).await?;

        Ok(CreatedJob {
            state: job.properties.state,
        })
    }

    async fn container_sas(
        &self,
        asset_name: &str,
        expiry: DateTime<Utc>,
    ) -> ServiceResult<String> {
        let path = format!("assets/{}/listContainerSas", asset_name);
        let body = json!({
            "permissions": "Read",
            "expiryTime": expiry.to_rfc3339_opts(SecondsFormat::Secs, true)
        });

        let request = self.authorized(self.http_client.post(self.url(&path))).await?;
        let response = request.json(&body).send().await?;
        let response = ensure_success(&path, response).await?;
        let sas: ContainerSasResponse = read_json(response).await?;

        sas.asset_container_sas_urls
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("{} (no container URLs)", path)))
    }

    async fn delete_job(&self, profile_name: &str, job_name: &str) -> ServiceResult<DeleteOutcome> {
        let path = format!("transforms/{}/jobs/{}", profile_name, job_name);
        self.delete(&path, &path).await
    }

    async fn delete_asset(&self, asset_name: &str) -> ServiceResult<DeleteOutcome> {
        let path = format!("assets/{}", asset_name);
        self.delete(&path, &path).await
    }
}
