//! Job submission.
//!
//! Submission is stateless: the profile and the push subscription are probed
//! and created on demand, and everything needed to resume on completion is
//! attached to the job as correlation data.

use std::sync::Arc;
use thiserror::Error;

use mediaskill_core::constants::{profile_name, EVENT_SUBSCRIPTION_NAME};
use mediaskill_core::correlation::{self, CorrelationError};
use mediaskill_core::events::JOB_STATE_CHANGE_EVENT;
use mediaskill_core::{AppError, Config, FileContext, JobDescriptor, JobHandle};
use mediaskill_services::{EventSubscriptionClient, JobSubmission, MediaJobClient, ServiceError};

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("File context has no download URL")]
    MissingInput,

    #[error("Failed to probe profile '{name}': {source}")]
    ProfileProbe {
        name: String,
        #[source]
        source: ServiceError,
    },

    #[error("Failed to create profile '{name}': {source}")]
    ProfileCreate {
        name: String,
        #[source]
        source: ServiceError,
    },

    #[error("Failed to probe event subscription: {0}")]
    SubscriptionProbe(#[source] ServiceError),

    #[error("Failed to create event subscription: {0}")]
    SubscriptionCreate(#[source] ServiceError),

    #[error("Failed to create output asset '{name}': {source}")]
    Asset {
        name: String,
        #[source]
        source: ServiceError,
    },

    #[error("Failed to create job '{name}': {source}")]
    Job {
        name: String,
        #[source]
        source: ServiceError,
    },

    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}

impl From<ProvisioningError> for AppError {
    fn from(err: ProvisioningError) -> Self {
        match err {
            ProvisioningError::MissingInput => {
                AppError::InvalidInput("File context has no download URL".to_string())
            }
            ProvisioningError::Correlation(e) => AppError::from(e),
            other => AppError::Provisioning(other.to_string()),
        }
    }
}

/// Settings the orchestrator needs from configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Audio language of the analysis profile, e.g. `en-US`
    pub language: String,
    /// ARM scope the push subscription is created on
    pub subscription_scope: String,
    pub webhook_endpoint: String,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            language: config.skill.language.clone(),
            subscription_scope: config.azure.account_scope(),
            webhook_endpoint: config.skill.webhook_endpoint.clone(),
        }
    }
}

pub struct JobOrchestrator {
    media: Arc<dyn MediaJobClient>,
    subscriptions: Arc<dyn EventSubscriptionClient>,
    settings: OrchestratorSettings,
}

impl JobOrchestrator {
    pub fn new(
        media: Arc<dyn MediaJobClient>,
        subscriptions: Arc<dyn EventSubscriptionClient>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            media,
            subscriptions,
            settings,
        }
    }

    /// Submit an analysis job for the file.
    #[tracing::instrument(skip(self, file_context), fields(file_id = %file_context.file_id))]
    pub async fn submit(&self, file_context: &FileContext) -> Result<JobHandle, ProvisioningError> {
        let input_url = file_context
            .file_download_url
            .clone()
            .ok_or(ProvisioningError::MissingInput)?;

        let profile = self.ensure_profile().await?;
        self.ensure_subscription().await?;

        let job = JobDescriptor::generate(profile);
        let token = correlation::encode(&job, file_context)?;

        self.media
            .create_asset(&job.output_asset_name)
            .await
            .map_err(|source| ProvisioningError::Asset {
                name: job.output_asset_name.clone(),
                source,
            })?;

        let submission = JobSubmission {
            profile_name: job.profile_name.clone(),
            job_name: job.name.clone(),
            input_url,
            output_asset_name: job.output_asset_name.clone(),
            correlation_data: token.to_map(),
        };
        let created = match self.media.create_job(&submission).await {
            Ok(created) => created,
            Err(source) => {
                self.discard_output_asset(&job.output_asset_name).await;
                return Err(ProvisioningError::Job {
                    name: job.name.clone(),
                    source,
                });
            }
        };

        tracing::info!(
            job_id = %job.id,
            job_name = %job.name,
            profile = %job.profile_name,
            state = created.state.as_deref().unwrap_or("unknown"),
            "Submitted analysis job"
        );

        Ok(JobHandle {
            job,
            state: created.state,
        })
    }

    /// Best effort; the output asset is useless once job creation failed.
    async fn discard_output_asset(&self, asset_name: &str) {
        match self.media.delete_asset(asset_name).await {
            Ok(outcome) => {
                tracing::info!(asset_name, ?outcome, "Removed output asset of failed job")
            }
            Err(e) => tracing::warn!(
                asset_name,
                error = %e,
                "Failed to remove output asset of failed job"
            ),
        }
    }

    async fn ensure_profile(&self) -> Result<String, ProvisioningError> {
        let name = profile_name(&self.settings.language);

        let existing = self
            .media
            .get_profile(&name)
            .await
            .map_err(|source| ProvisioningError::ProfileProbe {
                name: name.clone(),
                source,
            })?;

        if existing.is_none() {
            tracing::info!(profile = %name, "Analysis profile not found, creating");
            self.media
                .create_profile(&name, &self.settings.language)
                .await
                .map_err(|source| ProvisioningError::ProfileCreate {
                    name: name.clone(),
                    source,
                })?;
        }

        Ok(name)
    }

    async fn ensure_subscription(&self) -> Result<(), ProvisioningError> {
        let scope = &self.settings.subscription_scope;

        let existing = self
            .subscriptions
            .get(scope, EVENT_SUBSCRIPTION_NAME)
            .await
            .map_err(ProvisioningError::SubscriptionProbe)?;
        if existing.is_some() {
            tracing::debug!("Event subscription already exists");
            return Ok(());
        }

        match self
            .subscriptions
            .create(
                scope,
                EVENT_SUBSCRIPTION_NAME,
                &self.settings.webhook_endpoint,
                &[JOB_STATE_CHANGE_EVENT],
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() => {
                tracing::debug!("Event subscription created concurrently");
                Ok(())
            }
            Err(e) => Err(ProvisioningError::SubscriptionCreate(e)),
        }
    }
}
