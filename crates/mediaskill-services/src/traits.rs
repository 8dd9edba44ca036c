//! Collaborator traits
//!
//! The processing pipeline depends only on these traits. The HTTP clients in
//! this crate implement them against Azure and Box; tests substitute in-memory
//! fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use mediaskill_core::{Card, FileContext, MediaDuration, SkillErrorKind};

use crate::error::ServiceResult;

/// Outcome of a delete call. Deleting something that is already gone is not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

/// Minimal view of an ARM resource returned by a probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteResource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Everything needed to create one analysis job.
#[derive(Debug, Clone)]
pub struct JobSubmission {
    pub profile_name: String,
    pub job_name: String,
    /// HTTP(S) URL the service downloads the source media from
    pub input_url: String,
    pub output_asset_name: String,
    pub correlation_data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedJob {
    pub state: Option<String>,
}

/// One entry of a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub name: String,
    pub blob_type: Option<String>,
    pub content_length: Option<u64>,
}

/// Job submission surface of the media service.
#[async_trait]
pub trait MediaJobClient: Send + Sync {
    /// `Ok(None)` when the profile does not exist.
    async fn get_profile(&self, name: &str) -> ServiceResult<Option<RemoteResource>>;

    /// Create a profile with a single video-analyzer preset for `language`.
    async fn create_profile(&self, name: &str, language: &str) -> ServiceResult<()>;

    async fn create_asset(&self, name: &str) -> ServiceResult<()>;

    async fn create_job(&self, submission: &JobSubmission) -> ServiceResult<CreatedJob>;

    /// Read-only SAS URL for the asset's storage container.
    async fn container_sas(&self, asset_name: &str, expiry: DateTime<Utc>)
        -> ServiceResult<String>;

    async fn delete_job(&self, profile_name: &str, job_name: &str) -> ServiceResult<DeleteOutcome>;

    async fn delete_asset(&self, asset_name: &str) -> ServiceResult<DeleteOutcome>;
}

/// Push subscription management on the event bus.
#[async_trait]
pub trait EventSubscriptionClient: Send + Sync {
    /// `Ok(None)` when no subscription with that name exists on `scope`.
    async fn get(&self, scope: &str, name: &str) -> ServiceResult<Option<RemoteResource>>;

    async fn create(
        &self,
        scope: &str,
        name: &str,
        endpoint: &str,
        event_types: &[&str],
    ) -> ServiceResult<()>;
}

/// Read access to a blob container addressed by a SAS URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list(&self, container_sas_url: &str) -> ServiceResult<Vec<BlobEntry>>;

    async fn read_text(&self, container_sas_url: &str, blob_name: &str) -> ServiceResult<String>;
}

/// Writes results back onto the source file.
#[async_trait]
pub trait SkillsWriter: Send + Sync {
    async fn save_data_cards(
        &self,
        file_context: &FileContext,
        cards: &[Card],
        duration: MediaDuration,
    ) -> ServiceResult<()>;

    async fn save_error_card(
        &self,
        file_context: &FileContext,
        kind: SkillErrorKind,
    ) -> ServiceResult<()>;

    /// Status card shown while the analysis job runs.
    async fn save_processing_card(&self, file_context: &FileContext) -> ServiceResult<()>;
}
