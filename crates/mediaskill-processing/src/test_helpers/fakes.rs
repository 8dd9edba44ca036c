//! In-memory collaborator fakes
//!
//! Each fake is cheaply cloneable; clones share state so a test can keep a
//! handle for assertions after moving one into the code under test.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use mediaskill_core::{Card, FileContext, MediaDuration, SkillErrorKind};
use mediaskill_services::{
    BlobEntry, BlobStore, CreatedJob, DeleteOutcome, EventSubscriptionClient, JobSubmission,
    MediaJobClient, RemoteResource, ServiceError, ServiceResult, SkillsWriter,
};

#[derive(Default)]
struct MediaState {
    profiles: HashSet<String>,
    profile_probe_failure: Option<u16>,
    container_sas_url: Option<String>,
    stall_container_sas: bool,
    fail_create_job: bool,
    fail_job_deletes: bool,
    create_profile_calls: usize,
    create_asset_calls: usize,
    submitted_jobs: Vec<JobSubmission>,
    deleted_jobs: Vec<String>,
    deleted_assets: Vec<String>,
}

/// Fake media service that remembers what was created and deleted
#[derive(Clone, Default)]
pub struct FakeMediaClient {
    state: Arc<Mutex<MediaState>>,
}

impl FakeMediaClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, name: &str) -> Self {
        self.state.lock().unwrap().profiles.insert(name.to_string());
        self
    }

    /// Every asset that has not been deleted gets this container URL.
    pub fn with_container_sas(self, url: &str) -> Self {
        self.state.lock().unwrap().container_sas_url = Some(url.to_string());
        self
    }

    pub fn fail_profile_probe(self, status: u16) -> Self {
        self.state.lock().unwrap().profile_probe_failure = Some(status);
        self
    }

    /// Output lookups never complete, so completions hold their worker.
    pub fn stall_container_sas(self) -> Self {
        self.state.lock().unwrap().stall_container_sas = true;
        self
    }

    pub fn fail_create_job(self) -> Self {
        self.state.lock().unwrap().fail_create_job = true;
        self
    }

    pub fn fail_job_deletes(self) -> Self {
        self.state.lock().unwrap().fail_job_deletes = true;
        self
    }

    pub fn create_profile_calls(&self) -> usize {
        self.state.lock().unwrap().create_profile_calls
    }

    pub fn create_asset_calls(&self) -> usize {
        self.state.lock().unwrap().create_asset_calls
    }

    pub fn create_job_calls(&self) -> usize {
        self.state.lock().unwrap().submitted_jobs.len()
    }

    pub fn submitted_jobs(&self) -> Vec<JobSubmission> {
        self.state.lock().unwrap().submitted_jobs.clone()
    }

    pub fn deleted_jobs(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_jobs.clone()
    }

    pub fn deleted_assets(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_assets.clone()
    }
}

#[async_trait]
impl MediaJobClient for FakeMediaClient {
    async fn get_profile(&self, name: &str) -> ServiceResult<Option<RemoteResource>> {
        let state = self.state.lock().unwrap();
        if let Some(status) = state.profile_probe_failure {
            return Err(ServiceError::Http {
                status,
                body: "probe failed".to_string(),
            });
        }
        Ok(state.profiles.contains(name).then(|| RemoteResource {
            id: None,
            name: Some(name.to_string()),
        }))
    }

    async fn create_profile(&self, name: &str, _language: &str) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state.create_profile_calls += 1;
        state.profiles.insert(name.to_string());
        Ok(())
    }

    async fn create_asset(&self, _name: &str) -> ServiceResult<()> {
        self.state.lock().unwrap().create_asset_calls += 1;
        Ok(())
    }

    async fn create_job(&self, submission: &JobSubmission) -> ServiceResult<CreatedJob> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_job {
            return Err(ServiceError::Http {
                status: 409,
                body: "job already exists".to_string(),
            });
        }
        state.submitted_jobs.push(submission.clone());
        Ok(CreatedJob {
            state: Some("Queued".to_string()),
        })
    }

    async fn container_sas(
        &self,
        asset_name: &str,
        _expiry: DateTime<Utc>,
    ) -> ServiceResult<String> {
        let stalled = self.state.lock().unwrap().stall_container_sas;
        if stalled {
            std::future::pending::<()>().await;
        }
        let state = self.state.lock().unwrap();
        if state.deleted_assets.iter().any(|a| a == asset_name) {
            return Err(ServiceError::NotFound(asset_name.to_string()));
        }
        state
            .container_sas_url
            .clone()
            .ok_or_else(|| ServiceError::NotFound(asset_name.to_string()))
    }

    async fn delete_job(&self, _profile_name: &str, job_name: &str) -> ServiceResult<DeleteOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.fail_job_deletes {
            return Err(ServiceError::Http {
                status: 500,
                body: "delete failed".to_string(),
            });
        }
        if state.deleted_jobs.iter().any(|j| j == job_name) {
            return Ok(DeleteOutcome::AlreadyGone);
        }
        state.deleted_jobs.push(job_name.to_string());
        Ok(DeleteOutcome::Deleted)
    }

    async fn delete_asset(&self, asset_name: &str) -> ServiceResult<DeleteOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.deleted_assets.iter().any(|a| a == asset_name) {
            return Ok(DeleteOutcome::AlreadyGone);
        }
        state.deleted_assets.push(asset_name.to_string());
        Ok(DeleteOutcome::Deleted)
    }
}

#[derive(Default)]
struct SubscriptionState {
    exists: bool,
    conflict_on_create: bool,
    fail_create: bool,
    create_calls: usize,
}

/// Fake event bus subscription store
#[derive(Clone, Default)]
pub struct FakeSubscriptionClient {
    state: Arc<Mutex<SubscriptionState>>,
}

impl FakeSubscriptionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(self) -> Self {
        self.state.lock().unwrap().exists = true;
        self
    }

    /// Creation reports a conflict, as when another instance created it first.
    pub fn conflict_on_create(self) -> Self {
        self.state.lock().unwrap().conflict_on_create = true;
        self
    }

    pub fn fail_create(self) -> Self {
        self.state.lock().unwrap().fail_create = true;
        self
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }
}

#[async_trait]
impl EventSubscriptionClient for FakeSubscriptionClient {
    async fn get(&self, _scope: &str, name: &str) -> ServiceResult<Option<RemoteResource>> {
        let state = self.state.lock().unwrap();
        Ok(state.exists.then(|| RemoteResource {
            id: None,
            name: Some(name.to_string()),
        }))
    }

    async fn create(
        &self,
        _scope: &str,
        name: &str,
        _endpoint: &str,
        _event_types: &[&str],
    ) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if state.conflict_on_create {
            return Err(ServiceError::Conflict(name.to_string()));
        }
        if state.fail_create {
            return Err(ServiceError::Http {
                status: 400,
                body: "endpoint validation failed".to_string(),
            });
        }
        state.exists = true;
        Ok(())
    }
}

/// Fake blob container; every blob is a block blob
#[derive(Clone, Default)]
pub struct FakeBlobStore {
    blobs: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(self, name: &str, content: &str) -> Self {
        self.blobs
            .lock()
            .unwrap()
            .push((name.to_string(), content.to_string()));
        self
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn list(&self, _container_sas_url: &str) -> ServiceResult<Vec<BlobEntry>> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .iter()
            .map(|(name, content)| BlobEntry {
                name: name.clone(),
                blob_type: Some("BlockBlob".to_string()),
                content_length: Some(content.len() as u64),
            })
            .collect())
    }

    async fn read_text(&self, _container_sas_url: &str, blob_name: &str) -> ServiceResult<String> {
        self.blobs
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == blob_name)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| ServiceError::NotFound(blob_name.to_string()))
    }
}

#[derive(Default)]
struct WriterState {
    saved: Vec<(String, Vec<Card>, MediaDuration)>,
    errors: Vec<(String, SkillErrorKind)>,
    processing: Vec<String>,
    fail_data_writes: bool,
    fail_all_writes: bool,
}

/// Skills writer that records every card written, keyed by file id
#[derive(Clone, Default)]
pub struct RecordingSkillsWriter {
    state: Arc<Mutex<WriterState>>,
}

impl RecordingSkillsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data card writes fail; status cards still succeed.
    pub fn fail_data_writes(self) -> Self {
        self.state.lock().unwrap().fail_data_writes = true;
        self
    }

    pub fn fail_all_writes(self) -> Self {
        self.state.lock().unwrap().fail_all_writes = true;
        self
    }

    pub fn saved_cards(&self) -> Vec<(String, Vec<Card>, MediaDuration)> {
        self.state.lock().unwrap().saved.clone()
    }

    pub fn error_cards(&self) -> Vec<(String, SkillErrorKind)> {
        self.state.lock().unwrap().errors.clone()
    }

    pub fn processing_cards(&self) -> Vec<String> {
        self.state.lock().unwrap().processing.clone()
    }
}

fn write_failure() -> ServiceError {
    ServiceError::Http {
        status: 503,
        body: "metadata write failed".to_string(),
    }
}

#[async_trait]
impl SkillsWriter for RecordingSkillsWriter {
    async fn save_data_cards(
        &self,
        file_context: &FileContext,
        cards: &[Card],
        duration: MediaDuration,
    ) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_data_writes || state.fail_all_writes {
            return Err(write_failure());
        }
        state
            .saved
            .push((file_context.file_id.clone(), cards.to_vec(), duration));
        Ok(())
    }

    async fn save_error_card(
        &self,
        file_context: &FileContext,
        kind: SkillErrorKind,
    ) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_all_writes {
            return Err(write_failure());
        }
        state.errors.push((file_context.file_id.clone(), kind));
        Ok(())
    }

    async fn save_processing_card(&self, file_context: &FileContext) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_all_writes {
            return Err(write_failure());
        }
        state.processing.push(file_context.file_id.clone());
        Ok(())
    }
}
