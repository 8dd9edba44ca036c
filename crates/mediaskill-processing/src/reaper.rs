use std::sync::Arc;

use mediaskill_core::JobDescriptor;
use mediaskill_services::{DeleteOutcome, MediaJobClient, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStatus {
    Deleted,
    AlreadyGone,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub job: CleanupStatus,
    pub asset: CleanupStatus,
}

/// Deletes a job and its output asset once results are no longer needed.
pub struct ResourceReaper {
    media: Arc<dyn MediaJobClient>,
}

impl ResourceReaper {
    pub fn new(media: Arc<dyn MediaJobClient>) -> Self {
        Self { media }
    }

    /// Delete the job, then its output asset. Both deletions are always
    /// attempted and never fail the caller.
    #[tracing::instrument(skip(self, job), fields(job_name = %job.name))]
    pub async fn cleanup(&self, job: &JobDescriptor) -> CleanupReport {
        let job_status = status(
            "job",
            &job.name,
            self.media.delete_job(&job.profile_name, &job.name).await,
        );
        let asset_status = status(
            "asset",
            &job.output_asset_name,
            self.media.delete_asset(&job.output_asset_name).await,
        );

        CleanupReport {
            job: job_status,
            asset: asset_status,
        }
    }
}

fn status(kind: &str, name: &str, result: ServiceResult<DeleteOutcome>) -> CleanupStatus {
    match result {
        Ok(DeleteOutcome::Deleted) => {
            tracing::debug!(kind, name, "Deleted");
            CleanupStatus::Deleted
        }
        Ok(DeleteOutcome::AlreadyGone) => {
            tracing::warn!(kind, name, "Already deleted");
            CleanupStatus::AlreadyGone
        }
        Err(e) => {
            tracing::warn!(kind, name, error = %e, "Cleanup failed");
            CleanupStatus::Failed
        }
    }
}
