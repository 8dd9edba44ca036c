//! Completion of a finished job.
//!
//! A job-finished event carries the correlation data attached at submission.
//! The pipeline decodes it, transforms the insights, cleans up the job's
//! resources and writes the cards. Failures are returned together with
//! whatever context was recovered so the caller can report them.

use std::sync::Arc;
use thiserror::Error;

use mediaskill_core::correlation::{self, CorrelationError, CorrelationToken};
use mediaskill_core::{FileContext, JobDescriptor, MediaDuration, SkillErrorKind};
use mediaskill_services::{ServiceError, SkillsWriter};

use crate::reaper::{CleanupReport, ResourceReaper};
use crate::transformer::{ResultTransformer, TransformError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Event carries no correlation data")]
    MissingCorrelation,

    #[error("Failed to decode correlation data: {0}")]
    Decode(#[from] CorrelationError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Failed to save cards: {0}")]
    Write(#[source] ServiceError),
}

impl PipelineError {
    /// Error card to show the user, if any. Without a decoded context there is
    /// no file to write to, and a vanished output means an earlier delivery
    /// already finished the job.
    pub fn error_card(&self) -> Option<SkillErrorKind> {
        match self {
            PipelineError::MissingCorrelation | PipelineError::Decode(_) => None,
            PipelineError::Transform(TransformError::OutputGone(_)) => None,
            PipelineError::Transform(TransformError::InsightsMissing) => {
                Some(SkillErrorKind::NoInfoFound)
            }
            PipelineError::Transform(_) => Some(SkillErrorKind::FileProcessingError),
            PipelineError::Write(_) => Some(SkillErrorKind::InvocationsError),
        }
    }
}

/// A failed completion with the context that was recovered before failing.
#[derive(Debug)]
pub struct CompletionFailure {
    pub job: Option<JobDescriptor>,
    pub file_context: Option<FileContext>,
    pub error: PipelineError,
}

impl CompletionFailure {
    fn undecoded(error: PipelineError) -> Self {
        Self {
            job: None,
            file_context: None,
            error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionReport {
    pub job_name: String,
    pub cards: usize,
    pub duration: u64,
    pub cleanup: CleanupReport,
}

pub struct CompletionPipeline {
    transformer: ResultTransformer,
    reaper: ResourceReaper,
    writer: Arc<dyn SkillsWriter>,
}

impl CompletionPipeline {
    pub fn new(
        transformer: ResultTransformer,
        reaper: ResourceReaper,
        writer: Arc<dyn SkillsWriter>,
    ) -> Self {
        Self {
            transformer,
            reaper,
            writer,
        }
    }

    /// Recover job and file context from an event's `correlationData`.
    pub fn decode(
        correlation_data: Option<&serde_json::Value>,
    ) -> Result<(JobDescriptor, FileContext), PipelineError> {
        let value = correlation_data
            .filter(|v| !v.is_null())
            .ok_or(PipelineError::MissingCorrelation)?;
        let token = CorrelationToken::from_value(value)?;
        Ok(correlation::decode(&token)?)
    }

    /// Decode and process one job-finished event.
    pub async fn handle(
        &self,
        correlation_data: Option<&serde_json::Value>,
    ) -> Result<CompletionReport, CompletionFailure> {
        let (job, file_context) =
            Self::decode(correlation_data).map_err(CompletionFailure::undecoded)?;

        self.process(&job, &file_context)
            .await
            .map_err(|error| CompletionFailure {
                job: Some(job),
                file_context: Some(file_context),
                error,
            })
    }

    /// Transform, clean up and write. Cleanup runs whether or not the
    /// transformation succeeded.
    #[tracing::instrument(skip(self, job, file_context), fields(job_name = %job.name))]
    pub async fn process(
        &self,
        job: &JobDescriptor,
        file_context: &FileContext,
    ) -> Result<CompletionReport, PipelineError> {
        let result = self.transformer.run(job, file_context).await;
        let cleanup = self.reaper.cleanup(job).await;
        let output = result?;

        self.writer
            .save_data_cards(
                file_context,
                &output.cards,
                MediaDuration::seconds(output.duration),
            )
            .await
            .map_err(PipelineError::Write)?;

        tracing::info!(file_id = %file_context.file_id, "Skill completed");

        Ok(CompletionReport {
            job_name: job.name.clone(),
            cards: output.cards.len(),
            duration: output.duration,
            cleanup,
        })
    }

    /// Surface a failure to the user through an error card where possible.
    pub async fn report(&self, failure: &CompletionFailure) {
        let job_name = failure.job.as_ref().map(|job| job.name.as_str());

        let (Some(kind), Some(file_context)) =
            (failure.error.error_card(), failure.file_context.as_ref())
        else {
            tracing::warn!(
                job_name = job_name.unwrap_or("unknown"),
                error = %failure.error,
                "Completion failed, no error card written"
            );
            return;
        };

        tracing::error!(
            job_name = job_name.unwrap_or("unknown"),
            file_id = %file_context.file_id,
            error = %failure.error,
            card = kind.code(),
            "Completion failed"
        );

        if let Err(e) = self.writer.save_error_card(file_context, kind).await {
            tracing::error!(
                file_id = %file_context.file_id,
                error = %e,
                "Failed to save error card"
            );
        }
    }
}
