//! Skill invocation endpoint.

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use mediaskill_core::{AppError, FileContext, SkillErrorKind, SkillInvocation};

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub job_id: Uuid,
    pub job_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Start analysis of the invoked file.
#[tracing::instrument(skip(state, body))]
pub async fn invoke_skill(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let invocation = parse_invocation(&body)?;
    let file_context = invocation.file_context(&state.config.skill.files_api_url);

    tracing::info!(
        invocation_id = %invocation.id,
        file_id = %file_context.file_id,
        file_type = file_context.file_type.as_deref().unwrap_or("unknown"),
        "Skill invoked"
    );

    if let Err(e) = state.writer.save_processing_card(&file_context).await {
        tracing::warn!(file_id = %file_context.file_id, error = %e, "Failed to save processing card");
    }

    match state.orchestrator.submit(&file_context).await {
        Ok(handle) => Ok(Json(SubmissionResponse {
            job_id: handle.job.id,
            job_name: handle.job.name,
            state: handle.state,
        })),
        Err(e) => {
            report_submission_failure(&state, &file_context).await;
            Err(e.into())
        }
    }
}

fn parse_invocation(body: &[u8]) -> Result<SkillInvocation, HttpAppError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| AppError::UnsupportedEvent("Request body is not JSON".into()))?;

    if !SkillInvocation::is_invocation(&value) {
        return Err(AppError::UnsupportedEvent(
            "Expected an event delivery or a skill invocation".into(),
        )
        .into());
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::InvalidInput(format!("Malformed skill invocation: {}", e)).into())
}

async fn report_submission_failure(state: &AppState, file_context: &FileContext) {
    if let Err(e) = state
        .writer
        .save_error_card(file_context, SkillErrorKind::FileProcessingError)
        .await
    {
        tracing::error!(
            file_id = %file_context.file_id,
            error = %e,
            "Failed to save error card"
        );
    }
}
