//! Event bus webhook.
//!
//! The bus posts to the same URL the file platform invokes the skill on, so
//! this runs as middleware in front of the skill handler: deliveries of
//! interest are answered here and anything else is passed on with its body
//! intact.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use mediaskill_core::events::{self, EventKind};
use mediaskill_core::AppError;

use crate::dispatch::FollowUp;
use crate::error::HttpAppError;
use crate::state::AppState;

/// How a delivery of interest is answered.
#[derive(Debug, Clone, PartialEq)]
pub enum Acknowledgement {
    /// Echo the validation code so the bus activates the subscription.
    /// A delivery without one is echoed as `null`; the bus then rejects the
    /// handshake itself.
    Validation(Option<String>),
    /// Accept with no body; a follow-up is scheduled for finished jobs.
    Accepted(Option<FollowUp>),
}

/// Decide the answer for one classified event. Pure; nothing is scheduled.
pub fn acknowledge(kind: EventKind, event: &Value) -> Acknowledgement {
    let subject = events::subject(event).map(str::to_string);

    match kind {
        EventKind::SubscriptionValidation => {
            let code = events::validation_code(event).map(str::to_string);
            if code.is_none() {
                tracing::warn!("Validation event has no validationCode");
            }
            Acknowledgement::Validation(code)
        }
        EventKind::JobFinished => Acknowledgement::Accepted(Some(FollowUp {
            correlation_data: events::correlation_data(event).cloned(),
            subject,
        })),
        EventKind::JobCanceled | EventKind::JobError => {
            tracing::warn!(
                kind = kind.as_str(),
                subject = subject.as_deref().unwrap_or("unknown"),
                "Analysis job did not finish"
            );
            Acknowledgement::Accepted(None)
        }
        EventKind::SubscriptionDeletion => {
            tracing::warn!("Event subscription was deleted; it is recreated on the next submission");
            Acknowledgement::Accepted(None)
        }
        EventKind::Unrecognized | EventKind::Foreign => {
            tracing::debug!(
                event_type = events::event_type(event).unwrap_or("unknown"),
                "Ignoring event"
            );
            Acknowledgement::Accepted(None)
        }
    }
}

/// Answer event bus deliveries; pass every other request through.
pub async fn azure_event_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, state.config.base.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return HttpAppError(AppError::BadRequest(format!("Failed to read body: {}", e)))
                .into_response()
        }
    };

    let delivery = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => value,
        Err(_) => return next.run(Request::from_parts(parts, Body::from(bytes))).await,
    };
    let kind = events::classify(&delivery);
    let event = match events::first_event(&delivery) {
        Some(event) if kind.is_of_interest() => event,
        _ => return next.run(Request::from_parts(parts, Body::from(bytes))).await,
    };

    tracing::info!(
        kind = kind.as_str(),
        batch_size = delivery.as_array().map_or(0, Vec::len),
        "Event delivery received"
    );

    match acknowledge(kind, event) {
        Acknowledgement::Validation(code) => (
            StatusCode::OK,
            Json(serde_json::json!({ "validationResponse": code })),
        )
            .into_response(),
        Acknowledgement::Accepted(None) => StatusCode::NO_CONTENT.into_response(),
        Acknowledgement::Accepted(Some(follow_up)) => {
            // A refused follow-up is logged by the dispatcher and dropped; the
            // acknowledgment does not depend on it.
            let _ = state.dispatcher.dispatch(follow_up);
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaskill_core::events::{JOB_STATE_CHANGE_EVENT, SUBSCRIPTION_VALIDATION_EVENT};
    use serde_json::json;

    #[test]
    fn test_validation_echoes_code() {
        let event = json!({
            "eventType": SUBSCRIPTION_VALIDATION_EVENT,
            "data": {"validationCode": "512d38b6"}
        });
        assert_eq!(
            acknowledge(EventKind::SubscriptionValidation, &event),
            Acknowledgement::Validation(Some("512d38b6".into()))
        );
    }

    #[test]
    fn test_validation_without_code_is_still_answered() {
        let event = json!({"eventType": SUBSCRIPTION_VALIDATION_EVENT, "data": {}});
        assert_eq!(
            acknowledge(EventKind::SubscriptionValidation, &event),
            Acknowledgement::Validation(None)
        );
    }

    #[test]
    fn test_finished_job_schedules_follow_up() {
        let event = json!({
            "eventType": JOB_STATE_CHANGE_EVENT,
            "subject": "transforms/t/jobs/j",
            "data": {"state": "Finished", "correlationData": {"job": "{}"}}
        });
        let Acknowledgement::Accepted(Some(follow_up)) =
            acknowledge(EventKind::JobFinished, &event)
        else {
            panic!("expected a follow-up");
        };
        assert_eq!(follow_up.subject.as_deref(), Some("transforms/t/jobs/j"));
        assert_eq!(follow_up.correlation_data, Some(json!({"job": "{}"})));
    }

    #[test]
    fn test_canceled_and_errored_jobs_are_only_acknowledged() {
        let event = json!({"eventType": JOB_STATE_CHANGE_EVENT, "data": {"state": "Canceled"}});
        assert_eq!(
            acknowledge(EventKind::JobCanceled, &event),
            Acknowledgement::Accepted(None)
        );
        assert_eq!(
            acknowledge(EventKind::JobError, &event),
            Acknowledgement::Accepted(None)
        );
    }
}
