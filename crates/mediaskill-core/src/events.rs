//! Webhook event classification.
//!
//! The event bus delivers an array of events. Only the first element is
//! classified: a batch of several events is handled as if it were its first
//! event alone. Classification never fails; anything that does not look like an
//! event from the vendor namespace is [`EventKind::Foreign`] and is left for the
//! next handler.

use serde_json::Value;

pub const VENDOR_NAMESPACE: &str = "Microsoft";
pub const SUBSCRIPTION_VALIDATION_EVENT: &str = "Microsoft.EventGrid.SubscriptionValidationEvent";
pub const SUBSCRIPTION_DELETION_EVENT: &str = "Microsoft.EventGrid.SubscriptionDeletedEvent";
pub const JOB_STATE_CHANGE_EVENT: &str = "Microsoft.Media.JobStateChange";

pub const JOB_STATE_FINISHED: &str = "Finished";
pub const JOB_STATE_CANCELED: &str = "Canceled";
pub const JOB_STATE_ERROR: &str = "Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Not an event of interest; pass the request on untouched.
    Foreign,
    SubscriptionValidation,
    SubscriptionDeletion,
    JobFinished,
    JobCanceled,
    JobError,
    /// In the vendor namespace but none of the kinds above.
    Unrecognized,
}

impl EventKind {
    pub fn is_of_interest(&self) -> bool {
        !matches!(self, EventKind::Foreign)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Foreign => "foreign",
            EventKind::SubscriptionValidation => "subscription_validation",
            EventKind::SubscriptionDeletion => "subscription_deletion",
            EventKind::JobFinished => "job_finished",
            EventKind::JobCanceled => "job_canceled",
            EventKind::JobError => "job_error",
            EventKind::Unrecognized => "unrecognized",
        }
    }
}

/// First event of a delivery, if the body is a non-empty array.
pub fn first_event(body: &Value) -> Option<&Value> {
    body.as_array().and_then(|events| events.first())
}

/// Classify a webhook delivery body.
pub fn classify(body: &Value) -> EventKind {
    match first_event(body) {
        Some(event) => classify_event(event),
        None => EventKind::Foreign,
    }
}

/// Classify a single event object.
pub fn classify_event(event: &Value) -> EventKind {
    // Namespace check runs first; nothing else is read from foreign shapes.
    let event_type = match event_type(event) {
        Some(t) if t.starts_with(VENDOR_NAMESPACE) => t,
        _ => return EventKind::Foreign,
    };

    match event_type {
        SUBSCRIPTION_VALIDATION_EVENT => EventKind::SubscriptionValidation,
        SUBSCRIPTION_DELETION_EVENT => EventKind::SubscriptionDeletion,
        JOB_STATE_CHANGE_EVENT => match job_state(event) {
            Some(JOB_STATE_FINISHED) => EventKind::JobFinished,
            Some(JOB_STATE_CANCELED) => EventKind::JobCanceled,
            Some(JOB_STATE_ERROR) => EventKind::JobError,
            _ => EventKind::Unrecognized,
        },
        _ => EventKind::Unrecognized,
    }
}

pub fn event_type(event: &Value) -> Option<&str> {
    event.get("eventType").and_then(Value::as_str)
}

pub fn job_state(event: &Value) -> Option<&str> {
    event
        .get("data")
        .and_then(|data| data.get("state"))
        .and_then(Value::as_str)
}

/// Validation code of a subscription validation event.
pub fn validation_code(event: &Value) -> Option<&str> {
    event
        .get("data")
        .and_then(|data| data.get("validationCode"))
        .and_then(Value::as_str)
}

/// Correlation data echoed back on a job state change event.
pub fn correlation_data(event: &Value) -> Option<&Value> {
    event.get("data").and_then(|data| data.get("correlationData"))
}

/// Event subject, e.g. `transforms/{profile}/jobs/{job}`.
pub fn subject(event: &Value) -> Option<&str> {
    event.get("subject").and_then(Value::as_str)
}
