//! Mediaskill Core Library
//!
//! This crate provides the domain models, error types, configuration and the pure
//! codecs (timestamps, correlation tokens, webhook event classification) shared by
//! every mediaskill component.

pub mod config;
pub mod constants;
pub mod correlation;
pub mod error;
pub mod events;
pub mod models;
pub mod timecode;

// Re-export commonly used types
pub use config::{AzureConfig, BaseConfig, Config, LogFormat, SkillConfig};
pub use correlation::{CorrelationError, CorrelationToken};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use events::{classify, EventKind};
pub use models::{
    Appearance, Card, CardEntry, CardKind, EntryType, FileContext, InsightsDocument,
    JobDescriptor, JobHandle, MediaDuration, SkillErrorKind, SkillInvocation, TransformOutput,
};
pub use timecode::to_seconds;
