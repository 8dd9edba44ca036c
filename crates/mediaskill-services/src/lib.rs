//! Mediaskill Services Library
//!
//! Collaborator traits used by the processing pipeline and their HTTP
//! implementations:
//! - Azure AD token acquisition
//! - Azure Media Services (transforms, assets, jobs, container SAS)
//! - Event Grid subscriptions
//! - Blob containers addressed by SAS URL
//! - Box skill card writer

pub mod auth;
pub mod blob;
pub mod box_skills;
pub mod error;
pub mod event_grid;
mod http;
pub mod media;
pub mod traits;

// Re-export commonly used types
pub use auth::{AadTokenProvider, StaticTokenProvider, TokenProvider};
pub use blob::{ContainerUrl, SasBlobClient};
pub use box_skills::BoxSkillsWriter;
pub use error::{ServiceError, ServiceResult};
pub use event_grid::EventGridClient;
pub use media::AzureMediaClient;
pub use traits::{
    BlobEntry, BlobStore, CreatedJob, DeleteOutcome, EventSubscriptionClient, JobSubmission,
    MediaJobClient, RemoteResource, SkillsWriter,
};
