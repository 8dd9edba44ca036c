//! Mediaskill Processing Library
//!
//! The job pipeline proper:
//! - `JobOrchestrator` provisions shared resources and submits analysis jobs
//! - `ResultTransformer` turns a finished job's insights into display cards
//! - `ResourceReaper` removes the job and its output asset
//! - `CompletionPipeline` runs the three for one completion event

pub mod completion;
pub mod orchestrator;
pub mod reaper;
pub mod transformer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use completion::{CompletionFailure, CompletionPipeline, CompletionReport, PipelineError};
pub use orchestrator::{JobOrchestrator, OrchestratorSettings, ProvisioningError};
pub use reaper::{CleanupReport, CleanupStatus, ResourceReaper};
pub use transformer::{ResultTransformer, TransformError};
