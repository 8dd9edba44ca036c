//! Application state shared by every handler.

use std::sync::Arc;

use mediaskill_core::Config;
use mediaskill_processing::{
    CompletionPipeline, JobOrchestrator, OrchestratorSettings, ResourceReaper, ResultTransformer,
};
use mediaskill_services::{BlobStore, EventSubscriptionClient, MediaJobClient, SkillsWriter};

use crate::dispatch::{CompletionDispatcher, DispatcherConfig};

/// External collaborators the service is wired against.
#[derive(Clone)]
pub struct Collaborators {
    pub media: Arc<dyn MediaJobClient>,
    pub subscriptions: Arc<dyn EventSubscriptionClient>,
    pub blobs: Arc<dyn BlobStore>,
    pub writer: Arc<dyn SkillsWriter>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub writer: Arc<dyn SkillsWriter>,
    pub dispatcher: CompletionDispatcher,
}

impl AppState {
    /// Build the orchestrator and completion pipeline and start the
    /// dispatcher. Must be called inside a tokio runtime.
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let orchestrator = JobOrchestrator::new(
            collaborators.media.clone(),
            collaborators.subscriptions,
            OrchestratorSettings::from_config(&config),
        );

        let pipeline = CompletionPipeline::new(
            ResultTransformer::new(
                collaborators.media.clone(),
                collaborators.blobs,
                config.language(),
            ),
            ResourceReaper::new(collaborators.media),
            collaborators.writer.clone(),
        );
        let dispatcher =
            CompletionDispatcher::start(Arc::new(pipeline), DispatcherConfig::from_config(&config));

        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            writer: collaborators.writer,
            dispatcher,
        }
    }
}
