//! Background completion of finished jobs.
//!
//! The webhook acknowledges a job-finished event immediately and hands a
//! [`FollowUp`] to the dispatcher. A bounded queue feeds a loop that runs one
//! task per follow-up under a semaphore; failures go to a separate reporter
//! loop that turns them into error cards.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};

use mediaskill_core::Config;
use mediaskill_processing::{CompletionFailure, CompletionPipeline};

/// Work scheduled by a job-finished event.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub correlation_data: Option<serde_json::Value>,
    /// Event subject, kept for logs only
    pub subject: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Completion queue is full")]
    QueueFull,
    #[error("Completion dispatcher has stopped")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub max_workers: usize,
    pub queue_size: usize,
}

impl DispatcherConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_workers: config.skill.completion_max_workers.max(1),
            queue_size: config.skill.completion_queue_size.max(1),
        }
    }
}

#[derive(Clone)]
pub struct CompletionDispatcher {
    tx: mpsc::Sender<FollowUp>,
}

impl CompletionDispatcher {
    /// Spawn the dispatcher and reporter loops. Must be called inside a tokio
    /// runtime. Both loops stop once every dispatcher handle is dropped.
    pub fn start(pipeline: Arc<CompletionPipeline>, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_size);
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::dispatch_loop(
            pipeline.clone(),
            rx,
            error_tx,
            config.max_workers,
        ));
        tokio::spawn(Self::report_loop(pipeline, error_rx));

        tracing::info!(
            max_workers = config.max_workers,
            queue_size = config.queue_size,
            "Completion dispatcher started"
        );

        Self { tx }
    }

    /// Queue a follow-up without waiting. Fails when the queue is full or the
    /// dispatcher has stopped; the follow-up is dropped in both cases.
    pub fn dispatch(&self, follow_up: FollowUp) -> Result<(), DispatchError> {
        let subject = follow_up.subject.clone();
        self.tx.try_send(follow_up).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!(
                    subject = subject.as_deref().unwrap_or("unknown"),
                    "Completion queue full, dropping follow-up"
                );
                DispatchError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => {
                tracing::error!(
                    subject = subject.as_deref().unwrap_or("unknown"),
                    "Completion dispatcher stopped, dropping follow-up"
                );
                DispatchError::Closed
            }
        })
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn dispatch_loop(
        pipeline: Arc<CompletionPipeline>,
        mut rx: mpsc::Receiver<FollowUp>,
        error_tx: mpsc::UnboundedSender<CompletionFailure>,
        max_workers: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_workers));

        while let Some(follow_up) = rx.recv().await {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let pipeline = pipeline.clone();
            let error_tx = error_tx.clone();

            tokio::spawn(async move {
                let subject = follow_up.subject.as_deref().unwrap_or("unknown");
                let result = pipeline.handle(follow_up.correlation_data.as_ref()).await;
                drop(permit);

                match result {
                    Ok(report) => {
                        tracing::info!(
                            subject,
                            job_name = %report.job_name,
                            cards = report.cards,
                            duration = report.duration,
                            "Completion finished"
                        );
                    }
                    Err(failure) => {
                        if error_tx.send(failure).is_err() {
                            tracing::error!(subject, "Completion reporter stopped");
                        }
                    }
                }
            });
        }

        tracing::info!("Completion dispatcher shutting down");
    }

    async fn report_loop(
        pipeline: Arc<CompletionPipeline>,
        mut error_rx: mpsc::UnboundedReceiver<CompletionFailure>,
    ) {
        while let Some(failure) = error_rx.recv().await {
            pipeline.report(&failure).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaskill_core::correlation;
    use mediaskill_core::JobDescriptor;
    use mediaskill_processing::test_helpers::{
        sample_file_context, FakeBlobStore, FakeMediaClient, RecordingSkillsWriter,
    };
    use mediaskill_processing::{ResourceReaper, ResultTransformer};
    use std::time::Duration;

    const SAS_URL: &str = "https://st.blob.core.windows.net/asset-1?sig=s";

    fn pipeline(media: &FakeMediaClient, writer: &RecordingSkillsWriter) -> Arc<CompletionPipeline> {
        let blobs = FakeBlobStore::new().with_blob(
            "insights.json",
            r#"{"duration": "0:00:05", "transcript": [{"text": "hi", "instances": []}]}"#,
        );
        Arc::new(CompletionPipeline::new(
            ResultTransformer::new(Arc::new(media.clone()), Arc::new(blobs), "en-US"),
            ResourceReaper::new(Arc::new(media.clone())),
            Arc::new(writer.clone()),
        ))
    }

    fn follow_up_for(job: &JobDescriptor) -> FollowUp {
        let token = correlation::encode(job, &sample_file_context()).unwrap();
        FollowUp {
            correlation_data: Some(serde_json::to_value(token.to_map()).unwrap()),
            subject: Some(format!("transforms/{}/jobs/{}", job.profile_name, job.name)),
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_dispatched_follow_up_writes_cards() {
        let media = FakeMediaClient::new().with_container_sas(SAS_URL);
        let writer = RecordingSkillsWriter::new();
        let dispatcher = CompletionDispatcher::start(
            pipeline(&media, &writer),
            DispatcherConfig {
                max_workers: 2,
                queue_size: 4,
            },
        );

        let job = JobDescriptor::generate("p");
        dispatcher.dispatch(follow_up_for(&job)).unwrap();

        wait_for(|| !writer.saved_cards().is_empty()).await;
        assert_eq!(media.deleted_jobs(), vec![job.name]);
    }

    #[tokio::test]
    async fn test_failures_reach_the_reporter() {
        let media = FakeMediaClient::new().with_container_sas(SAS_URL);
        let writer = RecordingSkillsWriter::new().fail_data_writes();
        let dispatcher = CompletionDispatcher::start(
            pipeline(&media, &writer),
            DispatcherConfig {
                max_workers: 1,
                queue_size: 4,
            },
        );

        dispatcher
            .dispatch(follow_up_for(&JobDescriptor::generate("p")))
            .unwrap();

        wait_for(|| !writer.error_cards().is_empty()).await;
        assert_eq!(
            writer.error_cards()[0].1,
            mediaskill_core::SkillErrorKind::InvocationsError
        );
    }

    #[tokio::test]
    async fn test_busy_dispatcher_refuses_follow_ups() {
        let media = FakeMediaClient::new()
            .with_container_sas(SAS_URL)
            .stall_container_sas();
        let writer = RecordingSkillsWriter::new();
        let dispatcher = CompletionDispatcher::start(
            pipeline(&media, &writer),
            DispatcherConfig {
                max_workers: 1,
                queue_size: 1,
            },
        );

        // One running, one waiting for the worker, one queued.
        let mut refused = None;
        for _ in 0..5 {
            if let Err(e) = dispatcher.dispatch(follow_up_for(&JobDescriptor::generate("p"))) {
                refused = Some(e);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(refused, Some(DispatchError::QueueFull));
        assert!(dispatcher.is_open());
        assert!(writer.saved_cards().is_empty());
        assert!(writer.error_cards().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_follow_up_is_only_logged() {
        let media = FakeMediaClient::new();
        let writer = RecordingSkillsWriter::new();
        let dispatcher = CompletionDispatcher::start(
            pipeline(&media, &writer),
            DispatcherConfig {
                max_workers: 1,
                queue_size: 1,
            },
        );

        dispatcher
            .dispatch(FollowUp {
                correlation_data: None,
                subject: None,
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(writer.error_cards().is_empty());
        assert!(writer.saved_cards().is_empty());
        assert!(dispatcher.is_open());
    }
}
