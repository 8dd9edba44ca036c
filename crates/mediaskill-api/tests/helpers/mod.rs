//! Test helpers: build AppState and router over in-memory collaborators.
//!
//! Run with: `cargo test -p mediaskill-api`

#![allow(dead_code)]

use axum_test::TestServer;
use mediaskill_api::setup::routes;
use mediaskill_api::state::{AppState, Collaborators};
use mediaskill_core::Config;
use mediaskill_processing::test_helpers::{
    test_config, FakeBlobStore, FakeMediaClient, FakeSubscriptionClient, RecordingSkillsWriter,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const SAS_URL: &str = "https://st.blob.core.windows.net/asset-1?sv=2018&sig=s";

/// Test application: server plus handles on every fake for assertions.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub media: FakeMediaClient,
    pub subscriptions: FakeSubscriptionClient,
    pub writer: RecordingSkillsWriter,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn insights_json() -> String {
    json!({
        "duration": "0:01:05.5",
        "faces": [
            {"id": 1, "thumbnailId": "t-1", "instances": [{"start": "0:00:01", "end": "0:00:03"}]}
        ],
        "ocr": [
            {"text": "EXIT", "confidence": 0.9, "language": "en-US", "instances": [{"start": "0:00:10", "end": "0:00:12"}]}
        ],
        "keywords": [
            {"text": "EXIT", "confidence": 0.8, "language": "en-US", "instances": [{"start": "0:00:10", "end": "0:00:11"}]},
            {"text": "harbor", "confidence": 0.95, "language": "en-US", "instances": [{"start": "0:00:20", "end": "0:00:25"}]}
        ],
        "transcript": [
            {"text": "Welcome aboard.", "instances": [{"start": "0:00:00", "end": "0:00:02"}]}
        ]
    })
    .to_string()
}

/// Setup a test app whose media account has finished output for every job.
pub async fn setup_test_app() -> TestApp {
    setup_with(
        FakeMediaClient::new().with_container_sas(SAS_URL),
        FakeSubscriptionClient::new(),
        FakeBlobStore::new().with_blob("insights.json", &insights_json()),
        RecordingSkillsWriter::new(),
    )
    .await
}

pub async fn setup_with(
    media: FakeMediaClient,
    subscriptions: FakeSubscriptionClient,
    blobs: FakeBlobStore,
    writer: RecordingSkillsWriter,
) -> TestApp {
    setup_with_config(test_config(), media, subscriptions, blobs, writer).await
}

pub async fn setup_with_config(
    config: Config,
    media: FakeMediaClient,
    subscriptions: FakeSubscriptionClient,
    blobs: FakeBlobStore,
    writer: RecordingSkillsWriter,
) -> TestApp {
    let state = Arc::new(AppState::new(
        config,
        Collaborators {
            media: Arc::new(media.clone()),
            subscriptions: Arc::new(subscriptions.clone()),
            blobs: Arc::new(blobs),
            writer: Arc::new(writer.clone()),
        },
    ));

    let server = TestServer::new(routes::setup_routes(state.clone()))
        .expect("Failed to create test server");

    TestApp {
        server,
        state,
        media,
        subscriptions,
        writer,
    }
}

pub fn skill_invocation(file_id: &str) -> Value {
    json!({
        "type": "skill_invocation",
        "id": "inv-42",
        "skill": {"id": "skill-7", "type": "skill", "name": "video-insights"},
        "token": {
            "read": {"access_token": "read-token", "expires_in": 3600},
            "write": {"access_token": "write-token", "expires_in": 3600}
        },
        "source": {"type": "file", "id": file_id, "name": "harbor tour.MP4", "size": 104857600},
        "event": {"type": "FILE.UPLOADED"}
    })
}

pub fn job_state_event(state: &str, correlation_data: Value) -> Value {
    json!([{
        "id": "evt-1",
        "topic": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Media/mediaServices/acct",
        "subject": "transforms/VideoAnalyzerTransform_en-US/jobs/skill-job-1",
        "eventType": "Microsoft.Media.JobStateChange",
        "eventTime": "2026-10-16T09:00:00Z",
        "data": {
            "previousState": "Processing",
            "state": state,
            "correlationData": correlation_data
        },
        "dataVersion": "1.0"
    }])
}

/// Poll until `condition` holds; completions run on background tasks.
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}
