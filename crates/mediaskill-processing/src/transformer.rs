//! Insights to cards.
//!
//! `run` fetches the analysis document of a finished job; `build_cards` is the
//! pure reduction of that document into display cards.

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use mediaskill_core::constants::{
    CONFIDENCE_CUTOFF, CONTAINER_SAS_TTL_SECS, INSIGHTS_BLOB_NAME, INSIGHTS_BLOB_TYPE,
    MAX_RELEVANT_FACES, MAX_RELEVANT_TERMS,
};
use mediaskill_core::models::{Face, Occurrence, TextTerm, TranscriptLine};
use mediaskill_core::{
    to_seconds, Appearance, Card, CardEntry, EntryType, FileContext, InsightsDocument,
    JobDescriptor, TransformOutput,
};
use mediaskill_services::{BlobStore, ContainerUrl, MediaJobClient, ServiceError};

pub const OCR_CARD_TITLE: &str = "Text";
pub const KEYWORD_CARD_TITLE: &str = "Topics";

#[derive(Debug, Error)]
pub enum TransformError {
    /// The output asset no longer exists, typically because an earlier
    /// delivery of the same event already cleaned up.
    #[error("Output asset '{0}' no longer exists")]
    OutputGone(String),

    #[error("Failed to obtain container SAS: {0}")]
    ContainerSas(#[source] ServiceError),

    #[error("Failed to list output container: {0}")]
    Listing(#[source] ServiceError),

    #[error("insights.json not found in output container")]
    InsightsMissing,

    #[error("Failed to read insights: {0}")]
    Read(#[source] ServiceError),

    #[error("Failed to parse insights: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct ResultTransformer {
    media: Arc<dyn MediaJobClient>,
    blobs: Arc<dyn BlobStore>,
    language: String,
}

impl ResultTransformer {
    pub fn new(
        media: Arc<dyn MediaJobClient>,
        blobs: Arc<dyn BlobStore>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            media,
            blobs,
            language: language.into(),
        }
    }

    /// Download the job's insights document and reduce it to cards.
    #[tracing::instrument(
        skip(self, job, file_context),
        fields(job_name = %job.name, file_id = %file_context.file_id)
    )]
    pub async fn run(
        &self,
        job: &JobDescriptor,
        file_context: &FileContext,
    ) -> Result<TransformOutput, TransformError> {
        let expiry = Utc::now() + Duration::seconds(CONTAINER_SAS_TTL_SECS);
        let sas_url = self
            .media
            .container_sas(&job.output_asset_name, expiry)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(_) => {
                    TransformError::OutputGone(job.output_asset_name.clone())
                }
                other => TransformError::ContainerSas(other),
            })?;
        let container = ContainerUrl::parse(&sas_url).map_err(TransformError::ContainerSas)?;

        let entries = self.blobs.list(&sas_url).await.map_err(|e| match e {
            ServiceError::NotFound(_) => TransformError::OutputGone(job.output_asset_name.clone()),
            other => TransformError::Listing(other),
        })?;

        let insights = entries
            .iter()
            .find(|entry| {
                entry.name == INSIGHTS_BLOB_NAME
                    && entry
                        .blob_type
                        .as_deref()
                        .map_or(true, |t| t == INSIGHTS_BLOB_TYPE)
            })
            .ok_or(TransformError::InsightsMissing)?;

        let raw = self
            .blobs
            .read_text(&sas_url, &insights.name)
            .await
            .map_err(TransformError::Read)?;
        let document: InsightsDocument = serde_json::from_str(&raw)?;

        let output = build_cards(&document, &container, &self.language);
        tracing::info!(
            cards = output.cards.len(),
            duration = output.duration,
            "Transformed insights"
        );
        Ok(output)
    }
}

/// Reduce an insights document to cards, in display order: faces, OCR
/// topics, keyword topics, transcript.
pub fn build_cards(
    document: &InsightsDocument,
    container: &ContainerUrl,
    language: &str,
) -> TransformOutput {
    let ocr = relevant_ocr(&document.ocr, language);
    let keywords = relevant_keywords(&document.keywords, &ocr, language);

    let cards = vec![
        Card::faces(face_entries(&document.faces, container)),
        Card::topics(OCR_CARD_TITLE, ocr.into_iter().map(topic_entry).collect()),
        Card::topics(
            KEYWORD_CARD_TITLE,
            keywords.into_iter().map(topic_entry).collect(),
        ),
        Card::transcript(transcript_entries(&document.transcript)),
    ];

    TransformOutput {
        cards,
        duration: to_seconds(Some(document.duration_or_default())).unwrap_or(0),
    }
}

fn appearances(instances: &[Occurrence]) -> Vec<Appearance> {
    instances
        .iter()
        .map(|instance| Appearance {
            start: to_seconds(instance.start.as_deref()).unwrap_or(0),
            end: to_seconds(instance.end.as_deref()).unwrap_or(0),
        })
        .collect()
}

fn face_entries(faces: &[Face], container: &ContainerUrl) -> Vec<CardEntry> {
    let mut unknown = 0;
    faces
        .iter()
        .take(MAX_RELEVANT_FACES)
        .map(|face| {
            let text = match face.name.as_deref().filter(|name| !name.is_empty()) {
                Some(name) => name.to_string(),
                None => {
                    unknown += 1;
                    format!("Unknown #{}", unknown)
                }
            };

            CardEntry {
                entry_type: EntryType::Image,
                text,
                image_url: face
                    .thumbnail_id
                    .as_deref()
                    .map(|id| container.blob_url(&format!("FaceThumbnail_{}.jpg", id))),
                appears: appearances(&face.instances),
            }
        })
        .collect()
}

fn is_relevant(term: &TextTerm, language: &str) -> bool {
    term.confidence > CONFIDENCE_CUTOFF && term.language.as_deref() == Some(language)
}

fn relevant_ocr<'a>(ocr: &'a [TextTerm], language: &str) -> Vec<&'a TextTerm> {
    ocr.iter()
        .filter(|term| is_relevant(term, language))
        .take(MAX_RELEVANT_TERMS)
        .collect()
}

/// Keywords already shown as OCR text are left out.
fn relevant_keywords<'a>(
    keywords: &'a [TextTerm],
    ocr: &[&TextTerm],
    language: &str,
) -> Vec<&'a TextTerm> {
    let seen: HashSet<&str> = ocr.iter().map(|term| term.text.as_str()).collect();
    keywords
        .iter()
        .filter(|term| is_relevant(term, language) && !seen.contains(term.text.as_str()))
        .take(MAX_RELEVANT_TERMS)
        .collect()
}

fn topic_entry(term: &TextTerm) -> CardEntry {
    CardEntry {
        entry_type: EntryType::Topic,
        text: term.text.clone(),
        image_url: None,
        appears: appearances(&term.instances),
    }
}

fn transcript_entries(transcript: &[TranscriptLine]) -> Vec<CardEntry> {
    transcript
        .iter()
        .map(|line| CardEntry {
            entry_type: EntryType::Transcript,
            text: line.text.clone(),
            image_url: None,
            appears: appearances(&line.instances),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{sample_file_context, FakeBlobStore, FakeMediaClient};
    use mediaskill_core::CardKind;
    use serde_json::json;

    const SAS_URL: &str = "https://st.blob.core.windows.net/asset-abc?sv=1&sig=s";

    fn container() -> ContainerUrl {
        ContainerUrl::parse(SAS_URL).unwrap()
    }

    fn document(value: serde_json::Value) -> InsightsDocument {
        serde_json::from_value(value).unwrap()
    }

    fn term(text: &str, confidence: f64, language: &str) -> serde_json::Value {
        json!({"text": text, "confidence": confidence, "language": language,
               "instances": [{"start": "0:00:01", "end": "0:00:02"}]})
    }

    #[test]
    fn test_face_ranking_and_unknown_labels() {
        let faces: Vec<_> = (0..25)
            .map(|i| {
                let name = if i % 5 == 0 {
                    serde_json::Value::Null
                } else {
                    json!(format!("Person {}", i))
                };
                json!({"id": i, "name": name, "thumbnailId": format!("t{}", i), "instances": []})
            })
            .collect();
        let output = build_cards(&document(json!({"faces": faces})), &container(), "en-US");

        let faces = &output.cards[0];
        assert_eq!(faces.kind, CardKind::Faces);
        assert_eq!(faces.entries.len(), 20);
        let unknown: Vec<_> = faces
            .texts()
            .into_iter()
            .filter(|t| t.starts_with("Unknown"))
            .collect();
        assert_eq!(unknown, vec!["Unknown #1", "Unknown #2", "Unknown #3", "Unknown #4"]);
        assert_eq!(faces.entries[1].text, "Person 1");
        assert_eq!(
            faces.entries[0].image_url.as_deref(),
            Some("https://st.blob.core.windows.net/asset-abc/FaceThumbnail_t0.jpg?sv=1&sig=s")
        );
    }

    #[test]
    fn test_confidence_cutoff_and_language_filter() {
        let doc = document(json!({
            "ocr": [
                term("low", 0.6, "en-US"),
                term("ok", 0.61, "en-US"),
                term("other", 0.99, "fr-FR"),
            ],
            "keywords": [term("kw", 0.7, "en-US"), term("kwlow", 0.2, "en-US")]
        }));
        let output = build_cards(&doc, &container(), "en-US");

        assert_eq!(output.cards[1].texts(), vec!["ok"]);
        assert_eq!(output.cards[2].texts(), vec!["kw"]);
    }

    #[test]
    fn test_keywords_exclude_selected_ocr_text() {
        let doc = document(json!({
            "ocr": [term("Hi", 0.9, "en-US"), term("Low", 0.1, "en-US")],
            "keywords": [term("Hi", 0.95, "en-US"), term("Low", 0.9, "en-US")]
        }));
        let output = build_cards(&doc, &container(), "en-US");

        assert_eq!(output.cards[1].texts(), vec!["Hi"]);
        // "Low" was filtered out of OCR, so it remains eligible as a keyword
        assert_eq!(output.cards[2].texts(), vec!["Low"]);
    }

    #[test]
    fn test_terms_are_capped() {
        let ocr: Vec<_> = (0..30).map(|i| term(&format!("w{}", i), 0.9, "en-US")).collect();
        let output = build_cards(&document(json!({"ocr": ocr})), &container(), "en-US");
        assert_eq!(output.cards[1].entries.len(), 25);
        assert_eq!(output.cards[1].entries[24].text, "w24");
    }

    #[test]
    fn test_transcript_is_kept_whole() {
        let lines: Vec<_> = (0..40)
            .map(|i| json!({"text": format!("line {}", i), "instances": [{"start": "0:00:05.5", "end": null}]}))
            .collect();
        let output = build_cards(&document(json!({"transcript": lines})), &container(), "en-US");

        let transcript = &output.cards[3];
        assert_eq!(transcript.kind, CardKind::Transcript);
        assert_eq!(transcript.entries.len(), 40);
        assert_eq!(transcript.entries[0].appears[0], Appearance { start: 5, end: 0 });
    }

    #[test]
    fn test_empty_document() {
        let output = build_cards(&InsightsDocument::default(), &container(), "en-US");
        assert_eq!(output.cards.len(), 4);
        assert!(output.cards.iter().all(|card| card.entries.is_empty()));
        assert_eq!(output.duration, 0);
    }

    #[tokio::test]
    async fn test_run_end_to_end() {
        let media = FakeMediaClient::new().with_container_sas(SAS_URL);
        let blobs = FakeBlobStore::new().with_blob(
            "insights.json",
            &json!({
                "duration": "00:01:00",
                "faces": [{"id": 1, "name": "Ann", "thumbnailId": "f1",
                           "instances": [{"start": "0:00:01", "end": "0:00:03"}]}],
                "ocr": [term("Hi", 0.9, "en-US")],
                "keywords": [term("Hi", 0.9, "en-US")]
            })
            .to_string(),
        );
        let transformer =
            ResultTransformer::new(Arc::new(media), Arc::new(blobs), "en-US".to_string());

        let mut job = JobDescriptor::generate("p");
        job.name = "abc".to_string();
        let output = transformer.run(&job, &sample_file_context()).await.unwrap();

        assert_eq!(output.duration, 60);
        assert_eq!(output.cards[0].entries.len(), 1);
        assert_eq!(output.cards[0].entries[0].text, "Ann");
        assert_eq!(output.cards[0].entries[0].appears, vec![Appearance { start: 1, end: 3 }]);
        assert_eq!(output.cards[1].entries.len(), 1);
        assert_eq!(output.cards[2].entries.len(), 0);
        assert!(output.cards[3].entries.is_empty());
    }

    #[tokio::test]
    async fn test_missing_insights_is_fatal() {
        let media = FakeMediaClient::new().with_container_sas(SAS_URL);
        let blobs = FakeBlobStore::new().with_blob("FaceThumbnail_1.jpg", "");
        let transformer = ResultTransformer::new(Arc::new(media), Arc::new(blobs), "en-US");

        let err = transformer
            .run(&JobDescriptor::generate("p"), &sample_file_context())
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::InsightsMissing));
    }

    #[tokio::test]
    async fn test_deleted_asset_is_output_gone() {
        let media = FakeMediaClient::new();
        let transformer =
            ResultTransformer::new(Arc::new(media), Arc::new(FakeBlobStore::new()), "en-US");

        let err = transformer
            .run(&JobDescriptor::generate("p"), &sample_file_context())
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::OutputGone(_)));
    }

    #[tokio::test]
    async fn test_unparseable_insights() {
        let media = FakeMediaClient::new().with_container_sas(SAS_URL);
        let blobs = FakeBlobStore::new().with_blob("insights.json", "{not json");
        let transformer = ResultTransformer::new(Arc::new(media), Arc::new(blobs), "en-US");

        let err = transformer
            .run(&JobDescriptor::generate("p"), &sample_file_context())
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Parse(_)));
    }
}
