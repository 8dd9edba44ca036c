//! Box skill card writer.
//!
//! Cards live in the `boxSkillsCards` global metadata instance of the source
//! file. The first write creates the instance; later writes replace its
//! `cards` array.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};

use mediaskill_core::constants::SKILLS_METADATA_TEMPLATE;
use mediaskill_core::{Card, CardKind, EntryType, FileContext, MediaDuration, SkillErrorKind};

use crate::error::{ServiceError, ServiceResult};
use crate::http::ensure_success;
use crate::traits::SkillsWriter;

const PROCESSING_CODE: &str = "skills_pending_status";
const PROCESSING_MESSAGE: &str = "We're preparing to process your file. Please hold on!";

pub struct BoxSkillsWriter {
    http_client: Client,
    api_url: String,
}

impl BoxSkillsWriter {
    pub fn new(http_client: Client, api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn metadata_url(&self, file_id: &str) -> String {
        format!(
            "{}/files/{}/metadata/global/{}",
            self.api_url, file_id, SKILLS_METADATA_TEMPLATE
        )
    }

    /// Create the metadata instance, replacing its cards if it already exists.
    async fn write_cards(&self, file_context: &FileContext, cards: Vec<Value>) -> ServiceResult<()> {
        let token = file_context
            .file_write_token
            .as_deref()
            .ok_or_else(|| ServiceError::Auth("file context has no write token".to_string()))?;
        let url = self.metadata_url(&file_context.file_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "cards": cards }))
            .send()
            .await?;

        if response.status() != StatusCode::CONFLICT {
            ensure_success(&url, response).await?;
            return Ok(());
        }

        let patch = json!([{ "op": "replace", "path": "/cards", "value": cards }]);
        let response = self
            .http_client
            .put(&url)
            .bearer_auth(token)
            .header(header::CONTENT_TYPE, "application/json-patch+json")
            .body(patch.to_string())
            .send()
            .await?;
        ensure_success(&url, response).await?;
        Ok(())
    }
}

fn skill_ref(file_context: &FileContext) -> Value {
    json!({ "type": "service", "id": file_context.skill_id })
}

fn invocation_ref(file_context: &FileContext) -> Value {
    json!({ "type": "skill_invocation", "id": file_context.request_id })
}

fn title_code(card: &Card) -> String {
    match card.kind {
        CardKind::Faces => "skills_faces".to_string(),
        CardKind::Transcript => "skills_transcript".to_string(),
        CardKind::Topics => format!("skills_{}", card.title.to_lowercase()),
    }
}

/// Render data cards in the skill card metadata schema.
pub fn render_cards(
    file_context: &FileContext,
    cards: &[Card],
    duration: MediaDuration,
) -> Vec<Value> {
    cards
        .iter()
        .map(|card| {
            let card_type = match card.kind {
                CardKind::Faces => "timeline",
                CardKind::Topics => "keyword",
                CardKind::Transcript => "transcript",
            };
            let entries: Vec<Value> = card
                .entries
                .iter()
                .map(|entry| {
                    let mut rendered = json!({
                        "type": match entry.entry_type {
                            EntryType::Image => "image",
                            EntryType::Topic | EntryType::Transcript => "text",
                        },
                        "text": entry.text,
                        "appears": entry.appears,
                    });
                    if let Some(image_url) = &entry.image_url {
                        rendered["image_url"] = json!(image_url);
                    }
                    rendered
                })
                .collect();

            json!({
                "type": "skill_card",
                "skill_card_type": card_type,
                "skill_card_title": { "code": title_code(card), "message": card.title },
                "skill": skill_ref(file_context),
                "invocation": invocation_ref(file_context),
                "duration": duration.value,
                "entries": entries,
            })
        })
        .collect()
}

/// Render a status card.
pub fn render_status_card(file_context: &FileContext, code: &str, message: &str) -> Value {
    json!({
        "type": "skill_card",
        "skill_card_type": "status",
        "skill_card_title": { "code": "skills_status", "message": "Status" },
        "status": { "code": code, "message": message },
        "skill": skill_ref(file_context),
        "invocation": invocation_ref(file_context),
    })
}

#[async_trait]
impl SkillsWriter for BoxSkillsWriter {
    #[tracing::instrument(skip(self, file_context, cards), fields(file_id = %file_context.file_id))]
    async fn save_data_cards(
        &self,
        file_context: &FileContext,
        cards: &[Card],
        duration: MediaDuration,
    ) -> ServiceResult<()> {
        self.write_cards(file_context, render_cards(file_context, cards, duration))
            .await?;
        tracing::info!(cards = cards.len(), "Saved skill cards");
        Ok(())
    }

    #[tracing::instrument(skip(self, file_context), fields(file_id = %file_context.file_id))]
    async fn save_error_card(
        &self,
        file_context: &FileContext,
        kind: SkillErrorKind,
    ) -> ServiceResult<()> {
        let card = render_status_card(file_context, kind.code(), kind.message());
        self.write_cards(file_context, vec![card]).await
    }

    async fn save_processing_card(&self, file_context: &FileContext) -> ServiceResult<()> {
        let card = render_status_card(file_context, PROCESSING_CODE, PROCESSING_MESSAGE);
        self.write_cards(file_context, vec![card]).await
    }
}
