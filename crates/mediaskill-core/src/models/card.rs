//! Display cards produced from an insights document.

use serde::{Deserialize, Serialize};

/// Which card family a card belongs to. The writer maps these onto the
/// target metadata schema (timeline / keyword / transcript).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Faces,
    Topics,
    Transcript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Image,
    Topic,
    Transcript,
}

/// One appearance of an entry, in whole seconds from the start of the media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub appears: Vec<Appearance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub kind: CardKind,
    pub title: String,
    pub entries: Vec<CardEntry>,
}

impl Card {
    pub fn faces(entries: Vec<CardEntry>) -> Self {
        Self {
            kind: CardKind::Faces,
            title: "Faces".to_string(),
            entries,
        }
    }

    pub fn topics(title: impl Into<String>, entries: Vec<CardEntry>) -> Self {
        Self {
            kind: CardKind::Topics,
            title: title.into(),
            entries,
        }
    }

    pub fn transcript(entries: Vec<CardEntry>) -> Self {
        Self {
            kind: CardKind::Transcript,
            title: "Transcript".to_string(),
            entries,
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }
}

/// Media duration delivered next to the card list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDuration {
    pub unit: DurationUnit,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Seconds,
}

impl MediaDuration {
    pub fn seconds(value: u64) -> Self {
        Self {
            unit: DurationUnit::Seconds,
            value,
        }
    }
}

/// Result of a transformation run. Card order is part of the display
/// contract: faces, OCR topics, keyword topics, transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub cards: Vec<Card>,
    pub duration: u64,
}

/// Failure reasons surfaced to the end user as an error card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillErrorKind {
    FileProcessingError,
    AlreadyProcessed,
    InvalidFileSize,
    InvalidFileFormat,
    InvalidEvent,
    NoInfoFound,
    InvocationsError,
    ExternalAuthError,
    BillingError,
    Unknown,
}

impl SkillErrorKind {
    /// Status code written into the error card.
    pub fn code(&self) -> &'static str {
        match self {
            SkillErrorKind::FileProcessingError => "skills_file_processing_error",
            SkillErrorKind::AlreadyProcessed => "skills_already_processed",
            SkillErrorKind::InvalidFileSize => "skills_invalid_file_size_error",
            SkillErrorKind::InvalidFileFormat => "skills_invalid_file_format_error",
            SkillErrorKind::InvalidEvent => "skills_invalid_event_error",
            SkillErrorKind::NoInfoFound => "skills_no_info_found",
            SkillErrorKind::InvocationsError => "skills_invocations_error",
            SkillErrorKind::ExternalAuthError => "skills_external_auth_error",
            SkillErrorKind::BillingError => "skills_billing_error",
            SkillErrorKind::Unknown => "skills_unknown_error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SkillErrorKind::FileProcessingError => {
                "We're sorry, something went wrong with processing the file."
            }
            SkillErrorKind::AlreadyProcessed => "This file has already been processed.",
            SkillErrorKind::InvalidFileSize => "The file size is not supported.",
            SkillErrorKind::InvalidFileFormat => "The file format is not supported.",
            SkillErrorKind::InvalidEvent => "The event received is not valid.",
            SkillErrorKind::NoInfoFound => "No information was found for this file.",
            SkillErrorKind::InvocationsError => {
                "Something went wrong while saving the results for this file."
            }
            SkillErrorKind::ExternalAuthError => {
                "The analysis service could not be authenticated."
            }
            SkillErrorKind::BillingError => "There is a billing issue with the analysis service.",
            SkillErrorKind::Unknown => "An unknown error occurred.",
        }
    }
}
