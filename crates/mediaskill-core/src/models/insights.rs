//! Analysis output (`insights.json`) as produced by the video analyzer preset.
//!
//! Only the collections that feed cards are modelled; everything else in the
//! document is ignored. Every collection defaults to empty.

use serde::Deserialize;

use crate::constants::DEFAULT_INSIGHTS_DURATION;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightsDocument {
    pub faces: Vec<Face>,
    pub ocr: Vec<TextTerm>,
    pub keywords: Vec<TextTerm>,
    pub transcript: Vec<TranscriptLine>,
    pub duration: Option<String>,
}

impl InsightsDocument {
    pub fn duration_or_default(&self) -> &str {
        self.duration
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_INSIGHTS_DURATION)
    }
}

/// Time range in which an item appears.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Occurrence {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Face {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub thumbnail_id: Option<String>,
    pub instances: Vec<Occurrence>,
}

/// An OCR word or a keyword.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextTerm {
    pub text: String,
    pub confidence: f64,
    pub language: Option<String>,
    pub instances: Vec<Occurrence>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranscriptLine {
    pub text: String,
    pub instances: Vec<Occurrence>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_collections_default_to_empty() {
        let doc: InsightsDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.faces.is_empty());
        assert!(doc.ocr.is_empty());
        assert!(doc.keywords.is_empty());
        assert!(doc.transcript.is_empty());
        assert_eq!(doc.duration_or_default(), "00:00:00");
    }

    #[test]
    fn test_parses_analyzer_output() {
        let doc: InsightsDocument = serde_json::from_str(
            r#"{
                "version": "1.0.0.0",
                "duration": "0:01:00.04",
                "faces": [{
                    "id": 1,
                    "name": null,
                    "thumbnailId": "c1d2",
                    "instances": [{"start": "0:00:01", "end": "0:00:03.5"}]
                }],
                "ocr": [{"text": "Hi", "confidence": 0.91, "language": "en-US",
                         "instances": [{"start": "0:00:02", "end": "0:00:04"}]}],
                "statistics": {"speakerNumberOfFragments": {}}
            }"#,
        )
        .unwrap();

        assert_eq!(doc.faces.len(), 1);
        assert!(doc.faces[0].name.is_none());
        assert_eq!(doc.faces[0].thumbnail_id.as_deref(), Some("c1d2"));
        assert_eq!(doc.ocr[0].language.as_deref(), Some("en-US"));
        assert_eq!(doc.duration_or_default(), "0:01:00.04");
    }
}
