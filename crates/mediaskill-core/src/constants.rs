//! Fixed names and limits shared across crates.

/// Faces kept for the faces card, in document order.
pub const MAX_RELEVANT_FACES: usize = 20;

/// OCR words and keywords kept per topics card.
pub const MAX_RELEVANT_TERMS: usize = 25;

/// Terms at or below this confidence are treated as noise.
pub const CONFIDENCE_CUTOFF: f64 = 0.6;

/// Name of the analysis document inside the job's output container.
pub const INSIGHTS_BLOB_NAME: &str = "insights.json";

pub const INSIGHTS_BLOB_TYPE: &str = "BlockBlob";

/// Duration assumed when the insights document does not carry one.
pub const DEFAULT_INSIGHTS_DURATION: &str = "00:00:00";

/// Read SAS lifetime for the output container.
pub const CONTAINER_SAS_TTL_SECS: i64 = 3600;

pub const JOB_NAME_PREFIX: &str = "skill-job";
pub const ASSET_NAME_PREFIX: &str = "skill-output";
pub const PROFILE_NAME_PREFIX: &str = "VideoAnalyzerTransform";

pub const EVENT_SUBSCRIPTION_NAME: &str = "media-skill-event-subscription";

/// Box metadata template that holds skill cards.
pub const SKILLS_METADATA_TEMPLATE: &str = "boxSkillsCards";

/// Profile name for a given audio language, e.g. `VideoAnalyzerTransform_en-US`.
pub fn profile_name(language: &str) -> String {
    format!("{}_{}", PROFILE_NAME_PREFIX, language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_name_is_language_scoped() {
        assert_eq!(profile_name("en-US"), "VideoAnalyzerTransform_en-US");
        assert_ne!(profile_name("en-US"), profile_name("fr-FR"));
    }
}
