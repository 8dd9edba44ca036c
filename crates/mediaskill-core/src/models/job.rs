use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{ASSET_NAME_PREFIX, JOB_NAME_PREFIX};

/// Identity of one submitted analysis job.
///
/// Never stored by this service: it lives only in the correlation token and in
/// the analysis service's own job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub id: Uuid,
    pub name: String,
    pub output_asset_name: String,
    pub profile_name: String,
    pub created_at: DateTime<Utc>,
}

impl JobDescriptor {
    /// Fresh descriptor with generated job and output asset names.
    pub fn generate(profile_name: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: format!("{}-{}", JOB_NAME_PREFIX, id),
            output_asset_name: format!("{}-{}", ASSET_NAME_PREFIX, id),
            profile_name: profile_name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Returned to the caller of a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub job: JobDescriptor,
    /// State reported by the analysis service at creation time, e.g. `Queued`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_scopes_names_to_id() {
        let job = JobDescriptor::generate("VideoAnalyzerTransform_en-US");
        assert_eq!(job.name, format!("skill-job-{}", job.id));
        assert_eq!(job.output_asset_name, format!("skill-output-{}", job.id));
        assert_eq!(job.profile_name, "VideoAnalyzerTransform_en-US");
    }

    #[test]
    fn test_generate_is_unique() {
        let a = JobDescriptor::generate("p");
        let b = JobDescriptor::generate("p");
        assert_ne!(a.id, b.id);
        assert_ne!(a.output_asset_name, b.output_asset_name);
    }
}
