//! Bodies for the `/api/setup/*` project setup endpoints.
//!
//! Unlike the rest of the API these use camelCase field names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reference document attached during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDoc {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAnalysisRequest {
    pub example_passages: Vec<String>,
    pub uploaded_docs: Vec<UploadedDoc>,
    pub notebooklm_urls: Vec<String>,
    pub style_guide: String,
    pub genre: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGenerationRequest {
    pub name: String,
    pub genre: String,
    pub example_passages: Vec<String>,
    pub uploaded_docs: Vec<UploadedDoc>,
    pub notebooklm_urls: Vec<String>,
    pub voice_profile: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTestRequest {
    pub project_id: String,
    pub skill_type: String,
    pub test_scene: String,
}

/// Score a generated skill gave a test scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillTestResult {
    pub overall_score: Option<f64>,
    pub quality_tier: Option<String>,
    pub category_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProject {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoiceAnalysisResponse {
    #[serde(default)]
    pub voice_profile: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SkillGenerationResponse {
    #[serde(default)]
    pub skills: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_use_camel_case() {
        let request = SkillTestRequest {
            project_id: "low-tide".into(),
            skill_type: "scene-analyzer".into(),
            test_scene: "Fog on the pier.".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "projectId": "low-tide",
                "skillType": "scene-analyzer",
                "testScene": "Fog on the pier."
            })
        );
    }

    #[test]
    fn test_result_tolerates_missing_scores() {
        let result: SkillTestResult =
            serde_json::from_str(r#"{"overall_score": 72, "quality_tier": "B"}"#).unwrap();
        assert_eq!(result.overall_score, Some(72.0));
        assert!(result.category_scores.is_empty());
    }
}
