//! JSON bodies exchanged with the backend.
//!
//! Field names follow the backend's snake_case wire format. Optional fields are
//! defaulted so older backends that omit them still decode.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Identifier of a scene document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A scene as returned by `GET /api/scene/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SaveSceneBody<'a> {
    pub content: &'a str,
}

/// Acknowledgement of a successful `PUT /api/scene/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveAck {
    pub word_count: Option<u64>,
}

/// Act -> chapter -> scene hierarchy shown in the navigation tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptTree {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub acts: Vec<Act>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub scenes: Vec<SceneSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub id: SceneId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub word_count: u64,
}

impl ManuscriptTree {
    pub fn scenes(&self) -> impl Iterator<Item = &SceneSummary> {
        self.acts
            .iter()
            .flat_map(|act| act.chapters.iter())
            .flat_map(|chapter| chapter.scenes.iter())
    }

    pub fn scene(&self, id: &SceneId) -> Option<&SceneSummary> {
        self.scenes().find(|scene| &scene.id == id)
    }

    pub fn scene_mut(&mut self, id: &SceneId) -> Option<&mut SceneSummary> {
        self.acts
            .iter_mut()
            .flat_map(|act| act.chapters.iter_mut())
            .flat_map(|chapter| chapter.scenes.iter_mut())
            .find(|scene| &scene.id == id)
    }

    pub fn word_count(&self) -> u64 {
        self.scenes().map(|scene| scene.word_count).sum()
    }
}

/// An AI model offered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cost_input: Option<f64>,
    #[serde(default)]
    pub cost_output: Option<f64>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub is_local: bool,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: None,
            description: None,
            cost_input: None,
            cost_output: None,
            strengths: Vec::new(),
            is_local: false,
        }
    }

    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Prompt templates offered by the AI tools panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolTemplate {
    Generate,
    Enhance,
    Continue,
    VoiceTest,
}

impl ToolTemplate {
    pub const ALL: [ToolTemplate; 4] = [
        ToolTemplate::Generate,
        ToolTemplate::Enhance,
        ToolTemplate::Continue,
        ToolTemplate::VoiceTest,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolTemplate::Generate => "Generate New Scene",
            ToolTemplate::Enhance => "Enhance Scene",
            ToolTemplate::Continue => "Continue Scene",
            ToolTemplate::VoiceTest => "Voice Test",
        }
    }

    /// Last path segment of the endpoint under `/api/scene/`.
    pub fn endpoint(self) -> &'static str {
        match self {
            ToolTemplate::Generate | ToolTemplate::Continue => "generate",
            ToolTemplate::Enhance | ToolTemplate::VoiceTest => "enhance",
        }
    }

    /// Enhancement endpoints operate on existing scene text.
    pub fn needs_scene_text(self) -> bool {
        self.endpoint() == "enhance"
    }
}

impl std::str::FromStr for ToolTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(ToolTemplate::Generate),
            "enhance" => Ok(ToolTemplate::Enhance),
            "continue" => Ok(ToolTemplate::Continue),
            "voice" | "voice-test" => Ok(ToolTemplate::VoiceTest),
            other => Err(format!("unknown template: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationResult {
    pub success: bool,
    pub scene: Option<String>,
    pub enhanced_scene: Option<String>,
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn output(&self) -> Option<&str> {
        self.scene.as_deref().or(self.enhanced_scene.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub prompt: String,
    pub models: Vec<String>,
}

/// Outputs of a tournament comparison keyed by model id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonResult {
    pub success: bool,
    pub results: BTreeMap<String, String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelStatus {
    pub available: bool,
    pub models: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ManuscriptTree {
        serde_json::from_str(
            r#"{
                "title": "Explants",
                "acts": [{
                    "id": "act-1",
                    "title": "Act One",
                    "chapters": [
                        {"id": "ch-1", "title": "Arrival", "scenes": [
                            {"id": "s-1", "title": "Dock", "word_count": 120},
                            {"id": "s-2", "title": "Gate", "word_count": 80}
                        ]},
                        {"id": "ch-2", "title": "Market", "scenes": [
                            {"id": "s-3", "title": "Stalls"}
                        ]}
                    ]
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn tree_lookup_and_totals() {
        let mut tree = tree();
        assert_eq!(tree.scenes().count(), 3);
        assert_eq!(tree.word_count(), 200);
        assert_eq!(tree.scene(&"s-2".into()).unwrap().title, "Gate");
        assert!(tree.scene(&"missing".into()).is_none());

        tree.scene_mut(&"s-3".into()).unwrap().word_count = 5;
        assert_eq!(tree.word_count(), 205);
    }

    #[test]
    fn scene_tolerates_missing_fields() {
        let scene: Scene = serde_json::from_str(r#"{"id": "s-1"}"#).unwrap();
        assert_eq!(scene.id, SceneId::new("s-1"));
        assert!(scene.content.is_empty());
        assert!(scene.notes.is_none());
    }

    #[test]
    fn generation_output_prefers_scene() {
        let result: GenerationResult =
            serde_json::from_str(r#"{"success": true, "enhanced_scene": "polished"}"#).unwrap();
        assert_eq!(result.output(), Some("polished"));

        let result: GenerationResult =
            serde_json::from_str(r#"{"success": true, "scene": "fresh", "enhanced_scene": "x"}"#)
                .unwrap();
        assert_eq!(result.output(), Some("fresh"));
    }

    #[test]
    fn templates_map_to_endpoints() {
        assert_eq!(ToolTemplate::Continue.endpoint(), "generate");
        assert_eq!(ToolTemplate::VoiceTest.endpoint(), "enhance");
        assert!(ToolTemplate::Enhance.needs_scene_text());
        assert!(!ToolTemplate::Generate.needs_scene_text());
        assert_eq!("voice".parse::<ToolTemplate>(), Ok(ToolTemplate::VoiceTest));
        assert!("summarize".parse::<ToolTemplate>().is_err());
    }

    #[test]
    fn generation_request_omits_empty_optionals() {
        let request = GenerationRequest {
            prompt: "a storm".into(),
            model: "claude".into(),
            scene_text: None,
            context: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"prompt": "a storm", "model": "claude"}));
    }
}
