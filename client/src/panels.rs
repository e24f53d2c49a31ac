//! Bodies for the side panels: knowledge base, craft skills, research
//! notebooks, character analysis and session cost.

use serde::{Deserialize, Serialize};

/// Where a knowledge question is answered from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeSource {
    #[default]
    Cognee,
    #[serde(rename = "notebooklm")]
    NotebookLm,
}

impl std::str::FromStr for KnowledgeSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cognee" => Ok(KnowledgeSource::Cognee),
            "notebooklm" => Ok(KnowledgeSource::NotebookLm),
            other => Err(format!("unknown knowledge source: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeQuery {
    pub question: String,
    pub source: KnowledgeSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeAnswer {
    pub answer: String,
    pub references: Vec<String>,
}

/// A craft skill the backend can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub skill_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SkillsResponse {
    #[serde(default)]
    pub skills: Vec<SkillInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillContext {
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillExecution {
    pub skill_name: String,
    pub input_data: serde_json::Value,
    pub context: SkillContext,
    pub allow_fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillMetadata {
    pub provider: Option<String>,
    pub execution_time_ms: Option<u64>,
    pub cost_estimate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillResult {
    pub status: String,
    pub data: serde_json::Value,
    pub metadata: SkillMetadata,
}

/// A NotebookLM notebook linked to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NotebooksResponse {
    #[serde(default)]
    pub notebooks: Vec<Notebook>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotebook {
    pub project_id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    pub question: String,
    pub notebook_id: Option<String>,
    pub project_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSource {
    pub title: String,
    /// Numbers and labels both occur.
    pub page: Option<serde_json::Value>,
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchAnswer {
    pub answer: String,
    pub notebook_name: Option<String>,
    pub sources: Vec<ResearchSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CharactersResponse {
    #[serde(default)]
    pub characters: Vec<CharacterSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterFlag {
    pub severity: String,
    pub message: String,
    pub example: Option<String>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterAnalysis {
    pub depth_score: f64,
    pub flags: Vec<CharacterFlag>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCost {
    pub model: String,
    pub is_local: bool,
    pub cost: f64,
    pub count: u64,
}

/// Spend for the current backend session, as served by `/api/session/cost`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCost {
    pub total_cost: f64,
    pub savings: f64,
    pub local_generations: u64,
    pub cloud_generations: u64,
    pub by_model: Vec<ModelCost>,
}

impl SessionCost {
    pub fn generations(&self) -> u64 {
        self.local_generations + self.cloud_generations
    }
}
