//! Backend abstraction.
//!
//! The [`Backend`] trait enables dependency injection: production code uses
//! [`HttpBackend`](crate::HttpBackend) while tests use
//! [`MockBackend`](crate::mock::MockBackend).

use crate::{
    error::ApiError,
    panels::{
        CharacterAnalysis, CharacterSummary, KnowledgeAnswer, KnowledgeQuery, NewNotebook,
        Notebook, ResearchAnswer, ResearchQuery, SessionCost, SkillExecution, SkillInfo,
        SkillResult,
    },
    project::{
        CreatedProject, SkillGenerationRequest, SkillTestRequest, SkillTestResult,
        VoiceAnalysisRequest,
    },
    types::{
        ComparisonRequest, ComparisonResult, GenerationRequest, GenerationResult,
        LocalModelStatus, ManuscriptTree, ModelInfo, SaveAck, Scene, SceneId, ToolTemplate,
    },
};
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn health(&self) -> Result<(), ApiError>;

    async fn scene(&self, id: &SceneId) -> Result<Scene, ApiError>;

    /// Persist scene content. The content is sent verbatim.
    async fn save_scene(&self, id: &SceneId, content: &str) -> Result<SaveAck, ApiError>;

    async fn manuscript_tree(&self) -> Result<ManuscriptTree, ApiError>;

    async fn available_models(&self) -> Result<Vec<ModelInfo>, ApiError>;

    async fn generate(
        &self,
        template: ToolTemplate,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ApiError>;

    async fn compare(&self, request: &ComparisonRequest) -> Result<ComparisonResult, ApiError>;

    /// Submit the accumulated creation wizard form.
    async fn complete_wizard(
        &self,
        form: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError>;

    async fn local_model_status(&self) -> Result<LocalModelStatus, ApiError>;

    /// Store provider API keys, keyed by provider id.
    async fn save_api_keys(&self, keys: &BTreeMap<String, String>) -> Result<(), ApiError>;

    /// Extract a voice profile from example passages.
    async fn analyze_voice(
        &self,
        request: &VoiceAnalysisRequest,
    ) -> Result<serde_json::Value, ApiError>;

    /// Generate the project's custom skills. Returns the skill set as sent.
    async fn generate_skills(
        &self,
        request: &SkillGenerationRequest,
    ) -> Result<serde_json::Value, ApiError>;

    async fn test_skill(&self, request: &SkillTestRequest) -> Result<SkillTestResult, ApiError>;

    /// Create the project directory from the whole setup form.
    async fn create_project(
        &self,
        project: &serde_json::Value,
    ) -> Result<CreatedProject, ApiError>;

    async fn query_knowledge(&self, query: &KnowledgeQuery) -> Result<KnowledgeAnswer, ApiError>;

    async fn skills(&self) -> Result<Vec<SkillInfo>, ApiError>;

    async fn execute_skill(&self, execution: &SkillExecution) -> Result<SkillResult, ApiError>;

    async fn notebooks(&self, project_id: &str) -> Result<Vec<Notebook>, ApiError>;

    async fn add_notebook(&self, notebook: &NewNotebook) -> Result<(), ApiError>;

    async fn query_research(&self, query: &ResearchQuery) -> Result<ResearchAnswer, ApiError>;

    async fn characters(&self, project_id: &str) -> Result<Vec<CharacterSummary>, ApiError>;

    async fn analyze_character(&self, id: &str) -> Result<CharacterAnalysis, ApiError>;

    async fn session_cost(&self) -> Result<SessionCost, ApiError>;
}
