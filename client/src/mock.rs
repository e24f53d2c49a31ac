//! In-memory backend for tests.
//!
//! Holds scenes, a manuscript tree and a model list, records every request that
//! reaches it, and can be scripted to fail or to hold saves in flight until the
//! test releases them.

use crate::{
    backend::Backend,
    error::ApiError,
    panels::{
        CharacterAnalysis, CharacterFlag, CharacterSummary, KnowledgeAnswer, KnowledgeQuery,
        NewNotebook, Notebook, ResearchAnswer, ResearchQuery, ResearchSource, SessionCost,
        SkillExecution, SkillInfo, SkillMetadata, SkillResult,
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
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};
use tokio::sync::Semaphore;

/// Failure to inject into the next matching request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Unreachable,
    Timeout,
    NotFound,
    Unauthorized,
    RateLimited,
    Server,
}

impl MockFailure {
    fn into_error(self, path: &str) -> ApiError {
        let url = format!("mock://{path}");
        let status = |status: u16, detail: &str| ApiError::Status {
            url: url.clone(),
            status,
            detail: detail.to_string(),
        };
        match self {
            MockFailure::Unreachable => ApiError::Unreachable {
                url: url.clone(),
                message: "connection refused".into(),
            },
            MockFailure::Timeout => ApiError::Timeout { url: url.clone() },
            MockFailure::NotFound => status(404, "Not found"),
            MockFailure::Unauthorized => status(401, "Unauthorized"),
            MockFailure::RateLimited => status(429, "Too many requests"),
            MockFailure::Server => status(500, "Internal server error"),
        }
    }
}

/// A save that reached the backend, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSave {
    pub id: SceneId,
    pub content: String,
}

#[derive(Default)]
struct MockBackendInner {
    scenes: HashMap<SceneId, Scene>,
    tree: ManuscriptTree,
    models: Vec<ModelInfo>,
    local_models: LocalModelStatus,
    save_failures: VecDeque<MockFailure>,
    request_failures: VecDeque<MockFailure>,
    saves: Vec<RecordedSave>,
    tree_fetches: usize,
    wizard_submissions: Vec<serde_json::Value>,
    api_keys: BTreeMap<String, String>,
    generations: Vec<(ToolTemplate, GenerationRequest)>,
    posts: Vec<(String, serde_json::Value)>,
    skills: Vec<SkillInfo>,
    notebooks: Vec<Notebook>,
    characters: Vec<CharacterSummary>,
    session_cost: SessionCost,
    hold_saves: bool,
}

#[derive(Clone)]
pub struct MockBackend {
    inner: Arc<Mutex<MockBackendInner>>,
    save_gate: Arc<Semaphore>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockBackendInner::default())),
            save_gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Add a scene, also listing it under a single act/chapter in the tree.
    pub fn with_scene(self, id: &str, title: &str, content: &str) -> Self {
        {
            let mut inner = self.inner.lock();
            let id = SceneId::new(id);
            inner.scenes.insert(
                id.clone(),
                Scene {
                    id: id.clone(),
                    title: title.to_string(),
                    content: content.to_string(),
                    notes: None,
                },
            );
            if inner.tree.acts.is_empty() {
                inner.tree.title = "Manuscript".into();
                inner.tree.acts.push(crate::types::Act {
                    id: "act-1".into(),
                    title: "Act One".into(),
                    chapters: vec![crate::types::Chapter {
                        id: "chapter-1".into(),
                        title: "Chapter One".into(),
                        scenes: Vec::new(),
                    }],
                });
            }
            inner.tree.acts[0].chapters[0]
                .scenes
                .push(crate::types::SceneSummary {
                    id,
                    title: title.to_string(),
                    word_count: word_count(content),
                });
        }
        self
    }

    pub fn with_models(self, models: Vec<ModelInfo>) -> Self {
        self.inner.lock().models = models;
        self
    }

    pub fn with_local_models(self, status: LocalModelStatus) -> Self {
        self.inner.lock().local_models = status;
        self
    }

    pub fn with_skill(self, skill_id: &str, name: &str, available: bool) -> Self {
        self.inner.lock().skills.push(SkillInfo {
            skill_id: skill_id.to_string(),
            name: name.to_string(),
            description: None,
            available,
        });
        self
    }

    pub fn with_character(self, id: &str, name: &str) -> Self {
        self.inner.lock().characters.push(CharacterSummary {
            id: id.to_string(),
            name: name.to_string(),
            role: None,
        });
        self
    }

    pub fn with_session_cost(self, cost: SessionCost) -> Self {
        self.inner.lock().session_cost = cost;
        self
    }

    /// Fail the next save with `failure`. Queued failures are consumed in order.
    pub fn fail_next_save(&self, failure: MockFailure) {
        self.inner.lock().save_failures.push_back(failure);
    }

    /// Fail the next non-save request with `failure`.
    pub fn fail_next_request(&self, failure: MockFailure) {
        self.inner.lock().request_failures.push_back(failure);
    }

    /// While held, saves are recorded on arrival but do not complete until
    /// [`Self::release_save`] is called.
    pub fn hold_saves(&self, hold: bool) {
        self.inner.lock().hold_saves = hold;
    }

    pub fn release_save(&self) {
        self.save_gate.add_permits(1);
    }

    pub fn saves(&self) -> Vec<RecordedSave> {
        self.inner.lock().saves.clone()
    }

    pub fn scene_content(&self, id: &str) -> Option<String> {
        self.inner
            .lock()
            .scenes
            .get(&SceneId::new(id))
            .map(|scene| scene.content.clone())
    }

    pub fn tree_fetches(&self) -> usize {
        self.inner.lock().tree_fetches
    }

    pub fn wizard_submissions(&self) -> Vec<serde_json::Value> {
        self.inner.lock().wizard_submissions.clone()
    }

    pub fn api_keys(&self) -> BTreeMap<String, String> {
        self.inner.lock().api_keys.clone()
    }

    pub fn generations(&self) -> Vec<(ToolTemplate, GenerationRequest)> {
        self.inner.lock().generations.clone()
    }

    /// JSON bodies POSTed to `path`, oldest first.
    pub fn posted(&self, path: &str) -> Vec<serde_json::Value> {
        self.inner
            .lock()
            .posts
            .iter()
            .filter(|(to, _)| to == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Fail or record a POST to `path`.
    fn post<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.take_request_failure(path)?;
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode {
            url: format!("mock://{path}"),
            message: e.to_string(),
        })?;
        self.inner.lock().posts.push((path.to_string(), body));
        Ok(())
    }

    fn take_request_failure(&self, path: &str) -> Result<(), ApiError> {
        match self.inner.lock().request_failures.pop_front() {
            Some(failure) => Err(failure.into_error(path)),
            None => Ok(()),
        }
    }
}

fn word_count(content: &str) -> u64 {
    content.split_whitespace().count() as u64
}

#[async_trait]
impl Backend for MockBackend {
    async fn health(&self) -> Result<(), ApiError> {
        self.take_request_failure("/api/health")
    }

    async fn scene(&self, id: &SceneId) -> Result<Scene, ApiError> {
        let path = format!("/api/scene/{id}");
        self.take_request_failure(&path)?;
        self.inner
            .lock()
            .scenes
            .get(id)
            .cloned()
            .ok_or_else(|| MockFailure::NotFound.into_error(&path))
    }

    async fn save_scene(&self, id: &SceneId, content: &str) -> Result<SaveAck, ApiError> {
        let hold = {
            let mut inner = self.inner.lock();
            inner.saves.push(RecordedSave {
                id: id.clone(),
                content: content.to_string(),
            });
            inner.hold_saves
        };

        if hold {
            if let Ok(permit) = self.save_gate.acquire().await {
                permit.forget();
            }
        }

        let mut inner = self.inner.lock();
        if let Some(failure) = inner.save_failures.pop_front() {
            return Err(failure.into_error(&format!("/api/scene/{id}")));
        }

        let words = word_count(content);
        if let Some(scene) = inner.scenes.get_mut(id) {
            scene.content = content.to_string();
        }
        if let Some(summary) = inner.tree.scene_mut(id) {
            summary.word_count = words;
        }
        Ok(SaveAck {
            word_count: Some(words),
        })
    }

    async fn manuscript_tree(&self) -> Result<ManuscriptTree, ApiError> {
        self.take_request_failure("/api/manuscript/tree")?;
        let mut inner = self.inner.lock();
        inner.tree_fetches += 1;
        Ok(inner.tree.clone())
    }

    async fn available_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        self.take_request_failure("/api/models/available")?;
        Ok(self.inner.lock().models.clone())
    }

    async fn generate(
        &self,
        template: ToolTemplate,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ApiError> {
        self.take_request_failure(&format!("/api/scene/{}", template.endpoint()))?;
        self.inner
            .lock()
            .generations
            .push((template, request.clone()));

        let output = format!("[{}] {}", request.model, request.prompt);
        let mut result = GenerationResult {
            success: true,
            ..Default::default()
        };
        if template.needs_scene_text() {
            result.enhanced_scene = Some(output);
        } else {
            result.scene = Some(output);
        }
        Ok(result)
    }

    async fn compare(&self, request: &ComparisonRequest) -> Result<ComparisonResult, ApiError> {
        self.take_request_failure("/api/compare")?;
        Ok(ComparisonResult {
            success: true,
            results: request
                .models
                .iter()
                .map(|model| (model.clone(), format!("[{model}] {}", request.prompt)))
                .collect(),
            error: None,
        })
    }

    async fn complete_wizard(
        &self,
        form: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.take_request_failure("/api/wizard/complete")?;
        let mut inner = self.inner.lock();
        inner.wizard_submissions.push(form.clone());
        Ok(serde_json::json!({
            "success": true,
            "project_id": format!("project-{}", inner.wizard_submissions.len()),
        }))
    }

    async fn local_model_status(&self) -> Result<LocalModelStatus, ApiError> {
        self.take_request_failure("/api/ollama/status")?;
        Ok(self.inner.lock().local_models.clone())
    }

    async fn save_api_keys(&self, keys: &BTreeMap<String, String>) -> Result<(), ApiError> {
        self.take_request_failure("/api/settings/api-keys")?;
        self.inner.lock().api_keys = keys.clone();
        Ok(())
    }

    async fn analyze_voice(
        &self,
        request: &VoiceAnalysisRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post("/api/setup/analyze-voice", request)?;
        Ok(serde_json::json!({
            "voiceName": format!("{} voice", request.genre),
            "primaryCharacteristics": [
                format!("{} passages analyzed", request.example_passages.len())
            ],
        }))
    }

    async fn generate_skills(
        &self,
        request: &SkillGenerationRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post("/api/setup/generate-skills", request)?;
        let skills: serde_json::Map<_, _> = [
            "scene-analyzer",
            "scene-enhancer",
            "character-validator",
            "scene-writer",
            "scene-multiplier",
            "scaffold-generator",
        ]
        .into_iter()
        .map(|skill| (skill.to_string(), serde_json::json!(format!("{}: {skill}", request.name))))
        .collect();
        Ok(serde_json::Value::Object(skills))
    }

    async fn test_skill(&self, request: &SkillTestRequest) -> Result<SkillTestResult, ApiError> {
        self.post("/api/setup/test-skill", request)?;
        let score = word_count(&request.test_scene).min(100) as f64;
        Ok(SkillTestResult {
            overall_score: Some(score),
            quality_tier: Some(if score >= 50.0 { "Solid" } else { "Draft" }.into()),
            category_scores: BTreeMap::from([("voice".to_string(), score.min(30.0))]),
        })
    }

    async fn create_project(
        &self,
        project: &serde_json::Value,
    ) -> Result<CreatedProject, ApiError> {
        self.post("/api/setup/create-project", project)?;
        let name = project
            .get("name")
            .and_then(|name| name.as_str())
            .unwrap_or("project");
        Ok(CreatedProject {
            project_id: name.to_string(),
        })
    }

    async fn query_knowledge(&self, query: &KnowledgeQuery) -> Result<KnowledgeAnswer, ApiError> {
        self.post("/api/knowledge/query", query)?;
        Ok(KnowledgeAnswer {
            answer: format!("Answer to: {}", query.question),
            references: vec!["story-bible.md".into()],
        })
    }

    async fn skills(&self) -> Result<Vec<SkillInfo>, ApiError> {
        self.take_request_failure("/api/skills/list")?;
        Ok(self.inner.lock().skills.clone())
    }

    async fn execute_skill(&self, execution: &SkillExecution) -> Result<SkillResult, ApiError> {
        self.post("/api/skills/execute", execution)?;
        Ok(SkillResult {
            status: "success".into(),
            data: serde_json::json!({ "skill": execution.skill_name }),
            metadata: SkillMetadata {
                provider: Some("mock".into()),
                execution_time_ms: Some(0),
                cost_estimate: Some(0.0),
            },
        })
    }

    async fn notebooks(&self, project_id: &str) -> Result<Vec<Notebook>, ApiError> {
        self.take_request_failure("/api/research/notebooks")?;
        let inner = self.inner.lock();
        let prefix = format!("{project_id}/");
        Ok(inner
            .notebooks
            .iter()
            .filter(|notebook| notebook.id.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn add_notebook(&self, notebook: &NewNotebook) -> Result<(), ApiError> {
        self.post("/api/research/notebooks", notebook)?;
        let mut inner = self.inner.lock();
        let id = format!("{}/nb-{}", notebook.project_id, inner.notebooks.len() + 1);
        inner.notebooks.push(Notebook {
            id,
            name: notebook.name.clone(),
            url: notebook.url.clone(),
            description: notebook.description.clone(),
            tags: notebook.tags.clone(),
        });
        Ok(())
    }

    async fn query_research(&self, query: &ResearchQuery) -> Result<ResearchAnswer, ApiError> {
        self.post("/api/research/query", query)?;
        let inner = self.inner.lock();
        let notebook = inner
            .notebooks
            .iter()
            .find(|nb| Some(&nb.id) == query.notebook_id.as_ref())
            .or_else(|| inner.notebooks.first())
            .ok_or_else(|| ApiError::Rejected {
                message: "No notebooks configured for this project".into(),
            })?;
        Ok(ResearchAnswer {
            answer: format!("Answer to: {}", query.question),
            notebook_name: Some(notebook.name.clone()),
            sources: vec![ResearchSource {
                title: notebook.name.clone(),
                page: Some(serde_json::json!(1)),
                excerpt: None,
            }],
        })
    }

    async fn characters(&self, project_id: &str) -> Result<Vec<CharacterSummary>, ApiError> {
        self.take_request_failure(&format!("/api/manuscript/{project_id}/characters"))?;
        Ok(self.inner.lock().characters.clone())
    }

    async fn analyze_character(&self, id: &str) -> Result<CharacterAnalysis, ApiError> {
        let path = format!("/api/character/{id}/analyze");
        self.take_request_failure(&path)?;
        if !self.inner.lock().characters.iter().any(|c| c.id == id) {
            return Err(MockFailure::NotFound.into_error(&path));
        }
        Ok(CharacterAnalysis {
            depth_score: 40.0,
            flags: vec![CharacterFlag {
                severity: "HIGH".into(),
                message: "No contradictions".into(),
                example: None,
                recommendation: Some("Give them a want that fights their need".into()),
            }],
            recommendations: Vec::new(),
        })
    }

    async fn session_cost(&self) -> Result<SessionCost, ApiError> {
        self.take_request_failure("/api/session/cost")?;
        Ok(self.inner.lock().session_cost.clone())
    }
}
