//! Production [`Backend`] over HTTP using `reqwest`.

use crate::{
    backend::Backend,
    error::{ApiError, InvalidUrlSnafu, RejectedSnafu},
    panels::{
        CharacterAnalysis, CharactersResponse, CharacterSummary, KnowledgeAnswer,
        KnowledgeQuery, NewNotebook, Notebook, NotebooksResponse, ResearchAnswer,
        ResearchQuery, SessionCost, SkillExecution, SkillInfo, SkillResult, SkillsResponse,
    },
    project::{
        CreatedProject, SkillGenerationRequest, SkillGenerationResponse, SkillTestRequest,
        SkillTestResult, VoiceAnalysisRequest, VoiceAnalysisResponse,
    },
    types::{
        ComparisonRequest, ComparisonResult, GenerationRequest, GenerationResult,
        LocalModelStatus, ManuscriptTree, ModelInfo, ModelsResponse, SaveAck, SaveSceneBody,
        Scene, SceneId, ToolTemplate,
    },
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use snafu::{ensure, ResultExt};
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, trace};
use url::Url;

pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).context(InvalidUrlSnafu { url: base_url })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Unreachable {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        self.execute(self.client.get(url.clone()), &url).await
    }

    async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(reqwest::Method::POST, segments, body).await
    }

    async fn send_json<B, T>(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments);
        let request = self
            .client
            .request(method, url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.execute(request, &url).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, ApiError> {
        debug!("Request to {}", url);
        let response = request.send().await.map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                detail: error_detail(body),
            });
        }

        let body = response.text().await.map_err(|e| transport_error(url, e))?;
        trace!("Response from {}: {}", url, body);
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn transport_error(url: &Url, error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout {
            url: url.to_string(),
        }
    } else {
        ApiError::Unreachable {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Error bodies are `{"detail": "..."}`; fall back to the raw text.
fn error_detail(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail")?.as_str().map(str::to_owned))
        .unwrap_or(body)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn health(&self) -> Result<(), ApiError> {
        let _: serde_json::Value = self.get(&["api", "health"]).await?;
        Ok(())
    }

    async fn scene(&self, id: &SceneId) -> Result<Scene, ApiError> {
        self.get(&["api", "scene", id.as_str()]).await
    }

    async fn save_scene(&self, id: &SceneId, content: &str) -> Result<SaveAck, ApiError> {
        self.send_json(
            reqwest::Method::PUT,
            &["api", "scene", id.as_str()],
            &SaveSceneBody { content },
        )
        .await
    }

    async fn manuscript_tree(&self) -> Result<ManuscriptTree, ApiError> {
        self.get(&["api", "manuscript", "tree"]).await
    }

    async fn available_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        let response: ModelsResponse = self.get(&["api", "models", "available"]).await?;
        Ok(response.models)
    }

    async fn generate(
        &self,
        template: ToolTemplate,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ApiError> {
        let result: GenerationResult = self
            .send_json(
                reqwest::Method::POST,
                &["api", "scene", template.endpoint()],
                request,
            )
            .await?;
        ensure!(
            result.success,
            RejectedSnafu {
                message: result.error.unwrap_or_else(|| "Generation failed".into())
            }
        );
        Ok(result)
    }

    async fn compare(&self, request: &ComparisonRequest) -> Result<ComparisonResult, ApiError> {
        let result: ComparisonResult = self
            .send_json(reqwest::Method::POST, &["api", "compare"], request)
            .await?;
        ensure!(
            result.success,
            RejectedSnafu {
                message: result.error.unwrap_or_else(|| "Comparison failed".into())
            }
        );
        Ok(result)
    }

    async fn complete_wizard(
        &self,
        form: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.send_json(reqwest::Method::POST, &["api", "wizard", "complete"], form)
            .await
    }

    async fn local_model_status(&self) -> Result<LocalModelStatus, ApiError> {
        self.get(&["api", "ollama", "status"]).await
    }

    async fn save_api_keys(&self, keys: &BTreeMap<String, String>) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .send_json(
                reqwest::Method::POST,
                &["api", "settings", "api-keys"],
                keys,
            )
            .await?;
        Ok(())
    }

    async fn analyze_voice(
        &self,
        request: &VoiceAnalysisRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let response: VoiceAnalysisResponse =
            self.post(&["api", "setup", "analyze-voice"], request).await?;
        response.voice_profile.ok_or_else(|| ApiError::Rejected {
            message: "Voice analysis returned no profile".into(),
        })
    }

    async fn generate_skills(
        &self,
        request: &SkillGenerationRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let response: SkillGenerationResponse =
            self.post(&["api", "setup", "generate-skills"], request).await?;
        response.skills.ok_or_else(|| ApiError::Rejected {
            message: "Skill generation returned no skills".into(),
        })
    }

    async fn test_skill(&self, request: &SkillTestRequest) -> Result<SkillTestResult, ApiError> {
        self.post(&["api", "setup", "test-skill"], request).await
    }

    async fn create_project(
        &self,
        project: &serde_json::Value,
    ) -> Result<CreatedProject, ApiError> {
        self.post(&["api", "setup", "create-project"], project).await
    }

    async fn query_knowledge(&self, query: &KnowledgeQuery) -> Result<KnowledgeAnswer, ApiError> {
        self.post(&["api", "knowledge", "query"], query).await
    }

    async fn skills(&self) -> Result<Vec<SkillInfo>, ApiError> {
        let response: SkillsResponse = self.get(&["api", "skills", "list"]).await?;
        Ok(response.skills)
    }

    async fn execute_skill(&self, execution: &SkillExecution) -> Result<SkillResult, ApiError> {
        self.post(&["api", "skills", "execute"], execution).await
    }

    async fn notebooks(&self, project_id: &str) -> Result<Vec<Notebook>, ApiError> {
        let mut url = self.endpoint(&["api", "research", "notebooks"]);
        url.query_pairs_mut().append_pair("project_id", project_id);
        let response: NotebooksResponse =
            self.execute(self.client.get(url.clone()), &url).await?;
        Ok(response.notebooks)
    }

    async fn add_notebook(&self, notebook: &NewNotebook) -> Result<(), ApiError> {
        let _: serde_json::Value = self.post(&["api", "research", "notebooks"], notebook).await?;
        Ok(())
    }

    async fn query_research(&self, query: &ResearchQuery) -> Result<ResearchAnswer, ApiError> {
        self.post(&["api", "research", "query"], query).await
    }

    async fn characters(&self, project_id: &str) -> Result<Vec<CharacterSummary>, ApiError> {
        let response: CharactersResponse = self
            .get(&["api", "manuscript", project_id, "characters"])
            .await?;
        Ok(response.characters)
    }

    async fn analyze_character(&self, id: &str) -> Result<CharacterAnalysis, ApiError> {
        let url = self.endpoint(&["api", "character", id, "analyze"]);
        self.execute(self.client.post(url.clone()), &url).await
    }

    async fn session_cost(&self) -> Result<SessionCost, ApiError> {
        self.get(&["api", "session", "cost"]).await
    }
}
