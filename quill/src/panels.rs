//! Side panels: knowledge base, craft skills, research notebooks, character
//! analysis and session cost.
//!
//! Each action is one request. Like [`crate::tools::run_tool`], a backend
//! failure becomes an error notice with no output; input that cannot be sent
//! is rejected up front with a [`PanelError`].

use crate::tools::ToolRun;
use quill_client::{
    ApiError, Backend, CharacterAnalysis, CharacterSummary, KnowledgeAnswer, KnowledgeQuery,
    KnowledgeSource, NewNotebook, Notebook, Notice, NoticeContext, ResearchAnswer, ResearchQuery,
    SessionCost, SkillContext, SkillExecution, SkillInfo, SkillResult,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

pub const SCENE_ANALYZER: &str = "scene-analyzer";
pub const SCENE_ENHANCER: &str = "scene-enhancer";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PanelError {
    #[error("Ask a question first")]
    EmptyQuestion,
    #[error("Please enter scene content")]
    EmptyScene,
    #[error("Add a notebook to this project first")]
    NoNotebooks,
    #[error("A notebook needs a name and a URL")]
    IncompleteNotebook,
}

fn finish<T>(
    result: Result<T, ApiError>,
    what: &str,
    success: impl FnOnce(&T) -> Notice,
) -> ToolRun<T> {
    match result {
        Ok(output) => ToolRun {
            notice: success(&output),
            output: Some(output),
        },
        Err(error) => {
            warn!("{} failed: {}", what, error);
            ToolRun {
                notice: Notice::from_error(&error, NoticeContext::General),
                output: None,
            }
        },
    }
}

pub async fn ask_knowledge(
    backend: &dyn Backend,
    question: &str,
    source: KnowledgeSource,
) -> Result<ToolRun<KnowledgeAnswer>, PanelError> {
    if question.trim().is_empty() {
        return Err(PanelError::EmptyQuestion);
    }
    let query = KnowledgeQuery {
        question: question.to_string(),
        source,
    };
    debug!("Knowledge query against {:?}", source);
    let result = backend.query_knowledge(&query).await;
    Ok(finish(result, "Knowledge query", |_| Notice::success("Query completed")))
}

pub async fn list_skills(backend: &dyn Backend) -> ToolRun<Vec<SkillInfo>> {
    finish(backend.skills().await, "Listing skills", |skills| {
        Notice::info("Craft Tools", format!("{} skills available", skills.len()))
    })
}

/// Analyzer settings; other skills only take the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerOptions {
    pub mode: String,
    pub phase: String,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            mode: "detailed".into(),
            phase: "phase2".into(),
        }
    }
}

/// Build the execution body for `skill` over `scene`.
pub fn skill_execution(
    skill: &str,
    scene: &str,
    project_id: &str,
    analyzer: &AnalyzerOptions,
) -> Result<SkillExecution, PanelError> {
    if scene.trim().is_empty() {
        return Err(PanelError::EmptyScene);
    }
    let input_data = match skill {
        SCENE_ANALYZER => json!({
            "scene_content": scene,
            "mode": analyzer.mode,
            "phase": analyzer.phase,
        }),
        SCENE_ENHANCER => json!({
            "scene_content": scene,
            "enhancement_level": "standard",
            "preserve_structure": true,
        }),
        _ => json!({ "scene_content": scene }),
    };
    Ok(SkillExecution {
        skill_name: skill.to_string(),
        input_data,
        context: SkillContext {
            project_id: project_id.to_string(),
        },
        allow_fallback: true,
    })
}

pub async fn execute_skill(
    backend: &dyn Backend,
    execution: &SkillExecution,
) -> ToolRun<SkillResult> {
    let result = backend.execute_skill(execution).await;
    let mut run = finish(result, &execution.skill_name, |_| {
        Notice::success(format!("{} executed successfully", execution.skill_name))
    });
    if run.notice.is_error() {
        run.notice.title = format!("Execution failed: {}", run.notice.title);
    }
    run
}

pub async fn notebooks(backend: &dyn Backend, project_id: &str) -> ToolRun<Vec<Notebook>> {
    finish(backend.notebooks(project_id).await, "Listing notebooks", |notebooks| {
        Notice::info("Research", format!("{} notebooks linked", notebooks.len()))
    })
}

/// Tags are given comma separated; blanks are dropped.
pub fn new_notebook(
    project_id: &str,
    name: &str,
    url: &str,
    description: &str,
    tags: &str,
) -> Result<NewNotebook, PanelError> {
    if name.trim().is_empty() || url.trim().is_empty() {
        return Err(PanelError::IncompleteNotebook);
    }
    Ok(NewNotebook {
        project_id: project_id.to_string(),
        name: name.trim().to_string(),
        url: url.trim().to_string(),
        description: description.to_string(),
        tags: tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect(),
    })
}

pub async fn add_notebook(backend: &dyn Backend, notebook: &NewNotebook) -> Notice {
    let result = backend.add_notebook(notebook).await;
    finish(result, "Adding notebook", |_| {
        Notice::success("Notebook added successfully")
    })
    .notice
}

/// Ask the project's notebooks. `available` is how many are linked; with none
/// the question is not sent.
pub async fn ask_research(
    backend: &dyn Backend,
    project_id: &str,
    question: &str,
    notebook_id: Option<&str>,
    available: usize,
) -> Result<ToolRun<ResearchAnswer>, PanelError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PanelError::EmptyQuestion);
    }
    if available == 0 {
        return Err(PanelError::NoNotebooks);
    }
    let query = ResearchQuery {
        question: question.to_string(),
        notebook_id: notebook_id.map(str::to_owned),
        project_id: project_id.to_string(),
    };
    let result = backend.query_research(&query).await;
    Ok(finish(result, "Research query", |_| Notice::success("Answer received")))
}

pub async fn characters(backend: &dyn Backend, project_id: &str) -> ToolRun<Vec<CharacterSummary>> {
    finish(backend.characters(project_id).await, "Listing characters", |characters| {
        Notice::info("Character Development", format!("{} characters", characters.len()))
    })
}

/// How developed a character reads, from the analysis depth score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Flat,
    Developing,
    Complex,
}

impl Depth {
    pub fn of(analysis: &CharacterAnalysis) -> Self {
        match analysis.depth_score {
            score if score < 50.0 => Depth::Flat,
            score if score < 80.0 => Depth::Developing,
            _ => Depth::Complex,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Depth::Flat => "Flat character - needs contradictions",
            Depth::Developing => "Developing - add more complexity",
            Depth::Complex => "Complex - well developed",
        }
    }
}

pub async fn analyze_character(backend: &dyn Backend, id: &str) -> ToolRun<CharacterAnalysis> {
    finish(backend.analyze_character(id).await, "Character analysis", |analysis| {
        Notice::info("Character Analysis", Depth::of(analysis).label())
    })
}

pub async fn session_cost(backend: &dyn Backend) -> ToolRun<SessionCost> {
    finish(backend.session_cost().await, "Fetching session cost", |cost| {
        Notice::info(
            "Cost Dashboard",
            format!(
                "${:.2} spent, ${:.2} saved over {} generations",
                cost.total_cost,
                cost.savings,
                cost.generations()
            ),
        )
    })
}
