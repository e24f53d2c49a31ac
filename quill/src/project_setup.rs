//! Project setup wizard.
//!
//! Six steps turn a few example passages into a project with its own voice
//! profile and skill set: details, voice, materials, analysis, review and
//! finalize. The backend does the analysis; this module gathers the input,
//! gates each step and sends the requests.
//!
//! [`ProjectSetupWizard::advance`] runs the backend step a phase depends on
//! when it is entered: the voice analysis on reaching `analysis` and skill
//! generation on reaching `review`. A failed run leaves the wizard on that
//! phase with Next disabled, and the action can be retried directly.

use crate::{
    tools::ToolRun,
    wizard::{Phase, Wizard, WizardError},
};
use quill_client::{
    Backend, CreatedProject, Notice, NoticeContext, SkillGenerationRequest, SkillTestRequest,
    SkillTestResult, UploadedDoc, VoiceAnalysisRequest,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const GENRES: [&str; 9] = [
    "literary",
    "thriller",
    "romance",
    "sci-fi",
    "fantasy",
    "mystery",
    "horror",
    "historical",
    "other",
];

pub const MIN_PASSAGES: usize = 3;
pub const MAX_PASSAGES: usize = 5;
pub const MIN_PASSAGE_WORDS: usize = 100;

/// Skill the review step's test run exercises.
pub const TEST_SKILL: &str = "scene-analyzer";

/// Input rejected before it reaches the form or the backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("Please enter passage content")]
    EmptyPassage,
    #[error("Passages should be at least {MIN_PASSAGE_WORDS} words (got {words})")]
    PassageTooShort { words: usize },
    #[error("At most {MAX_PASSAGES} passages can be added")]
    TooManyPassages,
    #[error("Please enter a NotebookLM URL")]
    EmptyNotebookUrl,
    #[error("Please enter a test scene")]
    EmptyTestScene,
    #[error("Unknown genre {0:?}")]
    UnknownGenre(String),
}

/// Everything the setup wizard collects. Serialized as the body of
/// `create-project`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSetupForm {
    pub name: String,
    pub genre: String,
    pub goals: String,
    example_passages: Vec<String>,
    uploaded_docs: Vec<UploadedDoc>,
    notebooklm_urls: Vec<String>,
    pub style_guide: String,
    pub anti_patterns: Vec<String>,
    voice_profile: Option<serde_json::Value>,
    generated_skills: Option<serde_json::Value>,
}

impl Default for ProjectSetupForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            genre: GENRES[0].to_string(),
            goals: String::new(),
            example_passages: Vec::new(),
            uploaded_docs: Vec::new(),
            notebooklm_urls: Vec::new(),
            style_guide: String::new(),
            anti_patterns: Vec::new(),
            voice_profile: None,
            generated_skills: None,
        }
    }
}

impl ProjectSetupForm {
    pub fn set_genre(&mut self, genre: &str) -> Result<(), SetupError> {
        if !GENRES.contains(&genre) {
            return Err(SetupError::UnknownGenre(genre.to_string()));
        }
        self.genre = genre.to_string();
        Ok(())
    }

    /// Add an example passage. Returns how many passages there are now.
    pub fn add_passage(&mut self, passage: &str) -> Result<usize, SetupError> {
        let words = passage.split_whitespace().count();
        if words == 0 {
            return Err(SetupError::EmptyPassage);
        }
        if words < MIN_PASSAGE_WORDS {
            return Err(SetupError::PassageTooShort { words });
        }
        if self.example_passages.len() >= MAX_PASSAGES {
            return Err(SetupError::TooManyPassages);
        }
        self.example_passages.push(passage.to_string());
        Ok(self.example_passages.len())
    }

    pub fn remove_passage(&mut self, index: usize) -> Option<String> {
        (index < self.example_passages.len()).then(|| self.example_passages.remove(index))
    }

    pub fn passages(&self) -> &[String] {
        &self.example_passages
    }

    pub fn add_notebook(&mut self, url: &str) -> Result<(), SetupError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SetupError::EmptyNotebookUrl);
        }
        self.notebooklm_urls.push(url.to_string());
        Ok(())
    }

    pub fn notebooks(&self) -> &[String] {
        &self.notebooklm_urls
    }

    pub fn add_document(&mut self, filename: impl Into<String>, content: impl Into<String>) {
        self.uploaded_docs.push(UploadedDoc {
            filename: filename.into(),
            content: content.into(),
        });
    }

    pub fn documents(&self) -> &[UploadedDoc] {
        &self.uploaded_docs
    }

    pub fn voice_profile(&self) -> Option<&serde_json::Value> {
        self.voice_profile.as_ref()
    }

    pub fn generated_skills(&self) -> Option<&serde_json::Value> {
        self.generated_skills.as_ref()
    }

    fn voice_request(&self) -> VoiceAnalysisRequest {
        VoiceAnalysisRequest {
            example_passages: self.example_passages.clone(),
            uploaded_docs: self.uploaded_docs.clone(),
            notebooklm_urls: self.notebooklm_urls.clone(),
            style_guide: self.style_guide.clone(),
            genre: self.genre.clone(),
        }
    }

    fn skills_request(&self) -> SkillGenerationRequest {
        SkillGenerationRequest {
            name: self.name.clone(),
            genre: self.genre.clone(),
            example_passages: self.example_passages.clone(),
            uploaded_docs: self.uploaded_docs.clone(),
            notebooklm_urls: self.notebooklm_urls.clone(),
            voice_profile: self.voice_profile.clone(),
        }
    }
}

pub fn setup_phases() -> Vec<Phase<ProjectSetupForm>> {
    vec![
        Phase::new("details", "Project Details", |form| {
            !form.name.trim().is_empty() && !form.genre.is_empty()
        }),
        Phase::new("voice", "Voice Input", |form| {
            form.example_passages.len() >= MIN_PASSAGES
        }),
        Phase::new("materials", "Reference Materials", |_| true),
        Phase::new("analysis", "AI Analysis", |form| form.voice_profile.is_some()),
        Phase::new("review", "Review & Test", |form| {
            form.generated_skills.is_some()
        }),
        Phase::new("finalize", "Finalize", |_| true),
    ]
}

pub type ProjectSetupWizard = Wizard<ProjectSetupForm>;

impl ProjectSetupWizard {
    pub fn project_setup() -> Self {
        Wizard::with_phases(setup_phases(), ProjectSetupForm::default())
    }

    /// Move to the next phase and run whatever the new phase needs from the
    /// backend. Returns the notice of that run, if there was one.
    pub async fn advance(&mut self, backend: &dyn Backend) -> Result<Option<Notice>, WizardError> {
        self.next()?;
        debug!("Project setup at {}", self.phase().id);
        let notice = match self.phase().id {
            "analysis" if self.form().voice_profile.is_none() => {
                Some(self.analyze_voice(backend).await)
            },
            "review" if self.form().generated_skills.is_none() => {
                Some(self.generate_skills(backend).await)
            },
            _ => None,
        };
        Ok(notice)
    }

    /// Ask the backend for a voice profile. Replaces any earlier profile and
    /// clears skills generated from it.
    pub async fn analyze_voice(&mut self, backend: &dyn Backend) -> Notice {
        let request = self.form().voice_request();
        match backend.analyze_voice(&request).await {
            Ok(profile) => {
                info!("Voice profile extracted");
                let form = self.form_mut();
                form.voice_profile = Some(profile);
                form.generated_skills = None;
                Notice::success("Voice profile extracted successfully!")
            },
            Err(error) => {
                warn!("Voice analysis failed: {}", error);
                Notice::from_error(&error, NoticeContext::Generation)
            },
        }
    }

    pub async fn generate_skills(&mut self, backend: &dyn Backend) -> Notice {
        let request = self.form().skills_request();
        match backend.generate_skills(&request).await {
            Ok(skills) => {
                let count = skills.as_object().map_or(0, |skills| skills.len());
                info!("Generated {} skills", count);
                self.form_mut().generated_skills = Some(skills);
                Notice::success(format!("{count} custom skills generated!"))
            },
            Err(error) => {
                warn!("Skill generation failed: {}", error);
                Notice::from_error(&error, NoticeContext::Generation)
            },
        }
    }

    /// Score `scene` with the freshly generated analyzer.
    pub async fn test_skill(
        &self,
        backend: &dyn Backend,
        scene: &str,
    ) -> Result<ToolRun<SkillTestResult>, SetupError> {
        if scene.trim().is_empty() {
            return Err(SetupError::EmptyTestScene);
        }
        let request = SkillTestRequest {
            project_id: self.form().name.clone(),
            skill_type: TEST_SKILL.to_string(),
            test_scene: scene.to_string(),
        };
        Ok(match backend.test_skill(&request).await {
            Ok(result) => ToolRun {
                notice: Notice::success("Scene analyzed successfully!"),
                output: Some(result),
            },
            Err(error) => {
                warn!("Skill test failed: {}", error);
                ToolRun {
                    notice: Notice::from_error(&error, NoticeContext::Generation),
                    output: None,
                }
            },
        })
    }

    /// Create the project from the finalize phase.
    pub async fn create_project(
        &self,
        backend: &dyn Backend,
    ) -> Result<ToolRun<CreatedProject>, WizardError> {
        if !self.is_last() {
            return Err(WizardError::NotAtLastPhase);
        }
        let project =
            serde_json::to_value(self.form()).map_err(|e| WizardError::Encode(e.to_string()))?;
        Ok(match backend.create_project(&project).await {
            Ok(created) => {
                info!("Created project {}", created.project_id);
                ToolRun {
                    notice: Notice::success(format!(
                        "Project \"{}\" created successfully!",
                        created.project_id
                    )),
                    output: Some(created),
                }
            },
            Err(error) => {
                warn!("Project creation failed: {}", error);
                ToolRun {
                    notice: Notice::from_error(&error, NoticeContext::Generation),
                    output: None,
                }
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_client::{
        mock::{MockBackend, MockFailure},
        Level,
    };

    fn passage(seed: &str) -> String {
        vec![seed; MIN_PASSAGE_WORDS].join(" ")
    }

    fn with_passages() -> ProjectSetupWizard {
        let mut wizard = ProjectSetupWizard::project_setup();
        wizard.form_mut().name = "low-tide".into();
        wizard.form_mut().set_genre("thriller").unwrap();
        for seed in ["fog", "rope", "salt"] {
            wizard.form_mut().add_passage(&passage(seed)).unwrap();
        }
        wizard
    }

    async fn at_finalize(backend: &MockBackend) -> ProjectSetupWizard {
        let mut wizard = with_passages();
        while !wizard.is_last() {
            wizard.advance(backend).await.unwrap();
        }
        wizard
    }

    #[test]
    fn details_need_a_trimmed_name() {
        let mut wizard = ProjectSetupWizard::project_setup();
        assert_eq!(wizard.form().genre, "literary");
        wizard.form_mut().name = "   ".into();
        assert_eq!(
            wizard.next(),
            Err(WizardError::Incomplete {
                phase: "Project Details"
            })
        );

        wizard.form_mut().name = "low-tide".into();
        wizard.next().unwrap();
        assert_eq!(wizard.phase().id, "voice");
    }

    #[test]
    fn voice_needs_three_long_passages() {
        let mut form = ProjectSetupForm::default();
        assert_eq!(form.add_passage("  "), Err(SetupError::EmptyPassage));
        assert_eq!(
            form.add_passage("too short"),
            Err(SetupError::PassageTooShort { words: 2 })
        );

        let voice = &setup_phases()[1];
        for expected in 1..=MAX_PASSAGES {
            assert_eq!(voice.is_complete(&form), expected > MIN_PASSAGES);
            assert_eq!(form.add_passage(&passage("tide")), Ok(expected));
        }
        assert!(voice.is_complete(&form));
        assert_eq!(
            form.add_passage(&passage("tide")),
            Err(SetupError::TooManyPassages)
        );

        assert!(form.remove_passage(0).is_some());
        assert!(form.remove_passage(10).is_none());
        assert_eq!(form.passages().len(), MAX_PASSAGES - 1);
    }

    #[test]
    fn genre_must_be_known() {
        let mut form = ProjectSetupForm::default();
        assert_eq!(
            form.set_genre("western"),
            Err(SetupError::UnknownGenre("western".into()))
        );
        form.set_genre("sci-fi").unwrap();
        assert_eq!(form.genre, "sci-fi");
    }

    #[tokio::test]
    async fn entering_analysis_runs_the_voice_analysis() {
        let backend = MockBackend::new();
        let mut wizard = with_passages();
        wizard.form_mut().add_notebook(" https://notebooklm.google.com/nb/1 ").unwrap();
        wizard.form_mut().add_document("bible.md", "Mara lies.");

        assert_eq!(wizard.advance(&backend).await, Ok(None));
        assert_eq!(wizard.advance(&backend).await, Ok(None));
        let notice = wizard.advance(&backend).await.unwrap().unwrap();

        assert_eq!(wizard.phase().id, "analysis");
        assert_eq!(notice.level, Level::Success);
        assert!(wizard.form().voice_profile().is_some());
        let sent = &backend.posted("/api/setup/analyze-voice")[0];
        assert_eq!(sent["genre"], "thriller");
        assert_eq!(sent["examplePassages"].as_array().unwrap().len(), 3);
        assert_eq!(sent["notebooklmUrls"][0], "https://notebooklm.google.com/nb/1");
        assert_eq!(sent["uploadedDocs"][0]["filename"], "bible.md");
    }

    #[tokio::test]
    async fn failed_analysis_holds_the_wizard_until_retried() {
        let backend = MockBackend::new();
        let mut wizard = with_passages();
        wizard.advance(&backend).await.unwrap();
        wizard.advance(&backend).await.unwrap();

        backend.fail_next_request(MockFailure::Server);
        let notice = wizard.advance(&backend).await.unwrap().unwrap();
        assert!(notice.is_error());
        assert!(!wizard.can_next());

        let notice = wizard.analyze_voice(&backend).await;
        assert_eq!(notice.level, Level::Success);
        assert!(wizard.can_next());
    }

    #[tokio::test]
    async fn review_generates_skills_once() {
        let backend = MockBackend::new();
        let mut wizard = at_finalize(&backend).await;
        assert_eq!(backend.posted("/api/setup/generate-skills").len(), 1);
        assert_eq!(
            wizard.form().generated_skills().unwrap().as_object().unwrap().len(),
            6
        );

        wizard.back();
        wizard.back();
        wizard.advance(&backend).await.unwrap();
        assert_eq!(wizard.phase().id, "review");
        assert_eq!(backend.posted("/api/setup/generate-skills").len(), 1);
        let sent = &backend.posted("/api/setup/generate-skills")[0];
        assert_eq!(sent["name"], "low-tide");
        assert!(sent["voiceProfile"].is_object());
    }

    #[tokio::test]
    async fn test_run_scores_a_scene() {
        let backend = MockBackend::new();
        let wizard = at_finalize(&backend).await;

        assert_eq!(
            wizard.test_skill(&backend, " ").await.err(),
            Some(SetupError::EmptyTestScene)
        );
        let run = wizard.test_skill(&backend, "The pier creaked.").await.unwrap();
        assert_eq!(run.output.unwrap().overall_score, Some(3.0));
        let sent = &backend.posted("/api/setup/test-skill")[0];
        assert_eq!(sent["projectId"], "low-tide");
        assert_eq!(sent["skillType"], TEST_SKILL);
    }

    #[tokio::test]
    async fn create_project_posts_the_whole_form() {
        let backend = MockBackend::new();
        assert_eq!(
            with_passages().create_project(&backend).await.err(),
            Some(WizardError::NotAtLastPhase)
        );

        let wizard = at_finalize(&backend).await;
        let run = wizard.create_project(&backend).await.unwrap();
        assert_eq!(run.notice.title, "Project \"low-tide\" created successfully!");
        assert_eq!(run.output.unwrap().project_id, "low-tide");

        let sent = &backend.posted("/api/setup/create-project")[0];
        assert_eq!(sent["name"], "low-tide");
        assert!(sent["voiceProfile"].is_object());
        assert!(sent["generatedSkills"].is_object());
        assert_eq!(sent["antiPatterns"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn create_failure_keeps_the_form() {
        let backend = MockBackend::new();
        let wizard = at_finalize(&backend).await;
        backend.fail_next_request(MockFailure::Unreachable);

        let run = wizard.create_project(&backend).await.unwrap();
        assert_eq!(run.notice.title, "Connection Error");
        assert!(run.output.is_none());
        assert_eq!(wizard.form().name, "low-tide");
    }
}
