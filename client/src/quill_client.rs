//! REST client for the Quill backend.
//!
//! [`Backend`] is the seam every component talks through; [`HttpBackend`] is
//! the `reqwest` implementation. Failures are [`ApiError`]s, which the UI layer
//! turns into [`Notice`]s rather than propagating.

pub mod backend;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod notice;
pub mod panels;
pub mod project;
pub mod types;

pub use backend::Backend;
pub use error::{ApiError, ErrorKind};
pub use http::HttpBackend;
pub use notice::{Level, Notice, NoticeContext};
pub use panels::{
    CharacterAnalysis, CharacterFlag, CharacterSummary, KnowledgeAnswer, KnowledgeQuery,
    KnowledgeSource, ModelCost, NewNotebook, Notebook, Recommendation, ResearchAnswer,
    ResearchQuery, ResearchSource, SessionCost, SkillContext, SkillExecution, SkillInfo,
    SkillMetadata, SkillResult,
};
pub use project::{
    CreatedProject, SkillGenerationRequest, SkillTestRequest, SkillTestResult, UploadedDoc,
    VoiceAnalysisRequest,
};
pub use types::{
    Act, Chapter, ComparisonRequest, ComparisonResult, GenerationRequest, GenerationResult,
    LocalModelStatus, ManuscriptTree, ModelInfo, SaveAck, Scene, SceneId, SceneSummary,
    ToolTemplate,
};
