//! Agent profiles: which model handles which kind of writing task.

use crate::preferences::Preferences;
use quill_client::{ApiError, Backend, ModelInfo};
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskType {
    Draft,
    Polish,
    Dialogue,
    Action,
    Description,
    Brainstorm,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::Draft,
        TaskType::Polish,
        TaskType::Dialogue,
        TaskType::Action,
        TaskType::Description,
        TaskType::Brainstorm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Draft => "draft",
            TaskType::Polish => "polish",
            TaskType::Dialogue => "dialogue",
            TaskType::Action => "action",
            TaskType::Description => "description",
            TaskType::Brainstorm => "brainstorm",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TaskType::Draft => "First-pass scene drafting",
            TaskType::Polish => "Line editing and prose refinement",
            TaskType::Dialogue => "Character voice and conversation",
            TaskType::Action => "Fast-paced action sequences",
            TaskType::Description => "Setting and sensory detail",
            TaskType::Brainstorm => "Ideas, outlines and what-ifs",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown task type: {0}")]
pub struct UnknownTaskType(pub String);

impl FromStr for TaskType {
    type Err = UnknownTaskType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TaskType::ALL
            .into_iter()
            .find(|task| task.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTaskType(s.to_string()))
    }
}

/// The models the backend offers, fetched once and passed around explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelInfo>) -> Self {
        Self { models }
    }

    pub async fn load(backend: &dyn Backend) -> Result<Self, ApiError> {
        let models = backend.available_models().await?;
        debug!("Loaded {} models", models.len());
        Ok(Self::new(models))
    }

    pub fn all(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|model| model.id == id)
    }

    pub fn local(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.iter().filter(|model| model.is_local)
    }

    pub fn cloud(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.iter().filter(|model| !model.is_local)
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Pick the model for `task`.
///
/// An explicit profile always wins. Without one, economy mode prefers the
/// first local model in the catalog. Otherwise `fallback`.
pub fn resolve_model(
    task: TaskType,
    prefs: &Preferences,
    catalog: &ModelCatalog,
    fallback: &str,
) -> String {
    if let Some(model) = prefs.profile(task) {
        return model.to_string();
    }
    if prefs.economy_mode {
        if let Some(model) = catalog.local().next() {
            return model.id.clone();
        }
        debug!("Economy mode is on but no local model is available");
    }
    fallback.to_string()
}
