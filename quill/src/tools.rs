//! AI tools panel and tournament comparison.

use crate::document::Document;
use quill_client::{
    Backend, ComparisonRequest, ComparisonResult, GenerationRequest, GenerationResult, Notice,
    NoticeContext, ToolTemplate,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

pub const MAX_COMPARED_MODELS: usize = 4;
pub const MIN_COMPARED_MODELS: usize = 2;

/// Requests rejected before anything is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Write a prompt first")]
    EmptyPrompt,
    #[error("Select at least {MIN_COMPARED_MODELS} models to compare")]
    TooFewModels,
}

/// Outcome of a tool run, for the panel to display.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRun<T> {
    pub notice: Notice,
    pub output: Option<T>,
}

/// Build the request for `template`, attaching the open scene when there is one.
pub fn build_request(
    template: ToolTemplate,
    prompt: &str,
    model: &str,
    scene: Option<&Document>,
) -> Result<GenerationRequest, ToolError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ToolError::EmptyPrompt);
    }
    let scene_text = scene
        .map(|doc| doc.content().to_string())
        .filter(|text| template.needs_scene_text() || !text.is_empty());
    Ok(GenerationRequest {
        prompt: prompt.to_string(),
        model: model.to_string(),
        scene_text,
        context: None,
    })
}

pub async fn run_tool(
    backend: &dyn Backend,
    template: ToolTemplate,
    request: &GenerationRequest,
) -> ToolRun<GenerationResult> {
    debug!("Running {} with {}", template.label(), request.model);
    match backend.generate(template, request).await {
        Ok(result) => ToolRun {
            notice: Notice::success("Generated successfully"),
            output: Some(result),
        },
        Err(error) => {
            warn!("{} failed: {}", template.label(), error);
            ToolRun {
                notice: Notice::from_error(&error, NoticeContext::Generation),
                output: None,
            }
        },
    }
}

/// Models picked for a tournament, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSelection {
    models: Vec<String>,
}

impl ModelSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove `model`. Adding past the limit is ignored; returns
    /// whether the model is selected afterwards.
    pub fn toggle(&mut self, model: &str) -> bool {
        if let Some(index) = self.models.iter().position(|m| m == model) {
            self.models.remove(index);
            return false;
        }
        if self.models.len() >= MAX_COMPARED_MODELS {
            return false;
        }
        self.models.push(model.to_string());
        true
    }

    pub fn is_selected(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn can_compare(&self, prompt: &str) -> bool {
        self.models.len() >= MIN_COMPARED_MODELS && !prompt.trim().is_empty()
    }

    pub fn request(&self, prompt: &str) -> Result<ComparisonRequest, ToolError> {
        if prompt.trim().is_empty() {
            return Err(ToolError::EmptyPrompt);
        }
        if self.models.len() < MIN_COMPARED_MODELS {
            return Err(ToolError::TooFewModels);
        }
        Ok(ComparisonRequest {
            prompt: prompt.trim().to_string(),
            models: self.models.clone(),
        })
    }
}

pub async fn compare(
    backend: &dyn Backend,
    request: &ComparisonRequest,
) -> ToolRun<BTreeMap<String, String>> {
    match backend.compare(request).await {
        Ok(ComparisonResult { results, .. }) => ToolRun {
            notice: Notice::success("Comparison complete"),
            output: Some(results),
        },
        Err(error) => {
            warn!("Comparison failed: {}", error);
            ToolRun {
                notice: Notice::from_error(&error, NoticeContext::Generation),
                output: None,
            }
        },
    }
}
