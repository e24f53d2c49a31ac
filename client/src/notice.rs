//! Transient user-facing notifications.
//!
//! Every failure in the client is caught where it happens and converted into a
//! [`Notice`] instead of being propagated further. [`Notice::from_error`]
//! carries the friendly title, message and remedy for each [`ErrorKind`].

use crate::error::{ApiError, ErrorKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

/// What the failing operation was doing, used to pick a more specific message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoticeContext {
    #[default]
    General,
    Scene,
    Generation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            title: title.into(),
            message: String::new(),
            action: None,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            title: title.into(),
            message: message.into(),
            action: None,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            title: title.into(),
            message: message.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    pub fn from_error(error: &ApiError, context: NoticeContext) -> Self {
        match (error.kind(), context) {
            (ErrorKind::Network, _) => Notice::error(
                "Connection Error",
                "Couldn't connect to the backend. Make sure it is running.",
            )
            .with_action("Check the backend URL in config.toml and that the server has started."),
            (ErrorKind::NotFound, NoticeContext::Scene) => Notice::error(
                "Scene Not Found",
                "The scene you're looking for doesn't exist. It may have been deleted.",
            )
            .with_action("Refresh the manuscript tree or select a different scene."),
            (ErrorKind::NotFound, _) => Notice::error(
                "Not Found",
                "The resource you requested couldn't be found.",
            )
            .with_action("Refresh and check your request."),
            (ErrorKind::Server, _) => Notice::error(
                "Server Error",
                "Something went wrong on the server. This is usually temporary.",
            )
            .with_action("Try again. If the problem persists, check the backend logs."),
            (ErrorKind::Auth, _) => Notice::error(
                "API Key Missing or Invalid",
                "Your AI model API key is missing or invalid.",
            )
            .with_action("Add the API key for the model you're using in the API key setup."),
            (ErrorKind::LocalModel, _) => Notice::error(
                "Ollama Not Running",
                "Ollama isn't running or isn't accessible. Local models won't work without it.",
            )
            .with_action("Start it with 'ollama serve', or install it from ollama.ai."),
            (ErrorKind::RateLimit, _) => Notice::error(
                "Rate Limit Exceeded",
                "You've made too many requests to the AI model.",
            )
            .with_action("Wait a few minutes before trying again, or switch to a different model."),
            (ErrorKind::Timeout, _) => Notice::error(
                "Request Timeout",
                "The operation took too long and timed out.",
            )
            .with_action("Try again with a shorter text, or check your connection."),
            (ErrorKind::Other, NoticeContext::Generation) => Notice::error(
                "AI Generation Failed",
                "The AI model couldn't generate content.",
            )
            .with_action("Check your API keys, try a different model, or enable economy mode."),
            (ErrorKind::Other, _) => {
                Notice::error("Something Went Wrong", error.detail()).with_action("Try again.")
            },
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(action) = &self.action {
            write!(f, " ({action})")?;
        }
        Ok(())
    }
}
