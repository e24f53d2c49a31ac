//! Setup Assistant WebSocket Protocol Messages
//!
//! Every frame is a JSON object with a `type` discriminator.
//!
//! # Message Lifecycle
//!
//! 1. Client opens `/ws/wizard/{project_id}` and sends `Init` with the notebook URL
//! 2. Server streams `AiMessage`s; those with `requires_input` expect a `UserResponse`
//! 3. `Progress` moves the category tracker forward
//! 4. `Complete` carries the extraction results, usually followed by `Redirect`
//! 5. `Error` may arrive at any point and ends the current exchange

use serde::{Deserialize, Serialize};

/// Messages sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Init { notebook_url: String },
    UserResponse { content: String },
}

/// Messages sent by the server.
///
/// The server attaches `requires_input`, `input_type` and `options` to every
/// frame; variants that have no use for them ignore them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AiMessage {
        content: String,
        #[serde(default)]
        requires_input: bool,
        #[serde(default = "default_input_type")]
        input_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Vec<String>>,
    },

    /// The assistant moved on to category `category_index`.
    Progress {
        #[serde(default)]
        category_index: Option<usize>,
    },

    Complete {
        #[serde(default)]
        content: CompletePayload,
    },

    /// Route the UI should navigate to, e.g. `/editor`.
    Redirect { content: String },

    Error { content: String },
}

fn default_input_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletePayload {
    pub message: String,
    pub results: serde_json::Value,
}

impl ServerMessage {
    /// Whether the server will send nothing further in this session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerMessage::Redirect { .. } | ServerMessage::Error { .. })
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            ServerMessage::AiMessage { .. } => "ai_message",
            ServerMessage::Progress { .. } => "progress",
            ServerMessage::Complete { .. } => "complete",
            ServerMessage::Redirect { .. } => "redirect",
            ServerMessage::Error { .. } => "error",
        }
    }
}
