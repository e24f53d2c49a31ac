//! Client for the conversational setup assistant.
//!
//! The assistant reads a research notebook and interviews the author over a
//! WebSocket, category by category, before handing the project to the editor.

pub mod messages;
pub mod progress;
pub mod session;
pub mod transport;

pub use messages::{ClientMessage, CompletePayload, ServerMessage};
pub use progress::{ProgressStep, SetupProgress, StepStatus, CATEGORIES};
pub use session::{
    endpoint, AssistantEvent, ChatEntry, PendingInput, SessionError, SetupAssistant, Speaker,
};
pub use transport::{Channels, ConnectError, Connection};
