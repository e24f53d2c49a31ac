use crate::{
    messages::{ClientMessage, CompletePayload, ServerMessage},
    progress::SetupProgress,
    transport::{Channels, ConnectError, Connection},
};
use snafu::{ResultExt, Snafu};
use tokio::{
    sync::mpsc,
    time::{timeout_at, Duration, Instant},
};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("Cannot derive a setup assistant endpoint from {url}"))]
    InvalidEndpoint { url: String },

    #[snafu(display("Failed to open setup assistant session"))]
    Connect { source: ConnectError },

    #[snafu(display("Connection to the setup assistant was lost"))]
    ConnectionLost,

    #[snafu(display("Response is empty"))]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Assistant,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub speaker: Speaker,
    pub content: String,
}

/// What the assistant is waiting for from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingInput {
    Text,
    Options(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssistantEvent {
    Message {
        content: String,
        input: Option<PendingInput>,
    },
    Progress {
        category_index: usize,
    },
    Complete(CompletePayload),
    Redirect(String),
    Failed(String),
    /// The server side went away. Reported once.
    Closed,
}

/// Build `ws(s)://host/ws/wizard/{project_id}` from the backend base URL.
///
/// `http` and `https` bases are mapped to `ws` and `wss`.
pub fn endpoint(base: &Url, project_id: &str) -> Result<Url, SessionError> {
    let mut url = base.clone();
    let scheme = match url.scheme() {
        "http" => Some("ws"),
        "https" => Some("wss"),
        "ws" | "wss" => None,
        _ => {
            return InvalidEndpointSnafu {
                url: base.to_string(),
            }
            .fail();
        },
    };
    if let Some(scheme) = scheme {
        url.set_scheme(scheme).map_err(|()| SessionError::InvalidEndpoint {
            url: base.to_string(),
        })?;
    }
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| SessionError::InvalidEndpoint {
                url: base.to_string(),
            })?;
        segments
            .pop_if_empty()
            .extend(["ws", "wizard", project_id]);
    }
    Ok(url)
}

/// A live conversation with the setup assistant.
///
/// Keeps the transcript, the category progress and whatever input the
/// assistant last asked for. Incoming messages are applied in
/// [`Self::next_event`].
pub struct SetupAssistant {
    connection: Option<Connection>,
    outgoing: mpsc::Sender<ClientMessage>,
    incoming: mpsc::Receiver<ServerMessage>,
    session_id: Uuid,
    transcript: Vec<ChatEntry>,
    progress: SetupProgress,
    pending_input: Option<PendingInput>,
    closed: bool,
}

impl SetupAssistant {
    /// Connect to the assistant for `project_id` and send the init message.
    pub async fn connect(
        base: &Url,
        project_id: &str,
        notebook_url: &str,
    ) -> Result<Self, SessionError> {
        let url = endpoint(base, project_id)?;
        let (connection, channels) = Connection::open(url.as_str()).await.context(ConnectSnafu)?;
        let mut assistant = Self::from_channels(channels);
        assistant.connection = Some(connection);
        assistant.start(notebook_url).await?;
        Ok(assistant)
    }

    /// Wrap already established channels. No init message is sent.
    pub fn from_channels(channels: Channels) -> Self {
        let session_id = Uuid::new_v4();
        info!("Setup assistant session created: {}", session_id);
        Self {
            connection: None,
            outgoing: channels.outgoing,
            incoming: channels.incoming,
            session_id,
            transcript: Vec::new(),
            progress: SetupProgress::new(),
            pending_input: None,
            closed: false,
        }
    }

    pub async fn start(&self, notebook_url: &str) -> Result<(), SessionError> {
        self.send(ClientMessage::Init {
            notebook_url: notebook_url.to_string(),
        })
        .await
    }

    /// Answer the assistant. The answer is recorded in the transcript only
    /// once it has been handed to the connection.
    pub async fn respond(&mut self, content: &str) -> Result<(), SessionError> {
        let content = content.trim();
        if content.is_empty() {
            return EmptyResponseSnafu.fail();
        }
        self.send(ClientMessage::UserResponse {
            content: content.to_string(),
        })
        .await?;
        self.transcript.push(ChatEntry {
            speaker: Speaker::User,
            content: content.to_string(),
        });
        self.pending_input = None;
        Ok(())
    }

    async fn send(&self, message: ClientMessage) -> Result<(), SessionError> {
        if self.closed {
            return ConnectionLostSnafu.fail();
        }
        self.outgoing
            .send(message)
            .await
            .map_err(|_| SessionError::ConnectionLost)
    }

    /// Wait up to `duration` for the next event.
    ///
    /// Returns `None` on timeout, or once [`AssistantEvent::Closed`] has been
    /// reported.
    pub async fn next_event(&mut self, duration: Duration) -> Option<AssistantEvent> {
        if self.closed {
            return None;
        }
        let deadline = Instant::now() + duration;

        loop {
            match timeout_at(deadline, self.incoming.recv()).await {
                Ok(Some(message)) => {
                    if let Some(event) = self.apply(message) {
                        return Some(event);
                    }
                },
                Ok(None) => {
                    debug!("Setup assistant channel closed");
                    self.closed = true;
                    self.pending_input = None;
                    return Some(AssistantEvent::Closed);
                },
                Err(_) => return None,
            }
        }
    }

    fn apply(&mut self, message: ServerMessage) -> Option<AssistantEvent> {
        match message {
            ServerMessage::AiMessage {
                content,
                requires_input,
                input_type,
                options,
            } => {
                self.transcript.push(ChatEntry {
                    speaker: Speaker::Assistant,
                    content: content.clone(),
                });
                debug!("Assistant message expects {} input", input_type);
                let input = requires_input.then(|| match options {
                    Some(options) if !options.is_empty() => PendingInput::Options(options),
                    _ => PendingInput::Text,
                });
                self.pending_input = input.clone();
                Some(AssistantEvent::Message { content, input })
            },
            ServerMessage::Progress {
                category_index: Some(index),
            } => {
                self.progress.advance_to(index);
                Some(AssistantEvent::Progress {
                    category_index: index,
                })
            },
            ServerMessage::Progress {
                category_index: None,
            } => {
                warn!("Ignoring progress message without a category index");
                None
            },
            ServerMessage::Complete { content } => {
                self.progress.complete_all();
                self.pending_input = None;
                if !content.message.is_empty() {
                    self.transcript.push(ChatEntry {
                        speaker: Speaker::Assistant,
                        content: content.message.clone(),
                    });
                }
                Some(AssistantEvent::Complete(content))
            },
            ServerMessage::Redirect { content } => {
                self.pending_input = None;
                Some(AssistantEvent::Redirect(content))
            },
            ServerMessage::Error { content } => {
                warn!("Setup assistant reported an error: {}", content);
                self.pending_input = None;
                Some(AssistantEvent::Failed(content))
            },
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    pub fn progress(&self) -> &SetupProgress {
        &self.progress
    }

    pub fn pending_input(&self) -> Option<&PendingInput> {
        self.pending_input.as_ref()
    }

    pub fn is_alive(&self) -> bool {
        if self.closed || self.outgoing.is_closed() {
            return false;
        }
        self.connection.as_ref().map_or(true, Connection::is_alive)
    }

    pub fn shutdown(mut self) {
        info!("Shutting down setup assistant session: {}", self.session_id);
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::StepStatus;
    use serde_json::json;

    struct Server {
        to_client: mpsc::Sender<ServerMessage>,
        from_client: mpsc::Receiver<ClientMessage>,
    }

    fn pair() -> (SetupAssistant, Server) {
        quill_log::test();
        let (outgoing_tx, outgoing_rx) = mpsc::channel(8);
        let (incoming_tx, incoming_rx) = mpsc::channel(8);
        let assistant = SetupAssistant::from_channels(Channels {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        });
        let server = Server {
            to_client: incoming_tx,
            from_client: outgoing_rx,
        };
        (assistant, server)
    }

    fn ai(content: &str) -> ServerMessage {
        ServerMessage::AiMessage {
            content: content.into(),
            requires_input: false,
            input_type: "text".into(),
            options: None,
        }
    }

    const WAIT: Duration = Duration::from_millis(100);

    #[test]
    fn endpoint_maps_scheme_and_escapes_project() {
        let base = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            endpoint(&base, "my novel").unwrap().as_str(),
            "ws://localhost:8000/ws/wizard/my%20novel"
        );

        let base = Url::parse("https://quill.example.com/app/").unwrap();
        assert_eq!(
            endpoint(&base, "p1").unwrap().as_str(),
            "wss://quill.example.com/app/ws/wizard/p1"
        );

        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(endpoint(&base, "p1").is_err());
    }

    #[tokio::test]
    async fn start_sends_init() {
        let (assistant, mut server) = pair();
        assistant
            .start("https://notebooklm.google.com/notebook/abc")
            .await
            .unwrap();
        assert_eq!(
            server.from_client.recv().await,
            Some(ClientMessage::Init {
                notebook_url: "https://notebooklm.google.com/notebook/abc".into()
            })
        );
    }

    #[tokio::test]
    async fn conversation_updates_transcript_and_pending_input() {
        let (mut assistant, mut server) = pair();
        server.to_client.send(ai("Welcome")).await.unwrap();
        server
            .to_client
            .send(ServerMessage::AiMessage {
                content: "Which protagonist?".into(),
                requires_input: true,
                input_type: "choice".into(),
                options: Some(vec!["Mara".into(), "Ilse".into()]),
            })
            .await
            .unwrap();

        assert_eq!(
            assistant.next_event(WAIT).await,
            Some(AssistantEvent::Message {
                content: "Welcome".into(),
                input: None
            })
        );
        assistant.next_event(WAIT).await.unwrap();
        assert_eq!(
            assistant.pending_input(),
            Some(&PendingInput::Options(vec!["Mara".into(), "Ilse".into()]))
        );

        assistant.respond("  Mara ").await.unwrap();
        assert_eq!(
            server.from_client.recv().await,
            Some(ClientMessage::UserResponse {
                content: "Mara".into()
            })
        );
        assert!(assistant.pending_input().is_none());

        let speakers: Vec<_> = assistant.transcript().iter().map(|e| e.speaker).collect();
        assert_eq!(speakers, [Speaker::Assistant, Speaker::Assistant, Speaker::User]);
    }

    #[tokio::test]
    async fn options_without_choices_fall_back_to_text() {
        let (mut assistant, server) = pair();
        server
            .to_client
            .send(ServerMessage::AiMessage {
                content: "Pick one".into(),
                requires_input: true,
                input_type: "choice".into(),
                options: Some(Vec::new()),
            })
            .await
            .unwrap();
        assistant.next_event(WAIT).await.unwrap();
        assert_eq!(assistant.pending_input(), Some(&PendingInput::Text));
    }

    #[tokio::test]
    async fn empty_response_is_rejected() {
        let (mut assistant, _server) = pair();
        assert!(matches!(
            assistant.respond("   ").await,
            Err(SessionError::EmptyResponse)
        ));
        assert!(assistant.transcript().is_empty());
    }

    #[tokio::test]
    async fn progress_and_completion() {
        let (mut assistant, server) = pair();
        server
            .to_client
            .send(ServerMessage::Progress {
                category_index: None,
            })
            .await
            .unwrap();
        server
            .to_client
            .send(ServerMessage::Progress {
                category_index: Some(2),
            })
            .await
            .unwrap();

        assert_eq!(
            assistant.next_event(WAIT).await,
            Some(AssistantEvent::Progress { category_index: 2 })
        );
        assert_eq!(assistant.progress().steps()[2].status, StepStatus::InProgress);
        assert_eq!(assistant.progress().completed(), 2);

        server
            .to_client
            .send(ServerMessage::Complete {
                content: CompletePayload {
                    message: "All set".into(),
                    results: json!({"characters": 4}),
                },
            })
            .await
            .unwrap();
        let Some(AssistantEvent::Complete(payload)) = assistant.next_event(WAIT).await else {
            panic!("expected completion");
        };
        assert_eq!(payload.results["characters"], 4);
        assert!(assistant.progress().is_complete());
        assert_eq!(assistant.transcript().last().unwrap().content, "All set");
    }

    #[tokio::test]
    async fn redirect_and_error_are_surfaced() {
        let (mut assistant, server) = pair();
        server
            .to_client
            .send(ServerMessage::Error {
                content: "Notebook not reachable".into(),
            })
            .await
            .unwrap();
        server
            .to_client
            .send(ServerMessage::Redirect {
                content: "/editor".into(),
            })
            .await
            .unwrap();

        assert_eq!(
            assistant.next_event(WAIT).await,
            Some(AssistantEvent::Failed("Notebook not reachable".into()))
        );
        assert_eq!(
            assistant.next_event(WAIT).await,
            Some(AssistantEvent::Redirect("/editor".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_nothing() {
        let (mut assistant, _server) = pair();
        assert_eq!(assistant.next_event(Duration::from_secs(5)).await, None);
        assert!(assistant.is_alive());
    }

    #[tokio::test]
    async fn closed_connection_is_reported_once() {
        let (mut assistant, server) = pair();
        drop(server);

        assert_eq!(assistant.next_event(WAIT).await, Some(AssistantEvent::Closed));
        assert_eq!(assistant.next_event(WAIT).await, None);
        assert!(!assistant.is_alive());
        assert!(matches!(
            assistant.respond("hello").await,
            Err(SessionError::ConnectionLost)
        ));
    }

    #[tokio::test]
    async fn respond_after_server_dropped_its_receiver() {
        let (mut assistant, Server { from_client, .. }) = pair();
        drop(from_client);
        assert!(matches!(
            assistant.respond("hello").await,
            Err(SessionError::ConnectionLost)
        ));
        assert!(assistant.transcript().is_empty());
    }
}
