//! WebSocket transport.
//!
//! [`Connection::open`] connects to the server and spawns two tasks, mirroring
//! the reader/writer split used for subprocess pipes: the writer drains
//! [`ClientMessage`]s from a channel into text frames, the reader decodes text
//! frames into [`ServerMessage`]s. Frames that fail to decode are logged and
//! skipped. The reader ends on a close frame, a transport error or when the
//! receiving side of its channel is dropped.

use crate::messages::{ClientMessage, ServerMessage};
use futures::{SinkExt, StreamExt};
use snafu::Snafu;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, trace, warn};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Snafu)]
pub enum ConnectError {
    #[snafu(display("Failed to connect to setup assistant at {url}"))]
    Handshake {
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// Channel ends handed to the session.
pub struct Channels {
    pub outgoing: mpsc::Sender<ClientMessage>,
    pub incoming: mpsc::Receiver<ServerMessage>,
}

pub struct Connection {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    pub async fn open(url: &str) -> Result<(Connection, Channels), ConnectError> {
        debug!("Connecting to setup assistant at {}", url);
        let (stream, _response) = connect_async(url).await.map_err(|source| {
            ConnectError::Handshake {
                url: url.to_string(),
                source,
            }
        })?;
        let (sink, stream) = stream.split();

        let (outgoing_tx, outgoing_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (incoming_tx, incoming_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let connection = Connection {
            reader: tokio::spawn(read_frames(stream, incoming_tx)),
            writer: tokio::spawn(write_frames(sink, outgoing_rx)),
        };
        let channels = Channels {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        };
        Ok((connection, channels))
    }

    pub fn is_alive(&self) -> bool {
        !self.reader.is_finished() && !self.writer.is_finished()
    }

    pub fn close(self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn write_frames<S>(mut sink: S, mut outgoing: mpsc::Receiver<ClientMessage>)
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(message) = outgoing.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode {:?}: {}", message, e);
                continue;
            },
        };
        trace!("Sending frame: {}", json);
        if let Err(e) = sink.send(Message::Text(json)).await {
            warn!("Setup assistant send failed: {}", e);
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_frames<S, E>(mut stream: S, incoming: mpsc::Sender<ServerMessage>)
where
    S: futures::Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                debug!("Setup assistant closed the connection");
                break;
            },
            Ok(_) => continue,
            Err(e) => {
                warn!("Setup assistant connection error: {}", e);
                break;
            },
        };

        match decode_frame(&text) {
            Some(message) => {
                trace!("Received message: {:?}", message);
                if incoming.send(message).await.is_err() {
                    break;
                }
            },
            None => continue,
        }
    }
}

/// Decode one text frame, logging anything that is not a known message.
pub(crate) fn decode_frame(text: &str) -> Option<ServerMessage> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ServerMessage>(trimmed) {
        Ok(message) => Some(message),
        Err(e) => {
            error!("Skipping undecodable setup assistant frame ({}): {}", e, trimmed);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn decode_skips_noise() {
        assert!(decode_frame("").is_none());
        assert!(decode_frame("not json").is_none());
        assert!(decode_frame(r#"{"type": "heartbeat"}"#).is_none());
        assert_eq!(
            decode_frame(r#"  {"type": "error", "content": "boom"}  "#),
            Some(ServerMessage::Error {
                content: "boom".into()
            })
        );
    }

    #[tokio::test]
    async fn reader_forwards_decoded_frames_until_close() {
        let frames: Vec<Result<Message, String>> = vec![
            Ok(Message::Text(r#"{"type": "progress", "category_index": 2}"#.into())),
            Ok(Message::Text("garbage".into())),
            Ok(Message::Ping(Vec::new())),
            Ok(Message::Text(r#"{"type": "redirect", "content": "/editor"}"#.into())),
            Ok(Message::Close(None)),
            Ok(Message::Text(r#"{"type": "error", "content": "late"}"#.into())),
        ];
        let (tx, mut rx) = mpsc::channel(8);

        read_frames(stream::iter(frames), tx).await;

        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Progress {
                category_index: Some(2)
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Redirect {
                content: "/editor".into()
            })
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn writer_encodes_client_messages() {
        let (tx, rx) = mpsc::channel(8);
        let (sink_tx, sink_rx) = futures::channel::mpsc::unbounded::<Message>();

        tx.send(ClientMessage::UserResponse {
            content: "Option B".into(),
        })
        .await
        .unwrap();
        drop(tx);

        write_frames(sink_tx, rx).await;

        let frames: Vec<Message> = sink_rx.collect().await;
        assert_eq!(
            frames,
            vec![Message::Text(
                r#"{"type":"user_response","content":"Option B"}"#.into()
            )]
        );
    }
}
