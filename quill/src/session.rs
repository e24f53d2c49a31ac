//! Autosave session.
//!
//! The open [`Document`] lives behind a [`SessionHandle`]. Edits and document
//! switches are applied to it synchronously by the handle; the handle then
//! tells the session loop what happened so it can schedule work.
//!
//! # Event loop
//!
//! [`spawn`] starts one task that owns the [`Debouncer`] and the
//! [`SaveCoordinator`] and selects over three sources:
//!
//! 1. outcomes of saves it spawned
//! 2. commands from handles
//! 3. the debounce deadline
//!
//! Saves run as their own tasks so a slow backend never blocks edits. Their
//! outcomes come back over a channel and only ever touch status metadata and
//! the server baseline, never the content being edited.
//!
//! Switching away from a document cancels its debounce. With
//! `flush_on_switch`, unsaved content is saved under the outgoing document's
//! id. Outcomes for a document that is no longer open are still reported as
//! events, but its status is not tracked any more.
//!
//! Each open or close starts a new generation. Saves are stamped with the
//! generation their content came from, and an outcome only updates the open
//! document when the generations match. Reopening a scene while an older save
//! of it is in flight therefore leaves the fresh instance alone.

use crate::{
    config::Config,
    debounce::Debouncer,
    document::Document,
    save::{SaveCoordinator, SaveRequest, SaveStatus},
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quill_client::{ApiError, Backend, Notice, SaveAck, SceneId};
use std::sync::Arc;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{sleep_until, Duration, Instant},
};
use tracing::{debug, info, trace, warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub autosave_delay: Duration,
    pub flush_on_switch: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::from(&Config::default())
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            autosave_delay: config.autosave_delay(),
            flush_on_switch: config.flush_on_switch,
        }
    }
}

/// Emitted by the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SaveStarted(SceneId),
    Saved { id: SceneId, at: DateTime<Utc> },
    SaveFailed { id: SceneId, notice: Notice },
    /// Content changed on the backend; cached listings are out of date.
    TreeInvalidated,
}

#[derive(Debug)]
enum Command {
    Edited(SceneId),
    SaveNow,
    Switched {
        previous: Option<Document>,
        /// Generation `previous` was opened under.
        generation: u64,
    },
    Shutdown,
}

type Outcome = (SceneId, u64, Result<SaveAck, ApiError>);

#[derive(Debug, Default)]
struct Open {
    document: Option<Document>,
    generation: u64,
}

impl Open {
    /// Swap in `document`, returning the outgoing one with its generation.
    fn replace(&mut self, document: Option<Document>) -> (Option<Document>, u64) {
        let generation = self.generation;
        self.generation += 1;
        (std::mem::replace(&mut self.document, document), generation)
    }

    /// The open document if it is `id` at `generation`.
    fn matching(&mut self, id: &SceneId, generation: u64) -> Option<&mut Document> {
        if self.generation != generation {
            return None;
        }
        self.document.as_mut().filter(|doc| doc.id() == id)
    }
}

#[derive(Clone)]
pub struct SessionHandle {
    document: Arc<Mutex<Open>>,
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Replace the open document's text. Returns `false` if nothing is open.
    pub fn edit(&self, content: impl Into<String>) -> bool {
        self.modify(|doc| doc.set_content(content))
    }

    pub fn append(&self, text: &str) -> bool {
        self.modify(|doc| doc.append(text))
    }

    fn modify(&self, change: impl FnOnce(&mut Document)) -> bool {
        let id = {
            let mut open = self.document.lock();
            let Some(doc) = open.document.as_mut() else {
                return false;
            };
            change(doc);
            doc.id().clone()
        };
        self.send(Command::Edited(id));
        true
    }

    /// Save the open document immediately, replacing any pending autosave.
    pub fn save_now(&self) {
        self.send(Command::SaveNow);
    }

    /// Make `document` the open document.
    pub fn open(&self, document: Document) {
        let (previous, generation) = self.document.lock().replace(Some(document));
        self.send(Command::Switched {
            previous,
            generation,
        });
    }

    pub fn close(&self) {
        let mut open = self.document.lock();
        if open.document.is_none() {
            return;
        }
        let (previous, generation) = open.replace(None);
        drop(open);
        self.send(Command::Switched {
            previous,
            generation,
        });
    }

    /// Stop the loop. Pending autosaves are dropped; saves already sent are
    /// allowed to finish first.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    pub fn snapshot(&self) -> Option<Document> {
        self.document.lock().document.clone()
    }

    pub fn status(&self) -> Option<SaveStatus> {
        self.document
            .lock()
            .document
            .as_ref()
            .map(|doc| doc.status().clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Autosave session is no longer running");
        }
    }
}

/// Start the autosave loop on the current tokio runtime.
pub fn spawn(backend: Arc<dyn Backend>, config: SessionConfig) -> (SessionHandle, JoinHandle<()>) {
    let document = Arc::new(Mutex::new(Open::default()));
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    let handle = SessionHandle {
        document: document.clone(),
        commands: commands_tx,
        events: events.clone(),
    };
    let session = Session {
        backend,
        flush_on_switch: config.flush_on_switch,
        document,
        debounce: Debouncer::new(config.autosave_delay),
        saves: SaveCoordinator::new(),
        commands: commands_rx,
        outcomes_tx,
        outcomes_rx,
        events,
    };
    (handle, tokio::spawn(session.run()))
}

struct Session {
    backend: Arc<dyn Backend>,
    flush_on_switch: bool,
    document: Arc<Mutex<Open>>,
    debounce: Debouncer<SceneId>,
    saves: SaveCoordinator,
    commands: mpsc::UnboundedReceiver<Command>,
    outcomes_tx: mpsc::UnboundedSender<Outcome>,
    outcomes_rx: mpsc::UnboundedReceiver<Outcome>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    async fn run(mut self) {
        info!("Autosave session started");
        loop {
            let deadline = self.debounce.deadline();
            tokio::select! {
                biased;

                Some(outcome) = self.outcomes_rx.recv() => self.finish_save(outcome),
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = wait_until(deadline) => self.fire_debounce(Instant::now()),
            }
        }

        if self.debounce.cancel().is_some() {
            debug!("Dropping pending autosave on shutdown");
        }
        while self.saves.is_busy() {
            match self.outcomes_rx.recv().await {
                Some(outcome) => self.finish_save(outcome),
                None => break,
            }
        }
        info!("Autosave session stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Edited(id) => {
                let current = self.current_id();
                if current.as_ref() == Some(&id) {
                    self.debounce.push(id, Instant::now());
                } else {
                    debug!("Ignoring edit notification for {} (not open)", id);
                }
            },
            Command::SaveNow => {
                self.debounce.cancel();
                let pending = {
                    let open = self.document.lock();
                    open.document.as_ref().map(|doc| {
                        (doc.id().clone(), open.generation, doc.content().to_string())
                    })
                };
                match pending {
                    Some((id, generation, content)) => self.issue_save(id, generation, content),
                    None => debug!("Manual save with no open document"),
                }
            },
            Command::Switched {
                previous,
                generation,
            } => {
                if let Some(id) = self.debounce.cancel() {
                    debug!("Cancelled pending autosave for {}", id);
                }
                let Some(previous) = previous else {
                    return;
                };
                if previous.is_dirty() && self.flush_on_switch {
                    info!("Flushing unsaved edits of {} before switching", previous.id());
                    self.issue_save(
                        previous.id().clone(),
                        generation,
                        previous.content().to_string(),
                    );
                } else if previous.is_dirty() {
                    warn!("Leaving {} with unsaved edits", previous.id());
                }
            },
            Command::Shutdown => {},
        }
    }

    fn fire_debounce(&mut self, now: Instant) {
        let Some(id) = self.debounce.poll(now) else {
            return;
        };
        let (generation, content) = {
            let open = self.document.lock();
            match open.document.as_ref() {
                Some(doc) if doc.id() == &id && doc.is_dirty() => {
                    (open.generation, doc.content().to_string())
                },
                Some(doc) if doc.id() == &id => {
                    debug!("Autosave for {} skipped, nothing changed", id);
                    return;
                },
                _ => return,
            }
        };
        debug!("Autosave firing for {}", id);
        self.issue_save(id, generation, content);
    }

    fn issue_save(&mut self, id: SceneId, generation: u64, content: String) {
        self.set_status(&id, generation, SaveStatus::Pending);
        match self.saves.request(&id, generation, content) {
            Some(request) => self.dispatch(request),
            None => debug!("Save for {} queued behind the one in flight", id),
        }
    }

    fn dispatch(&self, request: SaveRequest) {
        debug!(
            "Saving {} ({} bytes, requested {})",
            request.document_id,
            request.content.len(),
            request.timestamp
        );
        let _ = self
            .events
            .send(SessionEvent::SaveStarted(request.document_id.clone()));

        let backend = self.backend.clone();
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = backend
                .save_scene(&request.document_id, &request.content)
                .await;
            let _ = outcomes.send((request.document_id, request.generation, result));
        });
    }

    fn finish_save(&mut self, (id, generation, outcome): Outcome) {
        let at = Utc::now();
        let Some(completion) = self.saves.complete(&id, &outcome, at) else {
            warn!("Save outcome for {} with no save in flight", id);
            return;
        };
        trace!(
            "Save of {} sent under generation {}, reported for {}",
            id,
            generation,
            completion.generation
        );

        {
            let mut open = self.document.lock();
            match open.matching(&id, completion.generation) {
                Some(doc) => {
                    if outcome.is_ok() {
                        doc.mark_saved(completion.sent, at);
                    }
                    doc.set_status(completion.status.clone());
                },
                None => debug!("Discarding save status for {} (no longer open)", id),
            }
        }

        if let Some(follow_up) = &completion.follow_up {
            self.set_status(&id, follow_up.generation, SaveStatus::Pending);
        }

        match outcome {
            Ok(_) => {
                info!("Saved {}", id);
                let _ = self.events.send(SessionEvent::Saved { id, at });
                let _ = self.events.send(SessionEvent::TreeInvalidated);
            },
            Err(error) => {
                warn!("Saving {} failed: {}", id, error);
                if let Some(notice) = completion.notice {
                    let _ = self.events.send(SessionEvent::SaveFailed { id, notice });
                }
            },
        }

        if let Some(follow_up) = completion.follow_up {
            self.dispatch(follow_up);
        }
    }

    fn current_id(&self) -> Option<SceneId> {
        self.document
            .lock()
            .document
            .as_ref()
            .map(|doc| doc.id().clone())
    }

    fn set_status(&self, id: &SceneId, generation: u64, status: SaveStatus) {
        if let Some(doc) = self.document.lock().matching(id, generation) {
            doc.set_status(status);
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
