//! Editor state for the open scene.

use crate::save::SaveStatus;
use chrono::{DateTime, Utc};
use quill_client::{Scene, SceneId};

/// The scene being edited.
///
/// `content` is what the author sees and is only ever changed by edits.
/// `last_known_server_content` is the newest content the backend has
/// acknowledged; the document is dirty while the two differ.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: SceneId,
    title: String,
    content: String,
    last_known_server_content: String,
    status: SaveStatus,
    last_saved: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(id: impl Into<SceneId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            title: title.into(),
            last_known_server_content: content.clone(),
            content,
            status: SaveStatus::Idle,
            last_saved: None,
        }
    }

    pub fn id(&self) -> &SceneId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn last_known_server_content(&self) -> &str {
        &self.last_known_server_content
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn is_dirty(&self) -> bool {
        self.content != self.last_known_server_content
    }

    /// Replace the whole text.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn append(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    pub(crate) fn set_status(&mut self, status: SaveStatus) {
        self.status = status;
    }

    /// The backend acknowledged `sent`. The current content is left alone even
    /// if edits arrived while the save was in flight.
    pub(crate) fn mark_saved(&mut self, sent: String, at: DateTime<Utc>) {
        self.last_known_server_content = sent;
        self.last_saved = Some(at);
        self.status = SaveStatus::Saved(at);
    }
}

impl From<Scene> for Document {
    fn from(scene: Scene) -> Self {
        Document::new(scene.id, scene.title, scene.content)
    }
}
