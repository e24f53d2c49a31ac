//! Save coordination.
//!
//! [`SaveCoordinator`] decides *whether* a save goes out; it performs no I/O.
//! Per document it allows one save in flight. A request made while one is in
//! flight is parked, and only the newest parked content is kept. When the
//! in-flight save resolves, [`SaveCoordinator::complete`] hands back the parked
//! content as a follow-up request.
//!
//! A follow-up is dropped when it carries exactly what was just sent. Failed
//! saves are never re-sent on their own: the next edit or a manual save is the
//! retry path.
//!
//! Every request carries the generation of the open document it was taken
//! from. Reopening a scene starts a new generation, so a completion can tell
//! the session which instance of the scene it belongs to.

use chrono::{DateTime, Utc};
use quill_client::{ApiError, Notice, NoticeContext, SaveAck, SceneId};
use std::collections::HashMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Pending,
    Saved(DateTime<Utc>),
    Failed(String),
}

impl SaveStatus {
    pub fn label(&self) -> String {
        match self {
            SaveStatus::Idle => String::new(),
            SaveStatus::Pending => "Saving...".to_string(),
            SaveStatus::Saved(at) => format!("Saved {}", at.format("%H:%M:%S")),
            SaveStatus::Failed(_) => "Save failed".to_string(),
        }
    }
}

/// One attempt to persist a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub document_id: SceneId,
    pub generation: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of resolving an in-flight save.
#[derive(Debug)]
pub struct Completion {
    /// Content the resolved request carried.
    pub sent: String,
    /// Generation the outcome applies to. When an identical follow-up was
    /// dropped this is the follow-up's generation, since its content is now
    /// on the server too.
    pub generation: u64,
    pub status: SaveStatus,
    pub follow_up: Option<SaveRequest>,
    /// Set for failures.
    pub notice: Option<Notice>,
}

#[derive(Debug)]
struct Parked {
    generation: u64,
    content: String,
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: Option<Parked>,
    queued: Option<Parked>,
}

#[derive(Debug, Default)]
pub struct SaveCoordinator {
    slots: HashMap<SceneId, Slot>,
}

impl SaveCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask to save `content`. Returns the request to send now, or `None` if
    /// it was parked behind a save already in flight.
    pub fn request(
        &mut self,
        id: &SceneId,
        generation: u64,
        content: String,
    ) -> Option<SaveRequest> {
        let slot = self.slots.entry(id.clone()).or_default();
        if slot.in_flight.is_some() {
            trace!("Save for {} in flight, queueing follow-up", id);
            slot.queued = Some(Parked {
                generation,
                content,
            });
            return None;
        }
        slot.in_flight = Some(Parked {
            generation,
            content: content.clone(),
        });
        Some(SaveRequest {
            document_id: id.clone(),
            generation,
            content,
            timestamp: Utc::now(),
        })
    }

    /// Resolve the in-flight save for `id`.
    ///
    /// Returns `None` if nothing was in flight for `id`.
    pub fn complete(
        &mut self,
        id: &SceneId,
        outcome: &Result<SaveAck, ApiError>,
        at: DateTime<Utc>,
    ) -> Option<Completion> {
        let slot = self.slots.get_mut(id)?;
        let Parked {
            mut generation,
            content: sent,
        } = slot.in_flight.take()?;

        let (status, notice) = match outcome {
            Ok(_) => (SaveStatus::Saved(at), None),
            Err(error) => (
                SaveStatus::Failed(error.detail()),
                Some(Notice::from_error(error, NoticeContext::Scene)),
            ),
        };

        let follow_up = match slot.queued.take() {
            Some(queued) if queued.content == sent => {
                debug!("Dropping follow-up for {}: content unchanged", id);
                generation = queued.generation;
                None
            },
            Some(Parked {
                generation,
                content,
            }) => {
                slot.in_flight = Some(Parked {
                    generation,
                    content: content.clone(),
                });
                Some(SaveRequest {
                    document_id: id.clone(),
                    generation,
                    content,
                    timestamp: at,
                })
            },
            None => None,
        };

        if slot.in_flight.is_none() {
            self.slots.remove(id);
        }

        let status = if follow_up.is_some() {
            SaveStatus::Pending
        } else {
            status
        };
        Some(Completion {
            sent,
            generation,
            status,
            follow_up,
            notice,
        })
    }

    pub fn is_in_flight(&self, id: &SceneId) -> bool {
        self.slots
            .get(id)
            .is_some_and(|slot| slot.in_flight.is_some())
    }

    pub fn has_queued(&self, id: &SceneId) -> bool {
        self.slots.get(id).is_some_and(|slot| slot.queued.is_some())
    }

    /// Whether any document has a save in flight.
    pub fn is_busy(&self) -> bool {
        !self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> SceneId {
        SceneId::new("s-1")
    }

    fn ok() -> Result<SaveAck, ApiError> {
        Ok(SaveAck::default())
    }

    fn server_error() -> Result<SaveAck, ApiError> {
        Err(ApiError::Status {
            url: "mock://save".into(),
            status: 500,
            detail: "disk full".into(),
        })
    }

    #[test]
    fn one_request_in_flight_per_document() {
        let mut saves = SaveCoordinator::new();
        let first = saves.request(&id(), 1, "A".into()).unwrap();
        assert_eq!(first.content, "A");
        assert!(saves.is_in_flight(&id()));

        assert!(saves.request(&id(), 1, "AB".into()).is_none());
        assert!(saves.request(&id(), 1, "ABC".into()).is_none());
        assert!(saves.has_queued(&id()));

        // Other documents are independent.
        assert!(saves.request(&SceneId::new("s-2"), 1, "x".into()).is_some());
    }

    #[test]
    fn completion_releases_latest_queued_content() {
        let mut saves = SaveCoordinator::new();
        saves.request(&id(), 1, "A".into());
        saves.request(&id(), 1, "AB".into());
        saves.request(&id(), 1, "ABC".into());

        let completion = saves.complete(&id(), &ok(), Utc::now()).unwrap();
        assert_eq!(completion.sent, "A");
        assert_eq!(completion.status, SaveStatus::Pending);
        assert_eq!(completion.follow_up.unwrap().content, "ABC");
        assert!(saves.is_in_flight(&id()));

        let at = Utc::now();
        let completion = saves.complete(&id(), &ok(), at).unwrap();
        assert_eq!(completion.status, SaveStatus::Saved(at));
        assert!(completion.follow_up.is_none());
        assert!(!saves.is_busy());
    }

    #[test]
    fn failure_produces_notice_without_retry() {
        let mut saves = SaveCoordinator::new();
        saves.request(&id(), 1, "A".into());

        let completion = saves.complete(&id(), &server_error(), Utc::now()).unwrap();
        assert_eq!(completion.status, SaveStatus::Failed("disk full".into()));
        assert!(completion.follow_up.is_none());
        let notice = completion.notice.unwrap();
        assert_eq!(notice.title, "Server Error");
        assert!(!saves.is_in_flight(&id()));
    }

    #[test]
    fn newer_content_still_follows_a_failed_save() {
        let mut saves = SaveCoordinator::new();
        saves.request(&id(), 1, "A".into());
        saves.request(&id(), 1, "AB".into());

        let completion = saves.complete(&id(), &server_error(), Utc::now()).unwrap();
        assert!(completion.notice.is_some());
        assert_eq!(completion.follow_up.unwrap().content, "AB");
    }

    #[test]
    fn identical_follow_up_is_dropped() {
        let mut saves = SaveCoordinator::new();
        saves.request(&id(), 1, "A".into());
        saves.request(&id(), 1, "A".into());

        let completion = saves.complete(&id(), &ok(), Utc::now()).unwrap();
        assert!(completion.follow_up.is_none());
        assert!(!saves.is_busy());
    }

    #[test]
    fn completion_reports_the_generation_it_belongs_to() {
        let mut saves = SaveCoordinator::new();
        saves.request(&id(), 1, "A".into());
        saves.request(&id(), 2, "B".into());

        let completion = saves.complete(&id(), &ok(), Utc::now()).unwrap();
        assert_eq!(completion.generation, 1);
        let follow_up = completion.follow_up.unwrap();
        assert_eq!(follow_up.generation, 2);

        let completion = saves.complete(&id(), &ok(), Utc::now()).unwrap();
        assert_eq!(completion.generation, 2);
    }

    #[test]
    fn dropped_follow_up_hands_over_its_generation() {
        let mut saves = SaveCoordinator::new();
        saves.request(&id(), 1, "A".into());
        saves.request(&id(), 2, "A".into());

        let completion = saves.complete(&id(), &ok(), Utc::now()).unwrap();
        assert!(completion.follow_up.is_none());
        assert_eq!(completion.generation, 2);
    }

    #[test]
    fn completing_unknown_document_is_ignored() {
        let mut saves = SaveCoordinator::new();
        assert!(saves.complete(&id(), &ok(), Utc::now()).is_none());
    }
}
