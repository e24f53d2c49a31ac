use quill_client::Notice;
use std::collections::VecDeque;
use tokio::time::{Duration, Instant};

pub const ERROR_DURATION: Duration = Duration::from_secs(6);
pub const DEFAULT_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shown {
    pub notice: Notice,
    pub expires_at: Instant,
}

/// Transient notices on screen, oldest first.
///
/// Holds at most `capacity` notices; pushing past that drops the oldest.
#[derive(Debug)]
pub struct Notifications {
    capacity: usize,
    shown: VecDeque<Shown>,
}

impl Notifications {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            shown: VecDeque::new(),
        }
    }

    pub fn push(&mut self, notice: Notice, now: Instant) {
        let duration = if notice.is_error() {
            ERROR_DURATION
        } else {
            DEFAULT_DURATION
        };
        if self.shown.len() == self.capacity {
            self.shown.pop_front();
        }
        self.shown.push_back(Shown {
            notice,
            expires_at: now + duration,
        });
    }

    /// Drop every notice whose display time is over, returning them.
    pub fn expire(&mut self, now: Instant) -> Vec<Notice> {
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .shown
            .drain(..)
            .partition(|shown| shown.expires_at <= now);
        self.shown = kept.into();
        expired.into_iter().map(|shown| shown.notice).collect()
    }

    pub fn dismiss(&mut self, index: usize) -> Option<Notice> {
        self.shown.remove(index).map(|shown| shown.notice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.shown.iter().map(|shown| &shown.notice)
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.shown.iter().map(|shown| shown.expires_at).min()
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_stay_longer() {
        let now = Instant::now();
        let mut notices = Notifications::new(5);
        notices.push(Notice::success("Scene saved"), now);
        notices.push(Notice::error("Server Error", "boom"), now);

        let expired = notices.expire(now + DEFAULT_DURATION);
        assert_eq!(expired, [Notice::success("Scene saved")]);
        assert_eq!(notices.len(), 1);

        assert_eq!(notices.next_expiry(), Some(now + ERROR_DURATION));
        notices.expire(now + ERROR_DURATION);
        assert!(notices.is_empty());
    }

    #[test]
    fn capacity_drops_oldest() {
        let now = Instant::now();
        let mut notices = Notifications::new(2);
        for title in ["one", "two", "three"] {
            notices.push(Notice::info(title, ""), now);
        }
        let titles: Vec<_> = notices.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["two", "three"]);
    }

    #[test]
    fn dismiss_by_index() {
        let now = Instant::now();
        let mut notices = Notifications::new(3);
        notices.push(Notice::info("a", ""), now);
        notices.push(Notice::info("b", ""), now);
        assert_eq!(notices.dismiss(0).unwrap().title, "a");
        assert!(notices.dismiss(5).is_none());
    }
}
