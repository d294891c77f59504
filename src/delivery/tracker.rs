use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Notice on screen, waiting for the user's response.
    Showing(i32),
    /// Last notice was answered; hold the next one until the deadline.
    Cooldown(Instant),
}

/// Per-user presentation cursor: one notice at a time, with a pause after
/// each acknowledgment.
#[derive(Clone)]
pub struct DeliveryTracker {
    cursors: Arc<DashMap<i32, Cursor>>,
    next_delay: Duration,
}

impl DeliveryTracker {
    pub fn new(next_delay: Duration) -> Self {
        Self {
            cursors: Arc::new(DashMap::new()),
            next_delay,
        }
    }

    /// Notice currently on screen for `user_id`.
    pub fn current(&self, user_id: i32) -> Option<i32> {
        match self.cursors.get(&user_id).map(|c| *c) {
            Some(Cursor::Showing(id)) => Some(id),
            _ => None,
        }
    }

    /// Remaining pause before the next notice may be shown. Expired pauses are
    /// cleared.
    pub fn retry_after(&self, user_id: i32) -> Option<Duration> {
        let deadline = match self.cursors.get(&user_id).map(|c| *c) {
            Some(Cursor::Cooldown(deadline)) => deadline,
            _ => return None,
        };
        let now = Instant::now();
        if deadline > now {
            return Some(deadline - now);
        }
        self.cursors
            .remove_if(&user_id, |_, c| *c == Cursor::Cooldown(deadline));
        None
    }

    pub fn show(&self, user_id: i32, action_id: i32) {
        self.cursors.insert(user_id, Cursor::Showing(action_id));
    }

    /// The user answered `action_id` (acknowledged or appealed).
    pub fn answered(&self, user_id: i32, action_id: i32) {
        let mut entry = self
            .cursors
            .entry(user_id)
            .or_insert(Cursor::Showing(action_id));
        if *entry == Cursor::Showing(action_id) {
            *entry = Cursor::Cooldown(Instant::now() + self.next_delay);
        }
    }

    pub fn clear(&self, user_id: i32) {
        self.cursors.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn answering_starts_a_cooldown() {
        let tracker = DeliveryTracker::new(Duration::from_millis(500));
        tracker.show(1, 10);
        assert_eq!(tracker.current(1), Some(10));

        tracker.answered(1, 10);
        assert_eq!(tracker.current(1), None);
        assert_eq!(tracker.retry_after(1), Some(Duration::from_millis(500)));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(tracker.retry_after(1), Some(Duration::from_millis(300)));

        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(tracker.retry_after(1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn answering_another_notice_keeps_the_current_one() {
        let tracker = DeliveryTracker::new(Duration::from_millis(500));
        tracker.show(1, 10);
        tracker.answered(1, 11);
        assert_eq!(tracker.current(1), Some(10));
        assert_eq!(tracker.retry_after(1), None);
    }

    #[test]
    fn users_are_tracked_independently() {
        let tracker = DeliveryTracker::new(Duration::from_millis(500));
        tracker.show(1, 10);
        tracker.show(2, 20);
        tracker.clear(1);
        assert_eq!(tracker.current(1), None);
        assert_eq!(tracker.current(2), Some(20));
    }
}
