//! Session Tracker
//!
//! Records, per client session, the instant of its last successful sync.
//! The watermark decides how much remote-origin content that session may
//! see. Watermarks live for the lifetime of the process.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::id::Timestamp;

/// Per-session sync watermarks
#[derive(Debug, Default)]
pub struct SessionTracker {
    /// session id -> last sync instant (None until the first sync)
    watermarks: RwLock<HashMap<String, Option<Timestamp>>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session the first time it is seen
    pub async fn observe(&self, session_id: &str) {
        let seen = self.watermarks.read().await.contains_key(session_id);
        if !seen {
            self.watermarks
                .write()
                .await
                .entry(session_id.to_string())
                .or_insert(None);
            tracing::trace!("New session {}", session_id);
        }
    }

    /// Get a session's watermark, if it has ever synced
    pub async fn watermark(&self, session_id: &str) -> Option<Timestamp> {
        self.watermarks
            .read()
            .await
            .get(session_id)
            .copied()
            .flatten()
    }

    /// Advance a session's watermark to `to`
    ///
    /// Never moves backwards; returns the resulting watermark.
    pub async fn advance(&self, session_id: &str, to: Timestamp) -> Timestamp {
        let mut watermarks = self.watermarks.write().await;
        let slot = watermarks.entry(session_id.to_string()).or_insert(None);
        let next = match *slot {
            Some(current) if current > to => current,
            _ => to,
        };
        *slot = Some(next);
        next
    }

    /// Number of sessions observed so far
    pub async fn session_count(&self) -> usize {
        self.watermarks.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unseen_session_has_no_watermark() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.watermark("s-1").await, None);

        tracker.observe("s-1").await;
        assert_eq!(tracker.watermark("s-1").await, None);
        assert_eq!(tracker.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_advance_is_monotonic() {
        let tracker = SessionTracker::new();

        assert_eq!(tracker.advance("s-1", 500).await, 500);
        assert_eq!(tracker.advance("s-1", 300).await, 500);
        assert_eq!(tracker.watermark("s-1").await, Some(500));
        assert_eq!(tracker.advance("s-1", 700).await, 700);

        // Other sessions are untouched
        assert_eq!(tracker.watermark("s-2").await, None);
    }

    #[tokio::test]
    async fn test_observe_keeps_existing_watermark() {
        let tracker = SessionTracker::new();
        tracker.advance("s-1", 42).await;
        tracker.observe("s-1").await;
        assert_eq!(tracker.watermark("s-1").await, Some(42));
    }
}
