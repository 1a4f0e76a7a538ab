//! Clear-Command Log

use std::collections::HashSet;

use super::record::{ClearCommand, Post};
use crate::id::{RecordId, Timestamp};

/// Append-only log of tombstone commands, deduplicated by id
#[derive(Debug)]
pub struct ClearLog {
    replica: String,
    commands: Vec<ClearCommand>,
    ids: HashSet<RecordId>,
    /// Recorded command with the highest timestamp
    widest: Option<ClearCommand>,
}

impl ClearLog {
    pub fn new(replica: impl Into<String>) -> Self {
        Self {
            replica: replica.into(),
            commands: Vec::new(),
            ids: HashSet::new(),
            widest: None,
        }
    }

    /// Build a new local command stamped at `timestamp` (not yet recorded)
    pub fn create(&self, timestamp: Timestamp) -> ClearCommand {
        ClearCommand {
            id: RecordId::new(),
            timestamp,
            origin_replica: self.replica.clone(),
        }
    }

    /// Record a command; returns false if its id was already known
    pub fn record(&mut self, command: ClearCommand) -> bool {
        if !self.ids.insert(command.id) {
            return false;
        }

        if self.horizon().map_or(true, |h| command.timestamp > h) {
            self.widest = Some(command.clone());
        }
        self.commands.push(command);
        true
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Every known command, in the order it was recorded here
    pub fn all(&self) -> Vec<ClearCommand> {
        self.commands.clone()
    }

    /// Posts at or below this instant are permanently deleted
    pub fn horizon(&self) -> Option<Timestamp> {
        self.widest.as_ref().map(|c| c.timestamp)
    }

    /// Check whether any recorded command deletes `post`
    pub fn covers(&self, post: &Post) -> bool {
        self.widest.as_ref().is_some_and(|c| c.covers(post))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dedups_by_id() {
        let mut log = ClearLog::new("replica-1");
        let cmd = log.create(200);

        assert!(log.record(cmd.clone()));
        assert!(!log.record(cmd.clone()));
        assert_eq!(log.len(), 1);
        assert!(log.contains(&cmd.id));
    }

    #[test]
    fn test_horizon_tracks_maximum() {
        let mut log = ClearLog::new("replica-1");
        assert_eq!(log.horizon(), None);

        let late = log.create(500);
        let early = ClearCommand {
            id: RecordId::new(),
            timestamp: 200,
            origin_replica: "replica-2".into(),
        };
        log.record(late);
        log.record(early);

        assert_eq!(log.horizon(), Some(500));
        assert_eq!(log.all().len(), 2);
    }

    #[test]
    fn test_covers_up_to_horizon() {
        let mut log = ClearLog::new("replica-1");
        let post = |timestamp| Post {
            id: RecordId::new(),
            author: "bob".into(),
            content: "hi".into(),
            timestamp,
            origin_replica: "replica-2".into(),
            session_id: "s-2".into(),
        };
        assert!(!log.covers(&post(1)));

        log.record(log.create(300));
        log.record(log.create(100));
        assert!(log.covers(&post(300)));
        assert!(log.covers(&post(150)));
        assert!(!log.covers(&post(301)));
    }

    #[test]
    fn test_create_does_not_record() {
        let log = ClearLog::new("replica-1");
        let cmd = log.create(10);
        assert_eq!(cmd.origin_replica, "replica-1");
        assert!(log.is_empty());
    }
}
