//! Snapshot-based undo/redo.
//!
//! Each record holds a full copy of the committed tables as they were right
//! before a command ran, together with a short description for the UI.

use std::collections::VecDeque;

use crate::snapshot::Snapshot;

/// The default number of undo records kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub snapshot: Snapshot,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct History {
    /// Most recent record at the back.
    undoable: VecDeque<Record>,
    /// Most recently undone record at the back.
    redoable: Vec<Record>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undoable: VecDeque::new(),
            redoable: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Records `before` (the committed tables prior to a command). Drops the
    /// oldest record beyond the limit and clears the redo stack.
    pub fn push(&mut self, before: Snapshot, description: impl Into<String>) {
        self.undoable.push_back(Record {
            snapshot: before,
            description: description.into(),
        });
        while self.undoable.len() > self.limit {
            self.undoable.pop_front();
        }
        self.redoable.clear();
    }

    /// Pops the most recent record, stores `current` as its redo record, and
    /// returns the snapshot to restore.
    pub fn undo(&mut self, current: Snapshot) -> Option<Record> {
        let record = self.undoable.pop_back()?;
        self.redoable.push(Record {
            snapshot: current,
            description: record.description.clone(),
        });
        Some(record)
    }

    /// The mirror image of [`History::undo`].
    pub fn redo(&mut self, current: Snapshot) -> Option<Record> {
        let record = self.redoable.pop()?;
        self.undoable.push_back(Record {
            snapshot: current,
            description: record.description.clone(),
        });
        Some(record)
    }

    pub fn can_undo(&self) -> bool {
        !self.undoable.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redoable.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undoable.back().map(|r| r.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redoable.last().map(|r| r.description.as_str())
    }

    pub fn undo_len(&self) -> usize {
        self.undoable.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redoable.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.metadata.name = name.to_string();
        snapshot
    }

    #[test]
    fn test_undo_redo_swaps_records() {
        let mut history = History::default();
        history.push(named("before"), "rename");

        let record = history.undo(named("after")).unwrap();
        assert_eq!(record.snapshot.metadata.name, "before");
        assert_eq!(history.redo_description(), Some("rename"));

        let record = history.redo(named("before")).unwrap();
        assert_eq!(record.snapshot.metadata.name, "after");
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = History::default();
        history.push(named("a"), "one");
        history.undo(named("b"));
        assert!(history.can_redo());

        history.push(named("c"), "two");
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.push(named(&i.to_string()), format!("step {i}"));
        }
        assert_eq!(history.undo_len(), 3);

        let mut names = Vec::new();
        while let Some(record) = history.undo(Snapshot::default()) {
            names.push(record.snapshot.metadata.name);
        }
        assert_eq!(names, vec!["4", "3", "2"]);
    }

    #[test]
    fn test_empty_stacks() {
        let mut history = History::default();
        assert!(history.undo(Snapshot::default()).is_none());
        assert!(history.redo(Snapshot::default()).is_none());
        assert_eq!(history.undo_description(), None);
    }
}
