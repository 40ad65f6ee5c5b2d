// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapshot-based undo/redo history.
//!
//! Each entry is a whole-document snapshot taken after an edit. The cursor
//! points at the snapshot matching the current state; undo and redo move it
//! and hand back the snapshot to restore.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Default maximum history depth
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Serialized document state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized state
    pub data: Vec<u8>,
    /// Timestamp when snapshot was taken
    pub timestamp: u64,
    /// Size in bytes
    pub size: usize,
}

impl StateSnapshot {
    /// Create a new state snapshot
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len();
        Self {
            data,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            size,
        }
    }

    /// Create from serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        let data = bincode::serialize(value)?;
        Ok(Self::new(data))
    }

    /// Deserialize to value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }
}

/// A recorded state with the edit that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Human-readable description
    pub description: String,
    /// State after the edit
    pub snapshot: StateSnapshot,
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Steps available to undo
    pub undo_count: usize,
    /// Steps available to redo
    pub redo_count: usize,
    /// Total memory used by history (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Bounded snapshot stack of one document
#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    /// Index of the current state, `None` before the first record
    cursor: Option<usize>,
    max_depth: usize,
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_HISTORY_LIMIT)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            max_depth: max_depth.max(1),
            memory_used: 0,
        }
    }

    /// Push a snapshot, discarding any redo branch
    pub fn record(&mut self, description: impl Into<String>, snapshot: StateSnapshot) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        while self.entries.len() > keep {
            if let Some(dropped) = self.entries.pop_back() {
                self.memory_used = self.memory_used.saturating_sub(dropped.snapshot.size);
            }
        }

        self.memory_used += snapshot.size;
        self.entries.push_back(HistoryEntry {
            description: description.into(),
            snapshot,
        });

        // Enforce history limit
        while self.entries.len() > self.max_depth {
            if let Some(old) = self.entries.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old.snapshot.size);
            }
        }
        self.cursor = self.entries.len().checked_sub(1);
    }

    /// Replace the snapshot at the cursor, keeping its description
    ///
    /// Returns `false` when nothing was recorded yet.
    pub fn amend_current(&mut self, snapshot: StateSnapshot) -> bool {
        let Some(entry) = self.cursor.and_then(|c| self.entries.get_mut(c)) else {
            return false;
        };
        self.memory_used = self.memory_used.saturating_sub(entry.snapshot.size) + snapshot.size;
        entry.snapshot = snapshot;
        true
    }

    /// Step back, returning the snapshot to restore
    ///
    /// At the oldest retained snapshot this is a no-op returning `None`.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        let cursor = self.cursor?.checked_sub(1)?;
        self.cursor = Some(cursor);
        self.entries.get(cursor)
    }

    /// Step forward, returning the snapshot to restore
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.entries.len() {
            return None;
        }
        self.cursor = Some(next);
        self.entries.get(next)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    /// Number of retained snapshots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the current snapshot
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The snapshot matching the current state
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.memory_used = 0;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.cursor.unwrap_or(0),
            redo_count: self.entries.len() - self.cursor.map_or(0, |c| c + 1),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Get description of the edit undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.current().map(|e| e.description.as_str())
    }

    /// Get description of the edit redo would reapply
    pub fn redo_description(&self) -> Option<&str> {
        let next = self.cursor.map_or(0, |c| c + 1);
        self.entries.get(next).map(|e| e.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(n: u32) -> StateSnapshot {
        StateSnapshot::from_value(&n).unwrap()
    }

    fn value(entry: Option<&HistoryEntry>) -> Option<u32> {
        entry.map(|e| e.snapshot.to_value().unwrap())
    }

    #[test]
    fn test_initial_state() {
        let mut history = History::new();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), None);
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_undo_redo_walks_snapshots() {
        let mut history = History::new();
        history.record("open", snap(0));
        history.record("add node", snap(1));
        history.record("connect", snap(2));
        assert_eq!(history.undo_description(), Some("connect"));

        assert_eq!(value(history.undo()), Some(1));
        assert_eq!(value(history.undo()), Some(0));
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.redo_description(), Some("add node"));
        assert_eq!(value(history.redo()), Some(1));
    }

    #[test]
    fn test_record_discards_redo_branch() {
        let mut history = History::new();
        history.record("a", snap(0));
        history.record("b", snap(1));
        history.record("c", snap(2));
        history.undo();
        history.undo();
        history.record("d", snap(3));

        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(value(history.undo()), Some(0));
    }

    #[test]
    fn test_history_bound() {
        let mut history = History::new();
        for i in 0..60 {
            history.record(format!("edit {i}"), snap(i));
            assert!(history.len() <= DEFAULT_HISTORY_LIMIT);
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);

        let mut last = None;
        for _ in 0..DEFAULT_HISTORY_LIMIT {
            if let Some(entry) = history.undo() {
                last = value(Some(entry));
            }
        }
        // oldest retained is edit 10
        assert_eq!(last, Some(10));
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.stats().redo_count, DEFAULT_HISTORY_LIMIT - 1);
    }

    #[test]
    fn test_amend_keeps_position() {
        let mut history = History::new();
        assert!(!history.amend_current(snap(9)));
        history.record("a", snap(0));
        history.record("b", snap(1));
        assert!(history.amend_current(snap(5)));
        assert_eq!(history.len(), 2);
        assert_eq!(value(history.current()), Some(5));
        assert_eq!(history.undo_description(), Some("b"));
    }

    #[test]
    fn test_stats_track_memory() {
        let mut history = History::with_max_depth(2);
        history.record("a", snap(1));
        history.record("b", snap(2));
        history.record("c", snap(3));
        let stats = history.stats();
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.undo_count, 1);
        assert_eq!(stats.memory_used, 2 * snap(0).size);
        history.clear();
        assert_eq!(history.stats(), HistoryStats { max_depth: 2, ..Default::default() });
    }
}
