//! # Undo/Redo Stack
//!
//! Snapshot history for the editor state.
//!
//! ## Design
//!
//! - Callers record the state *before* an undoable change
//! - Undo swaps the current state for the most recent recorded one and moves
//!   the current state to the redo stack
//! - Redo does the reverse
//! - Recording clears the redo stack (a new action invalidates the future)
//! - The oldest entries are dropped once `max_levels` is exceeded
//! - Batches group several recordings into one undo step: only the first
//!   recording inside an open batch is kept
//!
//! Snapshots are `Arc`s of immutable states, so an entry costs one pointer
//! unless the state is later edited.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//!
//! stack.record(store.state(), Some("Delete block"));
//! // ... change the state ...
//!
//! if let Some(previous) = stack.undo(current) {
//!     // publish `previous`
//! }
//! ```

use std::sync::Arc;

use crate::document::EditorState;

/// Default number of undo levels
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// A recorded snapshot and what the change after it was
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub state: Arc<EditorState>,
    pub description: Option<String>,
}

#[derive(Debug, Default)]
struct OpenBatch {
    recorded: bool,
}

/// Undo/redo stack of editor snapshots
#[derive(Debug)]
pub struct UndoStack {
    /// Recorded states (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone states (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a batch
    current_batch: Option<OpenBatch>,
}

impl UndoStack {
    /// Create a new undo stack with the default capacity (50)
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Record `state` as the point to return to on the next undo
    ///
    /// Returns false when the recording was folded into an open batch.
    pub fn record(&mut self, state: Arc<EditorState>, description: Option<String>) -> bool {
        if let Some(batch) = &mut self.current_batch {
            if batch.recorded {
                return false;
            }
            batch.recorded = true;
        }

        self.undo_stack.push(HistoryEntry { state, description });

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // Clear redo stack (new action invalidates future)
        self.redo_stack.clear();
        true
    }

    /// Start a batch (following recordings become one undo step)
    pub fn begin_batch(&mut self) {
        if self.current_batch.is_none() {
            self.current_batch = Some(OpenBatch::default());
        }
    }

    /// Close the current batch
    pub fn end_batch(&mut self) {
        self.current_batch = None;
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    /// Step back: returns the state to restore, given the current one
    pub fn undo(&mut self, current: Arc<EditorState>) -> Option<Arc<EditorState>> {
        self.end_batch();
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(HistoryEntry {
            state: current,
            description: entry.description.clone(),
        });
        Some(entry.state)
    }

    /// Step forward: returns the state to restore, given the current one
    pub fn redo(&mut self, current: Arc<EditorState>) -> Option<Arc<EditorState>> {
        self.end_batch();
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(HistoryEntry {
            state: current,
            description: entry.description.clone(),
        });
        Some(entry.state)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_blocks::{Block, BlockType};

    fn state_with(text: &str) -> Arc<EditorState> {
        Arc::new(EditorState {
            blocks: vec![Block::new(BlockType::Paragraph, text)],
            ..EditorState::default()
        })
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert_eq!(stack.max_levels(), 50);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_record_undo_redo() {
        let mut stack = UndoStack::new();
        let before = state_with("before");
        let after = state_with("after");

        stack.record(before.clone(), Some("Edit text".into()));
        assert!(stack.can_undo());

        let restored = stack.undo(after.clone()).unwrap();
        assert!(Arc::ptr_eq(&restored, &before));
        assert_eq!(stack.redo_levels(), 1);
        assert_eq!(stack.redo_description(), Some("Edit text"));

        let again = stack.redo(restored).unwrap();
        assert!(Arc::ptr_eq(&again, &after));
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_undo_on_empty_stack() {
        let mut stack = UndoStack::new();
        assert!(stack.undo(state_with("x")).is_none());
        assert!(stack.redo(state_with("x")).is_none());
    }

    #[test]
    fn test_new_record_clears_redo() {
        let mut stack = UndoStack::new();
        stack.record(state_with("a"), None);
        stack.undo(state_with("b"));
        assert_eq!(stack.redo_levels(), 1);

        stack.record(state_with("a"), None);
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_batched_recordings() {
        let mut stack = UndoStack::new();
        let first = state_with("");

        stack.begin_batch();
        assert!(stack.record(first.clone(), Some("Typing".into())));
        assert!(!stack.record(state_with("h"), None));
        assert!(!stack.record(state_with("hi"), None));
        stack.end_batch();

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("Typing"));

        let restored = stack.undo(state_with("hi!")).unwrap();
        assert!(Arc::ptr_eq(&restored, &first));
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut stack = UndoStack::with_max_levels(2);
        for i in 0..3 {
            stack.record(state_with(&format!("Text {}", i)), None);
        }
        assert_eq!(stack.undo_levels(), 2);

        let oldest_kept = {
            stack.undo(state_with("now"));
            stack.undo(state_with("now")).unwrap()
        };
        assert_eq!(oldest_kept.blocks[0].text(), "Text 1");
    }
}
