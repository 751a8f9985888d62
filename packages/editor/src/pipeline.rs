//! # Editing Pipeline
//!
//! Coordinates one edit: Validate → Snapshot history → Apply → Post-effects →
//! Publish.
//!
//! The [`BlockEditor`] owns an [`EditorStore`] and a [`PostEffectEngine`].
//! All of its operations go through [`BlockEditor::apply`], so every edit
//! is undoable as one step and publishes exactly one snapshot.

use std::sync::Arc;

use pagecraft_blocks::{Block, BlockId, BlockType, TextFormat};
use tokio::sync::watch;

use crate::document::{EditorState, EditorStore, Snapshot};
use crate::errors::EditorResult;
use crate::mutations::{Mutation, MutationResult};
use crate::post_effects::PostEffectEngine;

/// Block operations engine
#[derive(Debug, Default)]
pub struct BlockEditor {
    store: EditorStore,
    effects: PostEffectEngine,
}

impl BlockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            store: EditorStore::with_history_capacity(capacity),
            effects: PostEffectEngine::new(),
        }
    }

    pub fn with_store(store: EditorStore, effects: PostEffectEngine) -> Self {
        Self { store, effects }
    }

    /// Replace the document without recording history
    pub fn load(&mut self, blocks: Vec<Block>) -> EditorResult<()> {
        self.apply(Mutation::SetBlocks { blocks })?;
        self.store.clear_history();
        Ok(())
    }

    /// Apply a mutation as one undoable step
    ///
    /// Nothing is recorded or published when validation fails.
    pub fn apply(&mut self, mutation: Mutation) -> EditorResult<MutationResult> {
        let effects = &self.effects;
        let applied = self.store.transact(mutation.description(), |draft| {
            mutation.apply(draft)?;
            Ok(effects.run(&mutation, draft))
        })?;

        tracing::debug!(
            op = mutation.description(),
            version = self.store.version(),
            effects = ?applied,
            "applied mutation"
        );

        Ok(MutationResult {
            version: self.store.version(),
            effects: applied,
        })
    }

    /// Apply several mutations as a single undo step, all or nothing
    pub fn apply_all(
        &mut self,
        description: &str,
        mutations: Vec<Mutation>,
    ) -> EditorResult<MutationResult> {
        let effects = &self.effects;
        let applied = self.store.transact(description, |draft| {
            let mut applied = Vec::new();
            for mutation in &mutations {
                mutation.apply(draft)?;
                applied.extend(effects.run(mutation, draft));
            }
            Ok(applied)
        })?;

        tracing::debug!(
            op = description,
            count = mutations.len(),
            version = self.store.version(),
            "applied mutation batch"
        );

        Ok(MutationResult {
            version: self.store.version(),
            effects: applied,
        })
    }

    pub fn state(&self) -> Arc<EditorState> {
        self.store.state()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &EditorStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EditorStore {
        &mut self.store
    }

    pub fn insert_block(
        &mut self,
        index: Option<usize>,
        block_type: BlockType,
        content: &str,
    ) -> EditorResult<MutationResult> {
        self.apply(Mutation::InsertBlock {
            index,
            block_type,
            content: content.to_string(),
        })
    }

    /// Delete a block; an emptied document gets a fresh paragraph
    pub fn delete_block(&mut self, index: usize) -> EditorResult<MutationResult> {
        self.apply(Mutation::DeleteBlock { index })
    }

    pub fn delete_blocks(&mut self, indices: Vec<usize>) -> EditorResult<MutationResult> {
        self.apply(Mutation::DeleteBlocks { indices })
    }

    pub fn duplicate_block(&mut self, index: usize) -> EditorResult<MutationResult> {
        self.apply(Mutation::DuplicateBlock { index })
    }

    pub fn convert_block(
        &mut self,
        index: usize,
        block_type: BlockType,
    ) -> EditorResult<MutationResult> {
        self.apply(Mutation::ConvertBlock { index, block_type })
    }

    pub fn update_text(&mut self, index: usize, content: &str) -> EditorResult<MutationResult> {
        self.apply(Mutation::UpdateText {
            index,
            content: content.to_string(),
        })
    }

    pub fn apply_formatting(
        &mut self,
        index: usize,
        start: usize,
        end: usize,
        format: TextFormat,
    ) -> EditorResult<MutationResult> {
        self.apply(Mutation::ApplyFormatting {
            index,
            start,
            end,
            format,
        })
    }

    pub fn merge_blocks(&mut self, first: usize, second: usize) -> EditorResult<MutationResult> {
        self.apply(Mutation::MergeBlocks { first, second })
    }

    pub fn split_block(&mut self, index: usize, offset: usize) -> EditorResult<MutationResult> {
        self.apply(Mutation::SplitBlock { index, offset })
    }

    pub fn move_block(&mut self, from: usize, to: usize) -> EditorResult<MutationResult> {
        self.apply(Mutation::MoveBlock { from, to })
    }

    pub fn indent(&mut self, block_id: BlockId) -> EditorResult<MutationResult> {
        self.apply(Mutation::Indent { block_id })
    }

    pub fn outdent(&mut self, block_id: BlockId) -> EditorResult<MutationResult> {
        self.apply(Mutation::Outdent { block_id })
    }

    pub fn reparent(
        &mut self,
        block_id: BlockId,
        new_parent_id: Option<BlockId>,
        index: usize,
    ) -> EditorResult<MutationResult> {
        self.apply(Mutation::Reparent {
            block_id,
            new_parent_id,
            index,
        })
    }

    /// Copy is not an edit: it publishes the new clipboard without history
    pub fn copy_blocks(&mut self, indices: &[usize]) -> EditorResult<usize> {
        self.store.copy_blocks(indices)
    }

    pub fn cut_blocks(&mut self, indices: Vec<usize>) -> EditorResult<MutationResult> {
        self.apply(Mutation::Cut { indices })
    }

    pub fn paste_blocks(&mut self, index: usize) -> EditorResult<MutationResult> {
        self.apply(Mutation::Paste { index })
    }

    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.store.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    /// Group the following edits into one undo step
    pub fn begin_batch(&mut self) {
        self.store.begin_batch();
    }

    pub fn end_batch(&mut self) {
        self.store.end_batch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with(texts: &[&str]) -> BlockEditor {
        let mut editor = BlockEditor::new();
        editor
            .load(
                texts
                    .iter()
                    .map(|t| Block::new(BlockType::Paragraph, t))
                    .collect(),
            )
            .unwrap();
        editor
    }

    #[test]
    fn test_load_keeps_document_non_empty() {
        let mut editor = BlockEditor::new();
        editor.load(Vec::new()).unwrap();
        assert_eq!(editor.state().blocks.len(), 1);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_delete_last_block_leaves_empty_paragraph() {
        let mut editor = editor_with(&["only"]);
        let result = editor.delete_block(0).unwrap();

        let state = editor.state();
        assert_eq!(state.blocks.len(), 1);
        assert_eq!(state.blocks[0].text(), "");
        assert_eq!(state.blocks[0].block_type(), BlockType::Paragraph);
        assert!(result.effects.contains(&"ensure_document_not_empty"));
    }

    #[test]
    fn test_every_apply_is_one_undo_step() {
        let mut editor = editor_with(&["a"]);
        let before = editor.state();

        editor.insert_block(None, BlockType::Quote, "b").unwrap();
        editor.convert_block(1, BlockType::Heading1).unwrap();
        assert_eq!(editor.store().history().undo_levels(), 2);

        editor.undo();
        editor.undo();
        assert_eq!(*editor.state(), *before);
    }

    #[test]
    fn test_failed_mutation_publishes_nothing() {
        let mut editor = editor_with(&["a", "b", "c"]);
        let version = editor.version();

        assert!(editor.merge_blocks(0, 2).is_err());
        assert_eq!(editor.version(), version);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_duplicate_block() {
        let mut editor = editor_with(&["original"]);
        editor.duplicate_block(0).unwrap();

        let state = editor.state();
        assert_eq!(state.blocks.len(), 2);
        assert_eq!(state.blocks[1].text(), "original");
        assert_ne!(state.blocks[1].id, state.blocks[0].id);
        assert_eq!(state.focused_block_index, Some(1));
    }

    #[test]
    fn test_apply_all_is_atomic() {
        let mut editor = editor_with(&["a"]);
        let version = editor.version();

        let result = editor.apply_all(
            "Broken batch",
            vec![
                Mutation::UpdateText {
                    index: 0,
                    content: "changed".into(),
                },
                Mutation::DeleteBlock { index: 5 },
            ],
        );
        assert!(result.is_err());
        assert_eq!(editor.version(), version);
        assert_eq!(editor.state().blocks[0].text(), "a");
    }

    #[test]
    fn test_order_hints_follow_moves() {
        let mut editor = editor_with(&["a", "b", "c"]);
        editor.move_block(2, 0).unwrap();

        let orders: Vec<f64> = editor.state().blocks.iter().map(|b| b.order).collect();
        assert_eq!(orders, vec![0.0, 1.0, 2.0]);
        assert_eq!(editor.state().blocks[0].text(), "c");
    }
}
