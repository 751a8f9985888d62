//! # Editor State Store
//!
//! The single source of truth for one open document.
//!
//! An [`EditorState`] is an immutable snapshot: the root-level blocks, focus,
//! selection and clipboard. The [`EditorStore`] owns the current snapshot
//! behind an `Arc`, a monotonically increasing version, and the undo history.
//!
//! ## Lifecycle
//!
//! ```text
//! operation → clone draft → edit draft → clamp focus/selection → publish
//!                  ↓ (error)
//!             nothing published
//! ```
//!
//! Every successful operation publishes exactly one new snapshot to the
//! `watch` channel returned by [`EditorStore::subscribe`] and bumps the
//! version by one. Failed operations leave the state untouched.
//!
//! Focus and selection address root-level blocks by index. Nested blocks are
//! reached by id through the tree operations (`indent`, `outdent`,
//! `reparent`).

use std::collections::BTreeSet;
use std::sync::Arc;

use pagecraft_blocks::{
    export_text, import_text, segment, Block, BlockId, BlockKind, BlockType, TextFormat,
    TextSegment,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::errors::{EditorError, EditorResult};
use crate::undo_stack::{UndoStack, DEFAULT_HISTORY_CAPACITY};

/// Direction for keyboard focus movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Up,
    Down,
}

/// Shallow partial update of a block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<BlockKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<TextSegment>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}

impl BlockPatch {
    pub fn kind(kind: BlockKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, block: &Block) -> Block {
        let mut next = block.clone();
        if let Some(kind) = &self.kind {
            next.kind = kind.clone();
        }
        if let Some(content) = &self.content {
            next.content = content.clone();
        }
        if let Some(children) = &self.children {
            next.children = children.clone();
        }
        if let Some(order) = self.order {
            next.order = order;
        }
        next
    }
}

/// Immutable editor snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    /// Root-level blocks in document order
    pub blocks: Vec<Block>,

    pub focused_block_index: Option<usize>,

    pub selected_blocks: BTreeSet<usize>,

    /// Copied blocks, held by value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clipboard: Vec<Block>,
}

/// A published state together with the version it was published at
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub state: Arc<EditorState>,
}

impl EditorState {
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn focused_block(&self) -> Option<&Block> {
        self.focused_block_index.and_then(|i| self.blocks.get(i))
    }

    /// True when every block is blank (or there are none)
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.is_blank() && b.children.is_empty())
    }

    /// Index path from the root to the block with `id`
    pub fn locate(&self, id: &BlockId) -> Option<Vec<usize>> {
        locate_in(&self.blocks, id)
    }

    /// Find a block anywhere in the tree
    pub fn find_block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find_map(|b| b.find(id))
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    fn check_index(&self, index: usize) -> EditorResult<()> {
        if index < self.blocks.len() {
            Ok(())
        } else {
            Err(EditorError::out_of_bounds(index, self.blocks.len()))
        }
    }

    fn block_mut(&mut self, index: usize) -> EditorResult<&mut Block> {
        let len = self.blocks.len();
        self.blocks
            .get_mut(index)
            .ok_or_else(|| EditorError::out_of_bounds(index, len))
    }

    /// Drop focus and selection indices that no longer point at a block
    pub fn clamp_indices(&mut self) {
        let len = self.blocks.len();
        self.focused_block_index = match self.focused_block_index {
            Some(_) if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => None,
        };
        self.selected_blocks.retain(|&i| i < len);
    }

    fn shift_after_insert(&mut self, index: usize, count: usize) {
        self.selected_blocks = self
            .selected_blocks
            .iter()
            .map(|&i| if i >= index { i + count } else { i })
            .collect();
    }

    fn shift_after_remove(&mut self, index: usize) {
        self.selected_blocks = self
            .selected_blocks
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();
        if let Some(focus) = self.focused_block_index {
            if focus > index {
                self.focused_block_index = Some(focus - 1);
            }
        }
    }

    pub fn set_blocks(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
        self.clamp_indices();
    }

    /// Insert a block at `index` (at most `len`) and focus it
    pub fn insert_block(&mut self, index: usize, block: Block) -> EditorResult<()> {
        if index > self.blocks.len() {
            return Err(EditorError::out_of_bounds(index, self.blocks.len()));
        }
        self.blocks.insert(index, block);
        self.shift_after_insert(index, 1);
        self.focused_block_index = Some(index);
        Ok(())
    }

    /// Create a block and insert it (appending when `index` is `None`)
    pub fn add_block(
        &mut self,
        block_type: BlockType,
        index: Option<usize>,
        content: &str,
    ) -> EditorResult<BlockId> {
        let block = Block::new(block_type, content);
        let id = block.id.clone();
        self.insert_block(index.unwrap_or(self.blocks.len()), block)?;
        Ok(id)
    }

    /// Splice out one block; focus moves to `min(index, len - 1)`
    pub fn remove_block(&mut self, index: usize) -> EditorResult<Block> {
        self.check_index(index)?;
        let removed = self.blocks.remove(index);
        self.selected_blocks = self
            .selected_blocks
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();
        self.focused_block_index = if self.blocks.is_empty() {
            None
        } else {
            Some(index.min(self.blocks.len() - 1))
        };
        Ok(removed)
    }

    /// Remove several blocks; returns them in document order
    pub fn remove_blocks(&mut self, indices: &[usize]) -> EditorResult<Vec<Block>> {
        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        for &index in &unique {
            self.check_index(index)?;
        }

        let mut removed = Vec::with_capacity(unique.len());
        for &index in unique.iter().rev() {
            removed.push(self.remove_block(index)?);
        }
        removed.reverse();

        if let Some(&first) = unique.iter().next() {
            self.focused_block_index = if self.blocks.is_empty() {
                None
            } else {
                Some(first.min(self.blocks.len() - 1))
            };
        }
        Ok(removed)
    }

    pub fn update_block(&mut self, index: usize, patch: &BlockPatch) -> EditorResult<()> {
        let block = self.block_mut(index)?;
        *block = patch.apply_to(block);
        Ok(())
    }

    /// Replace a block's text with a single unformatted segment
    pub fn update_block_content(&mut self, index: usize, text: &str) -> EditorResult<()> {
        let block = self.block_mut(index)?;
        *block = block.with_text(text);
        Ok(())
    }

    /// Insert text at a character offset, keeping surrounding formats
    pub fn insert_text(&mut self, index: usize, offset: usize, text: &str) -> EditorResult<()> {
        let block = self.block_mut(index)?;
        let len = block.text_len();
        if offset > len {
            return Err(EditorError::InvalidOffset { offset, len });
        }
        block.content = segment::insert_text(&block.content, offset, text);
        Ok(())
    }

    /// Delete the characters in `[start, end)`
    pub fn delete_text(&mut self, index: usize, start: usize, end: usize) -> EditorResult<()> {
        let block = self.block_mut(index)?;
        block.content = segment::delete_range(&block.content, start, end);
        Ok(())
    }

    /// Change a block's type, keeping id and text
    pub fn convert_block(&mut self, index: usize, block_type: BlockType) -> EditorResult<()> {
        let block = self.block_mut(index)?;
        *block = block.convert_to(block_type);
        Ok(())
    }

    pub fn apply_formatting(
        &mut self,
        index: usize,
        start: usize,
        end: usize,
        format: &TextFormat,
    ) -> EditorResult<()> {
        let block = self.block_mut(index)?;
        *block = block.formatted(start, end, format);
        Ok(())
    }

    /// Focus a block; out-of-range indices are clamped to the last block
    pub fn set_focused_block(&mut self, index: Option<usize>) {
        self.focused_block_index = index;
        self.clamp_indices();
    }

    /// Replace the selection; out-of-range indices are dropped
    pub fn set_selected_blocks<I>(&mut self, indices: I)
    where
        I: IntoIterator<Item = usize>,
    {
        self.selected_blocks = indices.into_iter().collect();
        self.clamp_indices();
    }

    pub fn select_all(&mut self) {
        self.selected_blocks = (0..self.blocks.len()).collect();
    }

    pub fn move_focus(&mut self, direction: FocusDirection) {
        let len = self.blocks.len();
        if len == 0 {
            self.focused_block_index = None;
            return;
        }
        self.focused_block_index = Some(match (self.focused_block_index, direction) {
            (None, FocusDirection::Up) => len - 1,
            (None, FocusDirection::Down) => 0,
            (Some(i), FocusDirection::Up) => i.saturating_sub(1),
            (Some(i), FocusDirection::Down) => (i + 1).min(len - 1),
        });
    }

    /// Snapshot blocks into the clipboard by value
    pub fn copy_blocks(&mut self, indices: &[usize]) -> EditorResult<usize> {
        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        let mut copied = Vec::with_capacity(unique.len());
        for &index in &unique {
            self.check_index(index)?;
            copied.push(self.blocks[index].clone());
        }
        let count = copied.len();
        self.clipboard = copied;
        Ok(count)
    }

    /// Copy, then remove the blocks
    pub fn cut_blocks(&mut self, indices: &[usize]) -> EditorResult<usize> {
        let count = self.copy_blocks(indices)?;
        self.remove_blocks(indices)?;
        Ok(count)
    }

    /// Insert fresh copies of the clipboard at `index` and focus the first
    pub fn paste_blocks(&mut self, index: usize) -> EditorResult<usize> {
        if self.clipboard.is_empty() {
            return Err(EditorError::EmptyClipboard);
        }
        if index > self.blocks.len() {
            return Err(EditorError::out_of_bounds(index, self.blocks.len()));
        }

        let pasted: Vec<Block> = self
            .clipboard
            .iter()
            .map(|block| {
                let mut copy = block.duplicate();
                copy.parent_id = None;
                copy
            })
            .collect();
        let count = pasted.len();

        self.blocks.splice(index..index, pasted);
        self.shift_after_insert(index, count);
        self.focused_block_index = Some(index);
        Ok(count)
    }

    /// Deep copy a block with fresh ids, insert it after and focus it
    pub fn duplicate_block(&mut self, index: usize) -> EditorResult<BlockId> {
        self.check_index(index)?;
        let copy = self.blocks[index].duplicate();
        let id = copy.id.clone();
        self.insert_block(index + 1, copy)?;
        Ok(id)
    }

    /// Join block `second` into block `first` with a newline between them
    ///
    /// Only adjacent blocks (`second == first + 1`) can be merged.
    pub fn merge_blocks(&mut self, first: usize, second: usize) -> EditorResult<()> {
        if second != first + 1 {
            return Err(EditorError::NonAdjacentMerge { first, second });
        }
        self.check_index(first)?;
        self.check_index(second)?;

        let tail = self.blocks.remove(second);
        let head = &mut self.blocks[first];

        let mut content = std::mem::take(&mut head.content);
        content.push(TextSegment::plain("\n"));
        content.extend(tail.content);
        head.content = segment::normalize(content);
        let head_id = head.id.clone();
        head.children.extend(tail.children.into_iter().map(|mut child| {
            child.parent_id = Some(head_id.clone());
            child
        }));

        self.shift_after_remove(second);
        self.focused_block_index = Some(first);
        Ok(())
    }

    /// Split a block at a character offset; the new block is focused
    pub fn split_block(&mut self, index: usize, offset: usize) -> EditorResult<BlockId> {
        self.check_index(index)?;
        let len = self.blocks[index].text_len();
        if offset > len {
            return Err(EditorError::InvalidOffset { offset, len });
        }

        let (head, tail) = self.blocks[index].split_at(offset);
        let id = tail.id.clone();
        self.blocks[index] = head;
        self.insert_block(index + 1, tail)?;
        Ok(id)
    }

    /// Move a root-level block; focus follows it
    pub fn move_block(&mut self, from: usize, to: usize) -> EditorResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        self.selected_blocks.clear();
        self.focused_block_index = Some(to);
        Ok(())
    }

    /// Make a block the last child of its previous sibling
    pub fn indent(&mut self, id: &BlockId) -> EditorResult<()> {
        let path = self
            .locate(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        let Some((&index, parent_path)) = path.split_last() else {
            return Err(EditorError::BlockNotFound(id.clone()));
        };
        if index == 0 {
            return Err(EditorError::CannotIndent(id.clone()));
        }

        let siblings = siblings_mut(&mut self.blocks, parent_path)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        let mut block = siblings.remove(index);
        let new_parent = &mut siblings[index - 1];
        block.parent_id = Some(new_parent.id.clone());
        new_parent.children.push(block);

        if parent_path.is_empty() {
            let focused_here = self.focused_block_index == Some(index);
            self.shift_after_remove(index);
            if focused_here {
                self.focused_block_index = Some(index - 1);
            }
        }
        tracing::debug!(block = %id, "indented block");
        Ok(())
    }

    /// Move a block out of its parent, right after the parent
    pub fn outdent(&mut self, id: &BlockId) -> EditorResult<()> {
        let path = self
            .locate(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        if path.len() < 2 {
            return Err(EditorError::CannotOutdent(id.clone()));
        }

        let parent_path = &path[..path.len() - 1];
        let grandparent_path = &path[..path.len() - 2];
        let index = path[path.len() - 1];
        let parent_index = parent_path[parent_path.len() - 1];

        let new_parent_id = if grandparent_path.is_empty() {
            None
        } else {
            block_at_path(&self.blocks, grandparent_path).map(|b| b.id.clone())
        };

        let mut block = siblings_mut(&mut self.blocks, parent_path)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?
            .remove(index);
        block.parent_id = new_parent_id;

        let target = siblings_mut(&mut self.blocks, grandparent_path)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        target.insert(parent_index + 1, block);

        if grandparent_path.is_empty() {
            self.shift_after_insert(parent_index + 1, 1);
            self.focused_block_index = Some(parent_index + 1);
        }
        tracing::debug!(block = %id, "outdented block");
        Ok(())
    }

    /// Move a block under a new parent (or to the root) at `index`
    ///
    /// `index` is a slot among the destination's children as they are before
    /// the move, so a block moved down its own list lands before the block
    /// that was at `index`. A block can never be moved into itself or one of
    /// its descendants.
    pub fn reparent(
        &mut self,
        id: &BlockId,
        new_parent_id: Option<&BlockId>,
        index: usize,
    ) -> EditorResult<()> {
        let moving = self
            .find_block(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        if let Some(parent_id) = new_parent_id {
            if moving.contains(parent_id) {
                return Err(EditorError::CycleDetected);
            }
            if self.find_block(parent_id).is_none() {
                return Err(EditorError::BlockNotFound(parent_id.clone()));
            }
        }

        let path = self
            .locate(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        let Some((&old_index, old_parent_path)) = path.split_last() else {
            return Err(EditorError::BlockNotFound(id.clone()));
        };
        let old_parent_id = block_at_path(&self.blocks, old_parent_path).map(|b| b.id.clone());
        let index = if old_parent_id.as_ref() == new_parent_id && old_index < index {
            index - 1
        } else {
            index
        };

        let mut block = siblings_mut(&mut self.blocks, old_parent_path)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?
            .remove(old_index);
        if old_parent_path.is_empty() {
            self.shift_after_remove(old_index);
        }
        block.parent_id = new_parent_id.cloned();

        match new_parent_id {
            Some(parent_id) => {
                let parent_path = self
                    .locate(parent_id)
                    .ok_or_else(|| EditorError::BlockNotFound(parent_id.clone()))?;
                let children = siblings_mut(&mut self.blocks, &parent_path)
                    .ok_or_else(|| EditorError::BlockNotFound(parent_id.clone()))?;
                let at = index.min(children.len());
                children.insert(at, block);
            }
            None => {
                let at = index.min(self.blocks.len());
                self.blocks.insert(at, block);
                self.shift_after_insert(at, 1);
            }
        }
        self.clamp_indices();
        Ok(())
    }
}

fn locate_in(blocks: &[Block], id: &BlockId) -> Option<Vec<usize>> {
    for (index, block) in blocks.iter().enumerate() {
        if &block.id == id {
            return Some(vec![index]);
        }
        if let Some(mut rest) = locate_in(&block.children, id) {
            rest.insert(0, index);
            return Some(rest);
        }
    }
    None
}

fn block_at_path<'a>(blocks: &'a [Block], path: &[usize]) -> Option<&'a Block> {
    let (&first, rest) = path.split_first()?;
    let mut block = blocks.get(first)?;
    for &index in rest {
        block = block.children.get(index)?;
    }
    Some(block)
}

/// The sibling list that holds the children of the block at `parent_path`
/// (the root list for an empty path)
fn siblings_mut<'a>(blocks: &'a mut Vec<Block>, parent_path: &[usize]) -> Option<&'a mut Vec<Block>> {
    let mut list = blocks;
    for &index in parent_path {
        list = &mut list.get_mut(index)?.children;
    }
    Some(list)
}

/// Owner of the current editor snapshot
#[derive(Debug)]
pub struct EditorStore {
    state: Arc<EditorState>,

    /// Increments once per published snapshot
    version: u64,

    history: UndoStack,

    sender: watch::Sender<Snapshot>,
}

impl EditorStore {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        let state = Arc::new(EditorState::default());
        let (sender, _) = watch::channel(Snapshot {
            version: 0,
            state: Arc::clone(&state),
        });
        Self {
            state,
            version: 0,
            history: UndoStack::with_max_levels(capacity),
            sender,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> Arc<EditorState> {
        Arc::clone(&self.state)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.sender.subscribe()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    fn publish(&mut self, state: Arc<EditorState>) {
        self.version += 1;
        self.state = state;
        self.sender.send_replace(Snapshot {
            version: self.version,
            state: Arc::clone(&self.state),
        });
        tracing::debug!(
            version = self.version,
            blocks = self.state.blocks.len(),
            "published editor state"
        );
    }

    /// Run `edit` on a draft of the current state and publish the result
    ///
    /// Nothing is published when `edit` fails.
    pub fn update<T, F>(&mut self, edit: F) -> EditorResult<T>
    where
        F: FnOnce(&mut EditorState) -> EditorResult<T>,
    {
        let mut draft = (*self.state).clone();
        let out = edit(&mut draft)?;
        draft.clamp_indices();
        self.publish(Arc::new(draft));
        Ok(out)
    }

    /// Like [`update`](Self::update), recording the prior state for undo
    /// only when the edit succeeds
    pub fn transact<T, F>(&mut self, description: &str, edit: F) -> EditorResult<T>
    where
        F: FnOnce(&mut EditorState) -> EditorResult<T>,
    {
        let previous = Arc::clone(&self.state);
        let mut draft = (*self.state).clone();
        let out = edit(&mut draft)?;
        draft.clamp_indices();
        self.history.record(previous, Some(description.to_string()));
        self.publish(Arc::new(draft));
        Ok(out)
    }

    pub fn set_blocks(&mut self, blocks: Vec<Block>) {
        let mut draft = (*self.state).clone();
        draft.set_blocks(blocks);
        self.publish(Arc::new(draft));
    }

    pub fn add_block(
        &mut self,
        block_type: BlockType,
        index: Option<usize>,
        content: &str,
    ) -> EditorResult<BlockId> {
        self.update(|s| s.add_block(block_type, index, content))
    }

    /// Remove one block (the document may become empty)
    pub fn remove_block(&mut self, index: usize) -> EditorResult<Block> {
        self.update(|s| s.remove_block(index))
    }

    pub fn update_block(&mut self, index: usize, patch: &BlockPatch) -> EditorResult<()> {
        self.update(|s| s.update_block(index, patch))
    }

    pub fn update_block_content(&mut self, index: usize, text: &str) -> EditorResult<()> {
        self.update(|s| s.update_block_content(index, text))
    }

    pub fn convert_block(&mut self, index: usize, block_type: BlockType) -> EditorResult<()> {
        self.update(|s| s.convert_block(index, block_type))
    }

    pub fn apply_formatting(
        &mut self,
        index: usize,
        start: usize,
        end: usize,
        format: &TextFormat,
    ) -> EditorResult<()> {
        self.update(|s| s.apply_formatting(index, start, end, format))
    }

    pub fn set_focused_block(&mut self, index: Option<usize>) {
        let mut draft = (*self.state).clone();
        draft.set_focused_block(index);
        self.publish(Arc::new(draft));
    }

    pub fn set_selected_blocks<I>(&mut self, indices: I)
    where
        I: IntoIterator<Item = usize>,
    {
        let mut draft = (*self.state).clone();
        draft.set_selected_blocks(indices);
        self.publish(Arc::new(draft));
    }

    pub fn move_focus(&mut self, direction: FocusDirection) {
        let mut draft = (*self.state).clone();
        draft.move_focus(direction);
        self.publish(Arc::new(draft));
    }

    pub fn select_all(&mut self) {
        let mut draft = (*self.state).clone();
        draft.select_all();
        self.publish(Arc::new(draft));
    }

    pub fn copy_blocks(&mut self, indices: &[usize]) -> EditorResult<usize> {
        self.update(|s| s.copy_blocks(indices))
    }

    pub fn cut_blocks(&mut self, indices: &[usize]) -> EditorResult<usize> {
        self.update(|s| s.cut_blocks(indices))
    }

    pub fn paste_blocks(&mut self, index: usize) -> EditorResult<usize> {
        self.update(|s| s.paste_blocks(index))
    }

    pub fn merge_blocks(&mut self, first: usize, second: usize) -> EditorResult<()> {
        self.update(|s| s.merge_blocks(first, second))
    }

    pub fn split_block(&mut self, index: usize, offset: usize) -> EditorResult<BlockId> {
        self.update(|s| s.split_block(index, offset))
    }

    pub fn move_block(&mut self, from: usize, to: usize) -> EditorResult<()> {
        self.update(|s| s.move_block(from, to))
    }

    /// Record the current state as an undo point
    ///
    /// History is not part of the published state, so nothing is published.
    pub fn push_history(&mut self) {
        self.push_history_labelled(None);
    }

    pub fn push_history_labelled(&mut self, description: Option<&str>) {
        self.history
            .record(Arc::clone(&self.state), description.map(str::to_string));
    }

    pub fn begin_batch(&mut self) {
        self.history.begin_batch();
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    /// Restore the previous recorded state exactly; false when there is none
    pub fn undo(&mut self) -> bool {
        match self.history.undo(Arc::clone(&self.state)) {
            Some(previous) => {
                self.publish(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(Arc::clone(&self.state)) {
            Some(next) => {
                self.publish(next);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Blocks as pretty JSON
    pub fn export_json(&self) -> EditorResult<String> {
        Ok(serde_json::to_string_pretty(&self.state.blocks)?)
    }

    /// Replace the blocks from JSON; malformed input leaves the state untouched
    pub fn import_json(&mut self, json: &str) -> EditorResult<()> {
        let blocks: Vec<Block> = serde_json::from_str(json)?;
        self.set_blocks(blocks);
        Ok(())
    }

    pub fn export_content(&self) -> String {
        export_text(&self.state.blocks)
    }

    pub fn import_content(&mut self, text: &str) {
        self.set_blocks(import_text(text));
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.state.block_count()
    }

    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.state.block_at(index)
    }
}

impl Default for EditorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(texts: &[&str]) -> EditorStore {
        let mut store = EditorStore::new();
        store.set_blocks(
            texts
                .iter()
                .map(|t| Block::new(BlockType::Paragraph, t))
                .collect(),
        );
        store
    }

    fn texts(store: &EditorStore) -> Vec<String> {
        store.state().blocks.iter().map(Block::text).collect()
    }

    #[test]
    fn test_version_increments_once_per_operation() {
        let mut store = EditorStore::new();
        assert_eq!(store.version(), 0);

        store.add_block(BlockType::Paragraph, None, "a").unwrap();
        assert_eq!(store.version(), 1);

        store.update_block_content(0, "b").unwrap();
        assert_eq!(store.version(), 2);

        assert!(store.update_block_content(7, "x").is_err());
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_subscribers_see_each_snapshot() {
        let mut store = EditorStore::new();
        let mut rx = store.subscribe();

        store.add_block(BlockType::Heading1, None, "Title").unwrap();

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.state.blocks[0].text(), "Title");
        assert!(Arc::ptr_eq(&snapshot.state, &store.state()));
    }

    #[test]
    fn test_add_block_focuses_new_block() {
        let mut store = store_with(&["a", "c"]);
        let id = store.add_block(BlockType::Todo, Some(1), "b").unwrap();

        let state = store.state();
        assert_eq!(state.focused_block_index, Some(1));
        assert_eq!(state.blocks[1].id, id);
        assert_eq!(texts(&store), vec!["a", "b", "c"]);

        assert!(matches!(
            store.add_block(BlockType::Paragraph, Some(9), ""),
            Err(EditorError::IndexOutOfBounds { index: 9, len: 3 })
        ));
    }

    #[test]
    fn test_remove_block_clamps_focus() {
        let mut store = store_with(&["a", "b", "c"]);
        store.remove_block(2).unwrap();
        assert_eq!(store.state().focused_block_index, Some(1));

        store.remove_block(0).unwrap();
        store.remove_block(0).unwrap();
        assert_eq!(store.block_count(), 0);
        assert_eq!(store.state().focused_block_index, None);
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut store = store_with(&["a", "b"]);
        store.set_selected_blocks([0, 1, 1, 5]);
        assert_eq!(
            store.state().selected_blocks,
            BTreeSet::from([0, 1])
        );

        store.set_focused_block(Some(10));
        assert_eq!(store.state().focused_block_index, Some(1));
    }

    #[test]
    fn test_merge_blocks() {
        let mut store = store_with(&["Hello", "World", "!"]);
        store.merge_blocks(0, 1).unwrap();
        assert_eq!(texts(&store), vec!["Hello\nWorld", "!"]);

        assert!(matches!(
            store.merge_blocks(0, 0),
            Err(EditorError::NonAdjacentMerge { .. })
        ));
    }

    #[test]
    fn test_merge_rejects_non_adjacent_blocks() {
        let mut store = store_with(&["a", "b", "c"]);
        let version = store.version();
        assert!(matches!(
            store.merge_blocks(0, 2),
            Err(EditorError::NonAdjacentMerge { first: 0, second: 2 })
        ));
        assert_eq!(store.version(), version);
        assert_eq!(texts(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_block() {
        let mut store = store_with(&["HelloWorld"]);
        store.split_block(0, 5).unwrap();
        assert_eq!(texts(&store), vec!["Hello", "World"]);
        assert_eq!(store.state().focused_block_index, Some(1));

        assert!(matches!(
            store.split_block(0, 6),
            Err(EditorError::InvalidOffset { offset: 6, len: 5 })
        ));
    }

    #[test]
    fn test_copy_paste_assigns_fresh_ids() {
        let mut store = store_with(&["one", "two"]);
        store.copy_blocks(&[0, 1]).unwrap();
        store.paste_blocks(2).unwrap();

        let state = store.state();
        assert_eq!(texts(&store), vec!["one", "two", "one", "two"]);
        assert_ne!(state.blocks[2].id, state.blocks[0].id);
        assert_ne!(state.blocks[3].id, state.blocks[1].id);
        assert_eq!(state.focused_block_index, Some(2));
    }

    #[test]
    fn test_paste_with_empty_clipboard() {
        let mut store = store_with(&["a"]);
        assert!(matches!(store.paste_blocks(0), Err(EditorError::EmptyClipboard)));
    }

    #[test]
    fn test_convert_block_keeps_id_and_text() {
        let mut store = store_with(&["item"]);
        let id = store.state().blocks[0].id.clone();
        store.convert_block(0, BlockType::Todo).unwrap();

        let block = &store.state().blocks[0];
        assert_eq!(block.id, id);
        assert_eq!(block.text(), "item");
        assert_eq!(block.kind, BlockKind::Todo { checked: false });
    }

    #[test]
    fn test_undo_restores_prior_state_exactly() {
        let mut store = store_with(&["a", "b"]);
        let before = store.state();

        store.push_history();
        store.remove_block(0).unwrap();
        assert!(store.can_undo());

        assert!(store.undo());
        assert_eq!(*store.state(), *before);
        assert!(store.can_redo());

        assert!(store.redo());
        assert_eq!(texts(&store), vec!["b"]);
    }

    #[test]
    fn test_undo_without_history_publishes_nothing() {
        let mut store = store_with(&["a"]);
        let version = store.version();
        assert!(!store.undo());
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_history_depth_is_bounded() {
        let mut store = EditorStore::with_history_capacity(3);
        for i in 0..10 {
            store.push_history();
            store.add_block(BlockType::Paragraph, None, &i.to_string()).unwrap();
        }
        assert_eq!(store.history().undo_levels(), 3);
    }

    #[test]
    fn test_import_json_rejects_malformed_input() {
        let mut store = store_with(&["keep me"]);
        let version = store.version();

        assert!(matches!(store.import_json("{not json"), Err(EditorError::Json(_))));
        assert_eq!(store.version(), version);
        assert_eq!(texts(&store), vec!["keep me"]);
    }

    #[test]
    fn test_json_round_trip() {
        let mut store = store_with(&["alpha", "beta"]);
        store.apply_formatting(0, 0, 2, &TextFormat::bold()).unwrap();
        let json = store.export_json().unwrap();

        let mut other = EditorStore::new();
        other.import_json(&json).unwrap();
        assert_eq!(other.state().blocks, store.state().blocks);
    }

    #[test]
    fn test_is_empty() {
        let mut store = store_with(&["", "   "]);
        assert!(store.is_empty());
        store.update_block_content(1, "text").unwrap();
        assert!(!store.is_empty());
    }

    #[test]
    fn test_indent_and_outdent() {
        let mut state = EditorState::with_blocks(vec![
            Block::new(BlockType::BulletedList, "parent"),
            Block::new(BlockType::BulletedList, "child"),
        ]);
        let parent_id = state.blocks[0].id.clone();
        let child_id = state.blocks[1].id.clone();
        state.set_focused_block(Some(1));

        assert!(matches!(
            state.indent(&parent_id),
            Err(EditorError::CannotIndent(_))
        ));

        state.indent(&child_id).unwrap();
        assert_eq!(state.blocks.len(), 1);
        assert_eq!(state.blocks[0].children[0].id, child_id);
        assert_eq!(state.blocks[0].children[0].parent_id, Some(parent_id.clone()));
        assert_eq!(state.focused_block_index, Some(0));
        assert_eq!(state.locate(&child_id), Some(vec![0, 0]));

        state.outdent(&child_id).unwrap();
        assert_eq!(state.blocks.len(), 2);
        assert_eq!(state.blocks[1].id, child_id);
        assert_eq!(state.blocks[1].parent_id, None);
        assert_eq!(state.focused_block_index, Some(1));

        assert!(matches!(
            state.outdent(&child_id),
            Err(EditorError::CannotOutdent(_))
        ));
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut state = EditorState::with_blocks(vec![
            Block::new(BlockType::Toggle, "a"),
            Block::new(BlockType::Paragraph, "b"),
        ]);
        let a = state.blocks[0].id.clone();
        let b = state.blocks[1].id.clone();

        state.reparent(&b, Some(&a), 0).unwrap();
        assert_eq!(state.find_block(&b).unwrap().parent_id, Some(a.clone()));

        assert!(matches!(
            state.reparent(&a, Some(&b), 0),
            Err(EditorError::CycleDetected)
        ));
        assert!(matches!(
            state.reparent(&a, Some(&a), 0),
            Err(EditorError::CycleDetected)
        ));

        state.reparent(&b, None, 5).unwrap();
        assert_eq!(state.blocks.len(), 2);
        assert_eq!(state.blocks[1].id, b);
    }

    #[test]
    fn test_reparent_down_the_same_list() {
        let mut state = EditorState::with_blocks(vec![
            Block::new(BlockType::Paragraph, "a"),
            Block::new(BlockType::Paragraph, "b"),
            Block::new(BlockType::Paragraph, "c"),
        ]);
        let a = state.blocks[0].id.clone();
        state.reparent(&a, None, 2).unwrap();
        let texts: Vec<String> = state.blocks.iter().map(Block::text).collect();
        assert_eq!(texts, vec!["b", "a", "c"]);

        let mut toggle = Block::new(BlockType::Toggle, "t");
        for text in ["x", "y", "z"] {
            let mut child = Block::new(BlockType::Paragraph, text);
            child.parent_id = Some(toggle.id.clone());
            toggle.children.push(child);
        }
        let parent = toggle.id.clone();
        let x = toggle.children[0].id.clone();
        let mut state = EditorState::with_blocks(vec![toggle]);
        state.reparent(&x, Some(&parent), 3).unwrap();
        let texts: Vec<String> = state.blocks[0].children.iter().map(Block::text).collect();
        assert_eq!(texts, vec!["y", "z", "x"]);
    }

    #[test]
    fn test_merge_adopts_children_of_second_block() {
        let mut second = Block::new(BlockType::Toggle, "second");
        let mut child = Block::new(BlockType::Paragraph, "child");
        child.parent_id = Some(second.id.clone());
        second.children.push(child);

        let mut state =
            EditorState::with_blocks(vec![Block::new(BlockType::Toggle, "first"), second]);
        let first = state.blocks[0].id.clone();
        state.merge_blocks(0, 1).unwrap();

        assert_eq!(state.blocks.len(), 1);
        assert_eq!(state.blocks[0].children.len(), 1);
        assert_eq!(state.blocks[0].children[0].parent_id, Some(first));
    }

    #[test]
    fn test_move_block() {
        let mut store = store_with(&["a", "b", "c"]);
        store.move_block(0, 2).unwrap();
        assert_eq!(texts(&store), vec!["b", "c", "a"]);
        assert_eq!(store.state().focused_block_index, Some(2));
    }

    #[test]
    fn test_insert_and_delete_text() {
        let mut state = EditorState::with_blocks(vec![Block::new(BlockType::Paragraph, "helo")]);
        state.insert_text(0, 3, "l").unwrap();
        assert_eq!(state.blocks[0].text(), "hello");

        state.delete_text(0, 0, 1).unwrap();
        assert_eq!(state.blocks[0].text(), "ello");

        assert!(matches!(
            state.insert_text(0, 10, "x"),
            Err(EditorError::InvalidOffset { .. })
        ));
    }
}
