//! # Block Mutations
//!
//! High-level semantic operations on a block document.
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: Each mutation represents one user-level edit
//! 2. **Validated**: Every mutation checks indices, offsets and tree
//!    constraints before touching the state
//! 3. **Serializable**: Mutations can be logged or replayed as JSON
//! 4. **Atomic**: A mutation that fails leaves the state exactly as it was
//!
//! ## Mutation Semantics
//!
//! ### Delete
//! - Removes the block and its children
//! - Deleting the last block leaves one empty paragraph (post-effect)
//!
//! ### Merge
//! - Only adjacent blocks: `second == first + 1`
//! - Text becomes `first + "\n" + second`; children are concatenated
//!
//! ### Indent / Outdent / Reparent
//! - Addressed by id so nested blocks can be moved
//! - Fails rather than creating a cycle

use pagecraft_blocks::{Block, BlockId, BlockType, TextFormat};
use serde::{Deserialize, Serialize};

use crate::document::{BlockPatch, EditorState};
use crate::errors::{EditorError, EditorResult};

/// Semantic mutations (intent-preserving operations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Replace the whole document
    SetBlocks { blocks: Vec<Block> },

    /// Create a block at `index` (append when `None`)
    InsertBlock {
        index: Option<usize>,
        block_type: BlockType,
        content: String,
    },

    DeleteBlock { index: usize },

    DeleteBlocks { indices: Vec<usize> },

    /// Deep copy with fresh ids, inserted after the original
    DuplicateBlock { index: usize },

    ConvertBlock { index: usize, block_type: BlockType },

    /// Replace all text (atomic, formatting discarded)
    UpdateText { index: usize, content: String },

    /// Insert text at a character offset, keeping formats
    InsertText {
        index: usize,
        offset: usize,
        text: String,
    },

    /// Remove the characters in `[start, end)`
    DeleteText { index: usize, start: usize, end: usize },

    /// Shallow merge of kind metadata, content, children or order
    UpdateBlock { index: usize, patch: BlockPatch },

    ApplyFormatting {
        index: usize,
        start: usize,
        end: usize,
        format: TextFormat,
    },

    MergeBlocks { first: usize, second: usize },

    SplitBlock { index: usize, offset: usize },

    /// Drag reorder among root-level blocks
    MoveBlock { from: usize, to: usize },

    Indent { block_id: BlockId },

    Outdent { block_id: BlockId },

    /// Tree move; `new_parent_id: None` moves to the root
    Reparent {
        block_id: BlockId,
        new_parent_id: Option<BlockId>,
        index: usize,
    },

    /// Insert fresh copies of the clipboard at `index`
    Paste { index: usize },

    /// Copy the blocks to the clipboard and remove them
    Cut { indices: Vec<usize> },
}

impl Mutation {
    /// Short human-readable label, used for undo descriptions
    pub fn description(&self) -> &'static str {
        match self {
            Mutation::SetBlocks { .. } => "Replace document",
            Mutation::InsertBlock { .. } => "Insert block",
            Mutation::DeleteBlock { .. } => "Delete block",
            Mutation::DeleteBlocks { .. } => "Delete blocks",
            Mutation::DuplicateBlock { .. } => "Duplicate block",
            Mutation::ConvertBlock { .. } => "Turn into",
            Mutation::UpdateText { .. }
            | Mutation::InsertText { .. }
            | Mutation::DeleteText { .. } => "Edit text",
            Mutation::UpdateBlock { .. } => "Update block",
            Mutation::ApplyFormatting { .. } => "Format text",
            Mutation::MergeBlocks { .. } => "Merge blocks",
            Mutation::SplitBlock { .. } => "Split block",
            Mutation::MoveBlock { .. } => "Move block",
            Mutation::Indent { .. } => "Indent",
            Mutation::Outdent { .. } => "Outdent",
            Mutation::Reparent { .. } => "Move block",
            Mutation::Paste { .. } => "Paste",
            Mutation::Cut { .. } => "Cut",
        }
    }

    /// Apply mutation to the state with validation
    pub fn apply(&self, state: &mut EditorState) -> EditorResult<()> {
        // Validate first
        self.validate(state)?;

        match self {
            Mutation::SetBlocks { blocks } => {
                state.set_blocks(blocks.clone());
                if state.focused_block_index.is_none() && !state.blocks.is_empty() {
                    state.focused_block_index = Some(0);
                }
                Ok(())
            }
            Mutation::InsertBlock {
                index,
                block_type,
                content,
            } => state.add_block(*block_type, *index, content).map(|_| ()),
            Mutation::DeleteBlock { index } => state.remove_block(*index).map(|_| ()),
            Mutation::DeleteBlocks { indices } => state.remove_blocks(indices).map(|_| ()),
            Mutation::DuplicateBlock { index } => state.duplicate_block(*index).map(|_| ()),
            Mutation::ConvertBlock { index, block_type } => {
                state.convert_block(*index, *block_type)
            }
            Mutation::UpdateText { index, content } => {
                state.update_block_content(*index, content)
            }
            Mutation::InsertText {
                index,
                offset,
                text,
            } => state.insert_text(*index, *offset, text),
            Mutation::DeleteText { index, start, end } => state.delete_text(*index, *start, *end),
            Mutation::UpdateBlock { index, patch } => state.update_block(*index, patch),
            Mutation::ApplyFormatting {
                index,
                start,
                end,
                format,
            } => state.apply_formatting(*index, *start, *end, format),
            Mutation::MergeBlocks { first, second } => state.merge_blocks(*first, *second),
            Mutation::SplitBlock { index, offset } => state.split_block(*index, *offset).map(|_| ()),
            Mutation::MoveBlock { from, to } => state.move_block(*from, *to),
            Mutation::Indent { block_id } => state.indent(block_id),
            Mutation::Outdent { block_id } => state.outdent(block_id),
            Mutation::Reparent {
                block_id,
                new_parent_id,
                index,
            } => state.reparent(block_id, new_parent_id.as_ref(), *index),
            Mutation::Paste { index } => state.paste_blocks(*index).map(|_| ()),
            Mutation::Cut { indices } => state.cut_blocks(indices).map(|_| ()),
        }
    }

    /// Validate without applying
    pub fn validate(&self, state: &EditorState) -> EditorResult<()> {
        let len = state.blocks.len();
        let check = |index: usize| {
            if index < len {
                Ok(())
            } else {
                Err(EditorError::out_of_bounds(index, len))
            }
        };

        match self {
            Mutation::SetBlocks { .. } => Ok(()),

            Mutation::InsertBlock { index, .. } => match index {
                Some(index) if *index > len => Err(EditorError::out_of_bounds(*index, len)),
                _ => Ok(()),
            },

            Mutation::DeleteBlock { index }
            | Mutation::DuplicateBlock { index }
            | Mutation::ConvertBlock { index, .. }
            | Mutation::UpdateText { index, .. }
            | Mutation::DeleteText { index, .. }
            | Mutation::UpdateBlock { index, .. }
            | Mutation::ApplyFormatting { index, .. } => check(*index),

            Mutation::InsertText { index, offset, .. }
            | Mutation::SplitBlock { index, offset } => {
                check(*index)?;
                let text_len = state.blocks[*index].text_len();
                if *offset > text_len {
                    return Err(EditorError::InvalidOffset {
                        offset: *offset,
                        len: text_len,
                    });
                }
                Ok(())
            }

            Mutation::DeleteBlocks { indices } | Mutation::Cut { indices } => {
                indices.iter().try_for_each(|&i| check(i))
            }

            Mutation::MergeBlocks { first, second } => {
                if *second != first + 1 {
                    return Err(EditorError::NonAdjacentMerge {
                        first: *first,
                        second: *second,
                    });
                }
                check(*first)?;
                check(*second)
            }

            Mutation::MoveBlock { from, to } => {
                check(*from)?;
                check(*to)
            }

            Mutation::Indent { block_id } => {
                let path = state
                    .locate(block_id)
                    .ok_or_else(|| EditorError::BlockNotFound(block_id.clone()))?;
                if path.last() == Some(&0) {
                    return Err(EditorError::CannotIndent(block_id.clone()));
                }
                Ok(())
            }

            Mutation::Outdent { block_id } => {
                let path = state
                    .locate(block_id)
                    .ok_or_else(|| EditorError::BlockNotFound(block_id.clone()))?;
                if path.len() < 2 {
                    return Err(EditorError::CannotOutdent(block_id.clone()));
                }
                Ok(())
            }

            Mutation::Reparent {
                block_id,
                new_parent_id,
                ..
            } => {
                let block = state
                    .find_block(block_id)
                    .ok_or_else(|| EditorError::BlockNotFound(block_id.clone()))?;
                if let Some(parent_id) = new_parent_id {
                    // Moving into itself or a descendant
                    if block.contains(parent_id) {
                        return Err(EditorError::CycleDetected);
                    }
                    state
                        .find_block(parent_id)
                        .ok_or_else(|| EditorError::BlockNotFound(parent_id.clone()))?;
                }
                Ok(())
            }

            Mutation::Paste { index } => {
                if state.clipboard.is_empty() {
                    return Err(EditorError::EmptyClipboard);
                }
                if *index > len {
                    return Err(EditorError::out_of_bounds(*index, len));
                }
                Ok(())
            }
        }
    }
}

/// Result of applying a mutation
#[derive(Debug, Clone)]
pub struct MutationResult {
    /// New version number
    pub version: u64,

    /// Post-effects that changed the state
    pub effects: Vec<&'static str>,
}
