//! Error types for the editor

use pagecraft_blocks::{BlockError, BlockId};
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Block index {index} out of bounds (document has {len} blocks)")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Only adjacent blocks can be merged, got {first} and {second}")]
    NonAdjacentMerge { first: usize, second: usize },

    #[error("Offset {offset} is past the end of the block ({len} characters)")]
    InvalidOffset { offset: usize, len: usize },

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Block {0} has no previous sibling to indent under")]
    CannotIndent(BlockId),

    #[error("Block {0} is already at the top level")]
    CannotOutdent(BlockId),

    #[error("Clipboard is empty")]
    EmptyClipboard,

    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl EditorError {
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }
}
