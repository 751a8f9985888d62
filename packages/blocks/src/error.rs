use thiserror::Error;

use crate::BlockType;

pub type BlockResult<T> = Result<T, BlockError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Operation requires a {expected} block, found {found}")]
    WrongKind {
        expected: &'static str,
        found: BlockType,
    },

    #[error("Table cell out of range: row {row}, column {column}")]
    CellOutOfRange { row: usize, column: usize },

    #[error("Table must keep at least one {0}")]
    LastTableLine(&'static str),

    #[error("Invalid url: {0}")]
    InvalidUrl(String),
}

impl BlockError {
    pub fn wrong_kind(expected: &'static str, found: BlockType) -> Self {
        Self::WrongKind { expected, found }
    }

    pub fn cell_out_of_range(row: usize, column: usize) -> Self {
        Self::CellOutOfRange { row, column }
    }
}
