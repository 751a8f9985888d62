//! # Pagecraft Blocks
//!
//! The document content model: typed blocks holding inline rich-text segments
//! and nested children.
//!
//! ## Design
//!
//! - **Values, not handles**: every operation returns a new block; snapshots
//!   are shared by the editor behind `Arc` and never mutated in place
//! - **Character offsets**: formatting and splitting count Unicode scalar
//!   values, never bytes
//! - **Kind carries metadata**: fields like `checked` or the table grid only
//!   exist on the block kinds they belong to
//! - **Lenient at the boundary**: backend data that cannot be understood
//!   degrades to an empty paragraph instead of failing a page load
//!
//! ## Usage
//!
//! ```rust
//! use pagecraft_blocks::{apply_formatting, create_block, get_block_text, BlockType, TextFormat};
//!
//! let block = create_block(BlockType::Paragraph, "Hello brave world", None);
//! let block = apply_formatting(&block, 6, 11, &TextFormat::bold());
//!
//! assert_eq!(block.content.len(), 3);
//! assert_eq!(get_block_text(&block), "Hello brave world");
//! ```

pub mod backend;
pub mod block;
pub mod error;
pub mod form;
pub mod id_generator;
pub mod segment;
pub mod text;

pub use backend::{
    from_backend, from_backend_blocks, parse_backend_blocks, to_backend, to_backend_blocks,
    BackendBlock, Page,
};
pub use block::{
    apply_formatting, create_block, get_block_text, set_block_text, Block, BlockKind, BlockType,
};
pub use error::{BlockError, BlockResult};
pub use form::{BlockFormGroup, BlocksForm, FormControl};
pub use id_generator::BlockId;
pub use segment::{TextFormat, TextSegment};
pub use text::{export_text, import_text};
