//! # Pagecraft Editor
//!
//! Block editing engine for Pagecraft pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ session: keys → mutations, slash menu       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ pipeline: BlockEditor                       │
//! │  - Validate and apply mutations             │
//! │  - Run post-effects                         │
//! │  - One undo step per edit                   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: EditorStore                       │
//! │  - Immutable snapshots, versioned           │
//! │  - Published over a watch channel           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are immutable**: every edit publishes a new `Arc<EditorState>`
//! 2. **Validate before apply**: a failed edit publishes nothing and records no history
//! 3. **Never empty**: a document always holds at least one block
//! 4. **Clipboard by value**: copied blocks are detached from the document
//!
//! ## Usage
//!
//! ```rust
//! use pagecraft_blocks::{Block, BlockType};
//! use pagecraft_editor::{BlockEditor, EditSession, Key};
//!
//! let mut editor = BlockEditor::new();
//! editor.load(vec![Block::new(BlockType::Paragraph, "")]).unwrap();
//!
//! let mut session = EditSession::new(editor);
//! session.type_text("/head").unwrap();
//! session.handle_key(Key::Enter).unwrap();
//!
//! assert_eq!(session.state().blocks[0].block_type(), BlockType::Heading1);
//! ```

pub mod board;
pub mod document;
pub mod errors;
pub mod mutations;
pub mod pipeline;
pub mod post_effects;
pub mod session;
pub mod slash_menu;
pub mod undo_stack;

pub use board::{move_item_in_list, transfer_item, Board, BoardGroup, BoardRecord, NO_VALUE};
pub use document::{BlockPatch, EditorState, EditorStore, FocusDirection, Snapshot};
pub use errors::{EditorError, EditorResult};
pub use mutations::{Mutation, MutationResult};
pub use pipeline::BlockEditor;
pub use post_effects::{EnsureDocumentNotEmpty, PostEffect, PostEffectEngine, SyncParentLinks};
pub use session::{EditSession, Key, KeyEvent, Modifiers};
pub use slash_menu::{filter_items, SlashMenu, SlashMenuItem, CATALOGUE};
pub use undo_stack::{HistoryEntry, UndoStack, DEFAULT_HISTORY_CAPACITY};
