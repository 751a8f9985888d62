//! # Pagecraft Workspace
//!
//! Wires an editor to the outside world for one page at a time.
//!
//! ## Responsibilities
//!
//! - Load a page from a [`PageRepository`] and save it back
//! - Autosave after edits go quiet, cancelled when the page is closed
//! - Keep stored `[[...]]` links in sync after each save
//! - Read `pagecraft.config.json`
//!
//! [`memory`] holds in-process collaborators for tests and embedding.

pub mod config;
pub mod memory;
pub mod repository;
pub mod session;

pub use config::{ConfigError, EditorConfig, DEFAULT_CONFIG_NAME};
pub use memory::{MemoryLinks, MemoryPages};
pub use repository::PageRepository;
pub use session::{PageSession, SaveOutcome, SessionError, SessionResult, UNTITLED};
