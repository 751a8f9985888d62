//! # Pagecraft Links
//!
//! Cross-page links written as `[[Title]]` tokens inside block text.
//!
//! ## Pieces
//!
//! - [`extract`]: scan text and block trees for link titles
//! - [`sync`]: reconcile stored links with page content
//! - [`assist`]: page suggestions while typing a `[[` link
//! - [`debounce`]: the trailing-edge timer used by search and autosave
//! - [`services`]: collaborator traits for link storage and page search
//!
//! The stored link graph is derived data. Page content is the source of
//! truth, and every sync moves storage toward it.

pub mod assist;
pub mod debounce;
pub mod extract;
pub mod services;
pub mod sync;

pub use assist::{
    insert_link_token, pending_link_query, AssistKey, AssistOutcome, AssistState, LinkAssist,
};
pub use debounce::Debouncer;
pub use extract::{extract_links_from_blocks, extract_page_links};
pub use services::{LinkStorage, PageLink, PageSearch, ServiceError, ServiceResult};
pub use sync::{backlinks, remove_all_links_for_page, sync_links, LinkSyncReport};
