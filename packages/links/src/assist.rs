//! # Link Insert Assist
//!
//! Suggests pages while the user types a `[[` link.
//!
//! ## States
//!
//! ```text
//! Idle ──set_query──► Searching ──search (after debounce)──► Suggesting
//!                         ▲                                      │
//!                         └──────────── set_query ───────────────┘
//! Suggesting ──Enter──► Selected | CreatedNew     ──Escape──► Cancelled
//! ```
//!
//! Every outcome returns the assist to `Idle`.

use std::time::Duration;

use pagecraft_blocks::Page;

use crate::debounce::Debouncer;
use crate::services::PageSearch;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_MIN_QUERY_LEN: usize = 2;

/// Query typed after an unclosed `[[` before `cursor` (a character offset)
pub fn pending_link_query(text: &str, cursor: usize) -> Option<String> {
    let open = open_token(text, cursor)?;
    let before = prefix(text, cursor);
    Some(before[open + 2..].to_string())
}

/// Complete the pending `[[query` at `cursor` into `[[title]]`
///
/// Without a pending token the link is inserted at the cursor. Returns the
/// new text and the cursor placed after the closing brackets.
pub fn insert_link_token(text: &str, cursor: usize, title: &str) -> (String, usize) {
    let before = prefix(text, cursor);
    let after = &text[before.len()..];
    let start = open_token(text, cursor).unwrap_or(before.len());

    let mut out = String::with_capacity(text.len() + title.len() + 4);
    out.push_str(&before[..start]);
    out.push_str("[[");
    out.push_str(title);
    out.push_str("]]");
    let cursor = out.chars().count();
    out.push_str(after);
    (out, cursor)
}

/// Text up to a character offset (clamped)
fn prefix(text: &str, cursor: usize) -> &str {
    let end = text
        .char_indices()
        .nth(cursor)
        .map_or(text.len(), |(i, _)| i);
    &text[..end]
}

/// Byte offset of the last unclosed `[[` before the cursor
fn open_token(text: &str, cursor: usize) -> Option<usize> {
    let before = prefix(text, cursor);
    let open = before.rfind("[[")?;
    let query = &before[open + 2..];
    if query.contains(']') || query.contains('\n') {
        return None;
    }
    Some(open)
}

/// Arrow and commit keys the assist reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistKey {
    Up,
    Down,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssistState {
    Idle,
    Searching { query: String },
    Suggesting {
        query: String,
        results: Vec<Page>,
        selected: usize,
    },
}

/// How a suggestion session ended
#[derive(Debug, Clone, PartialEq)]
pub enum AssistOutcome {
    Selected(Page),
    /// No page matched; create one with this title
    CreatedNew(String),
    Cancelled,
}

#[derive(Debug)]
pub struct LinkAssist {
    current_page_id: Option<String>,
    min_query_len: usize,
    debouncer: Debouncer,
    state: AssistState,
}

impl LinkAssist {
    pub fn new(current_page_id: Option<String>) -> Self {
        Self::with_config(current_page_id, DEFAULT_SEARCH_DEBOUNCE, DEFAULT_MIN_QUERY_LEN)
    }

    pub fn with_config(
        current_page_id: Option<String>,
        debounce: Duration,
        min_query_len: usize,
    ) -> Self {
        Self {
            current_page_id,
            min_query_len,
            debouncer: Debouncer::new(debounce),
            state: AssistState::Idle,
        }
    }

    pub fn state(&self) -> &AssistState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != AssistState::Idle
    }

    pub fn query(&self) -> &str {
        match &self.state {
            AssistState::Idle => "",
            AssistState::Searching { query } | AssistState::Suggesting { query, .. } => query,
        }
    }

    pub fn suggestions(&self) -> &[Page] {
        match &self.state {
            AssistState::Suggesting { results, .. } => results,
            _ => &[],
        }
    }

    pub fn selected_index(&self) -> usize {
        match &self.state {
            AssistState::Suggesting { selected, .. } => *selected,
            _ => 0,
        }
    }

    /// Nothing matched a non-empty query, so "create page" is offered
    pub fn offers_create(&self) -> bool {
        matches!(
            &self.state,
            AssistState::Suggesting { query, results, .. }
                if results.is_empty() && !query.trim().is_empty()
        )
    }

    /// A search is scheduled and waiting for its debounce
    pub fn search_pending(&self) -> bool {
        matches!(self.state, AssistState::Searching { .. })
    }

    /// Update the query; short queries skip the search entirely
    pub fn set_query(&mut self, query: &str) {
        if query.trim().chars().count() < self.min_query_len {
            self.debouncer.cancel();
            self.state = AssistState::Suggesting {
                query: query.to_string(),
                results: Vec::new(),
                selected: 0,
            };
            return;
        }
        self.debouncer.touch();
        self.state = AssistState::Searching {
            query: query.to_string(),
        };
    }

    /// Wait out the debounce and run the pending search
    ///
    /// Search failures leave an empty suggestion list. Returns the number of
    /// suggestions.
    pub async fn run_search<S>(&mut self, search: &S) -> usize
    where
        S: PageSearch + ?Sized,
    {
        let AssistState::Searching { query } = &self.state else {
            return self.suggestions().len();
        };
        let query = query.clone();

        self.debouncer.wait().await;
        self.debouncer.fire();

        let results: Vec<Page> = match search.search_pages(query.trim()).await {
            Ok(pages) => pages
                .into_iter()
                .filter(|page| page.id.is_none() || page.id != self.current_page_id)
                .collect(),
            Err(e) => {
                tracing::warn!(%query, error = %e, "page search failed");
                Vec::new()
            }
        };
        tracing::debug!(%query, count = results.len(), "link suggestions ready");

        let count = results.len();
        self.state = AssistState::Suggesting {
            query,
            results,
            selected: 0,
        };
        count
    }

    /// Handle a navigation or commit key; returns the outcome when the
    /// session ends
    pub fn handle_key(&mut self, key: AssistKey) -> Option<AssistOutcome> {
        match key {
            AssistKey::Escape => {
                if !self.is_active() {
                    return None;
                }
                self.reset();
                Some(AssistOutcome::Cancelled)
            }
            AssistKey::Up | AssistKey::Down => {
                if let AssistState::Suggesting {
                    results, selected, ..
                } = &mut self.state
                {
                    *selected = match key {
                        AssistKey::Down => (*selected + 1).min(results.len().saturating_sub(1)),
                        _ => selected.saturating_sub(1),
                    };
                }
                None
            }
            AssistKey::Enter => {
                let AssistState::Suggesting {
                    query,
                    results,
                    selected,
                } = &self.state
                else {
                    return None;
                };
                let outcome = match results.get(*selected) {
                    Some(page) => AssistOutcome::Selected(page.clone()),
                    None if !query.trim().is_empty() => {
                        AssistOutcome::CreatedNew(query.trim().to_string())
                    }
                    None => return None,
                };
                self.reset();
                Some(outcome)
            }
        }
    }

    pub fn reset(&mut self) {
        self.debouncer.cancel();
        self.state = AssistState::Idle;
    }
}
