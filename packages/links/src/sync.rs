//! # Link Sync
//!
//! Keeps the stored link graph eventually consistent with page content.
//!
//! ## Algorithm
//!
//! 1. Extract the desired link titles from the blocks
//! 2. Fetch the existing outgoing links
//! 3. Create `desired - existing`, remove `existing - desired`, concurrently
//!
//! A failed fetch makes the whole sync a no-op. Failed creates and removes
//! are logged and counted; they never abort the other requests.

use futures::future::{join, join_all};
use indexmap::IndexSet;
use pagecraft_blocks::Block;

use crate::extract::extract_links_from_blocks;
use crate::services::{LinkStorage, PageLink, ServiceResult};

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSyncReport {
    /// Titles linked by this pass
    pub created: Vec<String>,

    /// Titles unlinked by this pass
    pub removed: Vec<String>,

    /// Requests that failed
    pub failed: usize,

    /// Existing links could not be fetched, nothing was attempted
    pub skipped: bool,
}

impl LinkSyncReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// True when nothing had to change
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty() && self.failed == 0
    }
}

/// Reconcile stored links of `page_id` with the `[[...]]` tokens in `blocks`
pub async fn sync_links<S>(storage: &S, page_id: &str, blocks: &[Block]) -> LinkSyncReport
where
    S: LinkStorage + ?Sized,
{
    let desired = extract_links_from_blocks(blocks);
    reconcile(storage, page_id, &desired).await
}

/// Remove every outgoing link of a page, used when the page is deleted
pub async fn remove_all_links_for_page<S>(storage: &S, page_id: &str) -> LinkSyncReport
where
    S: LinkStorage + ?Sized,
{
    reconcile(storage, page_id, &IndexSet::new()).await
}

/// Links pointing at `page_id`
pub async fn backlinks<S>(storage: &S, page_id: &str) -> ServiceResult<Vec<PageLink>>
where
    S: LinkStorage + ?Sized,
{
    storage.get_backlinks(page_id).await
}

async fn reconcile<S>(storage: &S, page_id: &str, desired: &IndexSet<String>) -> LinkSyncReport
where
    S: LinkStorage + ?Sized,
{
    let existing = match storage.get_links_from_page(page_id).await {
        Ok(links) => links,
        Err(e) => {
            tracing::error!(page = page_id, error = %e, "failed to fetch page links, skipping sync");
            return LinkSyncReport::skipped();
        }
    };
    let existing: IndexSet<String> = existing.into_iter().map(|l| l.target_page_id).collect();

    let to_add: Vec<&String> = desired.difference(&existing).collect();
    let to_remove: Vec<&String> = existing.difference(desired).collect();
    if to_add.is_empty() && to_remove.is_empty() {
        return LinkSyncReport::default();
    }

    let adds = join_all(to_add.iter().map(|title| async move {
        let result = storage.create_link(page_id, title, title).await;
        ((*title).clone(), result.map(|_| ()))
    }));
    let removes = join_all(to_remove.iter().map(|title| async move {
        let result = storage.remove_link(page_id, title).await;
        ((*title).clone(), result)
    }));
    let (added, removed) = join(adds, removes).await;

    let mut report = LinkSyncReport::default();
    for (title, result) in added {
        match result {
            Ok(()) => report.created.push(title),
            Err(e) => {
                tracing::error!(page = page_id, target = %title, error = %e, "failed to create link");
                report.failed += 1;
            }
        }
    }
    for (title, result) in removed {
        match result {
            Ok(()) => report.removed.push(title),
            Err(e) => {
                tracing::error!(page = page_id, target = %title, error = %e, "failed to remove link");
                report.failed += 1;
            }
        }
    }

    tracing::debug!(
        page = page_id,
        created = report.created.len(),
        removed = report.removed.len(),
        failed = report.failed,
        "synced page links"
    );
    report
}
