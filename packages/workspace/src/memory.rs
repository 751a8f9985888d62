//! In-memory collaborators
//!
//! Behave like a small backend: ids are assigned on create, pages get an
//! `updated_at` stamp on every write, and blocks without an id receive one.
//! Latency and outages can be injected for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use pagecraft_blocks::{BackendBlock, Page};
use pagecraft_links::{LinkStorage, PageLink, PageSearch, ServiceError, ServiceResult};
use tokio::sync::Mutex;

use crate::repository::PageRepository;

/// Shared outage switch and per-request delays
#[derive(Debug, Default)]
struct Faults {
    offline: AtomicBool,
    delays: Mutex<VecDeque<Duration>>,
}

impl Faults {
    async fn check(&self, operation: &str) -> ServiceResult<()> {
        let delay = self.delays.lock().await.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(operation.to_string()));
        }
        Ok(())
    }
}

/// Pages kept in insertion order; also answers title searches
#[derive(Debug, Default)]
pub struct MemoryPages {
    pages: Mutex<IndexMap<String, Page>>,
    next_id: AtomicU64,
    faults: Faults,
}

impl MemoryPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following request fail with `Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.faults.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay the next request by `delay`; queued delays apply in order
    pub async fn push_delay(&self, delay: Duration) {
        self.faults.delays.lock().await.push_back(delay);
    }

    pub async fn len(&self) -> usize {
        self.pages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pages.lock().await.is_empty()
    }

    fn next(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn assign_block_ids(&self, blocks: &mut [BackendBlock]) {
        for block in blocks {
            if block.id.is_none() {
                block.id = Some(self.next("block"));
            }
            self.assign_block_ids(&mut block.children);
        }
    }
}

#[async_trait]
impl PageRepository for MemoryPages {
    async fn get_page(&self, id: &str) -> ServiceResult<Page> {
        self.faults.check("get_page").await?;
        self.pages
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    async fn create_page(&self, mut page: Page) -> ServiceResult<Page> {
        self.faults.check("create_page").await?;
        let id = self.next("page");
        page.id = Some(id.clone());
        page.updated_at = Some(Utc::now());
        self.assign_block_ids(&mut page.blocks);

        self.pages.lock().await.insert(id, page.clone());
        Ok(page)
    }

    async fn update_page(&self, id: &str, mut page: Page) -> ServiceResult<Page> {
        self.faults.check("update_page").await?;
        let mut pages = self.pages.lock().await;
        if !pages.contains_key(id) {
            return Err(ServiceError::NotFound(id.to_string()));
        }
        page.id = Some(id.to_string());
        page.updated_at = Some(Utc::now());
        self.assign_block_ids(&mut page.blocks);

        pages.insert(id.to_string(), page.clone());
        Ok(page)
    }
}

#[async_trait]
impl PageSearch for MemoryPages {
    async fn search_pages(&self, query: &str) -> ServiceResult<Vec<Page>> {
        self.faults.check("search_pages").await?;
        let query = query.to_lowercase();
        Ok(self
            .pages
            .lock()
            .await
            .values()
            .filter(|page| page.title.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }
}

/// Links keyed by `(source, target)`
#[derive(Debug, Default)]
pub struct MemoryLinks {
    links: Mutex<IndexMap<(String, String), PageLink>>,
    next_id: AtomicU64,
    faults: Faults,
}

impl MemoryLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.faults.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay the next link request by `delay`
    pub async fn push_delay(&self, delay: Duration) {
        self.faults.delays.lock().await.push_back(delay);
    }

    pub async fn all(&self) -> Vec<PageLink> {
        self.links.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl LinkStorage for MemoryLinks {
    async fn get_links_from_page(&self, page_id: &str) -> ServiceResult<Vec<PageLink>> {
        self.faults.check("get_links_from_page").await?;
        Ok(self
            .links
            .lock()
            .await
            .values()
            .filter(|link| link.source_page_id == page_id)
            .cloned()
            .collect())
    }

    async fn create_link(&self, source: &str, target: &str, text: &str) -> ServiceResult<PageLink> {
        self.faults.check("create_link").await?;
        let mut links = self.links.lock().await;
        let key = (source.to_string(), target.to_string());
        if let Some(existing) = links.get(&key) {
            return Ok(existing.clone());
        }

        let link = PageLink {
            id: Some(format!(
                "link-{}",
                self.next_id.fetch_add(1, Ordering::SeqCst) + 1
            )),
            ..PageLink::new(source, target, text)
        };
        links.insert(key, link.clone());
        Ok(link)
    }

    async fn remove_link(&self, source: &str, target: &str) -> ServiceResult<()> {
        self.faults.check("remove_link").await?;
        self.links
            .lock()
            .await
            .shift_remove(&(source.to_string(), target.to_string()));
        Ok(())
    }

    async fn get_backlinks(&self, page_id: &str) -> ServiceResult<Vec<PageLink>> {
        self.faults.check("get_backlinks").await?;
        Ok(self
            .links
            .lock()
            .await
            .values()
            .filter(|link| link.target_page_id == page_id)
            .cloned()
            .collect())
    }
}
