//! # Page Session
//!
//! One open page: the block editor plus everything around it that talks to
//! the outside world.
//!
//! ## Save flow
//!
//! ```text
//! edit ─► snapshot published ─► autosave debounce (reset per edit)
//!                                      │
//!                                      ▼
//!                   create/update page ─► record response ─► spawn link sync
//! ```
//!
//! Every save carries the snapshot version it was taken from. A response
//! for a version older than the newest recorded one is ignored, so a slow
//! save can never roll back what a later save stored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pagecraft_blocks::{from_backend_blocks, to_backend_blocks, Block, BlockType, Page};
use pagecraft_editor::{BlockEditor, EditorError, EditorState, Snapshot};
use pagecraft_links::{
    sync_links, Debouncer, LinkAssist, LinkStorage, LinkSyncReport, ServiceError,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::EditorConfig;
use crate::repository::PageRepository;

pub const UNTITLED: &str = "Untitled";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Editor(#[from] EditorError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What a save did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Stored; the page is now saved up to `version`
    Saved { version: u64 },
    /// Nothing changed since the last save
    UpToDate,
    /// Stored, but a newer save finished first so the response was dropped
    /// and the next save rewrites the newest snapshot
    Stale { version: u64 },
}

/// Page metadata and the newest version known to be stored
#[derive(Debug)]
struct SaveState {
    page: Page,
    saved_version: u64,
    /// The stored copy may differ from `saved_version`: metadata changed,
    /// or a stale save landed after a newer one
    force_save: bool,
}

struct Shared {
    repository: Arc<dyn PageRepository>,
    links: Arc<dyn LinkStorage>,
    state: Mutex<SaveState>,
    /// Serializes page creation so concurrent first saves create one page
    create_lock: tokio::sync::Mutex<()>,
    /// Newest version whose links were synced; held for the whole sync
    link_sync: Arc<tokio::sync::Mutex<u64>>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SaveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store one snapshot and record the response if it is still current
    async fn save(&self, snapshot: Snapshot) -> SessionResult<SaveOutcome> {
        let version = snapshot.version;
        let mut page = {
            let state = self.state();
            if version <= state.saved_version && state.page.id.is_some() && !state.force_save {
                return Ok(SaveOutcome::UpToDate);
            }
            state.page.clone()
        };
        page.blocks = to_backend_blocks(&snapshot.state.blocks);

        // Held until the created id is recorded
        let creating = match page.id {
            Some(_) => None,
            None => Some(self.create_lock.lock().await),
        };
        if creating.is_some() {
            // Another save may have created the page while we waited
            page.id = self.state().page.id.clone();
        }

        let stored = match page.id.clone() {
            Some(id) => self.repository.update_page(&id, page).await?,
            None => self.repository.create_page(page).await?,
        };

        {
            let mut state = self.state();
            if version < state.saved_version {
                tracing::debug!(
                    version,
                    newest = state.saved_version,
                    "ignoring stale save response"
                );
                state.force_save = true;
                return Ok(SaveOutcome::Stale { version });
            }
            state.page = Page {
                blocks: Vec::new(),
                ..stored.clone()
            };
            state.saved_version = version;
            state.force_save = false;
        }
        tracing::debug!(page = ?stored.id, version, "saved page");

        drop(creating);

        if let Some(page_id) = stored.id {
            self.spawn_link_sync(page_id, version, Arc::clone(&snapshot.state));
        }
        Ok(SaveOutcome::Saved { version })
    }

    /// Fire-and-forget link sync; failures are logged by the sync itself
    fn spawn_link_sync(&self, page_id: String, version: u64, state: Arc<EditorState>) {
        let links = Arc::clone(&self.links);
        let synced = Arc::clone(&self.link_sync);
        tokio::spawn(async move {
            run_link_sync(links.as_ref(), &synced, &page_id, version, &state.blocks).await;
        });
    }
}

/// Sync links for one snapshot, one sync at a time
///
/// A snapshot older than the newest synced one is skipped so a slow sync can
/// never restore links a later one removed.
async fn run_link_sync(
    links: &dyn LinkStorage,
    synced: &tokio::sync::Mutex<u64>,
    page_id: &str,
    version: u64,
    blocks: &[Block],
) -> Option<LinkSyncReport> {
    let mut synced = synced.lock().await;
    if version < *synced {
        tracing::debug!(version, newest = *synced, "skipping outdated link sync");
        return None;
    }
    let report = sync_links(links, page_id, blocks).await;
    *synced = version;
    Some(report)
}

/// Save the newest snapshot once edits have been quiet for `delay`
async fn autosave_loop(shared: Arc<Shared>, mut rx: watch::Receiver<Snapshot>, delay: Duration) {
    let mut debouncer = Debouncer::new(delay);
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                debouncer.touch();
            }
            _ = debouncer.wait() => {
                debouncer.fire();
                let snapshot = rx.borrow_and_update().clone();
                if let Err(e) = shared.save(snapshot).await {
                    tracing::error!(error = %e, "autosave failed");
                }
            }
        }
    }
}

/// An open page
///
/// Must be created inside a tokio runtime: the autosave task and link syncs
/// are spawned onto it.
pub struct PageSession {
    editor: BlockEditor,
    shared: Arc<Shared>,
    config: EditorConfig,
    autosave: Option<JoinHandle<()>>,
}

impl PageSession {
    /// Start a new, unsaved page holding one empty paragraph
    pub fn create(
        repository: Arc<dyn PageRepository>,
        links: Arc<dyn LinkStorage>,
        config: EditorConfig,
        title: &str,
    ) -> SessionResult<Self> {
        let title = if title.trim().is_empty() { UNTITLED } else { title };
        Self::open(
            repository,
            links,
            config,
            Page::new(title),
            vec![Block::new(BlockType::Paragraph, "")],
        )
    }

    /// Open a stored page
    pub async fn load(
        repository: Arc<dyn PageRepository>,
        links: Arc<dyn LinkStorage>,
        config: EditorConfig,
        page_id: &str,
    ) -> SessionResult<Self> {
        let page = repository.get_page(page_id).await?;
        let blocks = from_backend_blocks(&page.blocks);
        tracing::debug!(page = page_id, blocks = blocks.len(), "loaded page");
        Self::open(repository, links, config, page, blocks)
    }

    fn open(
        repository: Arc<dyn PageRepository>,
        links: Arc<dyn LinkStorage>,
        config: EditorConfig,
        page: Page,
        blocks: Vec<Block>,
    ) -> SessionResult<Self> {
        let mut editor = BlockEditor::with_history_capacity(config.history_capacity);
        editor.load(blocks)?;

        let shared = Arc::new(Shared {
            repository,
            links,
            state: Mutex::new(SaveState {
                page: Page {
                    blocks: Vec::new(),
                    ..page
                },
                saved_version: editor.version(),
                force_save: false,
            }),
            create_lock: tokio::sync::Mutex::new(()),
            link_sync: Arc::new(tokio::sync::Mutex::new(0)),
        });

        let autosave = tokio::spawn(autosave_loop(
            Arc::clone(&shared),
            editor.subscribe(),
            config.autosave_delay(),
        ));

        Ok(Self {
            editor,
            shared,
            config,
            autosave: Some(autosave),
        })
    }

    pub fn editor(&self) -> &BlockEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut BlockEditor {
        &mut self.editor
    }

    pub fn state(&self) -> Arc<EditorState> {
        self.editor.state()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Page metadata as last stored (blocks live in the editor)
    pub fn page(&self) -> Page {
        self.shared.state().page.clone()
    }

    /// `None` until the first save creates the page
    pub fn page_id(&self) -> Option<String> {
        self.shared.state().page.id.clone()
    }

    pub fn saved_version(&self) -> u64 {
        self.shared.state().saved_version
    }

    /// Edits or metadata not yet stored
    pub fn is_dirty(&self) -> bool {
        let state = self.shared.state();
        state.force_save || self.editor.version() > state.saved_version || state.page.id.is_none()
    }

    /// Rename the page; stored with the next save
    pub fn set_title(&mut self, title: &str) {
        let mut state = self.shared.state();
        if state.page.title != title {
            state.page.title = title.to_string();
            state.force_save = true;
        }
    }

    pub fn set_icon(&mut self, icon: Option<&str>) {
        let mut state = self.shared.state();
        state.page.icon = icon.map(str::to_string);
        state.force_save = true;
    }

    /// Save the current snapshot now
    pub async fn save(&self) -> SessionResult<SaveOutcome> {
        let snapshot = Snapshot {
            version: self.editor.version(),
            state: self.editor.state(),
        };
        self.shared.save(snapshot).await
    }

    /// Reconcile stored links with the current content and wait for it
    ///
    /// `None` while the page has never been saved, or when a sync of newer
    /// content already ran.
    pub async fn sync_links(&self) -> Option<LinkSyncReport> {
        let page_id = self.page_id()?;
        let state = self.editor.state();
        run_link_sync(
            self.shared.links.as_ref(),
            &self.shared.link_sync,
            &page_id,
            self.editor.version(),
            &state.blocks,
        )
        .await
    }

    /// Link assist configured for this page
    pub fn link_assist(&self) -> LinkAssist {
        LinkAssist::with_config(
            self.page_id(),
            self.config.search_debounce(),
            self.config.min_search_length,
        )
    }

    /// Stop autosaving; unsaved edits are dropped
    pub fn close(mut self) {
        self.stop_autosave();
    }

    fn stop_autosave(&mut self) {
        if let Some(handle) = self.autosave.take() {
            handle.abort();
            tracing::debug!(page = ?self.page_id(), "closed page session");
        }
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.stop_autosave();
    }
}

impl std::fmt::Debug for PageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSession")
            .field("page_id", &self.page_id())
            .field("version", &self.editor.version())
            .field("saved_version", &self.saved_version())
            .finish()
    }
}
