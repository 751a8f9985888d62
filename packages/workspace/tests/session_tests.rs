//! Page sessions against in-memory collaborators

use std::sync::Arc;
use std::time::Duration;

use pagecraft_links::{LinkStorage, ServiceError};
use pagecraft_workspace::{
    EditorConfig, MemoryLinks, MemoryPages, PageRepository, PageSession, SaveOutcome,
    SessionError,
};

struct Fixture {
    pages: Arc<MemoryPages>,
    links: Arc<MemoryLinks>,
}

impl Fixture {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
        Self {
            pages: Arc::new(MemoryPages::new()),
            links: Arc::new(MemoryLinks::new()),
        }
    }

    fn create(&self, title: &str) -> PageSession {
        PageSession::create(
            self.pages.clone(),
            self.links.clone(),
            EditorConfig::default(),
            title,
        )
        .unwrap()
    }

    async fn load(&self, page_id: &str) -> PageSession {
        PageSession::load(
            self.pages.clone(),
            self.links.clone(),
            EditorConfig::default(),
            page_id,
        )
        .await
        .unwrap()
    }

    /// Let spawned link syncs finish
    async fn settle(&self) {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    async fn stored_text(&self, page_id: &str) -> String {
        let page = self.pages.get_page(page_id).await.unwrap();
        page.blocks[0].content.clone()
    }
}

#[tokio::test]
async fn test_first_save_creates_page() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("  ");
    assert!(session.page_id().is_none());
    assert!(session.is_dirty());

    session.editor_mut().update_text(0, "hello")?;
    let outcome = session.save().await?;
    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            version: session.editor().version()
        }
    );

    let id = session.page_id().unwrap();
    assert_eq!(session.page().title, "Untitled");
    assert_eq!(fx.stored_text(&id).await, "hello");
    assert!(!session.is_dirty());
    assert_eq!(session.save().await?, SaveOutcome::UpToDate);
    assert_eq!(fx.pages.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_load_round_trip() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Recipes");
    session.editor_mut().update_text(0, "Pancakes")?;
    session.editor_mut().insert_block(None, pagecraft_blocks::BlockType::Todo, "eggs")?;
    session.save().await?;
    let id = session.page_id().unwrap();
    session.close();

    let reopened = fx.load(&id).await;
    let state = reopened.state();
    assert_eq!(state.blocks.len(), 2);
    assert_eq!(state.blocks[0].text(), "Pancakes");
    assert_eq!(state.blocks[1].text(), "eggs");
    assert_eq!(reopened.page().title, "Recipes");
    assert!(!reopened.is_dirty());
    Ok(())
}

#[tokio::test]
async fn test_load_missing_page() {
    let fx = Fixture::new();
    let err = PageSession::load(
        fx.pages.clone(),
        fx.links.clone(),
        EditorConfig::default(),
        "page-404",
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Service(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_save_is_reported() {
    let fx = Fixture::new();
    let session = fx.create("Offline");
    fx.pages.set_offline(true);

    let err = session.save().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Service(ServiceError::Unavailable(_))
    ));
    assert!(session.page_id().is_none());
    assert!(session.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_autosave_waits_for_quiet() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Journal");

    session.editor_mut().update_text(0, "a")?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    session.editor_mut().update_text(0, "ab")?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    // The second edit restarted the delay
    assert!(fx.pages.is_empty().await);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let id = session.page_id().expect("autosaved");
    assert_eq!(fx.stored_text(&id).await, "ab");
    assert_eq!(session.saved_version(), session.editor().version());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_autosave() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Scratch");
    session.editor_mut().update_text(0, "draft")?;
    session.close();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(fx.pages.is_empty().await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stale_save_response_is_ignored() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Race");
    session.save().await?;
    let id = session.page_id().unwrap();

    // The autosave request is slow; an explicit save overtakes it
    fx.pages.push_delay(Duration::from_secs(5)).await;
    session.editor_mut().update_text(0, "first")?;
    tokio::time::sleep(Duration::from_millis(3100)).await;

    session.editor_mut().update_text(0, "second")?;
    let newest = session.editor().version();
    assert_eq!(
        session.save().await?,
        SaveOutcome::Saved { version: newest }
    );
    assert_eq!(fx.stored_text(&id).await, "second");

    // The slow response arrives and is dropped
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(session.saved_version(), newest);
    assert!(session.is_dirty());

    // The follow-up autosave restores the newest content
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(fx.stored_text(&id).await, "second");
    assert_eq!(session.saved_version(), newest);
    assert!(!session.is_dirty());
    Ok(())
}

#[tokio::test]
async fn test_title_change_is_saved() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Draft");
    session.save().await?;
    let id = session.page_id().unwrap();

    session.set_title("Final");
    session.set_icon(Some("📄"));
    assert!(session.is_dirty());
    assert!(matches!(session.save().await?, SaveOutcome::Saved { .. }));

    let stored = fx.pages.get_page(&id).await?;
    assert_eq!(stored.title, "Final");
    assert_eq!(stored.icon.as_deref(), Some("📄"));
    Ok(())
}

#[tokio::test]
async fn test_typed_link_is_synced_then_removed() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Home");
    assert!(session.sync_links().await.is_none());

    session
        .editor_mut()
        .update_text(0, "Read [[Getting Started]] first")?;
    session.save().await?;
    fx.settle().await;
    let id = session.page_id().unwrap();

    let report = session.sync_links().await.unwrap();
    assert!(!report.skipped);
    let stored = fx.links.get_links_from_page(&id).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].target_page_id, "Getting Started");

    session.editor_mut().update_text(0, "Read first")?;
    session.save().await?;
    fx.settle().await;
    session.sync_links().await.unwrap();
    assert!(fx.links.get_links_from_page(&id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_link_sync_skipped_when_offline() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Home");
    session.editor_mut().update_text(0, "[[Elsewhere]]")?;
    session.save().await?;
    fx.settle().await;

    fx.links.set_offline(true);
    let report = session.sync_links().await.unwrap();
    assert!(report.skipped);
    assert!(report.created.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_link_assist_uses_session_page() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let target = fx.create("Getting Started");
    target.save().await?;
    let session = fx.create("Getting Started Notes");
    session.save().await?;

    let mut assist = session.link_assist();
    assist.set_query("Getting");
    assert_eq!(assist.run_search(fx.pages.as_ref()).await, 1);
    assert_eq!(assist.suggestions()[0].title, "Getting Started");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_slow_link_sync_does_not_restore_removed_link() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Home");
    fx.links.push_delay(Duration::from_secs(1)).await;

    session.editor_mut().update_text(0, "see [[A]]")?;
    session.save().await?;
    session.editor_mut().update_text(0, "no links now")?;
    session.save().await?;
    let id = session.page_id().unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(fx.links.get_links_from_page(&id).await?.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_first_saves_create_one_page() -> anyhow::Result<()> {
    let fx = Fixture::new();
    let mut session = fx.create("Once");
    session.editor_mut().update_text(0, "body")?;
    fx.pages.push_delay(Duration::from_millis(200)).await;

    let (first, second) = tokio::join!(session.save(), session.save());
    assert!(matches!(first?, SaveOutcome::Saved { .. }));
    assert!(matches!(
        second?,
        SaveOutcome::Saved { .. } | SaveOutcome::UpToDate
    ));
    assert_eq!(fx.pages.len().await, 1);
    assert!(!session.is_dirty());
    Ok(())
}
