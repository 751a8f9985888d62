//! Page persistence collaborator

use async_trait::async_trait;
use pagecraft_blocks::Page;
use pagecraft_links::ServiceResult;

/// Where pages are stored
///
/// `create_page` assigns the page id; both `create_page` and `update_page`
/// return the page as stored, including ids the store assigned to blocks.
#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn get_page(&self, id: &str) -> ServiceResult<Page>;

    async fn create_page(&self, page: Page) -> ServiceResult<Page>;

    async fn update_page(&self, id: &str, page: Page) -> ServiceResult<Page>;
}
