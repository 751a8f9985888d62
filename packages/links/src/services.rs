//! Collaborator interfaces for link storage and page search
//!
//! Implementations live outside this crate (an HTTP client, a database, or
//! the in-memory versions in `pagecraft-workspace`).

use async_trait::async_trait;
use pagecraft_blocks::Page;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure reported by an external collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// A directed link between two pages
///
/// Links are keyed by `(source_page_id, target_page_id)`; the target is the
/// link title as written in the `[[...]]` token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub source_page_id: String,
    pub target_page_id: String,

    #[serde(default)]
    pub link_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl PageLink {
    pub fn new(source: &str, target: &str, text: &str) -> Self {
        Self {
            id: None,
            source_page_id: source.to_string(),
            target_page_id: target.to_string(),
            link_text: text.to_string(),
            block_id: None,
            position: None,
        }
    }
}

/// Authoritative store of page links
#[async_trait]
pub trait LinkStorage: Send + Sync {
    /// Links originating from `page_id`
    async fn get_links_from_page(&self, page_id: &str) -> ServiceResult<Vec<PageLink>>;

    async fn create_link(&self, source: &str, target: &str, text: &str) -> ServiceResult<PageLink>;

    async fn remove_link(&self, source: &str, target: &str) -> ServiceResult<()>;

    /// Links pointing at `page_id`
    async fn get_backlinks(&self, page_id: &str) -> ServiceResult<Vec<PageLink>>;
}

/// Title search over pages
#[async_trait]
pub trait PageSearch: Send + Sync {
    async fn search_pages(&self, query: &str) -> ServiceResult<Vec<Page>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_link_wire_shape() {
        let link = PageLink::new("page-1", "Getting Started", "Getting Started");
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["sourcePageId"], "page-1");
        assert_eq!(json["targetPageId"], "Getting Started");
        assert!(json.get("blockId").is_none());

        let parsed: PageLink = serde_json::from_value(serde_json::json!({
            "sourcePageId": "a",
            "targetPageId": "b"
        }))
        .unwrap();
        assert_eq!(parsed.link_text, "");
    }
}
