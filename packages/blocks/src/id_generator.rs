use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BlockType;

/// Prefix marking ids minted on the client that the backend has never seen
pub const CLIENT_ID_PREFIX: &str = "new_";

/// Opaque block identifier, unique within a document tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Generate a fresh id for a block of the given type
    ///
    /// Ids look like `todo_3f2a...` so they stay readable in logs.
    pub fn generate(block_type: BlockType) -> Self {
        Self(format!("{}_{}", block_type, Uuid::new_v4().simple()))
    }

    /// Generate an id flagged as not yet persisted
    pub fn generate_client(block_type: BlockType) -> Self {
        Self(format!(
            "{}{}_{}",
            CLIENT_ID_PREFIX,
            block_type,
            Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for ids that were minted locally and never saved
    pub fn is_client_only(&self) -> bool {
        self.0.starts_with(CLIENT_ID_PREFIX)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
