//! # Backend Wire Format
//!
//! The persistence service stores blocks as flat `{type, content}` records
//! with optional metadata. Conversion is lossless for id, type, text,
//! `checked`, kind metadata and children; inline formatting is flattened.
//!
//! Anything the backend sends that cannot be understood degrades to an empty
//! paragraph with a warning rather than failing the whole page.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::block::{create_block, Block, BlockKind, BlockType};
use crate::id_generator::BlockId;

/// Block as stored by the persistence service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub block_type: String,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,

    /// Kind-specific fields (language, icon, tableData, url, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BackendBlock>,
}

impl Default for BackendBlock {
    fn default() -> Self {
        Self {
            id: None,
            block_type: BlockType::Paragraph.to_string(),
            content: String::new(),
            checked: None,
            metadata: None,
            children: Vec::new(),
        }
    }
}

/// Page as exchanged with the persistence service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default)]
    pub blocks: Vec<BackendBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_page_id: Option<String>,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Convert an editor block (and its children) into the wire shape
///
/// Client-only ids are dropped so the backend assigns its own.
pub fn to_backend(block: &Block) -> BackendBlock {
    let id = (!block.id.is_client_only()).then(|| block.id.to_string());

    BackendBlock {
        id,
        block_type: block.block_type().to_string(),
        content: block.text(),
        checked: block.kind.checked(),
        metadata: kind_metadata(&block.kind),
        children: block.children.iter().map(to_backend).collect(),
    }
}

pub fn to_backend_blocks(blocks: &[Block]) -> Vec<BackendBlock> {
    blocks.iter().map(to_backend).collect()
}

/// Convert a wire block into an editor block
///
/// Unknown types become paragraphs. A to-do without an explicit `checked`
/// is considered checked when its content starts with `[x]`.
pub fn from_backend(backend: &BackendBlock) -> Block {
    let block_type = BlockType::from_str(&backend.block_type).unwrap_or_else(|_| {
        tracing::warn!(block_type = %backend.block_type, "unknown block type, using paragraph");
        BlockType::Paragraph
    });

    let id = backend.id.clone().map(BlockId::from);
    let mut block = create_block(block_type, &backend.content, id);
    block.kind = decode_kind(block_type, backend);
    block.children = backend
        .children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let mut child = from_backend(child);
            child.parent_id = Some(block.id.clone());
            child.order = index as f64;
            child
        })
        .collect();
    block
}

pub fn from_backend_blocks(blocks: &[BackendBlock]) -> Vec<Block> {
    blocks
        .iter()
        .enumerate()
        .map(|(index, b)| {
            let mut block = from_backend(b);
            block.order = index as f64;
            block
        })
        .collect()
}

/// Decode a raw JSON array of wire blocks
///
/// Elements that fail to parse become empty paragraphs; a non-array value
/// yields no blocks.
pub fn parse_backend_blocks(value: &Value) -> Vec<Block> {
    let Some(items) = value.as_array() else {
        tracing::warn!("backend blocks are not an array, ignoring");
        return Vec::new();
    };

    let backend: Vec<BackendBlock> = items
        .iter()
        .map(|item| {
            serde_json::from_value(item.clone()).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "malformed backend block, using empty paragraph");
                BackendBlock::default()
            })
        })
        .collect();

    from_backend_blocks(&backend)
}

fn kind_metadata(kind: &BlockKind) -> Option<Value> {
    let Ok(Value::Object(mut fields)) = serde_json::to_value(kind) else {
        return None;
    };
    fields.remove("type");
    fields.remove("checked");
    (!fields.is_empty()).then_some(Value::Object(fields))
}

fn decode_kind(block_type: BlockType, backend: &BackendBlock) -> BlockKind {
    let mut fields = match &backend.metadata {
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            tracing::warn!(metadata = %other, "block metadata is not an object, ignoring");
            Map::new()
        }
        None => Map::new(),
    };
    fields.insert("type".into(), Value::String(block_type.to_string()));

    if block_type == BlockType::Todo {
        let checked = backend.checked.unwrap_or_else(|| {
            backend.content.starts_with("[x]") || backend.content.starts_with("[X]")
        });
        fields.insert("checked".into(), Value::Bool(checked));
    }

    serde_json::from_value(Value::Object(fields)).unwrap_or_else(|e| {
        tracing::warn!(%block_type, error = %e, "invalid block metadata, using defaults");
        BlockKind::default_for(block_type)
    })
}
