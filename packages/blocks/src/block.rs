//! # Blocks
//!
//! The unit of document content. A block owns its inline segments and its
//! nested children; `parent_id` is a non-owning back reference kept in sync by
//! the editor.
//!
//! Type-specific metadata lives on [`BlockKind`] so that, for example,
//! `checked` only exists on to-do blocks and the table grid only on tables.
//!
//! Blocks are values: every operation here returns a new block and leaves the
//! input untouched.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{BlockError, BlockResult};
use crate::id_generator::BlockId;
use crate::segment::{self, TextFormat, TextSegment};

/// Default language for new code blocks
pub const DEFAULT_CODE_LANGUAGE: &str = "javascript";

/// Default callout decoration
pub const DEFAULT_CALLOUT_ICON: &str = "💡";
pub const DEFAULT_CALLOUT_COLOR: &str = "blue";

/// Fieldless block type tag
///
/// Parsing is ASCII case-insensitive and accepts the legacy names
/// `heading`, `bulleted` and `numbered`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum BlockType {
    #[serde(rename = "paragraph")]
    #[strum(to_string = "paragraph")]
    Paragraph,

    #[serde(rename = "heading1", alias = "heading")]
    #[strum(to_string = "heading1", serialize = "heading")]
    Heading1,

    #[serde(rename = "heading2")]
    #[strum(to_string = "heading2")]
    Heading2,

    #[serde(rename = "heading3")]
    #[strum(to_string = "heading3")]
    Heading3,

    #[serde(rename = "bulleted_list", alias = "bulleted")]
    #[strum(to_string = "bulleted_list", serialize = "bulleted")]
    BulletedList,

    #[serde(rename = "numbered_list", alias = "numbered")]
    #[strum(to_string = "numbered_list", serialize = "numbered")]
    NumberedList,

    #[serde(rename = "todo")]
    #[strum(to_string = "todo")]
    Todo,

    #[serde(rename = "quote")]
    #[strum(to_string = "quote")]
    Quote,

    #[serde(rename = "code")]
    #[strum(to_string = "code")]
    Code,

    #[serde(rename = "callout")]
    #[strum(to_string = "callout")]
    Callout,

    #[serde(rename = "toggle")]
    #[strum(to_string = "toggle")]
    Toggle,

    #[serde(rename = "table")]
    #[strum(to_string = "table")]
    Table,

    #[serde(rename = "image")]
    #[strum(to_string = "image")]
    Image,

    #[serde(rename = "embed")]
    #[strum(to_string = "embed")]
    Embed,

    #[serde(rename = "divider")]
    #[strum(to_string = "divider")]
    Divider,
}

impl BlockType {
    /// Types whose content is edited as free text
    pub fn is_text(self) -> bool {
        !matches!(
            self,
            BlockType::Table | BlockType::Image | BlockType::Embed | BlockType::Divider
        )
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Block type plus the metadata meaningful for that type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedList,
    NumberedList,
    Todo {
        #[serde(default)]
        checked: bool,
    },
    Quote,
    Code {
        #[serde(default = "default_language")]
        language: String,
    },
    Callout {
        #[serde(default = "default_callout_icon")]
        icon: String,
        #[serde(default = "default_callout_color")]
        color: String,
    },
    Toggle {
        #[serde(default)]
        collapsed: bool,
    },
    Table {
        #[serde(rename = "tableData", default = "default_table")]
        rows: Vec<Vec<String>>,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        caption: String,
    },
    Embed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Divider,
}

fn default_language() -> String {
    DEFAULT_CODE_LANGUAGE.to_string()
}

fn default_callout_icon() -> String {
    DEFAULT_CALLOUT_ICON.to_string()
}

fn default_callout_color() -> String {
    DEFAULT_CALLOUT_COLOR.to_string()
}

fn default_table() -> Vec<Vec<String>> {
    vec![vec![String::new(); 2]; 2]
}

impl BlockKind {
    /// Metadata a freshly created block of `block_type` starts with
    pub fn default_for(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Paragraph => BlockKind::Paragraph,
            BlockType::Heading1 => BlockKind::Heading1,
            BlockType::Heading2 => BlockKind::Heading2,
            BlockType::Heading3 => BlockKind::Heading3,
            BlockType::BulletedList => BlockKind::BulletedList,
            BlockType::NumberedList => BlockKind::NumberedList,
            BlockType::Todo => BlockKind::Todo { checked: false },
            BlockType::Quote => BlockKind::Quote,
            BlockType::Code => BlockKind::Code {
                language: default_language(),
            },
            BlockType::Callout => BlockKind::Callout {
                icon: default_callout_icon(),
                color: default_callout_color(),
            },
            BlockType::Toggle => BlockKind::Toggle { collapsed: false },
            BlockType::Table => BlockKind::Table {
                rows: default_table(),
            },
            BlockType::Image => BlockKind::Image {
                url: None,
                caption: String::new(),
            },
            BlockType::Embed => BlockKind::Embed { url: None },
            BlockType::Divider => BlockKind::Divider,
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            BlockKind::Paragraph => BlockType::Paragraph,
            BlockKind::Heading1 => BlockType::Heading1,
            BlockKind::Heading2 => BlockType::Heading2,
            BlockKind::Heading3 => BlockType::Heading3,
            BlockKind::BulletedList => BlockType::BulletedList,
            BlockKind::NumberedList => BlockType::NumberedList,
            BlockKind::Todo { .. } => BlockType::Todo,
            BlockKind::Quote => BlockType::Quote,
            BlockKind::Code { .. } => BlockType::Code,
            BlockKind::Callout { .. } => BlockType::Callout,
            BlockKind::Toggle { .. } => BlockType::Toggle,
            BlockKind::Table { .. } => BlockType::Table,
            BlockKind::Image { .. } => BlockType::Image,
            BlockKind::Embed { .. } => BlockType::Embed,
            BlockKind::Divider => BlockType::Divider,
        }
    }

    /// `checked` for to-do blocks, `None` for everything else
    pub fn checked(&self) -> Option<bool> {
        match self {
            BlockKind::Todo { checked } => Some(*checked),
            _ => None,
        }
    }
}

impl Default for BlockKind {
    fn default() -> Self {
        BlockKind::Paragraph
    }
}

/// A single unit of document content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,

    #[serde(flatten)]
    pub kind: BlockKind,

    /// Inline content; plain-string content from older documents is accepted
    #[serde(default, deserialize_with = "deserialize_content")]
    pub content: Vec<TextSegment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BlockId>,

    /// Position hint among siblings
    #[serde(default)]
    pub order: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Segments(Vec<TextSegment>),
}

fn deserialize_content<'de, D>(deserializer: D) -> Result<Vec<TextSegment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawContent>::deserialize(deserializer)?;
    Ok(match raw {
        None => Vec::new(),
        Some(RawContent::Text(text)) => segment::normalize(vec![TextSegment::plain(text)]),
        Some(RawContent::Segments(segments)) => segments,
    })
}

/// Create a block of `block_type` holding `text` as a single segment
///
/// A fresh id is generated when `id` is `None`.
pub fn create_block(block_type: BlockType, text: &str, id: Option<BlockId>) -> Block {
    let block = Block {
        id: id.unwrap_or_else(|| BlockId::generate(block_type)),
        kind: BlockKind::default_for(block_type),
        content: vec![TextSegment::plain(text)],
        children: Vec::new(),
        parent_id: None,
        order: 0.0,
    };
    tracing::trace!(id = %block.id, %block_type, "created block");
    block
}

/// Concatenated plain text of a block
pub fn get_block_text(block: &Block) -> String {
    segment::plain_text(&block.content)
}

/// Replace all of a block's text with one unformatted segment
pub fn set_block_text(block: &Block, text: &str) -> Block {
    Block {
        content: vec![TextSegment::plain(text)],
        ..block.clone()
    }
}

/// Apply `format` to the characters in `[start, end)`
pub fn apply_formatting(block: &Block, start: usize, end: usize, format: &TextFormat) -> Block {
    Block {
        content: segment::format_range(&block.content, start, end, format),
        ..block.clone()
    }
}

impl Block {
    pub fn new(block_type: BlockType, text: &str) -> Self {
        create_block(block_type, text, None)
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    pub fn text(&self) -> String {
        get_block_text(self)
    }

    pub fn text_len(&self) -> usize {
        segment::char_len(&self.content)
    }

    /// True when the block's text is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.content.iter().all(|s| s.text.trim().is_empty())
    }

    pub fn with_text(&self, text: &str) -> Block {
        set_block_text(self, text)
    }

    pub fn formatted(&self, start: usize, end: usize, format: &TextFormat) -> Block {
        apply_formatting(self, start, end, format)
    }

    /// Rebuild as `new_type`, keeping id, content and children
    ///
    /// Metadata survives only when the type does not change.
    pub fn convert_to(&self, new_type: BlockType) -> Block {
        if self.block_type() == new_type {
            return self.clone();
        }
        Block {
            kind: BlockKind::default_for(new_type),
            ..self.clone()
        }
    }

    /// Split at a character offset into `(head, tail)`
    ///
    /// The head keeps this block's id, metadata and children; the tail is a
    /// new block of the same type with default metadata.
    pub fn split_at(&self, offset: usize) -> (Block, Block) {
        let (before, after) = segment::split_segments(&self.content, offset);
        let head = Block {
            content: before,
            ..self.clone()
        };
        let mut tail = create_block(self.block_type(), "", None);
        tail.content = after;
        tail.parent_id = self.parent_id.clone();
        (head, tail)
    }

    /// Deep copy with fresh ids for this block and every descendant
    pub fn duplicate(&self) -> Block {
        let id = BlockId::generate(self.block_type());
        let children = self
            .children
            .iter()
            .map(|child| {
                let mut copy = child.duplicate();
                copy.parent_id = Some(id.clone());
                copy
            })
            .collect();
        Block {
            id,
            children,
            ..self.clone()
        }
    }

    /// Find this block or a descendant by id
    pub fn find(&self, id: &BlockId) -> Option<&Block> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// True if `id` is this block or one of its descendants
    pub fn contains(&self, id: &BlockId) -> bool {
        self.find(id).is_some()
    }

    /// This block followed by all descendants, depth first
    pub fn walk(&self) -> Vec<&Block> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }

    pub fn set_todo_checked(&self, checked: bool) -> BlockResult<Block> {
        match self.kind {
            BlockKind::Todo { .. } => Ok(Block {
                kind: BlockKind::Todo { checked },
                ..self.clone()
            }),
            _ => Err(BlockError::wrong_kind("todo", self.block_type())),
        }
    }

    pub fn toggle_collapsed(&self) -> BlockResult<Block> {
        match self.kind {
            BlockKind::Toggle { collapsed } => Ok(Block {
                kind: BlockKind::Toggle {
                    collapsed: !collapsed,
                },
                ..self.clone()
            }),
            _ => Err(BlockError::wrong_kind("toggle", self.block_type())),
        }
    }

    pub fn set_code_language(&self, language: &str) -> BlockResult<Block> {
        match self.kind {
            BlockKind::Code { .. } => Ok(Block {
                kind: BlockKind::Code {
                    language: language.to_string(),
                },
                ..self.clone()
            }),
            _ => Err(BlockError::wrong_kind("code", self.block_type())),
        }
    }

    /// Set (or clear) the url of an image or embed block
    ///
    /// Only `http`/`https` urls are accepted.
    pub fn set_image_url(&self, url: Option<&str>) -> BlockResult<Block> {
        if let Some(url) = url {
            if !url.starts_with("http") {
                return Err(BlockError::InvalidUrl(url.to_string()));
            }
        }
        let url = url.map(str::to_string);
        let kind = match &self.kind {
            BlockKind::Image { caption, .. } => BlockKind::Image {
                url,
                caption: caption.clone(),
            },
            BlockKind::Embed { .. } => BlockKind::Embed { url },
            _ => return Err(BlockError::wrong_kind("image or embed", self.block_type())),
        };
        Ok(Block {
            kind,
            ..self.clone()
        })
    }

    fn table_rows(&self) -> BlockResult<&Vec<Vec<String>>> {
        match &self.kind {
            BlockKind::Table { rows } => Ok(rows),
            _ => Err(BlockError::wrong_kind("table", self.block_type())),
        }
    }

    fn with_table(&self, rows: Vec<Vec<String>>) -> Block {
        Block {
            kind: BlockKind::Table { rows },
            ..self.clone()
        }
    }

    pub fn set_table_cell(&self, row: usize, column: usize, value: &str) -> BlockResult<Block> {
        let mut rows = self.table_rows()?.clone();
        let cell = rows
            .get_mut(row)
            .and_then(|r| r.get_mut(column))
            .ok_or_else(|| BlockError::cell_out_of_range(row, column))?;
        *cell = value.to_string();
        Ok(self.with_table(rows))
    }

    pub fn add_table_row(&self) -> BlockResult<Block> {
        let mut rows = self.table_rows()?.clone();
        let width = rows.first().map(Vec::len).unwrap_or(1);
        rows.push(vec![String::new(); width]);
        Ok(self.with_table(rows))
    }

    pub fn add_table_column(&self) -> BlockResult<Block> {
        let mut rows = self.table_rows()?.clone();
        if rows.is_empty() {
            rows.push(Vec::new());
        }
        for row in &mut rows {
            row.push(String::new());
        }
        Ok(self.with_table(rows))
    }

    pub fn remove_table_row(&self, row: usize) -> BlockResult<Block> {
        let mut rows = self.table_rows()?.clone();
        if row >= rows.len() {
            return Err(BlockError::cell_out_of_range(row, 0));
        }
        if rows.len() == 1 {
            return Err(BlockError::LastTableLine("row"));
        }
        rows.remove(row);
        Ok(self.with_table(rows))
    }

    pub fn remove_table_column(&self, column: usize) -> BlockResult<Block> {
        let mut rows = self.table_rows()?.clone();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if column >= width {
            return Err(BlockError::cell_out_of_range(0, column));
        }
        if width == 1 {
            return Err(BlockError::LastTableLine("column"));
        }
        for row in &mut rows {
            if column < row.len() {
                row.remove(column);
            }
        }
        Ok(self.with_table(rows))
    }
}
