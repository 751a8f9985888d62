//! # Slash Command Menu
//!
//! Typing `/` at the start of a line opens a menu of block types. The text
//! typed after the slash filters the menu; committing an item converts the
//! focused block.

use pagecraft_blocks::BlockType;

/// One entry of the command menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashMenuItem {
    pub label: &'static str,
    pub block_type: BlockType,
    pub icon: &'static str,
    pub shortcut: Option<&'static str>,
}

const fn item(
    label: &'static str,
    block_type: BlockType,
    icon: &'static str,
    shortcut: Option<&'static str>,
) -> SlashMenuItem {
    SlashMenuItem {
        label,
        block_type,
        icon,
        shortcut,
    }
}

/// Every block type the menu offers, in display order
pub const CATALOGUE: &[SlashMenuItem] = &[
    item("Text", BlockType::Paragraph, "T", None),
    item("Heading 1", BlockType::Heading1, "H1", Some("#")),
    item("Heading 2", BlockType::Heading2, "H2", Some("##")),
    item("Heading 3", BlockType::Heading3, "H3", Some("###")),
    item("Bulleted list", BlockType::BulletedList, "•", Some("-")),
    item("Numbered list", BlockType::NumberedList, "1.", Some("1.")),
    item("To-do list", BlockType::Todo, "☑", Some("[]")),
    item("Table", BlockType::Table, "▦", Some("table")),
    item("Image", BlockType::Image, "🖼", Some("img")),
    item("Quote", BlockType::Quote, "❝", Some(">")),
    item("Divider", BlockType::Divider, "―", Some("---")),
    item("Code", BlockType::Code, "</>", Some("```")),
    item("Callout", BlockType::Callout, "💡", None),
    item("Toggle", BlockType::Toggle, "▸", None),
    item("Embed", BlockType::Embed, "⧉", None),
];

impl SlashMenuItem {
    /// Case-insensitive match on label or type, or a shortcut containing the query
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.label.to_lowercase().contains(&query)
            || self.block_type.as_str().contains(&query)
            || self.shortcut.is_some_and(|s| s.contains(&query))
    }
}

/// Catalogue entries matching `query`, in catalogue order
pub fn filter_items(query: &str) -> Vec<&'static SlashMenuItem> {
    CATALOGUE.iter().filter(|item| item.matches(query)).collect()
}

/// Open menu state
#[derive(Debug, Clone, PartialEq)]
pub struct SlashMenu {
    /// Character offset of the `/` in the focused block
    slash_offset: usize,
    filter: String,
    items: Vec<&'static SlashMenuItem>,
    highlighted: usize,
}

impl SlashMenu {
    pub fn open(slash_offset: usize) -> Self {
        Self {
            slash_offset,
            filter: String::new(),
            items: filter_items(""),
            highlighted: 0,
        }
    }

    pub fn slash_offset(&self) -> usize {
        self.slash_offset
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn items(&self) -> &[&'static SlashMenuItem] {
        &self.items
    }

    /// Refilter; returns false when nothing matches
    pub fn set_filter(&mut self, filter: &str) -> bool {
        self.filter = filter.to_string();
        self.items = filter_items(filter);
        self.highlighted = 0;
        !self.items.is_empty()
    }

    pub fn highlighted_index(&self) -> usize {
        self.highlighted
    }

    pub fn highlighted(&self) -> Option<&'static SlashMenuItem> {
        self.items.get(self.highlighted).copied()
    }

    pub fn item(&self, index: usize) -> Option<&'static SlashMenuItem> {
        self.items.get(index).copied()
    }

    /// Move the highlight down, wrapping past the end
    pub fn highlight_next(&mut self) {
        if !self.items.is_empty() {
            self.highlighted = (self.highlighted + 1) % self.items.len();
        }
    }

    /// Move the highlight up, wrapping past the start
    pub fn highlight_previous(&mut self) {
        if !self.items.is_empty() {
            let len = self.items.len();
            self.highlighted = (self.highlighted + len - 1) % len;
        }
    }
}
