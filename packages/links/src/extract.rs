//! `[[Title]]` link token scanning

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use pagecraft_blocks::Block;
use regex::Regex;

/// Maximum number of characters between the brackets
pub const MAX_LINK_TEXT: usize = 100;

static LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]]{1,100})\]\]").expect("link pattern is valid"));

/// Link titles in `text`, trimmed and de-duplicated in order of first appearance
///
/// Titles are case-sensitive; tokens that are blank after trimming are skipped.
pub fn extract_page_links(text: &str) -> Vec<String> {
    let mut titles = IndexSet::new();
    for captures in LINK_REGEX.captures_iter(text) {
        let Some(inner) = captures.get(1) else {
            continue;
        };
        let title = inner.as_str().trim();
        if !title.is_empty() {
            titles.insert(title.to_string());
        }
    }
    titles.into_iter().collect()
}

/// Union of link titles over a block tree, children included
pub fn extract_links_from_blocks(blocks: &[Block]) -> IndexSet<String> {
    let mut titles = IndexSet::new();
    for block in blocks.iter().flat_map(Block::walk) {
        titles.extend(extract_page_links(&block.text()));
    }
    titles
}
