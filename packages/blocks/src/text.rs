//! Plain-text import and export.

use crate::block::{create_block, Block, BlockType};

/// One line per block, depth first
///
/// Text blocks contribute their text; the rest a `[type]` placeholder.
pub fn export_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .flat_map(Block::walk)
        .map(|block| {
            if block.block_type().is_text() {
                block.text()
            } else {
                format!("[{}]", block.block_type())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One paragraph per line
pub fn import_text(text: &str) -> Vec<Block> {
    text.lines()
        .enumerate()
        .map(|(index, line)| {
            let mut block = create_block(BlockType::Paragraph, line, None);
            block.order = index as f64;
            block
        })
        .collect()
}
