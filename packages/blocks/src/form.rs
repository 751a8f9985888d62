//! Form adapter: one editable group of controls per block.
//!
//! Round-trips id, type, text and `checked`. Inline formatting and other kind
//! metadata are not editable through a form.

use crate::block::{create_block, Block, BlockKind, BlockType};
use crate::id_generator::BlockId;

/// A single form value that remembers what it started as
#[derive(Debug, Clone, PartialEq)]
pub struct FormControl<T> {
    value: T,
    initial: T,
}

impl<T: Clone + PartialEq> FormControl<T> {
    pub fn new(value: T) -> Self {
        Self {
            initial: value.clone(),
            value,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    pub fn is_dirty(&self) -> bool {
        self.value != self.initial
    }

    pub fn reset(&mut self) {
        self.value = self.initial.clone();
    }
}

/// Controls for one block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockFormGroup {
    pub id: FormControl<BlockId>,
    pub block_type: FormControl<BlockType>,
    pub content: FormControl<String>,
    pub checked: FormControl<bool>,
}

impl BlockFormGroup {
    pub fn from_block(block: &Block) -> Self {
        Self {
            id: FormControl::new(block.id.clone()),
            block_type: FormControl::new(block.block_type()),
            content: FormControl::new(block.text()),
            checked: FormControl::new(block.kind.checked().unwrap_or(false)),
        }
    }

    pub fn to_block(&self) -> Block {
        let block_type = *self.block_type.value();
        let mut block = create_block(
            block_type,
            self.content.value(),
            Some(self.id.value().clone()),
        );
        if block_type == BlockType::Todo {
            block.kind = BlockKind::Todo {
                checked: *self.checked.value(),
            };
        }
        block
    }

    pub fn is_dirty(&self) -> bool {
        self.id.is_dirty()
            || self.block_type.is_dirty()
            || self.content.is_dirty()
            || self.checked.is_dirty()
    }

    pub fn reset(&mut self) {
        self.id.reset();
        self.block_type.reset();
        self.content.reset();
        self.checked.reset();
    }
}

/// Ordered array of block groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlocksForm {
    groups: Vec<BlockFormGroup>,
}

impl BlocksForm {
    pub fn build_array(blocks: &[Block]) -> Self {
        Self {
            groups: blocks.iter().map(BlockFormGroup::from_block).collect(),
        }
    }

    pub fn to_blocks(&self) -> Vec<Block> {
        self.groups.iter().map(BlockFormGroup::to_block).collect()
    }

    pub fn groups(&self) -> &[BlockFormGroup] {
        &self.groups
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut BlockFormGroup> {
        self.groups.get_mut(index)
    }

    pub fn push(&mut self, block: &Block) {
        self.groups.push(BlockFormGroup::from_block(block));
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.groups.iter().any(BlockFormGroup::is_dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_round_trip() {
        let blocks = vec![
            Block::new(BlockType::Heading1, "Plan"),
            Block::new(BlockType::Todo, "first").set_todo_checked(true).unwrap(),
            Block::new(BlockType::Todo, "second"),
        ];

        let back = BlocksForm::build_array(&blocks).to_blocks();
        assert_eq!(back.len(), 3);
        for (original, restored) in blocks.iter().zip(&back) {
            assert_eq!(restored.id, original.id);
            assert_eq!(restored.block_type(), original.block_type());
            assert_eq!(restored.text(), original.text());
            assert_eq!(restored.kind.checked(), original.kind.checked());
        }
    }

    #[test]
    fn test_dirty_tracking_and_reset() {
        let mut form = BlocksForm::build_array(&[Block::new(BlockType::Todo, "task")]);
        assert!(!form.is_dirty());

        let group = form.group_mut(0).unwrap();
        group.checked.set_value(true);
        group.content.set_value("task, edited".into());
        assert!(form.is_dirty());
        assert_eq!(form.to_blocks()[0].kind.checked(), Some(true));

        form.group_mut(0).unwrap().reset();
        assert!(!form.is_dirty());
        assert_eq!(form.to_blocks()[0].text(), "task");
    }

    #[test]
    fn test_checked_ignored_for_other_types() {
        let mut group = BlockFormGroup::from_block(&Block::new(BlockType::Paragraph, "p"));
        group.checked.set_value(true);
        assert_eq!(group.to_block().kind, BlockKind::Paragraph);
    }
}
