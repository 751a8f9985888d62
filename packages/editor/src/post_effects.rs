//! # Post-Effect System
//!
//! Mutations can leave the document in a shape that is valid for the
//! mutation but not for the editor as a whole. Post-effects run after every
//! mutation, inside the same store transition, and restore those invariants:
//!
//! - Deleting the last block → insert a fresh empty paragraph
//! - Moving blocks through the tree → recompute `parent_id` and `order`
//!
//! Post-effects are:
//! - **Deterministic**: Same state always produces the same repair
//! - **Idempotent**: Running an effect twice changes nothing the second time
//! - **Silent**: They never fail; a mutation that validated stays applied

use pagecraft_blocks::{Block, BlockId, BlockType};

use crate::document::EditorState;
use crate::mutations::Mutation;

/// Repair step run after a mutation
pub trait PostEffect: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Repair `state` after `mutation`; returns whether anything changed
    fn apply(&self, mutation: &Mutation, state: &mut EditorState) -> bool;
}

/// Keep at least one block in the document
#[derive(Debug)]
pub struct EnsureDocumentNotEmpty;

impl PostEffect for EnsureDocumentNotEmpty {
    fn name(&self) -> &'static str {
        "ensure_document_not_empty"
    }

    fn apply(&self, _mutation: &Mutation, state: &mut EditorState) -> bool {
        if !state.blocks.is_empty() {
            return false;
        }
        state.blocks.push(Block::new(BlockType::Paragraph, ""));
        state.focused_block_index = Some(0);
        state.selected_blocks.clear();
        true
    }
}

/// Recompute `parent_id` back references and `order` hints
#[derive(Debug)]
pub struct SyncParentLinks;

impl SyncParentLinks {
    fn sync(blocks: &mut [Block], parent: Option<&BlockId>) -> bool {
        let mut changed = false;
        for (index, block) in blocks.iter_mut().enumerate() {
            if block.parent_id.as_ref() != parent {
                block.parent_id = parent.cloned();
                changed = true;
            }
            let order = index as f64;
            if block.order != order {
                block.order = order;
                changed = true;
            }
            let id = block.id.clone();
            changed |= Self::sync(&mut block.children, Some(&id));
        }
        changed
    }
}

impl PostEffect for SyncParentLinks {
    fn name(&self) -> &'static str {
        "sync_parent_links"
    }

    fn apply(&self, _mutation: &Mutation, state: &mut EditorState) -> bool {
        Self::sync(&mut state.blocks, None)
    }
}

/// Post-effect engine that runs all registered effects in order
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(EnsureDocumentNotEmpty), Box::new(SyncParentLinks)],
        }
    }

    /// Engine with no effects
    pub fn empty() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: impl PostEffect + 'static) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    /// Run every effect; returns the names of those that changed the state
    pub fn run(&self, mutation: &Mutation, state: &mut EditorState) -> Vec<&'static str> {
        let mut applied = Vec::new();
        for effect in &self.effects {
            if effect.apply(mutation, state) {
                tracing::trace!(effect = effect.name(), "post-effect applied");
                applied.push(effect.name());
            }
        }
        applied
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_effect_engine_creation() {
        let engine = PostEffectEngine::new();
        assert_eq!(engine.effects.len(), 2);
    }

    #[test]
    fn test_empty_document_gets_a_paragraph() {
        let engine = PostEffectEngine::new();
        let mut state = EditorState::default();

        let applied = engine.run(&Mutation::DeleteBlock { index: 0 }, &mut state);

        assert!(applied.contains(&"ensure_document_not_empty"));
        assert_eq!(state.blocks.len(), 1);
        assert_eq!(state.blocks[0].block_type(), BlockType::Paragraph);
        assert_eq!(state.blocks[0].text(), "");
        assert_eq!(state.focused_block_index, Some(0));
    }

    #[test]
    fn test_parent_links_are_synced() {
        let mut parent = Block::new(BlockType::Toggle, "parent");
        parent.children.push(Block::new(BlockType::Paragraph, "stale child"));
        let mut state = EditorState::with_blocks(vec![Block::new(BlockType::Paragraph, "x"), parent]);
        state.blocks[0].parent_id = Some(BlockId::from("ghost"));

        let effect = SyncParentLinks;
        let mutation = Mutation::MoveBlock { from: 0, to: 1 };
        assert!(effect.apply(&mutation, &mut state));

        assert_eq!(state.blocks[0].parent_id, None);
        assert_eq!(state.blocks[1].order, 1.0);
        assert_eq!(state.blocks[1].children[0].parent_id, Some(state.blocks[1].id.clone()));

        // Second run is a no-op
        assert!(!effect.apply(&mutation, &mut state));
    }

    #[test]
    fn test_effects_leave_valid_state_alone() {
        let engine = PostEffectEngine::new();
        let mut state = EditorState::with_blocks(vec![Block::new(BlockType::Paragraph, "ok")]);
        let applied = engine.run(&Mutation::UpdateText { index: 0, content: "ok".into() }, &mut state);
        assert!(applied.is_empty());
    }
}
