//! Single mutation tests against the editor state

use pagecraft_blocks::{Block, BlockKind, BlockType, TextFormat};
use pagecraft_editor::{BlockPatch, EditorError, EditorState, Mutation};

fn state_with(texts: &[&str]) -> EditorState {
    EditorState::with_blocks(
        texts
            .iter()
            .map(|t| Block::new(BlockType::Paragraph, t))
            .collect(),
    )
}

fn texts(state: &EditorState) -> Vec<String> {
    state.blocks.iter().map(Block::text).collect()
}

#[test]
fn test_insert_block_mutation() {
    let mut state = state_with(&["a", "c"]);

    Mutation::InsertBlock {
        index: Some(1),
        block_type: BlockType::Quote,
        content: "b".to_string(),
    }
    .apply(&mut state)
    .unwrap();

    assert_eq!(texts(&state), vec!["a", "b", "c"]);
    assert_eq!(state.blocks[1].block_type(), BlockType::Quote);
    assert_eq!(state.focused_block_index, Some(1));
}

#[test]
fn test_insert_block_appends_without_index() {
    let mut state = state_with(&["a"]);
    Mutation::InsertBlock {
        index: None,
        block_type: BlockType::Divider,
        content: String::new(),
    }
    .apply(&mut state)
    .unwrap();
    assert_eq!(state.blocks[1].block_type(), BlockType::Divider);
}

#[test]
fn test_insert_text_keeps_formatting() {
    let mut state = EditorState::with_blocks(vec![Block::new(BlockType::Paragraph, "Hello world")
        .formatted(0, 5, &TextFormat::bold())]);

    Mutation::InsertText {
        index: 0,
        offset: 5,
        text: "!!".to_string(),
    }
    .apply(&mut state)
    .unwrap();

    let block = &state.blocks[0];
    assert_eq!(block.text(), "Hello!! world");
    assert_eq!(block.content[0].text, "Hello!!");
    assert_eq!(block.content[0].format, Some(TextFormat::bold()));
}

#[test]
fn test_insert_text_past_end_is_rejected() {
    let mut state = state_with(&["abc"]);
    let err = Mutation::InsertText {
        index: 0,
        offset: 4,
        text: "x".to_string(),
    }
    .apply(&mut state)
    .unwrap_err();

    assert!(matches!(err, EditorError::InvalidOffset { offset: 4, len: 3 }));
    assert_eq!(texts(&state), vec!["abc"]);
}

#[test]
fn test_delete_text_mutation() {
    let mut state = state_with(&["abcdef"]);
    Mutation::DeleteText {
        index: 0,
        start: 1,
        end: 3,
    }
    .apply(&mut state)
    .unwrap();
    assert_eq!(texts(&state), vec!["adef"]);
}

#[test]
fn test_convert_block_keeps_id_and_text() {
    let mut state = state_with(&["Buy milk"]);
    let id = state.blocks[0].id.clone();

    Mutation::ConvertBlock {
        index: 0,
        block_type: BlockType::Todo,
    }
    .apply(&mut state)
    .unwrap();

    let block = &state.blocks[0];
    assert_eq!(block.id, id);
    assert_eq!(block.text(), "Buy milk");
    assert_eq!(block.kind, BlockKind::Todo { checked: false });
}

#[test]
fn test_update_block_patch_merges_metadata() {
    let mut state = EditorState::with_blocks(vec![Block::new(BlockType::Todo, "task")]);

    Mutation::UpdateBlock {
        index: 0,
        patch: BlockPatch::kind(BlockKind::Todo { checked: true }),
    }
    .apply(&mut state)
    .unwrap();

    assert_eq!(state.blocks[0].kind.checked(), Some(true));
    assert_eq!(state.blocks[0].text(), "task");
}

#[test]
fn test_merge_adjacent_blocks() {
    let mut state = state_with(&["first", "second", "third"]);
    Mutation::MergeBlocks {
        first: 0,
        second: 1,
    }
    .apply(&mut state)
    .unwrap();

    assert_eq!(texts(&state), vec!["first\nsecond", "third"]);
    assert_eq!(state.focused_block_index, Some(0));
}

#[test]
fn test_merge_non_adjacent_blocks_fails() {
    let mut state = state_with(&["a", "b", "c"]);
    let err = Mutation::MergeBlocks {
        first: 0,
        second: 2,
    }
    .apply(&mut state)
    .unwrap_err();

    assert!(matches!(
        err,
        EditorError::NonAdjacentMerge {
            first: 0,
            second: 2
        }
    ));
    assert_eq!(state.blocks.len(), 3);
}

#[test]
fn test_split_block_mutation() {
    let mut state = EditorState::with_blocks(vec![Block::new(BlockType::Heading2, "HelloWorld")]);
    let id = state.blocks[0].id.clone();

    Mutation::SplitBlock {
        index: 0,
        offset: 5,
    }
    .apply(&mut state)
    .unwrap();

    assert_eq!(texts(&state), vec!["Hello", "World"]);
    assert_eq!(state.blocks[0].id, id);
    assert_eq!(state.blocks[1].block_type(), BlockType::Heading2);
    assert_eq!(state.focused_block_index, Some(1));
}

#[test]
fn test_split_block_beyond_length_fails() {
    let mut state = state_with(&["abc"]);
    let err = Mutation::SplitBlock {
        index: 0,
        offset: 10,
    }
    .apply(&mut state)
    .unwrap_err();
    assert!(matches!(err, EditorError::InvalidOffset { .. }));
}

#[test]
fn test_move_block_mutation() {
    let mut state = state_with(&["a", "b", "c"]);
    Mutation::MoveBlock { from: 0, to: 2 }
        .apply(&mut state)
        .unwrap();
    assert_eq!(texts(&state), vec!["b", "c", "a"]);
    assert_eq!(state.focused_block_index, Some(2));
}

#[test]
fn test_out_of_range_index_is_rejected() {
    let mut state = state_with(&["only"]);
    for mutation in [
        Mutation::DeleteBlock { index: 1 },
        Mutation::DuplicateBlock { index: 3 },
        Mutation::UpdateText {
            index: 1,
            content: "x".to_string(),
        },
        Mutation::ConvertBlock {
            index: 9,
            block_type: BlockType::Quote,
        },
    ] {
        let err = mutation.apply(&mut state).unwrap_err();
        assert!(
            matches!(err, EditorError::IndexOutOfBounds { len: 1, .. }),
            "{mutation:?} gave {err:?}"
        );
    }
    assert_eq!(texts(&state), vec!["only"]);
}

#[test]
fn test_paste_with_empty_clipboard_fails() {
    let mut state = state_with(&["a"]);
    let err = Mutation::Paste { index: 1 }.apply(&mut state).unwrap_err();
    assert!(matches!(err, EditorError::EmptyClipboard));
}

#[test]
fn test_cut_then_paste_makes_fresh_ids() {
    let mut state = state_with(&["a", "b"]);
    let original = state.blocks[1].id.clone();

    Mutation::Cut { indices: vec![1] }.apply(&mut state).unwrap();
    Mutation::Paste { index: 0 }.apply(&mut state).unwrap();

    assert_eq!(texts(&state), vec!["b", "a"]);
    assert_ne!(state.blocks[0].id, original);
    assert_eq!(state.clipboard[0].id, original);
}

#[test]
fn test_mutations_serialize_with_op_tag() {
    let mutation = Mutation::SplitBlock {
        index: 2,
        offset: 4,
    };
    let json = serde_json::to_value(&mutation).unwrap();
    assert_eq!(json["op"], "split_block");

    let parsed: Mutation =
        serde_json::from_str(r#"{"op":"convert_block","index":0,"block_type":"heading1"}"#)
            .unwrap();
    assert_eq!(
        parsed,
        Mutation::ConvertBlock {
            index: 0,
            block_type: BlockType::Heading1
        }
    );
}
