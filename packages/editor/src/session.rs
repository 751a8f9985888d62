//! # Edit Session
//!
//! Keyboard-driven editing for one user.
//!
//! An `EditSession` wraps a [`BlockEditor`] with the state a keyboard needs
//! on top of the document: a character cursor inside the focused block and
//! the slash command menu. Every key maps to at most a couple of mutations.
//!
//! | Key                    | Effect                                              |
//! |------------------------|-----------------------------------------------------|
//! | character              | insert at cursor (consecutive typing = one undo)    |
//! | `Enter`                | split at cursor, or new paragraph at end of block   |
//! | `Shift+Enter`          | newline inside the block                            |
//! | `Backspace`            | delete previous char; on an empty block delete it   |
//! | `Tab` / `Shift+Tab`    | indent / outdent                                    |
//! | arrows                 | move focus (up/down) or cursor (left/right)         |
//! | `/` at line start      | open the command menu                               |
//! | `Ctrl/Cmd+Z`, `+Y`     | undo, redo (`Shift+Z` also redoes)                  |
//! | `Ctrl/Cmd+C/X/V/A`     | copy, cut, paste, select all                        |
//! | `Delete`               | remove selected blocks                              |

use std::sync::Arc;

use pagecraft_blocks::{BlockId, BlockType};

use crate::document::{EditorState, FocusDirection};
use crate::errors::{EditorError, EditorResult};
use crate::mutations::Mutation;
use crate::pipeline::BlockEditor;
use crate::slash_menu::{SlashMenu, SlashMenuItem};

/// Keys the session understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn shift(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn command(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn command_shift(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                shift: true,
                meta: false,
            },
        }
    }
}

impl From<Key> for KeyEvent {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

/// Slash command position in `text` for a cursor, with the query after it
///
/// The current line (up to the cursor) must start with `/` and the query may
/// not contain whitespace.
pub(crate) fn slash_query(text: &str, cursor: usize) -> Option<(usize, String)> {
    let prefix: Vec<char> = text.chars().take(cursor).collect();
    let line_start = prefix
        .iter()
        .rposition(|&c| c == '\n')
        .map_or(0, |i| i + 1);
    if prefix.get(line_start) != Some(&'/') {
        return None;
    }
    let query: String = prefix[line_start + 1..].iter().collect();
    if query.chars().any(char::is_whitespace) {
        return None;
    }
    Some((line_start, query))
}

/// Single-user keyboard session over a block editor
#[derive(Debug)]
pub struct EditSession {
    editor: BlockEditor,

    /// Character offset inside the focused block
    cursor: usize,

    menu: Option<SlashMenu>,

    /// Block and slash offset the user closed the menu for
    dismissed_slash: Option<(BlockId, usize)>,

    /// Inside a run of consecutive text edits
    typing: bool,
}

impl EditSession {
    pub fn new(mut editor: BlockEditor) -> Self {
        if editor.state().focused_block_index.is_none() && !editor.state().blocks.is_empty() {
            editor.store_mut().set_focused_block(Some(0));
        }
        Self {
            editor,
            cursor: 0,
            menu: None,
            dismissed_slash: None,
            typing: false,
        }
    }

    pub fn editor(&self) -> &BlockEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut BlockEditor {
        self.end_typing();
        &mut self.editor
    }

    pub fn into_editor(mut self) -> BlockEditor {
        self.end_typing();
        self.editor
    }

    pub fn state(&self) -> Arc<EditorState> {
        self.editor.state()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Open slash menu, if any
    pub fn menu(&self) -> Option<&SlashMenu> {
        self.menu.as_ref()
    }

    /// Focus a block with the cursor at its end
    pub fn focus(&mut self, index: usize) -> EditorResult<()> {
        let state = self.editor.state();
        let block = state
            .blocks
            .get(index)
            .ok_or_else(|| EditorError::out_of_bounds(index, state.blocks.len()))?;
        self.cursor = block.text_len();
        self.end_typing();
        self.close_menu();
        self.editor.store_mut().set_focused_block(Some(index));
        Ok(())
    }

    /// Move the cursor inside the focused block (clamped)
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.clamp_cursor();
    }

    pub fn close_menu(&mut self) {
        if let Some(menu) = self.menu.take() {
            self.dismissed_slash = self
                .state()
                .focused_block()
                .map(|block| (block.id.clone(), menu.slash_offset()));
            tracing::debug!("closed slash menu");
        }
    }

    /// Type a run of characters
    pub fn type_text(&mut self, text: &str) -> EditorResult<()> {
        for c in text.chars() {
            self.handle_key(KeyEvent::new(Key::Char(c)))?;
        }
        Ok(())
    }

    /// Commit the `index`-th visible menu item; false when no menu is open
    pub fn select_menu_item(&mut self, index: usize) -> EditorResult<bool> {
        let Some(item) = self.menu.as_ref().and_then(|m| m.item(index)) else {
            return Ok(false);
        };
        self.commit_menu_item(item)?;
        Ok(true)
    }

    /// Handle one key press; returns whether it did anything
    pub fn handle_key(&mut self, event: impl Into<KeyEvent>) -> EditorResult<bool> {
        let event = event.into();

        if event.modifiers.command() {
            self.end_typing();
            return self.handle_shortcut(event);
        }

        if self.menu.is_some() {
            if let Some(handled) = self.handle_menu_key(event)? {
                return Ok(handled);
            }
        }

        match event.key {
            Key::Char(c) => {
                self.insert_text(&c.to_string())?;
                Ok(true)
            }
            Key::Enter if event.modifiers.shift => {
                self.insert_text("\n")?;
                Ok(true)
            }
            Key::Enter => {
                self.end_typing();
                self.enter()
            }
            Key::Backspace => self.backspace(),
            Key::Delete => self.delete_forward(),
            Key::Tab => {
                self.end_typing();
                self.indent(event.modifiers.shift)
            }
            Key::Escape => {
                self.end_typing();
                if self.state().selected_blocks.is_empty() {
                    return Ok(false);
                }
                self.editor.store_mut().set_selected_blocks([]);
                Ok(true)
            }
            Key::ArrowUp | Key::ArrowDown => {
                self.end_typing();
                let direction = if event.key == Key::ArrowUp {
                    FocusDirection::Up
                } else {
                    FocusDirection::Down
                };
                self.editor.store_mut().move_focus(direction);
                self.clamp_cursor();
                Ok(true)
            }
            Key::ArrowLeft => {
                self.end_typing();
                self.cursor = self.cursor.saturating_sub(1);
                Ok(true)
            }
            Key::ArrowRight => {
                self.end_typing();
                self.cursor += 1;
                self.clamp_cursor();
                Ok(true)
            }
        }
    }

    /// Keys while the command menu is open; `None` falls through
    fn handle_menu_key(&mut self, event: KeyEvent) -> EditorResult<Option<bool>> {
        match event.key {
            Key::ArrowDown => {
                if let Some(menu) = &mut self.menu {
                    menu.highlight_next();
                }
                Ok(Some(true))
            }
            Key::ArrowUp => {
                if let Some(menu) = &mut self.menu {
                    menu.highlight_previous();
                }
                Ok(Some(true))
            }
            Key::Enter if !event.modifiers.shift => {
                match self.menu.as_ref().and_then(SlashMenu::highlighted) {
                    Some(item) => self.commit_menu_item(item)?,
                    None => self.close_menu(),
                }
                Ok(Some(true))
            }
            Key::Escape => {
                self.close_menu();
                Ok(Some(true))
            }
            Key::Char(_) | Key::Backspace | Key::Delete | Key::Enter => Ok(None),
            Key::Tab | Key::ArrowLeft | Key::ArrowRight => {
                self.close_menu();
                Ok(None)
            }
        }
    }

    fn handle_shortcut(&mut self, event: KeyEvent) -> EditorResult<bool> {
        let Key::Char(c) = event.key else {
            return Ok(false);
        };
        self.close_menu();

        match c.to_ascii_lowercase() {
            'z' if event.modifiers.shift => Ok(self.redo()),
            'z' => Ok(self.undo()),
            'y' => Ok(self.redo()),
            'a' => {
                self.editor.store_mut().select_all();
                Ok(true)
            }
            'c' => {
                let indices = self.target_indices();
                if indices.is_empty() {
                    return Ok(false);
                }
                self.editor.copy_blocks(&indices)?;
                Ok(true)
            }
            'x' => {
                let indices = self.target_indices();
                if indices.is_empty() {
                    return Ok(false);
                }
                self.editor.cut_blocks(indices)?;
                self.cursor = 0;
                Ok(true)
            }
            'v' => {
                let state = self.state();
                if state.clipboard.is_empty() {
                    tracing::debug!("paste with empty clipboard");
                    return Ok(false);
                }
                let index = state
                    .focused_block_index
                    .map_or(state.blocks.len(), |i| i + 1);
                self.editor.paste_blocks(index)?;
                self.cursor = 0;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn undo(&mut self) -> bool {
        let undone = self.editor.undo();
        self.clamp_cursor();
        undone
    }

    fn redo(&mut self) -> bool {
        let redone = self.editor.redo();
        self.clamp_cursor();
        redone
    }

    /// Selected blocks, or the focused block when nothing is selected
    fn target_indices(&self) -> Vec<usize> {
        let state = self.state();
        if state.selected_blocks.is_empty() {
            state.focused_block_index.into_iter().collect()
        } else {
            state.selected_blocks.iter().copied().collect()
        }
    }

    fn focused_index(&self) -> Option<usize> {
        self.state().focused_block_index
    }

    fn focused_len(&self) -> usize {
        self.state().focused_block().map_or(0, |b| b.text_len())
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.focused_len());
    }

    fn begin_typing(&mut self) {
        if !self.typing {
            self.editor.begin_batch();
            self.typing = true;
        }
    }

    fn end_typing(&mut self) {
        if self.typing {
            self.editor.end_batch();
            self.typing = false;
        }
    }

    fn insert_text(&mut self, text: &str) -> EditorResult<()> {
        let Some(index) = self.focused_index() else {
            return Ok(());
        };
        self.begin_typing();
        self.editor.apply(Mutation::InsertText {
            index,
            offset: self.cursor,
            text: text.to_string(),
        })?;
        self.cursor += text.chars().count();
        self.refresh_menu();
        Ok(())
    }

    /// Open, refilter or close the command menu from the text at the cursor
    fn refresh_menu(&mut self) {
        let state = self.state();
        let Some(block) = state.focused_block() else {
            self.menu = None;
            return;
        };

        match slash_query(&block.text(), self.cursor) {
            Some((offset, _))
                if self
                    .dismissed_slash
                    .as_ref()
                    .is_some_and(|(id, dismissed)| *id == block.id && *dismissed == offset) =>
            {
                self.menu = None;
            }
            Some((offset, query)) => {
                let reopen = self.menu.as_ref().map(SlashMenu::slash_offset) != Some(offset);
                if reopen {
                    self.menu = Some(SlashMenu::open(offset));
                    tracing::debug!(offset, "opened slash menu");
                }
                if let Some(menu) = &mut self.menu {
                    if menu.filter() != query && !menu.set_filter(&query) {
                        tracing::debug!(%query, "no slash commands match, closing menu");
                        self.menu = None;
                    }
                }
            }
            None => {
                self.menu = None;
                self.dismissed_slash = None;
            }
        }
    }

    /// Convert the focused block and clear its text, as one undo step
    fn commit_menu_item(&mut self, item: &SlashMenuItem) -> EditorResult<()> {
        self.end_typing();
        self.menu = None;
        self.dismissed_slash = None;

        let Some(index) = self.focused_index() else {
            return Ok(());
        };
        self.editor.apply_all(
            "Turn into",
            vec![
                Mutation::ConvertBlock {
                    index,
                    block_type: item.block_type,
                },
                Mutation::UpdateText {
                    index,
                    content: String::new(),
                },
            ],
        )?;
        self.cursor = 0;
        tracing::debug!(block_type = %item.block_type, "applied slash command");
        Ok(())
    }

    fn enter(&mut self) -> EditorResult<bool> {
        let Some(index) = self.focused_index() else {
            self.editor.insert_block(None, BlockType::Paragraph, "")?;
            self.cursor = 0;
            return Ok(true);
        };

        if self.cursor >= self.focused_len() {
            self.editor
                .insert_block(Some(index + 1), BlockType::Paragraph, "")?;
        } else {
            self.editor.split_block(index, self.cursor)?;
        }
        self.cursor = 0;
        Ok(true)
    }

    fn backspace(&mut self) -> EditorResult<bool> {
        let state = self.state();
        let Some(index) = state.focused_block_index else {
            return Ok(false);
        };
        let Some(block) = state.blocks.get(index) else {
            return Ok(false);
        };

        if self.cursor > 0 {
            self.begin_typing();
            self.editor.apply(Mutation::DeleteText {
                index,
                start: self.cursor - 1,
                end: self.cursor,
            })?;
            self.cursor -= 1;
            self.refresh_menu();
            return Ok(true);
        }

        self.end_typing();
        if block.text_len() > 0 {
            return Ok(false);
        }

        if state.blocks.len() == 1 {
            // The last block is never removed, only reset to a paragraph
            if block.block_type() == BlockType::Paragraph {
                return Ok(false);
            }
            self.editor.convert_block(0, BlockType::Paragraph)?;
            return Ok(true);
        }

        self.editor.delete_block(index)?;
        if let Some(previous) = index.checked_sub(1) {
            self.editor.store_mut().set_focused_block(Some(previous));
        }
        self.cursor = self.focused_len();
        Ok(true)
    }

    fn delete_forward(&mut self) -> EditorResult<bool> {
        let state = self.state();
        if !state.selected_blocks.is_empty() {
            self.end_typing();
            let indices = state.selected_blocks.iter().copied().collect();
            self.editor.delete_blocks(indices)?;
            self.cursor = 0;
            return Ok(true);
        }

        let Some(index) = state.focused_block_index else {
            return Ok(false);
        };
        if self.cursor >= self.focused_len() {
            return Ok(false);
        }
        self.begin_typing();
        self.editor.apply(Mutation::DeleteText {
            index,
            start: self.cursor,
            end: self.cursor + 1,
        })?;
        self.refresh_menu();
        Ok(true)
    }

    fn indent(&mut self, outdent: bool) -> EditorResult<bool> {
        let Some(block) = self.state().focused_block().cloned() else {
            return Ok(false);
        };
        let result = if outdent {
            self.editor.outdent(block.id.clone())
        } else {
            self.editor.indent(block.id.clone())
        };

        match result {
            Ok(_) => Ok(true),
            Err(
                e @ (EditorError::CannotIndent(_)
                | EditorError::CannotOutdent(_)
                | EditorError::CycleDetected),
            ) => {
                tracing::debug!(block = %block.id, error = %e, "ignored tab");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
