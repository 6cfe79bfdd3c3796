use crossterm::event::KeyEvent;
use tui_textarea::TextArea;

use crate::core::{EditorMode, NoteRef};

/// Full-screen editor over one note. Holds its own copy of the content and
/// the last saved text for change detection.
pub struct NoteEditor {
    note: NoteRef,
    textarea: TextArea<'static>,
    saved: String,
    mode: EditorMode,
    scroll: u16,
}

impl NoteEditor {
    /// Opens in preview mode. Line endings are normalized to `\n`.
    pub fn open(note: NoteRef, content: String) -> Self {
        let content = if content.contains('\r') {
            content.replace("\r\n", "\n")
        } else {
            content
        };
        Self {
            note,
            textarea: textarea_for(&content),
            saved: content,
            mode: EditorMode::Preview,
            scroll: 0,
        }
    }

    pub fn note(&self) -> &NoteRef {
        &self.note
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn content(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn is_dirty(&self) -> bool {
        self.content() != self.saved
    }

    pub fn enter_source(&mut self) {
        self.mode = EditorMode::Source;
    }

    pub fn enter_preview(&mut self) {
        self.mode = EditorMode::Preview;
    }

    pub fn mark_saved(&mut self) {
        self.saved = self.content();
    }

    /// Drops unsaved edits and returns to preview.
    pub fn discard(&mut self) {
        self.textarea = textarea_for(&self.saved);
        self.mode = EditorMode::Preview;
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let max = u16::try_from(self.textarea.lines().len().saturating_sub(1)).unwrap_or(u16::MAX);
        let next = i32::from(self.scroll).saturating_add(delta).clamp(0, i32::from(max));
        self.scroll = u16::try_from(next).unwrap_or(0);
    }

    /// Text keys only reach the buffer in source mode.
    pub fn input(&mut self, key: KeyEvent) {
        if self.mode == EditorMode::Source {
            self.textarea.input(key);
        }
    }
}

fn textarea_for(content: &str) -> TextArea<'static> {
    TextArea::new(content.split('\n').map(str::to_string).collect())
}
