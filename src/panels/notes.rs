use std::path::Path;

use crossterm::event::KeyEvent;
use tracing::info;
use tui_textarea::TextArea;

use crate::core::{Command, NoteRef, Selection, next_match};
use crate::io::{IoError, NoteRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesState {
    List,
    Create,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesOutcome {
    None,
    /// The user opened a note. The panel itself stays as it was.
    EditRequested { note: NoteRef, content: String },
}

pub struct NotesPanel {
    repo: Box<dyn NoteRepository>,
    notes: Vec<NoteRef>,
    selection: Selection,
    state: NotesState,
    input: TextArea<'static>,
}

impl NotesPanel {
    pub fn new(repo: Box<dyn NoteRepository>) -> Result<Self, IoError> {
        let notes = repo.list()?;
        Ok(Self {
            repo,
            notes,
            selection: Selection::default(),
            state: NotesState::List,
            input: TextArea::default(),
        })
    }

    pub fn notes(&self) -> &[NoteRef] {
        &self.notes
    }

    pub fn state(&self) -> NotesState {
        self.state
    }

    pub fn selected(&self) -> Option<usize> {
        self.selection.current(self.notes.len())
    }

    pub fn input(&self) -> &TextArea<'static> {
        &self.input
    }

    pub fn is_capturing(&self) -> bool {
        self.state == NotesState::Create
    }

    pub fn handle_text_key(&mut self, key: KeyEvent) {
        if self.is_capturing() {
            self.input.input(key);
        }
    }

    /// Re-reads the listing, keeping the selection on the same file when it
    /// still exists.
    pub fn reload(&mut self) -> Result<(), IoError> {
        let current = self.selected().map(|idx| self.notes[idx].path.clone());
        self.notes = self.repo.list()?;
        match current.and_then(|path| self.notes.iter().position(|n| n.path == path)) {
            Some(idx) => self.selection.select(idx, self.notes.len()),
            None => self.selection.clamp(self.notes.len()),
        }
        Ok(())
    }

    /// Saves editor content through the same repository the list reads.
    pub fn save_note(&mut self, path: &Path, content: &str) -> Result<(), IoError> {
        self.repo.write(path, content)?;
        self.reload()
    }

    pub fn jump_to(&mut self, c: char) {
        let from = self.selected().unwrap_or(0);
        if let Some(idx) = next_match(&self.notes, from, c) {
            self.selection.select(idx, self.notes.len());
        }
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<NotesOutcome, IoError> {
        match self.state {
            NotesState::List => self.handle_list_command(cmd),
            NotesState::Create => self.handle_create_command(cmd),
        }
    }

    fn handle_list_command(&mut self, cmd: Command) -> Result<NotesOutcome, IoError> {
        match cmd {
            Command::Add => {
                self.input = TextArea::default();
                self.input.set_placeholder_text("Note title");
                self.state = NotesState::Create;
            }
            Command::Confirm | Command::Open => {
                if let Some(idx) = self.selected() {
                    let note = self.notes[idx].clone();
                    let content = self.repo.read(&note)?;
                    return Ok(NotesOutcome::EditRequested { note, content });
                }
            }
            Command::Delete => {
                if let Some(idx) = self.selected() {
                    self.repo.delete(&self.notes[idx])?;
                    let removed = self.notes.remove(idx);
                    info!(path = %removed.path.display(), "deleted note");
                    self.selection.clamp(self.notes.len());
                }
            }
            Command::MoveUp => self.selection.move_up(),
            Command::MoveDown => self.selection.move_down(self.notes.len()),
            _ => {}
        }
        Ok(NotesOutcome::None)
    }

    fn handle_create_command(&mut self, cmd: Command) -> Result<NotesOutcome, IoError> {
        match cmd {
            Command::Confirm | Command::Save => {
                let title = self.input.lines().join(" ").trim().to_string();
                if title.is_empty() {
                    return Ok(NotesOutcome::None);
                }
                // Stay in create mode on failure so the title can be changed.
                let note = self.repo.create(&title)?;
                info!(path = %note.path.display(), "created note");
                self.notes.push(note);
                self.selection.select_last(self.notes.len());
                self.state = NotesState::List;
                self.input = TextArea::default();
            }
            Command::Cancel => {
                self.state = NotesState::List;
                self.input = TextArea::default();
            }
            _ => {}
        }
        Ok(NotesOutcome::None)
    }
}
