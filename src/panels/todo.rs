use std::path::PathBuf;

use crossterm::event::KeyEvent;
use tracing::warn;
use tui_textarea::{CursorMove, TextArea};

use crate::core::{Command, Selection, Task, next_match};
use crate::io::{IoError, load_tasks, save_tasks};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoState {
    Default,
    Adding,
    Editing,
}

pub struct TodoPanel {
    tasks: Vec<Task>,
    selection: Selection,
    state: TodoState,
    input: TextArea<'static>,
    path: PathBuf,
}

impl TodoPanel {
    /// Loads the task file. A corrupt file is logged and replaced by an
    /// empty list on the next save.
    pub fn load(path: PathBuf) -> Self {
        let tasks = load_tasks(&path).unwrap_or_else(|err| {
            warn!(error = %err, "task list unreadable, starting empty");
            Vec::new()
        });
        Self::with_tasks(path, tasks)
    }

    pub fn with_tasks(path: PathBuf, tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            selection: Selection::default(),
            state: TodoState::Default,
            input: TextArea::default(),
            path,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn state(&self) -> TodoState {
        self.state
    }

    pub fn selected(&self) -> Option<usize> {
        self.selection.current(self.tasks.len())
    }

    pub fn input(&self) -> &TextArea<'static> {
        &self.input
    }

    pub fn is_capturing(&self) -> bool {
        self.state != TodoState::Default
    }

    /// Keys with no command mapping while capturing go to the title field.
    pub fn handle_text_key(&mut self, key: KeyEvent) {
        if self.is_capturing() {
            self.input.input(key);
        }
    }

    /// Moves to the next task starting with `c`.
    pub fn jump_to(&mut self, c: char) {
        let from = self.selected().unwrap_or(0);
        if let Some(idx) = next_match(&self.tasks, from, c) {
            self.selection.select(idx, self.tasks.len());
        }
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), IoError> {
        match self.state {
            TodoState::Default => self.handle_list_command(cmd),
            TodoState::Adding | TodoState::Editing => self.handle_capture_command(cmd),
        }
    }

    fn handle_list_command(&mut self, cmd: Command) -> Result<(), IoError> {
        match cmd {
            Command::Add => {
                self.input = TextArea::default();
                self.input.set_placeholder_text("New task");
                self.state = TodoState::Adding;
            }
            Command::Edit => {
                if let Some(idx) = self.selected() {
                    self.input = TextArea::new(vec![self.tasks[idx].title.clone()]);
                    self.input.move_cursor(CursorMove::End);
                    self.state = TodoState::Editing;
                }
            }
            Command::Toggle => {
                if let Some(idx) = self.selected() {
                    self.tasks[idx].done = !self.tasks[idx].done;
                    self.save()?;
                }
            }
            Command::Delete => {
                if let Some(idx) = self.selected() {
                    self.tasks.remove(idx);
                    self.selection.clamp(self.tasks.len());
                    self.save()?;
                }
            }
            Command::MoveUp => self.selection.move_up(),
            Command::MoveDown => self.selection.move_down(self.tasks.len()),
            _ => {}
        }
        Ok(())
    }

    fn handle_capture_command(&mut self, cmd: Command) -> Result<(), IoError> {
        match cmd {
            Command::Confirm | Command::Save => {
                let title = self.input.lines().join(" ").trim().to_string();
                let state = self.state;
                self.state = TodoState::Default;
                self.input = TextArea::default();
                if title.is_empty() {
                    return Ok(());
                }
                match state {
                    TodoState::Adding => {
                        self.tasks.push(Task::new(title));
                        self.selection.select_last(self.tasks.len());
                    }
                    TodoState::Editing => match self.selected() {
                        Some(idx) => self.tasks[idx].title = title,
                        None => return Ok(()),
                    },
                    TodoState::Default => return Ok(()),
                }
                self.save()
            }
            Command::Cancel => {
                self.state = TodoState::Default;
                self.input = TextArea::default();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn save(&self) -> Result<(), IoError> {
        save_tasks(&self.path, &self.tasks)
    }
}
