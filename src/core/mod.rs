mod commands;
mod keymap;
mod list;
mod mode;
mod note;
mod task;

pub use commands::Command;
pub use keymap::{Binding, BindingContext, KeyBindings};
pub use list::{ListItem, Selection, next_match, visible_window};
pub use mode::{AppMode, ConfirmChoice, EditorMode, PanelId};
pub use note::{NoteRef, sanitize_filename};
pub use task::Task;
