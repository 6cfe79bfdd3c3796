use serde::{Deserialize, Serialize};

use super::list::ListItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            done: false,
        }
    }

    /// Written when no task file exists yet.
    pub fn defaults() -> Vec<Task> {
        [
            "Welcome to dashdeck!",
            "Press 'o' to add a new task",
            "Press 'i' to edit a task",
            "Use the arrow keys to navigate",
            "Press 'space' to complete a task",
            "Press 'enter' to confirm an edit",
            "Press 'esc' to cancel an edit",
            "Press 'ctrl+d' to delete a task",
        ]
        .into_iter()
        .map(Task::new)
        .collect()
    }
}

impl ListItem for Task {
    fn display_text(&self) -> String {
        let mark = if self.done { "x" } else { " " };
        format!("[{mark}] {}", self.title)
    }

    fn filter_text(&self) -> &str {
        &self.title
    }
}
