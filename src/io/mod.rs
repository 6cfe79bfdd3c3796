mod filesystem;
mod notes;
mod paths;
mod settings;

pub use filesystem::{IoError, load_tasks, read_json, save_tasks, write_json, write_private_json};
#[cfg(test)]
pub use notes::memory::MemoryNoteRepository;
pub use notes::{FsNoteRepository, NoteRepository, ensure_seed_notes};
pub use paths::AppPaths;
pub use settings::{LoadedSettings, Settings, load_settings, save_settings};
