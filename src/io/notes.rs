use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::filesystem::{EolStyle, IoError, load_document, remove_document, save_document};
use super::settings::Settings;
use crate::core::{NoteRef, sanitize_filename};

/// Storage behind the notes panel.
pub trait NoteRepository {
    /// Every note, sorted by filename.
    fn list(&self) -> Result<Vec<NoteRef>, IoError>;
    fn read(&self, note: &NoteRef) -> Result<String, IoError>;
    fn write(&self, path: &Path, content: &str) -> Result<(), IoError>;
    /// Creates `{sanitized title}.md` holding a level-one heading.
    fn create(&self, title: &str) -> Result<NoteRef, IoError>;
    fn delete(&self, note: &NoteRef) -> Result<(), IoError>;
}

pub fn initial_content(title: &str) -> String {
    format!("# {title}\n\n")
}

#[derive(Debug, Clone)]
pub struct FsNoteRepository {
    dir: PathBuf,
}

impl FsNoteRepository {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{}.md", sanitize_filename(title)))
    }
}

impl NoteRepository for FsNoteRepository {
    fn list(&self) -> Result<Vec<NoteRef>, IoError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| IoError::Read {
            path: self.dir.display().to_string(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();
        Ok(paths.into_iter().map(NoteRef::from_path).collect())
    }

    fn read(&self, note: &NoteRef) -> Result<String, IoError> {
        Ok(load_document(&note.path)?.text)
    }

    /// Keeps the line endings the file already has.
    fn write(&self, path: &Path, content: &str) -> Result<(), IoError> {
        let eol = load_document(path).map_or(EolStyle::Lf, |doc| doc.eol);
        save_document(path, content, eol)
    }

    fn create(&self, title: &str) -> Result<NoteRef, IoError> {
        let path = self.path_for(title);
        if path.exists() {
            return Err(IoError::AlreadyExists {
                path: path.display().to_string(),
            });
        }
        save_document(&path, &initial_content(title), EolStyle::Lf)?;
        Ok(NoteRef::from_path(path))
    }

    fn delete(&self, note: &NoteRef) -> Result<(), IoError> {
        remove_document(&note.path)
    }
}

const WELCOME_TITLE: &str = "01 Welcome to dashdeck";
const WELCOME_BODY: &str = "\
# Welcome to dashdeck

dashdeck keeps your tasks, notes, calendar and weather on one screen.

## Panels

- **To-Do List**: quick tasks, saved as you type them.
- **Notes**: markdown files stored in your data directory.
- **Calendar**: your primary Google Calendar, a month at a time.

Use `tab` to move between panels, or click one with the mouse.
";

const KEYBINDINGS_TITLE: &str = "02 Keybindings reference";
const KEYBINDINGS_BODY: &str = "\
# Keybindings reference

## Everywhere

- `tab` / `shift+tab`: next / previous panel
- `ctrl+k`: show key bindings for the focused panel
- `ctrl+q`: quit

## To-Do List

- `o`: add a task
- `i`: edit the selected task
- `space`: mark done / not done
- `ctrl+d`: delete the selected task
- `enter` or `ctrl+s`: confirm, `esc`: cancel

## Notes

- `o`: new note
- `enter` or `e`: open the selected note
- `ctrl+d`: delete the selected note

## Note editor

- `i`: switch from preview to editing
- `ctrl+s`: save
- `esc`: back to preview, then back to the dashboard

## Calendar

- arrows: move by day or week
- `[` / `]`: previous / next month
- `t`: jump to today
- `enter`: open Google Calendar in the browser
";

/// Writes the welcome and keybinding notes into an empty store, once.
/// Returns whether anything was written; the caller persists `settings`.
pub fn ensure_seed_notes(
    repo: &dyn NoteRepository,
    settings: &mut Settings,
) -> Result<bool, IoError> {
    if settings.default_notes_created || !repo.list()?.is_empty() {
        return Ok(false);
    }
    for (title, body) in [
        (WELCOME_TITLE, WELCOME_BODY),
        (KEYBINDINGS_TITLE, KEYBINDINGS_BODY),
    ] {
        let note = repo.create(title)?;
        repo.write(&note.path, body)?;
    }
    settings.default_notes_created = true;
    info!("seeded default notes");
    Ok(true)
}

#[cfg(test)]
pub mod memory {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    use super::{NoteRepository, initial_content};
    use crate::core::{NoteRef, sanitize_filename};
    use crate::io::IoError;

    /// In-memory notes keyed by path, so listing order matches the
    /// filesystem implementation.
    #[derive(Debug, Default)]
    pub struct MemoryNoteRepository {
        pub files: RefCell<BTreeMap<PathBuf, String>>,
    }

    impl MemoryNoteRepository {
        pub fn with_notes(notes: &[(&str, &str)]) -> Self {
            let repo = Self::default();
            for (name, content) in notes {
                repo.files
                    .borrow_mut()
                    .insert(PathBuf::from(format!("/notes/{name}.md")), content.to_string());
            }
            repo
        }
    }

    impl NoteRepository for MemoryNoteRepository {
        fn list(&self) -> Result<Vec<NoteRef>, IoError> {
            Ok(self
                .files
                .borrow()
                .keys()
                .cloned()
                .map(NoteRef::from_path)
                .collect())
        }

        fn read(&self, note: &NoteRef) -> Result<String, IoError> {
            self.files
                .borrow()
                .get(&note.path)
                .cloned()
                .ok_or_else(|| IoError::Read {
                    path: note.path.display().to_string(),
                    source: std::io::ErrorKind::NotFound.into(),
                })
        }

        fn write(&self, path: &Path, content: &str) -> Result<(), IoError> {
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), content.to_string());
            Ok(())
        }

        fn create(&self, title: &str) -> Result<NoteRef, IoError> {
            let path = PathBuf::from(format!("/notes/{}.md", sanitize_filename(title)));
            if self.files.borrow().contains_key(&path) {
                return Err(IoError::AlreadyExists {
                    path: path.display().to_string(),
                });
            }
            self.write(&path, &initial_content(title))?;
            Ok(NoteRef::from_path(path))
        }

        fn delete(&self, note: &NoteRef) -> Result<(), IoError> {
            self.files.borrow_mut().remove(&note.path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::memory::MemoryNoteRepository;
    use super::{FsNoteRepository, NoteRepository, ensure_seed_notes};
    use crate::io::{IoError, Settings};

    #[test]
    fn create_writes_heading_and_lists_sorted() {
        let dir = tempdir().expect("tempdir");
        let repo = FsNoteRepository::new(dir.path().to_path_buf());
        repo.create("Zebra facts").expect("create");
        let note = repo.create("Apple pie").expect("create");
        std::fs::write(dir.path().join("ignored.txt"), "x").expect("write");

        assert_eq!(note.path, dir.path().join("Apple-pie.md"));
        assert_eq!(repo.read(&note).expect("read"), "# Apple pie\n\n");
        let titles: Vec<String> = repo
            .list()
            .expect("list")
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["Apple pie", "Zebra facts"]);
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let dir = tempdir().expect("tempdir");
        let repo = FsNoteRepository::new(dir.path().to_path_buf());
        let note = repo.create("Plans").expect("create");
        repo.write(&note.path, "# Plans\n\nkeep me").expect("write");
        assert!(matches!(
            repo.create("Plans"),
            Err(IoError::AlreadyExists { .. })
        ));
        assert_eq!(repo.read(&note).expect("read"), "# Plans\n\nkeep me");
    }

    #[test]
    fn windows_line_endings_survive_an_edit() {
        let dir = tempdir().expect("tempdir");
        let repo = FsNoteRepository::new(dir.path().to_path_buf());
        let path = dir.path().join("Shopping.md");
        std::fs::write(&path, "# Shopping\r\n\r\n- eggs\r\n").expect("write");
        let note = repo.list().expect("list").remove(0);

        let content = repo.read(&note).expect("read");
        assert_eq!(content, "# Shopping\n\n- eggs\n");
        repo.write(&path, &format!("{content}- milk\n")).expect("write");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "# Shopping\r\n\r\n- eggs\r\n- milk\r\n"
        );
    }

    #[test]
    fn delete_removes_the_file() {
        let dir = tempdir().expect("tempdir");
        let repo = FsNoteRepository::new(dir.path().to_path_buf());
        let note = repo.create("Scratch").expect("create");
        repo.delete(&note).expect("delete");
        assert!(!note.path.exists());
        assert!(repo.list().expect("list").is_empty());
    }

    #[test]
    fn seeding_runs_once_on_an_empty_store() {
        let repo = MemoryNoteRepository::default();
        let mut settings = Settings::default();
        assert!(ensure_seed_notes(&repo, &mut settings).expect("seed"));
        assert!(settings.default_notes_created);
        let notes = repo.list().expect("list");
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].title, "Welcome to dashdeck");
        assert_eq!(notes[1].title, "Keybindings reference");
        assert!(notes[0].path.ends_with("01-Welcome-to-dashdeck.md"));
    }

    #[test]
    fn seeding_respects_the_flag_after_user_deletes_everything() {
        let repo = MemoryNoteRepository::default();
        let mut settings = Settings {
            default_notes_created: true,
            ..Settings::default()
        };
        assert!(!ensure_seed_notes(&repo, &mut settings).expect("seed"));
        assert!(repo.list().expect("list").is_empty());
    }

    #[test]
    fn seeding_skips_a_store_with_notes() {
        let repo = MemoryNoteRepository::with_notes(&[("mine", "# mine\n")]);
        let mut settings = Settings::default();
        assert!(!ensure_seed_notes(&repo, &mut settings).expect("seed"));
        assert!(!settings.default_notes_created);
        assert_eq!(repo.list().expect("list").len(), 1);
    }
}
