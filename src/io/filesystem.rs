use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolStyle {
    Lf,
    Crlf,
}

/// A text file with its line endings normalized to `\n`.
#[derive(Debug, Clone)]
pub struct FileData {
    pub text: String,
    pub eol: EolStyle,
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed reading file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed removing file {path}: {source}")]
    Remove {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("file already exists: {path}")]
    AlreadyExists { path: String },
    #[error("failed parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed serializing {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and decodes a JSON document. A missing file is `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, IoError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parsed = serde_json::from_str(&raw).map_err(|source| IoError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(parsed))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    let raw = serde_json::to_string_pretty(value).map_err(|source| IoError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, raw).map_err(|source| IoError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Like [`write_json`], but the file is only readable by the current user.
pub fn write_private_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    write_json(path, value)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
            IoError::Write {
                path: path.display().to_string(),
                source,
            }
        })?;
    }
    Ok(())
}

pub fn load_document(path: &Path) -> Result<FileData, IoError> {
    let bytes = fs::read(path).map_err(|source| IoError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let raw = String::from_utf8_lossy(&bytes);
    let eol = detect_eol(&raw);
    let text = raw.replace("\r\n", "\n");
    Ok(FileData { text, eol })
}

pub fn save_document(path: &Path, text: &str, eol: EolStyle) -> Result<(), IoError> {
    let out = match eol {
        EolStyle::Lf => text.to_string(),
        EolStyle::Crlf => text.replace('\n', "\r\n"),
    };
    fs::write(path, out).map_err(|source| IoError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn detect_eol(content: &str) -> EolStyle {
    if content.contains("\r\n") {
        EolStyle::Crlf
    } else {
        EolStyle::Lf
    }
}

pub fn remove_document(path: &Path) -> Result<(), IoError> {
    fs::remove_file(path).map_err(|source| IoError::Remove {
        path: path.display().to_string(),
        source,
    })
}

/// Loads the task list. A missing file is seeded with the introductory tasks,
/// which are written back right away.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, IoError> {
    match read_json::<Vec<Task>>(path)? {
        Some(tasks) => Ok(tasks),
        None => {
            let tasks = Task::defaults();
            save_tasks(path, &tasks)?;
            Ok(tasks)
        }
    }
}

pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), IoError> {
    let raw = serde_json::to_string(tasks).map_err(|source| IoError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, raw).map_err(|source| IoError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{
        EolStyle, detect_eol, load_document, load_tasks, read_json, save_document, save_tasks,
        write_private_json,
    };
    use crate::core::Task;

    #[test]
    fn task_list_roundtrip_keeps_order_and_fields() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("todo-list.json");
        let tasks = vec![
            Task::new("first"),
            Task {
                title: "second".into(),
                description: "kept on disk".into(),
                done: true,
            },
        ];
        save_tasks(&path, &tasks).expect("save");
        let loaded = load_tasks(&path).expect("load");
        assert_eq!(loaded, tasks);
    }

    #[test]
    fn missing_task_file_is_seeded_and_written() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("todo-list.json");
        let loaded = load_tasks(&path).expect("load");
        assert_eq!(loaded, Task::defaults());
        assert!(path.exists());
    }

    #[test]
    fn empty_array_is_not_reseeded() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("todo-list.json");
        std::fs::write(&path, "[]").expect("write");
        assert!(load_tasks(&path).expect("load").is_empty());
    }

    #[test]
    fn crlf_documents_load_normalized_and_save_as_crlf() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("note.md");
        std::fs::write(&path, "# a\r\n\r\nb\r\n").expect("write");
        let doc = load_document(&path).expect("load");
        assert_eq!(doc.eol, EolStyle::Crlf);
        assert_eq!(doc.text, "# a\n\nb\n");

        save_document(&path, &format!("{}c\n", doc.text), doc.eol).expect("save");
        let saved = std::fs::read_to_string(&path).expect("read");
        assert_eq!(saved, "# a\r\n\r\nb\r\nc\r\n");
        assert_eq!(detect_eol("plain\n"), EolStyle::Lf);
    }

    #[test]
    fn read_json_reports_missing_as_none() {
        let dir = tempdir().expect("tempdir");
        let missing: Option<Vec<Task>> =
            read_json(&dir.path().join("nope.json")).expect("read");
        assert!(missing.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn private_json_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("token.json");
        write_private_json(&path, &vec![1, 2, 3]).expect("write");
        let mode = std::fs::metadata(&path).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
