use std::path::{Path, PathBuf};

use super::list::ListItem;

/// A note as seen in the directory listing. The file holds the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRef {
    pub title: String,
    pub path: PathBuf,
}

impl NoteRef {
    pub fn from_path(path: PathBuf) -> Self {
        let title = display_title(&path);
        Self { title, path }
    }
}

impl ListItem for NoteRef {
    fn display_text(&self) -> String {
        self.title.clone()
    }

    fn filter_text(&self) -> &str {
        &self.title
    }
}

/// Turns a note title into a file stem made of ASCII letters, digits and
/// hyphens.
pub fn sanitize_filename(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if sanitized.is_empty() {
        "untitled-note".to_string()
    } else {
        sanitized
    }
}

/// Title shown in the notes list: hyphens back to spaces, and a leading
/// numeric ordering prefix such as `01 ` removed.
pub fn display_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let spaced = stem.replace('-', " ");
    strip_order_prefix(&spaced).to_string()
}

fn strip_order_prefix(title: &str) -> &str {
    let digits = title.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return title;
    }
    let rest = &title[digits..];
    match rest.chars().next() {
        Some(c) if c.is_whitespace() => &rest[c.len_utf8()..],
        _ => title,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{display_title, sanitize_filename};

    #[test]
    fn sanitize_keeps_only_letters_digits_and_hyphens() {
        let name = sanitize_filename("Trip to Zürich: day 2 (draft)!");
        assert_eq!(name, "Trip-to-Zrich-day-2-draft");
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_filename(""), "untitled-note");
        assert_eq!(sanitize_filename("✨✨"), "untitled-note");
    }

    #[test]
    fn sanitized_name_reads_back_with_spaces() {
        let stem = sanitize_filename("Meeting notes today");
        let path = format!("/tmp/{stem}.md");
        assert_eq!(display_title(Path::new(&path)), "Meeting notes today");
    }

    #[test]
    fn numeric_prefix_is_hidden_from_the_title_only() {
        let path = Path::new("/notes/01-Welcome-to-dashdeck.md");
        assert_eq!(display_title(path), "Welcome to dashdeck");
        assert_eq!(display_title(Path::new("/notes/2024-plans.md")), "plans");
        assert_eq!(display_title(Path::new("/notes/42.md")), "42");
    }
}
