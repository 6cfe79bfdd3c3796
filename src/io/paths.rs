use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Every on-disk location the dashboard touches.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "dashdeck").context("locating home directory")?;
        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
            cache_dir: dirs.cache_dir().to_path_buf(),
        })
    }

    /// All three roots under one directory.
    #[cfg(test)]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
        }
    }

    pub fn ensure(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.cache_dir,
            &self.notes_dir(),
        ] {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn token_file(&self) -> PathBuf {
        self.config_dir.join("token.json")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.json")
    }

    pub fn todo_file(&self) -> PathBuf {
        self.data_dir.join("todo-list.json")
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.data_dir.join("notes")
    }

    pub fn calendar_cache_file(&self) -> PathBuf {
        self.cache_dir.join("calendar_cache.json")
    }

    pub fn log_file_name(&self) -> &'static str {
        "dashdeck.log"
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::AppPaths;

    #[test]
    fn ensure_creates_every_directory() {
        let dir = tempdir().expect("tempdir");
        let paths = AppPaths::rooted_at(dir.path());
        paths.ensure().expect("ensure");
        assert!(paths.config_dir.is_dir());
        assert!(paths.data_dir.is_dir());
        assert!(paths.cache_dir.is_dir());
        assert!(paths.notes_dir().is_dir());
        assert!(paths.todo_file().starts_with(&paths.data_dir));
        assert!(paths.token_file().starts_with(&paths.config_dir));
    }
}
