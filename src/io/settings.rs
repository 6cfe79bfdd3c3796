use std::path::Path;

use serde::{Deserialize, Serialize};

use super::filesystem::{IoError, read_json, write_json};

pub const DEFAULT_LOCATION: &str = "Athens";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub default_notes_created: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            default_notes_created: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    /// The settings file did not exist and was just written with defaults.
    pub first_run: bool,
}

pub fn load_settings(path: &Path) -> Result<LoadedSettings, IoError> {
    match read_json::<Settings>(path)? {
        Some(mut settings) => {
            if settings.location.trim().is_empty() {
                settings.location = DEFAULT_LOCATION.to_string();
            }
            Ok(LoadedSettings {
                settings,
                first_run: false,
            })
        }
        None => {
            let settings = Settings::default();
            save_settings(path, &settings)?;
            Ok(LoadedSettings {
                settings,
                first_run: true,
            })
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), IoError> {
    write_json(path, settings)
}
