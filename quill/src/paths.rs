//! Locating the `.quill/` directory.
//!
//! A project keeps its `config.toml` and `preferences.toml` in a `.quill/`
//! directory at or above the working directory. Without one,
//! `<config_dir>/quill` is used when it exists.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DIR_NAME: &str = ".quill";
const CONFIG_FILE: &str = "config.toml";
const PREFERENCES_FILE: &str = "preferences.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuillPaths {
    pub quill_dir: Option<PathBuf>,
    /// Only set when the file exists.
    pub config_path: Option<PathBuf>,
    /// Set whenever a directory was found, since the store creates the file.
    pub preferences_path: Option<PathBuf>,
}

impl QuillPaths {
    fn in_dir(dir: PathBuf) -> Self {
        let config = dir.join(CONFIG_FILE);
        Self {
            config_path: config.is_file().then_some(config),
            preferences_path: Some(dir.join(PREFERENCES_FILE)),
            quill_dir: Some(dir),
        }
    }
}

/// The nearest `.quill/` at or above `start_dir`, else the user directory.
pub fn discover(start_dir: &Path) -> QuillPaths {
    let project = start_dir
        .ancestors()
        .map(|dir| dir.join(DIR_NAME))
        .find(|dir| dir.is_dir());
    if let Some(dir) = project {
        info!("Using project directory {}", dir.display());
        return QuillPaths::in_dir(dir);
    }

    match user_dir().filter(|dir| dir.is_dir()) {
        Some(dir) => {
            info!("Using user config directory {}", dir.display());
            QuillPaths::in_dir(dir)
        },
        None => {
            debug!("No .quill directory found from {}", start_dir.display());
            QuillPaths::default()
        },
    }
}

/// Preferences location when no directory exists yet.
pub fn default_preferences_path() -> Option<PathBuf> {
    Some(user_dir()?.join(PREFERENCES_FILE))
}

fn user_dir() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("quill"))
}
