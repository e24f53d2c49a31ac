//! Persisted user preferences.
//!
//! A small TOML file holding onboarding flags, economy mode and the per-task
//! model profiles. The [`PreferenceStore`] is read once at startup and passed
//! to whatever needs it; every setter writes the file before returning.

use crate::profiles::TaskType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub onboarding_complete: bool,
    pub quickstart_dismissed: bool,
    pub economy_mode: bool,
    pub api_keys_configured: bool,
    /// Model id per task type, keyed by [`TaskType::as_str`].
    pub agent_profiles: BTreeMap<String, String>,
}

impl Preferences {
    pub fn profile(&self, task: TaskType) -> Option<&str> {
        self.agent_profiles.get(task.as_str()).map(String::as_str)
    }
}

pub struct PreferenceStore {
    path: Option<PathBuf>,
    prefs: Preferences,
}

impl PreferenceStore {
    /// Open the store at `path`. A missing file yields defaults and is created
    /// on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse preferences: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}, using defaults", path.display());
                Preferences::default()
            },
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read preferences: {}", path.display()))
            },
        };
        Ok(Self {
            path: Some(path),
            prefs,
        })
    }

    /// A store that never touches the file system.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            prefs: Preferences::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    pub fn set_onboarding_complete(&mut self, value: bool) -> Result<()> {
        self.update(|prefs| prefs.onboarding_complete = value)
    }

    pub fn set_quickstart_dismissed(&mut self, value: bool) -> Result<()> {
        self.update(|prefs| prefs.quickstart_dismissed = value)
    }

    pub fn set_economy_mode(&mut self, value: bool) -> Result<()> {
        self.update(|prefs| prefs.economy_mode = value)
    }

    pub fn set_api_keys_configured(&mut self, value: bool) -> Result<()> {
        self.update(|prefs| prefs.api_keys_configured = value)
    }

    pub fn set_profile(&mut self, task: TaskType, model: &str) -> Result<()> {
        self.update(|prefs| {
            prefs
                .agent_profiles
                .insert(task.as_str().to_string(), model.to_string());
        })
    }

    pub fn clear_profile(&mut self, task: TaskType) -> Result<()> {
        self.update(|prefs| {
            prefs.agent_profiles.remove(task.as_str());
        })
    }

    pub fn reset_profiles(&mut self) -> Result<()> {
        self.update(|prefs| prefs.agent_profiles.clear())
    }

    /// Apply `change` and persist. If the write fails the in-memory
    /// preferences are left as they were.
    fn update(&mut self, change: impl FnOnce(&mut Preferences)) -> Result<()> {
        let mut next = self.prefs.clone();
        change(&mut next);
        if next == self.prefs {
            return Ok(());
        }
        if let Some(path) = &self.path {
            write_atomic(path, &next)?;
        }
        self.prefs = next;
        Ok(())
    }
}

fn write_atomic(path: &Path, prefs: &Preferences) -> Result<()> {
    let contents = toml::to_string_pretty(prefs).context("Failed to serialize preferences")?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .context("Failed to write preferences")?;
    file.persist(path)
        .with_context(|| format!("Failed to write preferences: {}", path.display()))?;
    debug!("Preferences written to {}", path.display());
    Ok(())
}
