//! Client settings read from `config.toml`.
//!
//! The file comes from `--config` when given, else from the `.quill/`
//! directory found by [`crate::paths::discover`], else the defaults compiled
//! in from `quill/config.toml`. Every key is optional and unknown keys are an
//! error, so a typo is reported instead of silently ignored.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{path::Path, time::Duration};
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the backend serving `/api/...` and `/ws/...`.
    pub backend_url: String,

    /// Quiet period after the last edit before an autosave fires.
    pub autosave_delay_ms: u64,

    pub request_timeout_secs: u64,

    /// Save the outgoing scene's unsaved edits when another scene is opened.
    ///
    /// When off, switching discards the pending debounce and the edits stay
    /// unsaved in the closed document.
    pub flush_on_switch: bool,

    pub notice_capacity: usize,

    /// Project the craft, research and character panels work in.
    pub project_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            autosave_delay_ms: 2000,
            request_timeout_secs: 30,
            flush_on_switch: true,
            notice_capacity: 5,
            project_id: "default".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        toml::from_str(&source).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// The first of `cli` and `discovered` that is set, else the built-in defaults.
    pub fn load_with_overrides(cli: Option<&Path>, discovered: Option<&Path>) -> Result<Self> {
        match cli.or(discovered) {
            Some(path) => Self::load(path),
            None => toml::from_str(include_str!("../config.toml"))
                .context("Built-in config.toml is invalid"),
        }
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backend_url(&self) -> Result<Url> {
        Url::parse(&self.backend_url)
            .with_context(|| format!("Invalid backend_url: {}", self.backend_url))
    }

    /// WebSocket URL for `path` on the backend host (`http` -> `ws`, `https` -> `wss`).
    pub fn websocket_url(&self, path: &str) -> Result<Url> {
        let mut url = self.backend_url()?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        if url.set_scheme(scheme).is_err() {
            anyhow::bail!("Cannot derive a WebSocket URL from {}", self.backend_url);
        }
        let mut joined = url.path().trim_end_matches('/').to_string();
        joined.push('/');
        joined.push_str(path.trim_start_matches('/'));
        url.set_path(&joined);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn settings(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn blank_file_means_defaults() {
        let dir = tempdir().unwrap();
        let path = settings(&dir, "config.toml", "");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn load_errors_name_the_file() {
        let dir = tempdir().unwrap();
        let broken = settings(&dir, "broken.toml", "autosave_delay_ms = [");
        let typo = settings(&dir, "typo.toml", "autosave_delay = 5");
        let missing = dir.path().join("missing.toml");

        for (path, prefix) in [
            (&broken, "Invalid settings"),
            (&typo, "Invalid settings"),
            (&missing, "Cannot read"),
        ] {
            let error = Config::load(path).unwrap_err().to_string();
            assert!(error.starts_with(prefix), "{error}");
            assert!(error.contains(&path.display().to_string()));
        }
    }

    #[test]
    fn command_line_file_beats_project_file() {
        let dir = tempdir().unwrap();
        let cli = settings(&dir, "cli.toml", "autosave_delay_ms = 500");
        let project = settings(&dir, "project.toml", "autosave_delay_ms = 900");

        let config = Config::load_with_overrides(Some(&cli), Some(&project)).unwrap();
        assert_eq!(config.autosave_delay(), Duration::from_millis(500));

        let config = Config::load_with_overrides(None, Some(&project)).unwrap();
        assert_eq!(config.autosave_delay(), Duration::from_millis(900));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = settings(&dir, "config.toml", "flush_on_switch = false");

        let config = Config::load(&path).unwrap();
        assert!(!config.flush_on_switch);
        assert_eq!(config.notice_capacity, 5);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn built_in_file_matches_default() {
        assert_eq!(Config::load_with_overrides(None, None).unwrap(), Config::default());
    }

    #[test]
    fn websocket_url_follows_backend_scheme() {
        let config = Config::default();
        assert_eq!(
            config.websocket_url("/ws/wizard/p1").unwrap().as_str(),
            "ws://localhost:8000/ws/wizard/p1"
        );

        let config = Config {
            backend_url: "https://quill.example.com/app/".into(),
            ..Config::default()
        };
        assert_eq!(
            config.websocket_url("ws/wizard/p1").unwrap().as_str(),
            "wss://quill.example.com/app/ws/wizard/p1"
        );
    }

    #[test]
    fn invalid_backend_url() {
        let config = Config {
            backend_url: "not a url".into(),
            ..Config::default()
        };
        assert!(config.backend_url().is_err());
        assert!(config.websocket_url("/ws").is_err());
    }
}
