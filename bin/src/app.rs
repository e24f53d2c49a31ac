//! Shared setup for every command: config, preferences and the backend.

use crate::cli::Cli;
use anyhow::{Context, Result};
use quill::{paths, Config, Onboarding, PreferenceStore};
use quill_client::{HttpBackend, Level, Notice};
use std::{path::Path, sync::Arc};
use tracing::debug;

pub struct App {
    pub config: Config,
    pub prefs: PreferenceStore,
    pub backend: Arc<HttpBackend>,
}

impl App {
    pub fn new(cli: &Cli, cwd: &Path) -> Result<Self> {
        let discovered = paths::discover(cwd);
        let mut config =
            Config::load_with_overrides(cli.config.as_deref(), discovered.config_path.as_deref())?;
        if let Some(backend) = &cli.backend {
            config.backend_url = backend.clone();
        }

        let prefs = match discovered
            .preferences_path
            .or_else(paths::default_preferences_path)
        {
            Some(path) => PreferenceStore::open(path)?,
            None => PreferenceStore::in_memory(),
        };

        let backend = HttpBackend::new(&config.backend_url, config.request_timeout())
            .with_context(|| format!("Failed to set up backend at {}", config.backend_url))?;
        debug!("Using backend {}", backend.base_url());

        Ok(Self {
            config,
            prefs,
            backend: Arc::new(backend),
        })
    }

    /// Print the welcome text once, then the quick-start hint until dismissed.
    pub fn greet(&mut self) -> Result<()> {
        if Onboarding::should_show(&self.prefs) {
            println!("Welcome to Quill. Run `quill keys --from-env` to register API keys,");
            println!("or `quill prefs --economy on` to prefer local models.");
            Onboarding::complete(&mut self.prefs)?;
        } else if Onboarding::should_show_quickstart(&self.prefs) {
            println!("Tip: `quill edit <scene>` autosaves as you type. Hide this with `quill prefs --dismiss-quickstart`.");
        }
        Ok(())
    }
}

pub fn print_notice(notice: &Notice) {
    match notice.level {
        Level::Success => println!("✓ {notice}"),
        Level::Info => println!("{notice}"),
        Level::Error => eprintln!("✗ {notice}"),
    }
}
