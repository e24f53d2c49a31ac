//! First-run flows: the welcome/quick-start flags and API key setup.

use crate::preferences::PreferenceStore;
use anyhow::Result;
use quill_client::{Backend, Notice, NoticeContext};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    pub id: &'static str,
    pub name: &'static str,
    pub env_key: &'static str,
}

pub const PROVIDERS: [Provider; 5] = [
    Provider {
        id: "anthropic",
        name: "Anthropic",
        env_key: "ANTHROPIC_API_KEY",
    },
    Provider {
        id: "openai",
        name: "OpenAI",
        env_key: "OPENAI_API_KEY",
    },
    Provider {
        id: "google",
        name: "Google AI",
        env_key: "GOOGLE_API_KEY",
    },
    Provider {
        id: "mistral",
        name: "Mistral AI",
        env_key: "MISTRAL_API_KEY",
    },
    Provider {
        id: "deepseek",
        name: "DeepSeek",
        env_key: "DEEPSEEK_API_KEY",
    },
];

pub fn provider(id: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|provider| provider.id == id)
}

/// Keys typed into the API key setup screen, by provider id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeyForm {
    keys: BTreeMap<&'static str, String>,
}

impl ApiKeyForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill from the provider environment variables that are set.
    pub fn from_env() -> Self {
        let mut form = Self::new();
        for provider in &PROVIDERS {
            if let Ok(value) = std::env::var(provider.env_key) {
                form.set(provider.id, value);
            }
        }
        form
    }

    /// Returns `false` for an unknown provider.
    pub fn set(&mut self, provider_id: &str, key: impl Into<String>) -> bool {
        let Some(provider) = provider(provider_id) else {
            return false;
        };
        self.keys.insert(provider.id, key.into());
        true
    }

    pub fn get(&self, provider_id: &str) -> Option<&str> {
        self.keys.get(provider_id).map(String::as_str)
    }

    /// At least one non-blank key has been entered.
    pub fn is_ready(&self) -> bool {
        self.keys.values().any(|key| !key.trim().is_empty())
    }

    fn entered(&self) -> BTreeMap<String, String> {
        self.keys
            .iter()
            .filter(|(_, key)| !key.trim().is_empty())
            .map(|(id, key)| (id.to_string(), key.trim().to_string()))
            .collect()
    }

    /// Send the non-blank keys to the backend and remember that keys exist.
    ///
    /// A backend failure is returned as an error notice and leaves the
    /// preference untouched.
    pub async fn save(&self, backend: &dyn Backend, prefs: &mut PreferenceStore) -> Result<Notice> {
        if !self.is_ready() {
            return Ok(Notice::info(
                "No API Keys",
                "Enter at least one API key, or use local models in economy mode.",
            ));
        }
        let keys = self.entered();
        if let Err(error) = backend.save_api_keys(&keys).await {
            return Ok(Notice::from_error(&error, NoticeContext::General));
        }
        prefs.set_api_keys_configured(true)?;
        info!("Saved API keys for {} providers", keys.len());
        Ok(Notice::success("API keys saved"))
    }
}

/// Welcome and quick-start state, read from and written to the preference store.
pub struct Onboarding;

impl Onboarding {
    pub fn should_show(prefs: &PreferenceStore) -> bool {
        !prefs.get().onboarding_complete
    }

    pub fn should_show_quickstart(prefs: &PreferenceStore) -> bool {
        prefs.get().onboarding_complete && !prefs.get().quickstart_dismissed
    }

    pub fn complete(prefs: &mut PreferenceStore) -> Result<()> {
        prefs.set_onboarding_complete(true)
    }

    pub fn dismiss_quickstart(prefs: &mut PreferenceStore) -> Result<()> {
        prefs.set_quickstart_dismissed(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_client::{
        mock::{MockBackend, MockFailure},
        Level,
    };

    #[test]
    fn ready_with_one_key() {
        let mut form = ApiKeyForm::new();
        assert!(!form.is_ready());
        assert!(!form.set("cohere", "k"));

        form.set("openai", "  ");
        assert!(!form.is_ready());
        form.set("deepseek", "sk-123");
        assert!(form.is_ready());
        assert_eq!(form.get("deepseek"), Some("sk-123"));
    }

    #[tokio::test]
    async fn save_submits_only_entered_keys() {
        let backend = MockBackend::new();
        let mut prefs = PreferenceStore::in_memory();
        let mut form = ApiKeyForm::new();
        form.set("anthropic", " sk-ant ");
        form.set("google", "");

        let notice = form.save(&backend, &mut prefs).await.unwrap();
        assert_eq!(notice.level, Level::Success);
        assert_eq!(
            backend.api_keys(),
            BTreeMap::from([("anthropic".to_string(), "sk-ant".to_string())])
        );
        assert!(prefs.get().api_keys_configured);
    }

    #[tokio::test]
    async fn failed_save_leaves_preference_unset() {
        let backend = MockBackend::new();
        backend.fail_next_request(MockFailure::Server);
        let mut prefs = PreferenceStore::in_memory();
        let mut form = ApiKeyForm::new();
        form.set("openai", "sk-1");

        let notice = form.save(&backend, &mut prefs).await.unwrap();
        assert!(notice.is_error());
        assert!(!prefs.get().api_keys_configured);
    }

    #[tokio::test]
    async fn empty_form_is_not_submitted() {
        let backend = MockBackend::new();
        let mut prefs = PreferenceStore::in_memory();
        let notice = ApiKeyForm::new().save(&backend, &mut prefs).await.unwrap();
        assert_eq!(notice.level, Level::Info);
        assert!(backend.api_keys().is_empty());
    }

    #[test]
    fn onboarding_flags() {
        let mut prefs = PreferenceStore::in_memory();
        assert!(Onboarding::should_show(&prefs));
        assert!(!Onboarding::should_show_quickstart(&prefs));

        Onboarding::complete(&mut prefs).unwrap();
        assert!(!Onboarding::should_show(&prefs));
        assert!(Onboarding::should_show_quickstart(&prefs));

        Onboarding::dismiss_quickstart(&mut prefs).unwrap();
        assert!(!Onboarding::should_show_quickstart(&prefs));
    }
}
