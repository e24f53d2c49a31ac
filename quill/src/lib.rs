//! Client core for the Quill writing assistant.
//!
//! Everything here is UI-agnostic state: the open scene and its autosave loop,
//! the navigation tree cache, wizards, the AI tools panel and side panels,
//! model profiles and persisted preferences. Front ends drive it and render what it exposes.

pub mod config;
pub mod debounce;
pub mod document;
pub mod notifications;
pub mod onboarding;
pub mod panels;
pub mod paths;
pub mod preferences;
pub mod profiles;
pub mod project_setup;
pub mod save;
pub mod session;
pub mod tools;
pub mod tree;
pub mod wizard;

pub use config::Config;
pub use debounce::Debouncer;
pub use document::Document;
pub use notifications::Notifications;
pub use onboarding::{ApiKeyForm, Onboarding, Provider, PROVIDERS};
pub use panels::PanelError;
pub use preferences::{PreferenceStore, Preferences};
pub use profiles::{resolve_model, ModelCatalog, TaskType};
pub use project_setup::{ProjectSetupForm, ProjectSetupWizard, SetupError};
pub use save::{SaveCoordinator, SaveRequest, SaveStatus};
pub use session::{SessionConfig, SessionEvent, SessionHandle};
pub use tools::{ModelSelection, ToolError};
pub use tree::TreeCache;
pub use wizard::{CreationForm, CreationWizard, Phase, StepState, Wizard, WizardError};
