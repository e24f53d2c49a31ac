use crate::cli::{split_pair, Toggle};
use anyhow::{anyhow, Result};
use quill::{Onboarding, PreferenceStore, Preferences, TaskType};
use std::fmt::Write;

#[derive(Debug, Default)]
pub struct PrefsChange<'a> {
    pub economy: Option<Toggle>,
    pub profiles: &'a [String],
    pub clear: &'a [String],
    pub reset_profiles: bool,
    pub dismiss_quickstart: bool,
}

/// Apply `change` in order: reset, clears, new profiles, then flags.
pub fn run(prefs: &mut PreferenceStore, change: PrefsChange<'_>) -> Result<()> {
    if change.reset_profiles {
        prefs.reset_profiles()?;
    }
    for task in change.clear {
        prefs.clear_profile(task.parse()?)?;
    }
    for pair in change.profiles {
        let (task, model) =
            split_pair(pair).ok_or_else(|| anyhow!("Expected task=model, got {pair:?}"))?;
        let task: TaskType = task.parse()?;
        prefs.set_profile(task, model)?;
    }
    if let Some(economy) = change.economy {
        prefs.set_economy_mode(economy.into())?;
    }
    if change.dismiss_quickstart {
        Onboarding::dismiss_quickstart(prefs)?;
    }

    print!("{}", render(prefs.get()));
    Ok(())
}

pub fn render(prefs: &Preferences) -> String {
    let mut out = String::new();
    let economy = if prefs.economy_mode { "on" } else { "off" };
    let _ = writeln!(out, "Economy mode: {economy}");
    let keys = if prefs.api_keys_configured { "configured" } else { "not configured" };
    let _ = writeln!(out, "API keys: {keys}");
    out.push_str("Agent profiles:\n");
    for task in TaskType::ALL {
        let model = prefs.profile(task).unwrap_or("(default)");
        let _ = writeln!(out, "  {:<9} {model}", task.as_str());
    }
    out
}
