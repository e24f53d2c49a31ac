use crate::{app::print_notice, cli::split_pair};
use anyhow::{bail, Result};
use quill::{ApiKeyForm, PreferenceStore, PROVIDERS};
use quill_client::Backend;

pub async fn run(
    backend: &dyn Backend,
    prefs: &mut PreferenceStore,
    pairs: &[String],
    from_env: bool,
) -> Result<()> {
    let form = form(pairs, from_env)?;
    let notice = form.save(backend, prefs).await?;
    print_notice(&notice);
    Ok(())
}

/// Keys given on the command line win over the environment.
fn form(pairs: &[String], from_env: bool) -> Result<ApiKeyForm> {
    let mut form = if from_env {
        ApiKeyForm::from_env()
    } else {
        ApiKeyForm::new()
    };
    for pair in pairs {
        let Some((provider, key)) = split_pair(pair) else {
            bail!("Expected provider=key, got {pair:?}");
        };
        if !form.set(provider, key) {
            let known: Vec<_> = PROVIDERS.iter().map(|p| p.id).collect();
            bail!("Unknown provider {provider:?}, expected one of {}", known.join(", "));
        }
    }
    Ok(form)
}
