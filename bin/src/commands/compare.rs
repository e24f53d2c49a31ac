use crate::app::print_notice;
use anyhow::Result;
use quill::{tools, ModelSelection};
use quill_client::Backend;
use tracing::warn;

pub async fn run(backend: &dyn Backend, models: &[String], prompt: &str) -> Result<()> {
    let selection = select(models);
    let request = selection.request(prompt)?;

    let run = tools::compare(backend, &request).await;
    print_notice(&run.notice);
    for (model, output) in run.output.iter().flatten() {
        println!("\n=== {model} ===\n{output}");
    }
    Ok(())
}

fn select(models: &[String]) -> ModelSelection {
    let mut selection = ModelSelection::new();
    for model in models {
        if selection.is_selected(model) {
            continue;
        }
        if !selection.toggle(model) {
            warn!("Skipping {}: at most {} models", model, tools::MAX_COMPARED_MODELS);
            eprintln!(
                "Skipping {model}: at most {} models can be compared",
                tools::MAX_COMPARED_MODELS
            );
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_and_overflow_are_dropped() {
        let models: Vec<String> = ["a", "b", "a", "c", "d", "e"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(select(&models).models(), ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn single_model_is_rejected() {
        let backend = quill_client::mock::MockBackend::new();
        let error = run(&backend, &["a".to_string()], "duel").await.unwrap_err();
        assert!(error.to_string().contains("at least 2"));
    }
}
