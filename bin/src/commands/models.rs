use crate::app::print_notice;
use anyhow::Result;
use quill::ModelCatalog;
use quill_client::{Backend, LocalModelStatus, ModelInfo, Notice, NoticeContext};
use std::fmt::Write;

pub async fn run(backend: &dyn Backend) -> Result<()> {
    let catalog = match ModelCatalog::load(backend).await {
        Ok(catalog) => catalog,
        Err(error) => {
            print_notice(&Notice::from_error(&error, NoticeContext::General));
            return Ok(());
        },
    };
    // Ollama being down is worth a notice but not worth failing the listing.
    let status = match backend.local_model_status().await {
        Ok(status) => Some(status),
        Err(error) => {
            print_notice(&Notice::from_error(&error, NoticeContext::General));
            None
        },
    };
    print!("{}", render(&catalog, status.as_ref()));
    Ok(())
}

fn line(out: &mut String, model: &ModelInfo) {
    let _ = write!(out, "  {}", model.id);
    if let Some(provider) = &model.provider {
        let _ = write!(out, " ({provider})");
    }
    if let (Some(input), Some(output)) = (model.cost_input, model.cost_output) {
        let _ = write!(out, " ${input}/${output} per 1M tokens");
    }
    if !model.strengths.is_empty() {
        let _ = write!(out, " [{}]", model.strengths.join(", "));
    }
    out.push('\n');
}

pub fn render(catalog: &ModelCatalog, status: Option<&LocalModelStatus>) -> String {
    let mut out = String::new();
    if catalog.is_empty() {
        out.push_str("No models available.\n");
        return out;
    }

    out.push_str("Local models:\n");
    let mut any_local = false;
    for model in catalog.local() {
        any_local = true;
        line(&mut out, model);
    }
    if !any_local {
        out.push_str("  (none)\n");
    }
    if let Some(status) = status {
        let state = if status.available { "running" } else { "not running" };
        let _ = writeln!(out, "  Ollama {state}, {} models pulled", status.models.len());
    }

    out.push_str("Cloud models:\n");
    for model in catalog.cloud() {
        line(&mut out, model);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_local_and_cloud_sections() {
        let mut sonnet = ModelInfo::new("claude-sonnet");
        sonnet.provider = Some("anthropic".into());
        sonnet.cost_input = Some(3.0);
        sonnet.cost_output = Some(15.0);
        let catalog = ModelCatalog::new(vec![sonnet, ModelInfo::new("llama3.3").local()]);
        let status = LocalModelStatus {
            available: true,
            models: vec!["llama3.3".into()],
        };

        let out = render(&catalog, Some(&status));
        assert_eq!(
            out,
            "Local models:\n  llama3.3\n  Ollama running, 1 models pulled\n\
             Cloud models:\n  claude-sonnet (anthropic) $3/$15 per 1M tokens\n"
        );
    }

    #[test]
    fn empty_catalog() {
        assert_eq!(
            render(&ModelCatalog::default(), None),
            "No models available.\n"
        );
    }
}
