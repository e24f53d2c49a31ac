use crate::app::print_notice;
use anyhow::{anyhow, bail, Result};
use quill::{resolve_model, tools, Document, ModelCatalog, PreferenceStore, TaskType};
use quill_client::{Backend, Notice, NoticeContext, ToolTemplate};
use tracing::debug;

pub struct GenerateArgs<'a> {
    pub template: &'a str,
    pub model: Option<&'a str>,
    pub task: &'a str,
    pub scene: Option<&'a str>,
    pub prompt: &'a str,
}

pub async fn run(backend: &dyn Backend, prefs: &PreferenceStore, args: GenerateArgs<'_>) -> Result<()> {
    let template: ToolTemplate = args.template.parse().map_err(|e: String| anyhow!(e))?;

    let model = match args.model {
        Some(model) => model.to_string(),
        None => {
            let task: TaskType = args.task.parse()?;
            let catalog = match ModelCatalog::load(backend).await {
                Ok(catalog) => catalog,
                Err(error) => {
                    print_notice(&Notice::from_error(&error, NoticeContext::General));
                    return Ok(());
                },
            };
            pick_model(task, prefs, &catalog)?
        },
    };
    debug!("{} with {}", template.label(), model);

    let scene = match args.scene {
        Some(id) => match backend.scene(&id.into()).await {
            Ok(scene) => Some(Document::from(scene)),
            Err(error) => {
                print_notice(&Notice::from_error(&error, NoticeContext::Scene));
                return Ok(());
            },
        },
        None => None,
    };

    let request = tools::build_request(template, args.prompt, &model, scene.as_ref())?;
    let run = tools::run_tool(backend, template, &request).await;
    print_notice(&run.notice);
    if let Some(output) = run.output.as_ref().and_then(|result| result.output()) {
        println!("\n{output}");
    }
    Ok(())
}

/// Model for `task` when none was given, falling back to the first model offered.
fn pick_model(task: TaskType, prefs: &PreferenceStore, catalog: &ModelCatalog) -> Result<String> {
    let Some(first) = catalog.all().first() else {
        bail!("The backend offers no models");
    };
    Ok(resolve_model(task, prefs.get(), catalog, &first.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_client::{mock::MockBackend, ModelInfo};

    #[test]
    fn picks_profile_then_first_model() {
        let catalog = ModelCatalog::new(vec![
            ModelInfo::new("gpt-4o"),
            ModelInfo::new("llama3.3").local(),
        ]);
        let mut prefs = PreferenceStore::in_memory();
        assert_eq!(pick_model(TaskType::Draft, &prefs, &catalog).unwrap(), "gpt-4o");

        prefs.set_economy_mode(true).unwrap();
        assert_eq!(pick_model(TaskType::Draft, &prefs, &catalog).unwrap(), "llama3.3");

        prefs.set_profile(TaskType::Draft, "claude-sonnet").unwrap();
        assert_eq!(
            pick_model(TaskType::Draft, &prefs, &catalog).unwrap(),
            "claude-sonnet"
        );

        assert!(pick_model(TaskType::Draft, &prefs, &ModelCatalog::default()).is_err());
    }

    #[tokio::test]
    async fn sends_scene_text_for_enhance() {
        let backend = MockBackend::new()
            .with_scene("s-1", "Dock", "Waves.")
            .with_models(vec![ModelInfo::new("gpt-4o")]);
        let prefs = PreferenceStore::in_memory();

        run(&backend, &prefs, GenerateArgs {
            template: "enhance",
            model: None,
            task: "polish",
            scene: Some("s-1"),
            prompt: "more menace",
        })
        .await
        .unwrap();

        let (template, request) = backend.generations().remove(0);
        assert_eq!(template, ToolTemplate::Enhance);
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.scene_text.as_deref(), Some("Waves."));
    }

    #[tokio::test]
    async fn rejects_unknown_template_and_empty_prompt() {
        let backend = MockBackend::new();
        let prefs = PreferenceStore::in_memory();
        let args = |template, prompt| GenerateArgs {
            template,
            model: Some("m"),
            task: "draft",
            scene: None,
            prompt,
        };

        assert!(run(&backend, &prefs, args("poem", "x")).await.is_err());
        assert!(run(&backend, &prefs, args("generate", " ")).await.is_err());
        assert!(backend.generations().is_empty());
    }
}
