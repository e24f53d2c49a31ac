use anyhow::{Context, Result};
use clap::Parser;
use quill_bin::{
    app::App,
    cli::{Cli, Command},
    commands,
};
use quill_log::LogConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Held until exit so the log file is flushed
    let _log_guard = match quill_log::init(LogConfig {
        log_file_path: cli.log_file.clone(),
    }) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        },
    };

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let mut app = App::new(&cli, &cwd)?;
    app.greet()?;

    let backend = app.backend.as_ref();
    match cli.command {
        Command::Health => commands::health::run(backend, &app.config.backend_url).await,
        Command::Models => commands::models::run(backend).await,
        Command::Tree => commands::tree::run(backend).await,
        Command::Edit { scene } => {
            let shared: Arc<dyn quill_client::Backend> = app.backend.clone();
            commands::edit::run(shared, &app.config, &scene).await
        },
        Command::Compare { models, prompt } => {
            commands::compare::run(backend, &models, &prompt).await
        },
        Command::Generate {
            template,
            model,
            task,
            scene,
            prompt,
        } => {
            let args = commands::generate::GenerateArgs {
                template: &template,
                model: model.as_deref(),
                task: &task,
                scene: scene.as_deref(),
                prompt: &prompt,
            };
            commands::generate::run(backend, &app.prefs, args).await
        },
        Command::New { fields } => commands::new::run(backend, &fields).await,
        Command::Init {
            name,
            genre,
            goals,
            passages,
            docs,
            notebooks,
            style_guide,
            test_scene,
        } => {
            let args = commands::init::InitArgs {
                name: &name,
                genre: &genre,
                goals: &goals,
                passages: &passages,
                docs: &docs,
                notebooks: &notebooks,
                style_guide: &style_guide,
                test_scene: test_scene.as_deref(),
            };
            commands::init::run(backend, args).await
        },
        Command::Ask { question, source } => {
            commands::panels::ask(backend, &question, &source).await
        },
        Command::Craft { skill, scene } => {
            let project = &app.config.project_id;
            commands::panels::craft(backend, project, skill.as_deref(), scene.as_deref()).await
        },
        Command::Research {
            question,
            notebook,
            add,
            name,
            tags,
        } => {
            let project = &app.config.project_id;
            match add {
                Some(url) => {
                    let link = commands::panels::NotebookLink {
                        url: &url,
                        name: name.as_deref().unwrap_or_default(),
                        tags: &tags,
                    };
                    commands::panels::add_notebook(backend, project, link).await
                },
                None => {
                    commands::panels::research(
                        backend,
                        project,
                        question.as_deref(),
                        notebook.as_deref(),
                    )
                    .await
                },
            }
        },
        Command::Characters { id } => {
            commands::panels::characters(backend, &app.config.project_id, id.as_deref()).await
        },
        Command::Cost => commands::panels::cost(backend).await,
        Command::Setup {
            project,
            notebook_url,
        } => {
            let base = app.config.backend_url()?;
            commands::setup::run(&base, &project, &notebook_url).await
        },
        Command::Keys { keys, from_env } => {
            commands::keys::run(backend, &mut app.prefs, &keys, from_env).await
        },
        Command::Prefs {
            economy,
            profiles,
            clear,
            reset_profiles,
            dismiss_quickstart,
        } => commands::prefs::run(
            &mut app.prefs,
            commands::prefs::PrefsChange {
                economy,
                profiles: &profiles,
                clear: &clear,
                reset_profiles,
                dismiss_quickstart,
            },
        ),
    }
}
