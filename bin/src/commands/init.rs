use crate::app::print_notice;
use anyhow::{Context, Result};
use quill::ProjectSetupWizard;
use quill_client::{Backend, SkillTestResult};
use std::{
    fmt::Write,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub struct InitArgs<'a> {
    pub name: &'a str,
    pub genre: &'a str,
    pub goals: &'a str,
    pub passages: &'a [PathBuf],
    pub docs: &'a [PathBuf],
    pub notebooks: &'a [String],
    pub style_guide: &'a str,
    pub test_scene: Option<&'a Path>,
}

/// Walk the project setup wizard to the end and create the project.
///
/// A failed analysis or skill generation is printed as it happens; the wizard
/// then refuses to leave that step and the error names it.
pub async fn run(backend: &dyn Backend, args: InitArgs<'_>) -> Result<()> {
    let mut wizard = fill(&args)?;
    while !wizard.is_last() {
        if let Some(notice) = wizard.advance(backend).await? {
            print_notice(&notice);
        }
        debug!("Project setup at {}", wizard.phase().id);
    }

    if let Some(path) = args.test_scene {
        let scene = read(path)?;
        let run = wizard.test_skill(backend, &scene).await?;
        print_notice(&run.notice);
        if let Some(result) = &run.output {
            print!("{}", score(result));
        }
    }

    let run = wizard.create_project(backend).await?;
    print_notice(&run.notice);
    if let Some(created) = run.output {
        println!("Project id: {}", created.project_id);
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

fn fill(args: &InitArgs<'_>) -> Result<ProjectSetupWizard> {
    let mut wizard = ProjectSetupWizard::project_setup();
    let form = wizard.form_mut();
    form.name = args.name.trim().to_string();
    form.set_genre(args.genre)?;
    form.goals = args.goals.to_string();
    form.style_guide = args.style_guide.to_string();

    for path in args.passages {
        form.add_passage(&read(path)?)
            .with_context(|| format!("Passage {} rejected", path.display()))?;
    }
    for path in args.docs {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        form.add_document(filename, read(path)?);
    }
    for url in args.notebooks {
        form.add_notebook(url)?;
    }
    Ok(wizard)
}

fn score(result: &SkillTestResult) -> String {
    let mut out = String::new();
    let overall = result
        .overall_score
        .map_or_else(|| "N/A".to_string(), |score| format!("{score}/100"));
    let tier = result.quality_tier.as_deref().unwrap_or("N/A");
    let _ = writeln!(out, "Score: {overall} ({tier})");
    for (category, points) in &result.category_scores {
        let _ = writeln!(out, "  {category}: {points}/30");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill::{SetupError, WizardError};
    use quill_client::mock::{MockBackend, MockFailure};
    use std::collections::BTreeMap;
    use tempfile::{tempdir, TempDir};

    fn passages(dir: &TempDir, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.path().join(format!("passage-{i}.txt"));
                fs::write(&path, vec!["tide"; 120].join(" ")).unwrap();
                path
            })
            .collect()
    }

    fn args<'a>(passages: &'a [PathBuf], docs: &'a [PathBuf]) -> InitArgs<'a> {
        InitArgs {
            name: " low-tide ",
            genre: "thriller",
            goals: "",
            passages,
            docs,
            notebooks: &[],
            style_guide: "No adverbs",
            test_scene: None,
        }
    }

    #[tokio::test]
    async fn creates_the_project() {
        let dir = tempdir().unwrap();
        let passages = passages(&dir, 3);
        let doc = dir.path().join("bible.md");
        fs::write(&doc, "Mara lies to everyone.").unwrap();
        let scene = dir.path().join("scene.txt");
        fs::write(&scene, "The pier creaked.").unwrap();
        let docs = [doc];
        let mut args = args(&passages, &docs);
        args.test_scene = Some(scene.as_path());
        let backend = MockBackend::new();

        run(&backend, args).await.unwrap();

        assert_eq!(backend.posted("/api/setup/analyze-voice").len(), 1);
        assert_eq!(backend.posted("/api/setup/test-skill").len(), 1);
        let project = &backend.posted("/api/setup/create-project")[0];
        assert_eq!(project["name"], "low-tide");
        assert_eq!(project["styleGuide"], "No adverbs");
        assert_eq!(project["uploadedDocs"][0]["filename"], "bible.md");
    }

    #[tokio::test]
    async fn too_few_passages_stop_at_voice() {
        let dir = tempdir().unwrap();
        let passages = passages(&dir, 2);
        let backend = MockBackend::new();

        let error = run(&backend, args(&passages, &[])).await.unwrap_err();
        assert_eq!(
            error.downcast_ref::<WizardError>(),
            Some(&WizardError::Incomplete {
                phase: "Voice Input"
            })
        );
        assert!(backend.posted("/api/setup/analyze-voice").is_empty());
    }

    #[tokio::test]
    async fn failed_analysis_stops_before_creating() {
        let dir = tempdir().unwrap();
        let passages = passages(&dir, 3);
        let backend = MockBackend::new();
        backend.fail_next_request(MockFailure::Server);

        let error = run(&backend, args(&passages, &[])).await.unwrap_err();
        assert_eq!(
            error.downcast_ref::<WizardError>(),
            Some(&WizardError::Incomplete {
                phase: "AI Analysis"
            })
        );
        assert!(backend.posted("/api/setup/create-project").is_empty());
    }

    #[test]
    fn short_passage_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.txt");
        fs::write(&path, "Too short.").unwrap();
        let passages = [path];

        let error = fill(&args(&passages, &[])).err().unwrap();
        assert!(error.to_string().contains("short.txt"));
        assert_eq!(
            error.downcast_ref::<SetupError>(),
            Some(&SetupError::PassageTooShort { words: 2 })
        );
    }

    #[test]
    fn renders_scores() {
        let result = SkillTestResult {
            overall_score: Some(72.0),
            quality_tier: None,
            category_scores: BTreeMap::from([("voice".to_string(), 24.0)]),
        };
        assert_eq!(score(&result), "Score: 72/100 (N/A)\n  voice: 24/30\n");
    }
}
