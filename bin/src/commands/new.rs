use crate::{app::print_notice, cli::split_pair};
use anyhow::{bail, Result};
use quill::{CreationWizard, StepState};
use quill_client::Backend;
use std::fmt::Write;
use tracing::debug;

/// Fill the creation wizard from `field=value` pairs and submit it.
pub async fn run(backend: &dyn Backend, fields: &[String]) -> Result<()> {
    let mut wizard = fill(fields)?;

    while !wizard.is_last() {
        if let Err(error) = wizard.next() {
            print!("{}", steps(&wizard));
            return Err(error.into());
        }
        debug!("Wizard at {}", wizard.phase().id);
    }
    print!("{}", steps(&wizard));

    let finalized = wizard.finalize(backend).await?;
    print_notice(&finalized.notice);
    if let Some(project) = finalized
        .response
        .as_ref()
        .and_then(|response| response.get("project_id"))
        .and_then(|id| id.as_str())
    {
        println!("Project id: {project}");
        println!("Next: quill setup {project} --notebook-url <url>");
    }
    Ok(())
}

fn fill(fields: &[String]) -> Result<CreationWizard> {
    let mut wizard = CreationWizard::creation();
    for pair in fields {
        let Some((field, value)) = split_pair(pair) else {
            bail!("Expected field=value, got {pair:?}");
        };
        if !wizard.form_mut().set(field, value) {
            bail!("Unknown field {field:?}");
        }
    }
    Ok(wizard)
}

fn steps(wizard: &CreationWizard) -> String {
    let mut out = String::new();
    for (phase, state) in wizard.steps() {
        let mark = match state {
            StepState::Done => "x",
            StepState::Current => ">",
            StepState::Upcoming => " ",
        };
        let _ = writeln!(out, "[{mark}] {}", phase.label);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill::WizardError;
    use quill_client::mock::MockBackend;

    fn pairs(pairs: &[&str]) -> Vec<String> {
        pairs.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn submits_a_complete_form() {
        let backend = MockBackend::new();
        let fields = pairs(&[
            "title=Low Tide",
            "genre=Thriller",
            "premise=A harbor town hides a drowning",
            "protagonist=Mara",
            "setting=Fishing village",
            "pacing=fast",
        ]);

        run(&backend, &fields).await.unwrap();

        let submitted = backend.wizard_submissions().remove(0);
        assert_eq!(submitted["title"], "Low Tide");
        assert_eq!(submitted["pacing"], "fast");
        assert_eq!(submitted["actStructure"], "3-act");
    }

    #[tokio::test]
    async fn stops_at_the_first_incomplete_phase() {
        let backend = MockBackend::new();
        let fields = pairs(&["title=Low Tide", "genre=Thriller", "premise=Drowning"]);

        let error = run(&backend, &fields).await.unwrap_err();

        assert_eq!(
            error.downcast_ref::<WizardError>(),
            Some(&WizardError::Incomplete {
                phase: "Characters"
            })
        );
        assert!(backend.wizard_submissions().is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(fill(&pairs(&["mood=grim"])).is_err());
        assert!(fill(&pairs(&["title"])).is_err());
    }

    #[test]
    fn renders_step_marks() {
        let mut wizard = fill(&pairs(&["title=T", "genre=G", "premise=P"])).unwrap();
        wizard.next().unwrap();
        assert_eq!(
            steps(&wizard),
            "[x] Foundation\n[>] Characters\n[ ] World\n[ ] Structure\n"
        );
    }
}
