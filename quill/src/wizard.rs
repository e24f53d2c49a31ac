//! Step-by-step wizards.
//!
//! A [`Wizard`] walks an ordered list of [`Phase`]s over one form value. Moving
//! forward requires the current phase's predicate to hold; moving back is
//! always allowed. The form is kept as-is while navigating, so going back
//! shows what was entered before.
//!
//! A wizard always has at least one phase; [`Wizard::new`] refuses an empty
//! list.

use quill_client::{Backend, Notice, NoticeContext};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("A wizard needs at least one step")]
    NoPhases,
    #[error("{phase} is missing required fields")]
    Incomplete { phase: &'static str },
    #[error("Already at the last step")]
    AtLastPhase,
    #[error("Finish the remaining steps first")]
    NotAtLastPhase,
    #[error("Failed to encode the form: {0}")]
    Encode(String),
}

pub struct Phase<F> {
    pub id: &'static str,
    pub label: &'static str,
    is_complete: fn(&F) -> bool,
}

impl<F> Phase<F> {
    pub const fn new(id: &'static str, label: &'static str, is_complete: fn(&F) -> bool) -> Self {
        Self {
            id,
            label,
            is_complete,
        }
    }

    pub fn is_complete(&self, form: &F) -> bool {
        (self.is_complete)(form)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Done,
    Current,
    Upcoming,
}

pub struct Wizard<F> {
    phases: Vec<Phase<F>>,
    current: usize,
    form: F,
}

/// Result of submitting the last phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    pub notice: Notice,
    /// Backend response on success.
    pub response: Option<serde_json::Value>,
}

impl<F> Wizard<F> {
    pub fn new(phases: Vec<Phase<F>>, form: F) -> Result<Self, WizardError> {
        if phases.is_empty() {
            return Err(WizardError::NoPhases);
        }
        Ok(Self::with_phases(phases, form))
    }

    /// For the built-in wizards, whose phase lists are never empty.
    pub(crate) fn with_phases(phases: Vec<Phase<F>>, form: F) -> Self {
        debug_assert!(!phases.is_empty());
        Self {
            phases,
            current: 0,
            form,
        }
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn phase(&self) -> &Phase<F> {
        &self.phases[self.current]
    }

    pub fn phases(&self) -> &[Phase<F>] {
        &self.phases
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.phases.len()
    }

    pub fn is_current_complete(&self) -> bool {
        self.phase().is_complete(&self.form)
    }

    /// Whether Next is enabled.
    pub fn can_next(&self) -> bool {
        !self.is_last() && self.is_current_complete()
    }

    /// Whether Back is enabled.
    pub fn can_back(&self) -> bool {
        self.current > 0
    }

    pub fn next(&mut self) -> Result<(), WizardError> {
        if self.is_last() {
            return Err(WizardError::AtLastPhase);
        }
        if !self.is_current_complete() {
            return Err(WizardError::Incomplete {
                phase: self.phase().label,
            });
        }
        self.current += 1;
        Ok(())
    }

    /// Step back one phase. Does nothing on the first phase.
    pub fn back(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn steps(&self) -> impl Iterator<Item = (&Phase<F>, StepState)> {
        self.phases.iter().enumerate().map(move |(i, phase)| {
            let state = match i.cmp(&self.current) {
                std::cmp::Ordering::Less => StepState::Done,
                std::cmp::Ordering::Equal => StepState::Current,
                std::cmp::Ordering::Greater => StepState::Upcoming,
            };
            (phase, state)
        })
    }
}

impl<F: Serialize> Wizard<F> {
    /// Submit the form from the last phase.
    ///
    /// Backend failures come back as an error notice; the wizard stays where
    /// it is with the form intact so the author can try again.
    pub async fn finalize(&self, backend: &dyn Backend) -> Result<Finalized, WizardError> {
        if !self.is_last() {
            return Err(WizardError::NotAtLastPhase);
        }
        if !self.is_current_complete() {
            return Err(WizardError::Incomplete {
                phase: self.phase().label,
            });
        }
        let form =
            serde_json::to_value(&self.form).map_err(|e| WizardError::Encode(e.to_string()))?;

        match backend.complete_wizard(&form).await {
            Ok(response) => {
                info!("Wizard submitted");
                Ok(Finalized {
                    notice: Notice::success("Project created successfully!"),
                    response: Some(response),
                })
            },
            Err(error) => {
                warn!("Wizard submission failed: {}", error);
                Ok(Finalized {
                    notice: Notice::from_error(&error, NoticeContext::Generation),
                    response: None,
                })
            },
        }
    }
}

/// Answers collected by the project creation wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationForm {
    pub title: String,
    pub genre: String,
    pub premise: String,
    pub themes: String,

    pub protagonist: String,
    pub antagonist: String,
    pub supporting_cast: String,

    pub setting: String,
    pub world_rules: String,
    pub atmosphere: String,

    pub act_structure: String,
    pub target_length: String,
    pub pacing: String,
}

impl Default for CreationForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            genre: String::new(),
            premise: String::new(),
            themes: String::new(),
            protagonist: String::new(),
            antagonist: String::new(),
            supporting_cast: String::new(),
            setting: String::new(),
            world_rules: String::new(),
            atmosphere: String::new(),
            act_structure: "3-act".to_string(),
            target_length: "novel".to_string(),
            pacing: "medium".to_string(),
        }
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

impl CreationForm {
    /// Set a field by its wire name. Returns `false` for an unknown field.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        let slot = match field {
            "title" => &mut self.title,
            "genre" => &mut self.genre,
            "premise" => &mut self.premise,
            "themes" => &mut self.themes,
            "protagonist" => &mut self.protagonist,
            "antagonist" => &mut self.antagonist,
            "supportingCast" | "supporting_cast" => &mut self.supporting_cast,
            "setting" => &mut self.setting,
            "worldRules" | "world_rules" => &mut self.world_rules,
            "atmosphere" => &mut self.atmosphere,
            "actStructure" | "act_structure" => &mut self.act_structure,
            "targetLength" | "target_length" => &mut self.target_length,
            "pacing" => &mut self.pacing,
            _ => return false,
        };
        *slot = value.into();
        true
    }
}

pub fn creation_phases() -> Vec<Phase<CreationForm>> {
    vec![
        Phase::new("foundation", "Foundation", |form| {
            filled(&form.title) && filled(&form.genre) && filled(&form.premise)
        }),
        Phase::new("characters", "Characters", |form| filled(&form.protagonist)),
        Phase::new("world", "World", |form| filled(&form.setting)),
        Phase::new("structure", "Structure", |_| true),
    ]
}

pub type CreationWizard = Wizard<CreationForm>;

impl CreationWizard {
    pub fn creation() -> Self {
        Wizard::with_phases(creation_phases(), CreationForm::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_client::{
        mock::{MockBackend, MockFailure},
        Level,
    };

    fn through_to_structure() -> CreationWizard {
        let mut wizard = CreationWizard::creation();
        let form = wizard.form_mut();
        form.title = "The Explants".into();
        form.genre = "Literary SF".into();
        form.premise = "A colony ship that never left orbit.".into();
        wizard.next().unwrap();
        wizard.form_mut().protagonist = "Mickey".into();
        wizard.next().unwrap();
        wizard.form_mut().setting = "Low orbit".into();
        wizard.next().unwrap();
        wizard
    }

    #[test]
    fn next_is_gated_by_required_fields() {
        let mut wizard = CreationWizard::creation();
        assert!(!wizard.can_next());
        assert_eq!(
            wizard.next(),
            Err(WizardError::Incomplete {
                phase: "Foundation"
            })
        );

        wizard.form_mut().title = "The Explants".into();
        wizard.form_mut().genre = "Literary SF".into();
        wizard.form_mut().premise = "   ".into();
        assert!(!wizard.can_next());

        wizard.form_mut().premise = "A colony ship.".into();
        assert!(wizard.can_next());
        wizard.next().unwrap();
        assert_eq!(wizard.phase().id, "characters");
    }

    #[test]
    fn empty_phase_list_is_rejected() {
        let wizard = Wizard::new(Vec::<Phase<CreationForm>>::new(), CreationForm::default());
        assert_eq!(wizard.err(), Some(WizardError::NoPhases));

        let single = Wizard::new(
            vec![Phase::new("only", "Only", |_: &CreationForm| true)],
            CreationForm::default(),
        )
        .unwrap();
        assert!(single.is_last());
        assert!(!single.can_next());
    }

    #[test]
    fn back_keeps_values_and_reenables_next() {
        let mut wizard = CreationWizard::creation();
        assert!(!wizard.can_back());
        wizard.back();
        assert_eq!(wizard.index(), 0);

        wizard.form_mut().title = "T".into();
        wizard.form_mut().genre = "G".into();
        wizard.form_mut().premise = "P".into();
        wizard.next().unwrap();
        assert!(!wizard.can_next());

        wizard.back();
        assert_eq!(wizard.phase().id, "foundation");
        assert_eq!(wizard.form().title, "T");
        assert!(wizard.can_next());
    }

    #[test]
    fn step_states() {
        let wizard = through_to_structure();
        let states: Vec<_> = wizard.steps().map(|(_, state)| state).collect();
        assert_eq!(states, [
            StepState::Done,
            StepState::Done,
            StepState::Done,
            StepState::Current
        ]);
        assert!(wizard.is_last());
        let mut wizard = wizard;
        assert_eq!(wizard.next(), Err(WizardError::AtLastPhase));
    }

    #[test]
    fn form_serializes_with_wire_names() {
        let mut form = CreationForm::default();
        assert!(form.set("supportingCast", "The crew"));
        assert!(!form.set("mood", "grim"));

        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["supportingCast"], "The crew");
        assert_eq!(json["actStructure"], "3-act");
        assert_eq!(json["targetLength"], "novel");
        assert_eq!(json["pacing"], "medium");
    }

    #[tokio::test]
    async fn finalize_only_from_last_phase() {
        let backend = MockBackend::new();
        let wizard = CreationWizard::creation();
        assert_eq!(
            wizard.finalize(&backend).await,
            Err(WizardError::NotAtLastPhase)
        );
        assert!(backend.wizard_submissions().is_empty());
    }

    #[tokio::test]
    async fn finalize_submits_accumulated_form() {
        let backend = MockBackend::new();
        let wizard = through_to_structure();

        let finalized = wizard.finalize(&backend).await.unwrap();
        assert_eq!(finalized.notice.level, Level::Success);
        assert_eq!(finalized.response.unwrap()["project_id"], "project-1");

        let submitted = &backend.wizard_submissions()[0];
        assert_eq!(submitted["title"], "The Explants");
        assert_eq!(submitted["protagonist"], "Mickey");
        assert_eq!(submitted["setting"], "Low orbit");
    }

    #[tokio::test]
    async fn finalize_failure_becomes_notice() {
        let backend = MockBackend::new();
        backend.fail_next_request(MockFailure::Unreachable);
        let wizard = through_to_structure();

        let finalized = wizard.finalize(&backend).await.unwrap();
        assert!(finalized.notice.is_error());
        assert_eq!(finalized.notice.title, "Connection Error");
        assert!(finalized.response.is_none());
        assert_eq!(wizard.form().title, "The Explants");
    }
}
