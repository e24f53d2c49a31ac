/// Knowledge categories the setup assistant walks through, in order.
pub const CATEGORIES: [&str; 8] = [
    "Characters",
    "Story Structure",
    "World Building",
    "Themes & Philosophy",
    "Voice & Craft",
    "Antagonism & Conflict",
    "Key Beats & Pacing",
    "Research & Setting Specifics",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStep {
    pub name: &'static str,
    pub status: StepStatus,
}

/// Category progress shown beside the assistant chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupProgress {
    steps: Vec<ProgressStep>,
}

impl Default for SetupProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupProgress {
    /// All categories pending except the first, which is in progress.
    pub fn new() -> Self {
        let mut progress = Self {
            steps: CATEGORIES
                .iter()
                .map(|&name| ProgressStep {
                    name,
                    status: StepStatus::Pending,
                })
                .collect(),
        };
        progress.advance_to(0);
        progress
    }

    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    /// Everything before `index` is complete, `index` is in progress.
    ///
    /// An index past the end marks every category complete.
    pub fn advance_to(&mut self, index: usize) {
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.status = match i.cmp(&index) {
                std::cmp::Ordering::Less => StepStatus::Complete,
                std::cmp::Ordering::Equal => StepStatus::InProgress,
                std::cmp::Ordering::Greater => StepStatus::Pending,
            };
        }
    }

    pub fn complete_all(&mut self) {
        self.advance_to(self.steps.len());
    }

    pub fn current(&self) -> Option<&ProgressStep> {
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::InProgress)
    }

    pub fn completed(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Complete)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.completed() == self.steps.len()
    }
}
