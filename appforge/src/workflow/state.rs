//! Per-run workflow state and its merge functions

use appforge_sdk::{ChatTurn, RunId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::FatalWorkflowError;
use crate::types::{
    Bundle, ChecklistItem, ProjectDocuments, ProjectIdea, Requirements, UiPlan, ValidationIssue,
};
use crate::workflow::strategy::Strategy;

/// Progress nodes of the three fan-out branches
pub const CHECKLIST_NODE: &str = "generate_checklist";
pub const NOTES_NODE: &str = "generate_notes";
pub const UI_PLAN_NODE: &str = "generate_ui_plan";

/// Stages in declared dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    ProcessIdea,
    GenerateRequirements,
    /// Checklist, notes and UI plan, joined
    FanOut,
    DetermineStrategy,
    GenerateUi,
    AugmentChecklist,
    Persist,
    Done,
}

impl Stage {
    pub fn node_id(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::ProcessIdea => "process_idea",
            Stage::GenerateRequirements => "generate_requirements",
            Stage::FanOut => "fan_out",
            Stage::DetermineStrategy => "determine_strategy",
            Stage::GenerateUi => "generate_ui",
            Stage::AugmentChecklist => "augment_checklist",
            Stage::Persist => "persist",
            Stage::Done => "done",
        }
    }

    pub fn next(&self) -> Option<Stage> {
        Some(match self {
            Stage::Start => Stage::ProcessIdea,
            Stage::ProcessIdea => Stage::GenerateRequirements,
            Stage::GenerateRequirements => Stage::FanOut,
            Stage::FanOut => Stage::DetermineStrategy,
            Stage::DetermineStrategy => Stage::GenerateUi,
            Stage::GenerateUi => Stage::AugmentChecklist,
            Stage::AugmentChecklist => Stage::Persist,
            Stage::Persist => Stage::Done,
            Stage::Done => return None,
        })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_id())
    }
}

/// A stage that failed and was replaced by its documented default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedStage {
    pub stage: String,
    pub reason: String,
}

/// A stage result: either the real output or a default standing in for it
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Produced(T),
    Degraded { value: T, reason: String },
}

pub struct WorkflowState {
    pub run_id: RunId,
    pub idea: String,
    pub history: Vec<ChatTurn>,
    stage: Stage,
    pub project: Option<ProjectIdea>,
    pub requirements: Option<Requirements>,
    pub checklist: Vec<ChecklistItem>,
    pub notes: Option<String>,
    pub ui_plan: Option<UiPlan>,
    pub strategy: Option<Strategy>,
    pub bundle: Option<Bundle>,
    pub validation_issues: BTreeMap<String, Vec<ValidationIssue>>,
    pub degraded: Vec<DegradedStage>,
    pub fatal_error: Option<String>,
}

impl WorkflowState {
    pub fn new(idea: impl Into<String>, history: Vec<ChatTurn>) -> Self {
        Self {
            run_id: RunId::new(),
            idea: idea.into(),
            history,
            stage: Stage::Start,
            project: None,
            requirements: None,
            checklist: Vec::new(),
            notes: None,
            ui_plan: None,
            strategy: None,
            bundle: None,
            validation_issues: BTreeMap::new(),
            degraded: Vec::new(),
            fatal_error: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `to`, which must be the stage directly after the current one
    pub fn advance(&mut self, to: Stage) -> Result<(), FatalWorkflowError> {
        if self.stage.next() != Some(to) {
            return Err(FatalWorkflowError::InvalidTransition {
                from: self.stage.to_string(),
                to: to.to_string(),
            });
        }
        self.stage = to;
        Ok(())
    }

    fn record<T>(&mut self, node: &str, outcome: StageOutcome<T>) -> T {
        match outcome {
            StageOutcome::Produced(value) => value,
            StageOutcome::Degraded { value, reason } => {
                self.degraded.push(DegradedStage {
                    stage: node.to_string(),
                    reason,
                });
                value
            }
        }
    }

    pub fn merge_project(&mut self, project: ProjectIdea) {
        self.project = Some(project);
    }

    pub fn merge_requirements(&mut self, outcome: StageOutcome<Requirements>) {
        let requirements = self.record(Stage::GenerateRequirements.node_id(), outcome);
        self.requirements = Some(requirements);
    }

    /// Join point of the fan-out; every branch is merged whatever its outcome
    pub fn merge_fan_out(
        &mut self,
        checklist: StageOutcome<Vec<ChecklistItem>>,
        notes: StageOutcome<Option<String>>,
        plan: StageOutcome<UiPlan>,
    ) {
        self.checklist = self.record(CHECKLIST_NODE, checklist);
        self.notes = self.record(NOTES_NODE, notes);
        self.ui_plan = Some(self.record(UI_PLAN_NODE, plan));
    }

    pub fn merge_strategy(&mut self, strategy: Strategy) {
        self.strategy = Some(strategy);
    }

    /// The UI stage owns the bundle; the issue map is taken from it
    pub fn merge_bundle(&mut self, bundle: Bundle) {
        self.validation_issues = bundle.issues.clone();
        self.bundle = Some(bundle);
    }

    /// Appends rows whose title is not already present
    pub fn merge_checklist_rows(&mut self, rows: Vec<ChecklistItem>) {
        for row in rows {
            if !self.checklist.iter().any(|c| c.title == row.title) {
                self.checklist.push(row);
            }
        }
    }

    pub fn fail(&mut self, error: &FatalWorkflowError) {
        self.fatal_error = Some(error.to_string());
    }

    /// Text documents for persistence
    pub fn documents(&self) -> ProjectDocuments {
        let (title, description) = match &self.project {
            Some(p) => (p.title.clone(), p.description.clone()),
            None => (String::new(), self.idea.clone()),
        };
        ProjectDocuments {
            title,
            description,
            requirements: self
                .requirements
                .as_ref()
                .map(|r| r.markdown.clone())
                .unwrap_or_default(),
            checklist: self.checklist.clone(),
            notes: self.notes.clone(),
        }
    }
}
