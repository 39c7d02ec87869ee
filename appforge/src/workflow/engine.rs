//! Top-level workflow orchestration
//!
//! Runs the stage graph for one idea:
//!
//! ```text
//! process_idea -> generate_requirements -> { checklist, notes, ui_plan } (join)
//!   -> determine_strategy -> generate_ui -> augment_checklist -> persist
//! ```
//!
//! `process_idea`, `generate_ui` and `persist` abort the run on failure. The
//! other stages fall back to a default and the run continues.

use appforge_sdk::{
    progress_pending, progress_success, CancellationToken, ChatTurn, ProgressSink, RunId,
    TextGenerationProvider,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::artifacts::generator::{ComponentGenerator, GeneratorSettings, UI_NODE};
use crate::artifacts::pipeline::UiPipeline;
use crate::config::ForgeConfig;
use crate::error::{FatalWorkflowError, StageError};
use crate::store::PersistenceStore;
use crate::types::{GenerationContext, Requirements, UiPlan, ValidationIssue};
use crate::workflow::stages::{augment_checklist, StageRunner};
use crate::workflow::state::{
    DegradedStage, Stage, StageOutcome, WorkflowState, CHECKLIST_NODE, NOTES_NODE, UI_PLAN_NODE,
};
use crate::workflow::strategy::Strategy;
use crate::workflow_utils::execute_task;

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub title: String,
    pub strategy: Strategy,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub degraded: Vec<DegradedStage>,
    pub validation_issues: BTreeMap<String, Vec<ValidationIssue>>,
}

pub struct WorkflowEngine {
    stages: StageRunner,
    ui: UiPipeline,
    store: Arc<dyn PersistenceStore>,
    sink: Arc<dyn ProgressSink>,
}

impl WorkflowEngine {
    pub fn new(
        config: &ForgeConfig,
        provider: Arc<dyn TextGenerationProvider>,
        store: Arc<dyn PersistenceStore>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let generator = ComponentGenerator::new(
            provider.clone(),
            sink.clone(),
            GeneratorSettings::from(config),
        );
        Self {
            stages: StageRunner::new(provider, config.temperature),
            ui: UiPipeline::new(generator),
            store,
            sink,
        }
    }

    /// Run the whole graph. Either a complete bundle is persisted or nothing is.
    pub async fn run(
        &self,
        idea: &str,
        history: Vec<ChatTurn>,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FatalWorkflowError> {
        let started_at = Utc::now();
        let mut state = WorkflowState::new(idea, history);
        info!(run_id = %state.run_id, "starting run");

        for node in [
            Stage::ProcessIdea.node_id(),
            Stage::GenerateRequirements.node_id(),
            CHECKLIST_NODE,
            NOTES_NODE,
            UI_PLAN_NODE,
            Stage::DetermineStrategy.node_id(),
            UI_NODE,
            Stage::AugmentChecklist.node_id(),
            Stage::Persist.node_id(),
        ] {
            progress_pending!(self.sink, node);
        }

        match self.drive(&mut state, started_at, cancel).await {
            Ok(report) => {
                info!(run_id = %report.run_id, title = %report.title, "run complete");
                Ok(report)
            }
            Err(err) => {
                state.fail(&err);
                error!(run_id = %state.run_id, stage = %state.stage(), error = %err, "run aborted");
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        state: &mut WorkflowState,
        started_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FatalWorkflowError> {
        // 1. Idea (fatal)
        state.advance(Stage::ProcessIdea)?;
        checkpoint(cancel)?;
        let (idea, history) = (state.idea.clone(), state.history.clone());
        let project = execute_task(&*self.sink, Stage::ProcessIdea.node_id(), None, || async {
            let project = self.stages.process_idea(&idea, &history, cancel).await?;
            let summary = format!("titled \"{}\"", project.title);
            Ok::<_, StageError>((project, summary))
        })
        .await
        .map_err(|e| match e.is_cancelled() {
            true => FatalWorkflowError::Cancelled,
            false => FatalWorkflowError::IdeaProcessing(e.to_string()),
        })?;
        state.merge_project(project.clone());

        // 2. Requirements (degrades to a document built from the idea)
        state.advance(Stage::GenerateRequirements)?;
        checkpoint(cancel)?;
        let requirements = self
            .degrade(
                Stage::GenerateRequirements.node_id(),
                || async {
                    let requirements = self.stages.requirements(&project, cancel).await?;
                    let summary = format!(
                        "{} goals, {} constraints",
                        requirements.goals.len(),
                        requirements.constraints.len()
                    );
                    Ok((requirements, summary))
                },
                Requirements::fallback(&project),
            )
            .await?;
        state.merge_requirements(requirements);
        let requirements = state
            .requirements
            .clone()
            .unwrap_or_else(|| Requirements::fallback(&project));

        // 3-4. Fan-out and join: wait for all three whatever their outcome
        state.advance(Stage::FanOut)?;
        checkpoint(cancel)?;
        let (checklist, notes, plan) = tokio::join!(
            self.degrade(
                CHECKLIST_NODE,
                || async {
                    let items = self.stages.checklist(&requirements, cancel).await?;
                    let summary = format!("{} items", items.len());
                    Ok((items, summary))
                },
                Vec::new(),
            ),
            self.degrade(
                NOTES_NODE,
                || async {
                    let notes = self.stages.notes(&project, &requirements, cancel).await?;
                    Ok((Some(notes), "notes written".to_string()))
                },
                None,
            ),
            self.degrade(
                UI_PLAN_NODE,
                || async {
                    let plan = self.stages.ui_plan(&project, &requirements, cancel).await?;
                    let count = plan.components.as_ref().map_or(0, Vec::len);
                    Ok((plan, format!("{} components planned", count)))
                },
                UiPlan::fallback(),
            ),
        );
        state.merge_fan_out(checklist?, notes?, plan?);
        checkpoint(cancel)?;

        // 5. Strategy (pure)
        state.advance(Stage::DetermineStrategy)?;
        let plan = state.ui_plan.clone().unwrap_or_else(UiPlan::fallback);
        let strategy = Strategy::determine(&plan);
        state.merge_strategy(strategy);
        progress_success!(self.sink, Stage::DetermineStrategy.node_id(), strategy.to_string());

        // 6. UI (fatal only when every strategy fails)
        state.advance(Stage::GenerateUi)?;
        checkpoint(cancel)?;
        let ctx = GenerationContext {
            title: project.title.clone(),
            description: project.description.clone(),
            known_names: Vec::new(),
            tokens: plan.design.clone().unwrap_or_default(),
            guidance: plan.layout.as_ref().map(|l| format!("Layout: {}", l)),
            single_file: false,
        };
        let outcome = execute_task(&*self.sink, UI_NODE, None, || async {
            let outcome = self.ui.run(strategy, &plan, &ctx, cancel).await?;
            let summary = format!(
                "{} artifacts ({} dropped)",
                outcome.bundle.generated().count(),
                outcome.failures.len()
            );
            Ok::<_, FatalWorkflowError>((outcome, summary))
        })
        .await?;
        state.merge_strategy(outcome.strategy);
        state.merge_bundle(outcome.bundle);

        // 7. Checklist augmentation (deterministic)
        state.advance(Stage::AugmentChecklist)?;
        if let Some(bundle) = &state.bundle {
            let rows = augment_checklist(bundle);
            let summary = format!("{} implementation rows", rows.len());
            state.merge_checklist_rows(rows);
            progress_success!(self.sink, Stage::AugmentChecklist.node_id(), summary);
        }

        // 8. Persist (fatal); a cancelled run never reaches the store
        state.advance(Stage::Persist)?;
        checkpoint(cancel)?;
        let bundle = state
            .bundle
            .take()
            .ok_or_else(|| FatalWorkflowError::UiGeneration("no bundle produced".to_string()))?
            .with_documents(state.documents());
        let run_id = state.run_id;
        execute_task(&*self.sink, Stage::Persist.node_id(), None, || async {
            self.store.save(run_id, &bundle).await?;
            Ok::<_, FatalWorkflowError>(((), format!("saved run {}", run_id)))
        })
        .await?;
        state.advance(Stage::Done)?;

        Ok(RunReport {
            run_id,
            title: project.title,
            strategy: state.strategy.unwrap_or(strategy),
            started_at,
            finished_at: Utc::now(),
            degraded: state.degraded.clone(),
            validation_issues: state.validation_issues.clone(),
        })
    }

    /// Run a soft stage; on failure substitute `fallback` and record why
    async fn degrade<T, F, Fut>(
        &self,
        node: &str,
        executor: F,
        fallback: T,
    ) -> Result<StageOutcome<T>, FatalWorkflowError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(T, String), StageError>>,
    {
        match execute_task(&*self.sink, node, None, executor).await {
            Ok(value) => Ok(StageOutcome::Produced(value)),
            Err(e) if e.is_cancelled() => Err(FatalWorkflowError::Cancelled),
            Err(e) => {
                warn!(stage = node, error = %e, "stage degraded to default");
                Ok(StageOutcome::Degraded {
                    value: fallback,
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), FatalWorkflowError> {
    if cancel.is_cancelled() {
        return Err(FatalWorkflowError::Cancelled);
    }
    Ok(())
}
