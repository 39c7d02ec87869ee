//! Text stages of the workflow.
//!
//! Each stage makes one provider call and parses the result. The stages only
//! report failure; whether a failure aborts the run or degrades to a default
//! is decided by the engine.

use appforge_sdk::{
    CancellationToken, ChatMessage, ChatTurn, GenerationOptions, TextGenerationProvider,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::artifacts::prompts;
use crate::error::StageError;
use crate::types::{Bundle, ChecklistItem, ChecklistSource, ProjectIdea, Requirements, UiPlan};
use crate::workflow_utils::parse_structured;

#[derive(Debug, Deserialize)]
struct IdeaDraft {
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RequirementsDraft {
    document: String,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    constraints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChecklistRow {
    title: String,
    #[serde(default)]
    detail: Option<String>,
}

pub struct StageRunner {
    provider: Arc<dyn TextGenerationProvider>,
    temperature: f32,
}

impl StageRunner {
    pub fn new(provider: Arc<dyn TextGenerationProvider>, temperature: f32) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    async fn ask(
        &self,
        system: String,
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, StageError> {
        let options = GenerationOptions::default()
            .with_system(system)
            .with_temperature(self.temperature);
        let text = self.provider.complete(&messages, &options, cancel).await?;
        debug!(provider = self.provider.name(), chars = text.len(), "stage reply");
        Ok(text)
    }

    /// Normalize the idea and give it a title
    pub async fn process_idea(
        &self,
        idea: &str,
        history: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<ProjectIdea, StageError> {
        if idea.trim().is_empty() {
            return Err(StageError::Parse("idea is empty".to_string()));
        }

        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(idea));
        let reply = self.ask(prompts::idea_system(), messages, cancel).await?;

        let draft: IdeaDraft = parse(&reply)?;
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(StageError::Parse("idea has no title".to_string()));
        }
        let description = match draft.description.trim() {
            "" => idea.trim().to_string(),
            text => text.to_string(),
        };
        Ok(ProjectIdea { title, description })
    }

    pub async fn requirements(
        &self,
        project: &ProjectIdea,
        cancel: &CancellationToken,
    ) -> Result<Requirements, StageError> {
        let reply = self
            .ask(
                prompts::requirements_system(),
                vec![ChatMessage::user(brief(project))],
                cancel,
            )
            .await?;

        let draft: RequirementsDraft = parse(&reply)?;
        if draft.document.trim().is_empty() {
            return Err(StageError::Parse("empty requirements document".to_string()));
        }
        Ok(Requirements {
            markdown: draft.document,
            goals: draft.goals,
            constraints: draft.constraints,
        })
    }

    /// Empty without a provider call when the requirements list no goals or constraints
    pub async fn checklist(
        &self,
        requirements: &Requirements,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChecklistItem>, StageError> {
        if !requirements.has_goals_or_constraints() {
            return Ok(Vec::new());
        }

        let mut request = String::from("Goals:\n");
        for goal in &requirements.goals {
            request.push_str(&format!("- {}\n", goal));
        }
        request.push_str("Constraints:\n");
        for constraint in &requirements.constraints {
            request.push_str(&format!("- {}\n", constraint));
        }

        let reply = self
            .ask(prompts::checklist_system(), vec![ChatMessage::user(request)], cancel)
            .await?;
        let rows: Vec<ChecklistRow> = parse(&reply)?;

        Ok(rows
            .into_iter()
            .filter(|row| !row.title.trim().is_empty())
            .map(|row| ChecklistItem {
                title: row.title.trim().to_string(),
                detail: row.detail,
                done: false,
                source: ChecklistSource::Requirements,
            })
            .collect())
    }

    pub async fn notes(
        &self,
        project: &ProjectIdea,
        requirements: &Requirements,
        cancel: &CancellationToken,
    ) -> Result<String, StageError> {
        let request = format!("{}\n\n{}", brief(project), requirements.markdown);
        let reply = self
            .ask(prompts::notes_system(), vec![ChatMessage::user(request)], cancel)
            .await?;

        let notes = reply.trim();
        if notes.is_empty() {
            return Err(StageError::Parse("empty notes".to_string()));
        }
        Ok(notes.to_string())
    }

    pub async fn ui_plan(
        &self,
        project: &ProjectIdea,
        requirements: &Requirements,
        cancel: &CancellationToken,
    ) -> Result<UiPlan, StageError> {
        let request = format!("{}\n\n{}", brief(project), requirements.markdown);
        let reply = self
            .ask(prompts::ui_plan_system(), vec![ChatMessage::user(request)], cancel)
            .await?;
        parse(&reply)
    }
}

/// One implementation row per generated artifact
pub fn augment_checklist(bundle: &Bundle) -> Vec<ChecklistItem> {
    bundle
        .generated()
        .map(|artifact| ChecklistItem {
            title: format!("Implement {} ({})", artifact.name, artifact.kind.label()),
            detail: Some(format!("Generated as {}", artifact.filename)),
            done: true,
            source: ChecklistSource::Implementation,
        })
        .collect()
}

fn brief(project: &ProjectIdea) -> String {
    format!("# {}\n\n{}", project.title, project.description)
}

fn parse<T: serde::de::DeserializeOwned>(reply: &str) -> Result<T, StageError> {
    parse_structured(reply).map_err(|e| StageError::Parse(format!("{:#}", e)))
}
