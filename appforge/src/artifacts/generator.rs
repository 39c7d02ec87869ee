//! Generation of one artifact with validation and escalating retries

use appforge_sdk::{
    progress_pending, CancellationToken, ChatMessage, GenerationOptions, ProgressSink,
    TextGenerationProvider,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::artifacts::prompts;
use crate::artifacts::sanitize::{sanitize, SanitizeTarget};
use crate::artifacts::validate::validate;
use crate::config::ForgeConfig;
use crate::error::GenerateError;
use crate::types::{
    ArtifactFailure, ArtifactKind, ArtifactSpec, GeneratedArtifact, GenerationContext, IssueKind,
    ValidationIssue,
};
use crate::workflow_utils::{execute_batch, execute_task};

/// Progress node of the UI stage; every artifact node hangs off it
pub const UI_NODE: &str = "generate_ui";

pub fn artifact_node(name: &str) -> String {
    format!("artifact:{}", name)
}

/// Node for a spec in this context; the single-artifact container gets its
/// own node so a fallback never reopens a node that already failed
fn node_for(spec: &ArtifactSpec, ctx: &GenerationContext) -> String {
    if ctx.single_file {
        format!("{}:single", artifact_node(&spec.name))
    } else {
        artifact_node(&spec.name)
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Retries after the first attempt
    pub max_attempts: usize,
    pub concurrency: usize,
    pub min_content_len: usize,
    pub temperature: f32,
    pub strict_temperature: f32,
}

impl From<&ForgeConfig> for GeneratorSettings {
    fn from(config: &ForgeConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            concurrency: config.concurrency,
            min_content_len: config.min_content_len,
            temperature: config.temperature,
            strict_temperature: config.strict_temperature,
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self::from(&ForgeConfig::default())
    }
}

/// Outcome of a batch: what was produced and what was dropped
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub artifacts: Vec<GeneratedArtifact>,
    pub failures: Vec<ArtifactFailure>,
}

impl BatchOutcome {
    pub fn extend(&mut self, other: BatchOutcome) {
        self.artifacts.extend(other.artifacts);
        self.failures.extend(other.failures);
    }
}

#[derive(Clone)]
pub struct ComponentGenerator {
    provider: Arc<dyn TextGenerationProvider>,
    sink: Arc<dyn ProgressSink>,
    settings: GeneratorSettings,
}

impl ComponentGenerator {
    pub fn new(
        provider: Arc<dyn TextGenerationProvider>,
        sink: Arc<dyn ProgressSink>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            provider,
            sink,
            settings,
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Validate an artifact against its own declared name
    pub fn validate(&self, artifact: &GeneratedArtifact) -> Vec<ValidationIssue> {
        validate(&artifact.name, &artifact.content, self.settings.min_content_len)
    }

    /// Generate one artifact.
    ///
    /// Makes at most `max_attempts + 1` provider calls. Attempt 0 uses the
    /// standard instruction; later attempts use the strict instruction built
    /// from the previous attempt's issues. Mechanically fixable issues
    /// (missing binding, fence leakage) are repaired by sanitation and kept
    /// on the artifact as a record.
    pub async fn generate(
        &self,
        spec: &ArtifactSpec,
        ctx: &GenerationContext,
        cancel: &CancellationToken,
    ) -> Result<GeneratedArtifact, GenerateError> {
        let node = node_for(spec, ctx);
        execute_task(&*self.sink, &node, Some(UI_NODE), || async {
            let artifact = self.attempt_all(spec, ctx, cancel).await?;
            let summary = match artifact.issues.len() {
                0 => format!("{} ready", artifact.filename),
                n => format!("{} ready ({} repaired)", artifact.filename, n),
            };
            Ok::<_, GenerateError>((artifact, summary))
        })
        .await
    }

    async fn attempt_all(
        &self,
        spec: &ArtifactSpec,
        ctx: &GenerationContext,
        cancel: &CancellationToken,
    ) -> Result<GeneratedArtifact, GenerateError> {
        let base_system = match spec.kind {
            ArtifactKind::Container if ctx.single_file => prompts::single_file_system(),
            _ => prompts::component_system(),
        };
        let request = [ChatMessage::user(prompts::component_request(spec, ctx))];
        let target = SanitizeTarget {
            name: &spec.name,
            known_names: &ctx.known_names,
        };

        let total = self.settings.max_attempts + 1;
        let mut feedback: Vec<ValidationIssue> = Vec::new();
        let mut remaining: Vec<ValidationIssue> = Vec::new();
        let mut attempts = 0;

        while attempts < total {
            if cancel.is_cancelled() {
                return Err(GenerateError::Cancelled);
            }
            let attempt = attempts;
            attempts += 1;

            let options = if attempt == 0 {
                GenerationOptions::default()
                    .with_system(base_system.clone())
                    .with_temperature(self.settings.temperature)
            } else {
                GenerationOptions::default()
                    .with_system(prompts::strict_system(&base_system, &feedback))
                    .with_temperature(self.settings.strict_temperature)
            };

            let raw = match self.provider.complete(&request, &options, cancel).await {
                Ok(text) => text,
                Err(err) => {
                    if let Some(cancelled) = GenerateError::from_provider(err.clone()) {
                        return Err(cancelled);
                    }
                    warn!(artifact = %spec.name, attempt, error = %err, "provider call failed");
                    remaining = vec![ValidationIssue::new(
                        IssueKind::Incomplete,
                        format!("no output: {}", err),
                    )];
                    feedback = remaining.clone();
                    if err.is_transient() {
                        continue;
                    }
                    break;
                }
            };

            let raw_issues = validate(&spec.name, &raw, self.settings.min_content_len);
            let content = sanitize(&raw, &target);
            remaining = validate(&spec.name, &content, self.settings.min_content_len);

            if remaining.iter().any(|i| i.kind.is_fatal()) {
                debug!(
                    artifact = %spec.name,
                    attempt,
                    issues = remaining.len(),
                    "attempt rejected"
                );
                feedback = raw_issues;
                continue;
            }

            let mut issues: Vec<ValidationIssue> = raw_issues
                .into_iter()
                .filter(|i| !i.kind.is_fatal())
                .filter(|i| !remaining.iter().any(|r| r.kind == i.kind))
                .collect();
            issues.extend(remaining);

            return Ok(GeneratedArtifact::from_spec(spec, content, issues));
        }

        Err(GenerateError::Exhausted {
            name: spec.name.clone(),
            attempts,
            issues: remaining,
        })
    }

    /// Generate a set of specs with bounded parallelism.
    ///
    /// Every spec gets a `pending` event before any work starts. Exhausted
    /// specs become failures; cancellation aborts the whole batch.
    pub async fn generate_all(
        &self,
        specs: Vec<ArtifactSpec>,
        ctx: &GenerationContext,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, GenerateError> {
        for spec in &specs {
            progress_pending!(self.sink, node_for(spec, ctx), parent = UI_NODE);
        }

        let results = execute_batch(specs, self.settings.concurrency, |spec, task| async move {
            debug!(
                artifact = %spec.name,
                "generating {}/{}",
                task.task_number,
                task.total_tasks
            );
            let result = self.generate(&spec, ctx, cancel).await;
            (spec, result)
        })
        .await;

        let mut outcome = BatchOutcome::default();
        for (spec, result) in results {
            match result {
                Ok(artifact) => outcome.artifacts.push(artifact),
                Err(GenerateError::Cancelled) => return Err(GenerateError::Cancelled),
                Err(GenerateError::Exhausted { issues, attempts, .. }) => {
                    warn!(artifact = %spec.name, attempts, "dropping artifact");
                    outcome.failures.push(ArtifactFailure {
                        filename: spec.filename(),
                        name: spec.name,
                        kind: spec.kind,
                        issues,
                    });
                }
            }
        }
        Ok(outcome)
    }
}
