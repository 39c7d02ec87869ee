//! The UI generation subpipeline.
//!
//! Multi-artifact: resolve specs, generate them, heal missing references in
//! one pass, generate the root container from the final name list, assemble.
//! Single-artifact: generate only the root container, self-contained.

use appforge_sdk::CancellationToken;
use tracing::{info, warn};

use crate::artifacts::generator::{BatchOutcome, ComponentGenerator};
use crate::artifacts::manifest::ManifestBuilder;
use crate::artifacts::references::ReferenceResolver;
use crate::artifacts::spec_resolver::{resolve, ROOT_CONTAINER};
use crate::error::{FatalWorkflowError, GenerateError};
use crate::types::{ArtifactFailure, ArtifactSpec, Bundle, GenerationContext, UiPlan};
use crate::workflow::strategy::Strategy;

/// A finished UI stage
#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub strategy: Strategy,
    pub bundle: Bundle,
    pub failures: Vec<ArtifactFailure>,
}

pub struct UiPipeline {
    generator: ComponentGenerator,
    root_name: String,
}

impl UiPipeline {
    pub fn new(generator: ComponentGenerator) -> Self {
        Self {
            generator,
            root_name: ROOT_CONTAINER.to_string(),
        }
    }

    /// Run the chosen strategy, then the other one if the first cannot produce a root container
    pub async fn run(
        &self,
        strategy: Strategy,
        plan: &UiPlan,
        ctx: &GenerationContext,
        cancel: &CancellationToken,
    ) -> Result<UiOutcome, FatalWorkflowError> {
        let mut last_error = None;

        for candidate in strategy.fallback_order() {
            let result = match candidate {
                Strategy::MultiArtifact => self.run_multi(plan, ctx, cancel).await,
                Strategy::SingleArtifact => self.run_single(plan, ctx, cancel).await,
            };
            match result {
                Ok((bundle, failures)) => {
                    if candidate != strategy {
                        warn!(chosen = %strategy, used = %candidate, "fell back to other strategy");
                    }
                    return Ok(UiOutcome {
                        strategy: candidate,
                        bundle,
                        failures,
                    });
                }
                Err(FatalWorkflowError::Cancelled) => return Err(FatalWorkflowError::Cancelled),
                Err(err) => {
                    warn!(strategy = %candidate, error = %err, "UI strategy failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| FatalWorkflowError::UiGeneration("no strategy ran".to_string())))
    }

    async fn run_multi(
        &self,
        plan: &UiPlan,
        ctx: &GenerationContext,
        cancel: &CancellationToken,
    ) -> Result<(Bundle, Vec<ArtifactFailure>), FatalWorkflowError> {
        let specs = resolve(plan);
        let names = specs.iter().map(|s| s.name.clone()).collect();
        let planned_ctx = ctx.with_known_names(names);
        info!(count = specs.len(), "generating planned components");

        let mut outcome = self
            .generator
            .generate_all(specs, &planned_ctx, cancel)
            .await
            .map_err(cancelled)?;

        let failed = outcome.failures.iter().map(|f| f.name.clone());
        let resolver = ReferenceResolver::new(self.root_name.as_str()).excluding(failed);
        let healed = resolver
            .heal(&self.generator, &outcome.artifacts, &planned_ctx, cancel)
            .await
            .map_err(cancelled)?;
        outcome.extend(healed);

        let final_names = outcome.artifacts.iter().map(|a| a.name.clone()).collect();
        let container = ArtifactSpec::container(self.root_name.as_str())
            .with_description("Root container composing every component and page");
        let root = self
            .generator
            .generate_all(vec![container], &ctx.with_known_names(final_names), cancel)
            .await
            .map_err(cancelled)?;

        self.assemble(ctx, outcome, root)
    }

    async fn run_single(
        &self,
        plan: &UiPlan,
        ctx: &GenerationContext,
        cancel: &CancellationToken,
    ) -> Result<(Bundle, Vec<ArtifactFailure>), FatalWorkflowError> {
        let mut description = String::from("The complete application in one file");
        if let Some(components) = &plan.components {
            let planned: Vec<&str> = components.iter().map(|c| c.name()).collect();
            description.push_str(&format!(", covering: {}", planned.join(", ")));
        }
        let container =
            ArtifactSpec::container(self.root_name.as_str()).with_description(description);
        let single_ctx = GenerationContext {
            known_names: Vec::new(),
            single_file: true,
            ..ctx.clone()
        };

        let root = self
            .generator
            .generate_all(vec![container], &single_ctx, cancel)
            .await
            .map_err(cancelled)?;

        self.assemble(ctx, BatchOutcome::default(), root)
    }

    fn assemble(
        &self,
        ctx: &GenerationContext,
        mut outcome: BatchOutcome,
        root: BatchOutcome,
    ) -> Result<(Bundle, Vec<ArtifactFailure>), FatalWorkflowError> {
        if root.artifacts.is_empty() {
            let detail = root
                .failures
                .first()
                .and_then(|f| f.issues.first())
                .map(|i| i.message.clone())
                .unwrap_or_else(|| "no output".to_string());
            return Err(FatalWorkflowError::UiGeneration(format!(
                "root container {} could not be generated: {}",
                self.root_name, detail
            )));
        }
        outcome.extend(root);

        let bundle = ManifestBuilder::new(ctx.title.as_str(), self.root_name.as_str())
            .build(outcome.artifacts, &outcome.failures)
            .map_err(|e| FatalWorkflowError::UiGeneration(e.to_string()))?;
        Ok((bundle, outcome.failures))
    }
}

fn cancelled(err: GenerateError) -> FatalWorkflowError {
    match err {
        GenerateError::Cancelled => FatalWorkflowError::Cancelled,
        other => FatalWorkflowError::UiGeneration(other.to_string()),
    }
}
