//! Whole-run behavior of the workflow engine

use super::common::*;
use appforge::artifacts::prompts::PromptKind;
use appforge::provider::ScriptedProvider;
use appforge::types::{Bundle, ChecklistSource};
use appforge::workflow::Strategy;
use appforge::{FatalWorkflowError, MemoryStore, PersistenceStore, StoreError};
use appforge_sdk::{
    async_trait, collapse, CancellationToken, ProgressStatus, ProviderError, RunId,
};
use std::sync::Arc;

const IDEA: &str = "A dashboard for my team's weekly metrics";

fn healthy(plan: &[&str]) -> ScriptedProvider {
    scripted(plan_reply(plan), |name, _| {
        Ok(valid_component(name, &format!("<p>{}</p>", name)))
    })
}

/// Store that refuses every write
struct ReadOnlyStore;

#[async_trait]
impl PersistenceStore for ReadOnlyStore {
    async fn save(&self, _run_id: RunId, _bundle: &Bundle) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }

    async fn load(&self, run_id: RunId) -> Result<Bundle, StoreError> {
        Err(StoreError::NotFound(run_id.to_string()))
    }
}

#[tokio::test]
async fn test_happy_path_persists_complete_bundle() {
    let store = Arc::new(MemoryStore::new());
    let (engine, sink) = engine(healthy(&["Header", "MetricsCard", "Footer"]), store.clone());

    let report = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.title, "Team Dashboard");
    assert_eq!(report.strategy, Strategy::MultiArtifact);
    assert!(report.degraded.is_empty());
    assert!(report.finished_at >= report.started_at);

    let bundle = store.load(report.run_id).await.unwrap();
    for name in ["App", "Header", "MetricsCard", "Footer"] {
        assert!(bundle.registry.contains_key(name), "missing {}", name);
    }
    assert_eq!(bundle.entry_document, "index.html");

    let documents = bundle.documents.expect("documents are persisted");
    assert!(documents.requirements.contains("Show metrics."));
    assert_eq!(documents.notes.as_deref(), Some(NOTES_REPLY));
    let from_requirements = documents
        .checklist
        .iter()
        .filter(|c| c.source == ChecklistSource::Requirements)
        .count();
    assert_eq!(from_requirements, 2);
    assert!(documents.checklist.iter().any(|c| {
        c.source == ChecklistSource::Implementation && c.title.starts_with("Implement App")
    }));

    let terminal = collapse(&sink.events());
    assert!(terminal.iter().all(|e| e.status == ProgressStatus::Success));
    assert!(terminal.iter().any(|e| e.node_id == "persist"));
    assert_monotonic_artifact_progress(&sink);
}

#[tokio::test]
async fn test_bundle_scripts_declare_nothing_globally() {
    let store = Arc::new(MemoryStore::new());
    let provider = scripted(plan_reply(&["Header", "Footer"]), |name, _| match name {
        "App" => Ok(valid_component(name, "<Header /><MainContent /><Footer />")),
        other => Ok(valid_component(other, &format!("<p>{}</p>", other))),
    });
    let (engine, _) = engine(provider, store.clone());

    let report = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap();
    let bundle = store.load(report.run_id).await.unwrap();

    // Header.jsx declares `function Header` and App.jsx looks it up under the
    // same name; both run as classic scripts in one page.
    let header = bundle.artifact_named("Header").unwrap();
    let app = bundle.artifact_named("App").unwrap();
    assert!(header.content.contains("function Header(props)"));
    assert!(app.content.contains("const Header = resolveComponent(\"Header\");"));

    let scripts = bundle
        .artifacts
        .iter()
        .filter(|a| a.filename.ends_with(".js") || a.filename.ends_with(".jsx"));
    for script in scripts {
        let declared = global_declarations(&script.content);
        assert!(declared.is_empty(), "{} declares {:?}", script.filename, declared);
    }
}

#[tokio::test]
async fn test_requirements_without_goals_leave_only_implementation_rows() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new(|messages, options, _| {
        match classify_call(messages, options) {
            Call::Stage(PromptKind::Requirements) => Ok(REQUIREMENTS_WITHOUT_GOALS.to_string()),
            Call::Stage(PromptKind::Checklist) => {
                Err(ProviderError::Unavailable("not expected".into()))
            }
            Call::Stage(kind) => stage_reply(kind, &plan_reply(&["Header", "Footer"])),
            Call::Component { name, .. } => Ok(valid_component(&name, "<p>ok</p>")),
            Call::Unknown => Err(ProviderError::Misconfigured("unrecognized call".into())),
        }
    });
    let (engine, _) = engine(provider, store.clone());

    let report = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.degraded.is_empty());

    let documents = store.load(report.run_id).await.unwrap().documents.unwrap();
    assert!(!documents.checklist.is_empty());
    assert!(documents
        .checklist
        .iter()
        .all(|c| c.source == ChecklistSource::Implementation));
}

#[tokio::test]
async fn test_dropped_component_does_not_block_the_container() {
    let store = Arc::new(MemoryStore::new());
    let provider = scripted(plan_reply(&["Header", "ProjectCard", "Footer"]), |name, _| {
        match name {
            "ProjectCard" => Ok(broken_component(name)),
            "App" => Ok(valid_component(name, "<Header /><ProjectCard /><Footer />")),
            other => Ok(valid_component(other, "<p>ok</p>")),
        }
    });
    let (engine, sink) = engine(provider, store.clone());

    let report = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap();

    let bundle = store.load(report.run_id).await.unwrap();
    assert!(bundle.registry.contains_key("App"));
    assert!(!bundle.registry.contains_key("ProjectCard"));
    assert!(!bundle.issues["components/ProjectCard.jsx"].is_empty());
    assert!(report.validation_issues.contains_key("components/ProjectCard.jsx"));

    let app = bundle.artifact_named("App").unwrap();
    assert!(app
        .content
        .contains("const ProjectCard = resolveComponent(\"ProjectCard\");"));

    let card = collapse(&sink.events_for("artifact:ProjectCard"));
    assert_eq!(card[0].status, ProgressStatus::Error);
    assert_monotonic_artifact_progress(&sink);
}

#[tokio::test]
async fn test_idea_failure_is_fatal_and_saves_nothing() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new(|messages, options, _| {
        match classify_call(messages, options) {
            Call::Stage(PromptKind::Idea) => Ok("title: \"\"\n".to_string()),
            _ => Err(ProviderError::Misconfigured("never reached".into())),
        }
    });
    let counter = provider.counter();
    let (engine, _) = engine(provider, store.clone());

    let err = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FatalWorkflowError::IdeaProcessing(_)));
    assert_eq!(counter.get(), 1);
    assert!(store.run_ids().await.is_empty());
}

#[tokio::test]
async fn test_requirements_failure_degrades() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new(|messages, options, _| {
        match classify_call(messages, options) {
            Call::Stage(PromptKind::Requirements) => {
                Err(ProviderError::Unavailable("HTTP 500".into()))
            }
            Call::Stage(kind) => stage_reply(kind, &plan_reply(&["Header"])),
            Call::Component { name, .. } => Ok(valid_component(&name, "<p>ok</p>")),
            Call::Unknown => Err(ProviderError::Misconfigured("unrecognized call".into())),
        }
    });
    let (engine, sink) = engine(provider, store.clone());

    let report = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].stage, "generate_requirements");
    assert!(report.degraded[0].reason.contains("HTTP 500"));

    let documents = store.load(report.run_id).await.unwrap().documents.unwrap();
    assert!(documents.requirements.contains("Team Dashboard"));

    let node = collapse(&sink.events_for("generate_requirements"));
    assert_eq!(node[0].status, ProgressStatus::Error);
}

#[tokio::test]
async fn test_cancellation_persists_nothing() {
    let store = Arc::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let provider = scripted(plan_reply(&["Header", "Footer"]), move |_, _| {
        trigger.cancel();
        Err(ProviderError::Cancelled)
    });
    let (engine, _) = engine(provider, store.clone());

    let err = engine.run(IDEA, Vec::new(), &cancel).await.unwrap_err();

    assert!(matches!(err, FatalWorkflowError::Cancelled));
    assert!(store.run_ids().await.is_empty());
}

#[tokio::test]
async fn test_unbuildable_container_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    let provider = scripted(plan_reply(&["Header"]), |name, _| match name {
        "App" => Ok(broken_component(name)),
        other => Ok(valid_component(other, "<p>ok</p>")),
    });
    let (engine, _) = engine(provider, store.clone());

    let err = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FatalWorkflowError::UiGeneration(_)));
    assert!(store.run_ids().await.is_empty());
}

#[tokio::test]
async fn test_falls_back_to_single_artifact() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new(|messages, options, _| {
        let system = options.system.as_deref().unwrap_or_default();
        match classify_call(messages, options) {
            Call::Stage(kind) => stage_reply(kind, &plan_reply(&["Header"])),
            Call::Component { name, .. } if name == "App" => {
                match PromptKind::detect(system) {
                    Some(PromptKind::SingleFile) => {
                        Ok(valid_component("App", "<h1>All in one</h1>"))
                    }
                    _ => Ok(broken_component("App")),
                }
            }
            Call::Component { name, .. } => Ok(valid_component(&name, "<p>ok</p>")),
            Call::Unknown => Err(ProviderError::Misconfigured("unrecognized call".into())),
        }
    });
    let (engine, sink) = engine(provider, store.clone());

    let report = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.strategy, Strategy::SingleArtifact);
    let bundle = store.load(report.run_id).await.unwrap();
    assert_eq!(bundle.registry.keys().collect::<Vec<_>>(), vec!["App"]);

    assert_monotonic_artifact_progress(&sink);
    let multi = collapse(&sink.events_for("artifact:App"));
    assert_eq!(multi[0].status, ProgressStatus::Error);
    let single = collapse(&sink.events_for("artifact:App:single"));
    assert_eq!(single[0].status, ProgressStatus::Success);
}

#[tokio::test]
async fn test_store_failure_is_fatal() {
    let (engine, sink) = engine(healthy(&["Header"]), Arc::new(ReadOnlyStore));

    let err = engine
        .run(IDEA, Vec::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, FatalWorkflowError::Persist(_)));
    let persist = collapse(&sink.events_for("persist"));
    assert_eq!(persist[0].status, ProgressStatus::Error);
}
