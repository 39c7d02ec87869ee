//! Common fixtures for pipeline tests

#![allow(dead_code)]

use appforge::artifacts::prompts::PromptKind;
use appforge::artifacts::{ComponentGenerator, GeneratorSettings};
use appforge::provider::ScriptedProvider;
use appforge::store::PersistenceStore;
use appforge::{ForgeConfig, WorkflowEngine};
use appforge_sdk::{
    ChatMessage, CollectingSink, GenerationOptions, ProgressStatus, ProviderError,
};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// What a scripted call is for
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Stage(PromptKind),
    /// Component generation, with the requested name and whether it is a retry
    Component { name: String, retry: bool },
    Unknown,
}

pub fn classify_call(messages: &[ChatMessage], options: &GenerationOptions) -> Call {
    let system = options.system.as_deref().unwrap_or_default();
    match PromptKind::detect(system) {
        Some(PromptKind::Component) | Some(PromptKind::SingleFile) => {
            let request = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            Call::Component {
                name: request.split('`').nth(1).unwrap_or_default().to_string(),
                retry: system.contains("previous attempt was rejected"),
            }
        }
        Some(kind) => Call::Stage(kind),
        None => Call::Unknown,
    }
}

/// A valid component long enough to pass the length floor
pub fn valid_component(name: &str, jsx: &str) -> String {
    format!(
        "function {name}(props) {{\n  const [open, setOpen] = React.useState(false);\n  return (\n    <div className=\"{lower}\" onClick={{() => setOpen(!open)}}>\n      {jsx}\n    </div>\n  );\n}}\n\nwindow.{name} = {name};\n",
        name = name,
        lower = name.to_lowercase(),
        jsx = jsx
    )
}

/// Output that is truncated mid-expression: always a syntax error
pub fn broken_component(name: &str) -> String {
    format!("function {}(props) {{\n  return (\n    <div className=\"", name)
}

pub const IDEA_REPLY: &str = "title: Team Dashboard\ndescription: Track team metrics at a glance.\n";

pub const REQUIREMENTS_REPLY: &str = "document: |\n  # Team Dashboard\n\n  Show metrics.\ngoals: [show metrics]\nconstraints: [read only]\n";

pub const REQUIREMENTS_WITHOUT_GOALS: &str = "document: |\n  # Team Dashboard\n\n  Show metrics.\n";

pub const CHECKLIST_REPLY: &str = "- title: Metrics API client\n- title: Dashboard layout\n";

pub const NOTES_REPLY: &str = "Cache metrics for a minute.";

pub fn plan_reply(components: &[&str]) -> String {
    format!("components: [{}]\nlayout: single column\n", components.join(", "))
}

/// Standard replies for every text stage
pub fn stage_reply(kind: PromptKind, plan: &str) -> Result<String, ProviderError> {
    Ok(match kind {
        PromptKind::Idea => IDEA_REPLY.to_string(),
        PromptKind::Requirements => REQUIREMENTS_REPLY.to_string(),
        PromptKind::Checklist => CHECKLIST_REPLY.to_string(),
        PromptKind::Notes => NOTES_REPLY.to_string(),
        PromptKind::UiPlan => plan.to_string(),
        PromptKind::Component | PromptKind::SingleFile => {
            return Err(ProviderError::Unavailable("not a stage".to_string()))
        }
    })
}

/// Provider answering every stage normally and each component with `component(name, retry)`
pub fn scripted<F>(plan: String, component: F) -> ScriptedProvider
where
    F: Fn(&str, bool) -> Result<String, ProviderError> + Send + Sync + 'static,
{
    ScriptedProvider::new(move |messages, options, _| match classify_call(messages, options) {
        Call::Stage(kind) => stage_reply(kind, &plan),
        Call::Component { name, retry } => component(&name, retry),
        Call::Unknown => Err(ProviderError::Misconfigured("unrecognized call".to_string())),
    })
}

pub fn test_config() -> ForgeConfig {
    ForgeConfig {
        max_attempts: 2,
        concurrency: 2,
        ..ForgeConfig::default()
    }
}

pub fn generator(provider: ScriptedProvider, sink: Arc<CollectingSink>) -> ComponentGenerator {
    ComponentGenerator::new(
        Arc::new(provider),
        sink,
        GeneratorSettings::from(&test_config()),
    )
}

pub fn engine(
    provider: ScriptedProvider,
    store: Arc<dyn PersistenceStore>,
) -> (WorkflowEngine, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::default());
    let engine = WorkflowEngine::new(&test_config(), Arc::new(provider), store, sink.clone());
    (engine, sink)
}

/// Names a classic script declares at its top level, where every script
/// loaded into the page shares them
pub fn global_declarations(script: &str) -> BTreeSet<String> {
    let declaration = Regex::new(
        r"^(?:async\s+)?(?:const|let|var|class|function)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap();
    let mut depth = 0i32;
    let mut names = BTreeSet::new();
    for line in script.lines() {
        if depth == 0 {
            if let Some(caps) = declaration.captures(line.trim_start()) {
                names.insert(caps[1].to_string());
            }
        }
        for c in line.chars() {
            match c {
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth -= 1,
                _ => {}
            }
        }
    }
    names
}

/// Every artifact node moves forward only: pending, in progress, one terminal status
pub fn assert_monotonic_artifact_progress(sink: &CollectingSink) {
    let mut nodes: BTreeMap<String, Vec<ProgressStatus>> = BTreeMap::new();
    for event in sink.events() {
        if event.node_id.starts_with("artifact:") {
            nodes.entry(event.node_id).or_default().push(event.status);
        }
    }
    let rank = |status: &ProgressStatus| match status {
        ProgressStatus::Pending => 0,
        ProgressStatus::InProgress => 1,
        ProgressStatus::Success | ProgressStatus::Error => 2,
    };
    for (node, statuses) in nodes {
        assert!(
            statuses.windows(2).all(|w| rank(&w[0]) < rank(&w[1])),
            "{} went {:?}",
            node,
            statuses
        );
    }
}
