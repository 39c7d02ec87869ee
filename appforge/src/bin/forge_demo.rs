//! End-to-end run of the whole pipeline.
//!
//! Offline against a scripted provider by default. With `APPFORGE_PROVIDER`
//! set, the provider and storage come from the environment instead.
//! Prints the progress stream as it arrives.

use anyhow::{Context, Result};
use appforge::artifacts::prompts::PromptKind;
use appforge::logging::init_tracing;
use appforge::provider::{HttpProvider, ScriptedProvider};
use appforge::{ForgeConfig, FsStore, PersistenceStore, WorkflowEngine};
use appforge_sdk::{
    collapse, CancellationToken, ChannelSink, ChatMessage, GenerationOptions, ProgressStatus,
    TextGenerationProvider,
};
use std::sync::Arc;

const IDEA: &str = "A small web app to collect family recipes, browse them as cards \
                    and keep a list of favorites.";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(false).map_err(|e| anyhow::anyhow!(e))?;

    let (config, provider): (ForgeConfig, Arc<dyn TextGenerationProvider>) =
        if std::env::var_os("APPFORGE_PROVIDER").is_some() {
            let config = ForgeConfig::from_env()?;
            let provider: Arc<dyn TextGenerationProvider> = Arc::new(HttpProvider::new(&config)?);
            (config, provider)
        } else {
            let config = ForgeConfig {
                storage_dir: std::env::temp_dir().join("appforge-demo"),
                ..ForgeConfig::default()
            };
            let provider: Arc<dyn TextGenerationProvider> =
                Arc::new(ScriptedProvider::new(respond));
            (config, provider)
        };
    let store = Arc::new(FsStore::new(config.storage_dir.clone()));
    let (sink, mut events) = ChannelSink::new();

    let engine = WorkflowEngine::new(&config, provider, store.clone(), Arc::new(sink));
    let cancel = CancellationToken::new();

    let printer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            if event.status != ProgressStatus::Pending {
                let parent = event.parent_id.as_deref().map(|p| format!("{} > ", p));
                println!(
                    "[{:>11}] {}{}{}",
                    format!("{:?}", event.status),
                    parent.unwrap_or_default(),
                    event.node_id,
                    event
                        .message
                        .as_deref()
                        .map(|m| format!(": {}", m))
                        .unwrap_or_default()
                );
            }
            seen.push(event);
        }
        seen
    });

    let report = engine.run(IDEA, Vec::new(), &cancel).await?;
    drop(engine);
    let events = printer.await.context("progress printer panicked")?;

    let bundle = store.load(report.run_id).await?;
    let elapsed = report.finished_at - report.started_at;
    println!(
        "\n{} ({}, {} ms)",
        report.title,
        report.strategy,
        elapsed.num_milliseconds()
    );
    println!("saved to {}", store.run_dir(report.run_id).display());
    for (name, filename) in &bundle.registry {
        println!("  {:<20} {}", name, filename);
    }
    for stage in &report.degraded {
        println!("  degraded {}: {}", stage.stage, stage.reason);
    }
    let failed = collapse(&events)
        .into_iter()
        .filter(|e| e.status == ProgressStatus::Error)
        .count();
    println!("{} nodes, {} failed", collapse(&events).len(), failed);

    Ok(())
}

fn respond(
    messages: &[ChatMessage],
    options: &GenerationOptions,
    _call: usize,
) -> Result<String, appforge_sdk::ProviderError> {
    let system = options.system.as_deref().unwrap_or_default();
    let request = messages.last().map(|m| m.content.as_str()).unwrap_or_default();

    let reply = match PromptKind::detect(system) {
        Some(PromptKind::Idea) => {
            "title: Family Recipe Box\ndescription: Collect, browse and favorite family recipes.\n"
                .to_string()
        }
        Some(PromptKind::Requirements) => "document: |\n  # Family Recipe Box\n\n  Browse recipes as cards.\n\
             goals: [browse recipes, mark favorites]\nconstraints: [works offline]\n"
            .to_string(),
        Some(PromptKind::Checklist) => {
            "- title: Recipe data model\n- title: Favorites storage\n  detail: local only\n".to_string()
        }
        Some(PromptKind::Notes) => "Keep favorites in local storage.".to_string(),
        Some(PromptKind::UiPlan) => "components: [NavigationHeader, RecipeList, RecipeCard, LoginForm, App]\n\
             layout: header over a card grid\nstrategy: multi\n"
            .to_string(),
        Some(PromptKind::Component) | Some(PromptKind::SingleFile) => component(request),
        None => String::new(),
    };
    Ok(reply)
}

/// A plausible component for whatever name the request asks for
fn component(request: &str) -> String {
    let name = request
        .split('`')
        .nth(1)
        .unwrap_or("Generic")
        .to_string();

    let body = match name.as_str() {
        "NavigationHeader" => {
            "<header className=\"nav\">\n      <h1>Recipes</h1>\n      <button onClick={() => navigate(\"favorites\")}>Favorites</button>\n    </header>"
                .to_string()
        }
        "RecipeList" => "<section className=\"grid\">\n      {[1, 2, 3].map((id) => <RecipeCard key={id} id={id} />)}\n    </section>"
            .to_string(),
        "App" => "<div className=\"app\">\n      <NavigationHeader />\n      {route === \"favorites\" ? <FavoritesPage /> : <RecipeList />}\n      <Footer />\n    </div>"
            .to_string(),
        other => format!(
            "<div className=\"{}\">\n      <p>{} content goes here.</p>\n    </div>",
            other.to_lowercase(),
            other
        ),
    };

    format!(
        "function {name}(props) {{\n  const {{ route }} = useNavigate();\n  return (\n    {body}\n  );\n}}\n\nwindow.{name} = {name};\n",
        name = name,
        body = body
    )
}
