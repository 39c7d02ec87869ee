//! Missing-reference discovery and the healing pass

use super::common::*;
use appforge::artifacts::references::{is_simple_route, page_name};
use appforge::artifacts::{ReferenceResolver, UiPipeline};
use appforge::types::{ArtifactKind, ArtifactSpec, GeneratedArtifact, GenerationContext, UiPlan};
use appforge::workflow::Strategy;
use appforge_sdk::{CancellationToken, CollectingSink};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn artifact(name: &str, kind: ArtifactKind, body: &str) -> GeneratedArtifact {
    let spec = ArtifactSpec::new(name, kind);
    GeneratedArtifact::from_spec(&spec, valid_component(name, body), Vec::new())
}

fn header_with_settings_link() -> &'static str {
    "<button onClick={() => navigate(\"settings\")}>Settings</button>"
}

#[test]
fn test_scan_reports_routes_and_unknown_lookups() {
    let artifacts = vec![
        artifact(
            "NavigationHeader",
            ArtifactKind::Navigation,
            header_with_settings_link(),
        ),
        GeneratedArtifact::from_spec(
            &ArtifactSpec::new("Dashboard", ArtifactKind::Page),
            "const Chart = resolveComponent(\"Chart\");\nconst App = resolveComponent(\"App\");\nwindow.Dashboard = Dashboard;\n".to_string(),
            Vec::new(),
        ),
    ];

    let report = ReferenceResolver::new("App").scan(&artifacts);
    assert_eq!(report.routes.iter().collect::<Vec<_>>(), vec!["settings"]);
    assert_eq!(report.unresolved_names.iter().collect::<Vec<_>>(), vec!["Chart"]);
}

#[test]
fn test_scan_ignores_routes_with_existing_pages() {
    let artifacts = vec![
        artifact(
            "NavigationHeader",
            ArtifactKind::Navigation,
            header_with_settings_link(),
        ),
        artifact("SettingsPage", ArtifactKind::Page, "<p>settings</p>"),
    ];
    assert!(ReferenceResolver::new("App").scan(&artifacts).is_empty());
}

#[test]
fn test_route_names() {
    assert!(is_simple_route("settings"));
    assert!(is_simple_route("user-profile"));
    assert!(!is_simple_route("https://example.com"));
    assert!(!is_simple_route("/a/b"));
    assert_eq!(page_name("user-profile"), "UserProfilePage");
    assert_eq!(page_name("landing-page"), "LandingPage");
}

#[tokio::test]
async fn test_heal_synthesizes_navigated_page() {
    let provider = scripted(String::new(), |name, _| {
        Ok(valid_component(name, &format!("<p>{}</p>", name)))
    });
    let counter = provider.counter();
    let generator = generator(provider, Arc::new(CollectingSink::default()));

    let artifacts = vec![artifact(
        "NavigationHeader",
        ArtifactKind::Navigation,
        header_with_settings_link(),
    )];
    let resolver = ReferenceResolver::new("App");
    let healed = resolver
        .heal(
            &generator,
            &artifacts,
            &GenerationContext::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(counter.get(), 1);
    assert!(healed.failures.is_empty());
    let page = &healed.artifacts[0];
    assert_eq!(page.name, "SettingsPage");
    assert_eq!(page.kind, ArtifactKind::Page);

    let mut all = artifacts.clone();
    all.extend(healed.artifacts);
    assert!(resolver.scan(&all).is_empty());
}

#[tokio::test]
async fn test_pipeline_registers_healed_page() {
    let provider = scripted(String::new(), |name, _| match name {
        "NavigationHeader" => Ok(valid_component(name, header_with_settings_link())),
        other => Ok(valid_component(other, &format!("<p>{}</p>", other))),
    });
    let pipeline = UiPipeline::new(generator(provider, Arc::new(CollectingSink::default())));
    let plan = UiPlan::with_components(["NavigationHeader", "Dashboard"]);
    let ctx = GenerationContext {
        title: "Team Dashboard".into(),
        ..GenerationContext::default()
    };

    let outcome = pipeline
        .run(Strategy::MultiArtifact, &plan, &ctx, &CancellationToken::new())
        .await
        .unwrap();

    let registry = &outcome.bundle.registry;
    for name in ["App", "NavigationHeader", "Dashboard", "Footer", "SettingsPage"] {
        assert!(registry.contains_key(name), "{} missing from {:?}", name, registry);
    }

    let generated: Vec<GeneratedArtifact> = outcome.bundle.generated().cloned().collect();
    assert!(ReferenceResolver::new("App").scan(&generated).is_empty());
}

#[tokio::test]
async fn test_failed_component_is_not_healed_again() {
    let card_calls = Arc::new(AtomicUsize::new(0));
    let counted = card_calls.clone();
    let provider = scripted(String::new(), move |name, _| match name {
        "Card" => {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(broken_component(name))
        }
        "Dashboard" => Ok(valid_component(name, "<Card title=\"weekly\" />")),
        other => Ok(valid_component(other, &format!("<p>{}</p>", other))),
    });
    let sink = Arc::new(CollectingSink::default());
    let pipeline = UiPipeline::new(generator(provider, sink.clone()));
    let plan = UiPlan::with_components(["Card", "Dashboard"]);

    let outcome = pipeline
        .run(
            Strategy::MultiArtifact,
            &plan,
            &GenerationContext::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(card_calls.load(Ordering::SeqCst), test_config().max_attempts + 1);
    let card_failures: Vec<_> = outcome.failures.iter().filter(|f| f.name == "Card").collect();
    assert_eq!(card_failures.len(), 1);
    assert_eq!(outcome.bundle.issues["components/Card.jsx"], card_failures[0].issues);
    assert!(!outcome.bundle.registry.contains_key("Card"));

    let dashboard = outcome.bundle.artifact_named("Dashboard").unwrap();
    assert!(dashboard.content.contains("const Card = resolveComponent(\"Card\");"));
    assert_monotonic_artifact_progress(&sink);
}
