//! Component generation: sanitation, validation and bounded retries

use super::common::*;
use appforge::artifacts::sanitize::{sanitize, SanitizeTarget, PIPELINE};
use appforge::types::{ArtifactKind, ArtifactSpec, GenerationContext, IssueKind};
use appforge::GenerateError;
use appforge_sdk::{CancellationToken, CollectingSink, ProgressStatus, ProviderError};
use std::sync::Arc;

const MESSY: &str = r#"Here is the component:
```jsx
import React from 'react';
import Card from './Card';

export default function Dashboard() {
  const Header = window.Header;
  return (
    <div class="dash">
      <Header />
      <label for="q">Search</label>
      <Card title="a" />
      <Footer />
    </div>
  );
}
```
"#;

fn names() -> Vec<String> {
    ["Header", "Card", "Footer", "Dashboard"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn test_sanitize_is_idempotent_on_messy_output() {
    let known = names();
    let target = SanitizeTarget {
        name: "Dashboard",
        known_names: &known,
    };

    let once = sanitize(MESSY, &target);
    let twice = sanitize(&once, &target);
    assert_eq!(once, twice);

    assert!(!once.contains("```"));
    assert!(!once.contains("import "));
    assert!(!once.contains("export "));
    assert!(once.contains("className=\"dash\""));
    assert!(once.contains("htmlFor=\"q\""));
    assert!(once.contains("const Header = resolveComponent(\"Header\");"));
    assert!(once.contains("const Card = resolveComponent(\"Card\");"));
    assert!(once.contains("const Footer = resolveComponent(\"Footer\");"));
    assert!(once.contains("window.Dashboard = Dashboard;"));
    assert!(once.starts_with("(function () {\n"));
    assert!(once.ends_with("})();\n"));
}

#[test]
fn test_every_transform_is_idempotent_on_its_own() {
    let known = names();
    let target = SanitizeTarget {
        name: "Dashboard",
        known_names: &known,
    };

    for (label, transform) in PIPELINE {
        let once = transform(MESSY, &target);
        assert_eq!(once, transform(&once, &target), "{} is not idempotent", label);
    }
}

#[tokio::test]
async fn test_always_invalid_output_makes_exactly_max_attempts_plus_one_calls() {
    let provider = scripted(plan_reply(&[]), |name, _| Ok(broken_component(name)));
    let calls = provider.counter();
    let sink = Arc::new(CollectingSink::default());
    let gen = generator(provider, sink.clone());
    let spec = ArtifactSpec::new("Card", ArtifactKind::Card);

    let err = gen
        .generate(&spec, &GenerationContext::default(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(calls.get(), test_config().max_attempts + 1);
    match err {
        GenerateError::Exhausted {
            name,
            attempts,
            issues,
        } => {
            assert_eq!(name, "Card");
            assert_eq!(attempts, 3);
            assert!(issues.iter().any(|i| i.kind == IssueKind::SyntaxError));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let last = sink.events_for("artifact:Card").pop().unwrap();
    assert_eq!(last.status, ProgressStatus::Error);
    assert_eq!(last.parent_id.as_deref(), Some("generate_ui"));
}

#[tokio::test]
async fn test_failure_is_isolated_to_one_artifact() {
    let provider = scripted(plan_reply(&[]), |name, _| match name {
        "Card" => Ok(broken_component(name)),
        _ => Ok(valid_component(name, "<p>ok</p>")),
    });
    let sink = Arc::new(CollectingSink::default());
    let gen = generator(provider, sink.clone());
    let specs = vec![
        ArtifactSpec::new("Header", ArtifactKind::Navigation),
        ArtifactSpec::new("Card", ArtifactKind::Card),
        ArtifactSpec::new("Footer", ArtifactKind::Footer),
    ];

    let outcome = gen
        .generate_all(specs, &GenerationContext::default(), &CancellationToken::new())
        .await
        .unwrap();

    let produced: Vec<&str> = outcome.artifacts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(produced, vec!["Header", "Footer"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].filename, "components/Card.jsx");

    for name in ["Header", "Card", "Footer"] {
        let statuses: Vec<ProgressStatus> = sink
            .events_for(&format!("artifact:{}", name))
            .iter()
            .map(|e| e.status)
            .collect();
        let terminal = if name == "Card" {
            ProgressStatus::Error
        } else {
            ProgressStatus::Success
        };
        assert_eq!(
            statuses,
            vec![ProgressStatus::Pending, ProgressStatus::InProgress, terminal]
        );
    }
}

#[tokio::test]
async fn test_retry_succeeds_after_strict_prompt() {
    let provider = scripted(plan_reply(&[]), |name, retry| match retry {
        false => Ok(broken_component(name)),
        true => Ok(valid_component(name, "<p>fixed</p>")),
    });
    let calls = provider.counter();
    let gen = generator(provider, Arc::new(CollectingSink::default()));

    let artifact = gen
        .generate(
            &ArtifactSpec::new("Card", ArtifactKind::Card),
            &GenerationContext::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(calls.get(), 2);
    assert!(artifact.content.contains("fixed"));
    assert!(artifact.issues.is_empty());
}

#[tokio::test]
async fn test_transient_provider_errors_consume_attempts() {
    let provider = scripted(plan_reply(&[]), |_, _| Err(ProviderError::Timeout(5)));
    let calls = provider.counter();
    let gen = generator(provider, Arc::new(CollectingSink::default()));

    let err = gen
        .generate(
            &ArtifactSpec::new("Card", ArtifactKind::Card),
            &GenerationContext::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Exhausted { attempts: 3, .. }));
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn test_cancellation_aborts_the_batch() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let provider = scripted(plan_reply(&[]), move |name, _| {
        trigger.cancel();
        Ok(valid_component(name, "<p>late</p>"))
    });
    let gen = generator(provider, Arc::new(CollectingSink::default()));
    let specs = vec![
        ArtifactSpec::new("Header", ArtifactKind::Navigation),
        ArtifactSpec::new("Card", ArtifactKind::Card),
        ArtifactSpec::new("Footer", ArtifactKind::Footer),
    ];

    let result = gen
        .generate_all(specs, &GenerationContext::default(), &cancel)
        .await;
    assert_eq!(result.unwrap_err(), GenerateError::Cancelled);
}
