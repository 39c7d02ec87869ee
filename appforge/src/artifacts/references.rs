//! Discovery and healing of references to artifacts that do not exist yet.
//!
//! After the first generation pass, artifacts may call `navigate("route")`
//! for pages nobody planned, or look up components nobody generated. One
//! healing pass synthesizes a page per route, then a stub per remaining name.
//! Artifacts created here are not scanned again in the same run, so a
//! synthesized page that navigates to yet another new route leaves that route
//! to the runtime placeholder. Names that already exhausted their attempts
//! are not generated again; the runtime placeholder stands in for them.

use appforge_sdk::CancellationToken;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::info;

use crate::artifacts::generator::{BatchOutcome, ComponentGenerator};
use crate::artifacts::sanitize::LOOKUP_FN;
use crate::artifacts::spec_resolver::classify;
use crate::error::GenerateError;
use crate::types::{ArtifactKind, ArtifactSpec, GeneratedArtifact, GenerationContext};

/// What a scan found missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Route names whose page does not exist yet
    pub routes: BTreeSet<String>,
    /// Looked-up names with no artifact behind them
    pub unresolved_names: BTreeSet<String>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.unresolved_names.is_empty()
    }
}

pub struct ReferenceResolver {
    root_name: String,
    /// Names that already failed in this run
    failed: BTreeSet<String>,
}

impl ReferenceResolver {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            failed: BTreeSet::new(),
        }
    }

    /// Never report or synthesize these names
    pub fn excluding<I, S>(mut self, failed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failed.extend(failed.into_iter().map(Into::into));
        self
    }

    fn is_known(&self, existing: &BTreeSet<&str>, name: &str) -> bool {
        existing.contains(name) || self.failed.contains(name)
    }

    pub fn scan(&self, artifacts: &[GeneratedArtifact]) -> ScanReport {
        static NAVIGATE: OnceLock<Regex> = OnceLock::new();
        static LOOKUP: OnceLock<Regex> = OnceLock::new();

        let navigate = NAVIGATE.get_or_init(|| {
            Regex::new(r#"\bnavigate\(\s*["'`]([^"'`]+)["'`]\s*\)"#).expect("static pattern")
        });
        let lookup = LOOKUP.get_or_init(|| {
            Regex::new(&format!(
                r#"\b{}\(\s*["']([A-Za-z_][A-Za-z0-9_]*)["']\s*\)"#,
                LOOKUP_FN
            ))
            .expect("static pattern")
        });

        let existing: BTreeSet<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        let mut report = ScanReport::default();

        for artifact in artifacts {
            for caps in navigate.captures_iter(&artifact.content) {
                let route = caps[1].trim();
                if is_simple_route(route) && !self.is_known(&existing, &page_name(route)) {
                    report.routes.insert(route.to_string());
                }
            }
            for caps in lookup.captures_iter(&artifact.content) {
                let name = &caps[1];
                if name != self.root_name && !self.is_known(&existing, name) {
                    report.unresolved_names.insert(name.to_string());
                }
            }
        }

        report
    }

    /// Scan once and synthesize whatever is missing.
    ///
    /// Pages come first and take the navigation artifact (if any) as layout.
    /// Names still unresolved after that get a stub classified from the name.
    pub async fn heal(
        &self,
        generator: &ComponentGenerator,
        artifacts: &[GeneratedArtifact],
        ctx: &GenerationContext,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, GenerateError> {
        let report = self.scan(artifacts);
        if report.is_empty() {
            return Ok(BatchOutcome::default());
        }
        info!(
            routes = report.routes.len(),
            unresolved = report.unresolved_names.len(),
            "healing missing references"
        );

        let layout = artifacts
            .iter()
            .find(|a| a.kind == ArtifactKind::Navigation)
            .map(|a| a.name.clone());

        let pages: Vec<ArtifactSpec> = report
            .routes
            .iter()
            .map(|route| page_name(route))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|name| {
                ArtifactSpec::page(name, layout.clone())
                    .with_description("Page reached through in-app navigation")
            })
            .collect();

        let page_names: BTreeSet<&str> = pages.iter().map(|p| p.name.as_str()).collect();
        let stubs: Vec<ArtifactSpec> = report
            .unresolved_names
            .iter()
            .filter(|name| !page_names.contains(name.as_str()))
            .map(|name| {
                ArtifactSpec::new(name.as_str(), classify(name))
                    .with_description("Referenced by another component")
            })
            .collect();

        let mut known: Vec<String> = artifacts.iter().map(|a| a.name.clone()).collect();
        known.extend(pages.iter().chain(stubs.iter()).map(|s| s.name.clone()));
        let ctx = ctx.with_known_names(known);

        let mut outcome = generator.generate_all(pages, &ctx, cancel).await?;
        outcome.extend(generator.generate_all(stubs, &ctx, cancel).await?);
        Ok(outcome)
    }
}

/// Plain identifiers only; interpolated or path-like routes cannot be synthesized
pub fn is_simple_route(route: &str) -> bool {
    let mut chars = route.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Deterministic page name for a route: `settings` -> `SettingsPage`
pub fn page_name(route: &str) -> String {
    let base: String = route
        .split(|c: char| c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    if base.ends_with("Page") {
        base
    } else {
        format!("{}Page", base)
    }
}
