//! Turns a loosely-structured UI plan into concrete artifact specs

use std::collections::BTreeSet;
use tracing::debug;

use crate::types::{ArtifactKind, ArtifactSpec, UiPlan};

/// Name of the root container; generated separately, after everything else
pub const ROOT_CONTAINER: &str = "App";

/// Name fragments of screens that are never generated
const AUTH_PATTERNS: &[&str] = &[
    "login",
    "logout",
    "signin",
    "signup",
    "register",
    "registration",
    "password",
    "forgot",
];

/// Word segments that, on their own, name the root container
const CONTAINER_SEGMENTS: &[&str] = &["app", "main", "container", "root"];

/// Keyword table for classification; earlier rows win
const KIND_KEYWORDS: &[(ArtifactKind, &[&str])] = &[
    (ArtifactKind::Sidebar, &["sidebar", "sidenav", "drawer"]),
    (ArtifactKind::Navigation, &["nav", "header", "menu", "topbar"]),
    (ArtifactKind::Footer, &["footer"]),
    (ArtifactKind::Modal, &["modal", "dialog", "popup"]),
    (ArtifactKind::Form, &["form", "input", "editor"]),
    (ArtifactKind::DataDisplay, &["table", "list", "grid", "feed"]),
    (ArtifactKind::Card, &["card", "tile"]),
    (ArtifactKind::Visualization, &["chart", "graph", "plot", "visual"]),
    (ArtifactKind::Page, &["page", "view", "screen"]),
];

/// Used when the plan has nothing usable
pub fn default_specs() -> Vec<ArtifactSpec> {
    vec![
        ArtifactSpec::new("Header", ArtifactKind::Navigation),
        ArtifactSpec::new("MainContent", ArtifactKind::Generic),
        ArtifactSpec::new("Footer", ArtifactKind::Footer),
    ]
}

/// Resolve a plan into a non-empty, deduplicated, deterministic list of specs
pub fn resolve(plan: &UiPlan) -> Vec<ArtifactSpec> {
    let components = match plan.components.as_deref() {
        Some(components) if !components.is_empty() => components,
        _ => {
            debug!("UI plan has no component list, using defaults");
            return default_specs();
        }
    };

    let mut seen = BTreeSet::new();
    let mut specs = Vec::new();

    for component in components {
        let name = to_identifier(component.name());
        if name.is_empty() {
            continue;
        }
        if is_auth(&name) {
            debug!(name = %name, "dropping auth component");
            continue;
        }
        if is_root_container(&name) {
            debug!(name = %name, "dropping root container entry");
            continue;
        }
        if !seen.insert(name.clone()) {
            continue;
        }

        let mut spec = ArtifactSpec::new(name.as_str(), classify(&name));
        if let Some(description) = component.description() {
            spec = spec.with_description(description);
        }
        specs.push(spec);
    }

    let has_nav = specs.iter().any(|s| s.kind == ArtifactKind::Navigation);
    let has_footer = specs.iter().any(|s| s.kind == ArtifactKind::Footer);
    if has_nav && !has_footer && !seen.contains("Footer") {
        specs.push(ArtifactSpec::new("Footer", ArtifactKind::Footer));
    }

    if specs.is_empty() {
        return default_specs();
    }
    specs
}

/// Infer a kind from name keywords
pub fn classify(name: &str) -> ArtifactKind {
    let lower = name.to_lowercase();
    KIND_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ArtifactKind::Generic)
}

pub fn is_auth(name: &str) -> bool {
    let lower = name.to_lowercase();
    if AUTH_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }
    segments(name)
        .iter()
        .any(|s| s == "auth" || s.starts_with("authenticat"))
}

/// A name whose every word segment is a container word (`App`, `MainContainer`, `AppRoot`)
pub fn is_root_container(name: &str) -> bool {
    let segments = segments(name);
    !segments.is_empty()
        && segments
            .iter()
            .all(|s| CONTAINER_SEGMENTS.contains(&s.as_str()))
}

/// Lowercase word segments of a camel-case or separated name
pub fn segments(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// PascalCase identifier from free text ("user profile" -> "UserProfile")
pub fn to_identifier(raw: &str) -> String {
    let ident: String = raw
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    match ident.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("C{}", ident),
        _ => ident,
    }
}
