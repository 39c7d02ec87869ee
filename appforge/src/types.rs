//! Data types shared across the generation pipeline.
//!
//! 1. **Artifacts** - specs, generated units and their validation issues
//! 2. **Plans** - the loosely-structured UI plan and design tokens
//! 3. **Documents** - idea, requirements and checklist produced by the text stages
//! 4. **Bundle** - the final immutable output of a run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Artifact Types
// ============================================================================

/// Category of a generated artifact, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Navigation,
    Sidebar,
    Footer,
    Modal,
    Form,
    DataDisplay,
    Card,
    Visualization,
    Container,
    Page,
    Generic,
    /// Runtime shim, manifest and entry document emitted by the manifest builder
    Bootstrap,
}

impl ArtifactKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Navigation => "navigation",
            ArtifactKind::Sidebar => "sidebar",
            ArtifactKind::Footer => "footer",
            ArtifactKind::Modal => "modal",
            ArtifactKind::Form => "form",
            ArtifactKind::DataDisplay => "data-display",
            ArtifactKind::Card => "card",
            ArtifactKind::Visualization => "visualization",
            ArtifactKind::Container => "container",
            ArtifactKind::Page => "page",
            ArtifactKind::Generic => "generic",
            ArtifactKind::Bootstrap => "bootstrap",
        }
    }

    /// Load tier inside the entry document: components, then pages, then the root container
    pub fn load_tier(&self) -> u8 {
        match self {
            ArtifactKind::Bootstrap => 0,
            ArtifactKind::Page => 2,
            ArtifactKind::Container => 3,
            _ => 1,
        }
    }
}

/// What to generate: a name and the kind it was classified as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub name: String,
    pub kind: ArtifactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional layout dependency (the navigation artifact a page should wrap itself in)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

impl ArtifactSpec {
    pub fn new(name: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            layout: None,
        }
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::Container)
    }

    pub fn page(name: impl Into<String>, layout: Option<String>) -> Self {
        Self {
            layout,
            ..Self::new(name, ArtifactKind::Page)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Filename the generated artifact will carry inside the bundle
    pub fn filename(&self) -> String {
        match self.kind {
            ArtifactKind::Container => format!("{}.jsx", self.name),
            ArtifactKind::Page => format!("pages/{}.jsx", self.name),
            ArtifactKind::Bootstrap => self.name.clone(),
            _ => format!("components/{}.jsx", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    SyntaxError,
    MissingBinding,
    MarkdownLeakage,
    Incomplete,
}

impl IssueKind {
    /// Issues that cannot be repaired mechanically and force a retry
    pub fn is_fatal(&self) -> bool {
        matches!(self, IssueKind::SyntaxError | IssueKind::Incomplete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// One generated unit of output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub name: String,
    pub filename: String,
    pub content: String,
    pub kind: ArtifactKind,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
}

impl GeneratedArtifact {
    pub fn from_spec(spec: &ArtifactSpec, content: String, issues: Vec<ValidationIssue>) -> Self {
        Self {
            name: spec.name.clone(),
            filename: spec.filename(),
            content,
            kind: spec.kind,
            issues,
        }
    }

    pub fn bootstrap(filename: impl Into<String>, content: String) -> Self {
        let filename = filename.into();
        Self {
            name: filename.clone(),
            filename,
            content,
            kind: ArtifactKind::Bootstrap,
            issues: Vec::new(),
        }
    }
}

/// An artifact dropped after exhausting its attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFailure {
    pub name: String,
    pub filename: String,
    pub kind: ArtifactKind,
    pub issues: Vec<ValidationIssue>,
}

// ============================================================================
// Plan Types
// ============================================================================

/// A component entry in the UI plan: either a bare name or a name with a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanComponent {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl PlanComponent {
    pub fn name(&self) -> &str {
        match self {
            PlanComponent::Name(name) => name,
            PlanComponent::Detailed { name, .. } => name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            PlanComponent::Name(_) => None,
            PlanComponent::Detailed { description, .. } => description.as_deref(),
        }
    }
}

/// Loosely-structured UI plan as produced by the planning stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiPlan {
    #[serde(default)]
    pub components: Option<Vec<PlanComponent>>,
    #[serde(default)]
    pub layout: Option<String>,
    /// Optional generation strategy hint (`multi` or `single`)
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub design: Option<DesignTokens>,
}

impl UiPlan {
    pub fn with_components<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: Some(
                names
                    .into_iter()
                    .map(|n| PlanComponent::Name(n.into()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// Minimal plan used when planning fails
    pub fn fallback() -> Self {
        Self {
            layout: Some("single column".to_string()),
            ..Self::with_components(["Header", "MainContent", "Footer"])
        }
    }
}

/// Colors, spacing and recurring patterns every component should follow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignTokens {
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default)]
    pub spacing: String,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for DesignTokens {
    fn default() -> Self {
        let colors = [
            ("primary", "#2563eb"),
            ("surface", "#ffffff"),
            ("text", "#111827"),
            ("muted", "#6b7280"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            colors,
            spacing: "4px base scale".to_string(),
            patterns: vec!["rounded cards".to_string(), "flex layouts".to_string()],
        }
    }
}

/// Everything a single generation call needs to know about the rest of the project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationContext {
    pub title: String,
    pub description: String,
    /// Names of every other artifact already decided for this run
    pub known_names: Vec<String>,
    pub tokens: DesignTokens,
    pub guidance: Option<String>,
    /// Generate the root container as a self-contained single file
    pub single_file: bool,
}

impl GenerationContext {
    pub fn with_known_names(&self, names: Vec<String>) -> Self {
        Self {
            known_names: names,
            ..self.clone()
        }
    }
}

// ============================================================================
// Document Types
// ============================================================================

/// Normalized idea with a title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectIdea {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    pub markdown: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl Requirements {
    /// Minimal requirements built from the raw idea text
    pub fn fallback(idea: &ProjectIdea) -> Self {
        Self {
            markdown: format!(
                "# {}\n\n## Overview\n\n{}\n",
                idea.title,
                idea.description.trim()
            ),
            goals: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn has_goals_or_constraints(&self) -> bool {
        !self.goals.is_empty() || !self.constraints.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistSource {
    Requirements,
    Implementation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub done: bool,
    pub source: ChecklistSource,
}

/// Text documents persisted alongside the UI artifacts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocuments {
    pub title: String,
    pub description: String,
    pub requirements: String,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ============================================================================
// Bundle
// ============================================================================

/// The complete, internally-consistent output of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Every artifact, bootstrap files included, ordered by filename
    pub artifacts: Vec<GeneratedArtifact>,
    /// Artifact name -> filename, generated artifacts only
    pub registry: BTreeMap<String, String>,
    /// Filename -> issues, for artifacts that carry any (dropped ones included)
    pub issues: BTreeMap<String, Vec<ValidationIssue>>,
    pub entry_document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<ProjectDocuments>,
}

impl Bundle {
    pub fn artifact(&self, filename: &str) -> Option<&GeneratedArtifact> {
        self.artifacts.iter().find(|a| a.filename == filename)
    }

    pub fn artifact_named(&self, name: &str) -> Option<&GeneratedArtifact> {
        self.registry.get(name).and_then(|f| self.artifact(f))
    }

    /// Generated artifacts, bootstrap files excluded
    pub fn generated(&self) -> impl Iterator<Item = &GeneratedArtifact> {
        self.artifacts
            .iter()
            .filter(|a| a.kind != ArtifactKind::Bootstrap)
    }

    pub fn with_documents(self, documents: ProjectDocuments) -> Self {
        Self {
            documents: Some(documents),
            ..self
        }
    }
}
