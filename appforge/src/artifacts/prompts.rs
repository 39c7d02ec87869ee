//! Prompt construction for every generation call.
//!
//! Each system instruction starts with a `role: <tag>` line so backends and
//! logs can tell the calls apart.

use crate::artifacts::sanitize::LOOKUP_FN;
use crate::types::{ArtifactKind, ArtifactSpec, GenerationContext, IssueKind, ValidationIssue};

/// Which call a system instruction belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Idea,
    Requirements,
    Checklist,
    Notes,
    UiPlan,
    Component,
    SingleFile,
}

impl PromptKind {
    const ALL: [PromptKind; 7] = [
        PromptKind::Idea,
        PromptKind::Requirements,
        PromptKind::Checklist,
        PromptKind::Notes,
        PromptKind::UiPlan,
        PromptKind::Component,
        PromptKind::SingleFile,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            PromptKind::Idea => "idea",
            PromptKind::Requirements => "requirements",
            PromptKind::Checklist => "checklist",
            PromptKind::Notes => "notes",
            PromptKind::UiPlan => "ui-plan",
            PromptKind::Component => "component",
            PromptKind::SingleFile => "single-file",
        }
    }

    /// Recover the kind from a system instruction built here
    pub fn detect(system: &str) -> Option<Self> {
        let tag = system.lines().next()?.strip_prefix("role: ")?.trim();
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    fn header(&self) -> String {
        format!("role: {}\n", self.tag())
    }
}

pub fn idea_system() -> String {
    PromptKind::Idea.header()
        + "You turn a conversation about a software idea into a short project brief.\n\
           Reply with YAML only:\n\
           title: <3-6 word project title>\n\
           description: <one paragraph describing the product>"
}

pub fn requirements_system() -> String {
    PromptKind::Requirements.header()
        + "You write product requirements for a small web application.\n\
           Reply with YAML only:\n\
           document: |\n  <markdown requirements document>\n\
           goals: [<goal>, ...]\n\
           constraints: [<constraint>, ...]"
}

pub fn checklist_system() -> String {
    PromptKind::Checklist.header()
        + "You break requirements into an ordered implementation checklist.\n\
           Reply with a YAML list of items, each with `title` and optional `detail`."
}

pub fn notes_system() -> String {
    PromptKind::Notes.header()
        + "You write brief implementation notes (risks, open questions, suggested libraries) \
           in markdown."
}

pub fn ui_plan_system() -> String {
    PromptKind::UiPlan.header()
        + "You plan the user interface of a single-page web application.\n\
           Reply with YAML only:\n\
           components: [<PascalCaseName> or {name, description}, ...]\n\
           layout: <short layout description>\n\
           strategy: multi | single\n\
           design: {colors: {<role>: <hex>}, spacing: <text>, patterns: [<text>]}\n\
           Do not plan login, registration or password screens."
}

/// Standard instruction for component generation
pub fn component_system() -> String {
    PromptKind::Component.header() + &component_rules()
}

/// Instruction for the single-file strategy
pub fn single_file_system() -> String {
    PromptKind::SingleFile.header()
        + &component_rules()
        + "\nEverything lives in this one file: define every sub-component locally \
           and do not reference other files."
}

/// Stricter instruction for retry attempts, naming what went wrong last time
pub fn strict_system(base: &str, previous: &[ValidationIssue]) -> String {
    let mut text = format!(
        "{}\n\nYour previous attempt was rejected. Fix every problem below.\n",
        base
    );
    for issue in previous {
        let rule = match issue.kind {
            IssueKind::SyntaxError => {
                "Return complete, syntactically valid code. Close every bracket, string and tag."
            }
            IssueKind::MarkdownLeakage => {
                "Return raw source only. Never use ``` fences or any prose."
            }
            IssueKind::MissingBinding => "End the file with the window binding for the component.",
            IssueKind::Incomplete => {
                "Return the full implementation, not a sketch, placeholder or summary."
            }
        };
        text.push_str(&format!("- {} ({})\n", rule, issue.message));
    }
    text
}

fn component_rules() -> String {
    format!(
        "You write one React function component as a plain browser script (JSX, no build step).\n\
         Rules:\n\
         - No import or export statements. React is available as a global.\n\
         - Declare exactly one top-level component with the requested name.\n\
         - Reference other components only through {lookup}(\"Name\"), never directly.\n\
         - Navigate between pages with navigate(\"route\").\n\
         - Finish with: window.<Name> = <Name>;\n\
         - Output source code only, no markdown.",
        lookup = LOOKUP_FN
    )
}

/// User message for one artifact
pub fn component_request(spec: &ArtifactSpec, ctx: &GenerationContext) -> String {
    let mut text = format!(
        "Project: {}\n{}\n\nWrite the `{}` component ({}).\n",
        ctx.title,
        ctx.description,
        spec.name,
        spec.kind.label()
    );

    if let Some(description) = &spec.description {
        text.push_str(&format!("Purpose: {}\n", description));
    }

    match spec.kind {
        ArtifactKind::Container => {
            text.push_str(
                "This is the root container. Compose the whole application from the \
                 components below, each through the lookup function. Switch pages on the \
                 current route from useNavigate().\n",
            );
        }
        ArtifactKind::Page => {
            if let Some(layout) = &spec.layout {
                text.push_str(&format!(
                    "Render the page inside {}(\"{}\") for consistent navigation.\n",
                    LOOKUP_FN, layout
                ));
            }
        }
        _ => {}
    }

    let others: Vec<&str> = ctx
        .known_names
        .iter()
        .map(String::as_str)
        .filter(|n| *n != spec.name)
        .collect();
    if !others.is_empty() {
        text.push_str(&format!("Other components in this app: {}\n", others.join(", ")));
    }

    let colors: Vec<String> = ctx
        .tokens
        .colors
        .iter()
        .map(|(role, value)| format!("{}={}", role, value))
        .collect();
    text.push_str(&format!(
        "Design: colors {}; spacing {}; patterns {}\n",
        colors.join(", "),
        ctx.tokens.spacing,
        ctx.tokens.patterns.join(", ")
    ));

    if let Some(guidance) = &ctx.guidance {
        text.push_str(&format!("Guidance: {}\n", guidance));
    }

    text
}
