//! Sanitation of generated component source.
//!
//! An ordered pipeline of pure text-to-text transforms. Every transform is
//! idempotent, so the pipeline as a whole is too: sanitizing already-sanitized
//! text returns it unchanged.
//!
//! The load-bearing transform is [`route_cross_references`]: any reference one
//! artifact makes to another goes through `resolveComponent("Name")`, which the
//! runtime shim answers with the component or a visible placeholder.
//!
//! Artifacts load as classic scripts that share one global lexical scope, so
//! [`isolate_scope`] wraps each one in a function; only its `window.<Name>`
//! binding escapes.

use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Name of the indirection lookup provided by the runtime shim
pub const LOOKUP_FN: &str = "resolveComponent";

const SCOPE_OPEN: &str = "(function () {";
const SCOPE_CLOSE: &str = "})();";

/// Capitalized JSX tags that are never other artifacts
const BUILTIN_TAGS: &[&str] = &["Fragment", "React", "StrictMode", "Suspense"];

/// What the transforms need to know about the artifact being sanitized
#[derive(Debug, Clone, Copy)]
pub struct SanitizeTarget<'a> {
    /// Declared symbol of this artifact
    pub name: &'a str,
    /// Names of the other artifacts in the run
    pub known_names: &'a [String],
}

pub type Transform = fn(&str, &SanitizeTarget<'_>) -> String;

/// The transforms, in application order
pub const PIPELINE: &[(&str, Transform)] = &[
    ("strip_markdown_fences", strip_markdown_fences),
    ("strip_module_syntax", strip_module_syntax),
    ("fix_jsx_attributes", fix_jsx_attributes),
    ("route_cross_references", route_cross_references),
    ("ensure_binding", ensure_binding),
    ("isolate_scope", isolate_scope),
    ("normalize_whitespace", normalize_whitespace),
];

/// Run every transform in order
pub fn sanitize(content: &str, target: &SanitizeTarget<'_>) -> String {
    PIPELINE
        .iter()
        .fold(content.to_string(), |text, (_, transform)| transform(&text, target))
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern"))
}

/// Keep only the contents of fenced blocks, dropping surrounding prose.
///
/// Without any fenced content (no fences, or a stray closing fence) only the
/// fence lines themselves are dropped.
pub fn strip_markdown_fences(content: &str, _target: &SanitizeTarget<'_>) -> String {
    let is_fence = |line: &str| line.trim_start().starts_with("```");
    if !content.lines().any(is_fence) {
        return content.to_string();
    }

    let mut inside = false;
    let mut fenced = Vec::new();
    for line in content.lines() {
        if is_fence(line) {
            inside = !inside;
        } else if inside {
            fenced.push(line);
        }
    }

    if fenced.iter().all(|line| line.trim().is_empty()) {
        let kept: Vec<&str> = content.lines().filter(|line| !is_fence(line)).collect();
        return join_lines(&kept, content);
    }
    join_lines(&fenced, content)
}

/// Remove ES module syntax; artifacts are loaded as plain scripts.
///
/// Import and `export { .. }` statements may span several lines.
pub fn strip_module_syntax(content: &str, _target: &SanitizeTarget<'_>) -> String {
    static IMPORT: OnceLock<Regex> = OnceLock::new();
    static EXPORT_LIST: OnceLock<Regex> = OnceLock::new();
    static EXPORT_DEFAULT_IDENT: OnceLock<Regex> = OnceLock::new();
    static EXPORT_PREFIX: OnceLock<Regex> = OnceLock::new();

    let import = regex(
        &IMPORT,
        concat!(
            r"(?m)^[ \t]*import\b[\w$*\s{},]*?(?:\bfrom\s*)?",
            r#"['"][^'"\n]+['"][ \t]*;?[ \t]*(?:\r?\n|\z)"#,
        ),
    );
    let export_list = regex(
        &EXPORT_LIST,
        concat!(
            r#"(?m)^[ \t]*export\s*\{[^}]*\}(?:\s*from\s*['"][^'"\n]+['"])?"#,
            r"[ \t]*;?[ \t]*(?:\r?\n|\z)",
        ),
    );
    let export_default_ident = regex(
        &EXPORT_DEFAULT_IDENT,
        r"(?m)^[ \t]*export\s+default\s+[A-Za-z_$][\w$]*[ \t]*;?[ \t]*(?:\r?\n|\z)",
    );
    let export_prefix = regex(
        &EXPORT_PREFIX,
        r"(?m)^([ \t]*)export\s+(?:default\s+)?(function|class|const|let|var|async\s+function)\b",
    );

    let text = import.replace_all(content, "");
    let text = export_list.replace_all(&text, "");
    let text = export_default_ident.replace_all(&text, "");
    export_prefix.replace_all(&text, "${1}${2}").into_owned()
}

/// Rewrite HTML attribute names that JSX spells differently
pub fn fix_jsx_attributes(content: &str, _target: &SanitizeTarget<'_>) -> String {
    static CLASS: OnceLock<Regex> = OnceLock::new();
    static FOR: OnceLock<Regex> = OnceLock::new();

    let class = regex(&CLASS, r#"(\s)class=(["'{])"#);
    let html_for = regex(&FOR, r#"(\s)for=(["'{])"#);

    let text = class.replace_all(content, "${1}className=${2}");
    html_for.replace_all(&text, "${1}htmlFor=${2}").into_owned()
}

/// Route every cross-artifact reference through the lookup function.
///
/// - `window.Other` reads (not assignments) of known artifacts become `resolveComponent("Other")`
/// - capitalized JSX tags that the file does not declare get a
///   `const Other = resolveComponent("Other");` line at the top
pub fn route_cross_references(content: &str, target: &SanitizeTarget<'_>) -> String {
    static WINDOW_READ: OnceLock<Regex> = OnceLock::new();
    static JSX_TAG: OnceLock<Regex> = OnceLock::new();

    let window_read = regex(&WINDOW_READ, r"window\.([A-Z][A-Za-z0-9_]*)\b");
    let jsx_tag = regex(&JSX_TAG, r"<([A-Z][A-Za-z0-9_]*)[\s/>]");

    let text = window_read.replace_all(content, |caps: &Captures<'_>| {
        let name = &caps[1];
        let rest = caps
            .get(0)
            .map(|m| content[m.end()..].trim_start())
            .unwrap_or_default();
        let is_assignment = rest.starts_with('=') && !rest.starts_with("==");
        if is_assignment || name == target.name || !target.known_names.iter().any(|k| k == name) {
            caps[0].to_string()
        } else {
            format!("{}(\"{}\")", LOOKUP_FN, name)
        }
    });

    let missing: BTreeSet<&str> = jsx_tag
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|name| *name != target.name)
        .filter(|name| !BUILTIN_TAGS.contains(name))
        .filter(|name| !declares(&text, name))
        .collect();

    if missing.is_empty() {
        return text.into_owned();
    }

    let header: String = missing
        .iter()
        .map(|name| format!("const {} = {}(\"{}\");\n", name, LOOKUP_FN, name))
        .collect();
    if is_scoped(&text) {
        let at = text.find(SCOPE_OPEN).map_or(0, |p| p + SCOPE_OPEN.len());
        let (head, body) = text.split_at(at);
        return format!("{}\n{}{}", head, header, body.trim_start_matches('\n'));
    }
    format!("{}{}", header, text)
}

/// Append the global binding for this artifact's symbol if it is missing
pub fn ensure_binding(content: &str, target: &SanitizeTarget<'_>) -> String {
    if has_binding(content, target.name) {
        return content.to_string();
    }

    let binding = format!(
        "if (typeof {name} !== \"undefined\") {{\n  window.{name} = {name};\n}}\n",
        name = target.name
    );
    if is_scoped(content) {
        let body = content.trim_end();
        let body = &body[..body.len() - SCOPE_CLOSE.len()];
        return format!("{}\n\n{}{}\n", body.trim_end(), binding, SCOPE_CLOSE);
    }
    format!("{}\n\n{}", content.trim_end(), binding)
}

/// Wrap the artifact in a function scope so its declarations stay local
pub fn isolate_scope(content: &str, _target: &SanitizeTarget<'_>) -> String {
    if is_scoped(content) {
        return content.to_string();
    }
    format!("{}\n{}\n{}\n", SCOPE_OPEN, content.trim_matches('\n'), SCOPE_CLOSE)
}

/// Whether the text is already wrapped by [`isolate_scope`]
pub fn is_scoped(content: &str) -> bool {
    content.trim_start().starts_with(SCOPE_OPEN) && content.trim_end().ends_with(SCOPE_CLOSE)
}

/// Trim trailing whitespace on every line and end with exactly one newline
pub fn normalize_whitespace(content: &str, _target: &SanitizeTarget<'_>) -> String {
    let lines: Vec<&str> = content.lines().map(str::trim_end).collect();
    let mut text = lines.join("\n").trim_matches('\n').to_string();
    text.push('\n');
    text
}

/// Whether the text binds `window.<name> = ...`
pub fn has_binding(content: &str, name: &str) -> bool {
    let needle = format!("window.{}", name);
    content.match_indices(&needle).any(|(idx, _)| {
        let rest = &content[idx + needle.len()..];
        let boundary = !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_');
        let rest = rest.trim_start();
        boundary && rest.starts_with('=') && !rest.starts_with("==")
    })
}

/// Whether the text declares `name` as a function, class or variable
pub fn declares(content: &str, name: &str) -> bool {
    let escaped = regex::escape(name);
    let pattern = format!(
        r"\b(?:function\s*\*?\s*{0}\s*\(|class\s+{0}\b|(?:const|let|var)\s+{0}\s*=)",
        escaped
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}

fn join_lines(lines: &[&str], original: &str) -> String {
    let mut text = lines.join("\n");
    if original.ends_with('\n') && !text.is_empty() {
        text.push('\n');
    }
    text
}
