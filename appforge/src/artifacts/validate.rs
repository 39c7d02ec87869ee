//! Validation of generated component source.
//!
//! Checks, independent of artifact kind:
//! - `syntax_error`: unbalanced delimiters or JSX elements, unterminated
//!   strings, regex or template literals, block comments (the usual
//!   signature of truncated output)
//! - `markdown_leakage`: fence markers left in the source
//! - `missing_binding`: no `window.<Name> = ...` binding for the declared symbol
//! - `incomplete`: shorter than the configured length floor

use crate::artifacts::sanitize::has_binding;
use crate::types::{IssueKind, ValidationIssue};

/// Run every check and return the issues found, in check order
pub fn validate(name: &str, content: &str, min_len: usize) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Err(issue) = check_syntax(content) {
        issues.push(issue);
    }

    if let Some(line) = content.lines().position(|l| l.contains("```")) {
        issues.push(
            ValidationIssue::new(IssueKind::MarkdownLeakage, "markdown code fence in source")
                .at(format!("line {}", line + 1)),
        );
    }

    if !has_binding(content, name) {
        issues.push(ValidationIssue::new(
            IssueKind::MissingBinding,
            format!("no window.{} binding", name),
        ));
    }

    let len = content.trim().chars().count();
    if len < min_len {
        issues.push(ValidationIssue::new(
            IssueKind::Incomplete,
            format!("only {} characters (minimum {})", len, min_len),
        ));
    }

    issues
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Code,
    Template,
    /// Inside `<Tag ...>` before its closing `>`
    JsxTag,
    /// Children of a JSX element; quotes here are plain text
    JsxText,
}

/// An open construct and the line it was opened on
#[derive(Debug, Clone, Copy, PartialEq)]
enum Frame {
    Delim(char, usize),
    Template(usize),
    /// `${` inside a template literal
    Interpolation(usize),
    /// `{` inside JSX; closing it returns to the saved mode
    JsxExpr(usize, Mode),
    JsxElement(usize),
}

impl Frame {
    fn line(&self) -> usize {
        match *self {
            Frame::Delim(_, line)
            | Frame::Template(line)
            | Frame::Interpolation(line)
            | Frame::JsxExpr(line, _)
            | Frame::JsxElement(line) => line,
        }
    }

    fn opener(&self) -> char {
        match *self {
            Frame::Delim(open, _) => open,
            Frame::Template(_) => '`',
            Frame::Interpolation(_) | Frame::JsxExpr(..) => '{',
            Frame::JsxElement(_) => '<',
        }
    }

    fn unclosed(&self) -> String {
        match self {
            Frame::Template(_) => "unterminated template literal".to_string(),
            Frame::JsxElement(_) => "unclosed JSX element".to_string(),
            _ => format!("unclosed '{}'", self.opener()),
        }
    }
}

/// Keywords after which a `/` starts a regex and a `<` starts JSX
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "yield", "await", "instanceof",
];

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Whether an expression may start at `i`, judged by the previous token
fn expression_position(chars: &[char], i: usize) -> bool {
    let mut j = i;
    while j > 0 && chars[j - 1].is_whitespace() {
        j -= 1;
    }
    if j == 0 {
        return true;
    }

    let prev = chars[j - 1];
    if is_ident(prev) {
        let end = j;
        while j > 0 && is_ident(chars[j - 1]) {
            j -= 1;
        }
        let word: String = chars[j..end].iter().collect();
        return EXPRESSION_KEYWORDS.contains(&word.as_str());
    }
    matches!(
        prev,
        '(' | ',' | '=' | ':' | '[' | '!' | '&' | '|' | '?' | '{' | '}' | ';' | '+' | '-' | '*'
            | '%' | '~' | '^' | '<' | '>'
    )
}

/// Mode to resume once a JSX element closes
fn after_element(stack: &[Frame]) -> Mode {
    match stack.last() {
        Some(Frame::JsxElement(_)) => Mode::JsxText,
        _ => Mode::Code,
    }
}

/// Structural syntax check.
///
/// Tracks `()[]{}` nesting across code, strings, regex literals, template
/// literals (with `${...}` interpolation), comments and JSX. Quotes in JSX
/// text are plain characters. Fence lines are left to the markdown check.
pub fn check_syntax(content: &str) -> Result<(), ValidationIssue> {
    let source = content
        .lines()
        .map(|l| if l.trim_start().starts_with("```") { "" } else { l })
        .collect::<Vec<_>>()
        .join("\n");
    let chars: Vec<char> = source.chars().collect();

    let mut lines = Vec::with_capacity(chars.len() + 1);
    let mut line = 1;
    for c in &chars {
        lines.push(line);
        if *c == '\n' {
            line += 1;
        }
    }
    lines.push(line);

    let mut stack: Vec<Frame> = Vec::new();
    let mut mode = Mode::Code;
    let mut i = 0;

    let syntax = |message: String, line: usize| {
        Err(ValidationIssue::new(IssueKind::SyntaxError, message).at(format!("line {}", line)))
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let line = lines[i];

        match mode {
            Mode::Template => match c {
                '\\' => i += 1,
                '`' => {
                    stack.pop();
                    mode = Mode::Code;
                }
                '$' if next == Some('{') => {
                    stack.push(Frame::Interpolation(line));
                    mode = Mode::Code;
                    i += 1;
                }
                _ => {}
            },
            Mode::JsxTag => match c {
                '"' | '\'' => {
                    i += 1;
                    while i < chars.len() && chars[i] != c {
                        i += 1;
                    }
                    if i == chars.len() {
                        return syntax("unterminated attribute string".into(), line);
                    }
                }
                '{' => {
                    stack.push(Frame::JsxExpr(line, Mode::JsxTag));
                    mode = Mode::Code;
                }
                '/' if next == Some('>') => {
                    stack.pop();
                    mode = after_element(&stack);
                    i += 1;
                }
                '>' => mode = Mode::JsxText,
                _ => {}
            },
            Mode::JsxText => match c {
                '{' => {
                    stack.push(Frame::JsxExpr(line, Mode::JsxText));
                    mode = Mode::Code;
                }
                '<' if next == Some('/') => {
                    while i < chars.len() && chars[i] != '>' {
                        i += 1;
                    }
                    if i == chars.len() {
                        return syntax("unclosed JSX element".into(), line);
                    }
                    match stack.pop() {
                        Some(Frame::JsxElement(_)) => mode = after_element(&stack),
                        _ => return syntax("unexpected closing tag".into(), line),
                    }
                }
                '<' => {
                    stack.push(Frame::JsxElement(line));
                    mode = Mode::JsxTag;
                }
                _ => {}
            },
            Mode::Code => match c {
                '/' if next == Some('/') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '/' if next == Some('*') => {
                    i += 2;
                    loop {
                        match (chars.get(i), chars.get(i + 1)) {
                            (Some('*'), Some('/')) => break,
                            (None, _) => return syntax("unterminated block comment".into(), line),
                            _ => {}
                        }
                        i += 1;
                    }
                    i += 1;
                }
                '/' if expression_position(&chars, i) => {
                    let mut in_class = false;
                    i += 1;
                    loop {
                        match chars.get(i) {
                            Some('\\') => i += 1,
                            Some('[') => in_class = true,
                            Some(']') => in_class = false,
                            Some('/') if !in_class => break,
                            Some('\n') | None => {
                                return syntax("unterminated regular expression".into(), line)
                            }
                            _ => {}
                        }
                        i += 1;
                    }
                }
                '"' | '\'' => {
                    i += 1;
                    loop {
                        match chars.get(i) {
                            Some('\\') => i += 1,
                            Some(q) if *q == c => break,
                            Some('\n') | None => {
                                return syntax("unterminated string literal".into(), line)
                            }
                            _ => {}
                        }
                        i += 1;
                    }
                }
                '`' => {
                    stack.push(Frame::Template(line));
                    mode = Mode::Template;
                }
                '<' if next.is_some_and(|n| n.is_alphabetic() || n == '>')
                    && expression_position(&chars, i) =>
                {
                    stack.push(Frame::JsxElement(line));
                    mode = Mode::JsxTag;
                }
                '(' | '[' | '{' => stack.push(Frame::Delim(c, line)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some(Frame::Interpolation(_)) if c == '}' => mode = Mode::Template,
                        Some(Frame::JsxExpr(_, back)) if c == '}' => mode = back,
                        Some(Frame::Delim(open, _)) if open == expected => {}
                        Some(frame) => {
                            return syntax(
                                format!(
                                    "'{}' does not close '{}' opened on line {}",
                                    c,
                                    frame.opener(),
                                    frame.line()
                                ),
                                line,
                            )
                        }
                        None => return syntax(format!("unexpected '{}'", c), line),
                    }
                }
                _ => {}
            },
        }

        i += 1;
    }

    let open_template = stack.iter().rev().find(|f| matches!(f, Frame::Template(_)));
    if let Some(frame) = open_template.or(stack.last()) {
        return syntax(frame.unclosed(), frame.line());
    }

    Ok(())
}
