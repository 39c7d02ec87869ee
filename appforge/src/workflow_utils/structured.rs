//! Extraction and parsing of structured (YAML or JSON) model output

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Extract the body of the first fenced block, or the whole text when there is none
///
/// Handles:
/// - ```yaml / ```json / ```anything blocks
/// - Generic ``` blocks
/// - Raw text
/// - A leading `---` document separator
pub fn extract_block(text: &str) -> String {
    let body = match text.find("```") {
        Some(open) => {
            let after_fence = &text[open + 3..];
            // Skip the info string (language tag) up to the end of the line
            let body_start = after_fence.find('\n').map(|n| n + 1).unwrap_or(0);
            let body = &after_fence[body_start..];
            let body_end = body.find("```").unwrap_or(body.len());
            &body[..body_end]
        }
        None => text,
    };

    clean_document(body)
}

/// Remove document separators and surrounding whitespace
pub fn clean_document(doc: &str) -> String {
    doc.trim().trim_start_matches("---").trim().to_string()
}

/// Parse model output into a typed structure.
///
/// serde_yaml also accepts JSON, so either format works.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = extract_block(text);
    if body.is_empty() {
        anyhow::bail!("model output contained no structured content");
    }

    serde_yaml::from_str(&body).with_context(|| {
        format!(
            "failed to parse structured output (preview: {})",
            body.chars().take(120).collect::<String>()
        )
    })
}
