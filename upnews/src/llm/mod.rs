use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::news::NewsItem;

pub mod prompts;
pub mod remote;

/// Writing style requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Classic,
    Immersive,
    Qa,
}

impl PromptKind {
    pub const ALL: [PromptKind; 3] = [PromptKind::Classic, PromptKind::Immersive, PromptKind::Qa];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Classic => "classic",
            PromptKind::Immersive => "immersive",
            PromptKind::Qa => "qa",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External text-generation service. Output is treated as opaque text.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, item: &NewsItem, kind: PromptKind) -> Result<String>;
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Headline of a generated article: the first `**bold**` span, trimmed.
///
/// The span must open and close on the same line.
pub fn extract_headline(text: &str) -> Option<String> {
    let headline = text.lines().find_map(bold_span)?.trim();
    if headline.is_empty() {
        None
    } else {
        Some(headline.to_string())
    }
}

fn bold_span(line: &str) -> Option<&str> {
    let start = line.find("**")? + 2;
    let rest = &line[start..];
    // At least one character between the markers.
    let first = rest.chars().next()?;
    let end = rest[first.len_utf8()..].find("**")? + first.len_utf8();
    Some(&rest[..end])
}
