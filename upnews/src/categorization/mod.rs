//! Cascading categorization of news items: source mapping, then keyword
//! matching, then the configured fallback.

use serde::{Deserialize, Serialize};

use crate::news::NewsItem;

pub mod classifier;
pub mod config_store;
pub mod grouping;

pub use classifier::classify;
pub use config_store::ConfigStore;
pub use grouping::{group, Grouping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Only medium and high confidence items may be used downstream.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Confidence::High | Confidence::Medium)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    SourceMapping,
    KeywordMatch,
    Fallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::SourceMapping => "source_mapping",
            Method::KeywordMatch => "keyword_match",
            Method::Fallback => "fallback",
        }
    }
}

/// Outcome of classifying one item.
///
/// Built only through the per-method constructors so that method and
/// confidence stay consistent: source mapping is always high, keyword
/// matches are medium or high, fallback is always low.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: String,
    pub confidence: Confidence,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
}

impl ClassificationResult {
    pub fn source_mapping(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            confidence: Confidence::High,
            method: Method::SourceMapping,
            match_count: None,
        }
    }

    /// `match_count` is at least 2; three or more matches is high confidence.
    pub fn keyword_match(category: impl Into<String>, match_count: usize) -> Self {
        let confidence = if match_count >= 3 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        Self {
            category: category.into(),
            confidence,
            method: Method::KeywordMatch,
            match_count: Some(match_count),
        }
    }

    pub fn fallback(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            confidence: Confidence::Low,
            method: Method::Fallback,
            match_count: None,
        }
    }
}

/// A news item paired with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    pub item: NewsItem,
    pub classification: ClassificationResult,
}

impl ClassifiedItem {
    pub fn confidence(&self) -> Confidence {
        self.classification.confidence
    }

    pub fn url(&self) -> &str {
        &self.item.url
    }
}
