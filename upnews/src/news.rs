use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel used by fetchers when an entry carries no categorical metadata.
pub const ABSENT_CATEGORY: &str = "absent";

/// A short news item as produced by a fetcher. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Unique identifier of the item
    pub url: String,
    pub source: String,
    #[serde(default)]
    pub source_category: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl NewsItem {
    /// Source category usable for mapping, if the feed provided one.
    pub fn source_category_hint(&self) -> Option<&str> {
        self.source_category
            .as_deref()
            .filter(|c| !c.trim().is_empty() && *c != ABSENT_CATEGORY)
    }

    /// Source category as written in the audit log.
    pub fn source_category_label(&self) -> &str {
        self.source_category.as_deref().unwrap_or(ABSENT_CATEGORY)
    }
}

/// Fixed set of buckets the daily selection works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ecologie")]
    Ecology,
    #[serde(rename = "social")]
    Social,
    #[serde(rename = "tech")]
    Tech,
    #[serde(rename = "santé")]
    Health,
    #[serde(rename = "culture")]
    Culture,
    #[serde(rename = "science")]
    Science,
    #[serde(rename = "uncategorized")]
    Uncategorized,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Ecology,
        Category::Social,
        Category::Tech,
        Category::Health,
        Category::Culture,
        Category::Science,
        Category::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ecology => "ecologie",
            Category::Social => "social",
            Category::Tech => "tech",
            Category::Health => "santé",
            Category::Culture => "culture",
            Category::Science => "science",
            Category::Uncategorized => "uncategorized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source_category: Option<&str>) -> NewsItem {
        NewsItem {
            title: "t".into(),
            description: String::new(),
            url: "https://example.org/a".into(),
            source: "Example".into(),
            source_category: source_category.map(str::to_string),
            published_at: Utc::now(),
        }
    }

    #[test]
    fn absent_sentinel_is_not_a_hint() {
        assert_eq!(item(None).source_category_hint(), None);
        assert_eq!(item(Some("absent")).source_category_hint(), None);
        assert_eq!(item(Some("  ")).source_category_hint(), None);
        assert_eq!(item(Some("Planète")).source_category_hint(), Some("Planète"));
        assert_eq!(item(None).source_category_label(), "absent");
    }

    #[test]
    fn category_names_parse_back() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert!("sport".parse::<Category>().is_err());
    }

    #[test]
    fn news_item_deserializes_without_optional_fields() {
        let json = r#"{"title":"A","url":"u","source":"S","published_at":"2025-01-02T03:04:05Z"}"#;
        let item: NewsItem = serde_json::from_str(json).expect("parse item");
        assert_eq!(item.description, "");
        assert_eq!(item.source_category, None);
    }
}
