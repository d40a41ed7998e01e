use common::MappingConfig;

use super::ClassificationResult;
use crate::news::NewsItem;

/// Minimum number of distinct keywords a category needs to be considered.
const MIN_KEYWORD_MATCHES: usize = 2;

/// Classify a single item. Never fails: the cascade always ends in the fallback.
pub fn classify(item: &NewsItem, config: &MappingConfig) -> ClassificationResult {
    map_source_category(item, config)
        .or_else(|| match_keywords(item, config))
        .unwrap_or_else(|| ClassificationResult::fallback(config.fallback_category.clone()))
}

fn map_source_category(item: &NewsItem, config: &MappingConfig) -> Option<ClassificationResult> {
    let normalized = item.source_category_hint()?.trim().to_lowercase();
    config
        .source_categories
        .get(&normalized)
        .map(ClassificationResult::source_mapping)
}

fn match_keywords(item: &NewsItem, config: &MappingConfig) -> Option<ClassificationResult> {
    let text = format!("{} {}", item.title, item.description).to_lowercase();

    let mut best: Option<(&str, usize)> = None;
    for pattern in &config.keyword_patterns {
        // Each keyword counts once, however often it occurs.
        let count = pattern
            .keywords
            .iter()
            .filter(|keyword| text.contains(keyword.to_lowercase().as_str()))
            .count();
        if count < MIN_KEYWORD_MATCHES {
            continue;
        }
        // Strictly greater: on ties the first-listed category keeps the lead.
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((pattern.category.as_str(), count));
        }
    }

    best.map(|(category, count)| ClassificationResult::keyword_match(category, count))
}
