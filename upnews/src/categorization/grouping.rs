use std::collections::BTreeMap;
use tracing::warn;

use super::ClassifiedItem;
use crate::news::Category;

/// Classified items partitioned over the fixed category set.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// One bucket per known category, in input order. Empty buckets are kept.
    pub buckets: BTreeMap<Category, Vec<ClassifiedItem>>,
    /// Items whose assigned category is not one of the known buckets.
    pub dropped: Vec<ClassifiedItem>,
}

impl Grouping {
    pub fn bucket(&self, category: Category) -> &[ClassifiedItem] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of items that landed in a bucket.
    pub fn bucketed_len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Place each item into the bucket of its assigned category.
///
/// Items assigned to a category outside the fixed set are not rerouted to
/// `uncategorized`; they end up in `Grouping::dropped`.
pub fn group(items: impl IntoIterator<Item = ClassifiedItem>) -> Grouping {
    let mut grouping = Grouping {
        buckets: Category::ALL.into_iter().map(|c| (c, Vec::new())).collect(),
        dropped: Vec::new(),
    };

    for item in items {
        match item.classification.category.parse::<Category>() {
            Ok(category) => grouping.buckets.entry(category).or_default().push(item),
            Err(e) => {
                warn!(url = %item.item.url, "dropping item from grouping: {}", e);
                grouping.dropped.push(item);
            }
        }
    }

    grouping
}
