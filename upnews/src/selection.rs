//! Picks at most one fresh, sufficiently confident item per category.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};

use crate::categorization::{ClassifiedItem, Grouping};
use crate::news::Category;

/// Final outcome for one category.
#[derive(Debug, Clone, PartialEq)]
pub enum Finalized<'a> {
    Selected(&'a ClassifiedItem),
    /// The (date, language, category) slot is already filled.
    AlreadyPublished,
    /// Every eligible candidate was used recently.
    NoFreshCandidate,
}

impl<'a> Finalized<'a> {
    pub fn selected(&self) -> Option<&'a ClassifiedItem> {
        match self {
            Finalized::Selected(item) => Some(*item),
            _ => None,
        }
    }
}

/// Random selection with an injected, seedable source.
pub struct Selector<R = StdRng> {
    rng: R,
}

impl Selector<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Selector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Access to the underlying source for other draws of the same run.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// One uniformly random eligible item per non-empty bucket. Categories with
    /// no medium or high confidence item are absent from the result.
    pub fn select_random_per_category<'a>(
        &mut self,
        groups: &'a Grouping,
    ) -> BTreeMap<Category, &'a ClassifiedItem> {
        let mut selected = BTreeMap::new();
        for (category, items) in &groups.buckets {
            let eligible = eligible(items);
            if let Some(item) = eligible.choose(&mut self.rng) {
                selected.insert(*category, *item);
            }
        }
        selected
    }

    /// Choose the item to publish for `category` among `candidates`.
    ///
    /// Nothing is drawn when `already_published` reports the slot as filled.
    /// Otherwise low-confidence items and identifiers present in `exclusion`
    /// are removed before a uniform draw.
    pub fn finalize<'a>(
        &mut self,
        category: Category,
        candidates: &'a [ClassifiedItem],
        exclusion: &HashSet<String>,
        already_published: impl FnOnce(Category) -> bool,
    ) -> Finalized<'a> {
        if already_published(category) {
            return Finalized::AlreadyPublished;
        }

        let fresh: Vec<&ClassifiedItem> = eligible(candidates)
            .into_iter()
            .filter(|item| !exclusion.contains(item.url()))
            .collect();

        match fresh.choose(&mut self.rng) {
            Some(item) => Finalized::Selected(*item),
            None => Finalized::NoFreshCandidate,
        }
    }
}

fn eligible(items: &[ClassifiedItem]) -> Vec<&ClassifiedItem> {
    items.iter().filter(|item| item.confidence().is_eligible()).collect()
}
