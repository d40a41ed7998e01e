//! Daily run: classify and audit a batch, group it, then pick and generate one
//! article per category for the target date.

use chrono::{Duration, NaiveDate};
use common::MappingConfig;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::audit::{AuditLog, AuditRecord};
use crate::categorization::{classify, group, ClassifiedItem, Grouping};
use crate::error::{CollaboratorError, ConfigError, PipelineError};
use crate::llm::{extract_headline, ContentGenerator, PromptKind};
use crate::news::{Category, NewsItem};
use crate::selection::{Finalized, Selector};
use crate::storage::{PersistenceStore, PublishedArticle};

/// Characters of the source description kept as the stored summary.
const SUMMARY_CHARS: usize = 200;

/// Classify every item in order, appending one audit record per decision.
///
/// Audit failures are logged and counted; they never change a classification.
pub async fn classify_batch(
    items: Vec<NewsItem>,
    mapping: &MappingConfig,
    audit: &dyn AuditLog,
) -> (Vec<ClassifiedItem>, usize) {
    let mut classified = Vec::with_capacity(items.len());
    let mut audit_failures = 0;

    for item in items {
        let classification = classify(&item, mapping);
        if let Err(e) = audit.append(&AuditRecord::new(&item, &classification)).await {
            warn!(url = %item.url, "failed to append audit record: {}", e);
            audit_failures += 1;
        }
        classified.push(ClassifiedItem { item, classification });
    }

    (classified, audit_failures)
}

/// Publication settings of a run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Day the run happens; the exclusion window counts back from here.
    pub run_date: NaiveDate,
    /// Day the generated articles are published for.
    pub target_date: NaiveDate,
    pub language: String,
    pub exclusion_window_days: i64,
}

/// What happened to one category during a run.
#[derive(Debug)]
pub enum CategoryOutcome {
    Generated { article_id: i64, source_url: String, prompt: PromptKind },
    SkippedAlreadyPublished,
    SkippedNoFreshCandidate,
    Failed(CollaboratorError),
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(Category, CategoryOutcome)>,
}

impl RunSummary {
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, CategoryOutcome::Generated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                CategoryOutcome::SkippedAlreadyPublished | CategoryOutcome::SkippedNoFreshCandidate
            )
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CategoryOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&CategoryOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Select, generate and store one article per category with eligible items.
///
/// The exclusion set is loaded once; if that query fails the run is aborted.
/// Any other collaborator failure only affects the category being processed.
pub async fn run_daily<R: Rng>(
    groups: &Grouping,
    settings: &RunSettings,
    store: &dyn PersistenceStore,
    generator: &dyn ContentGenerator,
    selector: &mut Selector<R>,
) -> Result<RunSummary, PipelineError> {
    let since = exclusion_start(settings)?;
    let exclusion: HashSet<String> = store
        .used_identifiers_since(since)
        .await
        .map_err(CollaboratorError::persistence)?;
    info!(run_date = %settings.run_date, since = %since, used = exclusion.len(), "exclusion set loaded");

    let categories: Vec<Category> = selector
        .select_random_per_category(groups)
        .into_keys()
        .collect();
    info!(categories = categories.len(), target_date = %settings.target_date, "categories with eligible items");

    let mut summary = RunSummary::default();
    for category in categories {
        let outcome = process_category(category, groups, settings, &exclusion, store, generator, selector).await;
        match &outcome {
            CategoryOutcome::Generated { article_id, source_url, prompt } => {
                info!(%category, article_id, %source_url, %prompt, "article generated")
            }
            CategoryOutcome::SkippedAlreadyPublished => {
                info!(%category, date = %settings.target_date, "article already exists, skipping")
            }
            CategoryOutcome::SkippedNoFreshCandidate => {
                warn!(%category, "no unused candidate available, skipping")
            }
            CategoryOutcome::Failed(e) => error!(%category, "category failed: {}", e),
        }
        summary.outcomes.push((category, outcome));
    }

    info!(
        generated = summary.generated(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "daily run finished"
    );
    Ok(summary)
}

/// First day of the exclusion window: `run_date - exclusion_window_days`.
fn exclusion_start(settings: &RunSettings) -> Result<NaiveDate, ConfigError> {
    if settings.exclusion_window_days < 0 {
        return Err(ConfigError::Invalid(format!(
            "exclusion window of {} days is negative",
            settings.exclusion_window_days
        )));
    }
    Duration::try_days(settings.exclusion_window_days)
        .and_then(|window| settings.run_date.checked_sub_signed(window))
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "exclusion window of {} days before {} is out of range",
                settings.exclusion_window_days, settings.run_date
            ))
        })
}

async fn process_category<R: Rng>(
    category: Category,
    groups: &Grouping,
    settings: &RunSettings,
    exclusion: &HashSet<String>,
    store: &dyn PersistenceStore,
    generator: &dyn ContentGenerator,
    selector: &mut Selector<R>,
) -> CategoryOutcome {
    let published = match store
        .exists_for(settings.target_date, &settings.language, category)
        .await
    {
        Ok(published) => published,
        Err(e) => return CategoryOutcome::Failed(CollaboratorError::persistence(e)),
    };

    let chosen = match selector.finalize(category, groups.bucket(category), exclusion, |_| published) {
        Finalized::Selected(chosen) => chosen,
        Finalized::AlreadyPublished => return CategoryOutcome::SkippedAlreadyPublished,
        Finalized::NoFreshCandidate => return CategoryOutcome::SkippedNoFreshCandidate,
    };

    let prompt = *PromptKind::ALL
        .choose(selector.rng_mut())
        .unwrap_or(&PromptKind::Classic);
    let content = match generator.generate(&chosen.item, prompt).await {
        Ok(content) => content,
        Err(e) => return CategoryOutcome::Failed(CollaboratorError::generation(e)),
    };

    let article = PublishedArticle {
        published_date: settings.target_date,
        language: settings.language.clone(),
        title: extract_headline(&content).unwrap_or_else(|| chosen.item.title.clone()),
        summary: chosen.item.description.chars().take(SUMMARY_CHARS).collect(),
        content,
        category,
        source_url: chosen.item.url.clone(),
    };

    match store.insert(&article).await {
        Ok(article_id) => CategoryOutcome::Generated {
            article_id,
            source_url: article.source_url,
            prompt,
        },
        Err(e) => CategoryOutcome::Failed(CollaboratorError::persistence(e)),
    }
}

/// Classify, audit and group a batch in one step.
pub async fn categorize_and_group(
    items: Vec<NewsItem>,
    mapping: &MappingConfig,
    audit: &dyn AuditLog,
) -> Grouping {
    let (classified, audit_failures) = classify_batch(items, mapping, audit).await;
    if audit_failures > 0 {
        warn!(audit_failures, "some classification decisions were not audited");
    }
    let grouping = group(classified);
    for (category, items) in &grouping.buckets {
        if !items.is_empty() {
            info!(%category, count = items.len(), "bucket");
        }
    }
    grouping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(window: i64) -> RunSettings {
        RunSettings {
            run_date: NaiveDate::from_ymd_opt(2025, 6, 19).expect("valid date"),
            target_date: NaiveDate::from_ymd_opt(2025, 6, 20).expect("valid date"),
            language: "fr".into(),
            exclusion_window_days: window,
        }
    }

    #[test]
    fn exclusion_window_counts_back_from_the_run_date() {
        let since = exclusion_start(&settings(15)).expect("in range");
        assert_eq!(since, NaiveDate::from_ymd_opt(2025, 6, 4).expect("valid date"));
    }

    #[test]
    fn out_of_range_window_is_an_error() {
        assert!(matches!(exclusion_start(&settings(i64::MAX)), Err(ConfigError::Invalid(_))));
        assert!(matches!(exclusion_start(&settings(-1)), Err(ConfigError::Invalid(_))));
    }
}
