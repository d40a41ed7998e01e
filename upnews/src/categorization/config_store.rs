use common::{ConfigError, MappingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Holds the mapping rules for the lifetime of a run.
///
/// The first `load` reads the document; later calls return the cached value.
/// Reloading is a separate, exclusive action.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    cell: OnceCell<Arc<MappingConfig>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            cell: OnceCell::new(),
        }
    }

    /// A store around an already-built config (tests, embedding).
    ///
    /// The config goes through the same normalization and validation as a file.
    pub fn preloaded(config: MappingConfig) -> Result<Self, ConfigError> {
        let config = config.normalized()?;
        Ok(Self {
            path: None,
            cell: OnceCell::new_with(Some(Arc::new(config))),
        })
    }

    pub async fn load(&self) -> Result<Arc<MappingConfig>, ConfigError> {
        self.cell
            .get_or_try_init(|| async {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("no mapping source configured".into()))?;
                let config = MappingConfig::from_file(path).await?;
                info!(
                    path = %path.display(),
                    source_categories = config.source_categories.len(),
                    keyword_categories = config.keyword_patterns.len(),
                    fallback = %config.fallback_category,
                    "category mapping loaded"
                );
                Ok::<_, ConfigError>(Arc::new(config))
            })
            .await
            .cloned()
    }

    /// Drop the cached mapping and read the document again.
    pub async fn reload(&mut self) -> Result<Arc<MappingConfig>, ConfigError> {
        if self.path.is_none() {
            return self.load().await;
        }
        self.cell = OnceCell::new();
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorization::{classify, Method};
    use crate::news::NewsItem;
    use chrono::Utc;
    use common::KeywordPattern;
    use std::collections::HashMap;

    fn item(title: &str, source_category: Option<&str>) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            description: String::new(),
            url: "https://example.org/a".to_string(),
            source: "Example".to_string(),
            source_category: source_category.map(str::to_string),
            published_at: Utc::now(),
        }
    }

    const MAPPING: &str = r#"
        fallback_category = "uncategorized"

        [source_categories]
        "Environnement" = "ecologie"
    "#;

    #[tokio::test]
    async fn load_caches_until_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mapping.toml");
        std::fs::write(&path, MAPPING).unwrap();

        let mut store = ConfigStore::new(&path);
        let first = store.load().await.expect("first load");

        // Changing the file has no effect on an already-loaded store.
        std::fs::write(&path, MAPPING.replace("uncategorized", "culture")).unwrap();
        let second = store.load().await.expect("cached load");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.fallback_category, "uncategorized");

        let reloaded = store.reload().await.expect("reload");
        assert_eq!(reloaded.fallback_category, "culture");
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("missing.toml"));
        assert!(matches!(store.load().await, Err(ConfigError::Read { .. })));
    }

    #[tokio::test]
    async fn preloaded_store_never_touches_disk() {
        let mut store = ConfigStore::preloaded(MappingConfig {
            source_categories: HashMap::new(),
            keyword_patterns: vec![],
            fallback_category: "uncategorized".into(),
        })
        .expect("valid mapping");
        assert_eq!(store.load().await.unwrap().fallback_category, "uncategorized");
        assert_eq!(store.reload().await.unwrap().fallback_category, "uncategorized");
    }

    #[tokio::test]
    async fn preloaded_config_is_matched_case_insensitively() {
        let store = ConfigStore::preloaded(MappingConfig {
            source_categories: HashMap::from([("Environnement".to_string(), "ecologie".to_string())]),
            keyword_patterns: vec![KeywordPattern {
                category: "tech".into(),
                keywords: vec!["IA".into(), "Robot".into()],
            }],
            fallback_category: "uncategorized".into(),
        })
        .expect("valid mapping");
        let mapping = store.load().await.expect("preloaded");

        let by_keywords = classify(&item("Une IA et un robot", None), &mapping);
        assert_eq!(by_keywords.method, Method::KeywordMatch);
        assert_eq!(by_keywords.category, "tech");

        let by_source = classify(&item("Sans rapport", Some("Environnement")), &mapping);
        assert_eq!(by_source.method, Method::SourceMapping);
        assert_eq!(by_source.category, "ecologie");
    }

    #[test]
    fn preloaded_config_is_validated() {
        let result = ConfigStore::preloaded(MappingConfig {
            source_categories: HashMap::new(),
            keyword_patterns: vec![],
            fallback_category: "  ".into(),
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
