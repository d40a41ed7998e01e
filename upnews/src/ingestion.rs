use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::CollaboratorError;
use crate::news::NewsItem;

/// A source of news items. Fetching itself happens outside this crate.
#[async_trait::async_trait]
pub trait NewsFetcher: Send + Sync {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<NewsItem>>;
}

/// Reads a batch of already-fetched items, stored as a JSON array.
pub struct BatchFileFetcher {
    name: String,
    path: PathBuf,
}

impl BatchFileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

#[async_trait::async_trait]
impl NewsFetcher for BatchFileFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read batch file: {}", self.path.display()))?;
        let items: Vec<NewsItem> = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse batch file: {}", self.path.display()))?;
        Ok(items)
    }
}

/// Items gathered from all sources, plus the sources that failed.
#[derive(Debug, Default)]
pub struct Gathered {
    pub items: Vec<NewsItem>,
    pub failures: Vec<CollaboratorError>,
}

/// Fetch from every source concurrently. A failing source is reported and
/// does not discard what the other sources returned. Items keep source order.
pub async fn gather(fetchers: &[Arc<dyn NewsFetcher>]) -> Gathered {
    let handles: Vec<_> = fetchers
        .iter()
        .cloned()
        .map(|fetcher| {
            tokio::spawn(async move {
                let result = fetcher.fetch().await;
                (fetcher.name().to_string(), result)
            })
        })
        .collect();

    let mut gathered = Gathered::default();
    for handle in handles {
        match handle.await {
            Ok((name, Ok(items))) => {
                info!(source = %name, count = items.len(), "source fetched");
                gathered.items.extend(items);
            }
            Ok((name, Err(e))) => {
                warn!(source = %name, "source failed: {:#}", e);
                gathered.failures.push(CollaboratorError::fetch(name, e));
            }
            Err(e) => {
                warn!("fetch task panicked: {}", e);
                gathered
                    .failures
                    .push(CollaboratorError::fetch("unknown", anyhow::Error::new(e)));
            }
        }
    }

    info!(
        total = gathered.items.len(),
        failed_sources = gathered.failures.len(),
        "news gathered"
    );
    gathered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct StaticFetcher(&'static str, usize);

    #[async_trait::async_trait]
    impl NewsFetcher for StaticFetcher {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch(&self) -> Result<Vec<NewsItem>> {
            Ok((0..self.1)
                .map(|i| NewsItem {
                    title: format!("{} {}", self.0, i),
                    description: String::new(),
                    url: format!("https://{}.example/{}", self.0, i),
                    source: self.0.to_string(),
                    source_category: None,
                    published_at: Utc::now(),
                })
                .collect())
        }
    }

    struct BrokenFetcher;

    #[async_trait::async_trait]
    impl NewsFetcher for BrokenFetcher {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self) -> Result<Vec<NewsItem>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn failing_source_does_not_discard_others() {
        let fetchers: Vec<Arc<dyn NewsFetcher>> = vec![
            Arc::new(StaticFetcher("alpha", 2)),
            Arc::new(BrokenFetcher),
            Arc::new(StaticFetcher("beta", 3)),
        ];

        let gathered = gather(&fetchers).await;
        assert_eq!(gathered.items.len(), 5);
        assert_eq!(gathered.items[0].source, "alpha");
        assert_eq!(gathered.items[4].source, "beta");
        assert_eq!(gathered.failures.len(), 1);
        assert!(matches!(
            &gathered.failures[0],
            CollaboratorError::Fetch { source_name, .. } if source_name == "broken"
        ));
    }

    #[tokio::test]
    async fn batch_file_is_read_as_json_array() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("reporterre.json");
        std::fs::write(
            &path,
            r#"[{"title":"A","description":"d","url":"https://r/a","source":"Reporterre","source_category":"Climat","published_at":"2025-03-01T08:00:00Z"}]"#,
        )
        .unwrap();

        let fetcher = BatchFileFetcher::new(&path);
        assert_eq!(fetcher.name(), "reporterre");
        let items = fetcher.fetch().await.expect("read batch");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_category.as_deref(), Some("Climat"));

        let missing = BatchFileFetcher::new(dir.path().join("missing.json"));
        assert!(missing.fetch().await.is_err());
    }
}
