/*!
common/src/lib.rs

Shared configuration types and DB helper functions for UpNews.

This file provides:
- Config data structures (deserialized from TOML)
- The category mapping document used by the classifier, with validation
- Async loaders for both documents
- A helper to initialize an SQLite connection pool
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Failure to obtain a usable configuration document. Always fatal for a run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file (e.g. "data/upnews.db")
    pub path: String,
}

/// Where the mapping rules live and where classification decisions are logged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationConfig {
    pub mapping_path: String,
    #[serde(default = "default_audit_dir")]
    pub audit_dir: String,
}

fn default_audit_dir() -> String {
    "logs".to_string()
}

/// Selection / publication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_language")]
    pub language: String,
    /// Identifiers used within this many days before the target date are excluded
    #[serde(default = "default_exclusion_window")]
    pub exclusion_window_days: i64,
    /// Articles are generated for today + days_ahead
    #[serde(default = "default_days_ahead")]
    pub days_ahead: i64,
    /// Fixed seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
}

fn default_language() -> String {
    "fr".to_string()
}

fn default_exclusion_window() -> i64 {
    15
}

fn default_days_ahead() -> i64 {
    1
}

/// Largest accepted `exclusion_window_days`.
pub const MAX_EXCLUSION_WINDOW_DAYS: i64 = 3650;
/// Largest accepted `days_ahead`.
pub const MAX_DAYS_AHEAD: i64 = 365;

impl SelectionConfig {
    /// Reject day counts that cannot be turned into a date range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_EXCLUSION_WINDOW_DAYS).contains(&self.exclusion_window_days) {
            return Err(ConfigError::Invalid(format!(
                "selection.exclusion_window_days must be between 0 and {}, got {}",
                MAX_EXCLUSION_WINDOW_DAYS, self.exclusion_window_days
            )));
        }
        if !(0..=MAX_DAYS_AHEAD).contains(&self.days_ahead) {
            return Err(ConfigError::Invalid(format!(
                "selection.days_ahead must be between 0 and {}, got {}",
                MAX_DAYS_AHEAD, self.days_ahead
            )));
        }
        Ok(())
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            exclusion_window_days: default_exclusion_window(),
            days_ahead: default_days_ahead(),
            seed: None,
        }
    }
}

/// Remote text-generation service (OpenAI-compatible chat completion endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub categorization: CategorizationConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    pub generator: Option<GeneratorConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        cfg.selection.validate()?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.selection.validate()?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Ordered keyword list for one app category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPattern {
    pub category: String,
    pub keywords: Vec<String>,
}

/// Mapping rules consumed by the classifier.
///
/// `keyword_patterns` keeps the document order: when two categories match the
/// same number of keywords, the one listed first wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub source_categories: HashMap<String, String>,
    #[serde(default)]
    pub keyword_patterns: Vec<KeywordPattern>,
    pub fallback_category: String,
}

impl MappingConfig {
    /// Read, parse and normalize a mapping document.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let raw: MappingConfig = toml::from_str(&data)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        raw.normalized()
    }

    /// Lower-case and trim source-category keys, lower-case keywords, and
    /// reject documents the classifier cannot apply unambiguously.
    pub fn normalized(self) -> Result<Self, ConfigError> {
        let fallback_category = self.fallback_category.trim().to_string();
        if fallback_category.is_empty() {
            return Err(ConfigError::Invalid("fallback_category is empty".into()));
        }

        let mut source_categories = HashMap::with_capacity(self.source_categories.len());
        for (raw, category) in self.source_categories {
            let key = raw.trim().to_lowercase();
            if source_categories.insert(key.clone(), category).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "source category '{}' is mapped more than once",
                    key
                )));
            }
        }

        let mut keyword_patterns: Vec<KeywordPattern> = Vec::with_capacity(self.keyword_patterns.len());
        for pattern in self.keyword_patterns {
            if keyword_patterns.iter().any(|p| p.category == pattern.category) {
                return Err(ConfigError::Invalid(format!(
                    "category '{}' appears twice in keyword_patterns",
                    pattern.category
                )));
            }
            let mut keywords = Vec::with_capacity(pattern.keywords.len());
            for keyword in pattern.keywords {
                let keyword = keyword.to_lowercase();
                if keyword.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "empty keyword in category '{}'",
                        pattern.category
                    )));
                }
                keywords.push(keyword);
            }
            keyword_patterns.push(KeywordPattern { category: pattern.category, keywords });
        }

        Ok(Self { source_categories, keyword_patterns, fallback_category })
    }
}

/// Initialize an SQLite connection pool.
///
/// This function will create the parent directory if necessary and return a configured
/// `SqlitePool`. Defaults are conservative for resource-constrained platforms:
/// - max_connections: 5
/// - connection timeout default provided by `sqlx`
///
/// Example:
///   let pool = init_db_pool("data/upnews.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = Path::new(path).parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create DB parent directory: {}", parent.display())
        })?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = r#"
        fallback_category = "uncategorized"

        [source_categories]
        " Environnement " = "ecologie"
        "Tech" = "tech"

        [[keyword_patterns]]
        category = "tech"
        keywords = ["IA", "robot"]

        [[keyword_patterns]]
        category = "ecologie"
        keywords = ["climat"]
    "#;

    #[test]
    fn config_from_string_uses_selection_defaults() {
        let toml = r#"
            [database]
            path = "data/test.db"

            [categorization]
            mapping_path = "config/category-mapping.toml"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.categorization.audit_dir, "logs");
        assert_eq!(cfg.selection.language, "fr");
        assert_eq!(cfg.selection.exclusion_window_days, 15);
        assert_eq!(cfg.selection.days_ahead, 1);
        assert!(cfg.selection.seed.is_none());
        assert!(cfg.generator.is_none());
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");
        std::fs::write(
            &default_path,
            "[database]\npath = \"a.db\"\n[categorization]\nmapping_path = \"m.toml\"\n[selection]\nlanguage = \"fr\"\nseed = 1\n",
        )
        .unwrap();
        std::fs::write(&override_path, "[selection]\nseed = 42\n").unwrap();

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("merged config");
        assert_eq!(cfg.database.path, "a.db");
        assert_eq!(cfg.selection.seed, Some(42));
        assert_eq!(cfg.selection.language, "fr");
    }

    #[tokio::test]
    async fn out_of_range_selection_days_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let base = "[database]\npath = \"a.db\"\n[categorization]\nmapping_path = \"m.toml\"\n";

        std::fs::write(&path, format!("{}[selection]\nexclusion_window_days = {}\n", base, i64::MAX)).unwrap();
        let err = Config::load_with_defaults(None, Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("exclusion_window_days"));

        std::fs::write(&path, format!("{}[selection]\ndays_ahead = -1\n", base)).unwrap();
        let err = Config::from_file(&path).await.unwrap_err();
        assert!(err.to_string().contains("days_ahead"));

        std::fs::write(&path, format!("{}[selection]\nexclusion_window_days = 0\ndays_ahead = 0\n", base)).unwrap();
        assert!(Config::from_file(&path).await.is_ok());
    }

    #[test]
    fn mapping_is_normalized_and_keeps_pattern_order() {
        let raw: MappingConfig = toml::from_str(MAPPING).expect("parse mapping");
        let cfg = raw.normalized().expect("valid mapping");

        assert_eq!(cfg.source_categories.get("environnement").map(String::as_str), Some("ecologie"));
        assert_eq!(cfg.source_categories.get("tech").map(String::as_str), Some("tech"));
        assert_eq!(cfg.keyword_patterns[0].category, "tech");
        assert_eq!(cfg.keyword_patterns[0].keywords, vec!["ia", "robot"]);
        assert_eq!(cfg.keyword_patterns[1].category, "ecologie");
    }

    #[test]
    fn colliding_source_keys_are_rejected() {
        let raw = MappingConfig {
            source_categories: HashMap::from([
                ("Tech".to_string(), "tech".to_string()),
                ("tech ".to_string(), "science".to_string()),
            ]),
            keyword_patterns: vec![],
            fallback_category: "uncategorized".into(),
        };
        assert!(matches!(raw.normalized(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_keyword_and_fallback_are_rejected() {
        let raw = MappingConfig {
            source_categories: HashMap::new(),
            keyword_patterns: vec![KeywordPattern { category: "tech".into(), keywords: vec!["  ".into()] }],
            fallback_category: "uncategorized".into(),
        };
        assert!(matches!(raw.normalized(), Err(ConfigError::Invalid(_))));

        let raw = MappingConfig {
            source_categories: HashMap::new(),
            keyword_patterns: vec![],
            fallback_category: " ".into(),
        };
        assert!(matches!(raw.normalized(), Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn missing_or_malformed_mapping_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        assert!(matches!(MappingConfig::from_file(&missing).await, Err(ConfigError::Read { .. })));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "fallback_category = [").unwrap();
        assert!(matches!(MappingConfig::from_file(&broken).await, Err(ConfigError::Parse { .. })));

        let good = dir.path().join("mapping.toml");
        std::fs::write(&good, MAPPING).unwrap();
        let cfg = MappingConfig::from_file(&good).await.expect("load mapping");
        assert_eq!(cfg.fallback_category, "uncategorized");
    }

    #[tokio::test]
    async fn db_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("upnews.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
        assert!(db_path.exists());
    }
}
