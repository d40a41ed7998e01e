//! Append-only record of every classification decision.
//!
//! The file sink writes one JSON object per line so each decision can be read
//! back on its own, even when a neighbouring line is damaged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::categorization::{ClassificationResult, Confidence, Method};
use crate::error::AuditWriteError;
use crate::news::NewsItem;

pub mod analysis;

pub use analysis::{read_records, AuditReport};

/// File name of the log inside the audit directory.
pub const AUDIT_FILE_NAME: &str = "categorization.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub url: String,
    pub source: String,
    pub source_category: String,
    pub assigned_category: String,
    pub method: Method,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
}

impl AuditRecord {
    pub fn new(item: &NewsItem, result: &ClassificationResult) -> Self {
        Self {
            timestamp: Utc::now(),
            title: item.title.clone(),
            url: item.url.clone(),
            source: item.source.clone(),
            source_category: item.source_category_label().to_string(),
            assigned_category: result.category.clone(),
            method: result.method,
            confidence: result.confidence,
            match_count: result.match_count,
        }
    }
}

/// Destination for audit records.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Durably store one record before returning.
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditWriteError>;
}

/// JSON-lines file sink, opened once per run.
pub struct JsonlAuditLog {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl JsonlAuditLog {
    /// Create `dir` if needed (safe on every run) and open the log for appending.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, AuditWriteError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(AUDIT_FILE_NAME);
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        debug!(path = %path.display(), "audit log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditWriteError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        // A single write of the whole line keeps records from interleaving
        // with other appenders of the same file.
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}

/// In-memory sink for tests and dry runs.
#[derive(Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditWriteError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> NewsItem {
        NewsItem {
            title: "Des abeilles sauvées".into(),
            description: "Une ruche urbaine".into(),
            url: "https://example.org/abeilles".into(),
            source: "Reporterre".into(),
            source_category: None,
            published_at: Utc::now(),
        }
    }

    #[test]
    fn record_snapshots_item_and_result() {
        let record = AuditRecord::new(&item(), &ClassificationResult::keyword_match("ecologie", 2));
        assert_eq!(record.source_category, "absent");
        assert_eq!(record.assigned_category, "ecologie");
        assert_eq!(record.method, Method::KeywordMatch);
        assert_eq!(record.confidence, Confidence::Medium);
        assert_eq!(record.match_count, Some(2));
    }

    #[tokio::test]
    async fn jsonl_log_writes_one_parsable_line_per_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_dir = dir.path().join("logs").join("nested");

        let log = JsonlAuditLog::open(&log_dir).await.expect("open log");
        log.append(&AuditRecord::new(&item(), &ClassificationResult::fallback("uncategorized")))
            .await
            .expect("append");
        log.append(&AuditRecord::new(&item(), &ClassificationResult::source_mapping("ecologie")))
            .await
            .expect("append");
        drop(log);

        // Opening again must not fail on the existing directory or truncate the file.
        let log = JsonlAuditLog::open(&log_dir).await.expect("reopen log");
        log.append(&AuditRecord::new(&item(), &ClassificationResult::keyword_match("tech", 3)))
            .await
            .expect("append");

        let content = std::fs::read_to_string(log.path()).expect("read log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let records: Vec<AuditRecord> = lines
            .iter()
            .map(|l| serde_json::from_str(l).expect("line parses alone"))
            .collect();
        assert_eq!(records[0].method, Method::Fallback);
        assert_eq!(records[1].assigned_category, "ecologie");
        assert_eq!(records[2].match_count, Some(3));
        assert!(!lines[0].contains("match_count"));
    }

    #[tokio::test]
    async fn open_fails_when_destination_is_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("logs");
        std::fs::write(&blocker, "not a directory").unwrap();
        assert!(matches!(JsonlAuditLog::open(&blocker).await, Err(AuditWriteError::Io(_))));
    }

    #[tokio::test]
    async fn memory_log_keeps_records_in_order() {
        let log = MemoryAuditLog::new();
        log.append(&AuditRecord::new(&item(), &ClassificationResult::fallback("a")))
            .await
            .unwrap();
        log.append(&AuditRecord::new(&item(), &ClassificationResult::fallback("b")))
            .await
            .unwrap();
        let categories: Vec<_> = log.records().await.into_iter().map(|r| r.assigned_category).collect();
        assert_eq!(categories, vec!["a", "b"]);
    }
}
