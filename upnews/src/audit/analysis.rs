use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

use super::AuditRecord;
use crate::categorization::{Confidence, Method};

/// Examples kept per category in the low-confidence section.
const EXAMPLES_PER_CATEGORY: usize = 5;

/// Read every parsable record of an audit log. Lines that fail to parse are
/// skipped and counted; they do not affect their neighbours.
pub async fn read_records(path: impl AsRef<Path>) -> Result<(Vec<AuditRecord>, usize)> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read audit log: {}", path.display()))?;

    let mut records = Vec::new();
    let mut skipped = 0;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(line = line_no + 1, "skipping unparsable audit line: {}", e);
                skipped += 1;
            }
        }
    }
    Ok((records, skipped))
}

/// Aggregate view over a set of audit records, used to tune keyword lists.
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub total: usize,
    pub by_method: BTreeMap<&'static str, usize>,
    pub by_confidence: BTreeMap<&'static str, usize>,
    pub by_category: BTreeMap<String, usize>,
    /// Low-confidence decisions grouped by assigned category, first few of each.
    pub low_confidence: BTreeMap<String, Vec<AuditRecord>>,
    /// Total low-confidence decisions per category, including those not kept as examples.
    pub low_confidence_totals: BTreeMap<String, usize>,
}

impl AuditReport {
    pub fn from_records(records: &[AuditRecord]) -> Self {
        let mut report = AuditReport {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            *report.by_method.entry(record.method.as_str()).or_default() += 1;
            *report.by_confidence.entry(record.confidence.as_str()).or_default() += 1;
            *report.by_category.entry(record.assigned_category.clone()).or_default() += 1;

            if record.confidence == Confidence::Low || record.method == Method::Fallback {
                *report
                    .low_confidence_totals
                    .entry(record.assigned_category.clone())
                    .or_default() += 1;
                let examples = report
                    .low_confidence
                    .entry(record.assigned_category.clone())
                    .or_default();
                if examples.len() < EXAMPLES_PER_CATEGORY {
                    examples.push(record.clone());
                }
            }
        }

        report
    }

    fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Categorized items: {}", self.total)?;

        let sections: [(&str, Vec<(&str, usize)>); 3] = [
            ("Methods", self.by_method.iter().map(|(k, v)| (*k, *v)).collect()),
            ("Confidence", self.by_confidence.iter().map(|(k, v)| (*k, *v)).collect()),
            ("Categories", self.by_category.iter().map(|(k, v)| (k.as_str(), *v)).collect()),
        ];
        for (title, rows) in sections {
            writeln!(f, "\n--- {} ---", title)?;
            for (name, count) in rows {
                writeln!(f, "  {}: {} ({:.1}%)", name, count, self.percent(count))?;
            }
        }

        if !self.low_confidence.is_empty() {
            let total: usize = self.low_confidence_totals.values().sum();
            writeln!(f, "\n--- Items needing more keywords ({}) ---", total)?;
            for (category, examples) in &self.low_confidence {
                let count = self.low_confidence_totals.get(category).copied().unwrap_or(0);
                writeln!(f, "\n  {} ({} items)", category, count)?;
                for record in examples {
                    let title: String = record.title.chars().take(80).collect();
                    writeln!(f, "    - \"{}\"", title)?;
                    writeln!(f, "      source: {} ({})", record.source, record.source_category)?;
                }
                if count > examples.len() {
                    writeln!(f, "    ... and {} more", count - examples.len())?;
                }
            }
        }
        Ok(())
    }
}
