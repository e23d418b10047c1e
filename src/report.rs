//! Aggregate report and its persistence.
//!
//! The report is written as pretty-printed JSON through a temporary file in
//! the target directory which is then renamed over the destination, so an
//! interrupted run never leaves a truncated report behind.

use crate::error::Result;
use crate::models::{AuthorMetrics, AuthorProfile, DocumentRecord};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Author profile, metrics and publications for one researcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    #[serde(flatten)]
    pub author: AuthorProfile,
    pub metrics: AuthorMetrics,
    pub documents: Vec<DocumentRecord>,
    /// The document list stops at the search page size
    #[serde(default)]
    pub truncated: bool,
    /// RFC 3339 UTC timestamp
    pub generated_at: String,
}

impl AggregateReport {
    /// Assemble a report stamped with the current time.
    pub fn new(
        author: AuthorProfile,
        metrics: AuthorMetrics,
        documents: Vec<DocumentRecord>,
        truncated: bool,
    ) -> Self {
        Self {
            author,
            metrics,
            documents,
            truncated,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Sum of per-document citation counts.
    pub fn total_citations(&self) -> u64 {
        self.documents.iter().map(|d| d.citation).sum()
    }

    /// Documents flagged open access by upstream.
    pub fn open_access_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.openaccess.is_some_and(|flag| flag != 0))
            .count()
    }
}

/// Write `report` to `path` as JSON, replacing any previous file atomically.
pub fn write_report(path: &Path, report: &AggregateReport) -> Result<()> {
    let mut content = serde_json::to_vec_pretty(report)?;
    content.push(b'\n');
    write_atomic(path, &content)?;
    info!(
        path = %path.display(),
        documents = report.documents.len(),
        "Report written"
    );
    Ok(())
}

/// Load a report written by [`write_report`].
pub fn read_report(path: &Path) -> Result<AggregateReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write the documents as a CSV table, one row per publication.
pub fn export_documents_csv(path: &Path, documents: &[DocumentRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());

    for doc in documents {
        wtr.serialize(doc)?;
    }

    let content = wtr.into_inner().map_err(|e| e.into_error())?;
    write_atomic(path, &content)?;
    info!(path = %path.display(), rows = documents.len(), "CSV written");
    Ok(())
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
