//! Extract, transform, load.
//!
//! Drives one run for one author: fetch profile, metrics, document ids and
//! documents, normalize each, then hand the aggregate to the sink.

use crate::config::Config;
use crate::error::Result;
use crate::models::{AuthorMetrics, AuthorProfile};
use crate::report::{self, AggregateReport};
use crate::scopus::ScopusClient;
use crate::transform;
use std::path::Path;
use tracing::info;

/// Fetch and normalize the author profile and metrics only.
pub async fn fetch_author_summary(
    client: &ScopusClient,
    config: &Config,
) -> Result<(AuthorProfile, AuthorMetrics)> {
    let author_id = config.author_id.as_str();

    info!(author_id, "Fetching author profile");
    let raw_author = client.fetch_author(author_id).await?;
    let author = transform::author_profile(&raw_author, author_id)?;

    info!(author_id, "Fetching author metrics");
    let raw_metrics = client.fetch_metrics(author_id).await?;
    let metrics = transform::author_metrics(&raw_metrics, author_id)?;

    Ok((author, metrics))
}

/// Build the full report without writing it.
pub async fn build_report(client: &ScopusClient, config: &Config) -> Result<AggregateReport> {
    let (author, metrics) = fetch_author_summary(client, config).await?;

    let id_page = client
        .fetch_document_ids(&config.author_id, config.page_size, config.paginate)
        .await?;

    let fetched = client
        .fetch_documents(&id_page.ids, config.concurrency, config.failure_policy)
        .await?;
    let documents = transform::document_records(&fetched, config.failure_policy)?;

    info!(
        author = %author.author_name,
        documents = documents.len(),
        truncated = id_page.truncated,
        "Report assembled"
    );
    Ok(AggregateReport::new(author, metrics, documents, id_page.truncated))
}

/// Run the whole pipeline and write the report to `output`.
pub async fn run(config: &Config, output: &Path) -> Result<AggregateReport> {
    let client = ScopusClient::new(config)?;
    let report = build_report(&client, config).await?;
    report::write_report(output, &report)?;
    Ok(report)
}
