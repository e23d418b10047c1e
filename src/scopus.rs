//! Scopus API client.
//!
//! Fetches the raw JSON for an author profile, the author's metrics, the
//! author's document identifiers and each document's abstract record. Every
//! call is a single attempt: no retries, no caching, no rate limiting.

use crate::config::{Config, FailurePolicy};
use crate::endpoints::Endpoint;
use crate::error::{Result, ScopusError};
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// API key header expected by Elsevier APIs
const API_KEY_HEADER: &str = "X-ELS-APIKey";

/// Longest body excerpt kept in a status error
const ERROR_BODY_EXCERPT: usize = 200;

/// Identifiers returned by the document search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentIdPage {
    /// `dc:identifier` values in upstream order
    pub ids: Vec<String>,
    /// `opensearch:totalResults`, when upstream reports it
    pub total_results: Option<u64>,
    /// More documents exist upstream than were collected
    pub truncated: bool,
}

/// Raw abstract record paired with the identifier it was fetched for
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub id: String,
    pub raw: Value,
}

/// Strip the `SCOPUS_ID:` style prefix from a `dc:identifier`.
pub fn scopus_key(identifier: &str) -> &str {
    identifier.rsplit(':').next().unwrap_or(identifier)
}

/// Scopus API client
#[derive(Debug, Clone)]
pub struct ScopusClient {
    client: Client,
    base_url: String,
}

impl ScopusClient {
    /// Create a client that sends the configured API key on every request.
    pub fn new(config: &Config) -> Result<Self> {
        let mut key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            ScopusError::Config("api_key contains characters not allowed in a header".to_string())
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("scopus-report/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScopusError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Author search response for `author_id`.
    pub async fn fetch_author(&self, author_id: &str) -> Result<Value> {
        require_author_id(author_id)?;
        self.get_json(Endpoint::AuthorSearch, author_id, &[]).await
    }

    /// Author retrieval response, metrics view.
    pub async fn fetch_metrics(&self, author_id: &str) -> Result<Value> {
        require_author_id(author_id)?;
        self.get_json(Endpoint::AuthorMetrics, author_id, &[]).await
    }

    /// Document identifiers authored by `author_id`.
    ///
    /// Without `paginate` only the first `page_size` identifiers are returned
    /// and `truncated` is set when upstream holds more. With `paginate`, pages
    /// are followed until every identifier has been collected.
    pub async fn fetch_document_ids(
        &self,
        author_id: &str,
        page_size: u32,
        paginate: bool,
    ) -> Result<DocumentIdPage> {
        require_author_id(author_id)?;
        let page_size = page_size.max(1);

        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        let mut total_results = None;
        let mut start: u64 = 0;

        loop {
            let mut extra = vec![("count", page_size.to_string())];
            if start > 0 {
                extra.push(("start", start.to_string()));
            }

            let raw = self.get_json(Endpoint::DocumentSearch, author_id, &extra).await?;
            let page = parse_id_page(&raw, author_id)?;
            total_results = total_results.or(page.total_results);

            let received = page.ids.len();
            let before = ids.len();
            for id in page.ids {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
            debug!(author_id, start, received, new = ids.len() - before, "Fetched document id page");

            if !paginate || received == 0 {
                break;
            }
            // A page with nothing new means upstream is repeating itself
            if ids.len() == before {
                warn!(author_id, start, "Search page repeated known ids; stopping pagination");
                break;
            }
            start += received as u64;
            match total_results {
                Some(total) if start >= total => break,
                None if received < page_size as usize => break,
                _ => {}
            }
        }

        let truncated = total_results.is_some_and(|total| (ids.len() as u64) < total);
        if truncated {
            warn!(
                author_id,
                collected = ids.len(),
                total = total_results,
                "Document list truncated at page size; enable pagination to fetch all"
            );
        }

        info!(author_id, count = ids.len(), "Collected document identifiers");
        Ok(DocumentIdPage {
            ids,
            total_results,
            truncated,
        })
    }

    /// Abstract record for one document. Accepts a bare id or a
    /// `SCOPUS_ID:` prefixed identifier.
    pub async fn fetch_document(&self, document_id: &str) -> Result<Value> {
        let key = scopus_key(document_id);
        if key.trim().is_empty() {
            return Err(ScopusError::schema(
                document_id,
                "document identifier is empty",
            ));
        }
        self.get_json(Endpoint::AbstractRetrieval, key, &[]).await
    }

    /// Fetch every document, at most `concurrency` at a time, keeping the
    /// order of `ids`.
    ///
    /// Under [`FailurePolicy::Abort`] the first failure is returned and no
    /// further documents are requested. Under [`FailurePolicy::Skip`] a
    /// record-level failure is logged and the document left out; anything
    /// else still ends the run.
    pub async fn fetch_documents(
        &self,
        ids: &[String],
        concurrency: usize,
        policy: FailurePolicy,
    ) -> Result<Vec<FetchedDocument>> {
        info!(count = ids.len(), concurrency, ?policy, "Fetching documents");

        let mut results = stream::iter(ids.iter().cloned())
            .map(|id| async move {
                let raw = self.fetch_document(&id).await;
                (id, raw)
            })
            .buffered(concurrency.max(1));

        let mut documents = Vec::with_capacity(ids.len());
        while let Some((id, raw)) = results.next().await {
            match raw {
                Ok(raw) => documents.push(FetchedDocument { id, raw }),
                Err(e) if policy == FailurePolicy::Skip && e.is_record_level() => {
                    warn!(document_id = %id, error = %e, "Skipping document");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            fetched = documents.len(),
            skipped = ids.len() - documents.len(),
            "Document fetch complete"
        );
        Ok(documents)
    }

    /// One GET against `endpoint`, decoded as JSON.
    async fn get_json(
        &self,
        endpoint: Endpoint,
        target: &str,
        extra: &[(&str, String)],
    ) -> Result<Value> {
        let url = endpoint.url(&self.base_url, target, extra)?;
        debug!(endpoint = endpoint.name(), target, url = %url, "GET");

        let transport = |source| ScopusError::Transport {
            endpoint: endpoint.name(),
            target: target.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(ScopusError::Status {
                endpoint: endpoint.name(),
                target: target.to_string(),
                code: status.as_u16(),
                message: format!("{} {}", status, excerpt).trim().to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|source| ScopusError::Decode {
            endpoint: endpoint.name(),
            target: target.to_string(),
            source,
        })
    }
}

fn require_author_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ScopusError::Config("author_id must not be empty".to_string()));
    }
    Ok(())
}

/// Upstream sends counters either as JSON numbers or as numeric strings.
pub(crate) fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract identifiers from one document-search page.
fn parse_id_page(raw: &Value, author_id: &str) -> Result<DocumentIdPage> {
    let results = raw.get("search-results").ok_or_else(|| {
        ScopusError::schema(author_id, "document search response has no search-results")
    })?;

    let total_results = results.get("opensearch:totalResults").and_then(as_count);

    let entries = match results.get("entry") {
        Some(Value::Array(entries)) => entries.as_slice(),
        None | Some(Value::Null) => &[],
        Some(_) => {
            return Err(ScopusError::schema(
                author_id,
                "document search entry is not a list",
            ))
        }
    };

    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        // An empty result set comes back as a single entry holding an error message
        if entry.get("error").is_some() {
            continue;
        }
        let id = entry
            .get("dc:identifier")
            .and_then(Value::as_str)
            .ok_or_else(|| ScopusError::schema(author_id, "document entry has no dc:identifier"))?;
        ids.push(id.to_string());
    }

    Ok(DocumentIdPage {
        ids,
        total_results,
        truncated: false,
    })
}
