//! Normalization of raw Scopus responses.
//!
//! Maps the irregular upstream JSON (string-typed counters, single objects
//! where lists are expected, error entries in place of empty results) onto
//! the records in [`crate::models`]. Optional fields that are missing become
//! `None`; a missing required path is a [`ScopusError::Schema`] for that
//! record only.

use crate::config::FailurePolicy;
use crate::error::{OptionExt, Result, ScopusError};
use crate::models::{Affiliation, AuthorMetrics, AuthorProfile, DocumentRecord, SubjectArea};
use crate::scopus::{as_count, scopus_key, FetchedDocument};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Upstream collapses one-element lists into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

// === Author search ===

#[derive(Debug, Deserialize)]
struct AuthorSearchResponse {
    #[serde(rename = "search-results")]
    search_results: AuthorSearchResults,
}

#[derive(Debug, Deserialize)]
struct AuthorSearchResults {
    #[serde(default)]
    entry: Vec<AuthorEntry>,
}

#[derive(Debug, Deserialize)]
struct AuthorEntry {
    #[serde(rename = "dc:identifier")]
    identifier: Option<String>,
    orcid: Option<String>,
    #[serde(rename = "preferred-name")]
    preferred_name: Option<PreferredName>,
    #[serde(rename = "subject-area")]
    subject_area: Option<OneOrMany<RawSubjectArea>>,
    #[serde(rename = "affiliation-current")]
    affiliation_current: Option<OneOrMany<RawAffiliation>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PreferredName {
    #[serde(rename = "given-name")]
    given_name: Option<String>,
    surname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSubjectArea {
    #[serde(rename = "$")]
    label: Option<String>,
    #[serde(rename = "@frequency")]
    frequency: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAffiliation {
    #[serde(rename = "affiliation-id")]
    id: Option<String>,
    #[serde(rename = "affiliation-name")]
    name: Option<String>,
    #[serde(rename = "affiliation-city")]
    city: Option<String>,
    #[serde(rename = "affiliation-country")]
    country: Option<String>,
}

// === Author metrics ===

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(rename = "author-retrieval-response")]
    responses: OneOrMany<MetricsEntry>,
}

#[derive(Debug, Deserialize)]
struct MetricsEntry {
    coredata: Option<MetricsCoredata>,
    #[serde(rename = "h-index")]
    h_index: Option<Value>,
    #[serde(rename = "coauthor-count")]
    coauthor_count: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct MetricsCoredata {
    #[serde(rename = "document-count")]
    document_count: Option<Value>,
    #[serde(rename = "cited-by-count")]
    cited_by_count: Option<Value>,
    #[serde(rename = "citation-count")]
    citation_count: Option<Value>,
}

// === Abstract retrieval ===

#[derive(Debug, Deserialize)]
struct AbstractResponse {
    #[serde(rename = "abstracts-retrieval-response")]
    record: AbstractRecord,
}

#[derive(Debug, Deserialize)]
struct AbstractRecord {
    coredata: Coredata,
    authors: Option<RawAuthors>,
}

#[derive(Debug, Deserialize)]
struct RawAuthors {
    author: Option<OneOrMany<RawAuthor>>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    #[serde(rename = "ce:given-name")]
    given_name: Option<String>,
    #[serde(rename = "ce:surname")]
    surname: Option<String>,
    #[serde(rename = "ce:indexed-name")]
    indexed_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Coredata {
    #[serde(rename = "prism:aggregationType")]
    aggregation_type: Option<String>,
    #[serde(rename = "dc:title")]
    title: Option<String>,
    #[serde(rename = "prism:publicationName")]
    publication_name: Option<String>,
    #[serde(rename = "prism:volume")]
    volume: Option<Value>,
    #[serde(rename = "prism:pageRange")]
    page_range: Option<String>,
    #[serde(rename = "article-number")]
    article_number: Option<String>,
    #[serde(rename = "prism:coverDate")]
    cover_date: Option<String>,
    #[serde(rename = "prism:doi")]
    doi: Option<String>,
    #[serde(rename = "citedby-count")]
    cited_by_count: Option<Value>,
    openaccess: Option<Value>,
}

/// `"{given_name} {family_name}"`.
pub fn display_name(given_name: &str, family_name: &str) -> String {
    format!("{} {}", given_name, family_name)
}

/// Normalize an author-search response.
///
/// `requested_id` is used as the Scopus id when the entry carries no
/// `dc:identifier`.
pub fn author_profile(raw: &Value, requested_id: &str) -> Result<AuthorProfile> {
    let response = AuthorSearchResponse::deserialize(raw)
        .map_err(|e| ScopusError::schema(requested_id, format!("author search: {}", e)))?;

    let entry = response
        .search_results
        .entry
        .into_iter()
        .next()
        .ok_or_schema(requested_id, "author search returned no entries")?;

    if let Some(message) = entry.error {
        return Err(ScopusError::schema(
            requested_id,
            format!("author search: {}", message),
        ));
    }

    let name = entry
        .preferred_name
        .ok_or_schema(requested_id, "author entry has no preferred-name")?;
    let given_name = name
        .given_name
        .ok_or_schema(requested_id, "preferred-name has no given-name")?;
    let family_name = name
        .surname
        .ok_or_schema(requested_id, "preferred-name has no surname")?;

    let scopus_id = entry
        .identifier
        .as_deref()
        .map(scopus_key)
        .filter(|id| !id.is_empty())
        .unwrap_or(requested_id)
        .to_string();

    let subject_areas = entry
        .subject_area
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|area| {
            let frequency = area.frequency.as_ref().and_then(opaque_text);
            match area.label {
                Some(topic) => Some(SubjectArea { topic, frequency }),
                None => {
                    debug!(author_id = requested_id, "Subject area without label dropped");
                    None
                }
            }
        })
        .collect();

    let current_affiliation = entry
        .affiliation_current
        .and_then(|a| a.into_vec().into_iter().next())
        .map(|a| Affiliation {
            id: a.id,
            institute: a.name,
            city: a.city,
            country: a.country,
        });

    Ok(AuthorProfile {
        scopus_id,
        orcid: entry.orcid,
        author_name: display_name(&given_name, &family_name),
        given_name,
        family_name,
        subject_areas,
        current_affiliation,
    })
}

/// Normalize an author-retrieval (metrics view) response.
pub fn author_metrics(raw: &Value, author_id: &str) -> Result<AuthorMetrics> {
    let response = MetricsResponse::deserialize(raw)
        .map_err(|e| ScopusError::schema(author_id, format!("author metrics: {}", e)))?;

    let entry = response
        .responses
        .into_vec()
        .into_iter()
        .next()
        .ok_or_schema(author_id, "author metrics response is empty")?;

    let (document_count, cited_by_count, citation_count) = match &entry.coredata {
        Some(core) => (
            optional_count(author_id, "document-count", core.document_count.as_ref())?,
            optional_count(author_id, "cited-by-count", core.cited_by_count.as_ref())?,
            optional_count(author_id, "citation-count", core.citation_count.as_ref())?,
        ),
        None => (None, None, None),
    };

    Ok(AuthorMetrics {
        document_count,
        cited_by_count,
        citation_count,
        h_index: optional_count(author_id, "h-index", entry.h_index.as_ref())?,
        coauthor_count: optional_count(author_id, "coauthor-count", entry.coauthor_count.as_ref())?,
    })
}

/// Normalize one abstract-retrieval response.
pub fn document_record(document_id: &str, raw: &Value) -> Result<DocumentRecord> {
    let scopus_id = scopus_key(document_id);
    let response = AbstractResponse::deserialize(raw)
        .map_err(|e| ScopusError::schema(scopus_id, format!("abstract retrieval: {}", e)))?;
    let record = response.record;
    let core = record.coredata;

    let authors = record
        .authors
        .and_then(|a| a.author)
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .iter()
        .filter_map(author_display_name)
        .collect();

    let citation = match core.cited_by_count {
        None | Some(Value::Null) => {
            return Err(ScopusError::schema(scopus_id, "citedby-count is missing"))
        }
        Some(ref value) => as_count(value).ok_or_else(|| {
            ScopusError::schema(scopus_id, format!("citedby-count is not numeric: {}", value))
        })?,
    };

    let openaccess = core
        .openaccess
        .as_ref()
        .and_then(as_count)
        .and_then(|flag| u8::try_from(flag).ok());

    Ok(DocumentRecord {
        scopus_id: scopus_id.to_string(),
        document_type: core.aggregation_type,
        authors,
        title: core.title,
        publication_name: core.publication_name,
        volume: core.volume.as_ref().and_then(opaque_text),
        pages: core
            .page_range
            .filter(|p| !p.is_empty())
            .or(core.article_number),
        date: core.cover_date,
        doi: core.doi,
        openaccess,
        citation,
    })
}

/// Normalize fetched documents in order.
///
/// Under [`FailurePolicy::Skip`] a document that fails normalization is
/// logged and left out; under [`FailurePolicy::Abort`] its error is returned.
pub fn document_records(
    documents: &[FetchedDocument],
    policy: FailurePolicy,
) -> Result<Vec<DocumentRecord>> {
    let mut records = Vec::with_capacity(documents.len());
    for doc in documents {
        match document_record(&doc.id, &doc.raw) {
            Ok(record) => records.push(record),
            Err(e) if policy == FailurePolicy::Skip && e.is_record_level() => {
                warn!(document_id = %doc.id, error = %e, "Skipping document");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(records)
}

/// Given name and surname, or the indexed name when either part is missing
/// or blank. Authors with no usable name are left out.
fn author_display_name(author: &RawAuthor) -> Option<String> {
    let full = match (&author.given_name, &author.surname) {
        (Some(given), Some(surname)) => clean_name(&display_name(given, surname)),
        _ => None,
    };
    full.or_else(|| author.indexed_name.as_deref().and_then(clean_name))
}

/// Author names end up in one `", "`-joined string, so commas inside a name
/// become spaces and whitespace is collapsed.
fn clean_name(name: &str) -> Option<String> {
    let cleaned = name
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Strings pass through, numbers are rendered, anything else is absent.
fn opaque_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_count(target: &str, field: &str, value: Option<&Value>) -> Result<Option<u64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => as_count(v)
            .map(Some)
            .ok_or_else(|| ScopusError::schema(target, format!("{} is not numeric: {}", field, v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn abstract_json(coredata: Value, authors: Value) -> Value {
        json!({
            "abstracts-retrieval-response": {
                "coredata": coredata,
                "authors": { "author": authors }
            }
        })
    }

    fn author_search_json(entry: Value) -> Value {
        json!({ "search-results": { "entry": [entry] } })
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Lorenzo", "Carnevale"), "Lorenzo Carnevale");
    }

    #[test]
    fn test_author_profile_minimal_entry() -> Result<()> {
        let raw = author_search_json(json!({
            "orcid": "0000-0001",
            "preferred-name": { "given-name": "Ada", "surname": "Lovelace" }
        }));
        let profile = author_profile(&raw, "7004212771")?;
        assert_eq!(profile.orcid.as_deref(), Some("0000-0001"));
        assert_eq!(profile.given_name, "Ada");
        assert_eq!(profile.family_name, "Lovelace");
        assert_eq!(profile.author_name, "Ada Lovelace");
        assert_eq!(profile.scopus_id, "7004212771");
        assert!(profile.subject_areas.is_empty());
        assert!(profile.current_affiliation.is_none());
        Ok(())
    }

    #[test]
    fn test_author_profile_full_entry() -> Result<()> {
        let raw = author_search_json(json!({
            "dc:identifier": "AUTHOR_ID:57195963279",
            "preferred-name": { "given-name": "Lorenzo", "surname": "Carnevale" },
            "subject-area": [
                { "@abbrev": "COMP", "@frequency": "25", "$": "Computer Science" },
                { "@abbrev": "ENGI", "@frequency": 12, "$": "Engineering" }
            ],
            "affiliation-current": {
                "affiliation-id": "60010146",
                "affiliation-name": "Università degli Studi di Messina",
                "affiliation-city": "Messina",
                "affiliation-country": "Italy"
            }
        }));
        let profile = author_profile(&raw, "ignored")?;
        assert_eq!(profile.scopus_id, "57195963279");
        assert_eq!(profile.author_name, "Lorenzo Carnevale");
        assert_eq!(profile.subject_areas.len(), 2);
        assert_eq!(profile.subject_areas[0].topic, "Computer Science");
        assert_eq!(profile.subject_areas[0].frequency.as_deref(), Some("25"));
        assert_eq!(profile.subject_areas[1].frequency.as_deref(), Some("12"));
        let affiliation = profile.current_affiliation.ok_or_schema("test", "affiliation")?;
        assert_eq!(affiliation.id.as_deref(), Some("60010146"));
        assert_eq!(affiliation.city.as_deref(), Some("Messina"));
        assert_eq!(affiliation.country.as_deref(), Some("Italy"));
        Ok(())
    }

    #[test]
    fn test_author_profile_single_subject_area_object() -> Result<()> {
        let raw = author_search_json(json!({
            "preferred-name": { "given-name": "Ada", "surname": "Lovelace" },
            "subject-area": { "@frequency": "3", "$": "Mathematics" }
        }));
        let profile = author_profile(&raw, "1")?;
        assert_eq!(profile.subject_areas.len(), 1);
        assert_eq!(profile.subject_areas[0].topic, "Mathematics");
        Ok(())
    }

    #[test]
    fn test_author_profile_empty_entries_is_schema_error() {
        let raw = json!({ "search-results": { "entry": [] } });
        assert!(matches!(
            author_profile(&raw, "1"),
            Err(ScopusError::Schema { .. })
        ));
    }

    #[test]
    fn test_author_profile_error_entry_is_schema_error() {
        let raw = author_search_json(json!({ "@_fa": "true", "error": "Result set was empty" }));
        match author_profile(&raw, "1") {
            Err(ScopusError::Schema { message, .. }) => {
                assert!(message.contains("Result set was empty"))
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_author_profile_missing_surname_is_schema_error() {
        let raw = author_search_json(json!({ "preferred-name": { "given-name": "Ada" } }));
        assert!(matches!(
            author_profile(&raw, "1"),
            Err(ScopusError::Schema { .. })
        ));
    }

    #[test]
    fn test_author_metrics() -> Result<()> {
        let raw = json!({
            "author-retrieval-response": [{
                "coredata": {
                    "document-count": "42",
                    "cited-by-count": "310",
                    "citation-count": "401"
                },
                "h-index": "11",
                "coauthor-count": "87"
            }]
        });
        let metrics = author_metrics(&raw, "1")?;
        assert_eq!(
            metrics,
            AuthorMetrics {
                document_count: Some(42),
                cited_by_count: Some(310),
                citation_count: Some(401),
                h_index: Some(11),
                coauthor_count: Some(87),
            }
        );
        Ok(())
    }

    #[test]
    fn test_author_metrics_missing_fields_are_absent() -> Result<()> {
        let raw = json!({ "author-retrieval-response": [{ "h-index": 5 }] });
        let metrics = author_metrics(&raw, "1")?;
        assert_eq!(metrics.h_index, Some(5));
        assert_eq!(metrics.document_count, None);
        assert_eq!(metrics.coauthor_count, None);
        Ok(())
    }

    #[test]
    fn test_author_metrics_non_numeric_is_schema_error() {
        let raw = json!({ "author-retrieval-response": [{ "h-index": "eleven" }] });
        assert!(matches!(
            author_metrics(&raw, "1"),
            Err(ScopusError::Schema { .. })
        ));
    }

    #[test]
    fn test_document_record_fields() -> Result<()> {
        let raw = abstract_json(
            json!({
                "prism:aggregationType": "Journal",
                "dc:title": "Federated learning at the edge",
                "prism:publicationName": "Future Generation Computer Systems",
                "prism:volume": "118",
                "prism:pageRange": "12-24",
                "article-number": "103456",
                "prism:coverDate": "2021-05-01",
                "prism:doi": "10.1016/j.future.2021.01.001",
                "citedby-count": "17",
                "openaccess": "1"
            }),
            json!([
                { "ce:given-name": "Jane", "ce:surname": "Doe", "ce:indexed-name": "Doe J." },
                { "ce:given-name": "Tom", "ce:surname": "Smith", "ce:indexed-name": "Smith T." }
            ]),
        );
        let record = document_record("SCOPUS_ID:85012345678", &raw)?;
        assert_eq!(record.scopus_id, "85012345678");
        assert_eq!(record.document_type.as_deref(), Some("Journal"));
        assert_eq!(record.authors_joined(), "Jane Doe, Tom Smith");
        assert_eq!(record.volume.as_deref(), Some("118"));
        assert_eq!(record.pages.as_deref(), Some("12-24"));
        assert_eq!(record.date.as_deref(), Some("2021-05-01"));
        assert_eq!(record.citation, 17);
        assert_eq!(record.openaccess, Some(1));
        Ok(())
    }

    #[test]
    fn test_pages_fall_back_to_article_number() -> Result<()> {
        let raw = abstract_json(
            json!({ "article-number": "e0245", "citedby-count": "0" }),
            json!([]),
        );
        let record = document_record("1", &raw)?;
        assert_eq!(record.pages.as_deref(), Some("e0245"));

        let raw = abstract_json(
            json!({ "prism:pageRange": "", "article-number": "7", "citedby-count": 0 }),
            json!([]),
        );
        assert_eq!(document_record("1", &raw)?.pages.as_deref(), Some("7"));
        Ok(())
    }

    #[test]
    fn test_authors_fall_back_to_indexed_name() -> Result<()> {
        let raw = abstract_json(
            json!({ "citedby-count": "1" }),
            json!([
                { "ce:surname": "Doe", "ce:indexed-name": "Doe J." },
                { "ce:given-name": "Tom", "ce:surname": "Smith" }
            ]),
        );
        let record = document_record("1", &raw)?;
        assert_eq!(record.authors, vec!["Doe J.", "Tom Smith"]);
        Ok(())
    }

    #[test]
    fn test_author_names_are_cleaned() -> Result<()> {
        let raw = abstract_json(
            json!({ "citedby-count": "1" }),
            json!([
                { "ce:indexed-name": "Doe, J." },
                { "ce:given-name": "Tom", "ce:surname": "Smith, Jr." },
                { "ce:given-name": "", "ce:surname": " ", "ce:indexed-name": "Rossi M." },
                { "ce:indexed-name": "" },
                { "ce:given-name": " ", "ce:surname": "" }
            ]),
        );
        let record = document_record("1", &raw)?;
        assert_eq!(record.authors, vec!["Doe J.", "Tom Smith Jr.", "Rossi M."]);
        Ok(())
    }

    #[test]
    fn test_single_author_object() -> Result<()> {
        let raw = abstract_json(
            json!({ "citedby-count": "1" }),
            json!({ "ce:given-name": "Ada", "ce:surname": "Lovelace" }),
        );
        assert_eq!(document_record("1", &raw)?.authors_joined(), "Ada Lovelace");
        Ok(())
    }

    #[test]
    fn test_non_numeric_citation_is_schema_error() {
        let raw = abstract_json(json!({ "citedby-count": "many" }), json!([]));
        match document_record("SCOPUS_ID:99", &raw) {
            Err(ScopusError::Schema { target, message }) => {
                assert_eq!(target, "99");
                assert!(message.contains("citedby-count"));
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_citation_is_schema_error() {
        let raw = abstract_json(json!({ "dc:title": "x" }), json!([]));
        assert!(matches!(
            document_record("1", &raw),
            Err(ScopusError::Schema { .. })
        ));
    }

    #[test]
    fn test_openaccess_is_optional() -> Result<()> {
        let raw = abstract_json(json!({ "citedby-count": "2" }), json!([]));
        assert_eq!(document_record("1", &raw)?.openaccess, None);

        let raw = abstract_json(json!({ "citedby-count": "2", "openaccess": null }), json!([]));
        assert_eq!(document_record("1", &raw)?.openaccess, None);
        Ok(())
    }

    #[test]
    fn test_document_records_skip_policy() -> Result<()> {
        let docs = vec![
            FetchedDocument {
                id: "1".to_string(),
                raw: abstract_json(json!({ "citedby-count": "1" }), json!([])),
            },
            FetchedDocument {
                id: "2".to_string(),
                raw: abstract_json(json!({ "citedby-count": "bad" }), json!([])),
            },
            FetchedDocument {
                id: "3".to_string(),
                raw: abstract_json(json!({ "citedby-count": "3" }), json!([])),
            },
        ];

        let records = document_records(&docs, FailurePolicy::Skip)?;
        let ids: Vec<&str> = records.iter().map(|r| r.scopus_id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);

        assert!(document_records(&docs, FailurePolicy::Abort).is_err());
        Ok(())
    }
}
