//! Scopus endpoint table.
//!
//! Each logical operation maps to a path template, fixed query parameters and
//! a field projection. `{id}` in a path segment or parameter value is replaced
//! with the author or document identifier. URL construction is pure, so the
//! upstream contract can be checked without a network.

use crate::error::{Result, ScopusError};
use url::Url;

/// Placeholder substituted with the request identifier
const ID_PLACEHOLDER: &str = "{id}";

/// Logical upstream operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Author search by Scopus author ID
    AuthorSearch,
    /// Author retrieval, metrics view
    AuthorMetrics,
    /// Document search by author ID, projected to identifiers
    DocumentSearch,
    /// Abstract retrieval by Scopus document ID
    AbstractRetrieval,
}

/// Declarative description of one endpoint
#[derive(Debug)]
pub struct Route {
    pub endpoint: Endpoint,
    pub name: &'static str,
    pub path: &'static [&'static str],
    pub params: &'static [(&'static str, &'static str)],
    /// Sent as a comma-separated `field` parameter when non-empty
    pub fields: &'static [&'static str],
}

/// Abstract fields requested per document (open access and article number
/// included).
pub const DOCUMENT_FIELDS: &[&str] = &[
    "authors",
    "openaccess",
    "title",
    "publicationName",
    "prism:issueIdentifier",
    "prism:pageRange",
    "article-number",
    "prism:isbn",
    "prism:issn",
    "coverDate",
    "doi",
    "citedby-count",
    "prism:aggregationType",
    "prism:volume",
    "subject-areas",
];

pub const ROUTES: &[Route] = &[
    Route {
        endpoint: Endpoint::AuthorSearch,
        name: "author-search",
        path: &["search", "author"],
        params: &[("query", "AU-ID({id})")],
        fields: &[],
    },
    Route {
        endpoint: Endpoint::AuthorMetrics,
        name: "author-metrics",
        path: &["author"],
        params: &[("author_id", "{id}"), ("view", "metrics")],
        fields: &[],
    },
    Route {
        endpoint: Endpoint::DocumentSearch,
        name: "document-search",
        path: &["search", "scopus"],
        params: &[("query", "AU-ID({id})")],
        fields: &["dc:identifier"],
    },
    Route {
        endpoint: Endpoint::AbstractRetrieval,
        name: "abstract-retrieval",
        path: &["abstract", "scopus_id", "{id}"],
        params: &[],
        fields: DOCUMENT_FIELDS,
    },
];

impl Endpoint {
    /// Table entry for this endpoint.
    pub fn route(self) -> &'static Route {
        // ROUTES lists every variant in declaration order
        &ROUTES[self as usize]
    }

    /// Short name used in logs and errors.
    pub fn name(self) -> &'static str {
        self.route().name
    }

    /// Build the request URL.
    ///
    /// `extra` carries per-call parameters such as `count` and `start`.
    pub fn url(self, base_url: &str, id: &str, extra: &[(&str, String)]) -> Result<Url> {
        let route = self.route();
        let mut url = Url::parse(base_url)
            .map_err(|e| ScopusError::Config(format!("Invalid base_url {}: {}", base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| ScopusError::Config(format!("base_url cannot be a base: {}", base_url)))?
            .pop_if_empty()
            .extend(route.path.iter().map(|s| s.replace(ID_PLACEHOLDER, id)));

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in route.params {
                query.append_pair(key, &value.replace(ID_PLACEHOLDER, id));
            }
            if !route.fields.is_empty() {
                query.append_pair("field", &route.fields.join(","));
            }
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.elsevier.com/content";

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_routes_match_variants() {
        for endpoint in [
            Endpoint::AuthorSearch,
            Endpoint::AuthorMetrics,
            Endpoint::DocumentSearch,
            Endpoint::AbstractRetrieval,
        ] {
            assert_eq!(endpoint.route().endpoint, endpoint);
        }
    }

    #[test]
    fn test_author_search_url() -> Result<()> {
        let url = Endpoint::AuthorSearch.url(BASE, "57195963279", &[])?;
        assert_eq!(url.path(), "/content/search/author");
        assert_eq!(query_value(&url, "query").as_deref(), Some("AU-ID(57195963279)"));
        assert_eq!(query_value(&url, "field"), None);
        Ok(())
    }

    #[test]
    fn test_metrics_url() -> Result<()> {
        let url = Endpoint::AuthorMetrics.url(BASE, "42", &[])?;
        assert_eq!(url.path(), "/content/author");
        assert_eq!(query_value(&url, "author_id").as_deref(), Some("42"));
        assert_eq!(query_value(&url, "view").as_deref(), Some("metrics"));
        Ok(())
    }

    #[test]
    fn test_document_search_url_with_paging() -> Result<()> {
        let url = Endpoint::DocumentSearch.url(
            BASE,
            "42",
            &[("count", "100".to_string()), ("start", "200".to_string())],
        )?;
        assert_eq!(url.path(), "/content/search/scopus");
        assert_eq!(query_value(&url, "field").as_deref(), Some("dc:identifier"));
        assert_eq!(query_value(&url, "count").as_deref(), Some("100"));
        assert_eq!(query_value(&url, "start").as_deref(), Some("200"));
        Ok(())
    }

    #[test]
    fn test_abstract_url_puts_id_in_path() -> Result<()> {
        let url = Endpoint::AbstractRetrieval.url(BASE, "85012345678", &[])?;
        assert_eq!(url.path(), "/content/abstract/scopus_id/85012345678");
        let fields = query_value(&url, "field").unwrap_or_default();
        assert!(fields.contains("openaccess"));
        assert!(fields.contains("article-number"));
        assert!(fields.contains("citedby-count"));
        Ok(())
    }

    #[test]
    fn test_base_url_without_path() -> Result<()> {
        let url = Endpoint::AuthorMetrics.url("http://127.0.0.1:9000/", "1", &[])?;
        assert_eq!(url.path(), "/author");
        Ok(())
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            Endpoint::AuthorSearch.url("not a url", "1", &[]),
            Err(ScopusError::Config(_))
        ));
    }
}
