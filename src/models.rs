//! Normalized records written to the report.
//!
//! Field names follow the JSON shape downstream consumers already read.

use serde::{Deserialize, Serialize};

/// Research topic the author publishes in, with upstream's document frequency.
///
/// Serialized as a `[topic, frequency]` pair. The frequency is carried through
/// as upstream sent it and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Option<String>)", into = "(String, Option<String>)")]
pub struct SubjectArea {
    pub topic: String,
    pub frequency: Option<String>,
}

impl From<(String, Option<String>)> for SubjectArea {
    fn from((topic, frequency): (String, Option<String>)) -> Self {
        Self { topic, frequency }
    }
}

impl From<SubjectArea> for (String, Option<String>) {
    fn from(area: SubjectArea) -> Self {
        (area.topic, area.frequency)
    }
}

/// Author's current affiliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub id: Option<String>,
    pub institute: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Author identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub scopus_id: String,
    pub orcid: Option<String>,
    /// `"{given_name} {family_name}"`
    pub author_name: String,
    pub given_name: String,
    pub family_name: String,
    pub subject_areas: Vec<SubjectArea>,
    pub current_affiliation: Option<Affiliation>,
}

/// Citation counters; each is absent when upstream omits it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorMetrics {
    pub document_count: Option<u64>,
    pub cited_by_count: Option<u64>,
    pub citation_count: Option<u64>,
    pub h_index: Option<u64>,
    pub coauthor_count: Option<u64>,
}

/// One publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Scopus document id, without the `SCOPUS_ID:` prefix
    pub scopus_id: String,
    /// Aggregation type (Journal, Conference Proceeding, ...)
    pub document_type: Option<String>,
    /// Author display names in byline order
    #[serde(with = "joined_names")]
    pub authors: Vec<String>,
    pub title: Option<String>,
    pub publication_name: Option<String>,
    pub volume: Option<String>,
    /// Page range, or the article number when there is no page range
    pub pages: Option<String>,
    /// Cover date, `YYYY-MM-DD`
    pub date: Option<String>,
    pub doi: Option<String>,
    pub openaccess: Option<u8>,
    pub citation: u64,
}

impl DocumentRecord {
    /// Authors as the single comma-separated string of the report.
    pub fn authors_joined(&self) -> String {
        join_names(&self.authors)
    }
}

/// Join display names with `", "`.
pub fn join_names(names: &[String]) -> String {
    names.join(", ")
}

/// Authors are stored as one joined string in the report.
mod joined_names {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(names: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::join_names(names))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(joined
            .split(", ")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }
}
