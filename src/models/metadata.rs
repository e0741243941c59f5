//! Resolved bibliographic metadata, produced by exactly one engine or the cache.

use serde::{Deserialize, Serialize};

/// What kind of work a resolved record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    Journal,
    Book,
    Preprint,
    WebPage,
    Legal,
    Unknown,
}

impl CitationKind {
    pub fn name(&self) -> &'static str {
        match self {
            CitationKind::Journal => "journal",
            CitationKind::Book => "book",
            CitationKind::Preprint => "preprint",
            CitationKind::WebPage => "web_page",
            CitationKind::Legal => "legal",
            CitationKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CitationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The deterministic identifiers a record may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiers {
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub isbn: Option<String>,
    pub arxiv: Option<String>,
    pub url: Option<String>,
}

impl Identifiers {
    /// Whether any deterministic identifier (DOI, PMID, ISBN, arXiv) is set.
    /// A bare URL does not count: it is not authoritative.
    pub fn has_deterministic(&self) -> bool {
        self.doi.is_some() || self.pmid.is_some() || self.isbn.is_some() || self.arxiv.is_some()
    }
}

/// Structured bibliographic metadata for one resolved fragment.
///
/// Constructed once by an engine (via [`MetadataBuilder`]) or restored from
/// the cache, and never mutated afterwards except `confidence`, which each
/// escalation layer may overwrite with its own score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    pub kind: CitationKind,

    pub title: String,

    /// Authors in publication order. Order matters: the author-position
    /// scorer rates candidates by where the query author sits in this list.
    pub authors: Vec<String>,

    pub year: Option<String>,

    /// Journal, book series, venue, or site name.
    pub container_title: Option<String>,

    pub identifiers: Identifiers,

    /// Match-likelihood heuristic in [0, 1]. Not a measure of completeness.
    pub confidence: f64,

    /// Which engine produced this record.
    pub source_engine: String,

    /// Original upstream payload, kept for downstream formatters.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw_payload: serde_json::Value,
}

impl ResolvedMetadata {
    /// Whether the record is populated enough to be worth returning.
    /// A deterministic-lookup result that passes this check wins outright.
    pub fn has_minimum_data(&self) -> bool {
        !self.title.is_empty() && (!self.authors.is_empty() || self.year.is_some())
    }

    /// Copy of this record with the confidence overwritten.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Builder for [`ResolvedMetadata`], used by every engine.
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    meta: ResolvedMetadata,
}

impl MetadataBuilder {
    pub fn new(kind: CitationKind, title: impl Into<String>, source_engine: impl Into<String>) -> Self {
        Self {
            meta: ResolvedMetadata {
                kind,
                title: title.into(),
                authors: Vec::new(),
                year: None,
                container_title: None,
                identifiers: Identifiers::default(),
                confidence: 1.0,
                source_engine: source_engine.into(),
                raw_payload: serde_json::Value::Null,
            },
        }
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.meta.authors = authors;
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        let year = year.into();
        if !year.is_empty() {
            self.meta.year = Some(year);
        }
        self
    }

    pub fn container_title(mut self, container: impl Into<String>) -> Self {
        let container = container.into();
        if !container.is_empty() {
            self.meta.container_title = Some(container);
        }
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        let doi = doi.into();
        if !doi.is_empty() {
            self.meta.identifiers.doi = Some(doi);
        }
        self
    }

    pub fn pmid(mut self, pmid: impl Into<String>) -> Self {
        let pmid = pmid.into();
        if !pmid.is_empty() {
            self.meta.identifiers.pmid = Some(pmid);
        }
        self
    }

    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        let isbn = isbn.into();
        if !isbn.is_empty() {
            self.meta.identifiers.isbn = Some(isbn);
        }
        self
    }

    pub fn arxiv(mut self, arxiv: impl Into<String>) -> Self {
        let arxiv = arxiv.into();
        if !arxiv.is_empty() {
            self.meta.identifiers.arxiv = Some(arxiv);
        }
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.meta.identifiers.url = Some(url);
        }
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.meta.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn raw_payload(mut self, payload: serde_json::Value) -> Self {
        self.meta.raw_payload = payload;
        self
    }

    pub fn build(self) -> ResolvedMetadata {
        self.meta
    }
}

/// Terminal outcome of one resolution pass.
///
/// "Not found" is a value, never an error: full-ladder exhaustion surfaces
/// as `Unresolved` carrying the original text unchanged, so downstream
/// formatting can fall back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(ResolvedMetadata),
    Unresolved { original_text: String },
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn metadata(&self) -> Option<&ResolvedMetadata> {
        match self {
            Resolution::Resolved(meta) => Some(meta),
            Resolution::Unresolved { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let meta = MetadataBuilder::new(CitationKind::Journal, "Social Capital", "crossref")
            .authors(vec!["James Coleman".to_string()])
            .year("1988")
            .container_title("American Journal of Sociology")
            .doi("10.1086/228943")
            .build();

        assert_eq!(meta.title, "Social Capital");
        assert_eq!(meta.authors, vec!["James Coleman"]);
        assert_eq!(meta.year.as_deref(), Some("1988"));
        assert_eq!(meta.identifiers.doi.as_deref(), Some("10.1086/228943"));
        assert!(meta.has_minimum_data());
        assert!(meta.identifiers.has_deterministic());
    }

    #[test]
    fn test_empty_fields_stay_none() {
        let meta = MetadataBuilder::new(CitationKind::WebPage, "A Page", "webpage")
            .year("")
            .doi("")
            .build();

        assert!(meta.year.is_none());
        assert!(meta.identifiers.doi.is_none());
        assert!(!meta.identifiers.has_deterministic());
    }

    #[test]
    fn test_minimum_data() {
        let bare = MetadataBuilder::new(CitationKind::Unknown, "", "x").build();
        assert!(!bare.has_minimum_data());

        let titled = MetadataBuilder::new(CitationKind::Unknown, "Title", "x")
            .year("2001")
            .build();
        assert!(titled.has_minimum_data());
    }

    #[test]
    fn test_confidence_clamped() {
        let meta = MetadataBuilder::new(CitationKind::Journal, "T", "x")
            .confidence(1.7)
            .build();
        assert_eq!(meta.confidence, 1.0);

        let meta = meta.with_confidence(-0.4);
        assert_eq!(meta.confidence, 0.0);
    }
}
