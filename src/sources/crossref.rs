//! CrossRef engine: free-text search over `/works` and deterministic DOI
//! lookup over `/works/{doi}`.

use async_trait::async_trait;
use tracing::debug;

use crate::models::{CitationKind, FragmentType, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

const BASE_URL: &str = "https://api.crossref.org";
const SEARCH_ROWS: u32 = 10;

pub struct CrossrefEngine {
    client: HttpClient,
    base_url: String,
}

impl CrossrefEngine {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the engine at a different API root. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse_work(&self, work: &serde_json::Value) -> Option<ResolvedMetadata> {
        let title = work["title"][0].as_str()?.to_string();

        let authors: Vec<String> = work["author"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| {
                        let family = a["family"].as_str()?;
                        match a["given"].as_str() {
                            Some(given) => Some(format!("{given} {family}")),
                            None => Some(family.to_string()),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let year = work["published-print"]["date-parts"][0][0]
            .as_i64()
            .or_else(|| work["published-online"]["date-parts"][0][0].as_i64())
            .or_else(|| work["issued"]["date-parts"][0][0].as_i64())
            .map(|y| y.to_string());

        let kind = match work["type"].as_str() {
            Some("book") | Some("monograph") | Some("edited-book") => CitationKind::Book,
            Some("posted-content") => CitationKind::Preprint,
            _ => CitationKind::Journal,
        };

        let mut builder = MetadataBuilder::new(kind, title, "crossref")
            .authors(authors)
            .raw_payload(work.clone());

        if let Some(year) = year {
            builder = builder.year(year);
        }
        if let Some(container) = work["container-title"][0].as_str() {
            builder = builder.container_title(container);
        }
        if let Some(doi) = work["DOI"].as_str() {
            builder = builder.doi(doi);
        }
        if let Some(url) = work["URL"].as_str() {
            builder = builder.url(url);
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Engine for CrossrefEngine {
    fn id(&self) -> &'static str {
        "crossref"
    }

    fn name(&self) -> &'static str {
        "CrossRef"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::GET_BY_ID
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        debug!(engine = self.id(), query, "searching");

        let url = format!("{}/works", self.base_url);
        let rows = SEARCH_ROWS.to_string();
        let body = self
            .client
            .get_json_with_query(
                &url,
                &[("query.bibliographic", query), ("rows", rows.as_str())],
            )
            .await?;

        let items = body["message"]["items"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        Ok(items.iter().filter_map(|w| self.parse_work(w)).collect())
    }

    async fn get_by_id(
        &self,
        kind: FragmentType,
        id: &str,
    ) -> Result<Option<ResolvedMetadata>, EngineError> {
        if kind != FragmentType::Doi {
            return Err(EngineError::NotSupported(self.id().to_string()));
        }
        debug!(engine = self.id(), doi = id, "fetching by DOI");

        let url = format!("{}/works/{}", self.base_url, urlencoding::encode(id));
        match self.client.get_json(&url).await {
            Ok(body) => Ok(self.parse_work(&body["message"])),
            Err(err) => {
                let mapped: EngineError = err.into();
                if matches!(mapped, EngineError::NotFound(_)) {
                    Ok(None)
                } else {
                    Err(mapped)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_work() {
        let engine = CrossrefEngine::new(HttpClient::new());
        let work = serde_json::json!({
            "title": ["Social Capital in the Creation of Human Capital"],
            "author": [{"given": "James S.", "family": "Coleman"}],
            "issued": {"date-parts": [[1988]]},
            "container-title": ["American Journal of Sociology"],
            "type": "journal-article",
            "DOI": "10.1086/228943",
            "URL": "https://doi.org/10.1086/228943"
        });

        let meta = engine.parse_work(&work).unwrap();
        assert_eq!(meta.kind, CitationKind::Journal);
        assert_eq!(meta.title, "Social Capital in the Creation of Human Capital");
        assert_eq!(meta.authors, vec!["James S. Coleman"]);
        assert_eq!(meta.year.as_deref(), Some("1988"));
        assert_eq!(meta.identifiers.doi.as_deref(), Some("10.1086/228943"));
        assert_eq!(meta.source_engine, "crossref");
    }

    #[test]
    fn test_parse_work_without_title_is_none() {
        let engine = CrossrefEngine::new(HttpClient::new());
        assert!(engine.parse_work(&serde_json::json!({"DOI": "10.1/x"})).is_none());
    }

    #[test]
    fn test_book_type() {
        let engine = CrossrefEngine::new(HttpClient::new());
        let work = serde_json::json!({
            "title": ["Bowling Alone"],
            "type": "book"
        });
        assert_eq!(engine.parse_work(&work).unwrap().kind, CitationKind::Book);
    }
}
