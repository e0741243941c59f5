//! Semantic Scholar engine, using the Academic Graph API. An API key is
//! optional; without one the shared anonymous rate limit applies.

use async_trait::async_trait;
use tracing::debug;

use crate::models::{CitationKind, FragmentType, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const FIELDS: &str = "title,authors,year,venue,externalIds";
const LIMIT: u32 = 10;

pub struct SemanticScholarEngine {
    client: HttpClient,
    api_key: Option<String>,
}

impl SemanticScholarEngine {
    pub fn new(client: HttpClient, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, reqwest::Error> {
        match &self.api_key {
            Some(key) => {
                self.client
                    .get_json_with_headers(url, query, &[("x-api-key", key)])
                    .await
            }
            None => self.client.get_json_with_query(url, query).await,
        }
    }

    fn parse_paper(&self, paper: &serde_json::Value) -> Option<ResolvedMetadata> {
        let title = paper["title"].as_str()?;

        let authors: Vec<String> = paper["authors"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a["name"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let external = &paper["externalIds"];
        let kind = if external["ArXiv"].is_string() {
            CitationKind::Preprint
        } else {
            CitationKind::Journal
        };

        let mut builder = MetadataBuilder::new(kind, title, "semantic_scholar")
            .authors(authors)
            .raw_payload(paper.clone());

        if let Some(year) = paper["year"].as_i64() {
            builder = builder.year(year.to_string());
        }
        if let Some(venue) = paper["venue"].as_str() {
            builder = builder.container_title(venue);
        }
        if let Some(doi) = external["DOI"].as_str() {
            builder = builder.doi(doi);
        }
        if let Some(arxiv) = external["ArXiv"].as_str() {
            builder = builder.arxiv(arxiv);
        }
        if let Some(pmid) = external["PubMed"].as_str() {
            builder = builder.pmid(pmid);
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Engine for SemanticScholarEngine {
    fn id(&self) -> &'static str {
        "semantic_scholar"
    }

    fn name(&self) -> &'static str {
        "Semantic Scholar"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::GET_BY_ID
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        debug!(engine = self.id(), query, "searching");

        let url = format!("{BASE_URL}/paper/search");
        let limit = LIMIT.to_string();
        let body = self
            .get(&url, &[("query", query), ("fields", FIELDS), ("limit", limit.as_str())])
            .await?;

        let papers = body["data"].as_array().cloned().unwrap_or_default();
        Ok(papers.iter().filter_map(|p| self.parse_paper(p)).collect())
    }

    async fn get_by_id(
        &self,
        kind: FragmentType,
        id: &str,
    ) -> Result<Option<ResolvedMetadata>, EngineError> {
        let paper_id = match kind {
            FragmentType::Doi => format!("DOI:{id}"),
            FragmentType::Arxiv => format!("ARXIV:{id}"),
            FragmentType::Pmid => format!("PMID:{id}"),
            _ => return Err(EngineError::NotSupported(self.id().to_string())),
        };
        debug!(engine = self.id(), paper_id, "fetching by id");

        let url = format!("{BASE_URL}/paper/{paper_id}");
        match self.get(&url, &[("fields", FIELDS)]).await {
            Ok(body) => Ok(self.parse_paper(&body)),
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
    fn test_parse_paper() {
        let engine = SemanticScholarEngine::new(HttpClient::new(), None);
        let paper = serde_json::json!({
            "title": "Attention Is All You Need",
            "year": 2017,
            "venue": "NeurIPS",
            "authors": [{"name": "Ashish Vaswani"}, {"name": "Noam Shazeer"}],
            "externalIds": {"ArXiv": "1706.03762", "DOI": "10.48550/arXiv.1706.03762"}
        });

        let meta = engine.parse_paper(&paper).unwrap();
        assert_eq!(meta.kind, CitationKind::Preprint);
        assert_eq!(meta.authors.len(), 2);
        assert_eq!(meta.identifiers.arxiv.as_deref(), Some("1706.03762"));
        assert_eq!(meta.year.as_deref(), Some("2017"));
    }
}
