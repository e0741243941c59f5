//! Google Scholar engine via SerpAPI. Every call costs a paid credit, so
//! this engine is flagged PAID and only consulted after the free fan-out
//! comes back empty.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::models::{CitationKind, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

const BASE_URL: &str = "https://serpapi.com/search";
const NUM_RESULTS: u32 = 10;

// Scholar summaries look like "E Caplan - 1998 - ucpress.edu".
static SUMMARY_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").expect("valid year regex"));

pub struct ScholarEngine {
    client: HttpClient,
    api_key: String,
}

impl ScholarEngine {
    pub fn new(client: HttpClient, api_key: String) -> Self {
        Self { client, api_key }
    }

    fn parse_result(&self, result: &serde_json::Value) -> Option<ResolvedMetadata> {
        let title = result["title"].as_str()?;

        let summary = result["publication_info"]["summary"].as_str().unwrap_or("");
        // The summary's author segment precedes the first dash.
        let authors: Vec<String> = summary
            .split(" - ")
            .next()
            .map(|seg| {
                seg.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty() && !a.contains("…"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let year = SUMMARY_YEAR
            .find(summary)
            .map(|m| m.as_str().to_string());

        let mut builder = MetadataBuilder::new(CitationKind::Unknown, title, "google_scholar")
            .authors(authors)
            .raw_payload(result.clone());

        if let Some(year) = year {
            builder = builder.year(year);
        }
        if let Some(link) = result["link"].as_str() {
            builder = builder.url(link);
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Engine for ScholarEngine {
    fn id(&self) -> &'static str {
        "google_scholar"
    }

    fn name(&self) -> &'static str {
        "Google Scholar (SerpAPI)"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::PAID
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        debug!(engine = self.id(), query, "searching (paid)");

        let num = NUM_RESULTS.to_string();
        let body = self
            .client
            .get_json_with_query(
                BASE_URL,
                &[
                    ("engine", "google_scholar"),
                    ("q", query),
                    ("num", num.as_str()),
                    ("api_key", self.api_key.as_str()),
                ],
            )
            .await?;

        if let Some(err) = body["error"].as_str() {
            return Err(EngineError::Api(err.to_string()));
        }

        let results = body["organic_results"].as_array().cloned().unwrap_or_default();
        Ok(results.iter().filter_map(|r| self.parse_result(r)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result() {
        let engine = ScholarEngine::new(HttpClient::new(), "key".to_string());
        let result = serde_json::json!({
            "title": "Mind games: American culture and the birth of psychotherapy",
            "link": "https://example.org/mind-games",
            "publication_info": {"summary": "E Caplan - 1998 - books.google.com"}
        });

        let meta = engine.parse_result(&result).unwrap();
        assert_eq!(meta.authors, vec!["E Caplan"]);
        assert_eq!(meta.year.as_deref(), Some("1998"));
        assert_eq!(meta.source_engine, "google_scholar");
    }

    #[test]
    fn test_paid_capability() {
        let engine = ScholarEngine::new(HttpClient::new(), "key".to_string());
        assert!(engine.capabilities().contains(EngineCapabilities::PAID));
    }
}
