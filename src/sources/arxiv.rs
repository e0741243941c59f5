//! arXiv engine, over the Atom query API.

use async_trait::async_trait;
use chrono::Datelike;
use tracing::debug;

use crate::models::{CitationKind, FragmentType, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

const BASE_URL: &str = "https://export.arxiv.org/api/query";
const MAX_RESULTS: u32 = 10;

pub struct ArxivEngine {
    client: HttpClient,
}

impl ArxivEngine {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Strip the entry id URL and version suffix down to the bare arXiv id:
    /// `http://arxiv.org/abs/2301.12345v2` becomes `2301.12345`.
    fn parse_id(entry_id: &str) -> String {
        let id = entry_id
            .rsplit_once("/abs/")
            .map(|(_, tail)| tail)
            .unwrap_or(entry_id);
        match id.rfind('v') {
            Some(pos) if id[pos + 1..].bytes().all(|b| b.is_ascii_digit())
                && !id[pos + 1..].is_empty() =>
            {
                id[..pos].to_string()
            }
            _ => id.to_string(),
        }
    }

    fn parse_feed(&self, xml: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        let feed = feed_rs::parser::parse(xml.as_bytes())
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        let mut results = Vec::new();
        for entry in feed.entries {
            let Some(title) = entry.title.as_ref().map(|t| t.content.trim().to_string())
            else {
                continue;
            };
            if title.is_empty() {
                continue;
            }

            let authors: Vec<String> =
                entry.authors.iter().map(|a| a.name.clone()).collect();
            let arxiv_id = Self::parse_id(&entry.id);

            let mut builder = MetadataBuilder::new(CitationKind::Preprint, title, "arxiv")
                .authors(authors)
                .arxiv(&arxiv_id)
                .url(format!("https://arxiv.org/abs/{arxiv_id}"))
                .container_title("arXiv");

            if let Some(published) = entry.published {
                builder = builder.year(published.year().to_string());
            }

            results.push(builder.build());
        }
        Ok(results)
    }
}

#[async_trait]
impl Engine for ArxivEngine {
    fn id(&self) -> &'static str {
        "arxiv"
    }

    fn name(&self) -> &'static str {
        "arXiv"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::GET_BY_ID
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        debug!(engine = self.id(), query, "searching");

        let search_query = format!("all:{query}");
        let max_results = MAX_RESULTS.to_string();
        let xml = self
            .client
            .get_text_with_query(
                BASE_URL,
                &[
                    ("search_query", search_query.as_str()),
                    ("max_results", max_results.as_str()),
                ],
            )
            .await?;
        self.parse_feed(&xml)
    }

    async fn get_by_id(
        &self,
        kind: FragmentType,
        id: &str,
    ) -> Result<Option<ResolvedMetadata>, EngineError> {
        if kind != FragmentType::Arxiv {
            return Err(EngineError::NotSupported(self.id().to_string()));
        }
        debug!(engine = self.id(), arxiv_id = id, "fetching by id");

        let xml = self
            .client
            .get_text_with_query(BASE_URL, &[("id_list", id), ("max_results", "1")])
            .await?;
        Ok(self.parse_feed(&xml)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(ArxivEngine::parse_id("http://arxiv.org/abs/2301.12345v2"), "2301.12345");
        assert_eq!(ArxivEngine::parse_id("http://arxiv.org/abs/hep-th/9901001v1"), "hep-th/9901001");
        assert_eq!(ArxivEngine::parse_id("2301.12345"), "2301.12345");
    }

    #[test]
    fn test_parse_feed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <feed xmlns="http://www.w3.org/2005/Atom">
              <entry>
                <id>http://arxiv.org/abs/1706.03762v7</id>
                <title>Attention Is All You Need</title>
                <published>2017-06-12T00:00:00Z</published>
                <author><name>Ashish Vaswani</name></author>
                <author><name>Noam Shazeer</name></author>
              </entry>
            </feed>"#;

        let engine = ArxivEngine::new(HttpClient::new());
        let results = engine.parse_feed(xml).unwrap();

        assert_eq!(results.len(), 1);
        let meta = &results[0];
        assert_eq!(meta.kind, CitationKind::Preprint);
        assert_eq!(meta.title, "Attention Is All You Need");
        assert_eq!(meta.identifiers.arxiv.as_deref(), Some("1706.03762"));
        assert_eq!(meta.year.as_deref(), Some("2017"));
        assert_eq!(meta.authors.len(), 2);
    }
}
