//! OpenAlex engine: free-text search over `/works?search=`.

use async_trait::async_trait;
use tracing::debug;

use crate::models::{CitationKind, FragmentType, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

const BASE_URL: &str = "https://api.openalex.org";
const PER_PAGE: u32 = 10;

pub struct OpenAlexEngine {
    client: HttpClient,
}

impl OpenAlexEngine {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn parse_work(&self, work: &serde_json::Value) -> Option<ResolvedMetadata> {
        let title = work["title"].as_str().or(work["display_name"].as_str())?;

        let authors: Vec<String> = work["authorships"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a["author"]["display_name"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let kind = match work["type"].as_str() {
            Some("book") | Some("book-chapter") => CitationKind::Book,
            Some("preprint") => CitationKind::Preprint,
            _ => CitationKind::Journal,
        };

        let mut builder = MetadataBuilder::new(kind, title, "openalex")
            .authors(authors)
            .raw_payload(work.clone());

        if let Some(year) = work["publication_year"].as_i64() {
            builder = builder.year(year.to_string());
        }
        if let Some(container) =
            work["primary_location"]["source"]["display_name"].as_str()
        {
            builder = builder.container_title(container);
        }
        // OpenAlex reports the DOI as a full URL.
        if let Some(doi_url) = work["doi"].as_str() {
            let doi = doi_url
                .trim_start_matches("https://doi.org/")
                .trim_start_matches("http://doi.org/");
            builder = builder.doi(doi);
        }
        if let Some(pmid_url) = work["ids"]["pmid"].as_str() {
            if let Some(pmid) = pmid_url.rsplit('/').find(|s| !s.is_empty()) {
                builder = builder.pmid(pmid);
            }
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Engine for OpenAlexEngine {
    fn id(&self) -> &'static str {
        "openalex"
    }

    fn name(&self) -> &'static str {
        "OpenAlex"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::GET_BY_ID
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        debug!(engine = self.id(), query, "searching");

        let url = format!("{BASE_URL}/works");
        let per_page = PER_PAGE.to_string();
        let body = self
            .client
            .get_json_with_query(&url, &[("search", query), ("per-page", per_page.as_str())])
            .await?;

        let results = body["results"].as_array().cloned().unwrap_or_default();
        Ok(results.iter().filter_map(|w| self.parse_work(w)).collect())
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

        let url = format!("{BASE_URL}/works/https://doi.org/{id}");
        match self.client.get_json(&url).await {
            Ok(body) => Ok(self.parse_work(&body)),
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
        let engine = OpenAlexEngine::new(HttpClient::new());
        let work = serde_json::json!({
            "title": "Bowling Alone",
            "publication_year": 2000,
            "type": "book",
            "doi": "https://doi.org/10.1145/358916.361990",
            "authorships": [
                {"author": {"display_name": "Robert D. Putnam"}}
            ],
            "primary_location": {"source": {"display_name": "Simon & Schuster"}}
        });

        let meta = engine.parse_work(&work).unwrap();
        assert_eq!(meta.kind, CitationKind::Book);
        assert_eq!(meta.authors, vec!["Robert D. Putnam"]);
        assert_eq!(meta.year.as_deref(), Some("2000"));
        assert_eq!(meta.identifiers.doi.as_deref(), Some("10.1145/358916.361990"));
    }

    #[test]
    fn test_pmid_url_stripped() {
        let engine = OpenAlexEngine::new(HttpClient::new());
        let work = serde_json::json!({
            "title": "A Trial",
            "ids": {"pmid": "https://pubmed.ncbi.nlm.nih.gov/12345678"}
        });
        let meta = engine.parse_work(&work).unwrap();
        assert_eq!(meta.identifiers.pmid.as_deref(), Some("12345678"));
    }
}
