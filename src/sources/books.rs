//! Google Books engine, used for ISBN lookup and book-ish keyword search.

use async_trait::async_trait;
use tracing::debug;

use crate::models::{CitationKind, FragmentType, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

const BASE_URL: &str = "https://www.googleapis.com/books/v1/volumes";
const MAX_RESULTS: u32 = 10;

pub struct GoogleBooksEngine {
    client: HttpClient,
}

impl GoogleBooksEngine {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    async fn query_volumes(&self, q: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        let max = MAX_RESULTS.to_string();
        let body = self
            .client
            .get_json_with_query(BASE_URL, &[("q", q), ("maxResults", max.as_str())])
            .await?;

        let items = body["items"].as_array().cloned().unwrap_or_default();
        Ok(items.iter().filter_map(|v| self.parse_volume(v)).collect())
    }

    fn parse_volume(&self, volume: &serde_json::Value) -> Option<ResolvedMetadata> {
        let info = &volume["volumeInfo"];
        let title = info["title"].as_str()?;

        let authors: Vec<String> = info["authors"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // publishedDate is "2000", "2000-03" or "2000-03-15".
        let year = info["publishedDate"]
            .as_str()
            .and_then(|d| d.split('-').next())
            .filter(|y| y.len() == 4)
            .map(str::to_string);

        let isbn = info["industryIdentifiers"].as_array().and_then(|ids| {
            ids.iter()
                .find(|id| id["type"].as_str() == Some("ISBN_13"))
                .or_else(|| ids.iter().find(|id| id["type"].as_str() == Some("ISBN_10")))
                .and_then(|id| id["identifier"].as_str())
                .map(str::to_string)
        });

        let mut builder = MetadataBuilder::new(CitationKind::Book, title, "google_books")
            .authors(authors)
            .raw_payload(volume.clone());

        if let Some(year) = year {
            builder = builder.year(year);
        }
        if let Some(publisher) = info["publisher"].as_str() {
            builder = builder.container_title(publisher);
        }
        if let Some(isbn) = isbn {
            builder = builder.isbn(isbn);
        }
        if let Some(link) = info["canonicalVolumeLink"].as_str() {
            builder = builder.url(link);
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Engine for GoogleBooksEngine {
    fn id(&self) -> &'static str {
        "google_books"
    }

    fn name(&self) -> &'static str {
        "Google Books"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::GET_BY_ID
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        debug!(engine = self.id(), query, "searching");
        self.query_volumes(query).await
    }

    async fn get_by_id(
        &self,
        kind: FragmentType,
        id: &str,
    ) -> Result<Option<ResolvedMetadata>, EngineError> {
        if kind != FragmentType::Isbn {
            return Err(EngineError::NotSupported(self.id().to_string()));
        }
        debug!(engine = self.id(), isbn = id, "fetching by ISBN");

        let results = self.query_volumes(&format!("isbn:{id}")).await?;
        Ok(results.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_volume() {
        let engine = GoogleBooksEngine::new(HttpClient::new());
        let volume = serde_json::json!({
            "volumeInfo": {
                "title": "Mind Games",
                "authors": ["Eric Caplan"],
                "publisher": "University of California Press",
                "publishedDate": "1998-05-28",
                "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "0520211685"},
                    {"type": "ISBN_13", "identifier": "9780520211681"}
                ]
            }
        });

        let meta = engine.parse_volume(&volume).unwrap();
        assert_eq!(meta.kind, CitationKind::Book);
        assert_eq!(meta.title, "Mind Games");
        assert_eq!(meta.authors, vec!["Eric Caplan"]);
        assert_eq!(meta.year.as_deref(), Some("1998"));
        // ISBN-13 preferred over ISBN-10.
        assert_eq!(meta.identifiers.isbn.as_deref(), Some("9780520211681"));
    }

    #[test]
    fn test_volume_without_title_is_none() {
        let engine = GoogleBooksEngine::new(HttpClient::new());
        assert!(engine.parse_volume(&serde_json::json!({"volumeInfo": {}})).is_none());
    }
}
