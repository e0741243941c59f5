//! PubMed engine, via the NCBI E-utilities: `esearch` to find PMIDs, then
//! `esummary` for metadata. Deterministic PMID lookup goes straight to
//! `esummary`.

use async_trait::async_trait;
use tracing::debug;

use crate::models::{CitationKind, FragmentType, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

const BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const RETMAX: u32 = 10;

pub struct PubMedEngine {
    client: HttpClient,
    api_key: Option<String>,
}

impl PubMedEngine {
    pub fn new(client: HttpClient, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    /// Search terms to try, most specific first. A multi-word query is
    /// also tried with the lead word as an author tag, which is how
    /// "Surname some title words" is usually meant: first against titles
    /// only, then against title-and-abstract.
    fn search_terms(query: &str) -> Vec<String> {
        let mut terms = vec![query.to_string()];
        let mut words = query.split_whitespace();
        if let (Some(first), Some(_)) = (words.next(), words.clone().next()) {
            let rest = words.collect::<Vec<&str>>().join(" ");
            terms.push(format!("{first}[au] AND ({rest}[ti])"));
            terms.push(format!("{first}[au] AND ({rest}[tiab])"));
        }
        terms
    }

    async fn esearch(&self, term: &str) -> Result<Vec<String>, EngineError> {
        let url = format!("{BASE_URL}/esearch.fcgi");
        let retmax = RETMAX.to_string();
        let mut query = vec![
            ("db", "pubmed"),
            ("term", term),
            ("retmode", "json"),
            ("retmax", retmax.as_str()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.as_str()));
        }

        let body = self.client.get_json_with_query(&url, &query).await?;
        let ids = body["esearchresult"]["idlist"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    async fn esummary(&self, pmids: &[String]) -> Result<Vec<ResolvedMetadata>, EngineError> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{BASE_URL}/esummary.fcgi");
        let id_list = pmids.join(",");
        let mut query = vec![("db", "pubmed"), ("id", id_list.as_str()), ("retmode", "json")];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.as_str()));
        }

        let body = self.client.get_json_with_query(&url, &query).await?;
        let result = &body["result"];

        Ok(pmids
            .iter()
            .filter_map(|pmid| self.parse_summary(pmid, &result[pmid]))
            .collect())
    }

    fn parse_summary(&self, pmid: &str, doc: &serde_json::Value) -> Option<ResolvedMetadata> {
        let title = doc["title"].as_str()?;
        if title.is_empty() {
            return None;
        }

        let authors: Vec<String> = doc["authors"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a["name"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // pubdate looks like "2020 Mar 15"; the year is the lead token.
        let year = doc["pubdate"]
            .as_str()
            .and_then(|d| d.split_whitespace().next())
            .filter(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
            .map(str::to_string);

        let mut builder = MetadataBuilder::new(CitationKind::Journal, title, "pubmed")
            .authors(authors)
            .pmid(pmid)
            .raw_payload(doc.clone());

        if let Some(year) = year {
            builder = builder.year(year);
        }
        if let Some(journal) = doc["fulljournalname"].as_str() {
            builder = builder.container_title(journal);
        }
        if let Some(ids) = doc["articleids"].as_array() {
            for id in ids {
                if id["idtype"].as_str() == Some("doi") {
                    if let Some(doi) = id["value"].as_str() {
                        builder = builder.doi(doi);
                    }
                }
            }
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Engine for PubMedEngine {
    fn id(&self) -> &'static str {
        "pubmed"
    }

    fn name(&self) -> &'static str {
        "PubMed"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::GET_BY_ID
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        for term in Self::search_terms(query) {
            debug!(engine = self.id(), term, "searching");
            let pmids = self.esearch(&term).await?;
            let results = self.esummary(&pmids).await?;
            if !results.is_empty() {
                return Ok(results);
            }
        }
        Ok(Vec::new())
    }

    async fn get_by_id(
        &self,
        kind: FragmentType,
        id: &str,
    ) -> Result<Option<ResolvedMetadata>, EngineError> {
        if kind != FragmentType::Pmid {
            return Err(EngineError::NotSupported(self.id().to_string()));
        }
        debug!(engine = self.id(), pmid = id, "fetching by PMID");

        let results = self.esummary(&[id.to_string()]).await?;
        Ok(results.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_terms() {
        let terms = PubMedEngine::search_terms("Caplan hysteria history");
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0], "Caplan hysteria history");
        assert_eq!(terms[1], "Caplan[au] AND (hysteria history[ti])");
        assert_eq!(terms[2], "Caplan[au] AND (hysteria history[tiab])");

        assert_eq!(PubMedEngine::search_terms("hysteria").len(), 1);
    }

    #[test]
    fn test_parse_summary() {
        let engine = PubMedEngine::new(HttpClient::new(), None);
        let doc = serde_json::json!({
            "title": "A Controlled Trial",
            "pubdate": "1998 Jun 3",
            "fulljournalname": "The Lancet",
            "authors": [{"name": "Caplan E"}, {"name": "Smith J"}],
            "articleids": [{"idtype": "doi", "value": "10.1016/S0140-6736(98)01085-X"}]
        });

        let meta = engine.parse_summary("9643741", &doc).unwrap();
        assert_eq!(meta.kind, CitationKind::Journal);
        assert_eq!(meta.identifiers.pmid.as_deref(), Some("9643741"));
        assert_eq!(meta.year.as_deref(), Some("1998"));
        assert_eq!(meta.identifiers.doi.as_deref(), Some("10.1016/S0140-6736(98)01085-X"));
        assert_eq!(meta.container_title.as_deref(), Some("The Lancet"));
    }

    #[test]
    fn test_empty_title_is_none() {
        let engine = PubMedEngine::new(HttpClient::new(), None);
        assert!(engine.parse_summary("1", &serde_json::json!({"title": ""})).is_none());
    }
}
