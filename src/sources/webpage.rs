//! Web page engine: fetches a URL and scrapes bibliographic metadata from
//! Highwire `citation_*` meta tags, Open Graph tags, JSON-LD, and finally
//! the document title. Used for URLs with no embedded identifier.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use crate::models::{CitationKind, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

pub struct WebPageEngine {
    client: HttpClient,
}

impl WebPageEngine {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Fetch `url` and scrape what metadata the page exposes. Returns
    /// `Ok(None)` when not even a title could be found.
    pub async fn fetch(&self, url: &str) -> Result<Option<ResolvedMetadata>, EngineError> {
        debug!(engine = self.id(), url, "fetching page");
        let html = self.client.get_text(url).await?;
        Ok(self.scrape(&html, url))
    }

    fn scrape(&self, html: &str, url: &str) -> Option<ResolvedMetadata> {
        let doc = Html::parse_document(html);

        // Highwire tags are the academic publishing convention and the
        // most trustworthy signal when present.
        let citation_title = meta_content(&doc, "citation_title");
        let og_title = meta_property(&doc, "og:title");
        let jsonld = parse_jsonld(&doc);

        let title = citation_title
            .clone()
            .or_else(|| jsonld.as_ref().and_then(|j| j.title.clone()))
            .or(og_title)
            .or_else(|| element_text(&doc, "title"))?;
        if title.trim().is_empty() {
            return None;
        }

        let mut authors = meta_contents(&doc, "citation_author");
        if authors.is_empty() {
            if let Some(j) = &jsonld {
                authors = j.authors.clone();
            }
        }

        let year = meta_content(&doc, "citation_publication_date")
            .or_else(|| meta_content(&doc, "citation_date"))
            .or_else(|| jsonld.as_ref().and_then(|j| j.date.clone()))
            .and_then(|d| extract_year(&d));

        let kind = if citation_title.is_some() {
            CitationKind::Journal
        } else {
            CitationKind::WebPage
        };

        let mut builder = MetadataBuilder::new(kind, title.trim(), "webpage")
            .authors(authors)
            .url(url);

        if let Some(year) = year {
            builder = builder.year(year);
        }
        if let Some(journal) = meta_content(&doc, "citation_journal_title") {
            builder = builder.container_title(journal);
        } else if let Some(site) = meta_property(&doc, "og:site_name") {
            builder = builder.container_title(site);
        }
        if let Some(doi) = meta_content(&doc, "citation_doi") {
            builder = builder.doi(doi);
        }
        if let Some(pmid) = meta_content(&doc, "citation_pmid") {
            builder = builder.pmid(pmid);
        }

        Some(builder.build())
    }
}

struct JsonLdWork {
    title: Option<String>,
    authors: Vec<String>,
    date: Option<String>,
}

fn parse_jsonld(doc: &Html) -> Option<JsonLdWork> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    for script in doc.select(&selector) {
        let text: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
            continue;
        };

        let title = value["headline"]
            .as_str()
            .or(value["name"].as_str())
            .map(str::to_string);
        if title.is_none() {
            continue;
        }

        let authors = match &value["author"] {
            serde_json::Value::Array(arr) => arr
                .iter()
                .filter_map(|a| a["name"].as_str())
                .map(str::to_string)
                .collect(),
            obj @ serde_json::Value::Object(_) => obj["name"]
                .as_str()
                .map(|n| vec![n.to_string()])
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let date = value["datePublished"].as_str().map(str::to_string);
        return Some(JsonLdWork { title, authors, date });
    }
    None
}

fn meta_content(doc: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{name}"]"#)).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
}

fn meta_contents(doc: &Html, name: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(&format!(r#"meta[name="{name}"]"#)) else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::to_string)
        .collect()
}

fn meta_property(doc: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
}

fn element_text(doc: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .filter(|t| !t.trim().is_empty())
}

/// Pull a four-digit year out of a date string like "2020/03/15" or
/// "1998-06-03".
fn extract_year(date: &str) -> Option<String> {
    date.split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 4)
        .map(str::to_string)
}

#[async_trait]
impl Engine for WebPageEngine {
    fn id(&self) -> &'static str {
        "webpage"
    }

    fn name(&self) -> &'static str {
        "Web page scraper"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::WEB
    }
}
