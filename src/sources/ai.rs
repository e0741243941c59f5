//! AI-assisted lookup: asks a language model to identify the work a messy
//! fragment refers to. Providers are tried in configured order, and any
//! DOI the model produces must be verified against CrossRef before it is
//! trusted. Flagged AI so it never joins the free fan-out.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{CitationKind, MetadataBuilder, ResolvedMetadata};
use crate::utils::HttpClient;

use super::{Engine, EngineCapabilities, EngineError};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Which API shape a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

/// One configured model provider.
#[derive(Debug, Clone)]
pub struct AiProvider {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: String,
}

/// What the model is asked to return, as strict JSON.
#[derive(Debug, Deserialize)]
struct ModelAnswer {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    year: Option<String>,
    doi: Option<String>,
    container: Option<String>,
    kind: Option<String>,
}

pub struct AiEngine {
    client: HttpClient,
    providers: Vec<AiProvider>,
}

impl AiEngine {
    pub fn new(client: HttpClient, providers: Vec<AiProvider>) -> Self {
        Self { client, providers }
    }

    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Ask the provider chain to identify the work behind `query`.
    ///
    /// `context` is a short description of the surrounding document, when
    /// one is available, and markedly improves guesses for keyword-style
    /// fragments. Providers are tried in order; the first parseable answer
    /// wins and later providers are never called.
    pub async fn guess(
        &self,
        query: &str,
        context: Option<&str>,
    ) -> Result<Option<ResolvedMetadata>, EngineError> {
        if self.providers.is_empty() {
            return Err(EngineError::NotSupported(self.id().to_string()));
        }

        let prompt = build_prompt(query, context);
        let mut last_err = None;

        for provider in &self.providers {
            debug!(model = %provider.model, "querying model provider");
            let answer = match provider.kind {
                ProviderKind::OpenAi => self.call_openai(provider, &prompt).await,
                ProviderKind::Anthropic => self.call_anthropic(provider, &prompt).await,
            };
            match answer {
                Ok(text) => {
                    if let Some(meta) = self.parse_answer(&text) {
                        return Ok(Some(meta));
                    }
                    warn!(model = %provider.model, "model answer was not parseable");
                }
                Err(err) => {
                    warn!(model = %provider.model, error = %err, "provider failed");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            // Every provider errored; surface the last one.
            Some(err) if self.providers.len() == 1 => Err(err),
            _ => Ok(None),
        }
    }

    async fn call_openai(
        &self,
        provider: &AiProvider,
        prompt: &str,
    ) -> Result<String, EngineError> {
        let body = serde_json::json!({
            "model": provider.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": MAX_TOKENS,
        });
        let auth = format!("Bearer {}", provider.api_key);
        let response = self
            .client
            .post_json(OPENAI_URL, &body, &[("Authorization", auth.as_str())])
            .await?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EngineError::Parse("missing completion content".to_string()))
    }

    async fn call_anthropic(
        &self,
        provider: &AiProvider,
        prompt: &str,
    ) -> Result<String, EngineError> {
        let body = serde_json::json!({
            "model": provider.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = self
            .client
            .post_json(
                ANTHROPIC_URL,
                &body,
                &[
                    ("x-api-key", provider.api_key.as_str()),
                    ("anthropic-version", ANTHROPIC_VERSION),
                ],
            )
            .await?;

        response["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EngineError::Parse("missing message content".to_string()))
    }

    /// Pull the JSON object out of a model answer, tolerating code fences
    /// and surrounding prose, and convert it to metadata.
    fn parse_answer(&self, text: &str) -> Option<ResolvedMetadata> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end < start {
            return None;
        }

        let answer: ModelAnswer = serde_json::from_str(&text[start..=end]).ok()?;
        let title = answer.title.filter(|t| !t.trim().is_empty())?;

        let kind = match answer.kind.as_deref() {
            Some("book") => CitationKind::Book,
            Some("preprint") => CitationKind::Preprint,
            Some("legal") => CitationKind::Legal,
            Some("journal") => CitationKind::Journal,
            _ => CitationKind::Unknown,
        };

        let mut builder = MetadataBuilder::new(kind, title.trim(), "ai").authors(answer.authors);
        if let Some(year) = answer.year {
            builder = builder.year(year);
        }
        if let Some(doi) = answer.doi {
            builder = builder.doi(doi.trim_start_matches("https://doi.org/"));
        }
        if let Some(container) = answer.container {
            builder = builder.container_title(container);
        }

        Some(builder.build())
    }
}

fn build_prompt(query: &str, context: Option<&str>) -> String {
    let mut prompt = String::from(
        "Identify the published work this citation fragment most likely refers to. \
         Respond with a single JSON object and nothing else, with keys: \
         title, authors (array of full names in publication order), year, \
         doi (null unless certain), container (journal or publisher), \
         kind (journal, book, preprint, legal, or unknown).\n\n",
    );
    if let Some(context) = context {
        prompt.push_str(&format!("The fragment comes from {context}.\n"));
    }
    prompt.push_str(&format!("Fragment: {query}\n"));
    prompt
}

#[async_trait]
impl Engine for AiEngine {
    fn id(&self) -> &'static str {
        "ai"
    }

    fn name(&self) -> &'static str {
        "AI-assisted lookup"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::AI
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        Ok(self.guess(query, None).await?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AiEngine {
        AiEngine::new(HttpClient::new(), Vec::new())
    }

    #[test]
    fn test_parse_answer_plain_json() {
        let meta = engine()
            .parse_answer(
                r#"{"title": "Mind Games", "authors": ["Eric Caplan"],
                    "year": "1998", "doi": null, "container": "UC Press",
                    "kind": "book"}"#,
            )
            .unwrap();
        assert_eq!(meta.title, "Mind Games");
        assert_eq!(meta.kind, CitationKind::Book);
        assert_eq!(meta.authors, vec!["Eric Caplan"]);
        assert!(meta.identifiers.doi.is_none());
    }

    #[test]
    fn test_parse_answer_fenced() {
        let text = "Here you go:\n```json\n{\"title\": \"A Paper\", \"authors\": [], \"year\": \"2001\"}\n```";
        let meta = engine().parse_answer(text).unwrap();
        assert_eq!(meta.title, "A Paper");
        assert_eq!(meta.year.as_deref(), Some("2001"));
    }

    #[test]
    fn test_parse_answer_doi_url_stripped() {
        let meta = engine()
            .parse_answer(r#"{"title": "T", "doi": "https://doi.org/10.1086/226147"}"#)
            .unwrap();
        assert_eq!(meta.identifiers.doi.as_deref(), Some("10.1086/226147"));
    }

    #[test]
    fn test_parse_answer_garbage_is_none() {
        assert!(engine().parse_answer("no json here").is_none());
        assert!(engine().parse_answer(r#"{"authors": []}"#).is_none());
    }

    #[test]
    fn test_prompt_includes_context() {
        let prompt = build_prompt("(caplan trains brains)", Some("an academic document about psychology"));
        assert!(prompt.contains("an academic document about psychology"));
        assert!(prompt.contains("(caplan trains brains)"));
    }
}
