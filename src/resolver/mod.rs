//! The resolver: walks each fragment down the escalation ladder until a
//! layer produces an acceptable answer.
//!
//! Resolution is total. The outcome is `Resolved` or `Unresolved`, never an
//! error. Upstream timeouts, rate limits and malformed payloads are logged
//! and treated as no candidates from that engine.

mod escalation;

pub use escalation::EscalationStage;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::StreamExt;
use tracing::{debug, info, warn};

use crate::cache::LiteralCache;
use crate::classify::classify_fragment;
use crate::config::{Config, ResolverConfig};
use crate::extract::{
    extract_fragments, extract_topics, format_context_string, unique_fragments,
};
use crate::models::{CitationFragment, FragmentType, Resolution, ResolvedMetadata};
use crate::score::{best_by_author_position, extract_query_author};
use crate::sources::ai::AiEngine;
use crate::sources::webpage::WebPageEngine;
use crate::sources::{Engine, EngineCapabilities, EngineError, EngineRegistry};
use crate::utils::HttpClient;

/// Candidates accumulated while descending the ladder, kept for the
/// best-effort layer.
#[derive(Default)]
struct CandidatePool {
    entries: Vec<(ResolvedMetadata, f64)>,
}

impl CandidatePool {
    fn add(&mut self, meta: ResolvedMetadata, score: f64) {
        self.entries.push((meta, score));
    }

    /// Highest score wins; on a tie the candidate carrying a deterministic
    /// identifier is preferred.
    fn best(mut self) -> Option<(ResolvedMetadata, f64)> {
        self.entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.0.identifiers
                        .has_deterministic()
                        .cmp(&a.0.identifiers.has_deterministic())
                })
        });
        self.entries.into_iter().next()
    }
}

pub struct Resolver {
    registry: EngineRegistry,
    webpage: Option<Arc<WebPageEngine>>,
    ai: Option<Arc<AiEngine>>,
    cache: Option<Arc<LiteralCache>>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(registry: EngineRegistry, config: ResolverConfig) -> Self {
        Self {
            registry,
            webpage: None,
            ai: None,
            cache: None,
            config,
        }
    }

    /// Build a resolver with the full engine set the configuration allows.
    pub fn from_config(config: &Config) -> Self {
        let client = HttpClient::new();
        let mut registry = EngineRegistry::new();

        registry.register(Arc::new(crate::sources::crossref::CrossrefEngine::new(
            client.clone(),
        )));
        registry.register(Arc::new(crate::sources::openalex::OpenAlexEngine::new(
            client.clone(),
        )));
        registry.register(Arc::new(crate::sources::semantic::SemanticScholarEngine::new(
            client.clone(),
            config.api_keys.semantic_scholar.clone(),
        )));
        registry.register(Arc::new(crate::sources::pubmed::PubMedEngine::new(
            client.clone(),
            config.api_keys.pubmed.clone(),
        )));
        registry.register(Arc::new(crate::sources::arxiv::ArxivEngine::new(
            client.clone(),
        )));
        registry.register(Arc::new(crate::sources::books::GoogleBooksEngine::new(
            client.clone(),
        )));
        if let Some(key) = &config.api_keys.serpapi {
            registry.register(Arc::new(crate::sources::scholar::ScholarEngine::new(
                client.clone(),
                key.clone(),
            )));
        }

        let webpage = Arc::new(WebPageEngine::new(client.clone()));
        let providers = config.ai_providers();
        let ai = (!providers.is_empty())
            .then(|| Arc::new(AiEngine::new(client, providers)));

        let cache = config.cache.enabled.then(|| {
            Arc::new(match &config.cache.path {
                Some(path) => LiteralCache::open(path),
                None => LiteralCache::new(),
            })
        });

        Self {
            registry,
            webpage: Some(webpage),
            ai,
            cache,
            config: config.resolver.clone(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<LiteralCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_ai(mut self, ai: Arc<AiEngine>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_webpage(mut self, webpage: Arc<WebPageEngine>) -> Self {
        self.webpage = Some(webpage);
        self
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&Arc<LiteralCache>> {
        self.cache.as_ref()
    }

    /// Resolve one piece of citation text.
    ///
    /// The text is extracted and classified first; when no extractor claims
    /// it, the whole string is treated as a keyword fragment.
    pub async fn resolve(&self, text: &str) -> Resolution {
        self.resolve_with_context(text, None).await
    }

    /// Like [`resolve`](Self::resolve), with a document-context phrase
    /// passed through to the AI layer.
    pub async fn resolve_with_context(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Resolution {
        let fragment = extract_fragments(text)
            .into_iter()
            .next()
            .unwrap_or_else(|| {
                CitationFragment::new(
                    text,
                    FragmentType::Keywords,
                    0..text.len(),
                    text.trim(),
                )
            });
        self.resolve_fragment(&fragment, context).await
    }

    /// Resolve many texts concurrently, preserving input order. The
    /// document-context phrase, when given, is passed along to the AI
    /// layer for every text.
    pub async fn resolve_many(
        &self,
        texts: &[String],
        context: Option<&str>,
    ) -> Vec<Resolution> {
        futures_util::stream::iter(texts)
            .map(|text| self.resolve_with_context(text, context))
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await
    }

    /// Extract and resolve every citation in a document. Multi-citation
    /// parentheticals are decomposed and each sub-citation resolved on its
    /// own. Document topics are passed as context to the AI layer, and
    /// each distinct citation is looked up only once however often it
    /// repeats in the document.
    pub async fn resolve_document(
        &self,
        text: &str,
    ) -> Vec<(CitationFragment, Resolution)> {
        let topics = extract_topics(text, 5);
        let context = format_context_string(&topics);
        let context = context.as_deref();

        let mut fragments = Vec::new();
        for fragment in extract_fragments(text) {
            let fragment = classify_fragment(fragment);
            if fragment.sub_fragments.is_empty() {
                fragments.push(fragment);
                continue;
            }

            for sub in &fragment.sub_fragments {
                let mut sub_fragment = CitationFragment::new(
                    &sub.citation_text,
                    FragmentType::AuthorYear,
                    fragment.span(),
                    &sub.citation_text,
                );
                sub_fragment.author_hint = Some(sub.author.clone());
                sub_fragment.year_hint = Some(sub.year.clone());
                fragments.push(sub_fragment);
            }
        }

        let mut resolutions: HashMap<(FragmentType, String), Resolution> = HashMap::new();
        for fragment in unique_fragments(&fragments) {
            let resolution = self.resolve_fragment(&fragment, context).await;
            resolutions.insert(
                (fragment.fragment_type, fragment.canonical_key.clone()),
                resolution,
            );
        }

        fragments
            .into_iter()
            .map(|fragment| {
                let resolution = resolutions
                    .get(&(fragment.fragment_type, fragment.canonical_key.clone()))
                    .cloned()
                    .unwrap_or_else(|| Resolution::Unresolved {
                        original_text: fragment.raw_text.clone(),
                    });
                (fragment, resolution)
            })
            .collect()
    }

    /// Walk one fragment down the ladder.
    pub async fn resolve_fragment(
        &self,
        fragment: &CitationFragment,
        context: Option<&str>,
    ) -> Resolution {
        let fragment = classify_fragment(fragment.clone());
        debug!(
            fragment = %fragment.canonical_key,
            kind = %fragment.fragment_type,
            "resolving"
        );

        // Cache layer.
        if let Some(cache) = &self.cache {
            if let Some(meta) = cache.get(&fragment.raw_text) {
                info!(fragment = %fragment.canonical_key, stage = %EscalationStage::CacheLookup, "cache hit");
                return Resolution::Resolved(meta);
            }
        }

        let outcome = self.resolve_uncached(&fragment, context).await;

        if let (Some(cache), Resolution::Resolved(meta)) = (&self.cache, &outcome) {
            cache.put(&fragment.raw_text, meta.clone());
        }
        outcome
    }

    async fn resolve_uncached(
        &self,
        fragment: &CitationFragment,
        context: Option<&str>,
    ) -> Resolution {
        // Deterministic layer: identifiers and direct page fetches skip
        // search and scoring entirely.
        if fragment.fragment_type.is_deterministic() {
            return self.resolve_deterministic(fragment).await;
        }
        if fragment.fragment_type == FragmentType::Url {
            return self.resolve_url(fragment).await;
        }

        let query = self.build_query(fragment);
        let surname = fragment
            .author_hint
            .as_ref()
            .map(|a| a.to_lowercase())
            .or_else(|| extract_query_author(&query));
        let surname = surname.as_deref();

        let mut pool = CandidatePool::default();

        // Fan-out layer.
        if let Some(meta) = self.fan_out(&query, surname, &mut pool).await {
            info!(fragment = %fragment.canonical_key, stage = %EscalationStage::ParallelFanOut, engine = %meta.source_engine, "resolved");
            return Resolution::Resolved(meta);
        }

        // Paid layer.
        if let Some(meta) = self.paid_fallback(&query, surname, &mut pool).await {
            info!(fragment = %fragment.canonical_key, stage = %EscalationStage::PaidFallback, "resolved");
            return Resolution::Resolved(meta);
        }

        // AI layer.
        if let Some(meta) = self.ai_lookup(fragment, context, surname, &mut pool).await {
            info!(fragment = %fragment.canonical_key, stage = %EscalationStage::AiAssistedLookup, "resolved");
            return Resolution::Resolved(meta);
        }

        // Best-effort layer: the strongest candidate seen anywhere.
        if let Some((meta, score)) = pool.best() {
            info!(
                fragment = %fragment.canonical_key,
                stage = %EscalationStage::BestEffort,
                score,
                "returning best effort"
            );
            return Resolution::Resolved(meta.with_confidence(score));
        }

        debug!(fragment = %fragment.canonical_key, "exhausted the ladder");
        Resolution::Unresolved {
            original_text: fragment.raw_text.clone(),
        }
    }

    async fn resolve_deterministic(&self, fragment: &CitationFragment) -> Resolution {
        let slice = Duration::from_secs(self.config.engine_timeout_secs);
        let engines = self
            .registry
            .with_capabilities(EngineCapabilities::GET_BY_ID);

        for engine in engines {
            let lookup = engine.get_by_id(fragment.fragment_type, &fragment.canonical_key);
            match tokio::time::timeout(slice, lookup).await {
                Ok(Ok(Some(meta))) if meta.has_minimum_data() => {
                    info!(
                        fragment = %fragment.canonical_key,
                        stage = %EscalationStage::DeterministicLookup,
                        engine = engine.id(),
                        "resolved"
                    );
                    return Resolution::Resolved(meta.with_confidence(1.0));
                }
                Ok(Ok(_)) => {}
                Ok(Err(EngineError::NotSupported(_))) => {}
                Ok(Err(err)) => {
                    warn!(engine = engine.id(), error = %err, "identifier lookup failed");
                }
                Err(_) => {
                    warn!(engine = engine.id(), "identifier lookup timed out");
                }
            }
        }

        Resolution::Unresolved {
            original_text: fragment.raw_text.clone(),
        }
    }

    async fn resolve_url(&self, fragment: &CitationFragment) -> Resolution {
        let Some(webpage) = &self.webpage else {
            return Resolution::Unresolved {
                original_text: fragment.raw_text.clone(),
            };
        };

        let slice = Duration::from_secs(self.config.engine_timeout_secs);
        let fetch = webpage.fetch(&fragment.canonical_key);
        match tokio::time::timeout(slice, fetch).await {
            Ok(Ok(Some(meta))) if meta.has_minimum_data() => {
                info!(
                    url = %fragment.canonical_key,
                    stage = %EscalationStage::DeterministicLookup,
                    "resolved from page metadata"
                );
                Resolution::Resolved(meta.with_confidence(0.9))
            }
            Ok(Ok(Some(meta))) => {
                // A bare title is still better than nothing.
                Resolution::Resolved(meta.with_confidence(0.5))
            }
            Ok(Ok(None)) => Resolution::Unresolved {
                original_text: fragment.raw_text.clone(),
            },
            Ok(Err(err)) => {
                warn!(url = %fragment.canonical_key, error = %err, "page fetch failed");
                Resolution::Unresolved {
                    original_text: fragment.raw_text.clone(),
                }
            }
            Err(_) => {
                warn!(url = %fragment.canonical_key, "page fetch timed out");
                Resolution::Unresolved {
                    original_text: fragment.raw_text.clone(),
                }
            }
        }
    }

    /// Query every free engine, with at most `fanout_workers` in flight at
    /// once. Returns early the moment any engine yields a candidate at or
    /// above the confidence threshold; otherwise candidates accumulate in
    /// the pool until the deadline. In-flight laggards are abandoned on
    /// early return.
    async fn fan_out(
        &self,
        query: &str,
        surname: Option<&str>,
        pool: &mut CandidatePool,
    ) -> Option<ResolvedMetadata> {
        let engines = self.registry.free_search_engines();
        if engines.is_empty() {
            return None;
        }

        let slice = Duration::from_secs(self.config.engine_timeout_secs);
        let mut searches = futures_util::stream::iter(engines)
            .map(|engine| {
                let query = query.to_string();
                async move {
                    let id = engine.id();
                    let result = tokio::time::timeout(slice, engine.search(&query)).await;
                    (id, result)
                }
            })
            .buffer_unordered(self.config.fanout_workers.max(1));

        let deadline = Duration::from_secs(self.config.fanout_deadline_secs);
        let winner = tokio::time::timeout(deadline, async {
            while let Some((id, result)) = searches.next().await {
                match result {
                    Ok(Ok(candidates)) => {
                        if let Some(meta) =
                            self.score_candidates(id, candidates, surname, pool)
                        {
                            return Some(meta);
                        }
                    }
                    Ok(Err(err)) => warn!(engine = id, error = %err, "search failed"),
                    Err(_) => warn!(engine = id, "search timed out"),
                }
            }
            None
        })
        .await;

        match winner {
            Ok(result) => result,
            Err(_) => {
                debug!(query, "fan-out deadline reached");
                None
            }
        }
    }

    async fn paid_fallback(
        &self,
        query: &str,
        surname: Option<&str>,
        pool: &mut CandidatePool,
    ) -> Option<ResolvedMetadata> {
        let slice = Duration::from_secs(self.config.engine_timeout_secs);
        for engine in self.registry.with_capabilities(
            EngineCapabilities::SEARCH | EngineCapabilities::PAID,
        ) {
            match tokio::time::timeout(slice, engine.search(query)).await {
                Ok(Ok(candidates)) => {
                    if let Some(meta) =
                        self.score_candidates(engine.id(), candidates, surname, pool)
                    {
                        return Some(meta);
                    }
                }
                Ok(Err(err)) => warn!(engine = engine.id(), error = %err, "paid search failed"),
                Err(_) => warn!(engine = engine.id(), "paid search timed out"),
            }
        }
        None
    }

    async fn ai_lookup(
        &self,
        fragment: &CitationFragment,
        context: Option<&str>,
        surname: Option<&str>,
        pool: &mut CandidatePool,
    ) -> Option<ResolvedMetadata> {
        let ai = self.ai.as_ref()?;
        if !ai.has_providers() {
            return None;
        }

        let guess = match ai.guess(&fragment.raw_text, context).await {
            Ok(Some(guess)) => guess,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "ai lookup failed");
                return None;
            }
        };

        // A model-produced DOI is only trusted once an identifier lookup
        // confirms it; the verified record then replaces the guess.
        if let Some(doi) = guess.identifiers.doi.clone() {
            match self.verify_doi(&doi).await {
                Some(verified) => {
                    return Some(verified.with_confidence(0.95));
                }
                None => {
                    debug!(doi, "model DOI did not verify, discarding it");
                    let mut stripped = guess.clone();
                    stripped.identifiers.doi = None;
                    let score = crate::score::score_author_position(surname, &stripped);
                    if stripped.has_minimum_data() {
                        pool.add(stripped, score);
                    }
                    return None;
                }
            }
        }

        if !guess.has_minimum_data() {
            return None;
        }
        let score = crate::score::score_author_position(surname, &guess);
        if score >= self.config.confidence_threshold {
            return Some(guess.with_confidence(score));
        }
        pool.add(guess, score);
        None
    }

    async fn verify_doi(&self, doi: &str) -> Option<ResolvedMetadata> {
        let slice = Duration::from_secs(self.config.engine_timeout_secs);
        for engine in self
            .registry
            .with_capabilities(EngineCapabilities::GET_BY_ID)
        {
            let lookup = engine.get_by_id(FragmentType::Doi, doi);
            match tokio::time::timeout(slice, lookup).await {
                Ok(Ok(Some(meta))) if meta.has_minimum_data() => return Some(meta),
                Ok(Ok(_)) => return None,
                Ok(Err(EngineError::NotSupported(_))) => {}
                Ok(Err(_)) | Err(_) => {}
            }
        }
        None
    }

    /// Score a candidate batch. An at-threshold candidate is returned for
    /// immediate acceptance; everything useful lands in the pool.
    fn score_candidates(
        &self,
        engine_id: &str,
        candidates: Vec<ResolvedMetadata>,
        surname: Option<&str>,
        pool: &mut CandidatePool,
    ) -> Option<ResolvedMetadata> {
        let candidates: Vec<ResolvedMetadata> = candidates
            .into_iter()
            .filter(ResolvedMetadata::has_minimum_data)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let accepted = best_by_author_position(surname, &candidates)
            .filter(|(_, score)| *score >= self.config.confidence_threshold)
            .map(|(meta, score)| (meta.clone(), score));

        for candidate in &candidates {
            let score = crate::score::score_author_position(surname, candidate);
            pool.add(candidate.clone(), score);
        }

        accepted.map(|(meta, score)| {
            debug!(engine = engine_id, score, "candidate met threshold");
            meta.with_confidence(score)
        })
    }

    fn build_query(&self, fragment: &CitationFragment) -> String {
        match fragment.fragment_type {
            FragmentType::AuthorYear => {
                match (&fragment.author_hint, &fragment.year_hint) {
                    (Some(author), Some(year)) => {
                        format!("{author} {}", year.trim_end_matches(|c: char| c.is_alphabetic()))
                    }
                    _ => fragment.canonical_key.clone(),
                }
            }
            _ => fragment.canonical_key.clone(),
        }
    }
}
