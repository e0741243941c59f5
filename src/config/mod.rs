//! Configuration: file, environment, and defaults, merged in that order of
//! increasing precedence.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::sources::ai::{AiProvider, ProviderKind};

/// Resolver tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Engines queried concurrently during fan-out.
    #[serde(default = "default_fanout_workers")]
    pub fanout_workers: usize,

    /// Overall fan-out deadline in seconds.
    #[serde(default = "default_fanout_deadline_secs")]
    pub fanout_deadline_secs: u64,

    /// Per-engine time slice in seconds.
    #[serde(default = "default_engine_timeout_secs")]
    pub engine_timeout_secs: u64,

    /// Score at or above which a candidate is accepted outright.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Fragments resolved concurrently in batch mode.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

fn default_fanout_workers() -> usize {
    4
}
fn default_fanout_deadline_secs() -> u64 {
    12
}
fn default_engine_timeout_secs() -> u64 {
    5
}
fn default_confidence_threshold() -> f64 {
    0.7
}
fn default_batch_concurrency() -> usize {
    5
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fanout_workers: default_fanout_workers(),
            fanout_deadline_secs: default_fanout_deadline_secs(),
            engine_timeout_secs: default_engine_timeout_secs(),
            confidence_threshold: default_confidence_threshold(),
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// File the cache persists to; in-memory only when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: None,
        }
    }
}

/// Upstream API keys. All optional; engines needing a missing key are
/// simply not registered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    #[serde(default)]
    pub semantic_scholar: Option<String>,
    #[serde(default)]
    pub pubmed: Option<String>,
    #[serde(default)]
    pub serpapi: Option<String>,
    #[serde(default)]
    pub openai: Option<String>,
    #[serde(default)]
    pub anthropic: Option<String>,
}

/// AI-assisted lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider names in the order they are tried.
    #[serde(default = "default_ai_providers")]
    pub providers: Vec<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
}

fn default_ai_providers() -> Vec<String> {
    vec!["openai".to_string(), "anthropic".to_string()]
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            providers: default_ai_providers(),
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

impl Config {
    /// Load configuration from `citeflow.toml` (optional) and
    /// `CITEFLOW_*` environment variables, then fill API keys from their
    /// conventional environment names.
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut cfg: Config = config::Config::builder()
            .add_source(config::File::with_name("citeflow").required(false))
            .add_source(
                config::Environment::with_prefix("CITEFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        cfg.api_keys.semantic_scholar = cfg
            .api_keys
            .semantic_scholar
            .take()
            .or_else(|| env_nonempty("SEMANTIC_SCHOLAR_API_KEY"));
        cfg.api_keys.pubmed = cfg.api_keys.pubmed.take().or_else(|| env_nonempty("PUBMED_API_KEY"));
        cfg.api_keys.serpapi = cfg.api_keys.serpapi.take().or_else(|| env_nonempty("SERPAPI_KEY"));
        cfg.api_keys.openai = cfg.api_keys.openai.take().or_else(|| env_nonempty("OPENAI_API_KEY"));
        cfg.api_keys.anthropic = cfg
            .api_keys
            .anthropic
            .take()
            .or_else(|| env_nonempty("ANTHROPIC_API_KEY"));

        // Provider chain override: CITEFLOW_AI_PROVIDERS="anthropic,openai".
        if let Some(chain) = env_nonempty("CITEFLOW_AI_PROVIDERS") {
            cfg.ai.providers = chain
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(cfg)
    }

    /// The configured provider chain, keeping only providers whose API key
    /// is present. Order is preserved.
    pub fn ai_providers(&self) -> Vec<AiProvider> {
        self.ai
            .providers
            .iter()
            .filter_map(|name| match name.as_str() {
                "openai" => self.api_keys.openai.as_ref().map(|key| AiProvider {
                    kind: ProviderKind::OpenAi,
                    model: self.ai.openai_model.clone(),
                    api_key: key.clone(),
                }),
                "anthropic" => self.api_keys.anthropic.as_ref().map(|key| AiProvider {
                    kind: ProviderKind::Anthropic,
                    model: self.ai.anthropic_model.clone(),
                    api_key: key.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
