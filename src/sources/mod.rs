//! Lookup engines: one module per upstream service, all behind the
//! [`Engine`] trait so the resolver can treat them uniformly.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FragmentType, ResolvedMetadata};

pub mod ai;
pub mod arxiv;
pub mod books;
pub mod crossref;
pub mod mock;
pub mod openalex;
pub mod pubmed;
pub mod registry;
pub mod scholar;
pub mod semantic;
pub mod webpage;

pub use registry::{EngineCapabilities, EngineRegistry};

/// Errors an engine can produce during lookup.
///
/// Within one resolution pass these are all handled the same way: log and
/// move on to the next engine or layer. The variants matter for logging
/// and for tests.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("operation not supported by {0}")]
    NotSupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return EngineError::Network(err.to_string());
        }
        if let Some(status) = err.status() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return EngineError::RateLimit(err.to_string());
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return EngineError::NotFound(err.to_string());
            }
            return EngineError::Api(err.to_string());
        }
        EngineError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(err.to_string())
    }
}

/// A lookup engine backed by one upstream service.
///
/// Engines implement only the operations their service supports; the
/// defaults return [`EngineError::NotSupported`] so the resolver can probe
/// capabilities without panicking. Every engine must be cheap to share
/// across tasks.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Stable machine identifier, e.g. `"crossref"`.
    fn id(&self) -> &'static str;

    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> EngineCapabilities;

    /// Free-text search returning candidates in upstream relevance order.
    async fn search(&self, query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        let _ = query;
        Err(EngineError::NotSupported(self.id().to_string()))
    }

    /// Deterministic lookup by identifier. `Ok(None)` means the identifier
    /// is well-formed but unknown upstream.
    async fn get_by_id(
        &self,
        kind: FragmentType,
        id: &str,
    ) -> Result<Option<ResolvedMetadata>, EngineError> {
        let _ = (kind, id);
        Err(EngineError::NotSupported(self.id().to_string()))
    }
}
