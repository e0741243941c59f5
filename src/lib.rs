//! citeflow resolves messy citation fragments into structured
//! bibliographic metadata.
//!
//! A fragment can be a URL, a bare identifier (DOI, PMID, arXiv id, ISBN),
//! an author-year parenthetical, or free-text keywords. Each fragment walks
//! an escalation ladder: literal cache, deterministic identifier lookup,
//! concurrent search across free engines with author-position scoring, paid
//! search, AI-assisted guessing with identifier verification, and finally a
//! best-effort pick from everything seen along the way.

pub mod cache;
pub mod classify;
pub mod config;
pub mod extract;
pub mod models;
pub mod resolver;
pub mod score;
pub mod sources;
pub mod utils;

pub use cache::LiteralCache;
pub use config::Config;
pub use models::{
    CitationFragment, CitationKind, FragmentType, Resolution, ResolvedMetadata,
};
pub use resolver::{EscalationStage, Resolver};
pub use sources::{Engine, EngineCapabilities, EngineError, EngineRegistry};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
