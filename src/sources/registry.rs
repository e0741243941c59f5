//! Engine registry: name-indexed store of the configured engines.

use std::collections::HashMap;
use std::sync::Arc;

use bitflags::bitflags;

use super::Engine;

bitflags! {
    /// What an engine can do, and what using it costs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EngineCapabilities: u32 {
        /// Free-text candidate search.
        const SEARCH = 1 << 0;
        /// Deterministic lookup by DOI, PMID, arXiv id or ISBN.
        const GET_BY_ID = 1 << 1;
        /// Fetches and parses arbitrary web pages.
        const WEB = 1 << 2;
        /// Every call costs money; only used after free engines fail.
        const PAID = 1 << 3;
        /// Model-backed guessing; results require verification.
        const AI = 1 << 4;
    }
}

/// Name-indexed store of engines, shared by the resolver and the CLI.
#[derive(Default, Clone)]
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn Engine>>,
    /// Registration order, kept so fan-out order is deterministic.
    order: Vec<String>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under its own id. Re-registering an id replaces
    /// the previous engine but keeps its position.
    pub fn register(&mut self, engine: Arc<dyn Engine>) {
        let id = engine.id().to_string();
        if self.engines.insert(id.clone(), engine).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Engine>> {
        self.engines.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.engines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// All engines in registration order.
    pub fn all(&self) -> Vec<Arc<dyn Engine>> {
        self.order
            .iter()
            .filter_map(|id| self.engines.get(id).cloned())
            .collect()
    }

    /// Engines advertising every capability in `caps`, in registration order.
    pub fn with_capabilities(&self, caps: EngineCapabilities) -> Vec<Arc<dyn Engine>> {
        self.all()
            .into_iter()
            .filter(|e| e.capabilities().contains(caps))
            .collect()
    }

    /// Free search engines: SEARCH minus PAID and AI. These are the fan-out
    /// pool.
    pub fn free_search_engines(&self) -> Vec<Arc<dyn Engine>> {
        self.all()
            .into_iter()
            .filter(|e| {
                let caps = e.capabilities();
                caps.contains(EngineCapabilities::SEARCH)
                    && !caps.intersects(EngineCapabilities::PAID | EngineCapabilities::AI)
            })
            .collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.order)
            .finish()
    }
}
