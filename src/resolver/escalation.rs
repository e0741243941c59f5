//! The escalation ladder: the ordered layers a fragment passes through
//! until one produces an acceptable answer.

/// Layers in escalation order. Cheap and precise first, expensive and
/// speculative last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscalationStage {
    /// Exact-match literal cache.
    CacheLookup,
    /// Identifier lookup (DOI, PMID, arXiv, ISBN) or direct page fetch.
    DeterministicLookup,
    /// Concurrent search across the free engines.
    ParallelFanOut,
    /// Paid search engines, only after the free pool came back empty.
    PaidFallback,
    /// Model-backed guessing with identifier verification.
    AiAssistedLookup,
    /// Highest-scoring candidate seen anywhere, however weak.
    BestEffort,
}

impl EscalationStage {
    pub fn name(&self) -> &'static str {
        match self {
            EscalationStage::CacheLookup => "cache",
            EscalationStage::DeterministicLookup => "deterministic",
            EscalationStage::ParallelFanOut => "fan_out",
            EscalationStage::PaidFallback => "paid_fallback",
            EscalationStage::AiAssistedLookup => "ai",
            EscalationStage::BestEffort => "best_effort",
        }
    }
}

impl std::fmt::Display for EscalationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
