//! Mock engine for tests: canned responses, call counting, optional delay
//! and failure injection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{FragmentType, ResolvedMetadata};

use super::{Engine, EngineCapabilities, EngineError};

pub struct MockEngine {
    id: &'static str,
    capabilities: EngineCapabilities,
    search_results: Mutex<Vec<ResolvedMetadata>>,
    get_result: Mutex<Option<ResolvedMetadata>>,
    fail_message: Mutex<Option<String>>,
    delay: Option<Duration>,
    search_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl MockEngine {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            capabilities: EngineCapabilities::SEARCH | EngineCapabilities::GET_BY_ID,
            search_results: Mutex::new(Vec::new()),
            get_result: Mutex::new(None),
            fail_message: Mutex::new(None),
            delay: None,
            search_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_capabilities(mut self, capabilities: EngineCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_search_results(self, results: Vec<ResolvedMetadata>) -> Self {
        *self.search_results.lock().unwrap() = results;
        self
    }

    pub fn with_get_result(self, result: ResolvedMetadata) -> Self {
        *self.get_result.lock().unwrap() = Some(result);
        self
    }

    /// Every call fails with an API error carrying `message`.
    pub fn failing(self, message: &str) -> Self {
        *self.fail_message.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Every call sleeps for `delay` before answering, for deadline tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.search_calls() + self.get_calls()
    }

    async fn maybe_delay_and_fail(&self) -> Result<(), EngineError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.fail_message.lock().unwrap().clone() {
            return Err(EngineError::Api(message));
        }
        Ok(())
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        "Mock engine"
    }

    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    async fn search(&self, _query: &str) -> Result<Vec<ResolvedMetadata>, EngineError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay_and_fail().await?;
        Ok(self.search_results.lock().unwrap().clone())
    }

    async fn get_by_id(
        &self,
        _kind: FragmentType,
        _id: &str,
    ) -> Result<Option<ResolvedMetadata>, EngineError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay_and_fail().await?;
        Ok(self.get_result.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CitationKind, MetadataBuilder};

    #[tokio::test]
    async fn test_canned_search() {
        let meta = MetadataBuilder::new(CitationKind::Journal, "T", "mock").build();
        let engine = MockEngine::new("mock").with_search_results(vec![meta]);

        let results = engine.search("anything").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(engine.search_calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let engine = MockEngine::new("mock").failing("boom");
        assert!(matches!(
            engine.search("q").await,
            Err(EngineError::Api(m)) if m == "boom"
        ));
        assert_eq!(engine.total_calls(), 1);
    }
}
