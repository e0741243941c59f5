//! Literal resolution cache.
//!
//! Keys are the md5 of the trimmed fragment text, so matching is exact:
//! "(Coleman, 1988)" and "(Coleman 1988)" are different keys. Entries never
//! expire; bibliographic metadata does not go stale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::ResolvedMetadata;

/// One cached resolution, with enough context to audit it later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub original_text: String,
    pub metadata: ResolvedMetadata,
    pub cached_at: DateTime<Utc>,
}

/// Exact-match cache of successful resolutions.
///
/// The on-disk form is a single JSON object keyed by digest. A missing or
/// corrupt file starts the cache empty rather than failing: the cache is an
/// accelerator, never a dependency.
pub struct LiteralCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    path: Option<PathBuf>,
}

impl LiteralCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            path: None,
        }
    }

    /// Open a file-backed cache, loading existing entries.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => {
                let entries = parse_block(&text);
                debug!(path = %path.display(), entries = entries.len(), "cache loaded");
                entries
            }
            Err(_) => HashMap::new(),
        };

        Self {
            entries: Mutex::new(entries),
            path: Some(path),
        }
    }

    /// Rebuild a cache from a serialized block. A malformed block yields an
    /// empty cache.
    pub fn from_block(block: &str) -> Self {
        Self {
            entries: Mutex::new(parse_block(block)),
            path: None,
        }
    }

    /// Serialize the whole cache as one self-contained JSON block. Each
    /// entry carries its original text and timestamp, so the block can
    /// travel with the document it was built from.
    pub fn to_block(&self) -> String {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| serde_json::to_string_pretty(&*entries).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    fn key(text: &str) -> String {
        format!("{:x}", md5::compute(text.trim()))
    }

    pub fn get(&self, text: &str) -> Option<ResolvedMetadata> {
        self.entries
            .lock()
            .ok()?
            .get(&Self::key(text))
            .map(|entry| entry.metadata.clone())
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(&Self::key(text)))
            .unwrap_or(false)
    }

    /// Store a successful resolution under the trimmed text's digest.
    pub fn put(&self, text: &str, metadata: ResolvedMetadata) {
        let entry = CacheEntry {
            original_text: text.trim().to_string(),
            metadata,
            cached_at: Utc::now(),
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(Self::key(text), entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the cache back to its file, if it has one.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        std::fs::write(path, self.to_block())
    }
}

fn parse_block(block: &str) -> HashMap<String, CacheEntry> {
    match serde_json::from_str(block) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "cache block corrupt, starting empty");
            HashMap::new()
        }
    }
}

impl Default for LiteralCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CitationKind, MetadataBuilder};

    fn meta(title: &str) -> ResolvedMetadata {
        MetadataBuilder::new(CitationKind::Journal, title, "test").build()
    }

    #[test]
    fn test_put_and_get() {
        let cache = LiteralCache::new();
        cache.put("(Coleman, 1988)", meta("Social Capital"));

        assert!(cache.contains("(Coleman, 1988)"));
        assert_eq!(cache.get("(Coleman, 1988)").unwrap().title, "Social Capital");
        assert!(cache.get("(Putnam, 2000)").is_none());
    }

    #[test]
    fn test_exact_match_only() {
        let cache = LiteralCache::new();
        cache.put("(Coleman, 1988)", meta("Social Capital"));

        // A missing comma is a different key.
        assert!(cache.get("(Coleman 1988)").is_none());
    }

    #[test]
    fn test_whitespace_trimmed() {
        let cache = LiteralCache::new();
        cache.put("  (Coleman, 1988)  ", meta("Social Capital"));
        assert!(cache.contains("(Coleman, 1988)"));
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = LiteralCache::open(&path);
        cache.put("(Coleman, 1988)", meta("Social Capital"));
        cache.save().unwrap();

        let reloaded = LiteralCache::open(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("(Coleman, 1988)").unwrap().title, "Social Capital");
    }

    #[test]
    fn test_block_roundtrip() {
        let cache = LiteralCache::new();
        cache.put("(Coleman, 1988)", meta("Social Capital"));

        let block = cache.to_block();
        let restored = LiteralCache::from_block(&block);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.get("(Coleman, 1988)").unwrap().title, "Social Capital");

        assert!(LiteralCache::from_block("{broken").is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not valid json").unwrap();

        let cache = LiteralCache::open(&path);
        assert!(cache.is_empty());
    }
}
