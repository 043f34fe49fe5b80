//! In-process embedding cache keyed by idea id and text hash.
//!
//! Lets the board service skip re-encoding ideas whose text has not
//! changed since the previous list call. An entry only matches when the
//! SHA-256 of the current text equals the hash stored with it, so editing
//! an idea's text invalidates its vector without any explicit hook.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use sha2::{Digest, Sha256};

struct CachedEmbedding {
    text_hash: String,
    vector: Vec<f32>,
}

/// Embedding cache shared across requests.
#[derive(Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<i64, CachedEmbedding>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached vector for `id` if it was computed from `text`.
    pub fn get(&self, id: i64, text: &str) -> Option<Vec<f32>> {
        let entries = self.entries.read().ok()?;
        entries
            .get(&id)
            .filter(|e| e.text_hash == text_hash(text))
            .map(|e| e.vector.clone())
    }

    pub fn insert(&self, id: i64, text: &str, vector: Vec<f32>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                id,
                CachedEmbedding {
                    text_hash: text_hash(text),
                    vector,
                },
            );
        }
    }

    /// Drop entries for ids no longer on the board.
    pub fn retain_ids(&self, live: &HashSet<i64>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|id, _| live.contains(id));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_requires_same_text() {
        let cache = EmbeddingCache::new();
        cache.insert(1, "buy milk", vec![1.0, 0.0]);
        assert_eq!(cache.get(1, "buy milk"), Some(vec![1.0, 0.0]));
        assert_eq!(cache.get(1, "buy oat milk"), None);
        assert_eq!(cache.get(2, "buy milk"), None);
    }

    #[test]
    fn test_insert_replaces() {
        let cache = EmbeddingCache::new();
        cache.insert(1, "a", vec![1.0]);
        cache.insert(1, "b", vec![2.0]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1, "a"), None);
        assert_eq!(cache.get(1, "b"), Some(vec![2.0]));
    }

    #[test]
    fn test_retain_ids() {
        let cache = EmbeddingCache::new();
        cache.insert(1, "a", vec![1.0]);
        cache.insert(2, "b", vec![2.0]);
        cache.retain_ids(&HashSet::from([2]));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(1, "a").is_none());
        assert!(!cache.is_empty());
    }
}
