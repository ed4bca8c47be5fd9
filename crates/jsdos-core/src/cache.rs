//! Content cache shared by bundle loading collaborators

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Byte cache keyed by content URL
#[async_trait::async_trait]
pub trait Cache: Send + Sync {
    /// Cached bytes for `key`
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store bytes under `key`
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), String>;

    /// Drop the entry for `key`
    async fn del(&self, key: &str);

    /// Currently cached keys
    fn keys(&self) -> Vec<String>;
}

/// Cache that never stores anything (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheNoop;

#[async_trait::async_trait]
impl Cache for CacheNoop {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn put(&self, _key: &str, _data: Vec<u8>) -> Result<(), String> {
        Ok(())
    }

    async fn del(&self, _key: &str) {}

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), String> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn del(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_cache_stores_nothing() {
        let cache = CacheNoop;
        cache.put("a", vec![1, 2, 3]).await.unwrap();
        assert!(cache.get("a").await.is_none());
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryCache::new();
        cache.put("b", vec![2]).await.unwrap();
        cache.put("a", vec![1]).await.unwrap();
        assert_eq!(cache.get("a").await, Some(vec![1]));
        assert_eq!(cache.keys(), vec!["a".to_string(), "b".to_string()]);

        cache.del("a").await;
        assert!(cache.get("a").await.is_none());
    }
}
