//! In-memory artifact cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use super::{evaluate, name_digest, ArtifactCache, CacheKey, NEVER_WRITTEN};
use crate::error::{HbsError, Result};
use crate::render::RenderFunction;

#[derive(Debug, Clone)]
struct Entry {
    content: String,
    written_at: SystemTime,
}

/// Artifact cache held in process memory.
///
/// Clones share storage, so a test can keep a handle after moving the cache
/// into an environment.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<CacheKey, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Raw artifact text stored under `key`.
    pub fn content(&self, key: &CacheKey) -> Option<String> {
        self.lock().get(key).map(|entry| entry.content.clone())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ArtifactCache for MemoryCache {
    fn generate_key(&self, name: &str) -> Option<CacheKey> {
        name_digest(name).map(|hash| CacheKey::new(format!("mem:{hash}")))
    }

    fn write(&self, key: &CacheKey, content: &str) -> Result<()> {
        self.lock().insert(
            key.clone(),
            Entry {
                content: content.to_string(),
                written_at: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn load(&self, key: &CacheKey) -> Result<RenderFunction> {
        let content = self
            .content(key)
            .ok_or_else(|| HbsError::ArtifactMissing(key.to_string()))?;
        evaluate(key, &content)
    }

    fn timestamp(&self, key: &CacheKey) -> SystemTime {
        self.lock()
            .get(key)
            .map(|entry| entry.written_at)
            .unwrap_or(NEVER_WRITTEN)
    }

    fn exists(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact;
    use crate::compiler::{CompileOptions, HandlebarsCompiler, TemplateCompiler};
    use serde_json::json;

    #[test]
    fn test_clones_share_entries() {
        let cache = MemoryCache::new();
        let handle = cache.clone();
        let key = cache.generate_key("t").unwrap();
        assert!(key.to_string().starts_with("mem:"));

        let code = HandlebarsCompiler::new()
            .compile("{{x}}", &CompileOptions::default())
            .unwrap();
        cache.write(&key, &artifact::encode("t", &code)).unwrap();

        assert_eq!(handle.len(), 1);
        assert!(handle.exists(&key));
        assert!(handle.timestamp(&key) > NEVER_WRITTEN);
        let out = handle.load(&key).unwrap().call(&json!({"x": 7})).unwrap();
        assert_eq!(out, "7");
    }

    #[test]
    fn test_missing_key() {
        let cache = MemoryCache::new();
        let key = cache.generate_key("nope").unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.timestamp(&key), NEVER_WRITTEN);
        assert!(matches!(cache.load(&key), Err(HbsError::ArtifactMissing(_))));
    }
}
