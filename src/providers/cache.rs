//! Shared provider bundle cache, keyed by `(model_id, device_preference)`.
//!
//! Real providers load tokenizer/weight state once per distinct key and
//! reuse it across requests (§5). Insertion is idempotent: if two callers
//! race to build the same key, the second build is simply discarded in
//! favor of whichever finished first, rather than overwriting it.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub model_id: String,
    pub device_preference: String,
}

impl CacheKey {
    pub fn new(model_id: impl Into<String>, device_preference: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            device_preference: device_preference.into(),
        }
    }
}

/// Type-erased bundle cache, safe for concurrent reads while a build is in
/// flight on another thread.
pub struct BundleCache {
    entries: RwLock<HashMap<CacheKey, Arc<dyn Any + Send + Sync>>>,
}

impl BundleCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached bundle for `key`, or build, insert, and return a
    /// fresh one via `build`. `build` may be called more than once under
    /// concurrent contention; only the first successful result is kept.
    pub fn get_or_try_insert_with<T, E>(
        &self,
        key: &CacheKey,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
    {
        if let Some(existing) = self.get(key) {
            return Ok(existing);
        }

        let built = Arc::new(build()?);
        let mut guard = self.entries.write().expect("bundle cache poisoned");
        let slot = guard
            .entry(key.clone())
            .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>);
        Ok(slot
            .clone()
            .downcast::<T>()
            .expect("bundle cache key reused with a different payload type"))
    }

    fn get<T>(&self, key: &CacheKey) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let guard = self.entries.read().expect("bundle cache poisoned");
        guard.get(key).and_then(|entry| entry.clone().downcast::<T>().ok())
    }
}

impl Default for BundleCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide bundle cache shared by all real providers, so that a
/// backend resolved fresh per request still reuses already-loaded model
/// state (§5).
pub fn shared() -> Arc<BundleCache> {
    static CACHE: OnceLock<Arc<BundleCache>> = OnceLock::new();
    CACHE.get_or_init(|| Arc::new(BundleCache::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builds_once_per_key() {
        let cache = BundleCache::new();
        let builds = AtomicUsize::new(0);
        let key = CacheKey::new("model-a", "cpu");

        let first: Result<Arc<String>, ()> = cache.get_or_try_insert_with(&key, || {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok("bundle".to_string())
        });
        let second: Result<Arc<String>, ()> = cache.get_or_try_insert_with(&key, || {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok("bundle".to_string())
        });

        assert_eq!(*first.unwrap(), "bundle");
        assert_eq!(*second.unwrap(), "bundle");
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_keys_build_independently() {
        let cache = BundleCache::new();
        let a: Result<Arc<String>, ()> =
            cache.get_or_try_insert_with(&CacheKey::new("model-a", "cpu"), || Ok("a".to_string()));
        let b: Result<Arc<String>, ()> =
            cache.get_or_try_insert_with(&CacheKey::new("model-b", "cpu"), || Ok("b".to_string()));
        assert_eq!(*a.unwrap(), "a");
        assert_eq!(*b.unwrap(), "b");
    }

    #[test]
    fn failed_build_is_not_cached() {
        let cache = BundleCache::new();
        let key = CacheKey::new("model-c", "cpu");
        let failed: Result<Arc<String>, &str> =
            cache.get_or_try_insert_with(&key, || Err("no weights"));
        assert!(failed.is_err());
        let retried: Result<Arc<String>, &str> =
            cache.get_or_try_insert_with(&key, || Ok("recovered".to_string()));
        assert_eq!(*retried.unwrap(), "recovered");
    }
}
