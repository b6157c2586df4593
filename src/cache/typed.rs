//! Named, typed handle over one moka cache.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

use super::CacheConfig;

/// Shared handle; clones see the same entries.
///
/// moka handles are already reference-counted, so cloning only bumps
/// counters.
pub struct TypedCache<K, V> {
    entries: Cache<K, V>,
    name: Arc<str>,
}

impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            name: self.name.clone(),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let builder = Cache::builder().max_capacity(config.max_capacity);
        let builder = match config.ttl {
            Some(ttl) => builder.time_to_live(ttl),
            None => builder,
        };
        let builder = match config.tti {
            Some(tti) => builder.time_to_idle(tti),
            None => builder,
        };

        Self {
            entries: builder.build(),
            name: name.into(),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Live value for `key`; expired entries read as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key)
    }

    /// Remove and return the live value, so only one caller ever gets it.
    pub fn take(&self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.invalidate(key);
    }
}

impl<K, V> fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedCache({}, ~{} entries)", self.name, self.entries.entry_count())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_take_removes_entry() {
        let cache: TypedCache<String, u64> = TypedCache::new("t", CacheConfig::default());
        cache.insert("a".to_string(), 1);

        assert_eq!(cache.take(&"a".to_string()), Some(1));
        assert_eq!(cache.take(&"a".to_string()), None);
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let config = CacheConfig::with_capacity(10).ttl(Duration::from_millis(50));
        let cache: TypedCache<u64, u64> = TypedCache::new("ttl", config);
        cache.insert(1, 1);
        assert_eq!(cache.get(&1), Some(1));

        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(cache.get(&1), None);
    }
}
