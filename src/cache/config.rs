//! Capacity and expiry presets for named caches.

use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

/// Size bound and expiry policy of one cache.
///
/// `ttl` evicts an entry a fixed time after insertion; `tti` evicts it once
/// nobody has read it for that long. Either may be unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_capacity: u64,
    pub ttl: Option<Duration>,
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::with_capacity(10_000).ttl(5 * MINUTE)
    }
}

impl CacheConfig {
    /// Unbounded in time, bounded in size.
    pub const fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ttl: None,
            tti: None,
        }
    }

    #[must_use]
    pub const fn ttl(self, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..self
        }
    }

    #[must_use]
    pub const fn tti(self, tti: Duration) -> Self {
        Self {
            tti: Some(tti),
            ..self
        }
    }

    /// Category documents: read on every menu tap, refreshed on every write.
    pub fn categories() -> Self {
        Self::with_capacity(5_000).ttl(10 * MINUTE).tti(2 * MINUTE)
    }

    /// Pending VK logins. The hard TTL outlives no authorization code.
    pub fn pending_auth() -> Self {
        Self::with_capacity(10_000).ttl(10 * MINUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_auth_expires_after_ten_minutes() {
        let config = CacheConfig::pending_auth();
        assert_eq!(config.ttl, Some(Duration::from_secs(600)));
        assert_eq!(config.tti, None);
    }

    #[test]
    fn test_builders_keep_other_fields() {
        let config = CacheConfig::with_capacity(3).tti(MINUTE);
        assert_eq!(config.max_capacity, 3);
        assert_eq!(config.ttl, None);
        assert_eq!(config.tti, Some(MINUTE));
    }
}
