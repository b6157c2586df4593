//! Cache module - Named caches built on Moka.
//!
//! - `CacheRegistry` - central registry holding all named caches
//! - `TypedCache` - typed handle over one Moka cache
//! - `CacheConfig` - capacity and expiry presets
//!
//! Caches are created per domain (categories, pending OAuth logins).

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use typed::TypedCache;
