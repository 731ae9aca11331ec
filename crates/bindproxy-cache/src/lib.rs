//! Bindproxy Cache
//!
//! Holds one built [`Composite`](bindproxy_core::Composite) per external
//! identity so repeated requests reuse it, and drops it when the identity's
//! lifecycle ends.
//!
//! # Architecture
//!
//! - `cache` - `CompositeCache`, keyed store with single-flight builds
//! - `config` - `CacheConfig`, capacity settings loadable from TOML

#![forbid(unsafe_code)]

/// Keyed composite store
pub mod cache;

/// Cache configuration
pub mod config;

pub use cache::{CacheStats, CompositeCache};
pub use config::{CacheConfig, ConfigError};
