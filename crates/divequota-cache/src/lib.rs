//! # divequota-cache
//!
//! Cache providers for quota snapshots. Supports two modes:
//!
//! - **memory**: In-process cache using [moka](https://crates.io/crates/moka)
//! - **redis**: Redis-backed cache shared between engine instances
//!
//! The provider is selected at runtime based on configuration. Cached
//! values are advisory; the reservation store stays authoritative.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
