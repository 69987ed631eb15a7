//! Core trait definitions shared across crates.

pub mod cache;

pub use cache::CacheProvider;
