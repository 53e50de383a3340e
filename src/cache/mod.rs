//! In-memory caches for platform lookups.
//!
//! Chat platform calls are slow and rate limited, so answers that change
//! rarely (admin rights, display names) are kept for a few minutes in a
//! Moka cache behind [`TypedCache`].

mod config;
mod typed;

pub use config::CacheConfig;
pub use typed::TypedCache;
