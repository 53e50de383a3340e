//! Cache sizing and expiry.

use std::time::Duration;

/// Sizing and expiry of one [`TypedCache`](super::TypedCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries.
    pub max_capacity: u64,

    /// Entries expire this long after insertion.
    pub ttl: Option<Duration>,

    /// Entries expire when not read for this long.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(300)),
            tti: None,
        }
    }
}

impl CacheConfig {
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    #[must_use]
    pub fn tti(mut self, duration: Duration) -> Self {
        self.tti = Some(duration);
        self
    }

    /// Admin rights per (chat, user): 5 minutes, dropped after 2 idle.
    pub fn admin_rights() -> Self {
        Self::with_capacity(10_000)
            .ttl(Duration::from_secs(300))
            .tti(Duration::from_secs(120))
    }

    /// Display names per (chat, user) used in notices.
    pub fn display_names() -> Self {
        Self::with_capacity(20_000).ttl(Duration::from_secs(600))
    }
}
