//! Expiry policy applied after a successful fetch.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// How long fetched data stays fresh when nothing else says otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Time-to-live policy for fetched data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Data goes stale this long after it arrived.
    After(Duration),
    /// Data never goes stale on its own; only explicit expiry refetches it.
    Never,
}

impl Expiry {
    /// The `expire_at` to record for data fetched at `now`.
    ///
    /// A TTL too large to represent as an instant never expires.
    pub fn deadline(&self, now: Timestamp) -> Option<Timestamp> {
        match self {
            Expiry::After(ttl) => now.checked_add(*ttl),
            Expiry::Never => None,
        }
    }
}

impl Default for Expiry {
    fn default() -> Self {
        Expiry::After(DEFAULT_TTL)
    }
}
