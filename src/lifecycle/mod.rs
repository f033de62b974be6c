//! # Lifecycle State Machine
//!
//! Fetch status and expiry bookkeeping for a single resource.
//!
//! ```text
//!              fetch()              success
//!  UNFETCHED ──────────► FETCHING ──────────► FETCHED
//!                           ▲  │                 │
//!                 fetch()   │  │ failure         │ expire / ttl elapsed
//!            (if fetchable) │  ▼                 │
//!                           └─ ERROR ◄───────────┘ (fetchable again)
//! ```
//!
//! [`Lifecycle`] is plain data with transition methods. It knows nothing about
//! transports, clocks or observers: every method that depends on time takes
//! `now` explicitly, and [`Resource`](crate::resource::Resource) compares
//! [`Snapshot`]s before and after each transition to decide which observers to
//! notify.
//!
//! ## Derived flags
//!
//! - `has_been_fetched`: latched once the state first reaches `FETCHED`.
//! - `is_expired`: `expire_at` is set and not in the future.
//! - `is_fetchable`: `UNFETCHED`, `ERROR`, or `FETCHED` and expired. Never true
//!   while `FETCHING`, which is what bounds a resource to one in-flight fetch.

pub mod expiry;

pub use expiry::*;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// Fetch status of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceState {
    #[default]
    Unfetched,
    Fetching,
    Fetched,
    /// The last fetch failed. Retriable.
    Error,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceState::Unfetched => "UNFETCHED",
            ResourceState::Fetching => "FETCHING",
            ResourceState::Fetched => "FETCHED",
            ResourceState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Observable attributes of a resource's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    ResourceState,
    ExpireAt,
    IsExpired,
    IsFetchable,
    HasBeenFetched,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::ResourceState,
        Attribute::ExpireAt,
        Attribute::IsExpired,
        Attribute::IsFetchable,
        Attribute::HasBeenFetched,
    ];
}

/// Every observable value of a lifecycle at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: ResourceState,
    pub expire_at: Option<Timestamp>,
    pub is_expired: bool,
    pub is_fetchable: bool,
    pub has_been_fetched: bool,
}

impl Snapshot {
    /// Attributes whose value differs between `self` and `newer`.
    pub fn changed(&self, newer: &Snapshot) -> Vec<Attribute> {
        Attribute::ALL
            .into_iter()
            .filter(|attribute| match attribute {
                Attribute::ResourceState => self.state != newer.state,
                Attribute::ExpireAt => self.expire_at != newer.expire_at,
                Attribute::IsExpired => self.is_expired != newer.is_expired,
                Attribute::IsFetchable => self.is_fetchable != newer.is_fetchable,
                Attribute::HasBeenFetched => self.has_been_fetched != newer.has_been_fetched,
            })
            .collect()
    }
}

/// Per-resource fetch state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifecycle {
    state: ResourceState,
    expire_at: Option<Timestamp>,
    has_been_fetched: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn expire_at(&self) -> Option<Timestamp> {
        self.expire_at
    }

    pub fn has_been_fetched(&self) -> bool {
        self.has_been_fetched
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expire_at, Some(at) if at <= now)
    }

    pub fn is_fetchable(&self, now: Timestamp) -> bool {
        match self.state {
            ResourceState::Unfetched | ResourceState::Error => true,
            ResourceState::Fetched => self.is_expired(now),
            ResourceState::Fetching => false,
        }
    }

    pub fn snapshot(&self, now: Timestamp) -> Snapshot {
        Snapshot {
            state: self.state,
            expire_at: self.expire_at,
            is_expired: self.is_expired(now),
            is_fetchable: self.is_fetchable(now),
            has_been_fetched: self.has_been_fetched,
        }
    }

    /// Enter `FETCHING` if fetchable. Returns whether a fetch should be issued.
    pub fn begin_fetch(&mut self, now: Timestamp) -> bool {
        if !self.is_fetchable(now) {
            return false;
        }
        self.state = ResourceState::Fetching;
        true
    }

    /// Record a successful fetch. Ignored unless a fetch is in flight.
    pub fn complete_fetch(&mut self, now: Timestamp, ttl: Expiry) -> bool {
        if self.state != ResourceState::Fetching {
            return false;
        }
        self.state = ResourceState::Fetched;
        self.expire_at = ttl.deadline(now);
        self.has_been_fetched = true;
        true
    }

    /// Record a failed fetch. `expire_at` keeps whatever the last success set.
    pub fn fail_fetch(&mut self) -> bool {
        if self.state != ResourceState::Fetching {
            return false;
        }
        self.state = ResourceState::Error;
        true
    }

    pub fn set_expire_at(&mut self, expire_at: Option<Timestamp>) {
        self.expire_at = expire_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn at(secs: u64) -> Timestamp {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn fresh_lifecycle_is_unfetched_and_fetchable() {
        let lifecycle = Lifecycle::new();
        let snapshot = lifecycle.snapshot(at(0));
        assert_eq!(
            snapshot,
            Snapshot {
                state: ResourceState::Unfetched,
                expire_at: None,
                is_expired: false,
                is_fetchable: true,
                has_been_fetched: false,
            }
        );
    }

    #[test]
    fn only_one_fetch_can_be_in_flight() {
        let mut lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_fetch(at(0)));
        assert!(!lifecycle.is_fetchable(at(0)));
        assert!(!lifecycle.begin_fetch(at(0)));
        assert_eq!(lifecycle.state(), ResourceState::Fetching);
    }

    #[test]
    fn success_sets_expiry_from_the_policy() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.begin_fetch(at(10));
        assert!(lifecycle.complete_fetch(at(10), Expiry::After(Duration::from_secs(60))));

        assert_eq!(lifecycle.state(), ResourceState::Fetched);
        assert_eq!(lifecycle.expire_at(), Some(at(70)));
        assert!(lifecycle.has_been_fetched());
        assert!(!lifecycle.is_fetchable(at(69)));
        assert!(lifecycle.is_fetchable(at(70)));
    }

    #[test]
    fn failure_is_retriable_and_keeps_expiry() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.begin_fetch(at(0));
        lifecycle.complete_fetch(at(0), Expiry::After(Duration::from_secs(60)));

        assert!(lifecycle.begin_fetch(at(61)));
        assert!(lifecycle.fail_fetch());

        assert_eq!(lifecycle.state(), ResourceState::Error);
        assert_eq!(lifecycle.expire_at(), Some(at(60)));
        assert!(lifecycle.has_been_fetched());
        assert!(lifecycle.is_fetchable(at(61)));
    }

    #[test]
    fn never_expiring_data_stays_fresh() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.begin_fetch(at(0));
        lifecycle.complete_fetch(at(0), Expiry::Never);

        assert_eq!(lifecycle.expire_at(), None);
        assert!(!lifecycle.is_expired(at(u32::MAX as u64)));
        assert!(!lifecycle.is_fetchable(at(u32::MAX as u64)));
    }

    #[test]
    fn late_completions_are_ignored() {
        let mut lifecycle = Lifecycle::new();
        assert!(!lifecycle.complete_fetch(at(0), Expiry::default()));
        assert!(!lifecycle.fail_fetch());
        assert_eq!(lifecycle.state(), ResourceState::Unfetched);
    }

    #[test]
    fn snapshots_report_changed_attributes() {
        let mut lifecycle = Lifecycle::new();
        let before = lifecycle.snapshot(at(0));
        lifecycle.begin_fetch(at(0));
        let after = lifecycle.snapshot(at(0));

        assert_eq!(
            before.changed(&after),
            vec![Attribute::ResourceState, Attribute::IsFetchable]
        );
    }

    #[test]
    fn state_serializes_as_upper_case() {
        let json = serde_json::to_string(&ResourceState::Unfetched).unwrap();
        assert_eq!(json, "\"UNFETCHED\"");
        assert_eq!(ResourceState::Fetched.to_string(), "FETCHED");
    }
}
