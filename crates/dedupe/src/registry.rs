//! Identity registry and emission gate.
//!
//! Both stores are owned by a [`DedupeEngine`](crate::engine::DedupeEngine) and
//! mutated only through `&mut self`, so a single writer is enforced by the borrow
//! checker.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;

use crate::model::{CanonicalKey, EmissionId, ListingCandidate, RegistryEntry};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// `CanonicalKey → RegistryEntry`, kept in insertion order.
///
/// A secondary postcode index keeps the fuzzy scan proportional to the number of
/// identities sharing the candidate's postcode.
#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<CanonicalKey, RegistryEntry>,
    by_postcode: HashMap<String, Vec<CanonicalKey>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Entries sharing `postcode`, in insertion order.
    pub fn with_postcode<'a>(&'a self, postcode: &str) -> impl Iterator<Item = &'a RegistryEntry> + 'a {
        self.by_postcode
            .get(postcode)
            .into_iter()
            .flatten()
            .filter_map(move |key| self.entries.get(key))
    }

    /// Create a new identity. Unresolvable keys are never stored; an existing
    /// key is left untouched. Returns whether the entry was created.
    pub fn insert(&mut self, key: CanonicalKey, candidate: ListingCandidate, now: DateTime<Utc>) -> bool {
        if key.is_unresolvable() || self.entries.contains_key(&key) {
            return false;
        }
        if !key.postcode.is_empty() {
            self.by_postcode
                .entry(key.postcode.clone())
                .or_default()
                .push(key.clone());
        }
        self.entries.insert(
            key.clone(),
            RegistryEntry {
                key,
                representative: candidate,
                first_seen: now,
                last_seen: now,
                matches: 0,
            },
        );
        true
    }

    /// Overwrite the representative of an existing identity (position unchanged).
    pub fn update(&mut self, key: &CanonicalKey, representative: ListingCandidate, now: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.representative = representative;
            entry.last_seen = now;
            entry.matches += 1;
        }
    }

    /// Drop every entry the policy evicts. Returns how many were removed.
    pub fn prune(&mut self, policy: &dyn RetentionPolicy, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !policy.should_evict(entry, now));
        let removed = before - self.entries.len();
        if removed > 0 {
            let entries = &self.entries;
            self.by_postcode.retain(|_, keys| {
                keys.retain(|k| entries.contains_key(k));
                !keys.is_empty()
            });
        }
        removed
    }
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

/// Decides whether a registry entry should be evicted.
pub trait RetentionPolicy: Send + Sync {
    fn should_evict(&self, entry: &RegistryEntry, now: DateTime<Utc>) -> bool;
}

/// Never evict.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepForever;

impl RetentionPolicy for KeepForever {
    fn should_evict(&self, _entry: &RegistryEntry, _now: DateTime<Utc>) -> bool {
        false
    }
}

/// Evict entries whose last match is older than the given age.
#[derive(Debug, Clone, Copy)]
pub struct TimeToLive(pub Duration);

impl RetentionPolicy for TimeToLive {
    fn should_evict(&self, entry: &RegistryEntry, now: DateTime<Utc>) -> bool {
        now - entry.last_seen > self.0
    }
}

// ---------------------------------------------------------------------------
// Emission gate
// ---------------------------------------------------------------------------

/// Tracks which raw source records were already forwarded downstream.
#[derive(Debug, Default)]
pub struct EmissionGate {
    /// `true` once forwarded; `false` for records observed but suppressed.
    seen: HashMap<EmissionId, bool>,
}

impl EmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn has_forwarded(&self, id: &EmissionId) -> bool {
        self.seen.get(id).copied().unwrap_or(false)
    }

    pub fn has_observed(&self, id: &EmissionId) -> bool {
        self.seen.contains_key(id)
    }

    /// Record an observation and decide whether to forward it.
    ///
    /// Returns `true` exactly once per id, the first time it is `eligible`.
    pub fn admit(&mut self, id: EmissionId, eligible: bool) -> bool {
        let forwarded = self.seen.entry(id).or_insert(false);
        if eligible && !*forwarded {
            *forwarded = true;
            true
        } else {
            false
        }
    }
}
