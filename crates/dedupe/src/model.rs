use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DedupeError;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Listing sources the collectors know how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Rightmove,
    #[serde(alias = "otm")]
    OnTheMarket,
    Zoopla,
    SpareRoom,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::Rightmove,
        Source::OnTheMarket,
        Source::Zoopla,
        Source::SpareRoom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rightmove => "rightmove",
            Self::OnTheMarket => "onthemarket",
            Self::Zoopla => "zoopla",
            Self::SpareRoom => "spareroom",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = DedupeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rightmove" => Ok(Self::Rightmove),
            "onthemarket" | "otm" => Ok(Self::OnTheMarket),
            "zoopla" => Ok(Self::Zoopla),
            "spareroom" => Ok(Self::SpareRoom),
            other => Err(DedupeError::UnknownSource(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One listing as produced by a collector, already converted to the canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCandidate {
    pub source: Source,
    pub area: String,
    pub address: String,
    pub rent_per_month: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub url: String,
    pub source_listing_id: String,
}

impl ListingCandidate {
    pub fn emission_id(&self) -> EmissionId {
        EmissionId {
            source: self.source,
            source_listing_id: self.source_listing_id.clone(),
        }
    }

    /// Total order over record content, used to break trust ties.
    pub(crate) fn content_order(
        &self,
    ) -> (&str, &str, &str, Option<u32>, Option<u32>, Option<u32>, &str, Source) {
        (
            &self.source_listing_id,
            &self.url,
            &self.address,
            self.rent_per_month,
            self.bedrooms,
            self.bathrooms,
            &self.area,
            self.source,
        )
    }
}

/// Candidates collected from one source in one polling cycle, in collection order.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: Source,
    pub candidates: Vec<ListingCandidate>,
}

impl SourceBatch {
    pub fn new(source: Source, candidates: Vec<ListingCandidate>) -> Self {
        Self { source, candidates }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Normalized address triple indexing one physical property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalKey {
    pub postcode: String,
    pub house_number: String,
    pub street: String,
}

impl CanonicalKey {
    /// No postcode and no street text: the address cannot be linked to anything.
    pub fn is_unresolvable(&self) -> bool {
        self.postcode.is_empty() && self.street.is_empty()
    }
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.postcode, self.house_number, self.street)
    }
}

/// Current representative for one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    pub key: CanonicalKey,
    pub representative: ListingCandidate,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Candidates merged into this identity after it was created.
    pub matches: u32,
}

/// Raw per-source record identity used by the emission gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EmissionId {
    pub source: Source,
    pub source_listing_id: String,
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// How a candidate was linked to an existing identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy { similarity: f64 },
}

/// Why a candidate was (or was not) merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// No existing identity matched; a registry entry was created.
    NewIdentity,
    /// Address has neither postcode nor street; never registered or matched.
    Unlinkable,
    /// Exact key already held by a record whose rent or bedrooms disagree.
    /// Only produced with `guard_exact`; left unmerged and unregistered.
    KeyConflict,
    /// Existing representative kept; the candidate is suppressed.
    Retained { via: MatchKind },
    /// Candidate outranked the existing representative and replaced it.
    Replaced { via: MatchKind, previous: Source },
}

impl Decision {
    /// Whether the decision makes the record eligible for forwarding.
    pub fn is_emittable(&self) -> bool {
        !matches!(self, Decision::Retained { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Decision::Retained { .. } | Decision::Replaced { .. })
    }
}

/// Result of resolving one candidate against the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub forward: bool,
    pub canonical_key: CanonicalKey,
    pub representative: ListingCandidate,
    pub decision: Decision,
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub processed: usize,
    pub forwarded: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub processed: usize,
    pub forwarded: usize,
    pub new_identities: usize,
    pub merged: usize,
    /// Duplicates withheld that were never forwarded.
    pub suppressed: usize,
    /// Records the gate had already forwarded in an earlier call.
    pub already_forwarded: usize,
    pub unlinkable: usize,
    pub key_conflicts: usize,
    pub per_source: BTreeMap<Source, SourceCounts>,
    pub registry_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CycleOutput {
    pub forwarded: Vec<ListingCandidate>,
    pub resolutions: Vec<Resolution>,
    pub report: CycleReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names() {
        assert_eq!("otm".parse::<Source>().unwrap(), Source::OnTheMarket);
        assert_eq!(" SpareRoom ".parse::<Source>().unwrap(), Source::SpareRoom);
        assert!(matches!("gumtree".parse::<Source>(), Err(DedupeError::UnknownSource(_))));
        for source in Source::ALL {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
        let parsed: Source = serde_json::from_str("\"otm\"").unwrap();
        assert_eq!(parsed, Source::OnTheMarket);
        assert_eq!(serde_json::to_string(&Source::SpareRoom).unwrap(), "\"spareroom\"");
    }

    #[test]
    fn decision_flags() {
        let retained = Decision::Retained { via: MatchKind::Exact };
        let replaced = Decision::Replaced { via: MatchKind::Exact, previous: Source::Zoopla };
        assert!(!retained.is_emittable() && retained.is_duplicate());
        assert!(replaced.is_emittable() && replaced.is_duplicate());
        for d in [Decision::NewIdentity, Decision::Unlinkable, Decision::KeyConflict] {
            assert!(d.is_emittable() && !d.is_duplicate());
        }
    }

    #[test]
    fn decision_json_shape() {
        let d = Decision::Retained { via: MatchKind::Fuzzy { similarity: 0.95 } };
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["kind"], "retained");
        assert_eq!(v["via"]["path"], "fuzzy");
        assert_eq!(v["via"]["similarity"], 0.95);
    }

    #[test]
    fn key_display() {
        let key = CanonicalKey {
            postcode: "LN12AB".into(),
            house_number: "12".into(),
            street: "oak rd".into(),
        };
        assert_eq!(key.to_string(), "LN12AB|12|oak rd");
        assert!(!key.is_unresolvable());
        assert!(CanonicalKey::default().is_unresolvable());
    }
}
