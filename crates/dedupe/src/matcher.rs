use crate::config::{MatchStrategy, MatchingConfig};
use crate::model::{CanonicalKey, ListingCandidate, MatchKind, RegistryEntry};
use crate::normalize::canonical_key;
use crate::registry::Registry;

/// Which path the matcher took for a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchPath {
    /// No postcode and no street: never linked.
    Unresolvable,
    /// Exact key present but rent or bedrooms disagree (`guard_exact` only).
    KeyConflict,
    /// Nothing matched.
    Miss,
    Exact,
    Fuzzy { similarity: f64 },
}

/// Outcome of [`Matcher::resolve`].
#[derive(Debug, Clone)]
pub struct MatchOutcome<'r> {
    /// Identity key: the matched entry's key on a hit, the candidate's own otherwise.
    pub key: CanonicalKey,
    /// Key computed from the candidate's address.
    pub candidate_key: CanonicalKey,
    pub matched: Option<&'r RegistryEntry>,
    pub path: MatchPath,
}

impl MatchOutcome<'_> {
    pub fn is_duplicate(&self) -> bool {
        self.matched.is_some()
    }

    pub fn match_kind(&self) -> Option<MatchKind> {
        match self.path {
            MatchPath::Exact => Some(MatchKind::Exact),
            MatchPath::Fuzzy { similarity } => Some(MatchKind::Fuzzy { similarity }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Relative rent difference within tolerance. Unknown (or zero) rent never disqualifies.
pub fn rent_within(a: Option<u32>, b: Option<u32>, tolerance: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) if a > 0 && b > 0 => {
            let (a, b) = (f64::from(a), f64::from(b));
            (a - b).abs() / a.max(b) <= tolerance
        }
        _ => true,
    }
}

/// Bedroom counts equal. Unknown counts never disqualify.
pub fn bedrooms_agree(a: Option<u32>, b: Option<u32>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn attributes_agree(candidate: &ListingCandidate, existing: &ListingCandidate, config: &MatchingConfig) -> bool {
    rent_within(candidate.rent_per_month, existing.rent_per_month, config.rent_tolerance)
        && bedrooms_agree(candidate.bedrooms, existing.bedrooms)
}

// ---------------------------------------------------------------------------
// Fuzzy scan strategies
// ---------------------------------------------------------------------------

/// Fuzzy scan over the registry entries that share the candidate's postcode.
///
/// `pool` yields entries in registry insertion order. Implementations return the
/// chosen entry and its street similarity.
pub trait FuzzyScan: Send + Sync {
    fn scan<'r>(
        &self,
        key: &CanonicalKey,
        candidate: &ListingCandidate,
        pool: &mut dyn Iterator<Item = &'r RegistryEntry>,
        config: &MatchingConfig,
    ) -> Option<(&'r RegistryEntry, f64)>;
}

/// Street similarity of `entry` if it passes every fuzzy predicate.
fn fuzzy_score(
    key: &CanonicalKey,
    candidate: &ListingCandidate,
    entry: &RegistryEntry,
    config: &MatchingConfig,
) -> Option<f64> {
    if !attributes_agree(candidate, &entry.representative, config) {
        return None;
    }
    let similarity = config.metric.score(&key.street, &entry.key.street);
    (similarity >= config.street_similarity).then_some(similarity)
}

/// Stop at the first passing entry. Cheap, but may not pick the closest street.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl FuzzyScan for FirstMatch {
    fn scan<'r>(
        &self,
        key: &CanonicalKey,
        candidate: &ListingCandidate,
        pool: &mut dyn Iterator<Item = &'r RegistryEntry>,
        config: &MatchingConfig,
    ) -> Option<(&'r RegistryEntry, f64)> {
        for entry in pool {
            if let Some(s) = fuzzy_score(key, candidate, entry, config) {
                return Some((entry, s));
            }
        }
        None
    }
}

/// Scan every entry and keep the highest similarity (earliest wins ties).
#[derive(Debug, Clone, Copy, Default)]
pub struct BestMatch;

impl FuzzyScan for BestMatch {
    fn scan<'r>(
        &self,
        key: &CanonicalKey,
        candidate: &ListingCandidate,
        pool: &mut dyn Iterator<Item = &'r RegistryEntry>,
        config: &MatchingConfig,
    ) -> Option<(&'r RegistryEntry, f64)> {
        let mut best: Option<(&'r RegistryEntry, f64)> = None;
        for entry in pool {
            if let Some(s) = fuzzy_score(key, candidate, entry, config) {
                if best.map_or(true, |(_, b)| s > b) {
                    best = Some((entry, s));
                }
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Exact-key lookup followed by a bounded fuzzy scan within the postcode.
pub struct Matcher {
    config: MatchingConfig,
    scan: Box<dyn FuzzyScan>,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchingConfig::default())
    }
}

impl Matcher {
    /// Matcher using the scan strategy named in `config`.
    pub fn new(config: MatchingConfig) -> Self {
        let scan: Box<dyn FuzzyScan> = match config.strategy {
            MatchStrategy::FirstMatch => Box::new(FirstMatch),
            MatchStrategy::BestMatch => Box::new(BestMatch),
        };
        Self { config, scan }
    }

    /// Matcher with a caller-supplied scan strategy.
    pub fn with_scan(config: MatchingConfig, scan: Box<dyn FuzzyScan>) -> Self {
        Self { config, scan }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn resolve<'r>(&self, candidate: &ListingCandidate, registry: &'r Registry) -> MatchOutcome<'r> {
        let key = canonical_key(&candidate.address);
        let outcome = |key: CanonicalKey, matched: Option<&'r RegistryEntry>, path: MatchPath| MatchOutcome {
            candidate_key: key.clone(),
            key,
            matched,
            path,
        };

        if key.is_unresolvable() {
            return outcome(key, None, MatchPath::Unresolvable);
        }

        if let Some(entry) = registry.get(&key) {
            if self.config.guard_exact && !attributes_agree(candidate, &entry.representative, &self.config) {
                return outcome(key, None, MatchPath::KeyConflict);
            }
            return outcome(key, Some(entry), MatchPath::Exact);
        }

        if key.postcode.is_empty() {
            return outcome(key, None, MatchPath::Miss);
        }

        let found = {
            let mut pool = registry.with_postcode(&key.postcode);
            self.scan.scan(&key, candidate, &mut pool, &self.config)
        };
        match found {
            Some((entry, similarity)) => MatchOutcome {
                key: entry.key.clone(),
                candidate_key: key,
                matched: Some(entry),
                path: MatchPath::Fuzzy { similarity },
            },
            None => outcome(key, None, MatchPath::Miss),
        }
    }
}

/// Resolve `candidate` against `registry` with default matching settings.
pub fn resolve<'r>(candidate: &ListingCandidate, registry: &'r Registry) -> MatchOutcome<'r> {
    Matcher::default().resolve(candidate, registry)
}
