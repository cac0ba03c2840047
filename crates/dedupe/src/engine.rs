use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::arbiter::TrustRanking;
use crate::config::DedupeConfig;
use crate::matcher::{MatchPath, Matcher};
use crate::model::{CycleOutput, Decision, ListingCandidate, Resolution, SourceBatch};
use crate::registry::{EmissionGate, KeepForever, Registry, RetentionPolicy, TimeToLive};
use crate::report::CycleTally;

/// Identity resolution state for one process: registry, emission gate and the
/// policies that drive them.
///
/// Every mutation goes through `&mut self`; wrap in [`SharedEngine`] when
/// collectors run on several threads.
pub struct DedupeEngine {
    config: DedupeConfig,
    matcher: Matcher,
    trust: TrustRanking,
    retention: Box<dyn RetentionPolicy>,
    registry: Registry,
    gate: EmissionGate,
    cycles: u64,
}

impl Default for DedupeEngine {
    fn default() -> Self {
        Self::new(DedupeConfig::default())
    }
}

impl DedupeEngine {
    pub fn new(config: DedupeConfig) -> Self {
        let matcher = Matcher::new(config.matching.clone());
        let trust = TrustRanking::new(config.trust.clone());
        let retention: Box<dyn RetentionPolicy> = match config.retention.ttl_hours {
            Some(hours) => match i64::try_from(hours).ok().and_then(Duration::try_hours) {
                Some(ttl) => Box::new(TimeToLive(ttl)),
                None => {
                    warn!(ttl_hours = hours, "ttl out of range, keeping registry entries forever");
                    Box::new(KeepForever)
                }
            },
            None => Box::new(KeepForever),
        };
        Self {
            config,
            matcher,
            trust,
            retention,
            registry: Registry::new(),
            gate: EmissionGate::new(),
            cycles: 0,
        }
    }

    /// Replace the fuzzy matcher (e.g. a custom scan strategy).
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replace the retention policy used by [`prune`](Self::prune).
    pub fn with_retention(mut self, retention: Box<dyn RetentionPolicy>) -> Self {
        self.retention = retention;
        self
    }

    pub fn config(&self) -> &DedupeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gate(&self) -> &EmissionGate {
        &self.gate
    }

    pub fn trust(&self) -> &TrustRanking {
        &self.trust
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Resolve one candidate at the current time.
    pub fn resolve(&mut self, candidate: &ListingCandidate) -> Resolution {
        self.resolve_at(candidate, Utc::now())
    }

    /// Match, arbitrate, update the registry and consult the emission gate.
    pub fn resolve_at(&mut self, candidate: &ListingCandidate, now: DateTime<Utc>) -> Resolution {
        let outcome = self.matcher.resolve(candidate, &self.registry);
        let via = outcome.match_kind();
        let path = outcome.path;
        let existing = outcome.matched.map(|e| e.representative.clone());
        let key = outcome.key;

        let (decision, representative) = match (existing, via) {
            (Some(existing), Some(via)) => {
                let winner = self.trust.choose_preferred(&existing, candidate).clone();
                let decision = if winner == *candidate && winner != existing {
                    Decision::Replaced { via, previous: existing.source }
                } else {
                    Decision::Retained { via }
                };
                self.registry.update(&key, winner.clone(), now);
                (decision, winner)
            }
            _ => {
                let decision = match path {
                    MatchPath::Unresolvable => Decision::Unlinkable,
                    MatchPath::KeyConflict => Decision::KeyConflict,
                    _ => {
                        self.registry.insert(key.clone(), candidate.clone(), now);
                        Decision::NewIdentity
                    }
                };
                (decision, candidate.clone())
            }
        };

        let forward = self
            .gate
            .admit(candidate.emission_id(), decision.is_emittable());

        debug!(
            source = %candidate.source,
            listing_id = %candidate.source_listing_id,
            key = %key,
            decision = ?decision,
            forward,
            "resolved listing"
        );

        Resolution {
            forward,
            canonical_key: key,
            representative,
            decision,
        }
    }

    /// Resolve one polling cycle.
    ///
    /// Batches are taken in the configured source order; batches of the same source
    /// keep their relative order, candidates keep collection order. Disabled or
    /// unlisted sources are skipped.
    pub fn run_cycle(&mut self, batches: Vec<SourceBatch>) -> CycleOutput {
        self.run_cycle_at(batches, Utc::now())
    }

    pub fn run_cycle_at(&mut self, batches: Vec<SourceBatch>, now: DateTime<Utc>) -> CycleOutput {
        self.cycles += 1;
        let cycle = self.cycles;

        let mut ordered: Vec<(usize, SourceBatch)> = Vec::with_capacity(batches.len());
        for batch in batches {
            if !self.config.is_enabled(batch.source) {
                warn!(cycle, source = %batch.source, "source disabled, skipping batch");
                continue;
            }
            match self.config.order_of(batch.source) {
                Some(pos) => ordered.push((pos, batch)),
                None => {
                    warn!(cycle, source = %batch.source, "source not in source_order, skipping batch");
                }
            }
        }
        // Stable: same-source batches stay in the order they were handed over
        ordered.sort_by_key(|(pos, _)| *pos);

        let mut tally = CycleTally::new(cycle);
        let mut output = CycleOutput::default();

        for (_, batch) in ordered {
            for candidate in &batch.candidates {
                if candidate.source != batch.source {
                    warn!(
                        cycle,
                        batch_source = %batch.source,
                        source = %candidate.source,
                        listing_id = %candidate.source_listing_id,
                        "candidate source differs from its batch"
                    );
                }
                let already = self.gate.has_forwarded(&candidate.emission_id());
                let resolution = self.resolve_at(candidate, now);
                tally.record(candidate.source, &resolution, already);
                if resolution.forward {
                    output.forwarded.push(candidate.clone());
                }
                output.resolutions.push(resolution);
            }
        }

        output.report = tally.finish(self.registry.len());
        let r = &output.report;
        info!(
            cycle,
            processed = r.processed,
            forwarded = r.forwarded,
            new = r.new_identities,
            merged = r.merged,
            suppressed = r.suppressed,
            registry = r.registry_size,
            "cycle complete"
        );
        output
    }

    /// Evict registry entries according to the retention policy.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let removed = self.registry.prune(self.retention.as_ref(), now);
        if removed > 0 {
            info!(removed, remaining = self.registry.len(), "pruned registry");
        }
        removed
    }
}

// ---------------------------------------------------------------------------
// Shared engine
// ---------------------------------------------------------------------------

/// Cloneable handle that serializes all access to one [`DedupeEngine`].
///
/// A whole cycle runs under a single lock acquisition, so arbitration order is
/// never interleaved with another writer.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<DedupeEngine>>,
}

impl SharedEngine {
    pub fn new(engine: DedupeEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn run_cycle(&self, batches: Vec<SourceBatch>) -> CycleOutput {
        self.inner.lock().run_cycle(batches)
    }

    pub fn run_cycle_at(&self, batches: Vec<SourceBatch>, now: DateTime<Utc>) -> CycleOutput {
        self.inner.lock().run_cycle_at(batches, now)
    }

    pub fn resolve(&self, candidate: &ListingCandidate) -> Resolution {
        self.inner.lock().resolve(candidate)
    }

    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        self.inner.lock().prune(now)
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut DedupeEngine) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
