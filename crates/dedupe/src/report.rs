use crate::model::{CycleReport, Decision, Resolution, Source};

/// Accumulates per-cycle counters while candidates are resolved.
#[derive(Debug)]
pub struct CycleTally {
    report: CycleReport,
}

impl CycleTally {
    pub fn new(cycle: u64) -> Self {
        Self {
            report: CycleReport {
                cycle,
                ..CycleReport::default()
            },
        }
    }

    /// `already_forwarded`: the gate had forwarded this raw record before the call.
    pub fn record(&mut self, source: Source, resolution: &Resolution, already_forwarded: bool) {
        let r = &mut self.report;
        r.processed += 1;

        match resolution.decision {
            Decision::NewIdentity => r.new_identities += 1,
            Decision::Unlinkable => r.unlinkable += 1,
            Decision::KeyConflict => r.key_conflicts += 1,
            // A repeat of a forwarded record is not a suppression
            Decision::Retained { .. } if !already_forwarded => r.suppressed += 1,
            Decision::Retained { .. } => {}
            Decision::Replaced { .. } => r.merged += 1,
        }

        if already_forwarded {
            r.already_forwarded += 1;
        }

        let counts = r.per_source.entry(source).or_default();
        counts.processed += 1;
        if resolution.forward {
            r.forwarded += 1;
            counts.forwarded += 1;
        }
    }

    pub fn finish(mut self, registry_size: usize) -> CycleReport {
        self.report.registry_size = registry_size;
        self.report
    }
}
