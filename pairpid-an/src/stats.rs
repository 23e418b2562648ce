//! Classification counters
//!
//! Every track and pair that does not reach an accumulator lands in one of
//! these buckets. Each worker owns its own `ClassificationStats`; they are
//! summed after the pool joins. `Progress` is the only state shared while
//! workers run.

use crate::pair_classifier::PidTier;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Classified pairs per primary tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub nopid: u64,
    pub singlepid: u64,
    pub doublepid: u64,
    pub tofdoublepid: u64,
    pub emcdoublepid: u64,
}

impl TierCounts {
    fn slot(&mut self, tier: PidTier) -> &mut u64 {
        match tier {
            PidTier::NoPid => &mut self.nopid,
            PidTier::SinglePid => &mut self.singlepid,
            PidTier::DoublePid => &mut self.doublepid,
            PidTier::TofDoublePid => &mut self.tofdoublepid,
            PidTier::EmcDoublePid => &mut self.emcdoublepid,
        }
    }

    pub fn get(&self, tier: PidTier) -> u64 {
        match tier {
            PidTier::NoPid => self.nopid,
            PidTier::SinglePid => self.singlepid,
            PidTier::DoublePid => self.doublepid,
            PidTier::TofDoublePid => self.tofdoublepid,
            PidTier::EmcDoublePid => self.emcdoublepid,
        }
    }

    pub fn record(&mut self, tier: PidTier) {
        *self.slot(tier) += 1;
    }

    pub fn total(&self) -> u64 {
        PidTier::ALL.iter().map(|t| self.get(*t)).sum()
    }

    fn merge(&mut self, other: &TierCounts) {
        for tier in PidTier::ALL {
            *self.slot(tier) += other.get(tier);
        }
    }
}

/// Per-worker counters of everything the classifiers decided
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStats {
    pub events: u64,
    pub tracks: u64,
    /// Unreadable records and tracks with unusable momentum
    pub invalid_tracks: u64,
    /// Drift-chamber point in a dead area
    pub dc_excluded: u64,
    /// No detector produced a valid hit
    pub no_signal: u64,
    /// Tracks that entered pairing
    pub eligible_tracks: u64,
    pub pairs: u64,
    pub invalid_pairs: u64,
    pub ghost_vetoed: u64,
    pub one_arm_vetoed: u64,
    pub classified: TierCounts,
}

impl ClassificationStats {
    /// Add another worker's counters
    pub fn merge(&mut self, other: &ClassificationStats) {
        self.events += other.events;
        self.tracks += other.tracks;
        self.invalid_tracks += other.invalid_tracks;
        self.dc_excluded += other.dc_excluded;
        self.no_signal += other.no_signal;
        self.eligible_tracks += other.eligible_tracks;
        self.pairs += other.pairs;
        self.invalid_pairs += other.invalid_pairs;
        self.ghost_vetoed += other.ghost_vetoed;
        self.one_arm_vetoed += other.one_arm_vetoed;
        self.classified.merge(&other.classified);
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} events, {} tracks ({} invalid, {} DC excluded, {} no signal), \
             {} pairs ({} invalid, {} ghost, {} one-arm, {} classified)",
            self.events,
            self.tracks,
            self.invalid_tracks,
            self.dc_excluded,
            self.no_signal,
            self.pairs,
            self.invalid_pairs,
            self.ghost_vetoed,
            self.one_arm_vetoed,
            self.classified.total()
        )
    }
}

/// Live counters polled by the progress reporter
#[derive(Debug, Default)]
pub struct Progress {
    events: AtomicU64,
    tracks: AtomicU64,
    pairs: AtomicU64,
}

/// Point-in-time copy of `Progress`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub events: u64,
    pub tracks: u64,
    pub pairs: u64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, events: u64, tracks: u64, pairs: u64) {
        self.events.fetch_add(events, Ordering::Relaxed);
        self.tracks.fetch_add(tracks, Ordering::Relaxed);
        self.pairs.fetch_add(pairs, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            events: self.events.load(Ordering::Relaxed),
            tracks: self.tracks.load(Ordering::Relaxed),
            pairs: self.pairs.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_merge_sums_every_counter() {
        let mut a = ClassificationStats {
            events: 2,
            tracks: 10,
            ghost_vetoed: 1,
            ..Default::default()
        };
        a.classified.record(PidTier::TofDoublePid);
        let mut b = ClassificationStats {
            events: 3,
            tracks: 4,
            invalid_pairs: 2,
            ..Default::default()
        };
        b.classified.record(PidTier::TofDoublePid);
        b.classified.record(PidTier::NoPid);

        a.merge(&b);
        assert_eq!(a.events, 5);
        assert_eq!(a.tracks, 14);
        assert_eq!(a.ghost_vetoed, 1);
        assert_eq!(a.invalid_pairs, 2);
        assert_eq!(a.classified.tofdoublepid, 2);
        assert_eq!(a.classified.nopid, 1);
        assert_eq!(a.classified.total(), 3);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let mut x = ClassificationStats {
            events: 1,
            no_signal: 7,
            ..Default::default()
        };
        x.classified.record(PidTier::SinglePid);
        let y = ClassificationStats {
            events: 4,
            dc_excluded: 3,
            ..Default::default()
        };

        let mut xy = x.clone();
        xy.merge(&y);
        let mut yx = y.clone();
        yx.merge(&x);
        assert_eq!(xy, yx);
    }

    #[test]
    fn test_display_string() {
        let stats = ClassificationStats {
            events: 1,
            tracks: 2,
            ..Default::default()
        };
        assert!(stats.display_string().starts_with("1 events, 2 tracks"));
    }

    #[test]
    fn test_progress_from_many_threads() {
        let progress = Arc::new(Progress::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&progress);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        p.add(1, 3, 2);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = progress.snapshot();
        assert_eq!(snap.events, 400);
        assert_eq!(snap.tracks, 1200);
        assert_eq!(snap.pairs, 800);
    }
}
