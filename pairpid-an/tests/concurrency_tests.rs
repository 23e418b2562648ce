//! Worker-count independence and tier consistency over random events

mod helpers;

use helpers::*;
use pairpid_an::analysis::InvariantMassAnalysis;
use pairpid_an::calibration::CalibrationSet;
use pairpid_an::dead_area::Dataset;
use pairpid_an::{Engine, FinalResult, MemorySource, PidTier, Progress};
use pairpid_common::config::AnalysisConfig;
use pairpid_common::Track;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn events(seed: u64) -> Vec<Vec<Track>> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_events(&mut rng, 400, 12)
}

fn run_with(threads: usize, shard_size: usize, events: Vec<Vec<Track>>) -> FinalResult {
    let config = AnalysisConfig {
        threads: Some(threads),
        shard_size,
        ..AnalysisConfig::default()
    };
    let table = Dataset::Run14HeAu200.table().unwrap();
    let engine = Engine::from_parts(&config, table, Arc::new(CalibrationSet::fallback())).unwrap();
    let progress = Progress::new();
    let result = engine.run(&mut MemorySource::new(events), &progress).unwrap();
    assert_eq!(progress.snapshot().events, result.stats.events);
    assert_eq!(progress.snapshot().pairs, result.stats.pairs);
    result
}

#[test]
fn test_one_and_many_workers_agree() {
    let single = run_with(1, 64, events(2016));
    assert_eq!(single.stats.events, 400);
    assert!(single.stats.pairs > 0);

    for (threads, shard_size) in [(2, 1), (4, 7), (8, 64)] {
        let parallel = run_with(threads, shard_size, events(2016));
        assert_eq!(parallel.stats, single.stats, "{threads} threads");
        assert_eq!(parallel.aggregates, single.aggregates, "{threads} threads");
    }
}

#[test]
fn test_stronger_tiers_never_exceed_weaker() {
    let result = run_with(3, 16, events(14));
    let analysis = InvariantMassAnalysis::new();
    let entries = |tier: PidTier| {
        result
            .aggregate(analysis.quantity(tier))
            .map(|a| a.entries())
            .unwrap_or(0)
    };

    // Every classified pair lands in the inclusive tier
    assert_eq!(entries(PidTier::NoPid), result.stats.classified.total());

    for strong in PidTier::ALL {
        for weak in PidTier::ALL {
            if strong.implies(weak) {
                assert!(
                    entries(strong) <= entries(weak),
                    "{strong} has {} entries but {weak} only {}",
                    entries(strong),
                    entries(weak)
                );
            }
        }
    }
}

#[test]
fn test_open_table_accepts_more_than_dataset_table() {
    let config = AnalysisConfig {
        threads: Some(2),
        ..AnalysisConfig::default()
    };
    let open = Engine::from_parts(&config, open_table_arc(), Arc::new(CalibrationSet::fallback()))
        .unwrap()
        .run(&mut MemorySource::new(events(7)), &Progress::new())
        .unwrap();
    let cut = run_with(2, 64, events(7));
    assert_eq!(open.stats.tracks, cut.stats.tracks);
    assert!(open.stats.eligible_tracks >= cut.stats.eligible_tracks);
}
