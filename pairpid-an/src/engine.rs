//! Sharded event loop
//!
//! The engine reads batches of `threads × shard_size` events on the calling
//! thread, cuts each batch into one shard per worker and runs the shards on
//! a fixed rayon pool. Worker `i` always fills arena cell `i`. The arena is
//! merged once, after the last batch has joined.

use crate::accumulator::{AccumulatorArena, FinalResult, HistogramBook, WorkerCells};
use crate::analysis::{build_analyses, Analysis};
use crate::calibration::CalibrationSet;
use crate::dead_area::{Dataset, DeadAreaTable};
use crate::identification::SpeciesIdentifier;
use crate::matching::MatchEvaluator;
use crate::pair_classifier::{PairClassifier, PairOutcome, VetoReason};
use crate::source::RecordSource;
use crate::stats::{ClassificationStats, Progress};
use crate::track_classifier::{ClassifiedTrack, TrackClassifier, TrackRejection};
use pairpid_common::config::AnalysisConfig;
use pairpid_common::{Charge, Error, Result, Track};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks of one event that could be read, plus a count of those that could not
#[derive(Debug, Default)]
struct Event {
    tracks: Vec<Track>,
    unreadable: u64,
}

pub struct Engine {
    threads: usize,
    shard_size: usize,
    tracks: TrackClassifier,
    pairs: PairClassifier,
    analyses: Vec<Box<dyn Analysis>>,
    book: HistogramBook,
    pool: ThreadPool,
}

impl Engine {
    /// Validate the configuration, load every table, and build the pool
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let dataset = Dataset::resolve(&config.dataset, config.dead_area.table.as_deref())?;
        let table = dataset.table()?;
        let calibration = Arc::new(CalibrationSet::load(&config.calibration)?);
        Self::from_parts(config, table, calibration)
    }

    /// Build around an already loaded dead-area table and calibration
    pub fn from_parts(
        config: &AnalysisConfig,
        table: Arc<DeadAreaTable>,
        calibration: Arc<CalibrationSet>,
    ) -> Result<Self> {
        let threads = config.effective_threads();
        let matcher = MatchEvaluator::new(table, calibration, config);
        let identifier = SpeciesIdentifier::from_config(config);
        let tracks = TrackClassifier::new(matcher, identifier, &config.pairing);
        let pairs = PairClassifier::new(&config.pairing);

        let analyses = build_analyses(&config.analyses)?;
        let mut book = HistogramBook::new();
        for analysis in &analyses {
            analysis.book(&mut book)?;
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("pairpid-worker-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("cannot start {threads} worker threads: {e}")))?;

        info!(
            "Engine ready: {} threads, shard size {}, {} analyses, {} quantities",
            threads,
            config.shard_size,
            analyses.len(),
            book.len()
        );

        Ok(Self {
            threads,
            shard_size: config.shard_size,
            tracks,
            pairs,
            analyses,
            book,
            pool,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Process every event of the source and merge the workers' cells
    pub fn run(&self, source: &mut dyn RecordSource, progress: &Progress) -> Result<FinalResult> {
        let mut arena = AccumulatorArena::new(self.book.clone(), self.threads);
        let batch_size = self.threads * self.shard_size;
        let mut batches = 0u64;

        loop {
            let batch = read_batch(source, batch_size)?;
            if batch.is_empty() {
                break;
            }
            batches += 1;
            let shards: Vec<&[Event]> = batch.chunks(self.shard_size).collect();
            debug!("Batch {}: {} events in {} shards", batches, batch.len(), shards.len());

            let results: Vec<Result<()>> = self.pool.install(|| {
                arena
                    .workers_mut()
                    .par_iter_mut()
                    .zip(shards.par_iter())
                    .map(|(cells, shard)| self.process_shard(cells, shard, progress))
                    .collect()
            });
            results.into_iter().collect::<Result<()>>()?;
        }

        debug!("All {} batches joined; merging {} workers", batches, arena.len());
        arena.merge_all()
    }

    fn process_shard(&self, cells: &mut WorkerCells, shard: &[Event], progress: &Progress) -> Result<()> {
        let mut stats = ClassificationStats::default();
        for event in shard {
            let pairs_before = stats.pairs;
            self.process_event(cells, event, &mut stats)?;
            progress.add(
                1,
                event.tracks.len() as u64 + event.unreadable,
                stats.pairs - pairs_before,
            );
        }
        cells.stats_mut().merge(&stats);
        Ok(())
    }

    fn process_event(
        &self,
        cells: &mut WorkerCells,
        event: &Event,
        stats: &mut ClassificationStats,
    ) -> Result<()> {
        stats.events += 1;
        stats.tracks += event.tracks.len() as u64 + event.unreadable;
        stats.invalid_tracks += event.unreadable;

        let mut positives: Vec<ClassifiedTrack<'_>> = Vec::new();
        let mut negatives: Vec<ClassifiedTrack<'_>> = Vec::new();
        for track in &event.tracks {
            let classified = match self.tracks.classify(track) {
                Ok(classified) => classified,
                Err(TrackRejection::Malformed) => {
                    stats.invalid_tracks += 1;
                    continue;
                }
                Err(TrackRejection::DeadDriftChamber) => {
                    stats.dc_excluded += 1;
                    continue;
                }
            };
            for analysis in &self.analyses {
                analysis.fill_track(cells, &classified)?;
            }
            if !classified.is_eligible() {
                stats.no_signal += 1;
                continue;
            }
            stats.eligible_tracks += 1;
            match classified.charge() {
                Charge::Positive => positives.push(classified),
                Charge::Negative => negatives.push(classified),
            }
        }

        for positive in &positives {
            for negative in &negatives {
                stats.pairs += 1;
                match self.pairs.classify(positive, negative) {
                    Err(_) => stats.invalid_pairs += 1,
                    Ok(PairOutcome::Vetoed(VetoReason::Ghost(_))) => stats.ghost_vetoed += 1,
                    Ok(PairOutcome::Vetoed(VetoReason::OneArm)) => stats.one_arm_vetoed += 1,
                    Ok(PairOutcome::Classified(record)) => {
                        stats.classified.record(record.tier);
                        for analysis in &self.analyses {
                            analysis.fill_pair(cells, &record)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn read_batch(source: &mut dyn RecordSource, max_events: usize) -> Result<Vec<Event>> {
    let mut batch = Vec::with_capacity(max_events);
    while batch.len() < max_events && source.has_next() {
        source.advance()?;
        let mut event = Event::default();
        for index in 0..source.track_count() {
            match source.track(index) {
                Ok(track) => event.tracks.push(track),
                Err(e) => {
                    debug!("Skipping unreadable track: {}", e);
                    event.unreadable += 1;
                }
            }
        }
        batch.push(event);
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_empty_source() {
        let config = AnalysisConfig {
            threads: Some(2),
            ..AnalysisConfig::default()
        };
        let engine = Engine::from_config(&config).unwrap();
        let mut source = MemorySource::new(Vec::new());
        let result = engine.run(&mut source, &Progress::new()).unwrap();
        assert_eq!(result.stats, ClassificationStats::default());
        assert!(result.aggregate("minv_nopid").is_some());
    }

    #[test]
    fn test_unknown_analysis_fails_before_run() {
        let config = AnalysisConfig {
            analyses: vec!["invariant_mass".to_string(), "mixing".to_string()],
            ..AnalysisConfig::default()
        };
        assert!(matches!(Engine::from_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_dataset_fails() {
        let config = AnalysisConfig {
            dataset: "run99".to_string(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            Engine::from_config(&config),
            Err(Error::UnknownDataset(_))
        ));
    }

    #[test]
    fn test_events_split_into_shards() {
        let config = AnalysisConfig {
            threads: Some(3),
            shard_size: 2,
            ..AnalysisConfig::default()
        };
        let engine = Engine::from_config(&config).unwrap();
        let mut source = MemorySource::new(vec![Vec::new(); 17]);
        let progress = Progress::new();
        let result = engine.run(&mut source, &progress).unwrap();
        assert_eq!(result.stats.events, 17);
        assert_eq!(progress.snapshot().events, 17);
    }
}
