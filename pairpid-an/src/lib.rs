//! pairpid-an library - track classification and pair identification
//!
//! Classifies reconstructed tracks against per-detector dead areas,
//! residual windows and species bands, combines opposite charges into
//! pairs, and accumulates the results over a fixed worker pool.

pub mod accumulator;
pub mod analysis;
pub mod calibration;
pub mod dead_area;
pub mod engine;
pub mod identification;
pub mod kinematics;
pub mod matching;
pub mod pair_classifier;
pub mod sink;
pub mod source;
pub mod stats;
pub mod track_classifier;

pub use accumulator::{AccumulatorArena, Aggregate, FinalResult, HistogramBook, WorkerCells};
pub use analysis::Analysis;
pub use calibration::CalibrationSet;
pub use dead_area::{Dataset, DeadAreaTable};
pub use engine::Engine;
pub use identification::SpeciesIdentifier;
pub use matching::MatchEvaluator;
pub use pair_classifier::{PairClassifier, PairOutcome, PairRecord, PidTier};
pub use source::{JsonLinesSource, MemorySource, RecordSource};
pub use stats::{ClassificationStats, Progress};
pub use track_classifier::{ClassifiedTrack, TrackClassifier};
