//! Worker-indexed accumulation
//!
//! Every worker owns one `WorkerCells` for the whole run and fills it
//! through an exclusive borrow; no cell is ever touched by two workers.
//! After the pool joins, `AccumulatorArena::merge_all` sums the cells in
//! worker-index order. Summation is associative and commutative, so the
//! result does not depend on how events were spread over workers.

mod histogram;

pub use histogram::{Aggregate, Binning, Histogram1D, Histogram2D};

use crate::stats::ClassificationStats;
use pairpid_common::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Shape of a booked quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistogramSpec {
    OneD { x: Binning },
    TwoD { x: Binning, y: Binning },
}

impl HistogramSpec {
    pub fn one_d(bins: usize, low: f64, high: f64) -> Result<Self> {
        Ok(HistogramSpec::OneD {
            x: Binning::new(bins, low, high)?,
        })
    }

    pub fn two_d(x: (usize, f64, f64), y: (usize, f64, f64)) -> Result<Self> {
        Ok(HistogramSpec::TwoD {
            x: Binning::new(x.0, x.1, x.2)?,
            y: Binning::new(y.0, y.1, y.2)?,
        })
    }

    pub fn build(&self) -> Aggregate {
        match self {
            HistogramSpec::OneD { x } => Aggregate::Hist1D(Histogram1D::new(*x)),
            HistogramSpec::TwoD { x, y } => Aggregate::Hist2D(Histogram2D::new(*x, *y)),
        }
    }
}

/// Every quantity analyses may fill, registered before the run
#[derive(Debug, Clone, Default)]
pub struct HistogramBook {
    specs: BTreeMap<String, HistogramSpec>,
}

impl HistogramBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a quantity; booking the same name twice must agree on shape
    pub fn book(&mut self, name: impl Into<String>, spec: HistogramSpec) -> Result<()> {
        let name = name.into();
        match self.specs.get(&name) {
            Some(existing) if *existing != spec => Err(Error::BinningMismatch(name)),
            Some(_) => Ok(()),
            None => {
                self.specs.insert(name, spec);
                Ok(())
            }
        }
    }

    pub fn spec(&self, name: &str) -> Option<&HistogramSpec> {
        self.specs.get(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}

/// Cells and counters owned by one worker
#[derive(Debug)]
pub struct WorkerCells {
    book: Arc<HistogramBook>,
    cells: BTreeMap<String, Aggregate>,
    stats: ClassificationStats,
}

impl WorkerCells {
    pub fn new(book: Arc<HistogramBook>) -> Self {
        Self {
            book,
            cells: BTreeMap::new(),
            stats: ClassificationStats::default(),
        }
    }

    /// Cell for a booked quantity, created on first access
    pub fn cell(&mut self, name: &str) -> Result<&mut Aggregate> {
        if !self.cells.contains_key(name) {
            let spec = self
                .book
                .spec(name)
                .ok_or_else(|| Error::UnknownQuantity(name.to_string()))?;
            self.cells.insert(name.to_string(), spec.build());
        }
        self.cells
            .get_mut(name)
            .ok_or_else(|| Error::UnknownQuantity(name.to_string()))
    }

    pub fn fill(&mut self, name: &str, coords: &[f64], weight: f64) -> Result<()> {
        self.cell(name)?.fill(coords, weight)
    }

    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut ClassificationStats {
        &mut self.stats
    }
}

/// Merged output of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResult {
    pub aggregates: BTreeMap<String, Aggregate>,
    pub stats: ClassificationStats,
}

impl FinalResult {
    pub fn aggregate(&self, name: &str) -> Option<&Aggregate> {
        self.aggregates.get(name)
    }
}

/// One `WorkerCells` per worker index
#[derive(Debug)]
pub struct AccumulatorArena {
    book: Arc<HistogramBook>,
    workers: Vec<WorkerCells>,
}

impl AccumulatorArena {
    pub fn new(book: HistogramBook, workers: usize) -> Self {
        let book = Arc::new(book);
        let workers = (0..workers.max(1))
            .map(|_| WorkerCells::new(Arc::clone(&book)))
            .collect();
        Self { book, workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn book(&self) -> &HistogramBook {
        &self.book
    }

    /// Exclusive access to every worker's cells, in worker order
    pub fn workers_mut(&mut self) -> &mut [WorkerCells] {
        &mut self.workers
    }

    /// Sum all workers in index order
    ///
    /// Booked quantities nobody filled appear empty, so the set of names in
    /// the result depends only on the book.
    pub fn merge_all(self) -> Result<FinalResult> {
        let mut aggregates: BTreeMap<String, Aggregate> = self
            .book
            .specs
            .iter()
            .map(|(name, spec)| (name.clone(), spec.build()))
            .collect();
        let mut stats = ClassificationStats::default();

        for (index, worker) in self.workers.into_iter().enumerate() {
            debug!("Merging worker {} ({} cells)", index, worker.cells.len());
            stats.merge(&worker.stats);
            for (name, cell) in worker.cells {
                match aggregates.get_mut(&name) {
                    Some(total) => total.merge(&cell, &name)?,
                    None => {
                        aggregates.insert(name, cell);
                    }
                }
            }
        }

        Ok(FinalResult { aggregates, stats })
    }
}
