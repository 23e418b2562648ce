//! Fixed-binning histograms with under/overflow and squared weights

use pairpid_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Uniform binning of one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Binning {
    pub bins: usize,
    pub low: f64,
    pub high: f64,
}

impl Binning {
    pub fn new(bins: usize, low: f64, high: f64) -> Result<Self> {
        if bins == 0 || !(low.is_finite() && high.is_finite() && low < high) {
            return Err(Error::InvalidInput(format!(
                "binning needs at least one bin and low < high (got {bins} in [{low}, {high}))"
            )));
        }
        Ok(Self { bins, low, high })
    }

    /// Slot index including flow bins: 0 is underflow, `bins + 1` overflow
    ///
    /// NaN has no slot.
    pub fn slot(&self, x: f64) -> Option<usize> {
        if x.is_nan() {
            None
        } else if x < self.low {
            Some(0)
        } else if x >= self.high {
            Some(self.bins + 1)
        } else {
            let width = (self.high - self.low) / self.bins as f64;
            let i = ((x - self.low) / width) as usize;
            Some(i.min(self.bins - 1) + 1)
        }
    }

    fn slots(&self) -> usize {
        self.bins + 2
    }

    /// Lower edge of in-range bin `i`
    pub fn edge(&self, i: usize) -> f64 {
        self.low + (self.high - self.low) * i as f64 / self.bins as f64
    }
}

/// Weight sums over a flat slot array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sums {
    sumw: Vec<f64>,
    sumw2: Vec<f64>,
    entries: u64,
    /// Fills with a NaN coordinate
    dropped: u64,
}

impl Sums {
    fn new(slots: usize) -> Self {
        Self {
            sumw: vec![0.0; slots],
            sumw2: vec![0.0; slots],
            entries: 0,
            dropped: 0,
        }
    }

    fn fill(&mut self, slot: Option<usize>, weight: f64) {
        match slot {
            Some(i) => {
                self.sumw[i] += weight;
                self.sumw2[i] += weight * weight;
                self.entries += 1;
            }
            None => self.dropped += 1,
        }
    }

    fn merge(&mut self, other: &Sums) {
        for (a, b) in self.sumw.iter_mut().zip(&other.sumw) {
            *a += b;
        }
        for (a, b) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *a += b;
        }
        self.entries += other.entries;
        self.dropped += other.dropped;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    x: Binning,
    #[serde(flatten)]
    sums: Sums,
}

impl Histogram1D {
    pub fn new(x: Binning) -> Self {
        Self {
            sums: Sums::new(x.slots()),
            x,
        }
    }

    pub fn fill(&mut self, x: f64, weight: f64) {
        self.sums.fill(self.x.slot(x), weight);
    }

    pub fn binning(&self) -> Binning {
        self.x
    }

    /// Sum of weights in a slot (0 underflow, 1..=bins, bins+1 overflow)
    pub fn sumw(&self, slot: usize) -> f64 {
        self.sums.sumw.get(slot).copied().unwrap_or(0.0)
    }

    pub fn sumw2(&self, slot: usize) -> f64 {
        self.sums.sumw2.get(slot).copied().unwrap_or(0.0)
    }

    pub fn underflow(&self) -> f64 {
        self.sumw(0)
    }

    pub fn overflow(&self) -> f64 {
        self.sumw(self.x.bins + 1)
    }

    /// Sum of weights of in-range bins
    pub fn integral(&self) -> f64 {
        self.sums.sumw[1..=self.x.bins].iter().sum()
    }

    pub fn entries(&self) -> u64 {
        self.sums.entries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    x: Binning,
    y: Binning,
    #[serde(flatten)]
    sums: Sums,
}

impl Histogram2D {
    pub fn new(x: Binning, y: Binning) -> Self {
        Self {
            sums: Sums::new(x.slots() * y.slots()),
            x,
            y,
        }
    }

    fn index(&self, ix: usize, iy: usize) -> usize {
        ix * self.y.slots() + iy
    }

    pub fn fill(&mut self, x: f64, y: f64, weight: f64) {
        let slot = match (self.x.slot(x), self.y.slot(y)) {
            (Some(ix), Some(iy)) => Some(self.index(ix, iy)),
            _ => None,
        };
        self.sums.fill(slot, weight);
    }

    pub fn binning(&self) -> (Binning, Binning) {
        (self.x, self.y)
    }

    /// Sum of weights at slot (ix, iy), flow slots included
    pub fn sumw(&self, ix: usize, iy: usize) -> f64 {
        if ix >= self.x.slots() || iy >= self.y.slots() {
            return 0.0;
        }
        self.sums.sumw[self.index(ix, iy)]
    }

    pub fn sumw2(&self, ix: usize, iy: usize) -> f64 {
        if ix >= self.x.slots() || iy >= self.y.slots() {
            return 0.0;
        }
        self.sums.sumw2[self.index(ix, iy)]
    }

    /// Sum of weights of in-range bins
    pub fn integral(&self) -> f64 {
        (1..=self.x.bins)
            .flat_map(|ix| (1..=self.y.bins).map(move |iy| (ix, iy)))
            .map(|(ix, iy)| self.sumw(ix, iy))
            .sum()
    }

    /// Slot of a coordinate pair, for lookups in tests and reports
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        Some((self.x.slot(x)?, self.y.slot(y)?))
    }

    pub fn entries(&self) -> u64 {
        self.sums.entries
    }
}

/// One accumulated quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Aggregate {
    #[serde(rename = "hist1d")]
    Hist1D(Histogram1D),
    #[serde(rename = "hist2d")]
    Hist2D(Histogram2D),
}

impl Aggregate {
    pub fn fill(&mut self, coords: &[f64], weight: f64) -> Result<()> {
        match (self, coords) {
            (Aggregate::Hist1D(h), [x]) => h.fill(*x, weight),
            (Aggregate::Hist2D(h), [x, y]) => h.fill(*x, *y, weight),
            (agg, _) => {
                return Err(Error::InvalidInput(format!(
                    "{}-dimensional fill into a {}-dimensional histogram",
                    coords.len(),
                    agg.dimension()
                )))
            }
        }
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        match self {
            Aggregate::Hist1D(_) => 1,
            Aggregate::Hist2D(_) => 2,
        }
    }

    pub fn entries(&self) -> u64 {
        match self {
            Aggregate::Hist1D(h) => h.entries(),
            Aggregate::Hist2D(h) => h.entries(),
        }
    }

    pub fn integral(&self) -> f64 {
        match self {
            Aggregate::Hist1D(h) => h.integral(),
            Aggregate::Hist2D(h) => h.integral(),
        }
    }

    pub fn as_2d(&self) -> Option<&Histogram2D> {
        match self {
            Aggregate::Hist2D(h) => Some(h),
            Aggregate::Hist1D(_) => None,
        }
    }

    pub fn as_1d(&self) -> Option<&Histogram1D> {
        match self {
            Aggregate::Hist1D(h) => Some(h),
            Aggregate::Hist2D(_) => None,
        }
    }

    /// Add `other` into `self`; both must share the same binning
    pub fn merge(&mut self, other: &Aggregate, name: &str) -> Result<()> {
        match (self, other) {
            (Aggregate::Hist1D(a), Aggregate::Hist1D(b)) if a.x == b.x => a.sums.merge(&b.sums),
            (Aggregate::Hist2D(a), Aggregate::Hist2D(b)) if a.x == b.x && a.y == b.y => {
                a.sums.merge(&b.sums)
            }
            _ => return Err(Error::BinningMismatch(name.to_string())),
        }
        Ok(())
    }
}
