//! Analysis visitors
//!
//! The engine owns the event loop; an analysis only says what to book and
//! what to fill for each classified track and pair. Analyses are shared by
//! every worker, so they hold nothing but precomputed names.

use crate::accumulator::{HistogramBook, HistogramSpec, WorkerCells};
use crate::pair_classifier::{PairRecord, PairTopology, PidTier};
use crate::track_classifier::ClassifiedTrack;
use pairpid_common::{Detector, Error, Result};

pub trait Analysis: Sync + Send {
    fn name(&self) -> &'static str;

    /// Register every quantity this analysis fills
    fn book(&self, book: &mut HistogramBook) -> Result<()>;

    fn fill_track(&self, cells: &mut WorkerCells, track: &ClassifiedTrack<'_>) -> Result<()>;

    fn fill_pair(&self, cells: &mut WorkerCells, pair: &PairRecord<'_>) -> Result<()>;
}

/// Instantiate analyses by configured name
pub fn build_analyses(names: &[String]) -> Result<Vec<Box<dyn Analysis>>> {
    names
        .iter()
        .map(|name| -> Result<Box<dyn Analysis>> {
            match name.as_str() {
                InvariantMassAnalysis::NAME => Ok(Box::new(InvariantMassAnalysis::new())),
                SingleTrackAnalysis::NAME => Ok(Box::new(SingleTrackAnalysis::new())),
                other => Err(Error::Config(format!(
                    "unknown analysis '{other}' (expected {} or {})",
                    InvariantMassAnalysis::NAME,
                    SingleTrackAnalysis::NAME
                ))),
            }
        })
        .collect()
}

struct TierQuantities {
    all: String,
    sailor: String,
    cowboy: String,
}

/// Pair invariant mass against pair pT, one family per qualifying tier
pub struct InvariantMassAnalysis {
    tiers: Vec<TierQuantities>,
}

impl InvariantMassAnalysis {
    pub const NAME: &'static str = "invariant_mass";

    pub fn new() -> Self {
        let tiers = PidTier::ALL
            .iter()
            .map(|tier| TierQuantities {
                all: format!("minv_{tier}"),
                sailor: format!("minv_{tier}_{}", PairTopology::Sailor.as_str()),
                cowboy: format!("minv_{tier}_{}", PairTopology::Cowboy.as_str()),
            })
            .collect();
        Self { tiers }
    }

    /// Name of the tier's inclusive histogram
    pub fn quantity(&self, tier: PidTier) -> &str {
        &self.tiers[tier.index()].all
    }

    /// Name of the tier's sailor or cowboy histogram
    pub fn topology_quantity(&self, tier: PidTier, topology: PairTopology) -> &str {
        let q = &self.tiers[tier.index()];
        match topology {
            PairTopology::Sailor => &q.sailor,
            PairTopology::Cowboy => &q.cowboy,
        }
    }

    /// (pair pT, mass): 0–5 GeV/c in 100 MeV bins, 0–3 GeV/c² in 10 MeV bins
    fn spec() -> Result<HistogramSpec> {
        HistogramSpec::two_d((50, 0.0, 5.0), (300, 0.0, 3.0))
    }
}

impl Default for InvariantMassAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl Analysis for InvariantMassAnalysis {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn book(&self, book: &mut HistogramBook) -> Result<()> {
        let spec = Self::spec()?;
        for q in &self.tiers {
            book.book(q.all.as_str(), spec)?;
            book.book(q.sailor.as_str(), spec)?;
            book.book(q.cowboy.as_str(), spec)?;
        }
        Ok(())
    }

    fn fill_track(&self, _cells: &mut WorkerCells, _track: &ClassifiedTrack<'_>) -> Result<()> {
        Ok(())
    }

    fn fill_pair(&self, cells: &mut WorkerCells, pair: &PairRecord<'_>) -> Result<()> {
        let coords = [pair.pt, pair.mass];
        for tier in &pair.qualifying_tiers {
            cells.fill(self.quantity(*tier), &coords, 1.0)?;
            cells.fill(self.topology_quantity(*tier, pair.topology), &coords, 1.0)?;
        }
        Ok(())
    }
}

struct DetectorQuantities {
    sdphi: String,
    sdz: String,
    disc: String,
    species: String,
}

/// Per-detector residual, discriminant and label distributions
pub struct SingleTrackAnalysis {
    detectors: Vec<DetectorQuantities>,
}

impl SingleTrackAnalysis {
    pub const NAME: &'static str = "single_track";

    pub fn new() -> Self {
        let detectors = Detector::MATCHING
            .iter()
            .map(|d| DetectorQuantities {
                sdphi: format!("sdphi_{d}"),
                sdz: format!("sdz_{d}"),
                disc: format!("disc_{d}"),
                species: format!("species_{d}"),
            })
            .collect();
        Self { detectors }
    }
}

impl Default for SingleTrackAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl Analysis for SingleTrackAnalysis {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn book(&self, book: &mut HistogramBook) -> Result<()> {
        let residual = HistogramSpec::one_d(200, -10.0, 10.0)?;
        // signed momentum against m² or E/p
        let disc = HistogramSpec::two_d((100, -5.0, 5.0), (500, -0.5, 2.0))?;
        let species = HistogramSpec::one_d(6, 0.0, 6.0)?;
        for q in &self.detectors {
            book.book(q.sdphi.as_str(), residual)?;
            book.book(q.sdz.as_str(), residual)?;
            book.book(q.disc.as_str(), disc)?;
            book.book(q.species.as_str(), species)?;
        }
        Ok(())
    }

    fn fill_track(&self, cells: &mut WorkerCells, track: &ClassifiedTrack<'_>) -> Result<()> {
        let signed_p = track.track().momentum() * track.charge().sign();
        for (verdict, q) in track.verdicts().iter().zip(&self.detectors) {
            if !(verdict.hit.hit && verdict.hit.live) {
                continue;
            }
            cells.fill(&q.sdphi, &[verdict.hit.sdphi], 1.0)?;
            cells.fill(&q.sdz, &[verdict.hit.sdz], 1.0)?;
            if !verdict.hit.valid {
                continue;
            }
            if let Some(value) = verdict.discriminant.filter(|v| v.is_finite()) {
                cells.fill(&q.disc, &[signed_p, value], 1.0)?;
            }
            cells.fill(
                &q.species,
                &[verdict.identification.label().index() as f64 + 0.5],
                1.0,
            )?;
        }
        Ok(())
    }

    fn fill_pair(&self, _cells: &mut WorkerCells, _pair: &PairRecord<'_>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_by_name() {
        let analyses =
            build_analyses(&["single_track".to_string(), "invariant_mass".to_string()]).unwrap();
        let names: Vec<_> = analyses.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["single_track", "invariant_mass"]);
    }

    #[test]
    fn test_unknown_analysis_is_config_error() {
        let err = build_analyses(&["event_mixing".to_string()]).err().unwrap();
        assert!(matches!(err, Error::Config(msg) if msg.contains("event_mixing")));
    }

    #[test]
    fn test_booked_names() {
        let mut book = HistogramBook::new();
        InvariantMassAnalysis::new().book(&mut book).unwrap();
        SingleTrackAnalysis::new().book(&mut book).unwrap();
        assert!(book.spec("minv_tofdoublepid").is_some());
        assert!(book.spec("minv_nopid_sailor").is_some());
        assert!(book.spec("minv_emcdoublepid_cowboy").is_some());
        assert!(book.spec("sdphi_pc3").is_some());
        assert!(book.spec("disc_tofw").is_some());
        assert!(book.spec("species_emc").is_some());
        assert_eq!(book.len(), 5 * 3 + 5 * 4);
    }
}
