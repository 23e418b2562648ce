//! Per-detector species identification
//!
//! Each identifying detector carries a band model: for every competing
//! species, the expected mean and spread of a discriminant (m² or E/p) as a
//! function of momentum. A track is tagged as species `s` when its
//! discriminant lies within `extraction_sigma` of band `s` and outside
//! `veto_sigma` of every other band.

mod bands;

pub use bands::C_CM_PER_NS;

use bands::BandModel;
use pairpid_common::config::{AnalysisConfig, DiscriminantKind, IdentificationConfig};
use pairpid_common::{Charge, Detector, Identification, Species, Track};
use std::collections::BTreeMap;
use tracing::debug;

struct DetectorModel {
    discriminant: DiscriminantKind,
    extraction_sigma: f64,
    veto_sigma: f64,
    species: Vec<Species>,
    bands: BandModel,
}

impl DetectorModel {
    fn from_config(config: &IdentificationConfig) -> Self {
        Self {
            discriminant: config.model.discriminant(),
            extraction_sigma: config.extraction_sigma,
            veto_sigma: config.veto_sigma,
            species: config.species.clone(),
            bands: BandModel::from_config(&config.model),
        }
    }

    fn weight(&self, species: Species, momentum: f64, charge: Charge, value: f64) -> f64 {
        if !value.is_finite() || !self.species.contains(&species) {
            return 0.0;
        }
        let Some((mean, sigma)) = self.bands.location(species, momentum, charge) else {
            return 0.0;
        };
        let z = (value - mean) / sigma;
        if z.abs() >= self.extraction_sigma {
            return 0.0;
        }

        // A competitor whose band cannot be evaluated here vetoes as well
        let vetoed = self
            .species
            .iter()
            .filter(|other| **other != species)
            .any(|other| match self.bands.location(*other, momentum, charge) {
                Some((m, s)) => ((value - m) / s).abs() < self.veto_sigma,
                None => true,
            });
        if vetoed {
            return 0.0;
        }

        (-0.5 * z * z).exp().clamp(0.0, 1.0)
    }
}

/// Species bands of every identifying detector
///
/// Read-only after construction; shared across workers by reference.
pub struct SpeciesIdentifier {
    models: BTreeMap<Detector, DetectorModel>,
}

impl SpeciesIdentifier {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let models = config
            .identification
            .iter()
            .map(|(detector, id)| {
                debug!(
                    "{detector}: {} species, extraction {}σ, veto {}σ",
                    id.species.len(),
                    id.extraction_sigma,
                    id.veto_sigma
                );
                (*detector, DetectorModel::from_config(id))
            })
            .collect();
        Self { models }
    }

    /// Whether the detector has a band model
    pub fn is_initialized(&self, detector: Detector) -> bool {
        self.models.contains_key(&detector)
    }

    /// Detectors with a band model, in detector order
    pub fn detectors(&self) -> impl Iterator<Item = Detector> + '_ {
        self.models.keys().copied()
    }

    /// Discriminant of a track on a detector
    ///
    /// `None` when the detector has no model or a required input is missing.
    /// A present but unphysical result (negative time, zero path) comes back
    /// as NaN so callers can tell it apart from a missing detector.
    pub fn discriminant(&self, track: &Track, detector: Detector) -> Option<f64> {
        let model = self.models.get(&detector)?;
        let response = track.response(detector)?;
        let p = track.momentum();
        match model.discriminant {
            DiscriminantKind::MassSquared => {
                let t = response.tof?;
                let l = response.path_length?;
                if !(t > 0.0 && l > 0.0) {
                    return Some(f64::NAN);
                }
                let beta_inv = C_CM_PER_NS * t / l;
                Some(p * p * (beta_inv * beta_inv - 1.0))
            }
            DiscriminantKind::EnergyOverMomentum => {
                let e = response.energy?;
                Some(e / p)
            }
        }
    }

    /// Probability-like weight in [0,1] that `discriminant` belongs to `species`
    pub fn identification_weight(
        &self,
        detector: Detector,
        species: Species,
        momentum: f64,
        charge: Charge,
        discriminant: f64,
    ) -> f64 {
        self.models
            .get(&detector)
            .map(|m| m.weight(species, momentum, charge, discriminant))
            .unwrap_or(0.0)
    }

    /// Label for a fixed species hypothesis
    pub fn identify_as(
        &self,
        detector: Detector,
        species: Species,
        momentum: f64,
        charge: Charge,
        discriminant: f64,
    ) -> Identification {
        if !self.is_initialized(detector) {
            return Identification::no_signal();
        }
        if !discriminant.is_finite() {
            return Identification::junk();
        }
        let weight = self.identification_weight(detector, species, momentum, charge, discriminant);
        Identification::new(species, weight)
    }

    /// Best species on a detector, or `NoSignal`/`Junk`
    pub fn identify(
        &self,
        detector: Detector,
        momentum: f64,
        charge: Charge,
        discriminant: f64,
    ) -> Identification {
        let Some(model) = self.models.get(&detector) else {
            return Identification::no_signal();
        };
        if !discriminant.is_finite() {
            return Identification::junk();
        }
        model
            .species
            .iter()
            .map(|s| (*s, model.weight(*s, momentum, charge, discriminant)))
            .filter(|(_, w)| *w > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(s, w)| Identification::new(s, w))
            .unwrap_or_else(Identification::no_signal)
    }
}
