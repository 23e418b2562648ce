//! Per-track classification
//!
//! Runs every matching detector through the match evaluator, then asks the
//! species identifier how well the track fits the species its charge is
//! hypothesised to be.

use crate::identification::SpeciesIdentifier;
use crate::matching::{DetectorHitRecord, MatchEvaluator};
use pairpid_common::config::PairingConfig;
use pairpid_common::{Charge, Detector, DetectorKind, Identification, Species, Track};
use serde::Serialize;
use thiserror::Error;

/// Why a track was dropped before any detector was looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrackRejection {
    /// Non-positive or non-finite momentum
    #[error("malformed track")]
    Malformed,
    /// Drift-chamber point lies in a dead area
    #[error("drift chamber excluded")]
    DeadDriftChamber,
}

/// What one detector concluded about one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorVerdict {
    pub hit: DetectorHitRecord,
    /// Discriminant value, when the detector identifies and the inputs exist
    pub discriminant: Option<f64>,
    pub identification: Identification,
}

impl DetectorVerdict {
    pub fn detector(&self) -> Detector {
        self.hit.detector
    }
}

/// A track together with every detector's verdict
#[derive(Debug, Clone)]
pub struct ClassifiedTrack<'t> {
    track: &'t Track,
    hypothesis: Species,
    verdicts: [DetectorVerdict; Detector::MATCHING.len()],
}

impl<'t> ClassifiedTrack<'t> {
    pub fn track(&self) -> &'t Track {
        self.track
    }

    pub fn charge(&self) -> Charge {
        self.track.charge
    }

    /// Species this track is assumed to be when paired
    pub fn hypothesis(&self) -> Species {
        self.hypothesis
    }

    pub fn verdicts(&self) -> &[DetectorVerdict] {
        &self.verdicts
    }

    pub fn verdict(&self, detector: Detector) -> Option<&DetectorVerdict> {
        detector.matching_index().map(|i| &self.verdicts[i])
    }

    /// At least one detector produced a valid hit
    pub fn is_eligible(&self) -> bool {
        self.verdicts.iter().any(|v| v.hit.valid)
    }

    /// Any detector identified the hypothesis species
    pub fn identified(&self) -> bool {
        self.verdicts.iter().any(|v| v.identification.is_identified())
    }

    /// Any detector of the given kind identified the hypothesis species
    pub fn identified_by(&self, kind: DetectorKind) -> bool {
        self.verdicts
            .iter()
            .any(|v| v.detector().kind() == kind && v.identification.is_identified())
    }

    /// Largest identification weight over all detectors
    pub fn weight(&self) -> f64 {
        self.verdicts
            .iter()
            .map(|v| v.identification.weight())
            .fold(0.0, f64::max)
    }
}

/// Classifies tracks against the dead-area, matching and species models
pub struct TrackClassifier {
    matcher: MatchEvaluator,
    identifier: SpeciesIdentifier,
    positive: Species,
    negative: Species,
}

impl TrackClassifier {
    pub fn new(matcher: MatchEvaluator, identifier: SpeciesIdentifier, pairing: &PairingConfig) -> Self {
        Self {
            matcher,
            identifier,
            positive: pairing.positive,
            negative: pairing.negative,
        }
    }

    pub fn matcher(&self) -> &MatchEvaluator {
        &self.matcher
    }

    pub fn identifier(&self) -> &SpeciesIdentifier {
        &self.identifier
    }

    pub fn hypothesis(&self, charge: Charge) -> Species {
        match charge {
            Charge::Positive => self.positive,
            Charge::Negative => self.negative,
        }
    }

    pub fn classify<'t>(&self, track: &'t Track) -> Result<ClassifiedTrack<'t>, TrackRejection> {
        let momentum = track.momentum();
        if !(track.pt.is_finite() && track.pt > 0.0 && momentum.is_finite() && momentum > 0.0) {
            return Err(TrackRejection::Malformed);
        }
        if !self.matcher.is_drift_chamber_live(track) {
            return Err(TrackRejection::DeadDriftChamber);
        }

        let hypothesis = self.hypothesis(track.charge);
        let verdicts = Detector::MATCHING.map(|detector| {
            let hit = self.matcher.evaluate(track, detector);
            if !hit.valid {
                return DetectorVerdict {
                    hit,
                    discriminant: None,
                    identification: Identification::no_signal(),
                };
            }
            let discriminant = self.identifier.discriminant(track, detector);
            let identification = match discriminant {
                Some(value) => self.identifier.identify_as(
                    detector,
                    hypothesis,
                    momentum,
                    track.charge,
                    value,
                ),
                None if self.identifier.is_initialized(detector) => Identification::junk(),
                None => Identification::no_signal(),
            };
            DetectorVerdict {
                hit,
                discriminant,
                identification,
            }
        });

        Ok(ClassifiedTrack {
            track,
            hypothesis,
            verdicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationSet;
    use crate::dead_area::{DeadAreaTable, SurfaceCuts};
    use crate::identification::C_CM_PER_NS;
    use pairpid_common::config::AnalysisConfig;
    use pairpid_common::{Arm, DetectorResponse, SpeciesLabel};
    use std::collections::BTreeMap;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Arc;

    fn open_table() -> Arc<DeadAreaTable> {
        let mut surfaces = Vec::new();
        for arm in [Arm::East, Arm::West] {
            surfaces.push(SurfaceCuts::new(Detector::Dc, arm, [-1e3, 1e3], [-1.0, 1.0]));
            for d in Detector::MATCHING {
                surfaces.push(SurfaceCuts::new(d, arm, [-1e3, 1e3], [-2.0, 5.0]));
            }
        }
        Arc::new(DeadAreaTable::new(surfaces))
    }

    fn classifier() -> TrackClassifier {
        let config = AnalysisConfig::default();
        let matcher = MatchEvaluator::new(open_table(), Arc::new(CalibrationSet::fallback()), &config);
        TrackClassifier::new(
            matcher,
            SpeciesIdentifier::from_config(&config),
            &config.pairing,
        )
    }

    fn track(charge: Charge, mass: f64) -> Track {
        let p: f64 = 1.0;
        let path = 500.0;
        let beta = p / (p * p + mass * mass).sqrt();
        let mut responses = BTreeMap::new();
        responses.insert(
            Detector::TofW,
            DetectorResponse {
                phi: 0.1,
                z: 0.0,
                dphi: 0.0,
                dz: 0.0,
                tof: Some(path / (beta * C_CM_PER_NS)),
                path_length: Some(path),
                energy: None,
            },
        );
        responses.insert(
            Detector::Pc3,
            DetectorResponse {
                phi: 0.1,
                z: 0.0,
                dphi: 0.001,
                dz: 0.5,
                ..DetectorResponse::empty()
            },
        );
        Track {
            charge,
            pt: p,
            phi0: 0.1,
            theta0: FRAC_PI_2,
            phi: 0.1,
            zed: 0.0,
            alpha: 0.02,
            responses,
        }
    }

    #[test]
    fn test_kaon_identified_by_tof() {
        let c = classifier();
        let t = track(Charge::Positive, Species::Kaon.mass());
        let ct = c.classify(&t).unwrap();
        assert_eq!(ct.hypothesis(), Species::Kaon);
        assert!(ct.is_eligible());
        assert!(ct.identified());
        assert!(ct.identified_by(DetectorKind::TimeOfFlight));
        assert!(!ct.identified_by(DetectorKind::Calorimeter));
        let tof = ct.verdict(Detector::TofW).unwrap();
        assert_eq!(tof.identification.label(), SpeciesLabel::Kaon);
        // pc3 has no band model
        let pc3 = ct.verdict(Detector::Pc3).unwrap();
        assert!(pc3.hit.valid);
        assert_eq!(pc3.identification.label(), SpeciesLabel::NoSignal);
    }

    #[test]
    fn test_wrong_species_is_not_identified() {
        let c = classifier();
        // a proton flying with the positive (kaon) hypothesis
        let t = track(Charge::Positive, Species::Proton.mass());
        let ct = c.classify(&t).unwrap();
        assert!(ct.is_eligible());
        assert!(!ct.identified());
        assert_eq!(ct.weight(), 0.0);
    }

    #[test]
    fn test_missing_time_is_junk() {
        let c = classifier();
        let mut t = track(Charge::Negative, Species::Pion.mass());
        t.responses.get_mut(&Detector::TofW).unwrap().tof = None;
        let ct = c.classify(&t).unwrap();
        let tof = ct.verdict(Detector::TofW).unwrap();
        assert!(tof.hit.valid);
        assert_eq!(tof.identification.label(), SpeciesLabel::Junk);
        assert!(!ct.identified());
    }

    #[test]
    fn test_identified_is_or_across_detectors() {
        let c = classifier();
        let mut t = track(Charge::Negative, Species::Pion.mass());
        // pc3 loses its hit; tof alone still identifies
        t.responses.remove(&Detector::Pc3);
        let ct = c.classify(&t).unwrap();
        assert!(ct.identified());
        assert!(!ct.verdict(Detector::Pc3).unwrap().hit.hit);
    }

    #[test]
    fn test_no_valid_hit_is_not_eligible() {
        let c = classifier();
        let mut t = track(Charge::Negative, Species::Pion.mass());
        t.responses.clear();
        let ct = c.classify(&t).unwrap();
        assert!(!ct.is_eligible());
        assert!(!ct.identified());
    }

    #[test]
    fn test_rejections() {
        let c = classifier();
        let mut t = track(Charge::Positive, Species::Kaon.mass());
        t.pt = 0.0;
        assert_eq!(c.classify(&t).unwrap_err(), TrackRejection::Malformed);

        let mut t = track(Charge::Positive, Species::Kaon.mass());
        t.alpha = f64::NAN;
        assert_eq!(c.classify(&t).unwrap_err(), TrackRejection::DeadDriftChamber);
    }
}
