//! Track-to-hit matching
//!
//! A detector hit is valid for a track when:
//! 1. the detector reports a hit at all (`DetectorResponse::is_hit`),
//! 2. the projected position is live in the dead-area table,
//! 3. the combined sigmalized residual `sdphi² + sdz²` is inside the
//!    detector's matching radius.
//!
//! Step 3 is skipped above the detector's pT ceiling; multiple scattering
//! is what the residual window guards against, and it is negligible there.

use crate::calibration::CalibrationSet;
use crate::dead_area::{CutPoint, DeadAreaTable};
use pairpid_common::config::{AnalysisConfig, MatchWindowConfig};
use pairpid_common::{Axis, Detector, Track, NO_HIT};
use serde::Serialize;
use std::sync::Arc;

/// Matching verdict of one detector for one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorHitRecord {
    pub detector: Detector,
    /// Detector reported a hit
    pub hit: bool,
    /// Projected position is outside every dead area
    pub live: bool,
    /// Sigmalized azimuthal residual (`NO_HIT` without a hit)
    pub sdphi: f64,
    /// Sigmalized z residual (`NO_HIT` without a hit)
    pub sdz: f64,
    /// Hit passes every matching requirement
    pub valid: bool,
}

impl DetectorHitRecord {
    pub fn no_hit(detector: Detector) -> Self {
        Self {
            detector,
            hit: false,
            live: false,
            sdphi: NO_HIT,
            sdz: NO_HIT,
            valid: false,
        }
    }

    /// sqrt(sdphi² + sdz²)
    pub fn combined(&self) -> f64 {
        self.sdphi.hypot(self.sdz)
    }
}

/// Decides whether outer-detector hits belong to a track
pub struct MatchEvaluator {
    table: Arc<DeadAreaTable>,
    calibration: Arc<CalibrationSet>,
    windows: [MatchWindowConfig; Detector::MATCHING.len()],
}

impl MatchEvaluator {
    pub fn new(
        table: Arc<DeadAreaTable>,
        calibration: Arc<CalibrationSet>,
        config: &AnalysisConfig,
    ) -> Self {
        let windows = Detector::MATCHING.map(|d| config.match_window(d));
        Self {
            table,
            calibration,
            windows,
        }
    }

    pub fn table(&self) -> &DeadAreaTable {
        &self.table
    }

    pub fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    fn window(&self, detector: Detector) -> Option<&MatchWindowConfig> {
        detector.matching_index().map(|i| &self.windows[i])
    }

    /// Whether the track's drift-chamber point is live
    pub fn is_drift_chamber_live(&self, track: &Track) -> bool {
        !self
            .table
            .is_excluded(Detector::Dc, &CutPoint::drift_chamber(track))
    }

    /// Full matching record of one detector
    pub fn evaluate(&self, track: &Track, detector: Detector) -> DetectorHitRecord {
        let (response, window) = match (track.response(detector), self.window(detector)) {
            (Some(response), Some(window)) if response.is_hit() => (response, window),
            _ => return DetectorHitRecord::no_hit(detector),
        };

        let live = !self
            .table
            .is_excluded(detector, &CutPoint::projection(track.arm(), response));
        let sdphi = self
            .calibration
            .sigmalize(detector, Axis::Phi, track.charge, track.pt, response.dphi);
        let sdz = self
            .calibration
            .sigmalize(detector, Axis::Z, track.charge, track.pt, response.dz);

        let within_window = sdphi * sdphi + sdz * sdz < window.radius * window.radius;
        let valid = live && (track.pt > window.pt_ceiling || within_window);

        DetectorHitRecord {
            detector,
            hit: true,
            live,
            sdphi,
            sdz,
            valid,
        }
    }

    pub fn is_valid_hit(&self, track: &Track, detector: Detector) -> bool {
        if !track.is_hit(detector) {
            return false;
        }
        self.evaluate(track, detector).valid
    }
}
