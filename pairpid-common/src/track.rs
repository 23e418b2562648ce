//! Reconstructed charged-track record
//!
//! A `Track` is read once from the record source and never modified. Outer
//! detector information is kept per detector in a `DetectorResponse`; a
//! detector that saw nothing reports the `NO_HIT` sentinel in its residuals.

use crate::detector::{Arm, Charge, Detector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel written into residuals when a detector has no associated hit
pub const NO_HIT: f64 = -9999.0;

/// Anything at or below this is treated as the sentinel
const NO_HIT_THRESHOLD: f64 = -9000.0;

fn no_hit() -> f64 {
    NO_HIT
}

/// One outer detector's view of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorResponse {
    /// Projected azimuth of the track at the detector (rad)
    #[serde(default = "no_hit")]
    pub phi: f64,
    /// Projected z of the track at the detector (cm)
    #[serde(default = "no_hit")]
    pub z: f64,
    /// Raw azimuthal residual, hit minus projection (rad)
    #[serde(default = "no_hit")]
    pub dphi: f64,
    /// Raw z residual, hit minus projection (cm)
    #[serde(default = "no_hit")]
    pub dz: f64,
    /// Time of flight (ns)
    #[serde(default)]
    pub tof: Option<f64>,
    /// Flight path length from the vertex (cm)
    #[serde(default)]
    pub path_length: Option<f64>,
    /// Deposited energy (GeV)
    #[serde(default)]
    pub energy: Option<f64>,
}

impl DetectorResponse {
    /// A response with every field at its "nothing seen" value
    pub fn empty() -> Self {
        Self {
            phi: NO_HIT,
            z: NO_HIT,
            dphi: NO_HIT,
            dz: NO_HIT,
            tof: None,
            path_length: None,
            energy: None,
        }
    }

    /// Whether both residuals carry a real value
    ///
    /// This is the single place the sentinel is interpreted.
    pub fn is_hit(&self) -> bool {
        self.dphi.is_finite()
            && self.dz.is_finite()
            && self.dphi > NO_HIT_THRESHOLD
            && self.dz > NO_HIT_THRESHOLD
    }
}

impl Default for DetectorResponse {
    fn default() -> Self {
        Self::empty()
    }
}

/// One reconstructed charged particle in one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub charge: Charge,
    /// Transverse momentum (GeV/c)
    pub pt: f64,
    /// Momentum azimuth at the vertex (rad)
    pub phi0: f64,
    /// Momentum polar angle at the vertex (rad)
    pub theta0: f64,
    /// Drift-chamber azimuth at the reference radius (rad)
    pub phi: f64,
    /// Drift-chamber z at the reference radius (cm)
    pub zed: f64,
    /// Drift-chamber bend angle (rad)
    pub alpha: f64,
    #[serde(default)]
    pub responses: BTreeMap<Detector, DetectorResponse>,
}

impl Track {
    /// Arm the track was reconstructed in
    pub fn arm(&self) -> Arm {
        Arm::from_phi(self.phi)
    }

    /// Total momentum magnitude (GeV/c)
    pub fn momentum(&self) -> f64 {
        self.pt / self.theta0.sin()
    }

    /// Cartesian momentum (px, py, pz) in GeV/c
    pub fn momentum_vector(&self) -> [f64; 3] {
        [
            self.pt * self.phi0.cos(),
            self.pt * self.phi0.sin(),
            self.pt / self.theta0.tan(),
        ]
    }

    pub fn response(&self, detector: Detector) -> Option<&DetectorResponse> {
        self.responses.get(&detector)
    }

    /// Whether the detector reports a real hit for this track
    pub fn is_hit(&self, detector: Detector) -> bool {
        self.response(detector).is_some_and(DetectorResponse::is_hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn sample_track() -> Track {
        Track {
            charge: Charge::Positive,
            pt: 1.0,
            phi0: 0.3,
            theta0: FRAC_PI_2,
            phi: 0.3,
            zed: 10.0,
            alpha: 0.05,
            responses: BTreeMap::new(),
        }
    }

    #[test]
    fn test_missing_response_is_not_a_hit() {
        let track = sample_track();
        assert!(!track.is_hit(Detector::Pc3));
    }

    #[test]
    fn test_sentinel_is_not_a_hit() {
        let mut response = DetectorResponse::empty();
        response.dphi = 0.001;
        assert!(!response.is_hit(), "dz still carries the sentinel");
        response.dz = 0.5;
        assert!(response.is_hit());
        response.dz = f64::NAN;
        assert!(!response.is_hit());
    }

    #[test]
    fn test_momentum_at_ninety_degrees_equals_pt() {
        let track = sample_track();
        assert!((track.momentum() - 1.0).abs() < 1e-12);
        let [px, py, pz] = track.momentum_vector();
        assert!((px.hypot(py) - 1.0).abs() < 1e-12);
        assert!(pz.abs() < 1e-12);
    }

    #[test]
    fn test_deserialize_defaults_missing_residuals_to_sentinel() {
        let json = r#"{
            "charge": -1, "pt": 0.8, "phi0": 3.0, "theta0": 1.4,
            "phi": 3.0, "zed": -20.0, "alpha": -0.02,
            "responses": { "tofe": { "phi": 3.0, "z": -40.0, "tof": 18.2, "path_length": 510.0 } }
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.charge, Charge::Negative);
        assert_eq!(track.arm(), Arm::East);
        let tofe = track.response(Detector::TofE).unwrap();
        assert_eq!(tofe.dphi, NO_HIT);
        assert!(!tofe.is_hit());
    }

    #[test]
    fn test_deserialize_missing_mandatory_field_fails() {
        let json = r#"{ "charge": 1, "pt": 0.8 }"#;
        assert!(serde_json::from_str::<Track>(json).is_err());
    }
}
