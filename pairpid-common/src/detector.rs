//! Detector, residual axis, charge and arm enumerations
//!
//! The central-arm spectrometer has two arms (east and west). Tracks are
//! reconstructed in the drift chamber and projected onto the outer
//! detectors, which each report a residual in azimuth and along the beam.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

/// Sub-detectors that see a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detector {
    /// Drift chamber (defines the track; has dead areas but no residuals)
    Dc,
    /// Pad chamber 2 (west arm only)
    Pc2,
    /// Pad chamber 3
    Pc3,
    /// East time-of-flight wall
    TofE,
    /// West time-of-flight wall
    TofW,
    /// Electromagnetic calorimeter
    Emc,
}

/// Broad detector families, used when comparing how two legs were identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Tracking,
    TimeOfFlight,
    Calorimeter,
}

impl Detector {
    /// Detectors that report residuals and take part in matching
    pub const MATCHING: [Detector; 5] = [
        Detector::Pc2,
        Detector::Pc3,
        Detector::TofE,
        Detector::TofW,
        Detector::Emc,
    ];

    pub fn kind(&self) -> DetectorKind {
        match self {
            Detector::Dc | Detector::Pc2 | Detector::Pc3 => DetectorKind::Tracking,
            Detector::TofE | Detector::TofW => DetectorKind::TimeOfFlight,
            Detector::Emc => DetectorKind::Calorimeter,
        }
    }

    /// Whether the detector is installed in the given arm
    pub fn covers(&self, arm: Arm) -> bool {
        match self {
            Detector::Pc2 | Detector::TofW => arm == Arm::West,
            Detector::TofE => arm == Arm::East,
            Detector::Dc | Detector::Pc3 | Detector::Emc => true,
        }
    }

    /// Position of this detector inside `Detector::MATCHING`
    pub fn matching_index(&self) -> Option<usize> {
        Detector::MATCHING.iter().position(|d| d == self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Detector::Dc => "dc",
            Detector::Pc2 => "pc2",
            Detector::Pc3 => "pc3",
            Detector::TofE => "tofe",
            Detector::TofW => "tofw",
            Detector::Emc => "emc",
        }
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Detector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dc" => Ok(Detector::Dc),
            "pc2" => Ok(Detector::Pc2),
            "pc3" => Ok(Detector::Pc3),
            "tofe" => Ok(Detector::TofE),
            "tofw" => Ok(Detector::TofW),
            "emc" | "emcal" => Ok(Detector::Emc),
            other => Err(format!("unknown detector '{other}'")),
        }
    }
}

/// Residual axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Phi,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Phi, Axis::Z];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Phi => f.write_str("dphi"),
            Axis::Z => f.write_str("dz"),
        }
    }
}

/// Track charge sign
///
/// Serialized as the integer `1` / `-1` so record files stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Charge {
    Positive,
    Negative,
}

impl Charge {
    pub const ALL: [Charge; 2] = [Charge::Positive, Charge::Negative];

    pub fn sign(&self) -> f64 {
        match self {
            Charge::Positive => 1.0,
            Charge::Negative => -1.0,
        }
    }
}

impl TryFrom<i8> for Charge {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Charge::Positive),
            -1 => Ok(Charge::Negative),
            other => Err(format!("charge must be +1 or -1, got {other}")),
        }
    }
}

impl From<Charge> for i8 {
    fn from(charge: Charge) -> Self {
        match charge {
            Charge::Positive => 1,
            Charge::Negative => -1,
        }
    }
}

impl fmt::Display for Charge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charge::Positive => f.write_str("pos"),
            Charge::Negative => f.write_str("neg"),
        }
    }
}

/// Spectrometer arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    East,
    West,
}

impl Arm {
    /// Arm for a drift-chamber azimuth
    ///
    /// Azimuth is folded into [-π/2, 3π/2); the west arm is centred on 0 and
    /// the east arm on π.
    pub fn from_phi(phi: f64) -> Arm {
        if wrap_phi(phi) < FRAC_PI_2 {
            Arm::West
        } else {
            Arm::East
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arm::East => f.write_str("east"),
            Arm::West => f.write_str("west"),
        }
    }
}

/// Fold an azimuth into [-π/2, 3π/2)
pub fn wrap_phi(phi: f64) -> f64 {
    let two_pi = 2.0 * PI;
    (phi + FRAC_PI_2).rem_euclid(two_pi) - FRAC_PI_2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_from_phi() {
        assert_eq!(Arm::from_phi(0.2), Arm::West);
        assert_eq!(Arm::from_phi(-0.5), Arm::West);
        assert_eq!(Arm::from_phi(3.0), Arm::East);
        // -2.8 rad is the same direction as 3.48 rad
        assert_eq!(Arm::from_phi(-2.8), Arm::East);
    }

    #[test]
    fn test_wrap_phi_range() {
        for phi in [-10.0, -3.0, 0.0, 1.5, 4.0, 12.0] {
            let w = wrap_phi(phi);
            assert!(w >= -FRAC_PI_2 && w < 3.0 * FRAC_PI_2, "{phi} -> {w}");
        }
    }

    #[test]
    fn test_charge_serde_as_integer() {
        let json = serde_json::to_string(&Charge::Negative).unwrap();
        assert_eq!(json, "-1");
        let parsed: Charge = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Charge::Positive);
        assert!(serde_json::from_str::<Charge>("0").is_err());
    }

    #[test]
    fn test_detector_parse_and_display() {
        for d in Detector::MATCHING {
            assert_eq!(d.as_str().parse::<Detector>().unwrap(), d);
        }
        assert_eq!("EMCal".parse::<Detector>().unwrap(), Detector::Emc);
        assert!("rich".parse::<Detector>().is_err());
    }

    #[test]
    fn test_coverage() {
        assert!(!Detector::Pc2.covers(Arm::East));
        assert!(Detector::TofE.covers(Arm::East));
        assert!(!Detector::TofE.covers(Arm::West));
        assert!(Detector::Emc.covers(Arm::East) && Detector::Emc.covers(Arm::West));
    }
}
