//! Two-body kinematics

use pairpid_common::Track;

/// Four-momentum (E, px, py, pz) in GeV
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourMomentum {
    pub e: f64,
    pub p: [f64; 3],
}

impl FourMomentum {
    /// Four-momentum of a track under a mass hypothesis
    ///
    /// `None` when the momentum magnitude is not positive and finite.
    pub fn from_track(track: &Track, mass: f64) -> Option<Self> {
        let p = track.momentum_vector();
        let p2 = p.iter().map(|c| c * c).sum::<f64>();
        if !(p2.is_finite() && p2 > 0.0) {
            return None;
        }
        Some(Self {
            e: (p2 + mass * mass).sqrt(),
            p,
        })
    }

    pub fn pt(&self) -> f64 {
        self.p[0].hypot(self.p[1])
    }

    /// Invariant mass; slightly negative m² from rounding is clamped to 0
    pub fn mass(&self) -> f64 {
        let p2 = self.p.iter().map(|c| c * c).sum::<f64>();
        (self.e * self.e - p2).max(0.0).sqrt()
    }
}

impl std::ops::Add for FourMomentum {
    type Output = FourMomentum;

    fn add(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum {
            e: self.e + rhs.e,
            p: [
                self.p[0] + rhs.p[0],
                self.p[1] + rhs.p[1],
                self.p[2] + rhs.p[2],
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairpid_common::Charge;
    use std::collections::BTreeMap;
    use std::f64::consts::FRAC_PI_2;

    fn track(pt: f64, phi0: f64, theta0: f64) -> Track {
        Track {
            charge: Charge::Positive,
            pt,
            phi0,
            theta0,
            phi: phi0,
            zed: 0.0,
            alpha: 0.0,
            responses: BTreeMap::new(),
        }
    }

    #[test]
    fn test_back_to_back_pair_mass() {
        let m = 0.139570;
        let a = FourMomentum::from_track(&track(1.0, 0.0, FRAC_PI_2), m).unwrap();
        let b = FourMomentum::from_track(&track(1.0, std::f64::consts::PI, FRAC_PI_2), m).unwrap();
        let pair = a + b;
        let expected = 2.0 * (1.0 + m * m).sqrt();
        assert!((pair.mass() - expected).abs() < 1e-9);
        assert!(pair.pt() < 1e-9);
    }

    #[test]
    fn test_single_track_mass_is_hypothesis() {
        let p = FourMomentum::from_track(&track(0.7, 1.0, 1.2), 0.493677).unwrap();
        assert!((p.mass() - 0.493677).abs() < 1e-9);
    }

    #[test]
    fn test_zero_momentum_is_rejected() {
        assert!(FourMomentum::from_track(&track(0.0, 0.0, FRAC_PI_2), 0.1).is_none());
        assert!(FourMomentum::from_track(&track(f64::NAN, 0.0, FRAC_PI_2), 0.1).is_none());
    }
}
