//! Sigmalized residual calibration
//!
//! Converts a raw residual into "number of standard deviations" using
//! per-detector, per-charge, per-axis mean and sigma curves fitted against
//! pT. The curves are `f(pT) = Σ c_i · pT^-i`, evaluated with pT clamped
//! into `[pt_floor, pt_ceiling]`: above the ceiling the fit has no data, so
//! the curves are held flat instead of extrapolated.
//!
//! Detectors without a fitted table use the rough fallback
//! `sdphi = dphi / 0.002`, `sdz = dz / 2.0`. The fallback is chosen
//! explicitly at load time and logged once per detector.

mod parser;

pub use parser::{load_calibration_file, parse_calibration};

use pairpid_common::config::CalibrationConfig;
use pairpid_common::polynomial;
use pairpid_common::{Axis, Charge, Detector, Error, Result};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Fallback azimuthal resolution (rad)
pub const FALLBACK_DPHI_SIGMA: f64 = 0.002;

/// Fallback z resolution (cm)
pub const FALLBACK_DZ_SIGMA: f64 = 2.0;

/// Inverse power series in pT
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    coefficients: Vec<f64>,
}

impl Curve {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    pub fn eval(&self, pt: f64) -> f64 {
        polynomial::eval(&self.coefficients, 1.0 / pt)
    }

    /// First pT in `[pt_low, pt_high]` where the curve is not provably positive
    pub fn first_non_positive(&self, pt_low: f64, pt_high: f64) -> Option<f64> {
        polynomial::first_non_positive(&self.coefficients, 1.0 / pt_high, 1.0 / pt_low)
            .map(|inv| 1.0 / inv)
    }
}

/// Index of an (axis, charge) combination, in file order
pub(crate) fn slot(axis: Axis, charge: Charge) -> usize {
    match (axis, charge) {
        (Axis::Phi, Charge::Positive) => 0,
        (Axis::Phi, Charge::Negative) => 1,
        (Axis::Z, Charge::Positive) => 2,
        (Axis::Z, Charge::Negative) => 3,
    }
}

/// Fitted mean and sigma curves of one detector
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualFit {
    mean: [Curve; 4],
    sigma: [Curve; 4],
    pt_floor: f64,
    pt_ceiling: f64,
}

impl ResidualFit {
    /// Build a fit and check every sigma curve stays positive over the
    /// clamped pT range
    pub fn new(
        detector: Detector,
        mean: [Curve; 4],
        sigma: [Curve; 4],
        pt_floor: f64,
        pt_ceiling: f64,
    ) -> Result<Self> {
        let fit = Self {
            mean,
            sigma,
            pt_floor,
            pt_ceiling,
        };
        fit.check_sigma(detector)?;
        Ok(fit)
    }

    fn check_sigma(&self, detector: Detector) -> Result<()> {
        for axis in Axis::ALL {
            for charge in Charge::ALL {
                let curve = &self.sigma[slot(axis, charge)];
                if let Some(pt) = curve.first_non_positive(self.pt_floor, self.pt_ceiling) {
                    return Err(Error::NonPositiveSigma {
                        detector,
                        axis,
                        charge,
                        pt,
                        value: curve.eval(pt),
                    });
                }
            }
        }
        Ok(())
    }

    fn clamp_pt(&self, pt: f64) -> f64 {
        pt.clamp(self.pt_floor, self.pt_ceiling)
    }

    pub fn mean(&self, axis: Axis, charge: Charge, pt: f64) -> f64 {
        self.mean[slot(axis, charge)].eval(self.clamp_pt(pt))
    }

    pub fn sigma(&self, axis: Axis, charge: Charge, pt: f64) -> f64 {
        self.sigma[slot(axis, charge)].eval(self.clamp_pt(pt))
    }

    pub fn pt_ceiling(&self) -> f64 {
        self.pt_ceiling
    }
}

/// Calibration state of one detector
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorCalibration {
    Fitted(ResidualFit),
    Fallback,
}

impl DetectorCalibration {
    pub fn mean(&self, axis: Axis, charge: Charge, pt: f64) -> f64 {
        match self {
            DetectorCalibration::Fitted(fit) => fit.mean(axis, charge, pt),
            DetectorCalibration::Fallback => 0.0,
        }
    }

    pub fn sigma(&self, axis: Axis, charge: Charge, pt: f64) -> f64 {
        match self {
            DetectorCalibration::Fitted(fit) => fit.sigma(axis, charge, pt),
            DetectorCalibration::Fallback => match axis {
                Axis::Phi => FALLBACK_DPHI_SIGMA,
                Axis::Z => FALLBACK_DZ_SIGMA,
            },
        }
    }

    /// Residual in units of its expected spread
    ///
    /// NaN when the fitted sigma is not positive at this pT, which no
    /// matching window accepts.
    pub fn sigmalize(&self, axis: Axis, charge: Charge, pt: f64, raw: f64) -> f64 {
        match self {
            DetectorCalibration::Fitted(fit) => {
                let sigma = fit.sigma(axis, charge, pt);
                if !(sigma.is_finite() && sigma > 0.0) {
                    return f64::NAN;
                }
                (fit.mean(axis, charge, pt) - raw) / sigma
            }
            DetectorCalibration::Fallback => raw / self.sigma(axis, charge, pt),
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, DetectorCalibration::Fitted(_))
    }
}

/// Calibrations of every matching detector; read-only after load
#[derive(Debug, Clone, Default)]
pub struct CalibrationSet {
    detectors: BTreeMap<Detector, DetectorCalibration>,
}

static FALLBACK: DetectorCalibration = DetectorCalibration::Fallback;

impl CalibrationSet {
    /// All detectors on the fallback
    pub fn fallback() -> Self {
        Self::default()
    }

    /// Load every configured table; unconfigured detectors use the fallback
    ///
    /// A configured table that is missing, malformed or has a non-positive
    /// sigma is a fatal configuration error.
    pub fn load(config: &CalibrationConfig) -> Result<Self> {
        let mut detectors = BTreeMap::new();
        for detector in Detector::MATCHING {
            let calibration = match config.file_for(detector) {
                Some(path) => {
                    let calibration = load_calibration_file(
                        &path,
                        detector,
                        config.pt_floor,
                        config.pt_ceiling,
                    )?;
                    if calibration.is_fitted() {
                        info!("{}: residual calibration loaded from {}", detector, path.display());
                    } else {
                        warn!(
                            "{}: {} is marked unused, falling back to dphi/{} and dz/{}",
                            detector,
                            path.display(),
                            FALLBACK_DPHI_SIGMA,
                            FALLBACK_DZ_SIGMA
                        );
                    }
                    calibration
                }
                None => {
                    warn!(
                        "{}: no residual calibration configured, falling back to dphi/{} and dz/{}",
                        detector, FALLBACK_DPHI_SIGMA, FALLBACK_DZ_SIGMA
                    );
                    DetectorCalibration::Fallback
                }
            };
            detectors.insert(detector, calibration);
        }
        Ok(Self { detectors })
    }

    /// Replace one detector's calibration
    pub fn with_calibration(mut self, detector: Detector, calibration: DetectorCalibration) -> Self {
        self.detectors.insert(detector, calibration);
        self
    }

    pub fn calibration(&self, detector: Detector) -> &DetectorCalibration {
        self.detectors.get(&detector).unwrap_or(&FALLBACK)
    }

    pub fn mean(&self, detector: Detector, axis: Axis, charge: Charge, pt: f64) -> f64 {
        self.calibration(detector).mean(axis, charge, pt)
    }

    pub fn sigma(&self, detector: Detector, axis: Axis, charge: Charge, pt: f64) -> f64 {
        self.calibration(detector).sigma(axis, charge, pt)
    }

    pub fn sigmalize(&self, detector: Detector, axis: Axis, charge: Charge, pt: f64, raw: f64) -> f64 {
        self.calibration(detector).sigmalize(axis, charge, pt, raw)
    }
}
