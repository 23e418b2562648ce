//! Expected location and spread of each species' discriminant

use pairpid_common::config::{BandModelConfig, PolynomialBandConfig};
use pairpid_common::polynomial;
use pairpid_common::{Charge, Species};

/// Speed of light (cm/ns)
pub const C_CM_PER_NS: f64 = 29.979_245_8;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BandModel {
    TofMassSquared {
        sigma_alpha: f64,
        sigma_ms: f64,
        sigma_t: f64,
        k1: f64,
        path_length: f64,
    },
    Polynomial { bands: Vec<PolynomialBandConfig> },
}

impl BandModel {
    pub(crate) fn from_config(config: &BandModelConfig) -> Self {
        match config {
            BandModelConfig::TofMassSquared {
                sigma_alpha,
                sigma_ms,
                sigma_t,
                k1,
                path_length,
            } => BandModel::TofMassSquared {
                sigma_alpha: *sigma_alpha,
                sigma_ms: *sigma_ms,
                sigma_t: *sigma_t,
                k1: *k1,
                path_length: *path_length,
            },
            BandModelConfig::Polynomial { bands, .. } => BandModel::Polynomial {
                bands: bands.clone(),
            },
        }
    }

    /// Charge-specific band first, then one that applies to both charges
    fn band(bands: &[PolynomialBandConfig], species: Species, charge: Charge) -> Option<&PolynomialBandConfig> {
        bands
            .iter()
            .find(|b| b.species == species && b.charge == Some(charge))
            .or_else(|| {
                bands
                    .iter()
                    .find(|b| b.species == species && b.charge.is_none())
            })
    }

    /// (mean, sigma) of a species band at momentum `p`
    ///
    /// `None` when the model has no band for the species or the band's
    /// sigma is not positive at this momentum.
    pub(crate) fn location(&self, species: Species, p: f64, charge: Charge) -> Option<(f64, f64)> {
        let (mean, sigma) = match self {
            BandModel::TofMassSquared {
                sigma_alpha,
                sigma_ms,
                sigma_t,
                k1,
                path_length,
            } => {
                let m2 = species.mass_squared();
                let p2 = p * p;
                let angular = (2.0 * sigma_alpha / k1).powi(2) * m2 * m2 * p2;
                let scattering = (2.0 * sigma_ms / k1).powi(2) * m2 * m2 * (1.0 + m2 / p2);
                let timing = (C_CM_PER_NS / path_length).powi(2)
                    * sigma_t
                    * sigma_t
                    * 4.0
                    * p2
                    * (m2 + p2);
                (m2, (angular + scattering + timing).sqrt())
            }
            BandModel::Polynomial { bands } => {
                let band = Self::band(bands, species, charge)?;
                (polynomial::eval(&band.mean, p), polynomial::eval(&band.sigma, p))
            }
        };
        (sigma.is_finite() && sigma > 0.0 && mean.is_finite()).then_some((mean, sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tof() -> BandModel {
        BandModel::TofMassSquared {
            sigma_alpha: 0.835,
            sigma_ms: 0.86,
            sigma_t: 0.12,
            k1: 87.0,
            path_length: 500.0,
        }
    }

    #[test]
    fn test_tof_mean_is_mass_squared() {
        let (mean, _) = tof().location(Species::Kaon, 1.0, Charge::Positive).unwrap();
        assert!((mean - Species::Kaon.mass_squared()).abs() < 1e-12);
    }

    #[test]
    fn test_tof_sigma_grows_with_momentum() {
        let model = tof();
        let (_, low) = model.location(Species::Pion, 0.5, Charge::Negative).unwrap();
        let (_, high) = model.location(Species::Pion, 2.0, Charge::Negative).unwrap();
        assert!(high > low);
        // timing term dominates at 1 GeV/c: sigma ≈ 0.0145 GeV² for pions
        let (_, at_one) = model.location(Species::Pion, 1.0, Charge::Negative).unwrap();
        assert!((at_one - 0.0145).abs() < 0.001, "sigma = {at_one}");
    }

    #[test]
    fn test_polynomial_prefers_charge_specific_band() {
        let model = BandModel::Polynomial {
            bands: vec![
                PolynomialBandConfig {
                    species: Species::Electron,
                    charge: None,
                    mean: vec![0.9],
                    sigma: vec![0.1],
                },
                PolynomialBandConfig {
                    species: Species::Electron,
                    charge: Some(Charge::Negative),
                    mean: vec![0.95, 0.01],
                    sigma: vec![0.08],
                },
            ],
        };
        let (pos, _) = model.location(Species::Electron, 2.0, Charge::Positive).unwrap();
        let (neg, sigma) = model.location(Species::Electron, 2.0, Charge::Negative).unwrap();
        assert!((pos - 0.9).abs() < 1e-12);
        assert!((neg - 0.97).abs() < 1e-12);
        assert!((sigma - 0.08).abs() < 1e-12);
        assert!(model.location(Species::Pion, 2.0, Charge::Negative).is_none());
    }

    #[test]
    fn test_non_positive_sigma_has_no_location() {
        let model = BandModel::Polynomial {
            bands: vec![PolynomialBandConfig {
                species: Species::Pion,
                charge: None,
                mean: vec![0.3],
                sigma: vec![0.1, -0.1],
            }],
        };
        assert!(model.location(Species::Pion, 0.5, Charge::Positive).is_some());
        assert!(model.location(Species::Pion, 1.5, Charge::Positive).is_none());
    }
}
