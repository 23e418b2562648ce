//! Ghost-pair bands
//!
//! One physical particle reconstructed twice shows up as two tracks with
//! almost the same bend angle whose projections land on the same spot of a
//! detector plane. Each band is a box in (Δα, Δφ − slope·Δα, Δz, Δt) on one
//! plane; a pair inside any band is a ghost.

use pairpid_common::config::GhostBandConfig;
use pairpid_common::{Detector, Track};
use std::f64::consts::{PI, TAU};

/// Azimuthal difference folded into (-π, π]
pub fn delta_phi(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

/// Position of a track on a band's plane: (phi, z, time of flight)
fn plane_position(track: &Track, plane: Detector) -> Option<(f64, f64, Option<f64>)> {
    match plane {
        Detector::Dc => Some((track.phi, track.zed, None)),
        other => {
            let response = track.response(other).filter(|r| r.is_hit())?;
            Some((response.phi, response.z, response.tof))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GhostBand {
    name: String,
    plane: Detector,
    dalpha_max: f64,
    phi_slope: f64,
    phi_half_width: Option<f64>,
    dz_max: Option<f64>,
    dtof_max: Option<f64>,
}

impl GhostBand {
    pub fn from_config(config: &GhostBandConfig) -> Self {
        Self {
            name: config.name.clone(),
            plane: config.plane,
            dalpha_max: config.dalpha_max,
            phi_slope: config.phi_slope,
            phi_half_width: config.phi_half_width,
            dz_max: config.dz_max,
            dtof_max: config.dtof_max,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the two tracks fall inside this band
    ///
    /// Every condition compares the magnitude of a difference, so the
    /// result does not depend on the order of the tracks. A condition that
    /// cannot be evaluated (no hit on the plane, no timing) does not match.
    pub fn contains(&self, a: &Track, b: &Track) -> bool {
        let dalpha = a.alpha - b.alpha;
        if !(dalpha.abs() < self.dalpha_max) {
            return false;
        }
        let (Some((phi_a, z_a, t_a)), Some((phi_b, z_b, t_b))) =
            (plane_position(a, self.plane), plane_position(b, self.plane))
        else {
            return false;
        };

        if let Some(width) = self.phi_half_width {
            let dphi = delta_phi(phi_a, phi_b);
            if !((dphi - self.phi_slope * dalpha).abs() < width) {
                return false;
            }
        }
        if let Some(dz_max) = self.dz_max {
            if !((z_a - z_b).abs() < dz_max) {
                return false;
            }
        }
        if let Some(dtof_max) = self.dtof_max {
            match (t_a, t_b) {
                (Some(t_a), Some(t_b)) if (t_a - t_b).abs() < dtof_max => {}
                _ => return false,
            }
        }
        true
    }
}

/// First band containing the pair
pub fn find_ghost<'b>(bands: &'b [GhostBand], a: &Track, b: &Track) -> Option<&'b GhostBand> {
    bands.iter().find(|band| band.contains(a, b))
}
