//! Shared builders for the engine integration tests

#![allow(dead_code)]

use pairpid_an::dead_area::{DeadAreaTable, SurfaceCuts};
use pairpid_an::identification::C_CM_PER_NS;
use pairpid_common::{Arm, Charge, Detector, DetectorResponse, Track};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const PATH_LENGTH: f64 = 500.0;

/// Every surface of both arms with a wide acceptance and no excluded regions
pub fn open_table() -> DeadAreaTable {
    let mut surfaces = Vec::new();
    for arm in [Arm::East, Arm::West] {
        surfaces.push(SurfaceCuts::new(Detector::Dc, arm, [-1e3, 1e3], [-1.0, 1.0]));
        for d in Detector::MATCHING {
            surfaces.push(SurfaceCuts::new(d, arm, [-1e3, 1e3], [-2.0, 5.0]));
        }
    }
    DeadAreaTable::new(surfaces)
}

pub fn open_table_arc() -> Arc<DeadAreaTable> {
    Arc::new(open_table())
}

/// Write the open table as TOML into `dir`
pub fn write_open_table(dir: &Path) -> PathBuf {
    let path = dir.join("dead_areas.toml");
    let content = toml::to_string(&open_table()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

/// Flight time of a particle of `mass` and momentum `p` over `path`
pub fn flight_time(p: f64, mass: f64, path: f64) -> f64 {
    let beta = p / (p * p + mass * mass).sqrt();
    path / (beta * C_CM_PER_NS)
}

/// Track at theta0 = π/2 with a perfectly matched TOF hit on `wall`
pub fn tof_track(
    charge: Charge,
    wall: Detector,
    p: f64,
    phi0: f64,
    alpha: f64,
    z: f64,
    mass: f64,
) -> Track {
    let mut responses = BTreeMap::new();
    responses.insert(
        wall,
        DetectorResponse {
            phi: phi0,
            z,
            dphi: 0.0,
            dz: 0.0,
            tof: Some(flight_time(p, mass, PATH_LENGTH)),
            path_length: Some(PATH_LENGTH),
            energy: None,
        },
    );
    Track {
        charge,
        pt: p,
        phi0,
        theta0: FRAC_PI_2,
        phi: phi0,
        zed: z,
        alpha,
        responses,
    }
}

/// Opening angle between two legs of momentum `p` giving invariant mass `m`
pub fn opening_angle(p: f64, m1: f64, m2: f64, m: f64) -> f64 {
    let e1 = (p * p + m1 * m1).sqrt();
    let e2 = (p * p + m2 * m2).sqrt();
    let cos = (m1 * m1 + m2 * m2 + 2.0 * e1 * e2 - m * m) / (2.0 * p * p);
    cos.acos()
}

/// Transverse momentum of two legs of pT `p` separated by `angle`
pub fn pair_pt(p: f64, angle: f64) -> f64 {
    p * (2.0 + 2.0 * angle.cos()).sqrt()
}

/// One random track, spread over both arms and every outer detector
pub fn random_track(rng: &mut StdRng) -> Track {
    let charge = if rng.gen_bool(0.5) {
        Charge::Positive
    } else {
        Charge::Negative
    };
    let west = rng.gen_bool(0.5);
    let phi0 = if west {
        rng.gen_range(-0.55..0.9)
    } else {
        rng.gen_range(2.25..3.7)
    };
    let theta0 = rng.gen_range(1.25..1.9);
    let pt = rng.gen_range(0.2..3.0);
    let p = pt / f64::sin(theta0);
    let z = rng.gen_range(-80.0..80.0);
    let mass = [0.139_57, 0.493_677, 0.938_272][rng.gen_range(0..3)];

    let mut responses = BTreeMap::new();
    let tof_wall = if west { Detector::TofW } else { Detector::TofE };
    for detector in [Detector::Pc2, Detector::Pc3, tof_wall, Detector::Emc] {
        if rng.gen_bool(0.3) {
            continue;
        }
        let path = rng.gen_range(480.0..520.0);
        responses.insert(
            detector,
            DetectorResponse {
                phi: phi0 + rng.gen_range(-0.01..0.01),
                z: z + rng.gen_range(-2.0..2.0),
                dphi: rng.gen_range(-0.006..0.006),
                dz: rng.gen_range(-6.0..6.0),
                tof: Some(flight_time(p, mass, path) + rng.gen_range(-0.2..0.2)),
                path_length: Some(path),
                energy: Some(rng.gen_range(0.05..1.5)),
            },
        );
    }

    Track {
        charge,
        pt,
        phi0,
        theta0,
        phi: phi0 + rng.gen_range(-0.005..0.005),
        zed: z,
        alpha: rng.gen_range(-0.2..0.2),
        responses,
    }
}

/// `events` random events of up to `max_tracks` tracks each
pub fn random_events(rng: &mut StdRng, events: usize, max_tracks: usize) -> Vec<Vec<Track>> {
    (0..events)
        .map(|_| {
            let n = rng.gen_range(0..=max_tracks);
            (0..n).map(|_| random_track(rng)).collect()
        })
        .collect()
}
