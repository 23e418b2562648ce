//! Dead areas for the 2014 ³He+Au 200 GeV dataset
//!
//! Boundaries were read off the occupancy maps of minimum-bias data after
//! the final calibration pass.

use super::build::{notch, rect, strip};
use super::{DeadAreaTable, SurfaceCuts};
use pairpid_common::{Arm, Detector};

pub(super) fn table() -> DeadAreaTable {
    DeadAreaTable::new(vec![
        dc_east(),
        dc_west(),
        pc2_west(),
        pc3_east(),
        pc3_west(),
        tof_east(),
        tof_west(),
        emc_east(),
        emc_west(),
    ])
}

fn dc_east() -> SurfaceCuts {
    SurfaceCuts::new(Detector::Dc, Arm::East, [0.0, 80.0], [-0.6, 0.6]).with_regions(vec![
        // dead HV sector, whole board range, both bend directions
        rect(19.0, 21.5, -0.6, 0.6),
        rect(39.5, 41.0, -0.6, 0.6),
        // X1 wires off: shows as diagonal band in board vs alpha
        strip(2.0, 12.0, 7.0, 0.0, 0.034, 0.025),
        strip(44.0, 52.0, 48.0, 0.0, 0.034, 0.020),
        strip(60.0, 66.0, 63.0, 0.0, -0.034, 0.020),
        // UV wire inefficiency at low alpha
        rect(52.0, 56.0, -0.08, 0.02),
        rect(70.0, 73.5, -0.12, -0.02),
        notch([74.0, 80.0], [0.0, 0.6], (74.0, 0.1), (80.0, 0.45)),
    ])
}

fn dc_west() -> SurfaceCuts {
    SurfaceCuts::new(Detector::Dc, Arm::West, [0.0, 80.0], [-0.6, 0.6]).with_regions(vec![
        rect(0.0, 1.5, -0.6, 0.6),
        rect(30.0, 32.5, -0.6, 0.6),
        strip(10.0, 18.0, 14.0, 0.0, 0.034, 0.020),
        strip(22.0, 28.0, 25.0, 0.0, -0.034, 0.018),
        strip(55.0, 61.0, 58.0, 0.0, 0.034, 0.022),
        rect(45.0, 47.0, 0.05, 0.25),
        rect(66.0, 69.0, -0.25, -0.05),
        notch([76.0, 80.0], [-0.6, 0.0], (76.0, -0.6), (80.0, -0.2)),
    ])
}

fn pc2_west() -> SurfaceCuts {
    SurfaceCuts::new(Detector::Pc2, Arm::West, [-160.0, 160.0], [-0.60, 0.98]).with_regions(vec![
        rect(-160.0, -120.0, -0.60, -0.45),
        rect(-5.0, 5.0, -0.60, 0.98),
        rect(40.0, 80.0, 0.18, 0.26),
        rect(-80.0, -40.0, 0.55, 0.62),
        rect(100.0, 160.0, 0.80, 0.98),
        notch([-160.0, -100.0], [0.30, 0.55], (-160.0, 0.35), (-100.0, 0.55)),
    ])
}

fn pc3_east() -> SurfaceCuts {
    SurfaceCuts::new(Detector::Pc3, Arm::East, [-190.0, 190.0], [2.15, 3.75]).with_regions(vec![
        // chamber gaps in z
        rect(-3.0, 3.0, 2.15, 3.75),
        // sector boundaries
        rect(-190.0, 190.0, 2.54, 2.56),
        rect(-190.0, 190.0, 2.94, 2.96),
        rect(-190.0, 190.0, 3.33, 3.35),
        // dead readout cards
        rect(-150.0, -95.0, 2.30, 2.42),
        rect(20.0, 65.0, 3.05, 3.18),
        rect(95.0, 190.0, 3.55, 3.75),
        rect(-60.0, -20.0, 2.70, 2.80),
        notch([120.0, 190.0], [2.15, 2.40], (120.0, 2.15), (190.0, 2.40)),
    ])
}

fn pc3_west() -> SurfaceCuts {
    SurfaceCuts::new(Detector::Pc3, Arm::West, [-190.0, 190.0], [-0.60, 0.98]).with_regions(vec![
        rect(-3.0, 3.0, -0.60, 0.98),
        rect(-190.0, 190.0, -0.22, -0.20),
        rect(-190.0, 190.0, 0.17, 0.19),
        rect(-190.0, 190.0, 0.56, 0.58),
        rect(-190.0, -130.0, -0.60, -0.40),
        rect(30.0, 90.0, 0.30, 0.42),
        rect(-110.0, -70.0, 0.70, 0.85),
        rect(140.0, 190.0, 0.00, 0.10),
    ])
}

fn tof_east() -> SurfaceCuts {
    SurfaceCuts::new(Detector::TofE, Arm::East, [-160.0, 160.0], [2.90, 3.72]).with_regions(vec![
        // panel boundaries
        rect(-160.0, 160.0, 3.09, 3.10),
        rect(-160.0, 160.0, 3.30, 3.31),
        rect(-160.0, 160.0, 3.51, 3.52),
        rect(-2.0, 2.0, 2.90, 3.72),
        // slats with dead PMTs
        rect(-160.0, -110.0, 2.95, 3.02),
        rect(55.0, 95.0, 3.36, 3.42),
        rect(-40.0, 0.0, 3.60, 3.68),
        notch([110.0, 160.0], [3.55, 3.72], (110.0, 3.72), (160.0, 3.60)),
    ])
}

fn tof_west() -> SurfaceCuts {
    SurfaceCuts::new(Detector::TofW, Arm::West, [-170.0, 170.0], [-0.25, 0.45]).with_regions(vec![
        // gap between the two TOF.W boxes
        rect(-170.0, 170.0, 0.08, 0.12),
        rect(-4.0, 4.0, -0.25, 0.45),
        // MRPC strips off
        rect(-170.0, -140.0, -0.25, -0.10),
        rect(60.0, 75.0, 0.20, 0.35),
        rect(-95.0, -80.0, 0.30, 0.45),
        strip(100.0, 170.0, 135.0, -0.05, 0.0008, 0.02),
    ])
}

fn emc_east() -> SurfaceCuts {
    SurfaceCuts::new(Detector::Emc, Arm::East, [-200.0, 200.0], [2.15, 3.75]).with_regions(vec![
        // sector boundaries
        rect(-200.0, 200.0, 2.53, 2.57),
        rect(-200.0, 200.0, 2.94, 2.97),
        rect(-200.0, 200.0, 3.33, 3.36),
        // hot/dead tower clusters
        rect(-180.0, -150.0, 2.20, 2.30),
        rect(10.0, 40.0, 2.65, 2.72),
        rect(120.0, 160.0, 3.10, 3.20),
        rect(-70.0, -30.0, 3.50, 3.60),
        rect(170.0, 200.0, 3.62, 3.75),
    ])
}

fn emc_west() -> SurfaceCuts {
    SurfaceCuts::new(Detector::Emc, Arm::West, [-200.0, 200.0], [-0.60, 0.98]).with_regions(vec![
        rect(-200.0, 200.0, -0.22, -0.19),
        rect(-200.0, 200.0, 0.17, 0.20),
        rect(-200.0, 200.0, 0.56, 0.59),
        rect(-200.0, -160.0, -0.60, -0.45),
        rect(80.0, 110.0, 0.00, 0.08),
        rect(-20.0, 15.0, 0.40, 0.48),
        rect(150.0, 200.0, 0.85, 0.98),
    ])
}
