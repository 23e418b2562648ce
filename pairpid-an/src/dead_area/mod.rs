//! Dead-area evaluator
//!
//! Each (detector, arm) surface carries an acceptance box and an ordered
//! list of excluded regions measured from hit maps. A point is excluded if
//! it lies outside the box or inside any region. The evaluator knows
//! nothing about which run the table came from; `Dataset` picks the table
//! once at startup.
//!
//! Coordinates:
//! - drift chamber: x = board number, y = bend angle alpha (rad)
//! - every other surface: x = z (cm), y = azimuth folded into [-π/2, 3π/2)

mod run14;
mod run16;

use once_cell::sync::Lazy;
use pairpid_common::detector::wrap_phi;
use pairpid_common::{Arm, Detector, DetectorResponse, Error, Result, Track};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Position on a detector surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutPoint {
    pub arm: Arm,
    pub x: f64,
    pub y: f64,
}

impl CutPoint {
    /// Drift-chamber point of a track: (board, alpha)
    pub fn drift_chamber(track: &Track) -> Self {
        let arm = track.arm();
        Self {
            arm,
            x: dc_board(track.phi, arm),
            y: track.alpha,
        }
    }

    /// Projected position of a track on an outer detector: (z, phi)
    pub fn projection(arm: Arm, response: &DetectorResponse) -> Self {
        Self {
            arm,
            x: response.z,
            y: wrap_phi(response.phi),
        }
    }
}

/// Drift-chamber board number for an azimuth
pub fn dc_board(phi: f64, arm: Arm) -> f64 {
    const BOARD_WIDTH: f64 = 0.019_634_96;
    match arm {
        Arm::East => (3.724_02 - phi + 0.008_047 * (phi + 0.878_51).cos()) / BOARD_WIDTH,
        Arm::West => (0.573_231 + phi - 0.004_6 * (phi + 0.057_21).cos()) / BOARD_WIDTH,
    }
}

/// One excluded region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CutRegion {
    /// Open box `x0 < x < x1 && y0 < y < y1`
    Rect { x: [f64; 2], y: [f64; 2] },
    /// Diagonal band `offset[0] + slope·x < y < offset[1] + slope·x` for `x0 < x < x1`
    Strip {
        x: [f64; 2],
        slope: f64,
        offset: [f64; 2],
    },
    /// Box clipped to the side `a·x + b·y > c`
    Notch {
        x: [f64; 2],
        y: [f64; 2],
        a: f64,
        b: f64,
        c: f64,
    },
}

fn open(range: &[f64; 2], v: f64) -> bool {
    range[0] < v && v < range[1]
}

impl CutRegion {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            CutRegion::Rect { x: xr, y: yr } => open(xr, x) && open(yr, y),
            CutRegion::Strip {
                x: xr,
                slope,
                offset,
            } => {
                let base = slope * x;
                open(xr, x) && offset[0] + base < y && y < offset[1] + base
            }
            CutRegion::Notch {
                x: xr,
                y: yr,
                a,
                b,
                c,
            } => open(xr, x) && open(yr, y) && a * x + b * y > *c,
        }
    }

    fn is_well_formed(&self) -> bool {
        let ordered = |r: &[f64; 2]| r[0].is_finite() && r[1].is_finite() && r[0] < r[1];
        match self {
            CutRegion::Rect { x, y } => ordered(x) && ordered(y),
            CutRegion::Strip { x, slope, offset } => {
                ordered(x) && ordered(offset) && slope.is_finite()
            }
            CutRegion::Notch { x, y, a, b, c } => {
                ordered(x) && ordered(y) && [a, b, c].iter().all(|v| v.is_finite())
            }
        }
    }
}

/// Acceptance and excluded regions of one (detector, arm) surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceCuts {
    pub detector: Detector,
    pub arm: Arm,
    /// Inclusive acceptance in x
    pub x_range: [f64; 2],
    /// Inclusive acceptance in y
    pub y_range: [f64; 2],
    #[serde(default)]
    pub regions: Vec<CutRegion>,
}

impl SurfaceCuts {
    pub fn new(detector: Detector, arm: Arm, x_range: [f64; 2], y_range: [f64; 2]) -> Self {
        Self {
            detector,
            arm,
            x_range,
            y_range,
            regions: Vec::new(),
        }
    }

    pub fn with_regions(mut self, regions: Vec<CutRegion>) -> Self {
        self.regions = regions;
        self
    }

    fn accepts(&self, x: f64, y: f64) -> bool {
        (self.x_range[0]..=self.x_range[1]).contains(&x)
            && (self.y_range[0]..=self.y_range[1]).contains(&y)
    }

    pub fn is_excluded(&self, x: f64, y: f64) -> bool {
        if !(x.is_finite() && y.is_finite()) || !self.accepts(x, y) {
            return true;
        }
        self.regions.iter().any(|r| r.contains(x, y))
    }
}

/// Complete dead-area table for one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadAreaTable {
    #[serde(rename = "surface", default)]
    pub surfaces: Vec<SurfaceCuts>,
}

impl DeadAreaTable {
    pub fn new(surfaces: Vec<SurfaceCuts>) -> Self {
        Self { surfaces }
    }

    pub fn surface(&self, detector: Detector, arm: Arm) -> Option<&SurfaceCuts> {
        self.surfaces
            .iter()
            .find(|s| s.detector == detector && s.arm == arm)
    }

    /// Whether the point must be discarded
    ///
    /// Fail-closed: a surface missing from the table, a point outside its
    /// acceptance, or a non-finite coordinate all count as excluded.
    pub fn is_excluded(&self, detector: Detector, point: &CutPoint) -> bool {
        match self.surface(detector, point.arm) {
            Some(surface) => surface.is_excluded(point.x, point.y),
            None => true,
        }
    }

    /// Read a custom table from TOML
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read dead-area table {}: {}", path.display(), e))
        })?;
        let table: DeadAreaTable = toml::from_str(&content).map_err(|e| Error::TomlParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        table.validate(path)?;
        Ok(table)
    }

    fn validate(&self, origin: &Path) -> Result<()> {
        for surface in &self.surfaces {
            let ordered = |r: &[f64; 2]| r[0] < r[1];
            if !ordered(&surface.x_range) || !ordered(&surface.y_range) {
                return Err(Error::Config(format!(
                    "{}: acceptance of {} {} is empty",
                    origin.display(),
                    surface.detector,
                    surface.arm
                )));
            }
            if let Some(i) = surface.regions.iter().position(|r| !r.is_well_formed()) {
                return Err(Error::Config(format!(
                    "{}: region {} of {} {} is malformed",
                    origin.display(),
                    i,
                    surface.detector,
                    surface.arm
                )));
            }
        }
        Ok(())
    }

    /// Number of excluded regions across all surfaces
    pub fn region_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.regions.len()).sum()
    }
}

static RUN14_HEAU200: Lazy<Arc<DeadAreaTable>> = Lazy::new(|| Arc::new(run14::table()));
static RUN16_DAU200: Lazy<Arc<DeadAreaTable>> = Lazy::new(|| Arc::new(run16::table()));

/// Dataset whose dead-area table is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dataset {
    /// 2014 ³He+Au at 200 GeV
    Run14HeAu200,
    /// 2016 d+Au at 200 GeV
    Run16DAu200,
    /// Table read from a TOML file
    Custom(PathBuf),
}

impl Dataset {
    /// Resolve the configured dataset; a custom table path wins over the name
    pub fn resolve(name: &str, table_override: Option<&Path>) -> Result<Self> {
        match table_override {
            Some(path) => Ok(Dataset::Custom(path.to_path_buf())),
            None => name.parse(),
        }
    }

    /// Shared handle to the dataset's table
    pub fn table(&self) -> Result<Arc<DeadAreaTable>> {
        let table = match self {
            Dataset::Run14HeAu200 => Arc::clone(&RUN14_HEAU200),
            Dataset::Run16DAu200 => Arc::clone(&RUN16_DAU200),
            Dataset::Custom(path) => Arc::new(DeadAreaTable::from_toml_file(path)?),
        };
        info!(
            "Dead-area table for {}: {} surfaces, {} regions",
            self,
            table.surfaces.len(),
            table.region_count()
        );
        Ok(table)
    }
}

impl FromStr for Dataset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "run14heau200" | "run14heau" | "run14" => Ok(Dataset::Run14HeAu200),
            "run16dau200" | "run16dau" | "run16" => Ok(Dataset::Run16DAu200),
            other => Err(Error::UnknownDataset(other.to_string())),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Run14HeAu200 => f.write_str("run14heau200"),
            Dataset::Run16DAu200 => f.write_str("run16dau200"),
            Dataset::Custom(path) => write!(f, "custom:{}", path.display()),
        }
    }
}

/// Helpers shared by the literal tables
pub(crate) mod build {
    use super::CutRegion;

    pub fn rect(x0: f64, x1: f64, y0: f64, y1: f64) -> CutRegion {
        CutRegion::Rect {
            x: [x0, x1],
            y: [y0, y1],
        }
    }

    /// Band of half-width `hw` around the line through (`xc`, `yc`)
    pub fn strip(x0: f64, x1: f64, xc: f64, yc: f64, slope: f64, hw: f64) -> CutRegion {
        let centre = yc - slope * xc;
        CutRegion::Strip {
            x: [x0, x1],
            slope,
            offset: [centre - hw, centre + hw],
        }
    }

    /// Box corner cut away above the line through (`xa`, `ya`) and (`xb`, `yb`)
    pub fn notch(x: [f64; 2], y: [f64; 2], (xa, ya): (f64, f64), (xb, yb): (f64, f64)) -> CutRegion {
        // a·x + b·y > c selects the side above the line when xb > xa
        let a = -(yb - ya);
        let b = xb - xa;
        let c = a * xa + b * ya;
        CutRegion::Notch { x, y, a, b, c }
    }
}
