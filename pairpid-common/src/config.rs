//! Analysis configuration loading and resolution
//!
//! One `AnalysisConfig` is built at startup and handed by reference to every
//! component; nothing reads configuration from ambient global state.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `PAIRPID_CONFIG` environment variable
//! 3. `<user config dir>/pairpid/config.toml` if it exists
//! 4. Compiled defaults (fallback)

use crate::detector::{Charge, Detector};
use crate::polynomial;
use crate::species::Species;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "PAIRPID_CONFIG";

/// Dataset used when the configuration does not name one
pub const DEFAULT_DATASET: &str = "run14heau200";

/// Momentum range (GeV/c) over which polynomial band sigmas must stay positive
pub const BAND_MOMENTUM_RANGE: [f64; 2] = [0.05, 20.0];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the `tracing` filter (`RUST_LOG` still wins)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Residual calibration inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Directory relative filenames in `files` are resolved against
    pub directory: Option<PathBuf>,
    /// Lower clamp of the fitted curves (GeV/c)
    pub pt_floor: f64,
    /// Upper clamp of the fitted curves (GeV/c); curves are flat above it
    pub pt_ceiling: f64,
    /// Calibration table per detector; detectors absent here use the fallback
    pub files: BTreeMap<Detector, PathBuf>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            directory: None,
            pt_floor: 0.2,
            pt_ceiling: 5.0,
            files: BTreeMap::new(),
        }
    }
}

impl CalibrationConfig {
    /// Full path of a detector's calibration table, if one is configured
    pub fn file_for(&self, detector: Detector) -> Option<PathBuf> {
        let file = self.files.get(&detector)?;
        match &self.directory {
            Some(dir) if file.is_relative() => Some(dir.join(file)),
            _ => Some(file.clone()),
        }
    }
}

/// Matching window of one detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWindowConfig {
    /// Bound on sqrt(sdphi² + sdz²)
    pub radius: f64,
    /// Above this pT every live hit is accepted (GeV/c)
    pub pt_ceiling: f64,
}

impl Default for MatchWindowConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            pt_ceiling: 10.0,
        }
    }
}

/// Which track quantity a band model is evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscriminantKind {
    /// m² from time of flight and path length
    MassSquared,
    /// Deposited energy over momentum
    EnergyOverMomentum,
}

/// One species band of a polynomial model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialBandConfig {
    pub species: Species,
    /// Restrict the band to one charge; `None` applies to both
    #[serde(default)]
    pub charge: Option<Charge>,
    /// Mean coefficients, `Σ c_i p^i`
    pub mean: Vec<f64>,
    /// Sigma coefficients, `Σ c_i p^i`
    pub sigma: Vec<f64>,
}

/// Species band model of one identifying detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BandModelConfig {
    /// Mean at the species mass²; sigma from the time-of-flight m² resolution
    TofMassSquared {
        /// Angular resolution (mrad)
        sigma_alpha: f64,
        /// Multiple-scattering term (mrad GeV/c)
        sigma_ms: f64,
        /// Timing resolution (ns)
        sigma_t: f64,
        /// Magnetic field integral constant (mrad GeV/c)
        k1: f64,
        /// Nominal flight path (cm)
        path_length: f64,
    },
    /// Explicit mean/sigma polynomials per species
    Polynomial {
        discriminant: DiscriminantKind,
        bands: Vec<PolynomialBandConfig>,
    },
}

impl BandModelConfig {
    pub fn discriminant(&self) -> DiscriminantKind {
        match self {
            BandModelConfig::TofMassSquared { .. } => DiscriminantKind::MassSquared,
            BandModelConfig::Polynomial { discriminant, .. } => *discriminant,
        }
    }
}

/// Species identification settings of one detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationConfig {
    /// Candidate window around a species mean, in sigma
    #[serde(default = "default_extraction_sigma")]
    pub extraction_sigma: f64,
    /// Competing species closer than this (in their sigma) suppress the label
    #[serde(default = "default_veto_sigma")]
    pub veto_sigma: f64,
    /// Species competing on this detector
    #[serde(default = "default_hadrons")]
    pub species: Vec<Species>,
    pub model: BandModelConfig,
}

fn default_extraction_sigma() -> f64 {
    2.0
}

fn default_veto_sigma() -> f64 {
    2.5
}

fn default_hadrons() -> Vec<Species> {
    vec![Species::Pion, Species::Kaon, Species::Proton]
}

impl IdentificationConfig {
    /// Time-of-flight wall defaults (≈120 ps timing)
    pub fn tof_default() -> Self {
        Self {
            extraction_sigma: default_extraction_sigma(),
            veto_sigma: default_veto_sigma(),
            species: default_hadrons(),
            model: BandModelConfig::TofMassSquared {
                sigma_alpha: 0.835,
                sigma_ms: 0.86,
                sigma_t: 0.12,
                k1: 87.0,
                path_length: 500.0,
            },
        }
    }

    /// Calorimeter timing defaults (≈400 ps timing)
    pub fn emc_default() -> Self {
        Self {
            extraction_sigma: default_extraction_sigma(),
            veto_sigma: default_veto_sigma(),
            species: default_hadrons(),
            model: BandModelConfig::TofMassSquared {
                sigma_alpha: 0.835,
                sigma_ms: 0.86,
                sigma_t: 0.40,
                k1: 87.0,
                path_length: 510.0,
            },
        }
    }
}

/// Arm co-location requirement for pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmPairing {
    Any,
    SameArm,
}

/// One empirically measured ghost band
///
/// Every configured condition must hold for the band to match. Differences
/// are taken between the two legs on `plane`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhostBandConfig {
    pub name: String,
    /// Detector whose positions are compared (`dc` uses the track itself)
    pub plane: Detector,
    /// Band applies only for |Δα| below this (rad)
    pub dalpha_max: f64,
    /// Centre of the Δφ band per unit Δα
    #[serde(default)]
    pub phi_slope: f64,
    /// |Δφ − slope·Δα| below this matches (rad)
    #[serde(default)]
    pub phi_half_width: Option<f64>,
    /// |Δz| below this matches (cm)
    #[serde(default)]
    pub dz_max: Option<f64>,
    /// |Δt| below this matches (ns)
    #[serde(default)]
    pub dtof_max: Option<f64>,
}

/// Pair combination settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Species hypothesis for the positive leg
    pub positive: Species,
    /// Species hypothesis for the negative leg
    pub negative: Species,
    pub arm_pairing: ArmPairing,
    /// Sign of the magnetic field, used for the sailor/cowboy label
    pub field_polarity: i8,
    pub ghost_bands: Vec<GhostBandConfig>,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            positive: Species::Kaon,
            negative: Species::Pion,
            arm_pairing: ArmPairing::SameArm,
            field_polarity: 1,
            ghost_bands: default_ghost_bands(),
        }
    }
}

/// Ghost bands measured on the drift chamber, PC3 and the TOF walls
pub fn default_ghost_bands() -> Vec<GhostBandConfig> {
    vec![
        GhostBandConfig {
            name: "dc_shared_hits".to_string(),
            plane: Detector::Dc,
            dalpha_max: 0.10,
            phi_slope: 0.13,
            phi_half_width: Some(0.015),
            dz_max: Some(6.0),
            dtof_max: None,
        },
        GhostBandConfig {
            name: "pc3_shared_cluster".to_string(),
            plane: Detector::Pc3,
            dalpha_max: 0.05,
            phi_slope: 0.0,
            phi_half_width: Some(0.010),
            dz_max: Some(3.0),
            dtof_max: None,
        },
        GhostBandConfig {
            name: "tofe_shared_slab".to_string(),
            plane: Detector::TofE,
            dalpha_max: 0.08,
            phi_slope: 0.0,
            phi_half_width: Some(0.010),
            dz_max: Some(5.0),
            dtof_max: Some(0.2),
        },
        GhostBandConfig {
            name: "tofw_shared_strip".to_string(),
            plane: Detector::TofW,
            dalpha_max: 0.08,
            phi_slope: 0.0,
            phi_half_width: Some(0.008),
            dz_max: Some(4.0),
            dtof_max: Some(0.2),
        },
    ]
}

/// Dead-area table selection override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadAreaConfig {
    /// TOML file with a custom table; takes precedence over `dataset`
    pub table: Option<PathBuf>,
}

/// Complete analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Dataset name selecting the dead-area table
    pub dataset: String,
    /// Worker threads; `None` uses the available parallelism
    pub threads: Option<usize>,
    /// Events per worker shard
    pub shard_size: usize,
    pub logging: LoggingConfig,
    pub calibration: CalibrationConfig,
    /// Per-detector windows; entries in a file replace the default entry only
    #[serde(deserialize_with = "matching_over_defaults")]
    pub matching: BTreeMap<Detector, MatchWindowConfig>,
    /// Per-detector band models; entries in a file replace the default entry only
    #[serde(deserialize_with = "identification_over_defaults")]
    pub identification: BTreeMap<Detector, IdentificationConfig>,
    pub pairing: PairingConfig,
    pub dead_area: DeadAreaConfig,
    /// Analyses to run, by name
    pub analyses: Vec<String>,
}

fn default_matching() -> BTreeMap<Detector, MatchWindowConfig> {
    Detector::MATCHING
        .iter()
        .map(|d| (*d, MatchWindowConfig::default()))
        .collect()
}

fn default_identification() -> BTreeMap<Detector, IdentificationConfig> {
    let mut identification = BTreeMap::new();
    identification.insert(Detector::TofE, IdentificationConfig::tof_default());
    identification.insert(Detector::TofW, IdentificationConfig::tof_default());
    identification.insert(Detector::Emc, IdentificationConfig::emc_default());
    identification
}

fn matching_over_defaults<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<Detector, MatchWindowConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut merged = default_matching();
    merged.extend(BTreeMap::<Detector, MatchWindowConfig>::deserialize(deserializer)?);
    Ok(merged)
}

fn identification_over_defaults<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<Detector, IdentificationConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut merged = default_identification();
    merged.extend(BTreeMap::<Detector, IdentificationConfig>::deserialize(deserializer)?);
    Ok(merged)
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            threads: None,
            shard_size: 64,
            logging: LoggingConfig::default(),
            calibration: CalibrationConfig::default(),
            matching: default_matching(),
            identification: default_identification(),
            pairing: PairingConfig::default(),
            dead_area: DeadAreaConfig::default(),
            analyses: vec!["invariant_mass".to_string(), "single_track".to_string()],
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content).map_err(|e| Error::TomlParse {
            path: origin.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content, path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Worker count after applying the default
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Matching window of a detector, falling back to the default window
    pub fn match_window(&self, detector: Detector) -> MatchWindowConfig {
        self.matching.get(&detector).copied().unwrap_or_default()
    }

    /// Check every value the classifiers rely on; fails on the first problem
    pub fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() && self.dead_area.table.is_none() {
            return Err(Error::Config("dataset must not be empty".to_string()));
        }
        if self.threads == Some(0) {
            return Err(Error::Config("threads must be at least 1".to_string()));
        }
        if self.shard_size == 0 {
            return Err(Error::Config("shard_size must be at least 1".to_string()));
        }

        let cal = &self.calibration;
        if !(cal.pt_floor > 0.0 && cal.pt_ceiling > cal.pt_floor) {
            return Err(Error::Config(format!(
                "calibration requires 0 < pt_floor < pt_ceiling (got {} and {})",
                cal.pt_floor, cal.pt_ceiling
            )));
        }
        if let Some(detector) = cal.files.keys().find(|d| d.matching_index().is_none()) {
            return Err(Error::Config(format!(
                "calibration.files.{detector}: detector has no residuals"
            )));
        }

        for (detector, window) in &self.matching {
            if !(window.radius.is_finite() && window.radius > 0.0) {
                return Err(Error::Config(format!(
                    "matching.{detector}.radius must be positive (got {})",
                    window.radius
                )));
            }
            if !(window.pt_ceiling > 0.0) {
                return Err(Error::Config(format!(
                    "matching.{detector}.pt_ceiling must be positive (got {})",
                    window.pt_ceiling
                )));
            }
        }

        for (detector, id) in &self.identification {
            validate_identification(*detector, id)?;
        }

        if !matches!(self.pairing.field_polarity, 1 | -1) {
            return Err(Error::Config(format!(
                "pairing.field_polarity must be +1 or -1 (got {})",
                self.pairing.field_polarity
            )));
        }
        for band in &self.pairing.ghost_bands {
            validate_ghost_band(band)?;
        }

        debug!("Configuration validated");
        Ok(())
    }
}

fn validate_identification(detector: Detector, id: &IdentificationConfig) -> Result<()> {
    let field = format!("identification.{detector}");
    if !(id.extraction_sigma > 0.0 && id.veto_sigma > 0.0) {
        return Err(Error::Config(format!(
            "{field}: extraction_sigma and veto_sigma must be positive"
        )));
    }
    if id.species.is_empty() {
        return Err(Error::Config(format!("{field}: species list is empty")));
    }
    match &id.model {
        BandModelConfig::TofMassSquared {
            sigma_alpha,
            sigma_ms,
            sigma_t,
            k1,
            path_length,
        } => {
            let all_positive = [*sigma_alpha, *sigma_ms, *sigma_t, *k1, *path_length]
                .iter()
                .all(|v| v.is_finite() && *v > 0.0);
            if !all_positive {
                return Err(Error::Config(format!(
                    "{field}: time-of-flight resolution parameters must be positive"
                )));
            }
        }
        BandModelConfig::Polynomial { bands, .. } => {
            for species in &id.species {
                for charge in Charge::ALL {
                    let covered = bands
                        .iter()
                        .any(|b| b.species == *species && b.charge.map_or(true, |c| c == charge));
                    if !covered {
                        return Err(Error::Config(format!(
                            "{field}: no band configured for {species} with charge {charge}"
                        )));
                    }
                }
            }
            for band in bands {
                if band.mean.is_empty() || band.sigma.is_empty() {
                    return Err(Error::Config(format!(
                        "{field}: band for {} needs mean and sigma coefficients",
                        band.species
                    )));
                }
                if !band.mean.iter().chain(&band.sigma).all(|c| c.is_finite()) {
                    return Err(Error::Config(format!(
                        "{field}: band for {} has a non-finite coefficient",
                        band.species
                    )));
                }
                let [low, high] = BAND_MOMENTUM_RANGE;
                if let Some(p) = polynomial::first_non_positive(&band.sigma, low, high) {
                    return Err(Error::Config(format!(
                        "{field}: sigma of the {} band is not positive at p = {:.3} GeV/c",
                        band.species, p
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_ghost_band(band: &GhostBandConfig) -> Result<()> {
    if !(band.dalpha_max > 0.0) {
        return Err(Error::Config(format!(
            "ghost band '{}': dalpha_max must be positive",
            band.name
        )));
    }
    if band.phi_half_width.is_none() && band.dz_max.is_none() && band.dtof_max.is_none() {
        return Err(Error::Config(format!(
            "ghost band '{}' has no phi, z or time condition",
            band.name
        )));
    }
    Ok(())
}

/// Write a configuration back out as TOML
pub fn write_toml_config(config: &AnalysisConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolves which configuration file to load
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Path to load, or `None` when the compiled defaults apply
    pub fn resolve(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: user config file, only when present
        let user_config = dirs::config_dir().map(|d| d.join("pairpid").join("config.toml"));
        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Load the resolved file, or the compiled defaults
    ///
    /// An explicitly named file (CLI or environment) that is missing is an
    /// error, never a silent fallback to defaults.
    pub fn load(&self) -> Result<AnalysisConfig> {
        match self.resolve() {
            Some(path) => AnalysisConfig::load(&path),
            None => {
                info!("No configuration file found, using compiled defaults");
                let config = AnalysisConfig::default();
                config.validate()?;
                Ok(config)
            }
        }
    }
}
