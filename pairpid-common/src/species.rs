//! Particle species and per-detector identification labels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Charged species the identifier can assign
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Pion,
    Kaon,
    Proton,
    Electron,
}

impl Species {
    pub const ALL: [Species; 4] = [
        Species::Pion,
        Species::Kaon,
        Species::Proton,
        Species::Electron,
    ];

    /// Rest mass in GeV/c²
    pub fn mass(&self) -> f64 {
        match self {
            Species::Pion => 0.139_570,
            Species::Kaon => 0.493_677,
            Species::Proton => 0.938_272,
            Species::Electron => 0.000_511,
        }
    }

    pub fn mass_squared(&self) -> f64 {
        let m = self.mass();
        m * m
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Pion => "pion",
            Species::Kaon => "kaon",
            Species::Proton => "proton",
            Species::Electron => "electron",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pion" | "pi" => Ok(Species::Pion),
            "kaon" | "k" => Ok(Species::Kaon),
            "proton" | "p" => Ok(Species::Proton),
            "electron" | "e" => Ok(Species::Electron),
            other => Err(format!("unknown species '{other}'")),
        }
    }
}

/// Outcome label of one detector's identification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesLabel {
    Pion,
    Kaon,
    Proton,
    Electron,
    /// No usable hit, or identification suppressed
    NoSignal,
    /// Valid hit whose discriminant could not be formed
    Junk,
}

impl SpeciesLabel {
    /// Stable index for label histograms
    pub fn index(&self) -> usize {
        match self {
            SpeciesLabel::Pion => 0,
            SpeciesLabel::Kaon => 1,
            SpeciesLabel::Proton => 2,
            SpeciesLabel::Electron => 3,
            SpeciesLabel::NoSignal => 4,
            SpeciesLabel::Junk => 5,
        }
    }

    pub fn species(&self) -> Option<Species> {
        match self {
            SpeciesLabel::Pion => Some(Species::Pion),
            SpeciesLabel::Kaon => Some(Species::Kaon),
            SpeciesLabel::Proton => Some(Species::Proton),
            SpeciesLabel::Electron => Some(Species::Electron),
            SpeciesLabel::NoSignal | SpeciesLabel::Junk => None,
        }
    }
}

impl From<Species> for SpeciesLabel {
    fn from(species: Species) -> Self {
        match species {
            Species::Pion => SpeciesLabel::Pion,
            Species::Kaon => SpeciesLabel::Kaon,
            Species::Proton => SpeciesLabel::Proton,
            Species::Electron => SpeciesLabel::Electron,
        }
    }
}

/// A species label together with its identification weight
///
/// Fields are private so the invariants hold by construction: the weight
/// is always inside [0, 1], and `NoSignal`/`Junk` always carry 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Identification {
    label: SpeciesLabel,
    weight: f64,
}

impl Identification {
    /// Label a species with a weight; a weight that clamps to 0 (or is NaN)
    /// degrades the label to `NoSignal`.
    pub fn new(species: Species, weight: f64) -> Self {
        let weight = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
        if weight > 0.0 {
            Self {
                label: species.into(),
                weight,
            }
        } else {
            Self::no_signal()
        }
    }

    pub fn no_signal() -> Self {
        Self {
            label: SpeciesLabel::NoSignal,
            weight: 0.0,
        }
    }

    pub fn junk() -> Self {
        Self {
            label: SpeciesLabel::Junk,
            weight: 0.0,
        }
    }

    pub fn label(&self) -> SpeciesLabel {
        self.label
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_identified(&self) -> bool {
        self.weight > 0.0
    }
}

impl Default for Identification {
    fn default() -> Self {
        Self::no_signal()
    }
}
