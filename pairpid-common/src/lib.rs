//! # pairpid Common Library
//!
//! Shared code for the pair-identification workspace including:
//! - Error taxonomy and result alias
//! - Analysis configuration loading and validation (TOML)
//! - Detector, axis, charge and arm enumerations
//! - Particle species and identification labels
//! - The reconstructed `Track` record model
//! - Power-series evaluation and positivity checks
//! - Timestamp helpers

pub mod config;
pub mod detector;
pub mod error;
pub mod polynomial;
pub mod species;
pub mod time;
pub mod track;

pub use detector::{Arm, Axis, Charge, Detector, DetectorKind};
pub use error::{Error, Result};
pub use species::{Identification, Species, SpeciesLabel};
pub use track::{DetectorResponse, Track, NO_HIT};
