//! Common error types for pairpid
//!
//! Only configuration-class failures live here. Per-record problems
//! (malformed tracks, invalid pairs) are local enums in the analysis crate
//! and are counted, not propagated.

use crate::detector::{Axis, Charge, Detector};
use std::path::PathBuf;
use thiserror::Error;

/// Common result type for pairpid operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the pairpid crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML document could not be parsed
    #[error("TOML parse error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Calibration table is truncated or contains an unreadable token
    #[error("Malformed calibration file {path}: {detail}")]
    CalibrationFormat { path: PathBuf, detail: String },

    /// A fitted sigma curve evaluated to zero, a negative value or NaN
    #[error("Non-positive sigma for {detector} {axis} {charge} at pT = {pt:.3} GeV/c: {value}")]
    NonPositiveSigma {
        detector: Detector,
        axis: Axis,
        charge: Charge,
        pt: f64,
        value: f64,
    },

    /// Dataset name does not select any dead-area table
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// Accumulator quantity was filled without being booked
    #[error("Unknown accumulator quantity: {0}")]
    UnknownQuantity(String),

    /// Two cells with the same name disagree on binning
    #[error("Binning mismatch while merging {0}")]
    BinningMismatch(String),

    /// Invalid input value or record field
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
