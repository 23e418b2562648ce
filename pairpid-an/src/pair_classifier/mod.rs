//! Pair combination and classification
//!
//! A positive and a negative classified track are combined under the
//! species hypothesis, then run through the vetoes in order:
//! 1. kinematics (invalid legs are an error, not a veto),
//! 2. ghost bands,
//! 3. arm co-location.
//!
//! Surviving pairs get a PID tier and a sailor/cowboy label.

mod ghost;
mod tier;

pub use ghost::{delta_phi, find_ghost, GhostBand};
pub use tier::PidTier;

use crate::kinematics::FourMomentum;
use crate::track_classifier::ClassifiedTrack;
use pairpid_common::config::{ArmPairing, PairingConfig};
use pairpid_common::{Arm, Charge};
use serde::Serialize;
use thiserror::Error;

/// Pair that could not be combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairError {
    /// A leg has no usable momentum or the legs are not oppositely charged
    #[error("invalid pair")]
    InvalidPair,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VetoReason {
    /// Inside the named ghost band
    Ghost(String),
    /// Legs in different arms while same-arm pairing is required
    OneArm,
}

/// Azimuthal ordering of the legs relative to their bending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairTopology {
    /// Legs bend towards each other
    Sailor,
    /// Legs bend away from each other
    Cowboy,
}

impl PairTopology {
    /// With positive polarity a positive track bends towards larger φ, so
    /// φ+ < φ− means the legs bend towards each other.
    pub fn from_azimuths(phi_positive: f64, phi_negative: f64, field_polarity: i8) -> Self {
        let dphi = delta_phi(phi_positive, phi_negative);
        if f64::from(field_polarity) * dphi < 0.0 {
            PairTopology::Sailor
        } else {
            PairTopology::Cowboy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PairTopology::Sailor => "sailor",
            PairTopology::Cowboy => "cowboy",
        }
    }
}

/// A classified pair
#[derive(Debug, Clone)]
pub struct PairRecord<'a> {
    pub positive: &'a ClassifiedTrack<'a>,
    pub negative: &'a ClassifiedTrack<'a>,
    /// Invariant mass under the species hypothesis (GeV/c²)
    pub mass: f64,
    /// Pair transverse momentum (GeV/c)
    pub pt: f64,
    /// Strongest qualifying tier
    pub tier: PidTier,
    /// Every qualifying tier, weakest first
    pub qualifying_tiers: Vec<PidTier>,
    /// Common arm of both legs, `None` for cross-arm pairs
    pub arm: Option<Arm>,
    pub topology: PairTopology,
}

#[derive(Debug, Clone)]
pub enum PairOutcome<'a> {
    Vetoed(VetoReason),
    Classified(PairRecord<'a>),
}

/// Combines oppositely charged tracks into classified pairs
pub struct PairClassifier {
    bands: Vec<GhostBand>,
    arm_pairing: ArmPairing,
    field_polarity: i8,
}

impl PairClassifier {
    pub fn new(config: &PairingConfig) -> Self {
        Self {
            bands: config.ghost_bands.iter().map(GhostBand::from_config).collect(),
            arm_pairing: config.arm_pairing,
            field_polarity: config.field_polarity,
        }
    }

    pub fn ghost_bands(&self) -> &[GhostBand] {
        &self.bands
    }

    pub fn classify<'a>(
        &self,
        positive: &'a ClassifiedTrack<'a>,
        negative: &'a ClassifiedTrack<'a>,
    ) -> Result<PairOutcome<'a>, PairError> {
        if positive.charge() != Charge::Positive || negative.charge() != Charge::Negative {
            return Err(PairError::InvalidPair);
        }
        let p_pos = FourMomentum::from_track(positive.track(), positive.hypothesis().mass())
            .ok_or(PairError::InvalidPair)?;
        let p_neg = FourMomentum::from_track(negative.track(), negative.hypothesis().mass())
            .ok_or(PairError::InvalidPair)?;
        let pair = p_pos + p_neg;

        if let Some(band) = find_ghost(&self.bands, positive.track(), negative.track()) {
            return Ok(PairOutcome::Vetoed(VetoReason::Ghost(band.name().to_string())));
        }

        let (arm_pos, arm_neg) = (positive.track().arm(), negative.track().arm());
        if self.arm_pairing == ArmPairing::SameArm && arm_pos != arm_neg {
            return Ok(PairOutcome::Vetoed(VetoReason::OneArm));
        }

        let qualifying_tiers = PidTier::qualifying(positive, negative);
        let tier = PidTier::strongest(&qualifying_tiers);
        let topology = PairTopology::from_azimuths(
            positive.track().phi0,
            negative.track().phi0,
            self.field_polarity,
        );

        Ok(PairOutcome::Classified(PairRecord {
            positive,
            negative,
            mass: pair.mass(),
            pt: pair.pt(),
            tier,
            qualifying_tiers,
            arm: (arm_pos == arm_neg).then_some(arm_pos),
            topology,
        }))
    }
}
