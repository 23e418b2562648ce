//! Pair identification tiers

use crate::track_classifier::ClassifiedTrack;
use pairpid_common::DetectorKind;
use serde::Serialize;
use std::fmt;

/// Identification confidence of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PidTier {
    /// Both legs passed geometry; no species requirement
    NoPid,
    /// At least one leg identified
    SinglePid,
    /// Both legs identified
    DoublePid,
    /// Both legs identified by time of flight
    TofDoublePid,
    /// Both legs identified by the calorimeter
    EmcDoublePid,
}

impl PidTier {
    pub const ALL: [PidTier; 5] = [
        PidTier::NoPid,
        PidTier::SinglePid,
        PidTier::DoublePid,
        PidTier::TofDoublePid,
        PidTier::EmcDoublePid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PidTier::NoPid => "nopid",
            PidTier::SinglePid => "singlepid",
            PidTier::DoublePid => "doublepid",
            PidTier::TofDoublePid => "tofdoublepid",
            PidTier::EmcDoublePid => "emcdoublepid",
        }
    }

    /// Position in `ALL`
    pub fn index(&self) -> usize {
        match self {
            PidTier::NoPid => 0,
            PidTier::SinglePid => 1,
            PidTier::DoublePid => 2,
            PidTier::TofDoublePid => 3,
            PidTier::EmcDoublePid => 4,
        }
    }

    /// Precedence when picking the primary tier; TOF beats EMC
    fn strength(&self) -> u8 {
        match self {
            PidTier::NoPid => 0,
            PidTier::SinglePid => 1,
            PidTier::DoublePid => 2,
            PidTier::EmcDoublePid => 3,
            PidTier::TofDoublePid => 4,
        }
    }

    /// Whether qualifying for this tier always means qualifying for `weaker`
    pub fn implies(&self, weaker: PidTier) -> bool {
        match weaker {
            PidTier::TofDoublePid | PidTier::EmcDoublePid => *self == weaker,
            _ => self.strength() >= weaker.strength(),
        }
    }

    /// Every tier the pair qualifies for, weakest first
    pub fn qualifying(positive: &ClassifiedTrack<'_>, negative: &ClassifiedTrack<'_>) -> Vec<PidTier> {
        let mut tiers = vec![PidTier::NoPid];
        let (pos, neg) = (positive.identified(), negative.identified());
        if pos || neg {
            tiers.push(PidTier::SinglePid);
        }
        if pos && neg {
            tiers.push(PidTier::DoublePid);
            let both = |kind| positive.identified_by(kind) && negative.identified_by(kind);
            if both(DetectorKind::TimeOfFlight) {
                tiers.push(PidTier::TofDoublePid);
            }
            if both(DetectorKind::Calorimeter) {
                tiers.push(PidTier::EmcDoublePid);
            }
        }
        tiers
    }

    /// Strongest of a set of qualifying tiers
    pub fn strongest(tiers: &[PidTier]) -> PidTier {
        tiers
            .iter()
            .copied()
            .max_by_key(PidTier::strength)
            .unwrap_or(PidTier::NoPid)
    }
}

impl fmt::Display for PidTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
