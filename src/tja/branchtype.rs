//! Branch conditions.
//!
//! A branch condition decides how a player's performance in a branch section is turned
//! into points, and how the thresholds written in the chart are read.

use crate::event::{BranchScoring, BranchThresholds};

/// One in 24-bit fixed point.
const FIXED_ONE: f64 = (1 << 24) as f64;

/// Condition that decides which tier is played after a branch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BranchType {
    /// No condition; the player stays on the normal tier.
    #[default]
    None = 0,
    /// Accuracy over all notes, in percent.
    Accuracy = 1,
    /// Number of roll hits.
    Roll = 2,
    /// Accuracy over big notes only, in percent.
    AccuracyBig = 3,
}

/// How a threshold is written in the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThresholdClass {
    Integer,
    Percentage,
}

impl BranchType {
    /// Looks up a condition code (`p`, `b` or `r`).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "b" => Some(Self::AccuracyBig),
            "p" => Some(Self::Accuracy),
            "r" => Some(Self::Roll),
            _ => None,
        }
    }

    /// The condition with a numeric code, [`BranchType::None`] when invalid.
    #[must_use]
    pub const fn from_int(value: i32) -> Self {
        match value {
            1 => Self::Accuracy,
            2 => Self::Roll,
            3 => Self::AccuracyBig,
            _ => Self::None,
        }
    }

    /// Numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    const fn class(self) -> ThresholdClass {
        match self {
            Self::Accuracy | Self::AccuracyBig => ThresholdClass::Percentage,
            Self::None | Self::Roll => ThresholdClass::Integer,
        }
    }

    /// Points awarded per judgement in a section scored by this condition.
    #[must_use]
    pub const fn scoring(self) -> BranchScoring {
        match self {
            Self::None => BranchScoring::ZERO,
            Self::Accuracy => BranchScoring {
                good: 20,
                good_big: 20,
                ok: 10,
                ok_big: 10,
                roll: 1,
                bad: 0,
            },
            Self::AccuracyBig => BranchScoring {
                good: 0,
                good_big: 20,
                ok: 0,
                ok_big: 10,
                roll: 1,
                bad: 0,
            },
            Self::Roll => BranchScoring {
                good: 0,
                good_big: 0,
                ok: 0,
                ok_big: 0,
                roll: 1,
                bad: 0,
            },
        }
    }

    /// Converts a threshold as written in the chart to its stored form.
    ///
    /// Percentages become 24-bit fixed point, saturating at `i32::MAX`. Counts are
    /// truncated.
    #[must_use]
    pub fn convert_threshold(self, value: f64) -> i32 {
        match self.class() {
            ThresholdClass::Integer => value as i32,
            ThresholdClass::Percentage => {
                let fixed = value / 100.0 * FIXED_ONE;
                if fixed >= f64::from(i32::MAX) {
                    i32::MAX
                } else {
                    fixed as i32
                }
            }
        }
    }

    /// Computes the point thresholds of a section from the stored ones.
    ///
    /// `small_notes` and `big_notes` count the notes of the section.
    #[must_use]
    pub fn thresholds(
        self,
        raw: BranchThresholds,
        small_notes: u32,
        big_notes: u32,
    ) -> BranchThresholds {
        match self {
            Self::None => BranchThresholds {
                advanced: 1,
                master: 1,
            },
            Self::Roll => raw,
            Self::Accuracy | Self::AccuracyBig => {
                let scoring = self.scoring();
                let total = f64::from(scoring.good) * f64::from(small_notes)
                    + f64::from(scoring.good_big) * f64::from(big_notes);
                let scale = |fixed: i32| (f64::from(fixed) / FIXED_ONE * total) as i32;
                BranchThresholds {
                    advanced: scale(raw.advanced),
                    master: scale(raw.master),
                }
            }
        }
    }
}
