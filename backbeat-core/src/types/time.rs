//! Meter and bar-grid timing
//!
//! Slot positions inside a bar are kept as exact rationals (beats from the bar
//! start) so a 6-slot grid in 3/4 and an 8-slot grid in 4/4 land on the same
//! beat fractions every bar; conversion to seconds happens once, at the end.

use num_rational::Ratio;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exact beat position inside a bar
pub type Beats = Ratio<i64>;

/// Time signature of a style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Meter {
    #[serde(rename = "3/4")]
    ThreeFour,
    #[default]
    #[serde(rename = "4/4")]
    FourFour,
}

impl Meter {
    pub fn beats_per_bar(&self) -> u8 {
        match self {
            Meter::ThreeFour => 3,
            Meter::FourFour => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Meter::ThreeFour => "3/4",
            Meter::FourFour => "4/4",
        }
    }

    /// Parse "3/4" or "4/4"; anything else is treated as 4/4
    pub fn from_name(s: &str) -> Meter {
        match s.trim() {
            "3/4" => Meter::ThreeFour,
            _ => Meter::FourFour,
        }
    }

    /// Bar length in seconds at a tempo
    pub fn bar_seconds(&self, bpm: f64) -> f64 {
        seconds_per_beat(bpm) * f64::from(self.beats_per_bar())
    }

    /// Beat offset of slot `position` on a grid of `slots` equal slots
    pub fn slot_offset(&self, position: u8, slots: u8) -> Beats {
        Ratio::new(
            i64::from(position) * i64::from(self.beats_per_bar()),
            i64::from(slots.max(1)),
        )
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[inline]
pub fn seconds_per_beat(bpm: f64) -> f64 {
    60.0 / bpm
}

/// Convert a rational beat count to seconds at a tempo
#[inline]
pub fn beats_to_seconds(beats: Beats, bpm: f64) -> f64 {
    beats.to_f64().unwrap_or(0.0) * seconds_per_beat(bpm)
}
