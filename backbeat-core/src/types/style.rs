//! Styles and groove presets
//!
//! A style names, per track, which pattern plays for the verse, the chorus
//! variants, the fills and the endings. Variant slots accept either a single
//! pattern id or a map of named variants, matching how style libraries are
//! written by hand.

use crate::types::settings::{EndingType, FillIntensity, RightHand, Track};
use crate::types::time::Meter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chorus pattern: one id, or one per right-hand variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChorusVariants {
    Single(String),
    ByHand {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        down: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        up: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auto: Option<String>,
    },
}

impl ChorusVariants {
    /// Pattern id for a right-hand variant. `auto` prefers the down-stroke figure.
    pub fn pick(&self, hand: RightHand) -> Option<&str> {
        match self {
            ChorusVariants::Single(id) => Some(id),
            ChorusVariants::ByHand { down, up, auto } => {
                let (down, up, auto) = (down.as_deref(), up.as_deref(), auto.as_deref());
                match hand {
                    RightHand::Down => down.or(auto).or(up),
                    RightHand::Up => up.or(auto).or(down),
                    RightHand::Auto => down.or(auto).or(up),
                }
            }
        }
    }
}

/// Fill pattern: one id, or one per intensity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillVariants {
    Single(String),
    ByIntensity {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        soft: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hard: Option<String>,
    },
}

impl FillVariants {
    pub fn pick(&self, intensity: FillIntensity) -> Option<&str> {
        match self {
            FillVariants::Single(id) => Some(id),
            FillVariants::ByIntensity { soft, hard } => {
                let (soft, hard) = (soft.as_deref(), hard.as_deref());
                match intensity {
                    FillIntensity::Soft => soft.or(hard),
                    FillIntensity::Hard => hard.or(soft),
                }
            }
        }
    }
}

/// Ending pattern: one id, or one per ending type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndingVariants {
    Single(String),
    ByType {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        short: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        long: Option<String>,
    },
}

impl EndingVariants {
    pub fn pick(&self, ending: EndingType) -> Option<&str> {
        match self {
            EndingVariants::Single(id) => Some(id),
            EndingVariants::ByType { short, long } => {
                let (short, long) = (short.as_deref(), long.as_deref());
                match ending {
                    EndingType::Short => short.or(long),
                    EndingType::Long => long.or(short),
                }
            }
        }
    }
}

/// Pattern ids one track plays within a style
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackPatterns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chorus: Option<ChorusVariants>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<FillVariants>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending: Option<EndingVariants>,
}

impl TrackPatterns {
    /// Every pattern id this track can reach
    pub fn pattern_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        ids.extend(self.verse.as_deref());
        match &self.chorus {
            Some(ChorusVariants::Single(id)) => ids.push(id.as_str()),
            Some(ChorusVariants::ByHand { down, up, auto }) => {
                ids.extend([down, up, auto].into_iter().filter_map(|v| v.as_deref()))
            }
            None => {}
        }
        match &self.fill {
            Some(FillVariants::Single(id)) => ids.push(id.as_str()),
            Some(FillVariants::ByIntensity { soft, hard }) => {
                ids.extend([soft, hard].into_iter().filter_map(|v| v.as_deref()))
            }
            None => {}
        }
        match &self.ending {
            Some(EndingVariants::Single(id)) => ids.push(id.as_str()),
            Some(EndingVariants::ByType { short, long }) => {
                ids.extend([short, long].into_iter().filter_map(|v| v.as_deref()))
            }
            None => {}
        }
        ids
    }
}

pub fn default_velocity_cycle() -> Vec<f64> {
    vec![1.00, 0.99, 1.01, 0.99]
}

/// A style's own timing and dynamics feel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrooveBase {
    #[serde(default)]
    pub layback_ms: f64,
    #[serde(default)]
    pub swing_ms: f64,
    /// Per-slot timing offset in ms for 8-slot patterns
    #[serde(rename = "feel8", default)]
    pub feel_ms: BTreeMap<u8, f64>,
    #[serde(rename = "cycleVel", default = "default_velocity_cycle")]
    pub velocity_cycle: Vec<f64>,
}

impl Default for GrooveBase {
    fn default() -> Self {
        GrooveBase {
            layback_ms: 0.0,
            swing_ms: 0.0,
            feel_ms: BTreeMap::new(),
            velocity_cycle: default_velocity_cycle(),
        }
    }
}

fn default_ending_bars() -> u8 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub meter: Meter,
    #[serde(default = "default_ending_bars")]
    pub ending_bars: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guitar: Option<TrackPatterns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piano: Option<TrackPatterns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perc: Option<TrackPatterns>,
    #[serde(default)]
    pub groove_base: GrooveBase,
}

impl Style {
    pub fn track(&self, track: Track) -> Option<&TrackPatterns> {
        match track {
            Track::Guitar => self.guitar.as_ref(),
            Track::Piano => self.piano.as_ref(),
            Track::Perc => self.perc.as_ref(),
        }
    }

    /// Number of ending bars, held to 1..=4
    pub fn ending_bar_count(&self) -> u8 {
        self.ending_bars.clamp(1, 4)
    }
}

fn unity() -> f64 {
    1.0
}

/// Named feel layered on top of a style's groove base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroovePreset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub layback_ms_add: f64,
    #[serde(default)]
    pub swing_ms_add: f64,
    #[serde(default = "unity")]
    pub cycle_vel_mul: f64,
    #[serde(default = "unity")]
    pub accent_mul: f64,
}

impl Default for GroovePreset {
    fn default() -> Self {
        GroovePreset {
            name: String::new(),
            layback_ms_add: 0.0,
            swing_ms_add: 0.0,
            cycle_vel_mul: 1.0,
            accent_mul: 1.0,
        }
    }
}
