//! Percussion sound types and General MIDI mappings
//!
//! Percussion pattern events name their sound directly as the action
//! ("kick", "snare", "shaker"); `PercSound` is the typed form of that name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Percussion sound with General MIDI mappings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PercSound {
    /// Bass drum / Kick (GM 36)
    Kick,
    /// Acoustic snare (GM 38)
    Snare,
    /// Closed hi-hat (GM 42)
    HiHat,
    /// Open hi-hat (GM 46)
    OpenHiHat,
    /// Shaker (GM 82)
    Shaker,
    /// Hand clap (GM 39)
    Clap,
    /// Rimshot / Side stick (GM 37)
    Rim,
    /// Low tom (GM 45)
    Tom,
    /// Cowbell (GM 56)
    Cowbell,
}

impl PercSound {
    /// Parse a percussion sound from its pattern name (case-insensitive)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kick" | "k" | "bd" => Some(PercSound::Kick),
            "snare" | "sn" | "sd" => Some(PercSound::Snare),
            "hihat" | "hh" | "ch" => Some(PercSound::HiHat),
            "openhat" | "oh" => Some(PercSound::OpenHiHat),
            "shaker" | "shk" | "maracas" => Some(PercSound::Shaker),
            "clap" | "cp" => Some(PercSound::Clap),
            "rim" | "rs" => Some(PercSound::Rim),
            "tom" | "lt" => Some(PercSound::Tom),
            "cowbell" | "cb" => Some(PercSound::Cowbell),
            _ => None,
        }
    }

    /// General MIDI percussion note number (channel 10)
    pub fn midi_note(&self) -> u8 {
        match self {
            PercSound::Kick => 36,
            PercSound::Snare => 38,
            PercSound::HiHat => 42,
            PercSound::OpenHiHat => 46,
            PercSound::Shaker => 82,
            PercSound::Clap => 39,
            PercSound::Rim => 37,
            PercSound::Tom => 45,
            PercSound::Cowbell => 56,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PercSound::Kick => "kick",
            PercSound::Snare => "snare",
            PercSound::HiHat => "hihat",
            PercSound::OpenHiHat => "openhat",
            PercSound::Shaker => "shaker",
            PercSound::Clap => "clap",
            PercSound::Rim => "rim",
            PercSound::Tom => "tom",
            PercSound::Cowbell => "cowbell",
        }
    }
}

impl fmt::Display for PercSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
