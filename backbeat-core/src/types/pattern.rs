//! Accompaniment patterns
//!
//! A pattern is one bar of events on a grid of 6 or 8 equal slots. Patterns are
//! plain configuration records loaded from a library; the typed enums here
//! (`Role`, `Action`, `BassTone`, `StrumDirection`) are what the scheduler
//! matches on when it turns a pattern event into an outbound event.

use crate::types::perc::PercSound;
use crate::types::settings::Energy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Accent multiplier above which an event is flagged as accented for the renderer
pub const ACCENT_HINT_THRESHOLD: f64 = 1.05;

/// Harmonic role of a pattern event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Bass,
    #[default]
    Mid,
    Treble,
    Mute,
    Chord,
    Perc,
}

impl Role {
    /// Velocity weighting of the role in the mix
    pub fn velocity_multiplier(&self) -> f64 {
        match self {
            Role::Bass => 0.98,
            Role::Mid => 0.62,
            Role::Treble => 0.54,
            Role::Mute => 0.76,
            Role::Chord => 0.70,
            Role::Perc => 0.62,
        }
    }

    /// Micro-timing push: bass slightly ahead, treble slightly behind
    pub fn timing_offset_ms(&self) -> f64 {
        match self {
            Role::Bass => -2.0,
            Role::Treble => 1.0,
            _ => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Bass => "BASS",
            Role::Mid => "MID",
            Role::Treble => "TREBLE",
            Role::Mute => "MUTE",
            Role::Chord => "CHORD",
            Role::Perc => "PERC",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a pattern event does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    #[default]
    Pluck,
    PickString,
    Brush,
    Strum,
    MuteBrush,
    Mute,
    /// Piano left-hand bass note
    Bass,
    /// Piano right-hand chord
    ChordHit,
    /// Percussion hit, named by its sound
    Perc(PercSound),
}

impl Action {
    pub fn from_name(s: &str) -> Option<Action> {
        match s {
            "pluck" => Some(Action::Pluck),
            "pickString" => Some(Action::PickString),
            "brush" => Some(Action::Brush),
            "strum" => Some(Action::Strum),
            "muteBrush" => Some(Action::MuteBrush),
            "mute" => Some(Action::Mute),
            "bass" => Some(Action::Bass),
            "chordHit" => Some(Action::ChordHit),
            other => PercSound::from_name(other).map(Action::Perc),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Pluck => "pluck",
            Action::PickString => "pickString",
            Action::Brush => "brush",
            Action::Strum => "strum",
            Action::MuteBrush => "muteBrush",
            Action::Mute => "mute",
            Action::Bass => "bass",
            Action::ChordHit => "chordHit",
            Action::Perc(sound) => sound.name(),
        }
    }

    /// Single picked string
    pub fn is_pick(&self) -> bool {
        matches!(self, Action::Pluck | Action::PickString)
    }

    /// Open strum across several strings
    pub fn is_strum(&self) -> bool {
        matches!(self, Action::Brush | Action::Strum)
    }

    /// Palm-muted percussive strum
    pub fn is_mute_strum(&self) -> bool {
        matches!(self, Action::MuteBrush | Action::Mute)
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Action::from_name(&s).ok_or_else(|| format!("unknown pattern action '{}'", s))
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.name().to_string()
    }
}

/// Which bass tone a guitar bass event asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BassTone {
    Root,
    Fifth,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrumDirection {
    #[default]
    Down,
    Up,
}

/// Slots per bar of a pattern grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Subdivision {
    Six,
    #[default]
    Eight,
}

impl Subdivision {
    pub fn slots(&self) -> u8 {
        match self {
            Subdivision::Six => 6,
            Subdivision::Eight => 8,
        }
    }
}

impl TryFrom<u8> for Subdivision {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            6 => Ok(Subdivision::Six),
            8 => Ok(Subdivision::Eight),
            other => Err(format!("subdivision must be 6 or 8, got {}", other)),
        }
    }
}

impl From<Subdivision> for u8 {
    fn from(s: Subdivision) -> Self {
        s.slots()
    }
}

fn full_velocity() -> f64 {
    1.0
}

fn default_duration_beats() -> f64 {
    0.6
}

/// One event of a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternEvent {
    /// Slot index on the pattern grid
    #[serde(rename = "idx")]
    pub position: u8,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub action: Action,
    #[serde(rename = "vel", default = "full_velocity")]
    pub velocity: f64,
    #[serde(default = "default_duration_beats")]
    pub dur_beats: f64,
    #[serde(default)]
    pub bass_tone: BassTone,
    #[serde(rename = "dir", default)]
    pub direction: StrumDirection,
    #[serde(default)]
    pub muted: bool,
    /// Strings a strum covers, e.g. `[5, 4, 3, 2, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strings: Option<Vec<u8>>,
    #[serde(default)]
    pub staccato: bool,
}

impl PatternEvent {
    pub fn new(position: u8, role: Role, action: Action, velocity: f64, dur_beats: f64) -> Self {
        PatternEvent {
            position,
            role,
            action,
            velocity,
            dur_beats,
            bass_tone: BassTone::Auto,
            direction: StrumDirection::Down,
            muted: false,
            strings: None,
            staccato: false,
        }
    }

    pub fn with_bass_tone(mut self, tone: BassTone) -> Self {
        self.bass_tone = tone;
        self
    }

    pub fn with_direction(mut self, direction: StrumDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_strings(mut self, strings: Vec<u8>) -> Self {
        self.strings = Some(strings);
        self
    }

    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }

    pub fn staccato(mut self) -> Self {
        self.staccato = true;
        self
    }
}

/// Per-energy adjustment of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyRule {
    #[serde(rename = "velMul", default = "full_velocity")]
    pub velocity_mul: f64,
    /// Probability (0-1) that an event is left out of the bar
    #[serde(default)]
    pub density_drop: f64,
    #[serde(rename = "durMul", default = "full_velocity")]
    pub duration_mul: f64,
}

impl Default for EnergyRule {
    fn default() -> Self {
        EnergyRule {
            velocity_mul: 1.0,
            density_drop: 0.0,
            duration_mul: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyRules {
    #[serde(default)]
    pub low: EnergyRule,
    #[serde(default)]
    pub normal: EnergyRule,
    #[serde(default)]
    pub high: EnergyRule,
}

impl EnergyRules {
    pub fn get(&self, energy: Energy) -> EnergyRule {
        match energy {
            Energy::Low => self.low,
            Energy::Normal => self.normal,
            Energy::High => self.high,
        }
    }
}

/// One bar of accompaniment for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: String,
    #[serde(default)]
    pub subdivision: Subdivision,
    pub events: Vec<PatternEvent>,
    /// Velocity multiplier per slot
    #[serde(rename = "accent", default)]
    pub accents: BTreeMap<u8, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_rules: Option<EnergyRules>,
}

impl Pattern {
    pub fn new(id: &str, subdivision: Subdivision, events: Vec<PatternEvent>) -> Self {
        Pattern {
            id: id.to_string(),
            subdivision,
            events,
            accents: BTreeMap::new(),
            energy_rules: None,
        }
    }

    pub fn with_accent(mut self, position: u8, multiplier: f64) -> Self {
        self.accents.insert(position, multiplier);
        self
    }

    pub fn with_energy_rules(mut self, rules: EnergyRules) -> Self {
        self.energy_rules = Some(rules);
        self
    }

    pub fn slots(&self) -> u8 {
        self.subdivision.slots()
    }

    pub fn accent_at(&self, position: u8) -> f64 {
        self.accents.get(&position).copied().unwrap_or(1.0)
    }

    pub fn is_accented(&self, position: u8) -> bool {
        self.accent_at(position) > ACCENT_HINT_THRESHOLD
    }

    /// Energy adjustment for this pattern; neutral when the pattern has no rules
    pub fn energy_rule(&self, energy: Energy) -> EnergyRule {
        self.energy_rules
            .map(|rules| rules.get(energy))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(Action::from_name("muteBrush"), Some(Action::MuteBrush));
        assert_eq!(Action::from_name("kick"), Some(Action::Perc(PercSound::Kick)));
        assert_eq!(Action::from_name("bass"), Some(Action::Bass));
        assert_eq!(Action::from_name("wobble"), None);
        assert_eq!(Action::Perc(PercSound::Shaker).name(), "shaker");
        assert!(Action::Strum.is_strum());
        assert!(Action::Mute.is_mute_strum());
        assert!(!Action::ChordHit.is_pick());
    }

    #[test]
    fn test_event_from_library_json() {
        let json = r#"{ "idx": 4, "role": "BASS", "action": "pluck", "vel": 0.92, "durBeats": 0.65, "bassTone": "auto" }"#;
        let event: PatternEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.position, 4);
        assert_eq!(event.role, Role::Bass);
        assert_eq!(event.action, Action::Pluck);
        assert_eq!(event.bass_tone, BassTone::Auto);
        assert_eq!(event.direction, StrumDirection::Down);
        assert!(event.strings.is_none());
    }

    #[test]
    fn test_event_defaults() {
        let event: PatternEvent = serde_json::from_str(r#"{ "idx": 1 }"#).unwrap();
        assert_eq!(event.role, Role::Mid);
        assert_eq!(event.action, Action::Pluck);
        assert_eq!(event.velocity, 1.0);
        assert_eq!(event.dur_beats, 0.6);
    }

    #[test]
    fn test_pattern_json() {
        let json = r#"{
            "id": "k_test", "subdivision": 6,
            "events": [ { "idx": 0, "role": "PERC", "action": "kick", "vel": 0.34, "durBeats": 0.1 } ],
            "accent": { "0": 1.08 },
            "energyRules": { "low": { "velMul": 0.8, "densityDrop": 0.2, "durMul": 0.9 } }
        }"#;
        let pattern: Pattern = serde_json::from_str(json).unwrap();
        assert_eq!(pattern.slots(), 6);
        assert_eq!(pattern.accent_at(0), 1.08);
        assert_eq!(pattern.accent_at(3), 1.0);
        assert!(pattern.is_accented(0));
        assert_eq!(pattern.energy_rule(Energy::Low).density_drop, 0.2);
        assert_eq!(pattern.energy_rule(Energy::High), EnergyRule::default());
    }

    #[test]
    fn test_invalid_subdivision() {
        let json = r#"{ "id": "bad", "subdivision": 7, "events": [] }"#;
        assert!(serde_json::from_str::<Pattern>(json).is_err());
    }

    #[test]
    fn test_role_weights() {
        assert_eq!(Role::Bass.velocity_multiplier(), 0.98);
        assert_eq!(Role::Mute.velocity_multiplier(), 0.76);
        assert_eq!(Role::Bass.timing_offset_ms(), -2.0);
        assert_eq!(Role::Treble.timing_offset_ms(), 1.0);
    }
}
