//! Humanized timing and velocity
//!
//! **Determinism.** Every bit of "randomness" here is a pure hash of a
//! structured key (chord, bar, track, pattern, event). There is no RNG state:
//! the same key always yields the same jitter, and replaying a session against
//! the same clock reproduces its output exactly.

use crate::engine::groove::GrooveProfile;
use crate::types::pattern::{Role, Subdivision};
use crate::types::settings::Track;
use crate::types::time::{beats_to_seconds, seconds_per_beat, Meter};
use serde::{Deserialize, Serialize};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const FIELD_SEPARATOR: u8 = 0x1f;

/// Salt separating the density-drop roll from the timing jitter roll
const DROP_SALT: u64 = 0x6472_6f70; // "drop"

/// Percussion keeps this share of the jitter
const PERC_JITTER_SCALE: f64 = 0.35;

/// Bounds of the pattern velocity after the energy multiplier
const ENERGIZED_MIN: f64 = 0.05;
const ENERGIZED_MAX: f64 = 1.0;

pub const MIN_VELOCITY: f64 = 0.06;
pub const MAX_VELOCITY: f64 = 1.0;

/// Performer-adjustable feel: `loi` widens strums, `human` loosens timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumanizeSettings {
    pub loi: f64,
    pub human: f64,
}

impl Default for HumanizeSettings {
    fn default() -> Self {
        HumanizeSettings {
            loi: 0.60,
            human: 0.45,
        }
    }
}

impl HumanizeSettings {
    pub fn clamped(self) -> Self {
        HumanizeSettings {
            loi: clamp_unit(self.loi),
            human: clamp_unit(self.human),
        }
    }

    /// Maximum timing jitter in ms, 2 to 12
    pub fn jitter_ms(&self) -> f64 {
        (2.0 + 10.0 * self.human).clamp(2.0, 12.0)
    }

    /// Time between the first and last string of a strum, in ms
    pub fn strum_spread_ms(&self, bpm: f64) -> f64 {
        let ms_per_beat = seconds_per_beat(bpm) * 1000.0;
        let extra = (0.04 * ms_per_beat * self.loi).clamp(0.0, 35.0);
        (10.0 + extra).clamp(10.0, 48.0)
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(hash, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

/// Stateless splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Identity of one scheduled event, the input to every deterministic roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterKey<'a> {
    pub chord: &'a str,
    pub bar_index: u64,
    pub track: Track,
    pub pattern_id: &'a str,
    pub event_index: usize,
}

impl JitterKey<'_> {
    pub fn hash(&self) -> u64 {
        let mut h = FNV_OFFSET;
        h = fnv1a(h, self.chord.as_bytes());
        h = fnv1a(h, &[FIELD_SEPARATOR]);
        h = fnv1a(h, &self.bar_index.to_le_bytes());
        h = fnv1a(h, self.track.name().as_bytes());
        h = fnv1a(h, &[FIELD_SEPARATOR]);
        h = fnv1a(h, self.pattern_id.as_bytes());
        h = fnv1a(h, &[FIELD_SEPARATOR]);
        fnv1a(h, &(self.event_index as u64).to_le_bytes())
    }

    fn unit(&self, salt: u64) -> f64 {
        (mix(self.hash() ^ salt) >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform value in [0, 1) for timing jitter
    pub fn jitter_unit(&self) -> f64 {
        self.unit(0)
    }

    /// Uniform value in [0, 1) for the density-drop decision
    pub fn drop_unit(&self) -> f64 {
        self.unit(DROP_SALT)
    }
}

/// Multiplicative velocity factors of one event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityFactors {
    pub base: f64,
    pub energy: f64,
    pub pattern_accent: f64,
    pub groove_accent: f64,
    pub bar_dynamics: f64,
    pub role: f64,
    pub output_trim: f64,
}

/// Where an event sits in its bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPosition {
    pub bar_start: f64,
    pub meter: Meter,
    pub bpm: f64,
    pub position: u8,
    pub subdivision: Subdivision,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Humanizer {
    settings: HumanizeSettings,
}

impl Humanizer {
    pub fn new(settings: HumanizeSettings) -> Self {
        Humanizer {
            settings: settings.clamped(),
        }
    }

    pub fn settings(&self) -> HumanizeSettings {
        self.settings
    }

    /// Absolute event time in seconds
    pub fn event_time(&self, slot: &SlotPosition, groove: &GrooveProfile, key: &JitterKey) -> f64 {
        let offset = slot
            .meter
            .slot_offset(slot.position, slot.subdivision.slots());

        let mut ms = 0.0;
        if slot.subdivision == Subdivision::Eight {
            ms += groove.feel_at(slot.position);
        }
        if slot.subdivision == Subdivision::Eight && slot.position % 2 == 1 {
            ms += groove.swing_ms;
        }
        ms += slot.role.timing_offset_ms();
        ms += groove.layback_ms;

        let mut jitter = (key.jitter_unit() * 2.0 - 1.0) * self.settings.jitter_ms() / 1000.0;
        if key.track == Track::Perc {
            jitter *= PERC_JITTER_SCALE;
        }

        slot.bar_start + beats_to_seconds(offset, slot.bpm) + ms / 1000.0 + jitter
    }

    /// Base times energy, clamped to [0.05, 1.0], then the remaining
    /// factors, clamped to [0.06, 1.0]
    pub fn velocity(&self, f: &VelocityFactors) -> f64 {
        let energized = f.base * f.energy;
        if !energized.is_finite() {
            return MIN_VELOCITY;
        }
        let v = energized.clamp(ENERGIZED_MIN, ENERGIZED_MAX)
            * f.pattern_accent
            * f.groove_accent
            * f.bar_dynamics
            * f.role
            * f.output_trim;
        if v.is_finite() {
            v.clamp(MIN_VELOCITY, MAX_VELOCITY)
        } else {
            MIN_VELOCITY
        }
    }

    pub fn strum_spread_ms(&self, bpm: f64) -> f64 {
        self.settings.strum_spread_ms(bpm)
    }
}

/// Whether an energy rule's density drop removes this event
pub fn is_dropped(key: &JitterKey, density_drop: f64) -> bool {
    density_drop > 0.0 && key.drop_unit() < density_drop
}
