//! Voice leading
//!
//! Each voice leader picks the next chord's shape or pitches so that it moves
//! as little as possible from the previous one. They are pure: the caller
//! owns the voicing memory and decides what to remember.

mod bass;
mod guitar;
pub(crate) mod piano;

pub use bass::{choose_bass_pitch, BassMemory, BASS_CENTER, BASS_HIGH, BASS_LOW};
pub use guitar::{shape_score, GuitarVoiceLeader};
pub use piano::{PianoVoiceLeader, PianoVoicing};

/// Result of a resolution that can degrade to a safe fallback
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    Found(T),
    Fallback(T),
}

impl<T> Resolved<T> {
    pub fn get(&self) -> &T {
        match self {
            Resolved::Found(v) | Resolved::Fallback(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Resolved::Found(v) | Resolved::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolved::Fallback(_))
    }
}

/// MIDI pitch of `pitch_class` in `[low, high]` nearest to `prefer`.
/// Ties go to the lower pitch.
pub fn nearest_pitch(pitch_class: u8, low: u8, high: u8, prefer: u8) -> Option<u8> {
    let pc = pitch_class % 12;
    (low..=high)
        .filter(|m| m % 12 == pc)
        .min_by_key(|&m| (i32::from(m) - i32::from(prefer)).abs())
}
