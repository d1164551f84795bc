//! Guitar bass line: root/fifth alternation with minimal jumps

use super::nearest_pitch;
use crate::types::chord::ParsedChord;
use crate::types::pattern::BassTone;

pub const BASS_LOW: u8 = 38;
pub const BASS_HIGH: u8 = 55;
pub const BASS_CENTER: u8 = 45;

/// Extra semitones the alternating tone may move before the other tone is preferred
const ALTERNATION_SLACK: i32 = 2;

/// What the bass line remembers between notes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BassMemory {
    pub last_pitch: Option<u8>,
    /// Number of alternating notes played on the current chord
    pub parity: u32,
    chord: Option<String>,
}

impl BassMemory {
    /// Restart the root/fifth alternation when the chord changes
    pub fn follow_chord(&mut self, chord: &str) {
        if self.chord.as_deref() != Some(chord) {
            self.chord = Some(chord.to_string());
            self.parity = 0;
        }
    }

    fn anchor(&self) -> u8 {
        self.last_pitch.unwrap_or(BASS_CENTER)
    }
}

fn distance(a: u8, b: u8) -> i32 {
    (i32::from(a) - i32::from(b)).abs()
}

/// Choose the next guitar bass pitch for a chord.
///
/// An explicit slash bass always wins and resets the alternation. A forced
/// root or fifth is always honored. `Auto` alternates root and fifth, but
/// stays on the expected tone only while it moves at most two semitones more
/// than the other one would.
pub fn choose_bass_pitch(chord: &ParsedChord, memory: &mut BassMemory, tone: BassTone) -> u8 {
    let anchor = memory.anchor();

    if let Some(bass) = chord.bass {
        let pitch = nearest_pitch(bass, BASS_LOW, BASS_HIGH, anchor).unwrap_or(BASS_CENTER);
        memory.last_pitch = Some(pitch);
        memory.parity = 0;
        return pitch;
    }

    let root = chord.root;
    let fifth = chord.fifth();

    let wanted = match tone {
        BassTone::Root => root,
        BassTone::Fifth => fifth,
        BassTone::Auto => {
            let (expected, other) = if memory.parity % 2 == 0 {
                (root, fifth)
            } else {
                (fifth, root)
            };
            match memory.last_pitch {
                None => expected,
                Some(last) => {
                    let a = nearest_pitch(expected, BASS_LOW, BASS_HIGH, anchor).unwrap_or(BASS_CENTER);
                    let b = nearest_pitch(other, BASS_LOW, BASS_HIGH, anchor).unwrap_or(BASS_CENTER);
                    if distance(a, last) <= distance(b, last) + ALTERNATION_SLACK {
                        expected
                    } else {
                        other
                    }
                }
            }
        }
    };

    let pitch = nearest_pitch(wanted, BASS_LOW, BASS_HIGH, anchor).unwrap_or(BASS_CENTER);
    memory.last_pitch = Some(pitch);
    memory.parity += 1;
    pitch
}
