//! Piano voicings around a target register

use super::{nearest_pitch, Resolved};
use crate::types::chord::ParsedChord;
use serde::{Deserialize, Serialize};

/// Candidate pitches lie within this many semitones of the center
const CANDIDATE_SPAN: i32 = 24;
const WINDOW_BELOW: i32 = 10;
const WINDOW_ABOVE: i32 = 14;
const MIN_SEPARATION: i32 = 3;
/// Summed motion above which the new voicing is folded toward the previous one
const REVOICE_THRESHOLD: i32 = 18;
const PAIR_REACH: i32 = 8;

const LEFT_HAND_LOW: u8 = 40;
const LEFT_HAND_HIGH: u8 = 55;
const LEFT_HAND_CENTER: u8 = 46;

pub const DEFAULT_CENTER: u8 = 64;

/// Left-hand bass plus a sorted right-hand cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PianoVoicing {
    pub bass: u8,
    pub notes: Vec<u8>,
}

impl PianoVoicing {
    /// D minor triad over D, used when a chord cannot be parsed
    pub fn fallback() -> Self {
        PianoVoicing {
            bass: 50,
            notes: vec![62, 65, 69],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PianoVoiceLeader {
    center: u8,
}

impl Default for PianoVoiceLeader {
    fn default() -> Self {
        PianoVoiceLeader::new(DEFAULT_CENTER)
    }
}

impl PianoVoiceLeader {
    pub fn new(center: u8) -> Self {
        PianoVoiceLeader {
            center: center.min(127),
        }
    }

    pub fn center(&self) -> u8 {
        self.center
    }

    /// Voicing for `chord` after `prev`. An unparsable chord resolves to the
    /// fallback voicing.
    pub fn resolve_voicing(
        &self,
        chord: Option<&ParsedChord>,
        prev: Option<&PianoVoicing>,
    ) -> Resolved<PianoVoicing> {
        let Some(chord) = chord else {
            return Resolved::Fallback(PianoVoicing::fallback());
        };

        let tones = chord.chord_tones();
        let count = if chord.is_tetrad() { 4 } else { 3 };
        let mut notes = self.base_voicing(&tones, count);

        if let Some(prev) = prev.filter(|p| !p.notes.is_empty()) {
            let folded = self.fold_toward(&notes, &prev.notes);
            if let Some(folded) = folded {
                notes = folded;
            }
        }

        let bass_pc = chord.bass.unwrap_or(chord.root);
        let anchor = prev.map(|p| p.bass).unwrap_or(LEFT_HAND_CENTER);
        let bass = nearest_pitch(bass_pc, LEFT_HAND_LOW, LEFT_HAND_HIGH, anchor)
            .unwrap_or(LEFT_HAND_CENTER);

        Resolved::Found(PianoVoicing {
            bass,
            notes: notes.into_iter().map(|n| n as u8).collect(),
        })
    }

    /// Greedy pick of `count` chord tones around the center, lowest first,
    /// kept at least a minor third apart
    fn base_voicing(&self, tones: &[u8], count: usize) -> Vec<i32> {
        let center = i32::from(self.center);
        let candidates: Vec<i32> = (center - CANDIDATE_SPAN..=center + CANDIDATE_SPAN)
            .filter(|m| (0..=127).contains(m) && tones.contains(&((m % 12) as u8)))
            .collect();

        let mut picked: Vec<i32> = Vec::with_capacity(count);
        for &m in &candidates {
            if picked.len() >= count {
                break;
            }
            if m < center - WINDOW_BELOW || m > center + WINDOW_ABOVE {
                continue;
            }
            if picked.iter().any(|p| (p - m).abs() < MIN_SEPARATION) {
                continue;
            }
            picked.push(m);
        }

        // widen to the whole candidate span
        while picked.len() < count {
            let next = candidates
                .iter()
                .copied()
                .filter(|m| picked.iter().all(|p| (p - m).abs() >= MIN_SEPARATION))
                .min_by_key(|m| (m - center).abs());
            match next {
                Some(m) => picked.push(m),
                None => break,
            }
        }

        picked.sort_unstable();
        while picked.len() > count {
            let low = (picked[0] - center).abs();
            let high = (picked[picked.len() - 1] - center).abs();
            if low > high {
                picked.remove(0);
            } else {
                picked.pop();
            }
        }
        picked
    }

    /// Octave-shift each note toward its paired previous note when the
    /// voicing would jump too far. Returns `None` when no shift is needed or
    /// the shifted voicing would leave the register or crowd itself.
    fn fold_toward(&self, notes: &[i32], prev: &[u8]) -> Option<Vec<i32>> {
        let mut prev: Vec<i32> = prev.iter().map(|&p| i32::from(p)).collect();
        prev.sort_unstable();

        let motion: i32 = notes.iter().zip(&prev).map(|(n, p)| (n - p).abs()).sum();
        if motion <= REVOICE_THRESHOLD {
            return None;
        }

        let last = prev.len() - 1;
        let mut folded: Vec<i32> = notes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let p = prev[i.min(last)];
                let mut n = n;
                while n - p > PAIR_REACH {
                    n -= 12;
                }
                while p - n > PAIR_REACH {
                    n += 12;
                }
                n
            })
            .collect();
        folded.sort_unstable();

        self.is_playable(&folded).then_some(folded)
    }

    fn is_playable(&self, notes: &[i32]) -> bool {
        let center = i32::from(self.center);
        let in_window = notes
            .iter()
            .all(|n| (0..=127).contains(n) && (n - center).abs() <= CANDIDATE_SPAN);
        let separated = notes.windows(2).all(|w| w[1] - w[0] >= MIN_SEPARATION);
        in_window && separated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chord::parse;

    fn voice(leader: &PianoVoiceLeader, chord: &str, prev: Option<&PianoVoicing>) -> PianoVoicing {
        let parsed = parse(chord);
        leader.resolve_voicing(parsed.as_ref(), prev).into_inner()
    }

    fn assert_invariants(v: &PianoVoicing, center: u8) {
        for &n in &v.notes {
            assert!((i32::from(n) - i32::from(center)).abs() <= CANDIDATE_SPAN, "{:?}", v);
        }
        for w in v.notes.windows(2) {
            assert!(w[1] >= w[0] + 3, "{:?}", v);
        }
    }

    #[test]
    fn test_triad_around_center() {
        let leader = PianoVoiceLeader::default();
        let c = voice(&leader, "C", None);
        // C E G from 54 upward inside the window: 55 (G), 60 (C), 64 (E)
        assert_eq!(c.notes, vec![55, 60, 64]);
        assert_eq!(c.bass, 48);
        assert_invariants(&c, 64);
    }

    #[test]
    fn test_seventh_gives_four_notes() {
        let leader = PianoVoiceLeader::default();
        let g7 = voice(&leader, "G7", None);
        assert_eq!(g7.notes.len(), 4);
        assert_invariants(&g7, 64);
        let pcs: Vec<u8> = g7.notes.iter().map(|n| n % 12).collect();
        assert!(pcs.contains(&5)); // F, the seventh
    }

    #[test]
    fn test_slash_bass() {
        let leader = PianoVoiceLeader::default();
        let v = voice(&leader, "C/G", None);
        assert_eq!(v.bass, 43);
        // E is equally far above and below the anchor; the lower one wins
        let v = voice(&leader, "C/E", None);
        assert_eq!(v.bass, 40);
    }

    #[test]
    fn test_unparsable_falls_back() {
        let leader = PianoVoiceLeader::default();
        let resolved = leader.resolve_voicing(None, None);
        assert!(resolved.is_fallback());
        assert_eq!(resolved.into_inner(), PianoVoicing::fallback());
    }

    #[test]
    fn test_progression_keeps_invariants() {
        let leader = PianoVoiceLeader::default();
        let mut prev: Option<PianoVoicing> = None;
        for chord in ["C", "Am7", "Dm", "G7", "Cmaj7", "F", "Bb", "E7", "Am"] {
            let v = voice(&leader, chord, prev.as_ref());
            assert_invariants(&v, 64);
            prev = Some(v);
        }
    }

    #[test]
    fn test_low_center_clamps() {
        let leader = PianoVoiceLeader::new(10);
        let v = voice(&leader, "C", None);
        assert!(v.notes.iter().all(|&n| n <= 34));
        assert!(!v.notes.is_empty());
    }
}
