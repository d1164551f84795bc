//! Fretboard shape selection

use super::Resolved;
use crate::types::shape::{GuitarShape, ShapeLibrary};

/// Pitch movement assumed when either shape has no sounding string
const MISSING_PITCH_MOVE: f64 = 12.0;
const TOP_MOVE_WEIGHT: f64 = 0.30;
const BASS_MOVE_WEIGHT: f64 = 0.20;

fn pitch_move(a: Option<u8>, b: Option<u8>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => f64::from((i16::from(a) - i16::from(b)).abs()),
        _ => MISSING_PITCH_MOVE,
    }
}

/// Cost of moving from `prev` to `candidate`: fret motion plus weighted
/// top-note and bass-note motion
pub fn shape_score(candidate: &GuitarShape, prev: &GuitarShape) -> f64 {
    candidate.fret_distance(prev)
        + pitch_move(candidate.top_pitch(), prev.top_pitch()) * TOP_MOVE_WEIGHT
        + pitch_move(candidate.bass_pitch(), prev.bass_pitch()) * BASS_MOVE_WEIGHT
}

pub struct GuitarVoiceLeader<'a> {
    shapes: &'a ShapeLibrary,
}

impl<'a> GuitarVoiceLeader<'a> {
    pub fn new(shapes: &'a ShapeLibrary) -> Self {
        GuitarVoiceLeader { shapes }
    }

    /// Best shape for `chord` after `prev`. Unknown chords resolve to the
    /// safe fallback shape; ties keep library order.
    pub fn resolve_shape(&self, chord: &str, prev: Option<&GuitarShape>) -> Resolved<GuitarShape> {
        let candidates = self.shapes.candidates(chord);
        let Some(first) = candidates.first() else {
            return Resolved::Fallback(GuitarShape::safe_fallback());
        };
        let prev = match prev {
            Some(prev) if candidates.len() > 1 => prev,
            _ => return Resolved::Found(first.clone()),
        };

        let mut best = first;
        let mut best_score = f64::INFINITY;
        for candidate in candidates {
            let score = shape_score(candidate, prev);
            if score < best_score {
                best = candidate;
                best_score = score;
            }
        }
        Resolved::Found(best.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(s: &str) -> GuitarShape {
        s.parse().unwrap()
    }

    fn library() -> ShapeLibrary {
        let mut lib = ShapeLibrary::new();
        lib.insert("C", shape("x32010"));
        lib.insert("C", shape("x35553"));
        lib.insert("D", shape("xx0232"));
        lib
    }

    #[test]
    fn test_unknown_chord_falls_back() {
        let lib = library();
        let leader = GuitarVoiceLeader::new(&lib);
        let resolved = leader.resolve_shape("F#m7b5", None);
        assert!(resolved.is_fallback());
        assert_eq!(resolved.into_inner(), GuitarShape::safe_fallback());
    }

    #[test]
    fn test_first_candidate_without_history() {
        let lib = library();
        let leader = GuitarVoiceLeader::new(&lib);
        assert_eq!(leader.resolve_shape("C", None), Resolved::Found(shape("x32010")));
    }

    #[test]
    fn test_voice_leads_to_nearer_shape() {
        let lib = library();
        let leader = GuitarVoiceLeader::new(&lib);
        // coming from a 5th-fret A-shape barre, the barre C is closer than open C
        let prev = shape("x57775");
        assert_eq!(leader.resolve_shape("C", Some(&prev)).into_inner(), shape("x35553"));
        // coming from open D, open C wins
        let prev = shape("xx0232");
        assert_eq!(leader.resolve_shape("C", Some(&prev)).into_inner(), shape("x32010"));
    }

    #[test]
    fn test_score_prefers_identical_shape() {
        let a = shape("x32010");
        assert_eq!(shape_score(&a, &a), 0.0);
        assert!(shape_score(&shape("x35553"), &a) > 0.0);
    }
}
