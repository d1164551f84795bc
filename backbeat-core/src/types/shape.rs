//! Guitar fretboard shapes
//!
//! A shape assigns a fret (or a mute) to each of the six strings, listed from
//! the low E string (string 6) to the high E string (string 1), the way chord
//! charts are written: `x 3 2 0 1 0` is an open C major.

use crate::types::chord::normalize;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// MIDI pitches of the open strings in standard tuning, string 6 first
pub const OPEN_STRING_PITCHES: [u8; 6] = [40, 45, 50, 55, 59, 64];

/// Highest fret a library shape may use
pub const MAX_FRET: u8 = 24;

/// Fret distance reported when two shapes share no fretted string
pub const UNRELATED_SHAPE_DISTANCE: f64 = 999.0;

/// One fretted (or open) string of a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundingString {
    /// String number, 1 (high E) to 6 (low E)
    pub string: u8,
    pub fret: u8,
    pub pitch: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<FretSpec>", into = "Vec<FretSpec>")]
pub struct GuitarShape {
    frets: [Option<u8>; 6],
}

impl GuitarShape {
    /// Create a shape from per-string frets, string 6 first. `None` mutes the string.
    pub fn new(frets: [Option<u8>; 6]) -> Self {
        GuitarShape { frets }
    }

    /// Open D minor voicing on the top four strings, used when a chord has no shape
    pub fn safe_fallback() -> Self {
        GuitarShape::new([None, None, Some(0), Some(2), Some(3), Some(1)])
    }

    pub fn frets(&self) -> &[Option<u8>; 6] {
        &self.frets
    }

    /// Fret on a string numbered 1 (high E) to 6 (low E)
    pub fn fret(&self, string: u8) -> Option<u8> {
        if !(1..=6).contains(&string) {
            return None;
        }
        self.frets[6 - string as usize]
    }

    /// MIDI pitch sounded by a string, if it is not muted
    pub fn pitch_on_string(&self, string: u8) -> Option<u8> {
        let fret = self.fret(string)?;
        Some(OPEN_STRING_PITCHES[6 - string as usize].saturating_add(fret))
    }

    /// Sounding strings ordered from lowest to highest pitch
    pub fn sounding(&self) -> Vec<SoundingString> {
        let mut out: Vec<SoundingString> = self
            .frets
            .iter()
            .enumerate()
            .filter_map(|(i, fret)| {
                fret.map(|f| SoundingString {
                    string: 6 - i as u8,
                    fret: f,
                    pitch: OPEN_STRING_PITCHES[i].saturating_add(f),
                })
            })
            .collect();
        out.sort_by_key(|s| s.pitch);
        out
    }

    /// Highest fretted position, if any string sounds
    pub fn highest_fret(&self) -> Option<u8> {
        self.frets.iter().flatten().copied().max()
    }

    pub fn top_pitch(&self) -> Option<u8> {
        self.sounding().last().map(|s| s.pitch)
    }

    pub fn bass_pitch(&self) -> Option<u8> {
        self.sounding().first().map(|s| s.pitch)
    }

    /// Mean absolute fret difference over strings fretted in both shapes
    pub fn fret_distance(&self, other: &GuitarShape) -> f64 {
        let (sum, count) = self
            .frets
            .iter()
            .zip(other.frets.iter())
            .filter_map(|(a, b)| Some((i32::from((*a)?), i32::from((*b)?))))
            .fold((0i32, 0u32), |(sum, n), (a, b)| (sum + (a - b).abs(), n + 1));
        if count == 0 {
            UNRELATED_SHAPE_DISTANCE
        } else {
            f64::from(sum) / f64::from(count)
        }
    }

    /// String for a treble pick: the highest sounding of strings 1-4, else 3
    pub fn treble_string(&self) -> u8 {
        [1, 2, 3, 4]
            .into_iter()
            .find(|&s| self.fret(s).is_some())
            .unwrap_or(3)
    }

    /// String for a middle-voice pick: 3, then 4, then 2, else the treble choice
    pub fn mid_string(&self) -> u8 {
        [3, 4, 2]
            .into_iter()
            .find(|&s| self.fret(s).is_some())
            .unwrap_or_else(|| self.treble_string())
    }
}

impl Default for GuitarShape {
    fn default() -> Self {
        GuitarShape::safe_fallback()
    }
}

impl fmt::Display for GuitarShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .frets
            .iter()
            .map(|fret| match fret {
                Some(n) => n.to_string(),
                None => "x".to_string(),
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl FromStr for GuitarShape {
    type Err = anyhow::Error;

    /// Parse "x32010" (single-digit frets) or "x 10 12 12 11 10" (separated)
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let tokens: Vec<&str> = if s.contains(|c: char| c == ' ' || c == ',') {
            s.split(|c: char| c == ' ' || c == ',')
                .filter(|t| !t.is_empty())
                .collect()
        } else {
            s.char_indices().map(|(i, c)| &s[i..i + c.len_utf8()]).collect()
        };

        if tokens.len() != 6 {
            return Err(anyhow!("A guitar shape needs 6 strings, got {} in '{}'", tokens.len(), s));
        }

        let mut frets = [None; 6];
        for (slot, token) in frets.iter_mut().zip(tokens) {
            *slot = match token {
                "x" | "X" => None,
                n => Some(
                    n.parse::<u8>()
                        .map_err(|_| anyhow!("Invalid fret '{}' in shape '{}'", n, s))?,
                ),
            };
        }
        Ok(GuitarShape::new(frets))
    }
}

/// Serialized form of one string: a fret number or "x"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FretSpec {
    Fret(u8),
    Muted(String),
}

impl TryFrom<Vec<FretSpec>> for GuitarShape {
    type Error = String;

    fn try_from(specs: Vec<FretSpec>) -> std::result::Result<Self, Self::Error> {
        if specs.len() != 6 {
            return Err(format!("a guitar shape needs 6 strings, got {}", specs.len()));
        }
        let mut frets = [None; 6];
        for (slot, spec) in frets.iter_mut().zip(specs) {
            *slot = match spec {
                FretSpec::Fret(n) => Some(n),
                FretSpec::Muted(m) if m.eq_ignore_ascii_case("x") => None,
                FretSpec::Muted(other) => return Err(format!("invalid fret marker '{}'", other)),
            };
        }
        Ok(GuitarShape::new(frets))
    }
}

impl From<GuitarShape> for Vec<FretSpec> {
    fn from(shape: GuitarShape) -> Self {
        shape
            .frets
            .iter()
            .map(|fret| match fret {
                Some(n) => FretSpec::Fret(*n),
                None => FretSpec::Muted("x".to_string()),
            })
            .collect()
    }
}

/// One library entry: a single shape or a list of candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeEntry {
    One(GuitarShape),
    Many(Vec<GuitarShape>),
}

/// Candidate shapes per chord symbol, in library order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, ShapeEntry>", into = "BTreeMap<String, ShapeEntry>")]
pub struct ShapeLibrary {
    shapes: BTreeMap<String, Vec<GuitarShape>>,
}

impl ShapeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate for a chord; the symbol is normalized first
    pub fn insert(&mut self, chord: &str, shape: GuitarShape) {
        self.shapes.entry(normalize(chord)).or_default().push(shape);
    }

    /// Candidates for a chord symbol
    pub fn candidates(&self, chord: &str) -> &[GuitarShape] {
        self.shapes
            .get(chord)
            .or_else(|| self.shapes.get(&normalize(chord)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn chords(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    /// Every chord with its candidates
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[GuitarShape])> {
        self.shapes
            .iter()
            .map(|(chord, shapes)| (chord.as_str(), shapes.as_slice()))
    }
}

impl From<BTreeMap<String, ShapeEntry>> for ShapeLibrary {
    fn from(raw: BTreeMap<String, ShapeEntry>) -> Self {
        let mut library = ShapeLibrary::new();
        for (chord, entry) in raw {
            match entry {
                ShapeEntry::One(shape) => library.insert(&chord, shape),
                ShapeEntry::Many(shapes) => {
                    for shape in shapes {
                        library.insert(&chord, shape);
                    }
                }
            }
        }
        library
    }
}

impl From<ShapeLibrary> for BTreeMap<String, ShapeEntry> {
    fn from(library: ShapeLibrary) -> Self {
        library
            .shapes
            .into_iter()
            .map(|(chord, shapes)| (chord, ShapeEntry::Many(shapes)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(s: &str) -> GuitarShape {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_compact_and_separated() {
        let c = shape("x32010");
        assert_eq!(c.frets(), &[None, Some(3), Some(2), Some(0), Some(1), Some(0)]);
        let barre = shape("x 10 12 12 11 10");
        assert_eq!(barre.fret(5), Some(10));
        assert!("x3201".parse::<GuitarShape>().is_err());
        assert!("x3201q".parse::<GuitarShape>().is_err());
    }

    #[test]
    fn test_pitches() {
        let c = shape("x32010");
        assert_eq!(c.pitch_on_string(6), None);
        assert_eq!(c.pitch_on_string(5), Some(48)); // C3
        assert_eq!(c.bass_pitch(), Some(48));
        assert_eq!(c.top_pitch(), Some(64));
        assert_eq!(c.sounding().len(), 5);
    }

    #[test]
    fn test_fret_distance() {
        let open_c = shape("x32010");
        let barre_c = shape("x35553");
        // strings 5..1: |3-3| + |2-5| + |0-5| + |1-5| + |0-3| = 15 over 5 strings
        assert!((open_c.fret_distance(&barre_c) - 3.0).abs() < 1e-9);

        let low = GuitarShape::new([Some(3), None, None, None, None, None]);
        let high = GuitarShape::new([None, None, None, None, None, Some(3)]);
        assert_eq!(low.fret_distance(&high), UNRELATED_SHAPE_DISTANCE);
    }

    #[test]
    fn test_string_choice() {
        let dm = GuitarShape::safe_fallback();
        assert_eq!(dm.treble_string(), 1);
        assert_eq!(dm.mid_string(), 3);

        let bass_only = GuitarShape::new([Some(3), Some(2), None, None, None, None]);
        assert_eq!(bass_only.treble_string(), 3);
        assert_eq!(bass_only.mid_string(), 3);
    }

    #[test]
    fn test_json_form() {
        let parsed: GuitarShape = serde_json::from_str(r#"["x", 0, 2, 2, 1, 0]"#).unwrap();
        assert_eq!(parsed, shape("x02210"));
        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, r#"["x",0,2,2,1,0]"#);
        assert!(serde_json::from_str::<GuitarShape>(r#"["q", 0, 2, 2, 1, 0]"#).is_err());
    }

    #[test]
    fn test_shape_library() {
        let json = r#"{
            "C": [["x", 3, 2, 0, 1, 0], ["x", 3, 5, 5, 5, 3]],
            "Bbmaj7": ["x", 1, 3, 2, 3, 1]
        }"#;
        let library: ShapeLibrary = serde_json::from_str(json).unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.candidates("C").len(), 2);
        assert_eq!(library.candidates("BbΔ7").len(), 1);
        assert!(library.candidates("F#").is_empty());
    }

    #[test]
    fn test_high_fret_pitch_saturates() {
        let wild = GuitarShape::new([None, Some(3), Some(2), Some(0), Some(1), Some(200)]);
        assert_eq!(wild.highest_fret(), Some(200));
        assert_eq!(wild.pitch_on_string(1), Some(u8::MAX));
        assert_eq!(wild.top_pitch(), Some(u8::MAX));
        assert_eq!(shape("x32010").highest_fret(), Some(3));
        assert_eq!(shape("xxxxxx").highest_fret(), None);
    }
}
