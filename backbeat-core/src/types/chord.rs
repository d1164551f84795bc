//! Chord symbol normalization and parsing
//!
//! Performers type chord names in many spellings ("d min7", "B♭", "CΔ", "G/b").
//! `normalize` folds them into one canonical spelling and `parse` decomposes the
//! canonical form into a root pitch class, a triad quality, seventh markers and
//! an optional slash bass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pitch class (0-11) of a natural note letter, case-insensitive.
pub fn letter_pitch_class(letter: char) -> Option<u8> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

fn is_note_letter(c: char) -> bool {
    matches!(c, 'A'..='G' | 'a'..='g')
}

/// Triad quality of a chord symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
}

impl Quality {
    /// Semitone offsets of the third (or suspension) and the fifth above the root
    pub fn intervals(&self) -> (u8, u8) {
        match self {
            Quality::Major => (4, 7),
            Quality::Minor => (3, 7),
            Quality::Diminished => (3, 6),
            Quality::Augmented => (4, 8),
            Quality::Sus2 => (2, 7),
            Quality::Sus4 => (5, 7),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Quality::Major => "maj",
            Quality::Minor => "min",
            Quality::Diminished => "dim",
            Quality::Augmented => "aug",
            Quality::Sus2 => "sus2",
            Quality::Sus4 => "sus4",
        }
    }

    /// Detect quality from the extension text that follows the root.
    ///
    /// Checked in order min, dim, aug, sus4, sus2; anything else is major.
    /// A bare "sus" counts as sus4.
    fn detect(ext: &str) -> Quality {
        let lower = ext.to_ascii_lowercase();
        if ext.starts_with('m') && !lower.starts_with("maj") {
            Quality::Minor
        } else if lower.starts_with("dim") {
            Quality::Diminished
        } else if lower.starts_with("aug") {
            Quality::Augmented
        } else if lower.starts_with("sus4") || (lower.starts_with("sus") && !lower.starts_with("sus2")) {
            Quality::Sus4
        } else if lower.starts_with("sus2") {
            Quality::Sus2
        } else {
            Quality::Major
        }
    }
}

/// Which seventh a chord carries once conflicting markers are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seventh {
    /// `maj7`: 11 semitones above the root
    Major,
    /// `m7`: 10 semitones
    Minor,
    /// plain `7`: 10 semitones
    Dominant,
}

impl Seventh {
    pub fn interval(&self) -> u8 {
        match self {
            Seventh::Major => 11,
            Seventh::Minor | Seventh::Dominant => 10,
        }
    }
}

/// Raw seventh markers found in the extension text; several may be present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeventhMarks {
    pub major: bool,
    pub minor: bool,
    pub dominant: bool,
}

impl SeventhMarks {
    fn detect(ext: &str) -> Self {
        let lower = ext.to_ascii_lowercase();
        let bytes = lower.as_bytes();
        let dominant = bytes.iter().enumerate().any(|(i, &b)| {
            b == b'7' && (i == 0 || !bytes[i - 1].is_ascii_alphabetic())
        });
        SeventhMarks {
            major: lower.contains("maj7"),
            minor: lower.contains("m7"),
            dominant,
        }
    }

    /// maj7 wins over m7, which wins over a plain 7
    pub fn resolve(&self) -> Option<Seventh> {
        if self.major {
            Some(Seventh::Major)
        } else if self.minor {
            Some(Seventh::Minor)
        } else if self.dominant {
            Some(Seventh::Dominant)
        } else {
            None
        }
    }
}

/// A decomposed chord symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedChord {
    /// Canonical spelling the chord was parsed from
    pub symbol: String,
    /// Root pitch class (0-11)
    pub root: u8,
    pub quality: Quality,
    /// Everything between the root and the slash, e.g. "m7" in "Dm7/C"
    pub extension: String,
    pub sevenths: SeventhMarks,
    /// Pitch class of an explicit slash bass ("G/B" → 11)
    pub bass: Option<u8>,
}

impl ParsedChord {
    pub fn seventh(&self) -> Option<Seventh> {
        self.sevenths.resolve()
    }

    /// Root, third, fifth and at most one seventh, as pitch classes
    pub fn chord_tones(&self) -> Vec<u8> {
        let (third, fifth) = self.quality.intervals();
        let mut tones = vec![0, third, fifth];
        if let Some(seventh) = self.seventh() {
            tones.push(seventh.interval());
        }
        tones.into_iter().map(|t| (self.root + t) % 12).collect()
    }

    /// Pitch class a perfect fifth above the root
    pub fn fifth(&self) -> u8 {
        (self.root + 7) % 12
    }

    /// True when a seventh is voiced, making piano voicings four notes wide
    pub fn is_tetrad(&self) -> bool {
        self.seventh().is_some()
    }
}

impl fmt::Display for ParsedChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Canonical spelling of a chord symbol. Never fails; unknown text passes through.
///
/// The rewrite is applied until it reaches a fixed point, so
/// `normalize(&normalize(s)) == normalize(s)` holds for every input.
pub fn normalize(raw: &str) -> String {
    let mut current = rewrite(raw);
    loop {
        let next = rewrite(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Normalize and decompose a chord symbol.
///
/// Returns `None` only when no root letter A-G can be found.
pub fn parse(symbol: &str) -> Option<ParsedChord> {
    let canonical = normalize(symbol);
    let (main, bass_part) = match canonical.split_once('/') {
        Some((main, bass)) => (main, Some(bass)),
        None => (canonical.as_str(), None),
    };

    let (root, ext) = split_root(main)?;
    let bass = bass_part.and_then(|b| match split_root(b) {
        Some((pc, "")) => Some(pc),
        _ => None,
    });

    Some(ParsedChord {
        symbol: canonical.clone(),
        root,
        quality: Quality::detect(ext),
        extension: ext.to_string(),
        sevenths: SeventhMarks::detect(ext),
        bass,
    })
}

/// Split "Bbm7" into (10, "m7"). The letter must already be uppercase.
fn split_root(text: &str) -> Option<(u8, &str)> {
    let letter = text.chars().next()?;
    if !letter.is_ascii_uppercase() {
        return None;
    }
    let natural = letter_pitch_class(letter)?;
    let rest = &text[1..];
    let (offset, ext) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (11, &rest[1..]),
        _ => (0, rest),
    };
    Some(((natural + offset) % 12, ext))
}

fn rewrite(raw: &str) -> String {
    let mut s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    s = s
        .replace('Δ', "maj")
        .replace('♭', "b")
        .replace('♯', "#")
        .replace('°', "dim")
        .replace('ø', "m7b5");
    s = replace_ignore_case(&s, "minor", "m", None);
    s = replace_ignore_case(&s, "min", "m", Some("or"));
    s = replace_ignore_case(&s, "major", "maj", None);
    s = replace_ignore_case(&s, "maj", "maj", None);
    s = rewrite_quality_shorthand(&s);
    capitalize_letters(&s)
}

/// "CM7" → "Cmaj7", "C-7" → "Cm7", "C+" → "Caug"
fn rewrite_quality_shorthand(s: &str) -> String {
    let mut chars = s.char_indices();
    let Some((_, first)) = chars.next() else {
        return s.to_string();
    };
    if !is_note_letter(first) {
        return s.to_string();
    }
    let mut ext_start = first.len_utf8();
    if let Some(c) = s[ext_start..].chars().next() {
        if c == '#' || c == 'b' {
            ext_start += 1;
        }
    }
    let (head, ext) = s.split_at(ext_start);
    let replaced = if let Some(rest) = ext.strip_prefix('M') {
        match rest.chars().next() {
            Some('a' | 'A' | 'i' | 'I') => return s.to_string(),
            _ => format!("maj{}", rest),
        }
    } else if let Some(rest) = ext.strip_prefix('-') {
        format!("m{}", rest)
    } else if let Some(rest) = ext.strip_prefix('+') {
        format!("aug{}", rest)
    } else {
        return s.to_string();
    };
    format!("{}{}", head, replaced)
}

/// Uppercase the root letter and a slash-bass letter
fn capitalize_letters(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut after_slash = true;
    for c in s.chars() {
        if after_slash && is_note_letter(c) {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        after_slash = c == '/';
    }
    out
}

/// ASCII case-insensitive replace, skipping matches followed by `unless_followed_by`
fn replace_ignore_case(s: &str, pattern: &str, replacement: &str, unless_followed_by: Option<&str>) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        let end = i + pattern.len();
        let matched = s
            .get(i..end)
            .map(|window| window.eq_ignore_ascii_case(pattern))
            .unwrap_or(false);
        let blocked = matched
            && unless_followed_by
                .map(|guard| {
                    s.get(end..end + guard.len())
                        .map(|tail| tail.eq_ignore_ascii_case(guard))
                        .unwrap_or(false)
                })
                .unwrap_or(false);
        if matched && !blocked {
            out.push_str(replacement);
            i = end;
        } else {
            // i always sits on a char boundary
            let c = s[i..].chars().next().unwrap_or_default();
            out.push(c);
            i += c.len_utf8().max(1);
        }
    }
    out
}
