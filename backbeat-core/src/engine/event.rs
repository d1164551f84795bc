//! Outbound events for a renderer
//!
//! Every bar starts with a `Bar` meta event, followed by that bar's note
//! events in pattern order, track by track. `StopAt` tells the renderer to
//! let everything fade out at that time.

use crate::engine::mud_guard::MudGuardLevel;
use crate::engine::transition::TransitionMode;
use crate::types::pattern::{Role, StrumDirection};
use crate::types::perc::PercSound;
use crate::types::settings::{
    EndingType, Energy, FillIntensity, InstrumentMode, OutputMode, Part, RightHand, Track,
};
use crate::types::shape::GuitarShape;
use crate::types::time::Meter;
use serde::Serialize;
use std::fmt;

/// Coarse event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Meta,
    Guitar,
    Piano,
    Perc,
}

impl From<Track> for EventKind {
    fn from(track: Track) -> Self {
        match track {
            Track::Guitar => EventKind::Guitar,
            Track::Piano => EventKind::Piano,
            Track::Perc => EventKind::Perc,
        }
    }
}

/// Rendering hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub accent: bool,
    pub mud_guard_level: MudGuardLevel,
}

impl Hint {
    /// Rapid chord changes: the renderer should duck harder
    pub fn duck_harder(&self) -> bool {
        self.mud_guard_level != MudGuardLevel::Off
    }
}

/// Settings in force for one bar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarInfo {
    pub bar_index: u64,
    pub bpm: f64,
    pub meter: Meter,
    pub style: String,
    pub groove_preset: String,
    pub energy: Energy,
    pub part: Part,
    pub right_hand: RightHand,
    pub instrument: InstrumentMode,
    pub output: OutputMode,
    pub transition: Option<TransitionMode>,
    pub fill_intensity: FillIntensity,
    pub ending_type: EndingType,
    pub mud_guard_level: MudGuardLevel,
    pub one_shot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EventBody {
    Bar(BarInfo),
    StopAt,
    GuitarBass {
        pitch: u8,
        shape: GuitarShape,
        hint: Hint,
    },
    GuitarPick {
        role: Role,
        string: u8,
        shape: GuitarShape,
        hint: Hint,
    },
    GuitarStrum {
        direction: StrumDirection,
        spread_ms: f64,
        strings: Vec<u8>,
        muted: bool,
        shape: GuitarShape,
        hint: Hint,
    },
    GuitarMuteStrum {
        direction: StrumDirection,
        spread_ms: f64,
        strings: Vec<u8>,
        shape: GuitarShape,
        hint: Hint,
    },
    PianoBass {
        pitch: u8,
        hint: Hint,
    },
    PianoChord {
        pitches: Vec<u8>,
        staccato: bool,
        hint: Hint,
    },
    Perc {
        sound: PercSound,
        hint: Hint,
    },
}

impl EventBody {
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::Bar(_) | EventBody::StopAt => EventKind::Meta,
            EventBody::GuitarBass { .. }
            | EventBody::GuitarPick { .. }
            | EventBody::GuitarStrum { .. }
            | EventBody::GuitarMuteStrum { .. } => EventKind::Guitar,
            EventBody::PianoBass { .. } | EventBody::PianoChord { .. } => EventKind::Piano,
            EventBody::Perc { .. } => EventKind::Perc,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            EventBody::Bar(_) => "bar",
            EventBody::StopAt => "stopAt",
            EventBody::GuitarBass { .. } => "pickMidi",
            EventBody::GuitarPick { .. } => "pickString",
            EventBody::GuitarStrum { .. } => "brush",
            EventBody::GuitarMuteStrum { .. } => "muteBrush",
            EventBody::PianoBass { .. } => "bass",
            EventBody::PianoChord { .. } => "chord",
            EventBody::Perc { sound, .. } => sound.name(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            EventBody::GuitarBass { .. } | EventBody::PianoBass { .. } => Some(Role::Bass),
            EventBody::GuitarPick { role, .. } => Some(*role),
            EventBody::GuitarStrum { .. } | EventBody::PianoChord { .. } => Some(Role::Chord),
            EventBody::GuitarMuteStrum { .. } => Some(Role::Mute),
            EventBody::Perc { .. } => Some(Role::Perc),
            EventBody::Bar(_) | EventBody::StopAt => None,
        }
    }

    pub fn hint(&self) -> Option<Hint> {
        match self {
            EventBody::GuitarBass { hint, .. }
            | EventBody::GuitarPick { hint, .. }
            | EventBody::GuitarStrum { hint, .. }
            | EventBody::GuitarMuteStrum { hint, .. }
            | EventBody::PianoBass { hint, .. }
            | EventBody::PianoChord { hint, .. }
            | EventBody::Perc { hint, .. } => Some(*hint),
            EventBody::Bar(_) | EventBody::StopAt => None,
        }
    }
}

/// One scheduled event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Absolute time in seconds on the engine clock
    pub time: f64,
    /// Slot index within the pattern grid; 0 for meta events
    pub slot: u8,
    pub chord: String,
    pub velocity: f64,
    /// Seconds
    pub duration: f64,
    #[serde(flatten)]
    pub body: EventBody,
}

impl Event {
    pub fn bar(time: f64, chord: &str, info: BarInfo) -> Self {
        Event {
            time,
            slot: 0,
            chord: chord.to_string(),
            velocity: 0.0,
            duration: 0.0,
            body: EventBody::Bar(info),
        }
    }

    pub fn stop_at(time: f64, chord: &str) -> Self {
        Event {
            time,
            slot: 0,
            chord: chord.to_string(),
            velocity: 0.0,
            duration: 0.0,
            body: EventBody::StopAt,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.body.kind()
    }

    pub fn is_bar(&self) -> bool {
        matches!(self.body, EventBody::Bar(_))
    }

    pub fn is_stop(&self) -> bool {
        matches!(self.body, EventBody::StopAt)
    }

    pub fn bar_info(&self) -> Option<&BarInfo> {
        match &self.body {
            EventBody::Bar(info) => Some(info),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            EventBody::Bar(info) => write!(
                f,
                "{:>9.3}s  bar {:<4} {} {} {:.1}bpm {}",
                self.time, info.bar_index, self.chord, info.meter, info.bpm, info.style
            ),
            EventBody::StopAt => write!(f, "{:>9.3}s  stop", self.time),
            body => write!(
                f,
                "{:>9.3}s  {:<6} {:<10} slot {} vel {:.2} dur {:.3}s",
                self.time,
                format!("{:?}", body.kind()).to_lowercase(),
                body.action_name(),
                self.slot,
                self.velocity,
                self.duration
            ),
        }
    }
}
