//! Session state and bar-boundary commits
//!
//! Setters touch `EngineState` in one of two ways: directly while the engine
//! is idle, or through `PendingChanges` while it runs. Pending changes are
//! last-write-wins and are applied together, in a fixed order, at the next bar
//! boundary by `commit_pending`.

use crate::engine::config::EngineConfig;
use crate::engine::humanize::HumanizeSettings;
use crate::engine::mud_guard::{AntiMudGuard, MudGuardLevel};
use crate::engine::transition::TransitionState;
use crate::library::Defaults;
use crate::types::settings::{
    EndingType, Energy, FillIntensity, InstrumentMode, OutputMode, Part, RightHand,
};
use crate::types::shape::GuitarShape;
use crate::types::time::Meter;
use crate::types::voice_leading::{BassMemory, PianoVoicing};
use serde::Serialize;
use std::fmt;

pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 220.0;

/// Hold a tempo inside the playable range
pub fn clamp_bpm(bpm: f64) -> f64 {
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Current tempo and the tempo it is easing toward
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tempo {
    pub current: f64,
    pub target: f64,
}

impl Tempo {
    pub fn new(bpm: f64) -> Self {
        let bpm = clamp_bpm(bpm);
        Tempo {
            current: bpm,
            target: bpm,
        }
    }

    /// Move one bar's worth toward the target: a share of the remaining
    /// difference, never more than `max_step`, snapping when close.
    pub fn ease(&mut self, max_step: f64, easing: f64, snap: f64) -> f64 {
        let diff = self.target - self.current;
        if diff.abs() <= snap {
            self.current = self.target;
            return self.current;
        }
        let step = (diff * easing).clamp(-max_step, max_step);
        let next = ((self.current + step) * 1000.0).round() / 1000.0;
        // rounding must not overshoot or exceed the step bound
        self.current = if (next - self.current).abs() > max_step || (self.target - next) * diff < 0.0 {
            self.current + step
        } else {
            next
        };
        self.current
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }
}

/// One performer-facing setting change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "setting", content = "value", rename_all = "camelCase")]
pub enum Setting {
    Chord(String),
    Style(String),
    GroovePreset(String),
    Energy(Energy),
    Part(Part),
    RightHand(RightHand),
    AutoAssist(bool),
    Instrument(InstrumentMode),
    Output(OutputMode),
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Chord(c) => write!(f, "chord {}", c),
            Setting::Style(s) => write!(f, "style {}", s),
            Setting::GroovePreset(p) => write!(f, "groove {}", p),
            Setting::Energy(e) => write!(f, "energy {}", e),
            Setting::Part(p) => write!(f, "part {}", p),
            Setting::RightHand(r) => write!(f, "right hand {}", r),
            Setting::AutoAssist(a) => write!(f, "auto-assist {}", if *a { "on" } else { "off" }),
            Setting::Instrument(i) => write!(f, "instrument {}", i),
            Setting::Output(o) => write!(f, "output {}", o),
        }
    }
}

/// Changes waiting for the next bar boundary. One slot per setting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingChanges {
    chord: Option<String>,
    style: Option<String>,
    groove_preset: Option<String>,
    energy: Option<Energy>,
    part: Option<Part>,
    right_hand: Option<RightHand>,
    auto_assist: Option<bool>,
    instrument: Option<InstrumentMode>,
    output: Option<OutputMode>,
}

impl PendingChanges {
    /// Queue a change, replacing any earlier change to the same setting
    pub fn queue(&mut self, setting: Setting) {
        match setting {
            Setting::Chord(c) => self.chord = Some(c),
            Setting::Style(s) => self.style = Some(s),
            Setting::GroovePreset(p) => self.groove_preset = Some(p),
            Setting::Energy(e) => self.energy = Some(e),
            Setting::Part(p) => self.part = Some(p),
            Setting::RightHand(r) => self.right_hand = Some(r),
            Setting::AutoAssist(a) => self.auto_assist = Some(a),
            Setting::Instrument(i) => self.instrument = Some(i),
            Setting::Output(o) => self.output = Some(o),
        }
    }

    pub fn chord(&self) -> Option<&str> {
        self.chord.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        *self == PendingChanges::default()
    }

    pub fn clear(&mut self) {
        *self = PendingChanges::default();
    }

    /// Take every queued change in commit order
    pub fn drain(&mut self) -> Vec<Setting> {
        let taken = std::mem::take(self);
        let mut out = Vec::new();
        out.extend(taken.style.map(Setting::Style));
        out.extend(taken.groove_preset.map(Setting::GroovePreset));
        out.extend(taken.auto_assist.map(Setting::AutoAssist));
        out.extend(taken.part.map(Setting::Part));
        out.extend(taken.energy.map(Setting::Energy));
        out.extend(taken.right_hand.map(Setting::RightHand));
        out.extend(taken.instrument.map(Setting::Instrument));
        out.extend(taken.output.map(Setting::Output));
        out.extend(taken.chord.map(Setting::Chord));
        out
    }
}

/// Last voicings, remembered for voice leading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoicingMemory {
    pub guitar: Option<GuitarShape>,
    pub piano: Option<PianoVoicing>,
    pub bass: BassMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PlayState {
    Stopped,
    Holding,
    Ending { bars_remaining: u8 },
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Stopped => write!(f, "stopped"),
            PlayState::Holding => write!(f, "holding"),
            PlayState::Ending { bars_remaining } => write!(f, "ending ({} bars left)", bars_remaining),
        }
    }
}

/// Read-only view of a session, for UIs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub running: bool,
    pub play_state: PlayState,
    pub bar_index: u64,
    pub chord: String,
    pub pending_chord: Option<String>,
    pub style: String,
    pub groove_preset: String,
    pub meter: Meter,
    pub tempo: Tempo,
    pub energy: Energy,
    pub part: Part,
    pub right_hand: RightHand,
    pub auto_assist: bool,
    pub instrument: InstrumentMode,
    pub output: OutputMode,
    pub fill_pending: bool,
    pub fill_intensity: FillIntensity,
    pub end_pending: bool,
    pub ending_type: EndingType,
    pub ending_bars_left: u8,
    pub mud_guard: MudGuardLevel,
    pub humanize: HumanizeSettings,
}

/// Everything one session knows
#[derive(Debug, Clone)]
pub struct EngineState {
    pub chord: String,
    pub style: String,
    pub groove_preset: String,
    pub meter: Meter,
    pub energy: Energy,
    pub part: Part,
    pub right_hand: RightHand,
    pub auto_assist: bool,
    pub instrument: InstrumentMode,
    pub output: OutputMode,
    pub tempo: Tempo,
    pub humanize: HumanizeSettings,
    pub pending: PendingChanges,
    pub transitions: TransitionState,
    pub mud_guard: AntiMudGuard,
    pub bar_index: u64,
    pub memory: VoicingMemory,
}

impl EngineState {
    pub fn new(defaults: &Defaults, config: &EngineConfig) -> Self {
        EngineState {
            chord: crate::types::chord::normalize(&defaults.chord),
            style: defaults.style.clone(),
            groove_preset: defaults.groove_preset.clone(),
            meter: Meter::default(),
            energy: defaults.energy,
            part: defaults.part,
            right_hand: defaults.right_hand,
            auto_assist: defaults.auto_assist,
            instrument: defaults.instrument,
            output: defaults.output,
            tempo: Tempo::new(defaults.bpm),
            humanize: config.humanize.clamped(),
            pending: PendingChanges::default(),
            transitions: TransitionState::new(),
            mud_guard: AntiMudGuard::new(config.mud_guard_window_secs),
            bar_index: 0,
            memory: VoicingMemory::default(),
        }
    }

    /// Reset the transport side of the session before a new hold
    pub fn begin_session(&mut self) {
        self.bar_index = 0;
        self.pending.clear();
        self.transitions.clear();
        self.mud_guard.clear();
        self.memory = VoicingMemory::default();
    }

    /// Apply one change now. A part change with auto-assist on also picks
    /// the energy and, for an auto right hand, the chorus figure.
    pub fn apply(&mut self, setting: Setting) {
        match setting {
            Setting::Chord(c) => self.chord = c,
            Setting::Style(s) => self.style = s,
            Setting::GroovePreset(p) => self.groove_preset = p,
            Setting::Energy(e) => self.energy = e,
            Setting::Part(p) => {
                self.part = p;
                if self.auto_assist {
                    self.assist_part(p);
                }
            }
            Setting::RightHand(r) => self.right_hand = r,
            Setting::AutoAssist(a) => self.auto_assist = a,
            Setting::Instrument(i) => self.instrument = i,
            Setting::Output(o) => self.output = o,
        }
    }

    fn assist_part(&mut self, part: Part) {
        self.energy = match part {
            Part::Chorus => Energy::High,
            Part::Verse => Energy::Low,
        };
        if part == Part::Chorus && self.right_hand == RightHand::Auto {
            self.right_hand = RightHand::Down;
        }
    }

    /// Apply every pending change in commit order; returns what was applied
    pub fn commit_pending(&mut self) -> Vec<Setting> {
        let changes = self.pending.drain();
        for setting in &changes {
            self.apply(setting.clone());
        }
        changes
    }

    /// Anything that will change the sound at the next boundary
    pub fn will_change_soon(&self) -> bool {
        !self.pending.is_empty() || self.transitions.is_active()
    }

    pub fn play_state(&self, running: bool) -> PlayState {
        if !running {
            PlayState::Stopped
        } else if self.transitions.ending_bars_left() > 0 {
            PlayState::Ending {
                bars_remaining: self.transitions.ending_bars_left(),
            }
        } else {
            PlayState::Holding
        }
    }

    pub fn snapshot(&self, running: bool) -> EngineSnapshot {
        EngineSnapshot {
            running,
            play_state: self.play_state(running),
            bar_index: self.bar_index,
            chord: self.chord.clone(),
            pending_chord: self.pending.chord().map(str::to_string),
            style: self.style.clone(),
            groove_preset: self.groove_preset.clone(),
            meter: self.meter,
            tempo: self.tempo,
            energy: self.energy,
            part: self.part,
            right_hand: self.right_hand,
            auto_assist: self.auto_assist,
            instrument: self.instrument,
            output: self.output,
            fill_pending: self.transitions.fill_pending(),
            fill_intensity: self.transitions.fill_intensity(),
            end_pending: self.transitions.end_pending(),
            ending_type: self.transitions.ending_type(),
            ending_bars_left: self.transitions.ending_bars_left(),
            mud_guard: self.mud_guard.level(),
            humanize: self.humanize,
        }
    }
}
