//! Outbound seams: the event sink and the state observer
//!
//! Both are fire-and-forget. The engine never waits on them and never looks
//! at what they do with an event.

use crate::engine::event::Event;
use crate::engine::humanize::HumanizeSettings;
use crate::engine::mud_guard::MudGuardLevel;
use crate::engine::state::{EngineSnapshot, Setting};
use crate::types::settings::{EndingType, FillIntensity, Track};
use serde::Serialize;
use std::fmt;

/// Receives scheduled events, in order
pub trait EventSink {
    fn dispatch(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn dispatch(&mut self, event: Event) {
        self.push(event);
    }
}

impl<F: FnMut(Event)> EventSink for F {
    fn dispatch(&mut self, event: Event) {
        self(event)
    }
}

/// A resolution that fell back to a safe default
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Degradation {
    /// No root letter; the piano plays its fallback voicing and the guitar bass its shape's bass
    UnparsableChord { chord: String },
    /// No guitar shape for the chord; the safe shape is used
    MissingShape { chord: String },
    /// A style names a pattern the library does not have; the track is skipped
    MissingPattern { track: Track, pattern: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::UnparsableChord { chord } => write!(f, "cannot parse chord '{}'", chord),
            Degradation::MissingShape { chord } => write!(f, "no guitar shape for '{}'", chord),
            Degradation::MissingPattern { track, pattern } => {
                write!(f, "{} pattern '{}' not found", track, pattern)
            }
        }
    }
}

/// Session notifications for UIs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateEvent {
    Start { snapshot: EngineSnapshot },
    Stop,
    BarBoundary { snapshot: EngineSnapshot },
    /// A setting changed immediately (engine idle)
    Applied { change: Setting },
    /// A setting was queued for the next bar boundary
    Pending { change: Setting },
    ChordPending {
        current: String,
        pending: String,
        mud_guard_level: MudGuardLevel,
    },
    TempoTarget { target: f64, current: f64 },
    Humanize { settings: HumanizeSettings },
    FillPending { intensity: FillIntensity },
    FillUsed { intensity: FillIntensity },
    EndingPending { ending: EndingType },
    EndingStart { bars: u8, ending: EndingType },
    EndingDone { stop_at: f64 },
    OneShot { chord: String, time: f64 },
    Degraded { degradation: Degradation },
}

impl StateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StateEvent::Start { .. } => "start",
            StateEvent::Stop => "stop",
            StateEvent::BarBoundary { .. } => "barBoundary",
            StateEvent::Applied { .. } => "applied",
            StateEvent::Pending { .. } => "pending",
            StateEvent::ChordPending { .. } => "chordPending",
            StateEvent::TempoTarget { .. } => "tempoTarget",
            StateEvent::Humanize { .. } => "humanize",
            StateEvent::FillPending { .. } => "fillPending",
            StateEvent::FillUsed { .. } => "fillUsed",
            StateEvent::EndingPending { .. } => "endingPending",
            StateEvent::EndingStart { .. } => "endingStart",
            StateEvent::EndingDone { .. } => "endingDone",
            StateEvent::OneShot { .. } => "oneShot",
            StateEvent::Degraded { .. } => "degraded",
        }
    }
}

/// Receives session notifications
pub trait StateObserver {
    fn on_state(&mut self, event: StateEvent);
}

impl StateObserver for () {
    fn on_state(&mut self, _event: StateEvent) {}
}

impl StateObserver for Vec<StateEvent> {
    fn on_state(&mut self, event: StateEvent) {
        self.push(event);
    }
}

impl<F: FnMut(StateEvent)> StateObserver for F {
    fn on_state(&mut self, event: StateEvent) {
        self(event)
    }
}
