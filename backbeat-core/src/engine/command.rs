//! The control surface as data
//!
//! Hosts that drive the engine from another thread send these through a
//! queue and apply them between ticks with [`Engine::execute`].

use crate::engine::clock::Clock;
use crate::engine::dispatch::{EventSink, StateObserver};
use crate::engine::humanize::HumanizeSettings;
use crate::engine::scheduler::Engine;
use crate::error::EngineResult;
use crate::types::settings::{
    EndingType, Energy, FillIntensity, InstrumentMode, OutputMode, Part, RightHand,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    StartHold(Option<String>),
    Stop,
    OneShot(Option<String>),
    SetChord(String),
    SetTempo(f64),
    SetStyle(String),
    SetGroovePreset(String),
    SetEnergy(Energy),
    SetPart(Part),
    SetRightHand(RightHand),
    SetAutoAssist(bool),
    SetInstrument(InstrumentMode),
    SetOutput(OutputMode),
    SetHumanize(HumanizeSettings),
    TriggerFill(FillIntensity),
    TriggerEnd(EndingType),
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::StartHold(Some(c)) => write!(f, "start {}", c),
            EngineCommand::StartHold(None) => write!(f, "start"),
            EngineCommand::Stop => write!(f, "stop"),
            EngineCommand::OneShot(Some(c)) => write!(f, "one-shot {}", c),
            EngineCommand::OneShot(None) => write!(f, "one-shot"),
            EngineCommand::SetChord(c) => write!(f, "chord {}", c),
            EngineCommand::SetTempo(bpm) => write!(f, "tempo {}", bpm),
            EngineCommand::SetStyle(s) => write!(f, "style {}", s),
            EngineCommand::SetGroovePreset(g) => write!(f, "groove {}", g),
            EngineCommand::SetEnergy(e) => write!(f, "energy {}", e),
            EngineCommand::SetPart(p) => write!(f, "part {}", p),
            EngineCommand::SetRightHand(r) => write!(f, "hand {}", r),
            EngineCommand::SetAutoAssist(on) => {
                write!(f, "assist {}", if *on { "on" } else { "off" })
            }
            EngineCommand::SetInstrument(i) => write!(f, "instrument {}", i),
            EngineCommand::SetOutput(o) => write!(f, "output {}", o),
            EngineCommand::SetHumanize(h) => write!(f, "humanize loi={} human={}", h.loi, h.human),
            EngineCommand::TriggerFill(i) => write!(f, "fill {}", i),
            EngineCommand::TriggerEnd(e) => write!(f, "end {}", e),
        }
    }
}

impl<C: Clock, S: EventSink, O: StateObserver> Engine<C, S, O> {
    /// Apply one command. Only style changes, starts and one-shots can fail.
    pub fn execute(&mut self, command: EngineCommand) -> EngineResult<()> {
        match command {
            EngineCommand::StartHold(chord) => self.start_hold(chord.as_deref())?,
            EngineCommand::Stop => self.stop(),
            EngineCommand::OneShot(chord) => {
                self.one_shot(chord.as_deref())?;
            }
            EngineCommand::SetChord(chord) => self.set_chord(&chord),
            EngineCommand::SetTempo(bpm) => self.set_tempo(bpm),
            EngineCommand::SetStyle(id) => self.set_style(&id)?,
            EngineCommand::SetGroovePreset(id) => self.set_groove_preset(&id),
            EngineCommand::SetEnergy(energy) => self.set_energy(energy),
            EngineCommand::SetPart(part) => self.set_part(part),
            EngineCommand::SetRightHand(hand) => self.set_right_hand(hand),
            EngineCommand::SetAutoAssist(on) => self.set_auto_assist(on),
            EngineCommand::SetInstrument(instrument) => self.set_instrument(instrument),
            EngineCommand::SetOutput(output) => self.set_output(output),
            EngineCommand::SetHumanize(settings) => self.set_humanize(settings),
            EngineCommand::TriggerFill(intensity) => {
                self.trigger_fill(intensity);
            }
            EngineCommand::TriggerEnd(ending) => {
                self.trigger_end(ending);
            }
        }
        Ok(())
    }
}
