//! Bar scheduler: the real-time core loop
//!
//! The host calls [`Engine::tick`] on a short interval. Each call schedules
//! every bar whose start falls inside the lookahead horizon. For each bar the
//! engine first commits pending changes, then resolves voicings and patterns
//! and emits that bar's events, then advances to the next bar start.
//!
//! Setters apply at once while idle and queue for the next bar boundary while
//! running, so a bar never sees half of a change.

use crate::engine::clock::Clock;
use crate::engine::config::EngineConfig;
use crate::engine::dispatch::{Degradation, EventSink, StateEvent, StateObserver};
use crate::engine::event::{BarInfo, Event, EventBody, Hint};
use crate::engine::groove::{merge, GrooveProfile};
use crate::engine::humanize::{
    is_dropped, HumanizeSettings, Humanizer, JitterKey, SlotPosition, VelocityFactors,
};
use crate::engine::mud_guard::MudGuardLevel;
use crate::engine::selector::{select_pattern_id, Selection};
use crate::engine::state::{clamp_bpm, EngineSnapshot, EngineState, Setting};
use crate::engine::transition::BarOutcome;
use crate::error::EngineResult;
use crate::library::Library;
use crate::types::chord::{normalize, parse, ParsedChord};
use crate::types::pattern::{Action, EnergyRule, Pattern, PatternEvent, Role};
use crate::types::settings::{
    EndingType, Energy, FillIntensity, InstrumentMode, OutputMode, Part, RightHand, Track,
};
use crate::types::shape::GuitarShape;
use crate::types::time::{seconds_per_beat, Meter};
use crate::types::voice_leading::{
    choose_bass_pitch, GuitarVoiceLeader, PianoVoiceLeader, PianoVoicing, BASS_CENTER,
};
use log::{debug, trace, warn};
use std::sync::Arc;

/// Tail factor for the last two slots when anything is about to change
const WILL_CHANGE_TAIL: f64 = 0.55;
/// Compact output shortens strums
const COMPACT_STRUM_TRIM: f64 = 0.85;
const MIN_DURATION: f64 = 0.05;
const MAX_BAR_SHARE: f64 = 0.95;

const MUTE_STRUM_SHARE: f64 = 0.35;
const MUTE_STRUM_MAX: f64 = 0.25;

const PIANO_BASS_TRIM: f64 = 0.95;
const PIANO_BASS_MAX: f64 = 0.90;
const PIANO_CHORD_MAX: f64 = 0.88;
const PIANO_BAND_TRIM: f64 = 0.72;
const PIANO_MIN_VELOCITY: f64 = 0.05;

const EXTERNAL_STRUM_STRINGS: [u8; 6] = [6, 5, 4, 3, 2, 1];
const COMPACT_STRUM_STRINGS: [u8; 5] = [5, 4, 3, 2, 1];
const MUTE_STRUM_STRINGS: [u8; 4] = [4, 3, 2, 1];

/// Everything the track emitters need about the bar being scheduled
struct BarContext<'a> {
    bar_start: f64,
    bar_index: u64,
    chord: &'a str,
    parsed: Option<&'a ParsedChord>,
    groove: &'a GrooveProfile,
    guard: MudGuardLevel,
    will_change: bool,
    meter: Meter,
    bpm: f64,
    shape: Option<&'a GuitarShape>,
    voicing: Option<&'a PianoVoicing>,
}

impl BarContext<'_> {
    fn bar_seconds(&self) -> f64 {
        self.meter.bar_seconds(self.bpm)
    }

    /// Tail factor for the final two slots of a pattern
    fn tail_factor(&self) -> f64 {
        if self.will_change {
            WILL_CHANGE_TAIL
        } else {
            self.guard.tail_factor()
        }
    }
}

/// One accompaniment session
pub struct Engine<C: Clock, S: EventSink, O: StateObserver = ()> {
    library: Arc<Library>,
    config: EngineConfig,
    clock: C,
    sink: S,
    observer: O,
    state: EngineState,
    piano: PianoVoiceLeader,
    running: bool,
    next_bar_time: f64,
    last_one_shot: Option<f64>,
}

impl<C: Clock, S: EventSink> Engine<C, S, ()> {
    /// Create an idle session without a state observer
    pub fn new(library: Arc<Library>, config: EngineConfig, clock: C, sink: S) -> EngineResult<Self> {
        Engine::with_observer(library, config, clock, sink, ())
    }
}

impl<C: Clock, S: EventSink, O: StateObserver> Engine<C, S, O> {
    /// Create an idle session. Fails if the library's default style is unknown.
    pub fn with_observer(
        library: Arc<Library>,
        config: EngineConfig,
        clock: C,
        sink: S,
        observer: O,
    ) -> EngineResult<Self> {
        let mut state = EngineState::new(&library.defaults, &config);
        state.meter = library.style(&state.style)?.meter;
        let piano = PianoVoiceLeader::new(library.piano.target_center);

        Ok(Engine {
            library,
            config,
            clock,
            sink,
            observer,
            state,
            piano,
            running: false,
            next_bar_time: 0.0,
            last_one_shot: None,
        })
    }

    // Transport

    /// Start holding a chord. The first bar starts shortly after now.
    /// While already running the chord is queued like [`Engine::set_chord`].
    pub fn start_hold(&mut self, chord: Option<&str>) -> EngineResult<()> {
        if self.running {
            if let Some(chord) = chord {
                self.set_chord(chord);
            }
            return Ok(());
        }

        let meter = self.library.style(&self.state.style)?.meter;
        if let Some(chord) = chord.map(normalize).filter(|c| !c.is_empty()) {
            self.state.chord = chord;
        }

        self.state.begin_session();
        self.state.meter = meter;
        self.running = true;
        self.next_bar_time = self.clock.now() + self.config.start_latency_secs;
        debug!(
            "Hold started on {} ({} {}, {:.1} bpm), first bar at {:.3}s",
            self.state.chord, self.state.style, meter, self.state.tempo.current, self.next_bar_time
        );

        let snapshot = self.snapshot();
        self.notify(StateEvent::Start { snapshot });
        self.tick();
        Ok(())
    }

    /// Halt scheduling at once. A stop-at event at the current time lets the
    /// renderer fade whatever is still sounding.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        let now = self.clock.now();
        self.sink.dispatch(Event::stop_at(now, &self.state.chord));
        self.halt();
    }

    fn halt(&mut self) {
        self.running = false;
        self.state.pending.clear();
        self.state.transitions.clear();
        debug!("Stopped after {} bars", self.state.bar_index);
        self.notify(StateEvent::Stop);
    }

    /// Schedule every bar that starts inside the lookahead horizon
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        let horizon = self.clock.now() + self.config.lookahead_secs;

        while self.running && self.next_bar_time < horizon {
            self.commit_bar_boundary();

            let bar_start = self.next_bar_time;
            let bar_seconds = self.state.meter.bar_seconds(self.state.tempo.current);
            self.emit_bar(bar_start, false);

            match self.state.transitions.complete_bar() {
                BarOutcome::Normal => {}
                BarOutcome::FillUsed(intensity) => {
                    self.notify(StateEvent::FillUsed { intensity });
                }
                BarOutcome::EndingContinues { remaining } => {
                    trace!("Ending: {} bars left", remaining);
                }
                BarOutcome::EndingDone => {
                    let stop_at = bar_start + bar_seconds;
                    self.sink.dispatch(Event::stop_at(stop_at, &self.state.chord));
                    self.notify(StateEvent::EndingDone { stop_at });
                    self.halt();
                }
            }

            self.next_bar_time += bar_seconds;
            self.state.bar_index += 1;
        }
    }

    /// Play one bar of the current chord shortly after now, while idle.
    /// Returns false if the engine is running or the call is inside the
    /// retrigger window.
    pub fn one_shot(&mut self, chord: Option<&str>) -> EngineResult<bool> {
        if self.running {
            return Ok(false);
        }
        let now = self.clock.now();
        if let Some(last) = self.last_one_shot {
            if now - last < self.config.one_shot_min_interval_secs {
                debug!("One-shot skipped: {:.3}s since the last one", now - last);
                return Ok(false);
            }
        }

        self.state.meter = self.library.style(&self.state.style)?.meter;
        if let Some(chord) = chord.map(normalize).filter(|c| !c.is_empty()) {
            self.state.chord = chord;
        }
        self.last_one_shot = Some(now);

        let start = now + self.config.one_shot_lead_secs;
        let memory = self.state.memory.clone();
        self.emit_bar(start, true);
        self.state.memory = memory;

        let chord = self.state.chord.clone();
        self.notify(StateEvent::OneShot { chord, time: start });
        Ok(true)
    }

    // Bar boundary

    fn commit_bar_boundary(&mut self) {
        let cfg = &self.config;
        self.state
            .tempo
            .ease(cfg.tempo_max_step_per_bar, cfg.tempo_easing, cfg.tempo_snap_bpm);

        for change in self.state.commit_pending() {
            debug!("Bar {}: committed {}", self.state.bar_index, change);
        }

        let library = Arc::clone(&self.library);
        match library.style(&self.state.style) {
            Ok(style) => {
                self.state.meter = style.meter;
                if let Some(bars) = self.state.transitions.commit(style.ending_bar_count()) {
                    let ending = self.state.transitions.ending_type();
                    debug!("Bar {}: {} ending over {} bars", self.state.bar_index, ending, bars);
                    self.notify(StateEvent::EndingStart { bars, ending });
                }
            }
            Err(err) => warn!("{}", err),
        }

        self.state.mud_guard.refresh(self.clock.now());
        let snapshot = self.snapshot();
        self.notify(StateEvent::BarBoundary { snapshot });
    }

    fn emit_bar(&mut self, bar_start: f64, one_shot: bool) {
        let library = Arc::clone(&self.library);
        let style = match library.style(&self.state.style) {
            Ok(style) => style,
            Err(err) => {
                warn!("Bar skipped: {}", err);
                return;
            }
        };

        let chord = self.state.chord.clone();
        let parsed = parse(&chord);
        if parsed.is_none() {
            self.degrade(Degradation::UnparsableChord {
                chord: chord.clone(),
            });
        }
        self.state.memory.bass.follow_chord(&chord);

        let bar_index = self.state.bar_index;
        let preset = library.groove_preset(&self.state.groove_preset);
        let groove = merge(&style.groove_base, &preset, bar_index);
        let transitions = &self.state.transitions;
        let selection = Selection {
            part: self.state.part,
            right_hand: self.state.right_hand,
            transition: transitions.mode(),
            fill_intensity: transitions.fill_intensity(),
            ending_type: transitions.ending_type(),
        };
        let guard = self.state.mud_guard.level();
        let instrument = self.state.instrument;

        let info = BarInfo {
            bar_index,
            bpm: self.state.tempo.current,
            meter: self.state.meter,
            style: self.state.style.clone(),
            groove_preset: self.state.groove_preset.clone(),
            energy: self.state.energy,
            part: self.state.part,
            right_hand: self.state.right_hand,
            instrument,
            output: self.state.output,
            transition: selection.transition,
            fill_intensity: selection.fill_intensity,
            ending_type: selection.ending_type,
            mud_guard_level: guard,
            one_shot,
        };
        self.sink.dispatch(Event::bar(bar_start, &chord, info));

        let shape = if instrument.uses_guitar() {
            let resolved = GuitarVoiceLeader::new(&library.guitar_shapes)
                .resolve_shape(&chord, self.state.memory.guitar.as_ref());
            if resolved.is_fallback() {
                self.degrade(Degradation::MissingShape {
                    chord: chord.clone(),
                });
            }
            let shape = resolved.into_inner();
            self.state.memory.guitar = Some(shape.clone());
            Some(shape)
        } else {
            None
        };

        let voicing = if instrument.uses_piano() {
            let voicing = self
                .piano
                .resolve_voicing(parsed.as_ref(), self.state.memory.piano.as_ref())
                .into_inner();
            self.state.memory.piano = Some(voicing.clone());
            Some(voicing)
        } else {
            None
        };

        let ctx = BarContext {
            bar_start,
            bar_index,
            chord: &chord,
            parsed: parsed.as_ref(),
            groove: &groove,
            guard,
            will_change: self.state.will_change_soon(),
            meter: self.state.meter,
            bpm: self.state.tempo.current,
            shape: shape.as_ref(),
            voicing: voicing.as_ref(),
        };

        for &track in Track::ALL {
            let enabled = match track {
                Track::Guitar => instrument.uses_guitar(),
                Track::Piano => instrument.uses_piano(),
                Track::Perc => instrument.uses_perc(),
            };
            if !enabled {
                continue;
            }
            let Some(id) = select_pattern_id(style, track, &selection) else {
                trace!("Style {} has no {} part", self.state.style, track);
                continue;
            };
            match library.pattern(id) {
                Some(pattern) => self.emit_track(track, pattern, &ctx),
                None => self.degrade(Degradation::MissingPattern {
                    track,
                    pattern: id.to_string(),
                }),
            }
        }
    }

    fn emit_track(&mut self, track: Track, pattern: &Pattern, ctx: &BarContext) {
        let rule = pattern.energy_rule(self.state.energy);
        let humanizer = Humanizer::new(self.state.humanize);
        let output = self.state.output;

        for (index, ev) in pattern.events.iter().enumerate() {
            let key = JitterKey {
                chord: ctx.chord,
                bar_index: ctx.bar_index,
                track,
                pattern_id: &pattern.id,
                event_index: index,
            };
            if is_dropped(&key, rule.density_drop) {
                trace!("Dropped {} event {} of {}", track, index, pattern.id);
                continue;
            }

            let slot = SlotPosition {
                bar_start: ctx.bar_start,
                meter: ctx.meter,
                bpm: ctx.bpm,
                position: ev.position,
                subdivision: pattern.subdivision,
                role: ev.role,
            };
            let time = humanizer.event_time(&slot, ctx.groove, &key);
            let velocity = humanizer.velocity(&VelocityFactors {
                base: ev.velocity,
                energy: rule.velocity_mul,
                pattern_accent: pattern.accent_at(ev.position),
                groove_accent: ctx.groove.accent_multiplier,
                bar_dynamics: ctx.groove.bar_dynamics(),
                role: ev.role.velocity_multiplier(),
                output_trim: output.velocity_trim(),
            });
            let duration = note_duration(ev, &rule, output, pattern.slots(), ctx);
            let hint = Hint {
                accent: pattern.is_accented(ev.position),
                mud_guard_level: ctx.guard,
            };

            let base = Note {
                velocity,
                duration,
                hint,
            };
            let resolved = match track {
                Track::Guitar => self.guitar_note(ev, ctx, base, humanizer.strum_spread_ms(ctx.bpm)),
                Track::Piano => self.piano_note(ev, ctx, base),
                Track::Perc => perc_note(ev, base),
            };
            let Some((body, note)) = resolved else {
                trace!("{} event {} of {} has nothing to play", track, index, pattern.id);
                continue;
            };

            self.sink.dispatch(Event {
                time,
                slot: ev.position,
                chord: ctx.chord.to_string(),
                velocity: note.velocity,
                duration: note.duration,
                body,
            });
        }
    }

    fn guitar_note(
        &mut self,
        ev: &PatternEvent,
        ctx: &BarContext,
        note: Note,
        spread_ms: f64,
    ) -> Option<(EventBody, Note)> {
        let shape = ctx.shape?.clone();
        let hint = note.hint;

        if ev.role == Role::Bass && ev.action.is_pick() {
            let pitch = match ctx.parsed {
                Some(parsed) => choose_bass_pitch(parsed, &mut self.state.memory.bass, ev.bass_tone),
                None => shape.bass_pitch().unwrap_or(BASS_CENTER),
            };
            return Some((EventBody::GuitarBass { pitch, shape, hint }, note));
        }

        if ev.action.is_pick() {
            let string = if ev.role == Role::Treble {
                shape.treble_string()
            } else {
                shape.mid_string()
            };
            let body = EventBody::GuitarPick {
                role: ev.role,
                string,
                shape,
                hint,
            };
            return Some((body, note));
        }

        if ev.action.is_strum() {
            let strings = ev.strings.clone().unwrap_or_else(|| match self.state.output {
                OutputMode::External => EXTERNAL_STRUM_STRINGS.to_vec(),
                OutputMode::Compact => COMPACT_STRUM_STRINGS.to_vec(),
            });
            let body = EventBody::GuitarStrum {
                direction: ev.direction,
                spread_ms,
                strings,
                muted: ev.muted,
                shape,
                hint,
            };
            return Some((body, note));
        }

        if ev.action.is_mute_strum() {
            let strings = ev.strings.clone().unwrap_or_else(|| MUTE_STRUM_STRINGS.to_vec());
            let body = EventBody::GuitarMuteStrum {
                direction: ev.direction,
                spread_ms,
                strings,
                shape,
                hint,
            };
            let duration = (note.duration * MUTE_STRUM_SHARE).clamp(MIN_DURATION, MUTE_STRUM_MAX);
            return Some((body, Note { duration, ..note }));
        }

        None
    }

    fn piano_note(&self, ev: &PatternEvent, ctx: &BarContext, note: Note) -> Option<(EventBody, Note)> {
        let voicing = ctx.voicing?;
        let band = self.state.instrument == InstrumentMode::Band;

        if ev.role == Role::Bass || ev.action == Action::Bass {
            // in band mode the left hand only plays through external output
            if band && self.state.output != OutputMode::External {
                return None;
            }
            let body = EventBody::PianoBass {
                pitch: voicing.bass,
                hint: note.hint,
            };
            let velocity = (note.velocity * PIANO_BASS_TRIM).clamp(PIANO_MIN_VELOCITY, PIANO_BASS_MAX);
            return Some((body, Note { velocity, ..note }));
        }

        let body = EventBody::PianoChord {
            pitches: voicing.notes.clone(),
            staccato: ev.staccato,
            hint: note.hint,
        };
        let trim = if band { PIANO_BAND_TRIM } else { 1.0 };
        let velocity = (note.velocity * trim).clamp(PIANO_MIN_VELOCITY, PIANO_CHORD_MAX);
        Some((body, Note { velocity, ..note }))
    }

    // Setters

    /// Change the chord. While running it is queued and counts toward the mud guard.
    pub fn set_chord(&mut self, chord: &str) {
        let chord = normalize(chord);
        if chord.is_empty() {
            return;
        }
        if !self.running {
            self.change(Setting::Chord(chord));
            return;
        }

        let level = self.state.mud_guard.record_change(self.clock.now());
        self.state.pending.queue(Setting::Chord(chord.clone()));
        let current = self.state.chord.clone();
        self.notify(StateEvent::ChordPending {
            current,
            pending: chord,
            mud_guard_level: level,
        });
    }

    /// Change the style. Unknown ids are rejected before they can be queued.
    pub fn set_style(&mut self, id: &str) -> EngineResult<()> {
        let meter = self.library.style(id)?.meter;
        self.change(Setting::Style(id.to_string()));
        if !self.running {
            self.state.meter = meter;
        }
        Ok(())
    }

    /// Change the groove preset; unknown ids fall back to the library default
    pub fn set_groove_preset(&mut self, id: &str) {
        let id = if self.library.has_groove_preset(id) {
            id.to_string()
        } else {
            warn!(
                "Unknown groove preset '{}', using '{}'",
                id, self.library.defaults.groove_preset
            );
            self.library.defaults.groove_preset.clone()
        };
        self.change(Setting::GroovePreset(id));
    }

    pub fn set_energy(&mut self, energy: Energy) {
        self.change(Setting::Energy(energy));
    }

    pub fn set_part(&mut self, part: Part) {
        self.change(Setting::Part(part));
    }

    pub fn set_right_hand(&mut self, right_hand: RightHand) {
        self.change(Setting::RightHand(right_hand));
    }

    pub fn set_auto_assist(&mut self, on: bool) {
        self.change(Setting::AutoAssist(on));
    }

    pub fn set_instrument(&mut self, instrument: InstrumentMode) {
        self.change(Setting::Instrument(instrument));
    }

    pub fn set_output(&mut self, output: OutputMode) {
        self.change(Setting::Output(output));
    }

    /// Set the tempo target, clamped to 40-220 bpm. While running the tempo
    /// eases toward it bar by bar; while idle it takes effect at once.
    pub fn set_tempo(&mut self, bpm: f64) {
        if !bpm.is_finite() {
            return;
        }
        let bpm = clamp_bpm(bpm);
        self.state.tempo.target = bpm;
        if !self.running {
            self.state.tempo.current = bpm;
        }
        let tempo = self.state.tempo;
        self.notify(StateEvent::TempoTarget {
            target: tempo.target,
            current: tempo.current,
        });
    }

    pub fn set_humanize(&mut self, settings: HumanizeSettings) {
        self.state.humanize = settings.clamped();
        let settings = self.state.humanize;
        self.notify(StateEvent::Humanize { settings });
    }

    /// Arm the next bar as a fill. Ignored while idle or during an ending.
    pub fn trigger_fill(&mut self, intensity: FillIntensity) -> bool {
        if !self.running || !self.state.transitions.trigger_fill(intensity) {
            debug!("Fill ignored");
            return false;
        }
        self.notify(StateEvent::FillPending { intensity });
        true
    }

    /// Arm an ending at the next bar boundary. Ignored while idle or if an
    /// ending is already armed or running.
    pub fn trigger_end(&mut self, ending: EndingType) -> bool {
        if !self.running || !self.state.transitions.trigger_end(ending) {
            debug!("Ending ignored");
            return false;
        }
        self.notify(StateEvent::EndingPending { ending });
        true
    }

    fn change(&mut self, setting: Setting) {
        if self.running {
            trace!("Queued {}", setting);
            self.state.pending.queue(setting.clone());
            self.notify(StateEvent::Pending { change: setting });
        } else {
            self.state.apply(setting.clone());
            self.notify(StateEvent::Applied { change: setting });
        }
    }

    fn degrade(&mut self, degradation: Degradation) {
        warn!("{}", degradation);
        self.notify(StateEvent::Degraded { degradation });
    }

    fn notify(&mut self, event: StateEvent) {
        self.observer.on_state(event);
    }

    // Accessors

    pub fn snapshot(&self) -> EngineSnapshot {
        self.state.snapshot(self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start time of the next bar to be scheduled
    pub fn next_bar_time(&self) -> f64 {
        self.next_bar_time
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

/// Final velocity and length of one note, before instrument rules
#[derive(Debug, Clone, Copy)]
struct Note {
    velocity: f64,
    duration: f64,
    hint: Hint,
}

fn perc_note(ev: &PatternEvent, note: Note) -> Option<(EventBody, Note)> {
    match ev.action {
        Action::Perc(sound) => Some((EventBody::Perc { sound, hint: note.hint }, note)),
        _ => None,
    }
}

/// Note length in seconds: pattern length scaled by energy, trimmed for
/// compact strums and for the last two slots, then held inside the bar
fn note_duration(
    ev: &PatternEvent,
    rule: &EnergyRule,
    output: OutputMode,
    slots: u8,
    ctx: &BarContext,
) -> f64 {
    let mut d = ev.dur_beats * rule.duration_mul * seconds_per_beat(ctx.bpm);
    if output == OutputMode::Compact && (ev.action.is_strum() || ev.action.is_mute_strum()) {
        d *= COMPACT_STRUM_TRIM;
    }
    if ev.position + 2 >= slots {
        d *= ctx.tail_factor();
    }
    d.clamp(MIN_DURATION, ctx.bar_seconds() * MAX_BAR_SHARE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use crate::engine::event::EventKind;
    use crate::error::EngineError;
    use crate::types::style::{GrooveBase, GroovePreset};

    type TestEngine = Engine<ManualClock, Vec<Event>, Vec<StateEvent>>;

    fn engine() -> (TestEngine, ManualClock) {
        let clock = ManualClock::new(0.0);
        let library = Arc::new(Library::builtin().unwrap());
        let engine = Engine::with_observer(
            library,
            EngineConfig::default(),
            clock.clone(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap();
        (engine, clock)
    }

    fn bars(events: &[Event]) -> Vec<&BarInfo> {
        events.iter().filter_map(Event::bar_info).collect()
    }

    #[test]
    fn test_start_schedules_first_bar() {
        let (mut engine, _clock) = engine();
        engine.start_hold(Some("dm")).unwrap();
        let events = engine.sink();
        assert_eq!(bars(events).len(), 1);
        assert!(events[0].is_bar());
        assert_eq!(events[0].chord, "Dm");
        assert!((events[0].time - 0.10).abs() < 1e-9);
        assert!(events.iter().any(|e| e.kind() == EventKind::Guitar));
        assert!(engine.is_running());
    }

    #[test]
    fn test_idle_setters_apply_at_once() {
        let (mut engine, _clock) = engine();
        engine.set_chord("Am");
        engine.set_style("waltz").unwrap();
        engine.set_tempo(300.0);
        let snap = engine.snapshot();
        assert_eq!(snap.chord, "Am");
        assert_eq!(snap.meter, Meter::ThreeFour);
        assert_eq!(snap.tempo.current, 220.0);
        assert!(engine.sink().is_empty());
    }

    #[test]
    fn test_unknown_style_rejected() {
        let (mut engine, _clock) = engine();
        assert_eq!(
            engine.set_style("polka"),
            Err(EngineError::UnknownStyle("polka".into()))
        );
        assert_eq!(engine.snapshot().style, "bolero");
    }

    #[test]
    fn test_running_setters_queue() {
        let (mut engine, _clock) = engine();
        engine.start_hold(None).unwrap();
        engine.set_energy(Energy::High);
        assert_eq!(engine.snapshot().energy, Energy::Normal);
        assert!(matches!(
            engine.observer().last(),
            Some(StateEvent::Pending { change: Setting::Energy(Energy::High) })
        ));
    }

    #[test]
    fn test_stop_emits_stop_at() {
        let (mut engine, clock) = engine();
        engine.start_hold(None).unwrap();
        clock.set(1.0);
        engine.stop();
        assert!(!engine.is_running());
        let last = engine.sink().last().unwrap();
        assert!(last.is_stop());
        assert_eq!(last.time, 1.0);
        assert!(matches!(engine.observer().last(), Some(StateEvent::Stop)));

        engine.tick();
        let stops = engine.sink().iter().filter(|e| e.is_stop()).count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn test_fill_ignored_when_idle() {
        let (mut engine, _clock) = engine();
        assert!(!engine.trigger_fill(FillIntensity::Hard));
        assert!(!engine.trigger_end(EndingType::Short));
    }

    #[test]
    fn test_piano_band_rules() {
        let (mut engine, _clock) = engine();
        engine.set_instrument(InstrumentMode::Band);
        engine.start_hold(Some("C")).unwrap();
        let events = engine.sink();
        assert!(!events
            .iter()
            .any(|e| matches!(e.body, EventBody::PianoBass { .. })));
        for e in events.iter().filter(|e| matches!(e.body, EventBody::PianoChord { .. })) {
            assert!(e.velocity <= PIANO_CHORD_MAX);
        }
        assert!(events.iter().any(|e| e.kind() == EventKind::Perc));
    }

    #[test]
    fn test_mute_strum_length() {
        let (mut engine, _clock) = engine();
        engine.set_style("reggae").unwrap();
        engine.start_hold(Some("G")).unwrap();
        let mut seen = 0;
        for e in engine.sink() {
            if let EventBody::GuitarMuteStrum { strings, .. } = &e.body {
                assert!(e.duration >= MIN_DURATION && e.duration <= MUTE_STRUM_MAX);
                assert_eq!(strings, &MUTE_STRUM_STRINGS.to_vec());
                seen += 1;
            }
        }
        assert!(seen > 0);
    }

    #[test]
    fn test_durations_inside_bar() {
        let (mut engine, clock) = engine();
        engine.start_hold(Some("Em")).unwrap();
        clock.set(20.0);
        engine.tick();
        let bar = Meter::FourFour.bar_seconds(84.0);
        for e in engine.sink().iter().filter(|e| !e.is_bar()) {
            assert!(e.duration >= MIN_DURATION - 1e-12);
            assert!(e.duration <= bar * MAX_BAR_SHARE + 1e-12);
            assert!((0.0..=1.0).contains(&e.velocity));
        }
    }

    const TAIL_LIBRARY: &str = r#"{
        "defaults": { "style": "s", "chord": "C", "bpm": 60, "autoAssist": false },
        "styles": { "s": { "guitar": { "verse": "p" } } },
        "patterns": [
            {
                "id": "p",
                "events": [
                    { "idx": 0, "durBeats": 1 },
                    { "idx": 4, "action": "brush", "durBeats": 1 },
                    { "idx": 6, "durBeats": 1 },
                    { "idx": 7, "durBeats": 1 }
                ],
                "energyRules": {
                    "low": { "velMul": 0.8, "densityDrop": 1, "durMul": 1 },
                    "high": { "velMul": 1.1, "densityDrop": 0.5, "durMul": 1 }
                }
            }
        ],
        "guitarShapes": { "C": ["x", 3, 2, 0, 1, 0], "G": [3, 2, 0, 0, 0, 3] }
    }"#;

    fn tail_engine() -> (TestEngine, ManualClock) {
        let clock = ManualClock::new(0.0);
        let library = Arc::new(Library::from_json_str(TAIL_LIBRARY).unwrap());
        let engine = Engine::with_observer(
            library,
            EngineConfig::default(),
            clock.clone(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap();
        (engine, clock)
    }

    /// Guitar event durations by slot, from `from` seconds on
    fn durations_from(events: &[Event], from: f64) -> Vec<(u8, f64)> {
        events
            .iter()
            .filter(|e| e.kind() == EventKind::Guitar && e.time >= from)
            .map(|e| (e.slot, e.duration))
            .collect()
    }

    fn duration_at(durations: &[(u8, f64)], slot: u8) -> f64 {
        durations
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, d)| *d)
            .unwrap()
    }

    /// Starts at 60 BPM, makes `changes` chord changes at 2.0 s and schedules bar 1
    fn bar_after_changes(changes: usize) -> Vec<(u8, f64)> {
        let (mut engine, clock) = tail_engine();
        engine.start_hold(None).unwrap();
        clock.set(2.0);
        for i in 0..changes {
            engine.set_chord(if i % 2 == 0 { "G" } else { "C" });
        }
        clock.set(3.9);
        engine.tick();
        assert_eq!(bars(engine.sink()).len(), 2);
        durations_from(engine.sink(), 4.0)
    }

    fn flat_groove() -> GrooveProfile {
        merge(&GrooveBase::default(), &GroovePreset::default(), 1)
    }

    fn context<'a>(groove: &'a GrooveProfile, guard: MudGuardLevel, will_change: bool) -> BarContext<'a> {
        BarContext {
            bar_start: 0.0,
            bar_index: 0,
            chord: "C",
            parsed: None,
            groove,
            guard,
            will_change,
            meter: Meter::FourFour,
            bpm: 60.0,
            shape: None,
            voicing: None,
        }
    }

    #[test]
    fn test_note_duration_tail_factors() {
        let groove = flat_groove();
        let rule = EnergyRule::default();
        let pick = |position| PatternEvent::new(position, Role::Mid, Action::Pluck, 0.8, 1.0);
        let duration = |position, guard, will_change| {
            note_duration(&pick(position), &rule, OutputMode::External, 8, &context(&groove, guard, will_change))
        };

        assert!((duration(7, MudGuardLevel::Off, false) - 1.0).abs() < 1e-9);
        assert!((duration(6, MudGuardLevel::Trim, false) - 0.70).abs() < 1e-9);
        assert!((duration(7, MudGuardLevel::Trim, false) - 0.70).abs() < 1e-9);
        assert!((duration(7, MudGuardLevel::Strong, false) - 0.55).abs() < 1e-9);
        assert!((duration(6, MudGuardLevel::Off, true) - 0.55).abs() < 1e-9);
        assert!((duration(6, MudGuardLevel::Trim, true) - 0.55).abs() < 1e-9);
        // only the last two slots are trimmed
        assert!((duration(5, MudGuardLevel::Strong, true) - 1.0).abs() < 1e-9);
        assert!((duration(0, MudGuardLevel::Strong, true) - 1.0).abs() < 1e-9);

        // six-slot grid: slots 4 and 5 are the tail
        let six = note_duration(
            &pick(4),
            &rule,
            OutputMode::External,
            6,
            &context(&groove, MudGuardLevel::Trim, false),
        );
        assert!((six - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_note_duration_compact_strum() {
        let groove = flat_groove();
        let ctx = context(&groove, MudGuardLevel::Off, false);
        let rule = EnergyRule::default();
        let brush = PatternEvent::new(0, Role::Mid, Action::Brush, 0.8, 1.0);
        let mute = PatternEvent::new(0, Role::Mute, Action::MuteBrush, 0.8, 1.0);
        let pluck = PatternEvent::new(0, Role::Mid, Action::Pluck, 0.8, 1.0);

        assert!((note_duration(&brush, &rule, OutputMode::Compact, 8, &ctx) - 0.85).abs() < 1e-9);
        assert!((note_duration(&brush, &rule, OutputMode::External, 8, &ctx) - 1.0).abs() < 1e-9);
        assert!((note_duration(&mute, &rule, OutputMode::Compact, 8, &ctx) - 0.85).abs() < 1e-9);
        assert!((note_duration(&pluck, &rule, OutputMode::Compact, 8, &ctx) - 1.0).abs() < 1e-9);

        // compact trim stacks with the tail trim
        let tail = PatternEvent::new(7, Role::Mid, Action::Brush, 0.8, 1.0);
        let strong = context(&groove, MudGuardLevel::Strong, false);
        let d = note_duration(&tail, &rule, OutputMode::Compact, 8, &strong);
        assert!((d - 0.85 * 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_busy_changes_trim_next_bar_tail() {
        let calm = bar_after_changes(1);
        assert!((duration_at(&calm, 0) - 1.0).abs() < 1e-9);
        assert!((duration_at(&calm, 7) - 1.0).abs() < 1e-9);

        let trimmed = bar_after_changes(4);
        let head = duration_at(&trimmed, 0);
        assert!((head - 1.0).abs() < 1e-9);
        assert!((duration_at(&trimmed, 6) / head - 0.70).abs() < 1e-9);
        assert!((duration_at(&trimmed, 7) / head - 0.70).abs() < 1e-9);

        let strong = bar_after_changes(6);
        let head = duration_at(&strong, 0);
        assert!((duration_at(&strong, 6) / head - 0.55).abs() < 1e-9);
        assert!((duration_at(&strong, 7) / head - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_compact_strum_shorter_than_external() {
        let (mut engine, _clock) = tail_engine();
        engine.start_hold(None).unwrap();
        let compact = duration_at(&durations_from(engine.sink(), 0.0), 4);

        let (mut engine, _clock) = tail_engine();
        engine.set_output(OutputMode::External);
        engine.start_hold(None).unwrap();
        let external = duration_at(&durations_from(engine.sink(), 0.0), 4);

        assert!((external - 1.0).abs() < 1e-9);
        assert!((compact / external - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_density_drop_removes_events() {
        let played = |energy: Energy| {
            let (mut engine, clock) = tail_engine();
            engine.set_energy(energy);
            engine.start_hold(None).unwrap();
            for bar in 1..8 {
                clock.set(bar as f64 * 4.0);
                engine.tick();
            }
            assert_eq!(bars(engine.sink()).len(), 8);
            durations_from(engine.sink(), 0.0).len()
        };

        let normal = played(Energy::Normal);
        assert_eq!(normal, 8 * 4);
        assert_eq!(played(Energy::Low), 0);
        let high = played(Energy::High);
        assert!(high > 0 && high < normal);
    }
}
