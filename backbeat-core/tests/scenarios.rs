#[cfg(test)]
mod tests {
    use backbeat_core::engine::event::BarInfo;
    use backbeat_core::engine::transition::TransitionMode;
    use backbeat_core::{
        Degradation, Energy, EndingType, Engine, EngineConfig, EngineError, Event, EventBody,
        EventKind, FillIntensity, Library, ManualClock, Meter, MudGuardLevel, Part, StateEvent,
    };
    use std::sync::Arc;

    type TestEngine = Engine<ManualClock, Vec<Event>, Vec<StateEvent>>;

    fn session() -> (TestEngine, ManualClock) {
        let library = Arc::new(Library::builtin().unwrap());
        let clock = ManualClock::new(0.0);
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

    /// Events that belong to bar `n`, meta event first
    fn bar_events(events: &[Event], n: u64) -> &[Event] {
        let start = events
            .iter()
            .position(|e| e.bar_info().map(|b| b.bar_index) == Some(n))
            .unwrap();
        let end = events[start + 1..]
            .iter()
            .position(|e| e.is_bar() || e.is_stop())
            .map_or(events.len(), |i| start + 1 + i);
        &events[start..end]
    }

    #[test]
    fn test_first_bar_holds_start_chord() {
        let (mut engine, _clock) = session();
        engine.set_tempo(78.0);
        engine.start_hold(Some("Dm")).unwrap();

        let events = engine.sink();
        let first = &events[0];
        let info = first.bar_info().unwrap();
        assert_eq!(first.chord, "Dm");
        assert_eq!(info.meter, Meter::FourFour);
        assert_eq!(info.bpm, 78.0);
        assert!(events.iter().any(|e| e.kind() == EventKind::Guitar
            && e.slot == 0
            && matches!(e.body, EventBody::GuitarBass { .. })));
    }

    #[test]
    fn test_rapid_chord_changes_commit_last() {
        let (mut engine, clock) = session();
        engine.start_hold(Some("Dm")).unwrap();

        clock.set(0.5);
        engine.set_chord("A");
        engine.set_chord("Bb");
        assert_eq!(engine.snapshot().pending_chord.as_deref(), Some("Bb"));

        clock.set(2.8);
        engine.tick();
        let events = engine.sink();
        assert_eq!(bars(events).len(), 2);
        let second = bar_events(events, 1);
        assert!(second.iter().all(|e| e.chord == "Bb"));
        assert!(!events.iter().any(|e| e.chord == "A"));
        assert_eq!(engine.snapshot().chord, "Bb");
    }

    #[test]
    fn test_ending_runs_then_stops() {
        let (mut engine, clock) = session();
        engine.start_hold(Some("Am")).unwrap();

        clock.set(0.5);
        assert!(engine.trigger_end(EndingType::Short));

        clock.set(60.0);
        engine.tick();

        let events = engine.sink();
        let all_bars = bars(events);
        let ending: Vec<_> = all_bars
            .iter()
            .filter(|b| b.transition == Some(TransitionMode::Ending))
            .collect();
        assert_eq!(ending.len(), 2);
        assert_eq!(all_bars.len(), 3);

        let stops: Vec<&Event> = events.iter().filter(|e| e.is_stop()).collect();
        assert_eq!(stops.len(), 1);
        assert!(events.last().unwrap().is_stop());

        let last_bar = events.iter().rev().find(|e| e.is_bar()).unwrap();
        let bar_len = Meter::FourFour.bar_seconds(84.0);
        assert!((stops[0].time - (last_bar.time + bar_len)).abs() < 1e-9);
        assert!(!engine.is_running());

        let observed = engine.observer();
        assert!(observed
            .iter()
            .any(|s| matches!(s, StateEvent::EndingStart { bars: 2, ending: EndingType::Short })));
        assert!(observed.iter().any(|s| matches!(s, StateEvent::EndingDone { .. })));

        let emitted = engine.sink().len();
        clock.set(120.0);
        engine.tick();
        assert_eq!(engine.sink().len(), emitted);
    }

    #[test]
    fn test_same_calls_same_events() {
        let run = || {
            let (mut engine, clock) = session();
            engine.start_hold(Some("C")).unwrap();
            clock.set(1.0);
            engine.set_chord("G7");
            engine.set_energy(Energy::High);
            clock.set(4.0);
            engine.tick();
            engine.trigger_fill(FillIntensity::Hard);
            clock.set(12.0);
            engine.tick();
            engine.sink().clone()
        };
        let a = run();
        let b = run();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_changes_land_together() {
        let (mut engine, clock) = session();
        engine.start_hold(Some("Dm")).unwrap();

        clock.set(1.0);
        engine.set_style("waltz").unwrap();
        engine.set_energy(Energy::Low);
        engine.set_energy(Energy::High);
        engine.set_chord("E7");
        let snap = engine.snapshot();
        assert_eq!(snap.style, "bolero");
        assert_eq!(snap.chord, "Dm");

        clock.set(2.8);
        engine.tick();
        let info = bar_events(engine.sink(), 1)[0].bar_info().unwrap();
        assert_eq!(info.style, "waltz");
        assert_eq!(info.meter, Meter::ThreeFour);
        assert_eq!(info.energy, Energy::High);
        assert_eq!(bar_events(engine.sink(), 1)[0].chord, "E7");
        for e in bar_events(engine.sink(), 1) {
            assert!(e.slot < 6);
        }
    }

    #[test]
    fn test_tempo_eases_within_bound() {
        let (mut engine, clock) = session();
        engine.start_hold(None).unwrap();
        engine.set_tempo(200.0);

        clock.set(120.0);
        engine.tick();
        let tempos: Vec<f64> = bars(engine.sink()).iter().map(|b| b.bpm).collect();
        assert!(tempos.len() > 20);
        for pair in tempos.windows(2) {
            assert!((pair[1] - pair[0]).abs() <= 7.0 + 1e-9, "{:?}", pair);
        }
        assert_eq!(*tempos.last().unwrap(), 200.0);
    }

    #[test]
    fn test_mud_guard_rises_and_decays() {
        let (mut engine, clock) = session();
        engine.start_hold(Some("C")).unwrap();

        clock.set(2.0);
        for chord in ["C", "G", "Am", "F", "C", "G"] {
            engine.set_chord(chord);
        }
        assert_eq!(engine.snapshot().mud_guard, MudGuardLevel::Strong);
        assert!(matches!(
            engine.observer().last(),
            Some(StateEvent::ChordPending { mud_guard_level: MudGuardLevel::Strong, .. })
        ));

        clock.set(2.8);
        engine.tick();
        let bar = bar_events(engine.sink(), 1);
        assert_eq!(bar[0].bar_info().unwrap().mud_guard_level, MudGuardLevel::Strong);
        for e in &bar[1..] {
            let hint = e.body.hint().unwrap();
            assert_eq!(hint.mud_guard_level, MudGuardLevel::Strong);
            assert!(hint.duck_harder());
        }

        clock.set(10.0);
        engine.tick();
        assert_eq!(engine.snapshot().mud_guard, MudGuardLevel::Off);
    }

    #[test]
    fn test_fill_refused_during_ending() {
        let (mut engine, clock) = session();
        engine.start_hold(None).unwrap();
        assert!(engine.trigger_end(EndingType::Long));
        assert!(!engine.trigger_fill(FillIntensity::Soft));

        clock.set(2.8);
        engine.tick();
        assert!(!engine.trigger_fill(FillIntensity::Hard));
        assert!(!engine.snapshot().fill_pending);

        clock.set(30.0);
        engine.tick();
        let bars_seen = bars(engine.sink());
        assert!(bars_seen
            .iter()
            .all(|b| b.transition != Some(TransitionMode::Fill)));
        assert_eq!(engine.sink().iter().filter(|e| e.is_stop()).count(), 1);
    }

    #[test]
    fn test_fill_lasts_one_bar() {
        let (mut engine, clock) = session();
        engine.start_hold(None).unwrap();
        assert!(engine.trigger_fill(FillIntensity::Hard));

        clock.set(6.0);
        engine.tick();
        let modes: Vec<_> = bars(engine.sink()).iter().map(|b| b.transition).collect();
        assert_eq!(modes[1], Some(TransitionMode::Fill));
        assert_eq!(modes[2], None);
        assert!(engine
            .observer()
            .iter()
            .any(|s| matches!(s, StateEvent::FillUsed { intensity: FillIntensity::Hard })));
    }

    #[test]
    fn test_one_shot_debounce() {
        let (mut engine, clock) = session();
        clock.set(1.0);
        assert!(engine.one_shot(Some("C")).unwrap());
        clock.set(1.1);
        assert!(!engine.one_shot(Some("G")).unwrap());
        clock.set(1.25);
        assert!(engine.one_shot(Some("G")).unwrap());

        let one_shots: Vec<&Event> = engine.sink().iter().filter(|e| e.is_bar()).collect();
        assert_eq!(one_shots.len(), 2);
        assert!(one_shots.iter().all(|e| e.bar_info().unwrap().one_shot));
        assert!((one_shots[0].time - 1.03).abs() < 1e-9);
        assert_eq!(one_shots[1].chord, "G");
        assert!(!engine.is_running());
        assert_eq!(engine.state().memory.guitar, None);
    }

    #[test]
    fn test_one_shot_ignored_while_running() {
        let (mut engine, _clock) = session();
        engine.start_hold(None).unwrap();
        assert!(!engine.one_shot(Some("C")).unwrap());
    }

    #[test]
    fn test_unknown_style_while_running() {
        let (mut engine, _clock) = session();
        engine.start_hold(None).unwrap();
        let err = engine.set_style("polka").unwrap_err();
        assert_eq!(err, EngineError::UnknownStyle("polka".into()));
        assert!(!engine.state().will_change_soon());
    }

    #[test]
    fn test_unparsable_chord_degrades() {
        let (mut engine, _clock) = session();
        engine.set_chord("H7");
        engine.start_hold(None).unwrap();

        assert!(engine.is_running());
        let observed = engine.observer();
        assert!(observed.iter().any(|s| matches!(
            s,
            StateEvent::Degraded { degradation: Degradation::UnparsableChord { .. } }
        )));
        assert!(observed.iter().any(|s| matches!(
            s,
            StateEvent::Degraded { degradation: Degradation::MissingShape { .. } }
        )));
        assert!(engine
            .sink()
            .iter()
            .any(|e| matches!(e.body, EventBody::GuitarBass { .. })));
    }

    #[test]
    fn test_sessions_are_independent() {
        let (mut a, clock_a) = session();
        let (mut b, _clock_b) = session();
        a.start_hold(Some("C")).unwrap();
        a.set_part(Part::Chorus);
        clock_a.set(10.0);
        a.tick();

        assert!(!b.is_running());
        assert_eq!(b.snapshot().part, Part::Verse);
        b.start_hold(Some("F")).unwrap();
        assert_eq!(bars(b.sink()).len(), 1);
        assert!(bars(a.sink()).len() > 1);
    }

    #[test]
    fn test_waltz_grid() {
        let (mut engine, clock) = session();
        engine.set_style("waltz").unwrap();
        engine.start_hold(Some("G")).unwrap();
        clock.set(8.0);
        engine.tick();

        let bar_len = Meter::ThreeFour.bar_seconds(84.0);
        let events = engine.sink();
        let starts: Vec<f64> = events.iter().filter(|e| e.is_bar()).map(|e| e.time).collect();
        for pair in starts.windows(2) {
            assert!((pair[1] - pair[0] - bar_len).abs() < 1e-9);
        }
        for e in events.iter().filter(|e| !e.is_bar()) {
            assert!(e.slot < 6);
        }
    }

    #[test]
    fn test_bars_are_ordered() {
        let (mut engine, clock) = session();
        engine.start_hold(Some("Dm")).unwrap();
        clock.set(30.0);
        engine.tick();
        let indices: Vec<u64> = bars(engine.sink()).iter().map(|b| b.bar_index).collect();
        let expected: Vec<u64> = (0..indices.len() as u64).collect();
        assert_eq!(indices, expected);
    }
}
