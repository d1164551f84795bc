//! Engine timing and behavior settings

use crate::engine::humanize::HumanizeSettings;
use serde::{Deserialize, Serialize};

/// Scheduler configuration. Every field has a working default; hosts
/// override what they need with the `with_*` builders or from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How often the host should call `tick()`
    pub tick_interval_ms: u64,
    /// How far ahead of now bars are scheduled
    pub lookahead_secs: f64,
    /// Delay between `start_hold` and the first bar
    pub start_latency_secs: f64,
    /// Delay between `one_shot` and its bar
    pub one_shot_lead_secs: f64,
    /// One-shots closer together than this are dropped
    pub one_shot_min_interval_secs: f64,
    /// Largest tempo change applied at one bar boundary
    pub tempo_max_step_per_bar: f64,
    /// Fraction of the remaining tempo difference covered per bar
    pub tempo_easing: f64,
    /// Tempo snaps to its target when this close
    pub tempo_snap_bpm: f64,
    /// Chord changes older than this no longer count toward the mud guard
    pub mud_guard_window_secs: f64,
    pub humanize: HumanizeSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tick_interval_ms: 25,
            lookahead_secs: 0.28,
            start_latency_secs: 0.10,
            one_shot_lead_secs: 0.03,
            one_shot_min_interval_secs: 0.20,
            tempo_max_step_per_bar: 7.0,
            tempo_easing: 0.40,
            tempo_snap_bpm: 0.05,
            mud_guard_window_secs: 2.2,
            humanize: HumanizeSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms.max(1);
        self
    }

    pub fn with_lookahead(mut self, secs: f64) -> Self {
        self.lookahead_secs = secs.max(0.0);
        self
    }

    pub fn with_start_latency(mut self, secs: f64) -> Self {
        self.start_latency_secs = secs.max(0.0);
        self
    }

    pub fn with_one_shot_lead(mut self, secs: f64) -> Self {
        self.one_shot_lead_secs = secs.max(0.0);
        self
    }

    pub fn with_one_shot_min_interval(mut self, secs: f64) -> Self {
        self.one_shot_min_interval_secs = secs.max(0.0);
        self
    }

    pub fn with_tempo_max_step(mut self, bpm: f64) -> Self {
        self.tempo_max_step_per_bar = bpm.max(0.0);
        self
    }

    pub fn with_tempo_easing(mut self, easing: f64) -> Self {
        self.tempo_easing = easing.clamp(0.0, 1.0);
        self
    }

    pub fn with_mud_guard_window(mut self, secs: f64) -> Self {
        self.mud_guard_window_secs = secs.max(0.0);
        self
    }

    pub fn with_humanize(mut self, humanize: HumanizeSettings) -> Self {
        self.humanize = humanize.clamped();
        self
    }
}
