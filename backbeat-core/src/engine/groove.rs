//! Per-bar groove: a style's base feel combined with a groove preset

use crate::types::style::{default_velocity_cycle, GrooveBase, GroovePreset};
use std::collections::BTreeMap;

/// Timing and dynamics feel for one bar
#[derive(Debug, Clone, PartialEq)]
pub struct GrooveProfile {
    pub layback_ms: f64,
    pub swing_ms: f64,
    /// Per-slot timing offset for 8-slot patterns
    pub feel_ms: BTreeMap<u8, f64>,
    pub velocity_cycle: Vec<f64>,
    pub accent_multiplier: f64,
    pub breathe_multiplier: f64,
    bar_index: u64,
}

impl GrooveProfile {
    pub fn feel_at(&self, position: u8) -> f64 {
        self.feel_ms.get(&position).copied().unwrap_or(0.0)
    }

    /// Bar-level velocity factor: the cycle entry for this bar times the breathe swell
    pub fn bar_dynamics(&self) -> f64 {
        let len = self.velocity_cycle.len() as u64;
        let cycle = if len == 0 {
            1.0
        } else {
            self.velocity_cycle[(self.bar_index % len) as usize]
        };
        cycle * self.breathe_multiplier
    }

    pub fn bar_index(&self) -> u64 {
        self.bar_index
    }
}

/// Slow swell over eight bars: lifted on bar 0, eased on bar 4
pub fn breathe(bar_index: u64) -> f64 {
    match bar_index % 8 {
        0 => 1.02,
        4 => 0.99,
        _ => 1.0,
    }
}

/// Combine a style's groove base with a preset for one bar
pub fn merge(base: &GrooveBase, preset: &GroovePreset, bar_index: u64) -> GrooveProfile {
    let cycle = if base.velocity_cycle.is_empty() {
        default_velocity_cycle()
    } else {
        base.velocity_cycle.clone()
    };

    GrooveProfile {
        layback_ms: base.layback_ms + preset.layback_ms_add,
        swing_ms: base.swing_ms + preset.swing_ms_add,
        feel_ms: base.feel_ms.clone(),
        velocity_cycle: cycle.into_iter().map(|v| v * preset.cycle_vel_mul).collect(),
        accent_multiplier: preset.accent_mul,
        breathe_multiplier: breathe(bar_index),
        bar_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset() -> GroovePreset {
        GroovePreset {
            name: "test".into(),
            layback_ms_add: 2.0,
            swing_ms_add: 1.0,
            cycle_vel_mul: 0.5,
            accent_mul: 1.05,
        }
    }

    #[test]
    fn test_additive_merge() {
        let base = GrooveBase {
            layback_ms: 4.0,
            swing_ms: 3.0,
            ..Default::default()
        };
        let profile = merge(&base, &preset(), 1);
        assert_eq!(profile.layback_ms, 6.0);
        assert_eq!(profile.swing_ms, 4.0);
        assert_eq!(profile.accent_multiplier, 1.05);
        assert_eq!(profile.velocity_cycle, vec![0.5, 0.495, 0.505, 0.495]);
    }

    #[test]
    fn test_breathe_cycle() {
        assert_eq!(breathe(0), 1.02);
        assert_eq!(breathe(4), 0.99);
        assert_eq!(breathe(8), 1.02);
        assert_eq!(breathe(3), 1.0);
    }

    #[test]
    fn test_bar_dynamics() {
        let base = GrooveBase {
            velocity_cycle: vec![1.0, 0.9],
            ..Default::default()
        };
        let neutral = GroovePreset::default();
        assert!((merge(&base, &neutral, 0).bar_dynamics() - 1.02).abs() < 1e-12);
        assert!((merge(&base, &neutral, 1).bar_dynamics() - 0.9).abs() < 1e-12);
        assert!((merge(&base, &neutral, 4).bar_dynamics() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_empty_cycle_uses_default() {
        let base = GrooveBase {
            velocity_cycle: Vec::new(),
            ..Default::default()
        };
        let profile = merge(&base, &GroovePreset::default(), 2);
        assert_eq!(profile.velocity_cycle, default_velocity_cycle());
    }
}
