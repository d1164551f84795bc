//! Rapid chord-change detection
//!
//! When chords change faster than the ring of a strummed chord can decay, the
//! guard raises its level and the scheduler shortens note tails.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Changes inside the window that raise the guard to `Trim`
pub const TRIM_THRESHOLD: usize = 4;
/// Changes inside the window that raise the guard to `Strong`
pub const STRONG_THRESHOLD: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MudGuardLevel {
    #[default]
    Off,
    Trim,
    Strong,
}

impl MudGuardLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            MudGuardLevel::Off => 0,
            MudGuardLevel::Trim => 1,
            MudGuardLevel::Strong => 2,
        }
    }

    /// Length factor for notes on the last two slots of a bar
    pub fn tail_factor(&self) -> f64 {
        match self {
            MudGuardLevel::Off => 1.0,
            MudGuardLevel::Trim => 0.70,
            MudGuardLevel::Strong => 0.55,
        }
    }

    fn for_count(count: usize) -> Self {
        if count >= STRONG_THRESHOLD {
            MudGuardLevel::Strong
        } else if count >= TRIM_THRESHOLD {
            MudGuardLevel::Trim
        } else {
            MudGuardLevel::Off
        }
    }
}

impl fmt::Display for MudGuardLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Debug, Clone)]
pub struct AntiMudGuard {
    window_secs: f64,
    changes: VecDeque<f64>,
    level: MudGuardLevel,
}

impl AntiMudGuard {
    pub fn new(window_secs: f64) -> Self {
        AntiMudGuard {
            window_secs,
            changes: VecDeque::new(),
            level: MudGuardLevel::Off,
        }
    }

    /// Record a chord change at `now` and return the new level
    pub fn record_change(&mut self, now: f64) -> MudGuardLevel {
        self.changes.push_back(now);
        self.refresh(now)
    }

    /// Forget changes older than the window and re-evaluate the level
    pub fn refresh(&mut self, now: f64) -> MudGuardLevel {
        while let Some(&oldest) = self.changes.front() {
            if now - oldest > self.window_secs {
                self.changes.pop_front();
            } else {
                break;
            }
        }
        self.level = MudGuardLevel::for_count(self.changes.len());
        self.level
    }

    pub fn level(&self) -> MudGuardLevel {
        self.level
    }

    pub fn recent_changes(&self) -> usize {
        self.changes.len()
    }

    pub fn clear(&mut self) {
        self.changes.clear();
        self.level = MudGuardLevel::Off;
    }
}

impl Default for AntiMudGuard {
    fn default() -> Self {
        AntiMudGuard::new(2.2)
    }
}
