//! Fill and ending sequencing
//!
//! A fill arms exactly one upcoming bar. An ending arms a run of bars that
//! starts at the next boundary; after the last one the session stops. Fills
//! are refused while an ending is armed or running.

use crate::types::settings::{EndingType, FillIntensity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionMode {
    Fill,
    Ending,
}

/// What the bar just scheduled meant for the transition sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarOutcome {
    Normal,
    FillUsed(FillIntensity),
    EndingContinues { remaining: u8 },
    EndingDone,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionState {
    fill_pending: bool,
    fill_intensity: FillIntensity,
    end_pending: bool,
    ending_type: EndingType,
    ending_bars_left: u8,
}

impl TransitionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fill for the next bar. Refused during an ending.
    pub fn trigger_fill(&mut self, intensity: FillIntensity) -> bool {
        if self.ending_active() {
            return false;
        }
        self.fill_pending = true;
        self.fill_intensity = intensity;
        true
    }

    /// Arm an ending from the next boundary. Refused if one is already armed
    /// or running, so a session stops exactly once.
    pub fn trigger_end(&mut self, ending: EndingType) -> bool {
        if self.ending_active() {
            return false;
        }
        self.end_pending = true;
        self.ending_type = ending;
        true
    }

    /// Bar-boundary commit. Returns the number of ending bars when an armed
    /// ending starts at this boundary; a pending fill is dropped in that case.
    pub fn commit(&mut self, ending_bars: u8) -> Option<u8> {
        if !self.end_pending {
            return None;
        }
        self.end_pending = false;
        self.fill_pending = false;
        self.ending_bars_left = ending_bars.clamp(1, 4);
        Some(self.ending_bars_left)
    }

    /// Mode of the bar about to be scheduled
    pub fn mode(&self) -> Option<TransitionMode> {
        if self.ending_bars_left > 0 {
            Some(TransitionMode::Ending)
        } else if self.fill_pending {
            Some(TransitionMode::Fill)
        } else {
            None
        }
    }

    /// Consume the bar that was just scheduled
    pub fn complete_bar(&mut self) -> BarOutcome {
        if self.ending_bars_left > 0 {
            self.ending_bars_left -= 1;
            return if self.ending_bars_left == 0 {
                BarOutcome::EndingDone
            } else {
                BarOutcome::EndingContinues {
                    remaining: self.ending_bars_left,
                }
            };
        }
        if self.fill_pending {
            self.fill_pending = false;
            return BarOutcome::FillUsed(self.fill_intensity);
        }
        BarOutcome::Normal
    }

    pub fn fill_pending(&self) -> bool {
        self.fill_pending
    }

    pub fn fill_intensity(&self) -> FillIntensity {
        self.fill_intensity
    }

    pub fn end_pending(&self) -> bool {
        self.end_pending
    }

    pub fn ending_type(&self) -> EndingType {
        self.ending_type
    }

    pub fn ending_bars_left(&self) -> u8 {
        self.ending_bars_left
    }

    pub fn ending_active(&self) -> bool {
        self.end_pending || self.ending_bars_left > 0
    }

    /// Anything armed or running
    pub fn is_active(&self) -> bool {
        self.fill_pending || self.ending_active()
    }

    pub fn clear(&mut self) {
        self.fill_pending = false;
        self.end_pending = false;
        self.ending_bars_left = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_lasts_one_bar() {
        let mut t = TransitionState::new();
        assert!(t.trigger_fill(FillIntensity::Hard));
        assert_eq!(t.commit(2), None);
        assert_eq!(t.mode(), Some(TransitionMode::Fill));
        assert_eq!(t.complete_bar(), BarOutcome::FillUsed(FillIntensity::Hard));
        assert_eq!(t.mode(), None);
        assert_eq!(t.complete_bar(), BarOutcome::Normal);
    }

    #[test]
    fn test_ending_runs_its_bars() {
        let mut t = TransitionState::new();
        assert!(t.trigger_end(EndingType::Short));
        assert_eq!(t.mode(), None);
        assert_eq!(t.commit(2), Some(2));
        assert_eq!(t.mode(), Some(TransitionMode::Ending));
        assert_eq!(t.complete_bar(), BarOutcome::EndingContinues { remaining: 1 });
        assert_eq!(t.commit(2), None);
        assert_eq!(t.complete_bar(), BarOutcome::EndingDone);
        assert!(!t.is_active());
    }

    #[test]
    fn test_fill_refused_during_ending() {
        let mut t = TransitionState::new();
        t.trigger_end(EndingType::Long);
        assert!(!t.trigger_fill(FillIntensity::Soft));
        t.commit(3);
        assert!(!t.trigger_fill(FillIntensity::Soft));
        assert!(!t.fill_pending());
    }

    #[test]
    fn test_ending_drops_pending_fill() {
        let mut t = TransitionState::new();
        t.trigger_fill(FillIntensity::Soft);
        t.trigger_end(EndingType::Short);
        assert_eq!(t.commit(1), Some(1));
        assert!(!t.fill_pending());
        assert_eq!(t.complete_bar(), BarOutcome::EndingDone);
    }

    #[test]
    fn test_second_end_refused() {
        let mut t = TransitionState::new();
        assert!(t.trigger_end(EndingType::Short));
        assert!(!t.trigger_end(EndingType::Long));
        assert_eq!(t.ending_type(), EndingType::Short);
    }

    #[test]
    fn test_ending_bars_clamped() {
        let mut t = TransitionState::new();
        t.trigger_end(EndingType::Long);
        assert_eq!(t.commit(0), Some(1));
        t.clear();
        t.trigger_end(EndingType::Long);
        assert_eq!(t.commit(9), Some(4));
    }
}
