//! Pattern selection with variant fallback
//!
//! Ending bars fall back to the fill, then the chorus, then the verse; fill
//! bars fall back to the chorus, then the verse. A track the style does not
//! define resolves to nothing and is skipped.

use crate::engine::transition::TransitionMode;
use crate::types::settings::{EndingType, FillIntensity, Part, RightHand, Track};
use crate::types::style::Style;

/// Everything that decides which pattern a track plays this bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub part: Part,
    pub right_hand: RightHand,
    pub transition: Option<TransitionMode>,
    pub fill_intensity: FillIntensity,
    pub ending_type: EndingType,
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            part: Part::Verse,
            right_hand: RightHand::Auto,
            transition: None,
            fill_intensity: FillIntensity::Soft,
            ending_type: EndingType::Long,
        }
    }
}

/// Pattern id a track plays, or `None` when the style has nothing for it
pub fn select_pattern_id<'a>(style: &'a Style, track: Track, sel: &Selection) -> Option<&'a str> {
    let patterns = style.track(track)?;

    let chorus = || patterns.chorus.as_ref().and_then(|c| c.pick(sel.right_hand));
    let verse = || patterns.verse.as_deref();
    let fill = || patterns.fill.as_ref().and_then(|f| f.pick(sel.fill_intensity));
    let ending = || patterns.ending.as_ref().and_then(|e| e.pick(sel.ending_type));

    match sel.transition {
        Some(TransitionMode::Ending) => ending().or_else(fill).or_else(chorus).or_else(verse),
        Some(TransitionMode::Fill) => fill().or_else(chorus).or_else(verse),
        None if sel.part == Part::Chorus => chorus().or_else(verse),
        None => verse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::style::{ChorusVariants, EndingVariants, FillVariants, TrackPatterns};

    fn full_style() -> Style {
        serde_json::from_str(
            r#"{
                "guitar": {
                    "verse": "v",
                    "chorus": { "down": "c_down", "up": "c_up" },
                    "fill": { "soft": "f_soft", "hard": "f_hard" },
                    "ending": { "short": "e_short", "long": "e_long" }
                }
            }"#,
        )
        .unwrap()
    }

    fn sel(part: Part, transition: Option<TransitionMode>) -> Selection {
        Selection {
            part,
            transition,
            ..Default::default()
        }
    }

    #[test]
    fn test_verse_and_chorus() {
        let style = full_style();
        assert_eq!(select_pattern_id(&style, Track::Guitar, &sel(Part::Verse, None)), Some("v"));
        // auto resolves to down
        assert_eq!(
            select_pattern_id(&style, Track::Guitar, &sel(Part::Chorus, None)),
            Some("c_down")
        );
        let up = Selection {
            right_hand: RightHand::Up,
            ..sel(Part::Chorus, None)
        };
        assert_eq!(select_pattern_id(&style, Track::Guitar, &up), Some("c_up"));
    }

    #[test]
    fn test_transition_variants() {
        let style = full_style();
        let hard_fill = Selection {
            fill_intensity: FillIntensity::Hard,
            ..sel(Part::Verse, Some(TransitionMode::Fill))
        };
        assert_eq!(select_pattern_id(&style, Track::Guitar, &hard_fill), Some("f_hard"));
        let short_end = Selection {
            ending_type: EndingType::Short,
            ..sel(Part::Verse, Some(TransitionMode::Ending))
        };
        assert_eq!(select_pattern_id(&style, Track::Guitar, &short_end), Some("e_short"));
    }

    #[test]
    fn test_fallback_chain() {
        let mut style = full_style();
        let guitar = style.guitar.as_mut().unwrap();
        guitar.ending = None;
        let ending = sel(Part::Verse, Some(TransitionMode::Ending));
        assert_eq!(select_pattern_id(&style, Track::Guitar, &ending), Some("f_soft"));

        let guitar = style.guitar.as_mut().unwrap();
        guitar.fill = None;
        assert_eq!(select_pattern_id(&style, Track::Guitar, &ending), Some("c_down"));

        let guitar = style.guitar.as_mut().unwrap();
        guitar.chorus = None;
        assert_eq!(select_pattern_id(&style, Track::Guitar, &ending), Some("v"));
        let fill = sel(Part::Chorus, Some(TransitionMode::Fill));
        assert_eq!(select_pattern_id(&style, Track::Guitar, &fill), Some("v"));
    }

    #[test]
    fn test_missing_track_is_none() {
        let style = full_style();
        assert_eq!(select_pattern_id(&style, Track::Perc, &sel(Part::Verse, None)), None);
        let empty = Style {
            guitar: Some(TrackPatterns::default()),
            ..full_style()
        };
        assert_eq!(select_pattern_id(&empty, Track::Guitar, &sel(Part::Chorus, None)), None);
    }

    #[test]
    fn test_single_id_variants() {
        let style = Style {
            guitar: Some(TrackPatterns {
                verse: Some("v".into()),
                chorus: Some(ChorusVariants::Single("c".into())),
                fill: Some(FillVariants::Single("f".into())),
                ending: Some(EndingVariants::Single("e".into())),
            }),
            ..full_style()
        };
        let hard = Selection {
            fill_intensity: FillIntensity::Hard,
            ..sel(Part::Verse, Some(TransitionMode::Fill))
        };
        assert_eq!(select_pattern_id(&style, Track::Guitar, &hard), Some("f"));
        assert_eq!(
            select_pattern_id(&style, Track::Guitar, &sel(Part::Chorus, None)),
            Some("c")
        );
    }
}
