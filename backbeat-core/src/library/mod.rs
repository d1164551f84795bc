//! Style, pattern, groove and shape library
//!
//! The library is plain configuration: it is loaded once, validated, and then
//! shared read-only between sessions. A built-in library ships with the crate.

use crate::error::{EngineError, EngineResult};
use crate::types::chord::normalize;
use crate::types::pattern::Pattern;
use crate::types::settings::{Energy, InstrumentMode, OutputMode, Part, RightHand, Track};
use crate::types::shape::{ShapeLibrary, MAX_FRET};
use crate::types::style::{GroovePreset, Style};
use crate::types::voice_leading::piano::DEFAULT_CENTER;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BUILTIN_JSON: &str = include_str!("builtin.json");

/// Session settings a new engine starts with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Defaults {
    pub bpm: f64,
    pub style: String,
    pub groove_preset: String,
    pub chord: String,
    pub energy: Energy,
    pub part: Part,
    pub right_hand: RightHand,
    pub instrument: InstrumentMode,
    pub output: OutputMode,
    pub auto_assist: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            bpm: 84.0,
            style: "bolero".to_string(),
            groove_preset: "nhau".to_string(),
            chord: "Dm".to_string(),
            energy: Energy::Normal,
            part: Part::Verse,
            right_hand: RightHand::Auto,
            instrument: InstrumentMode::Guitar,
            output: OutputMode::Compact,
            auto_assist: true,
        }
    }
}

fn default_center() -> u8 {
    DEFAULT_CENTER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PianoSettings {
    #[serde(rename = "targetCenterMidi", default = "default_center")]
    pub target_center: u8,
}

impl Default for PianoSettings {
    fn default() -> Self {
        PianoSettings {
            target_center: DEFAULT_CENTER,
        }
    }
}

/// On-disk layout: patterns are a list, keyed by their own id once loaded
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryFile {
    #[serde(default)]
    defaults: Defaults,
    #[serde(default)]
    piano: PianoSettings,
    #[serde(default)]
    groove_presets: BTreeMap<String, GroovePreset>,
    styles: BTreeMap<String, Style>,
    #[serde(default)]
    patterns: Vec<Pattern>,
    #[serde(default)]
    guitar_shapes: ShapeLibrary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    pub defaults: Defaults,
    pub piano: PianoSettings,
    pub groove_presets: BTreeMap<String, GroovePreset>,
    pub styles: BTreeMap<String, Style>,
    pub patterns: BTreeMap<String, Pattern>,
    pub guitar_shapes: ShapeLibrary,
}

impl Library {
    /// The library embedded in the crate
    pub fn builtin() -> Result<Library> {
        Library::from_json_str(BUILTIN_JSON).context("Failed to load the built-in library")
    }

    /// Parse and validate a library from JSON
    pub fn from_json_str(json: &str) -> Result<Library> {
        let file: LibraryFile = serde_json::from_str(json).context("Invalid library JSON")?;
        let library = Library::from(file);
        library.validate()?;
        debug!(
            "Loaded library: {} styles, {} patterns, {} groove presets, {} chord shapes",
            library.styles.len(),
            library.patterns.len(),
            library.groove_presets.len(),
            library.guitar_shapes.len()
        );
        Ok(library)
    }

    /// Check that every record the styles point to exists and is usable
    pub fn validate(&self) -> EngineResult<()> {
        if !self.styles.contains_key(&self.defaults.style) {
            return Err(EngineError::InvalidLibrary(format!(
                "default style '{}' is not defined",
                self.defaults.style
            )));
        }

        for (style_id, style) in &self.styles {
            if style.ending_bars == 0 {
                return Err(EngineError::InvalidLibrary(format!(
                    "style '{}' has endingBars 0",
                    style_id
                )));
            }
            if style.groove_base.velocity_cycle.is_empty() {
                return Err(EngineError::InvalidLibrary(format!(
                    "style '{}' has an empty velocity cycle",
                    style_id
                )));
            }
            for track in Track::ALL {
                let Some(patterns) = style.track(*track) else {
                    continue;
                };
                for id in patterns.pattern_ids() {
                    if !self.patterns.contains_key(id) {
                        return Err(EngineError::InvalidLibrary(format!(
                            "style '{}' {} track names unknown pattern '{}'",
                            style_id, track, id
                        )));
                    }
                }
            }
        }

        for (chord, shapes) in self.guitar_shapes.iter() {
            if let Some(fret) = shapes
                .iter()
                .filter_map(|shape| shape.highest_fret())
                .find(|&fret| fret > MAX_FRET)
            {
                return Err(EngineError::InvalidLibrary(format!(
                    "guitar shape for '{}' uses fret {} (max {})",
                    chord, fret, MAX_FRET
                )));
            }
        }

        for (id, pattern) in &self.patterns {
            let slots = pattern.slots();
            if let Some(event) = pattern.events.iter().find(|e| e.position >= slots) {
                return Err(EngineError::InvalidLibrary(format!(
                    "pattern '{}' has an event at slot {} of a {}-slot grid",
                    id, event.position, slots
                )));
            }
        }
        Ok(())
    }

    pub fn style(&self, id: &str) -> EngineResult<&Style> {
        self.styles
            .get(id)
            .ok_or_else(|| EngineError::UnknownStyle(id.to_string()))
    }

    pub fn pattern(&self, id: &str) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    /// A groove preset by id, falling back to the default preset, then to a neutral feel
    pub fn groove_preset(&self, id: &str) -> GroovePreset {
        self.groove_presets
            .get(id)
            .or_else(|| self.groove_presets.get(&self.defaults.groove_preset))
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_groove_preset(&self, id: &str) -> bool {
        self.groove_presets.contains_key(id)
    }

    pub fn style_ids(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    pub fn groove_preset_ids(&self) -> impl Iterator<Item = &str> {
        self.groove_presets.keys().map(String::as_str)
    }

    pub fn has_shape(&self, chord: &str) -> bool {
        !self.guitar_shapes.candidates(&normalize(chord)).is_empty()
    }
}

impl From<LibraryFile> for Library {
    fn from(file: LibraryFile) -> Self {
        Library {
            defaults: file.defaults,
            piano: file.piano,
            groove_presets: file.groove_presets,
            styles: file.styles,
            patterns: file
                .patterns
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            guitar_shapes: file.guitar_shapes,
        }
    }
}
