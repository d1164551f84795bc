pub mod chord;
pub mod pattern;
pub mod perc;
pub mod settings;
pub mod shape;
pub mod style;
pub mod time;
pub mod voice_leading;

pub use chord::{normalize, parse, ParsedChord, Quality, Seventh};
pub use pattern::{
    Action, BassTone, EnergyRule, EnergyRules, Pattern, PatternEvent, Role, StrumDirection,
    Subdivision,
};
pub use perc::PercSound;
pub use settings::{
    EndingType, Energy, FillIntensity, InstrumentMode, OutputMode, Part, RightHand, Track,
};
pub use shape::{GuitarShape, ShapeLibrary};
pub use style::{
    ChorusVariants, EndingVariants, FillVariants, GrooveBase, GroovePreset, Style, TrackPatterns,
};
pub use time::{Beats, Meter};
pub use voice_leading::{
    choose_bass_pitch, BassMemory, GuitarVoiceLeader, PianoVoiceLeader, PianoVoicing, Resolved,
};
