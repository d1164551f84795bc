//! Performer-facing session settings
//!
//! Each setting is a closed set of named values. `from_name` is strict and
//! returns `None` for unknown names; callers decide on the fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! named_setting {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)? } default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Parse from name (case-insensitive)
            pub fn from_name(s: &str) -> Option<$name> {
                let lower = s.trim().to_lowercase();
                match lower.as_str() {
                    $( $text => Some($name::$variant), )+
                    _ => None,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name())
            }
        }
    };
}

named_setting! {
    /// Overall intensity of the accompaniment
    Energy { Low => "low", Normal => "normal", High => "high" } default Normal
}

named_setting! {
    /// Song section the accompaniment follows
    Part { Verse => "verse", Chorus => "chorus" } default Verse
}

named_setting! {
    /// Right-hand figure for chorus patterns
    RightHand { Down => "down", Up => "up", Auto => "auto" } default Auto
}

named_setting! {
    /// Which instruments sound
    InstrumentMode { Guitar => "guitar", Piano => "piano", Band => "band" } default Guitar
}

named_setting! {
    /// Target playback system. Compact output (phone speakers) gets a slightly
    /// thinner, shorter mix; external output gets the full range.
    OutputMode {
        #[serde(alias = "phone")]
        Compact => "compact",
        External => "external",
    } default Compact
}

named_setting! {
    FillIntensity { Soft => "soft", Hard => "hard" } default Soft
}

named_setting! {
    EndingType { Short => "short", Long => "long" } default Long
}

named_setting! {
    /// Accompaniment track
    Track { Guitar => "guitar", Piano => "piano", Perc => "perc" } default Guitar
}

impl OutputMode {
    /// Final velocity trim applied to every note event
    pub fn velocity_trim(&self) -> f64 {
        match self {
            OutputMode::Compact => 0.98,
            OutputMode::External => 1.0,
        }
    }

    /// Accept the legacy name "phone" for compact output
    pub fn from_alias(s: &str) -> Option<OutputMode> {
        OutputMode::from_name(s).or_else(|| {
            s.trim()
                .eq_ignore_ascii_case("phone")
                .then_some(OutputMode::Compact)
        })
    }
}

impl InstrumentMode {
    pub fn uses_guitar(&self) -> bool {
        matches!(self, InstrumentMode::Guitar | InstrumentMode::Band)
    }

    pub fn uses_piano(&self) -> bool {
        matches!(self, InstrumentMode::Piano | InstrumentMode::Band)
    }

    pub fn uses_perc(&self) -> bool {
        matches!(self, InstrumentMode::Band)
    }
}
