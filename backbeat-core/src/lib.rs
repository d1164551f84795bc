//! # Backbeat Core
//!
//! Bar-quantized accompaniment scheduling. The engine turns a live stream of
//! performer controls (chord, style, tempo, energy, fills and endings) into
//! timed guitar, piano and percussion events for an external renderer.
//!
//! The crate does no audio and no I/O of its own. A host drives it by calling
//! [`Engine::tick`] against a [`Clock`] and receives events through an
//! [`EventSink`].
//!
//! ## Example
//!
//! ```
//! use backbeat_core::{Engine, EngineConfig, Event, Library, ManualClock};
//! use std::sync::Arc;
//!
//! let library = Arc::new(Library::builtin().unwrap());
//! let clock = ManualClock::new(0.0);
//! let mut engine = Engine::new(library, EngineConfig::default(), clock.clone(), Vec::<Event>::new()).unwrap();
//!
//! engine.start_hold(Some("Dm")).unwrap();
//! clock.advance(5.0);
//! engine.tick();
//! assert!(engine.sink().iter().any(|e| e.is_bar()));
//! ```

pub mod engine;
pub mod error;
pub mod library;
pub mod types;

pub use engine::{
    Clock, Degradation, Engine, EngineCommand, EngineConfig, EngineSnapshot, Event, EventBody,
    EventKind, EventSink, HumanizeSettings, ManualClock, MudGuardLevel, PlayState, StateEvent,
    StateObserver, SystemClock,
};
pub use error::{EngineError, EngineResult};
pub use library::{Defaults, Library};
pub use types::{
    normalize, parse, EndingType, Energy, FillIntensity, InstrumentMode, Meter, OutputMode, Part,
    RightHand, Track,
};
