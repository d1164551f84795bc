//! The scheduling engine: session state, bar-boundary commits and event emission

pub mod clock;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod groove;
pub mod humanize;
pub mod mud_guard;
pub mod scheduler;
pub mod selector;
pub mod state;
pub mod transition;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::EngineCommand;
pub use config::EngineConfig;
pub use dispatch::{Degradation, EventSink, StateEvent, StateObserver};
pub use event::{BarInfo, Event, EventBody, EventKind, Hint};
pub use groove::GrooveProfile;
pub use humanize::{HumanizeSettings, Humanizer};
pub use mud_guard::{AntiMudGuard, MudGuardLevel};
pub use scheduler::Engine;
pub use selector::{select_pattern_id, Selection};
pub use state::{EngineSnapshot, PlayState, Setting, Tempo, MAX_BPM, MIN_BPM};
pub use transition::{TransitionMode, TransitionState};
