//! # Backbeat
//!
//! Real-time host for the `backbeat-core` accompaniment engine.
//!
//! - `host`: runs one engine session on a driver thread that ticks it on a
//!   fixed interval and applies queued commands between ticks.
//! - `commands`: the REPL command registry.
//! - `repl`: the interactive front end that prints bars and state changes.

pub mod commands;
pub mod host;
pub mod repl;

pub use crate::host::{Host, HostOutput};
