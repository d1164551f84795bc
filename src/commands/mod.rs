//! Command registry for the REPL
//!
//! Each command is a prefix and a handler. Most handlers parse their
//! arguments into an [`EngineCommand`] and queue it on the host.

pub mod general;
pub mod transport;

use crate::host::Host;
use backbeat_core::{EngineCommand, Library};
use std::sync::Arc;

/// Result of executing a command
#[derive(Debug)]
pub enum CommandResult {
    /// Command executed successfully, continue REPL
    Success,
    /// Command executed, show this message
    Message(String),
    /// Exit the REPL
    Exit,
    /// Not a command; the REPL tries the input as a chord
    NotACommand,
    /// Error occurred
    Error(String),
}

/// Context passed to command handlers
pub struct CommandContext {
    pub host: Host,
    pub library: Arc<Library>,
    /// Print every scheduled event, not just bars and state changes
    pub show_events: bool,
}

impl CommandContext {
    pub fn new(host: Host, library: Arc<Library>) -> Self {
        Self {
            host,
            library,
            show_events: false,
        }
    }

    /// Queue a command on the host, reporting a dead driver as an error
    pub fn send(&self, command: EngineCommand) -> CommandResult {
        match self.host.send(command) {
            Ok(()) => CommandResult::Success,
            Err(e) => CommandResult::Error(e.to_string()),
        }
    }
}

/// A command handler function
pub type CommandHandler = fn(&str, &mut CommandContext) -> CommandResult;

/// Registry of available commands
pub struct CommandRegistry {
    /// Sorted by prefix length descending for longest-match-first lookup
    commands: Vec<(String, CommandHandler)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn register(&mut self, prefix: &str, handler: CommandHandler) {
        self.commands.push((prefix.to_string(), handler));
        self.commands.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Execute a command, returning NotACommand if no match found
    pub fn execute(&self, input: &str, ctx: &mut CommandContext) -> CommandResult {
        for (prefix, handler) in &self.commands {
            if input == prefix || input.starts_with(&format!("{} ", prefix)) {
                let args = input[prefix.len()..].trim();
                return handler(args, ctx);
            }
        }
        CommandResult::NotACommand
    }

    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.iter().map(|(p, _)| p.as_str()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with every built-in command
pub fn create_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    // Transport
    registry.register("start", transport::cmd_start);
    registry.register("stop", transport::cmd_stop);
    registry.register("once", transport::cmd_once);
    registry.register("fill", transport::cmd_fill);
    registry.register("end", transport::cmd_end);

    // Session settings
    registry.register("chord", transport::cmd_chord);
    registry.register("tempo", transport::cmd_tempo);
    registry.register("style", transport::cmd_style);
    registry.register("groove", transport::cmd_groove);
    registry.register("energy", transport::cmd_energy);
    registry.register("part", transport::cmd_part);
    registry.register("hand", transport::cmd_hand);
    registry.register("assist", transport::cmd_assist);
    registry.register("instrument", transport::cmd_instrument);
    registry.register("output", transport::cmd_output);
    registry.register("humanize", transport::cmd_humanize);

    // General
    registry.register("status", general::cmd_status);
    registry.register("styles", general::cmd_styles);
    registry.register("events", general::cmd_events);
    registry.register("help", general::cmd_help);
    registry.register("quit", general::cmd_quit);
    registry.register("exit", general::cmd_quit);

    registry
}
