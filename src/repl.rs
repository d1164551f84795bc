//! Interactive REPL
//!
//! Reads lines on a background thread and multiplexes them with the host's
//! output channel, so scheduled bars and state changes print as they happen.

use crate::commands::{create_registry, CommandContext, CommandResult};
use crate::host::{Host, HostOutput};
use anyhow::{anyhow, Result};
use backbeat_core::{parse, EngineCommand, Event, Library, StateEvent};
use colored::*;
use crossbeam_channel::{unbounded, Receiver};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use std::thread;

/// Input from the line-reader thread
enum ReplInput {
    Line(String),
    Closed(Option<ReadlineError>),
}

pub struct Repl {
    editor: Option<DefaultEditor>,
    ctx: CommandContext,
}

impl Repl {
    pub fn new(host: Host, library: Arc<Library>) -> Result<Self> {
        let editor =
            DefaultEditor::new().map_err(|e| anyhow!("Failed to initialize REPL: {}", e))?;
        Ok(Repl {
            editor: Some(editor),
            ctx: CommandContext::new(host, library),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        println!(
            "{} {}",
            "♪".bright_yellow(),
            "Backbeat accompaniment engine".bright_cyan().bold()
        );
        println!(
            "Type a chord like {} or {}, then {} to play it.",
            "Am".cyan(),
            "G7".cyan(),
            "start".cyan()
        );
        println!(
            "Type '{}' for more information, '{}' or {} to exit.\n",
            "help".bright_green(),
            "quit".bright_red(),
            "Ctrl+D".bright_red()
        );

        let mut editor = self
            .editor
            .take()
            .ok_or_else(|| anyhow!("The REPL is already running"))?;
        let (input_tx, input_rx) = unbounded();

        thread::spawn(move || loop {
            let prompt = format!("{} ", "backbeat>".bright_magenta().bold());
            match editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        let _ = editor.add_history_entry(&line);
                    }
                    if input_tx.send(ReplInput::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    let _ = input_tx.send(ReplInput::Closed(None));
                    break;
                }
                Err(err) => {
                    let _ = input_tx.send(ReplInput::Closed(Some(err)));
                    break;
                }
            }
        });

        let outputs = self.ctx.host.outputs().clone();
        self.event_loop(&input_rx, &outputs)
    }

    fn event_loop(
        &mut self,
        input_rx: &Receiver<ReplInput>,
        outputs: &Receiver<HostOutput>,
    ) -> Result<()> {
        let registry = create_registry();

        loop {
            crossbeam_channel::select! {
                recv(input_rx) -> msg => match msg {
                    Ok(ReplInput::Line(line)) => {
                        if line.is_empty() {
                            continue;
                        }
                        match registry.execute(&line, &mut self.ctx) {
                            CommandResult::Success => {}
                            CommandResult::Message(msg) => println!("{}", msg),
                            CommandResult::Exit => {
                                println!("{}", "Goodbye!".bright_cyan());
                                break;
                            }
                            CommandResult::NotACommand => self.bare_input(&line),
                            CommandResult::Error(e) => {
                                println!("{} {}", "Error:".bright_red().bold(), e.red())
                            }
                        }
                    }
                    Ok(ReplInput::Closed(err)) => {
                        if let Some(err) = err {
                            println!("{} {}", "Error:".bright_red().bold(), err);
                        }
                        println!("{}", "Goodbye!".bright_cyan());
                        break;
                    }
                    Err(_) => break,
                },
                recv(outputs) -> msg => match msg {
                    Ok(output) => {
                        if let Some(line) = format_output(&output, self.ctx.show_events) {
                            println!("{}", line);
                        }
                    }
                    Err(_) => return Err(anyhow!("The driver thread has stopped")),
                },
            }
        }

        self.ctx.host.shutdown();
        Ok(())
    }

    /// Anything that is not a command but parses as a chord changes the chord
    fn bare_input(&mut self, line: &str) {
        if parse(line).is_some() {
            if let CommandResult::Error(e) = self.ctx.send(EngineCommand::SetChord(line.to_string())) {
                println!("{} {}", "Error:".bright_red().bold(), e.red());
            }
        } else {
            println!(
                "{} unknown command or chord '{}' (try {})",
                "Error:".bright_red().bold(),
                line,
                "help".bright_green()
            );
        }
    }
}

/// One line of REPL output for a host output, or None to stay quiet
pub fn format_output(output: &HostOutput, show_events: bool) -> Option<String> {
    match output {
        HostOutput::Event(event) => format_event(event, show_events),
        HostOutput::State(state) => format_state(state),
        HostOutput::Rejected { command, reason } => Some(format!(
            "{} {} ({})",
            "Rejected:".bright_red().bold(),
            command,
            reason
        )),
    }
}

fn format_event(event: &Event, show_events: bool) -> Option<String> {
    if event.is_bar() {
        Some(event.to_string().bright_blue().to_string())
    } else if event.is_stop() {
        Some(event.to_string().bright_red().to_string())
    } else if show_events {
        Some(event.to_string().dimmed().to_string())
    } else {
        None
    }
}

fn format_state(state: &StateEvent) -> Option<String> {
    let text = match state {
        StateEvent::Start { snapshot } => format!(
            "started {} on {} at {:.1} BPM",
            snapshot.style, snapshot.chord, snapshot.tempo.current
        ),
        StateEvent::Stop => "stopped".to_string(),
        // Bars already print through their meta event
        StateEvent::BarBoundary { .. } => return None,
        StateEvent::Applied { change } => format!("{}", change),
        StateEvent::Pending { change } => format!("{} at next bar", change),
        StateEvent::ChordPending {
            current,
            pending,
            mud_guard_level,
        } => format!("{} -> {} at next bar (guard {})", current, pending, mud_guard_level),
        StateEvent::TempoTarget { target, current } => {
            format!("tempo -> {:.1} BPM (now {:.1})", target, current)
        }
        StateEvent::Humanize { settings } => {
            format!("humanize loi {:.2}, human {:.2}", settings.loi, settings.human)
        }
        StateEvent::FillPending { intensity } => format!("{} fill at next bar", intensity),
        StateEvent::FillUsed { intensity } => format!("{} fill played", intensity),
        StateEvent::EndingPending { ending } => format!("{} ending at next bar", ending),
        StateEvent::EndingStart { bars, ending } => format!("{} ending, {} bars", ending, bars),
        StateEvent::EndingDone { stop_at } => format!("ending done, stop at {:.3}s", stop_at),
        StateEvent::OneShot { chord, time } => format!("one-shot {} at {:.3}s", chord, time),
        StateEvent::Degraded { degradation } => {
            return Some(format!("{} {}", "Warning:".yellow(), degradation));
        }
    };
    Some(format!("{} {}", "·".bright_yellow(), text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use backbeat_core::{Degradation, Engine, EngineConfig, ManualClock};

    fn stop_event() -> Event {
        Event::stop_at(1.5, "Am")
    }

    #[test]
    fn test_stop_always_printed() {
        let line = format_output(&HostOutput::Event(stop_event()), false).unwrap();
        assert!(line.contains("stop"));
    }

    #[test]
    fn test_bar_boundary_quiet() {
        let library = Arc::new(Library::builtin().unwrap());
        let engine =
            Engine::new(library, EngineConfig::default(), ManualClock::new(0.0), Vec::<Event>::new())
                .unwrap();
        let snapshot = engine.snapshot();
        assert!(format_output(&HostOutput::State(StateEvent::BarBoundary { snapshot }), true).is_none());
        assert!(format_output(&HostOutput::State(StateEvent::Stop), false).is_some());
    }

    #[test]
    fn test_degradation_printed() {
        let state = StateEvent::Degraded {
            degradation: Degradation::UnparsableChord { chord: "H7".into() },
        };
        let line = format_output(&HostOutput::State(state), false).unwrap();
        assert!(line.contains("H7"));
    }
}
