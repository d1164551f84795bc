//! General REPL commands (help, quit, status, styles, events)

use crate::commands::transport::parse_on_off;
use crate::commands::{CommandContext, CommandResult};
use backbeat_core::EngineSnapshot;
use colored::*;

/// Handle `help` command
pub fn cmd_help(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    print_help();
    CommandResult::Success
}

/// Handle `quit` or `exit` command
pub fn cmd_quit(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Exit
}

/// Handle `status` command
pub fn cmd_status(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.host.snapshot() {
        Ok(snapshot) => CommandResult::Message(format_status(&snapshot)),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `styles` command
pub fn cmd_styles(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let mut lines = vec![format!("{}", "Styles:".green())];
    for (id, style) in &ctx.library.styles {
        lines.push(format!(
            "  {:<10} {} ending {} bars",
            id.cyan(),
            style.meter,
            style.ending_bars
        ));
    }
    lines.push(format!("{}", "Groove presets:".green()));
    for id in ctx.library.groove_preset_ids() {
        lines.push(format!("  {}", id.cyan()));
    }
    CommandResult::Message(lines.join("\n"))
}

/// Handle `events [on|off]` command
pub fn cmd_events(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if !args.is_empty() {
        match parse_on_off(args) {
            Some(on) => ctx.show_events = on,
            None => return CommandResult::Error("Usage: events [on|off]".to_string()),
        }
    }
    CommandResult::Message(format!(
        "Event printing {}",
        if ctx.show_events { "on" } else { "off" }
    ))
}

pub fn format_status(s: &EngineSnapshot) -> String {
    let transport = if s.running {
        format!("{} bar {}", s.play_state, s.bar_index)
            .bright_green()
            .to_string()
    } else {
        "stopped".dimmed().to_string()
    };
    let mut lines = vec![
        format!("{} {}", "Transport:".bold(), transport),
        format!(
            "{} {}{}",
            "Chord:".bold(),
            s.chord.cyan(),
            s.pending_chord
                .as_ref()
                .map(|c| format!(" -> {}", c))
                .unwrap_or_default()
        ),
        format!(
            "{} {} ({}), groove {}",
            "Style:".bold(),
            s.style,
            s.meter,
            s.groove_preset
        ),
        format!(
            "{} {:.1} BPM (target {:.1})",
            "Tempo:".bold(),
            s.tempo.current,
            s.tempo.target
        ),
        format!(
            "{} energy {}, part {}, hand {}, assist {}",
            "Feel:".bold(),
            s.energy,
            s.part,
            s.right_hand,
            if s.auto_assist { "on" } else { "off" }
        ),
        format!(
            "{} {} on {} output, loi {:.2}, human {:.2}",
            "Sound:".bold(),
            s.instrument,
            s.output,
            s.humanize.loi,
            s.humanize.human
        ),
        format!("{} {}", "Mud guard:".bold(), s.mud_guard),
    ];
    if s.fill_pending {
        lines.push(format!("{} {} fill armed", "Transition:".bold(), s.fill_intensity));
    }
    if s.end_pending || s.ending_bars_left > 0 {
        lines.push(format!(
            "{} {} ending, {} bars left",
            "Transition:".bold(),
            s.ending_type,
            s.ending_bars_left
        ));
    }
    lines.join("\n")
}

fn print_help() {
    println!("{}", "Backbeat Help".bold());
    println!("{}", "=============".bold());
    println!();
    println!("{}", "Transport:".green());
    println!("  {}      - Start holding a chord", "start [chord]".cyan());
    println!("  {}               - Stop at once", "stop".cyan());
    println!("  {}       - Play one bar while stopped", "once [chord]".cyan());
    println!("  {}  - Fill at the next bar", "fill [soft|hard]".cyan());
    println!("  {}  - End over the next bars, then stop", "end [short|long]".cyan());
    println!();
    println!("{}", "Settings (take effect at the next bar while playing):".green());
    println!("  {}     - Change chord (or just type the chord)", "chord <sym>".cyan());
    println!("  {}       - Set target tempo", "tempo <bpm>".cyan());
    println!("  {}        - Switch style", "style <id>".cyan());
    println!("  {}   - Switch groove preset", "groove <preset>".cyan());
    println!("  {}  - low | normal | high", "energy <level>".cyan());
    println!("  {}     - verse | chorus", "part <part>".cyan());
    println!("  {}     - down | up | auto", "hand <hand>".cyan());
    println!("  {}   - Auto energy/hand from part", "assist <on|off>".cyan());
    println!("  {} - guitar | piano | band", "instrument <mode>".cyan());
    println!("  {}    - compact | external", "output <mode>".cyan());
    println!("  {} - Strum looseness and timing feel", "humanize [loi] [human]".cyan());
    println!();
    println!("{}", "General:".green());
    println!("  {}             - Show session state", "status".cyan());
    println!("  {}             - List styles and groove presets", "styles".cyan());
    println!("  {}  - Print every scheduled event", "events [on|off]".cyan());
    println!("  {}          - Exit", "quit, exit".cyan());
}
