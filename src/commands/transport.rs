//! Transport and session-setting commands

use crate::commands::{CommandContext, CommandResult};
use backbeat_core::{
    parse, EndingType, Energy, EngineCommand, FillIntensity, HumanizeSettings, InstrumentMode,
    OutputMode, Part, RightHand,
};
use colored::*;
use std::fmt::Display;

/// Parse a closed-set setting name, listing the valid names on failure
fn parse_named<T: Copy + Display>(
    args: &str,
    what: &str,
    from_name: fn(&str) -> Option<T>,
    all: &[T],
) -> Result<T, CommandResult> {
    from_name(args).ok_or_else(|| {
        let names: Vec<String> = all.iter().map(|v| v.to_string()).collect();
        CommandResult::Error(format!("Usage: {} <{}>", what, names.join("|")))
    })
}

pub(crate) fn parse_on_off(args: &str) -> Option<bool> {
    match args.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// `<loi> <human>` or `loi=<x> human=<y>`, either part optional
pub(crate) fn parse_humanize(args: &str, current: HumanizeSettings) -> Option<HumanizeSettings> {
    let mut settings = current;
    for (i, part) in args.split_whitespace().enumerate() {
        let (key, value) = match part.split_once('=') {
            Some((k, v)) => (k, v),
            None if i == 0 => ("loi", part),
            None if i == 1 => ("human", part),
            None => return None,
        };
        let value: f64 = value.parse().ok()?;
        match key {
            "loi" => settings.loi = value,
            "human" => settings.human = value,
            _ => return None,
        }
    }
    Some(settings.clamped())
}

fn optional_chord(args: &str) -> Result<Option<String>, CommandResult> {
    if args.is_empty() {
        return Ok(None);
    }
    if parse(args).is_none() {
        return Err(CommandResult::Error(format!("Not a chord: {}", args)));
    }
    Ok(Some(args.to_string()))
}

/// Handle `start [chord]`
pub fn cmd_start(args: &str, ctx: &mut CommandContext) -> CommandResult {
    match optional_chord(args) {
        Ok(chord) => ctx.send(EngineCommand::StartHold(chord)),
        Err(e) => e,
    }
}

/// Handle `stop`
pub fn cmd_stop(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    ctx.send(EngineCommand::Stop)
}

/// Handle `once [chord]`
pub fn cmd_once(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if ctx.host.is_running() {
        return CommandResult::Error("One-shots only play while stopped".to_string());
    }
    match optional_chord(args) {
        Ok(chord) => ctx.send(EngineCommand::OneShot(chord)),
        Err(e) => e,
    }
}

/// Handle `chord <symbol>`
pub fn cmd_chord(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: chord <symbol>".to_string());
    }
    if parse(args).is_none() {
        println!(
            "{} '{}' is not a known chord, the last good one keeps playing",
            "Warning:".yellow(),
            args
        );
    }
    ctx.send(EngineCommand::SetChord(args.to_string()))
}

/// Handle `tempo [bpm]`
pub fn cmd_tempo(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message(format!("Current tempo: {:.1} BPM", ctx.host.bpm()));
    }
    match args.parse::<f64>() {
        Ok(bpm) if bpm.is_finite() && bpm > 0.0 => ctx.send(EngineCommand::SetTempo(bpm)),
        _ => CommandResult::Error("Usage: tempo <bpm>".to_string()),
    }
}

/// Handle `style <id>`
pub fn cmd_style(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: style <id> (see `styles`)".to_string());
    }
    if ctx.library.style(args).is_err() {
        return CommandResult::Error(format!("Unknown style '{}'", args));
    }
    ctx.send(EngineCommand::SetStyle(args.to_string()))
}

/// Handle `groove <preset>`
pub fn cmd_groove(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: groove <preset> (see `styles`)".to_string());
    }
    if !ctx.library.has_groove_preset(args) {
        println!(
            "{} unknown groove preset '{}', using '{}'",
            "Warning:".yellow(),
            args,
            ctx.library.defaults.groove_preset
        );
    }
    ctx.send(EngineCommand::SetGroovePreset(args.to_string()))
}

/// Handle `energy <low|normal|high>`
pub fn cmd_energy(args: &str, ctx: &mut CommandContext) -> CommandResult {
    match parse_named(args, "energy", Energy::from_name, Energy::ALL) {
        Ok(energy) => ctx.send(EngineCommand::SetEnergy(energy)),
        Err(e) => e,
    }
}

/// Handle `part <verse|chorus>`
pub fn cmd_part(args: &str, ctx: &mut CommandContext) -> CommandResult {
    match parse_named(args, "part", Part::from_name, Part::ALL) {
        Ok(part) => ctx.send(EngineCommand::SetPart(part)),
        Err(e) => e,
    }
}

/// Handle `hand <down|up|auto>`
pub fn cmd_hand(args: &str, ctx: &mut CommandContext) -> CommandResult {
    match parse_named(args, "hand", RightHand::from_name, RightHand::ALL) {
        Ok(hand) => ctx.send(EngineCommand::SetRightHand(hand)),
        Err(e) => e,
    }
}

/// Handle `assist <on|off>`
pub fn cmd_assist(args: &str, ctx: &mut CommandContext) -> CommandResult {
    match parse_on_off(args) {
        Some(on) => ctx.send(EngineCommand::SetAutoAssist(on)),
        None => CommandResult::Error("Usage: assist <on|off>".to_string()),
    }
}

/// Handle `instrument <guitar|piano|band>`
pub fn cmd_instrument(args: &str, ctx: &mut CommandContext) -> CommandResult {
    match parse_named(args, "instrument", InstrumentMode::from_name, InstrumentMode::ALL) {
        Ok(instrument) => ctx.send(EngineCommand::SetInstrument(instrument)),
        Err(e) => e,
    }
}

/// Handle `output <compact|external>`
pub fn cmd_output(args: &str, ctx: &mut CommandContext) -> CommandResult {
    match parse_named(args, "output", OutputMode::from_name, OutputMode::ALL) {
        Ok(output) => ctx.send(EngineCommand::SetOutput(output)),
        Err(e) => e,
    }
}

/// Handle `humanize [loi] [human]`
pub fn cmd_humanize(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let current = match ctx.host.snapshot() {
        Ok(snapshot) => snapshot.humanize,
        Err(e) => return CommandResult::Error(e.to_string()),
    };
    if args.is_empty() {
        return CommandResult::Message(format!(
            "Humanize: loi {:.2}, human {:.2}",
            current.loi, current.human
        ));
    }
    match parse_humanize(args, current) {
        Some(settings) => ctx.send(EngineCommand::SetHumanize(settings)),
        None => CommandResult::Error("Usage: humanize [loi=<0..1>] [human=<0..1>]".to_string()),
    }
}

/// Handle `fill [soft|hard]`
pub fn cmd_fill(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let intensity = if args.is_empty() {
        FillIntensity::default()
    } else {
        match parse_named(args, "fill", FillIntensity::from_name, FillIntensity::ALL) {
            Ok(intensity) => intensity,
            Err(e) => return e,
        }
    };
    ctx.send(EngineCommand::TriggerFill(intensity))
}

/// Handle `end [short|long]`
pub fn cmd_end(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let ending = if args.is_empty() {
        EndingType::default()
    } else {
        match parse_named(args, "end", EndingType::from_name, EndingType::ALL) {
            Ok(ending) => ending,
            Err(e) => return e,
        }
    };
    ctx.send(EngineCommand::TriggerEnd(ending))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_on_off() {
        assert_eq!(parse_on_off("on"), Some(true));
        assert_eq!(parse_on_off(" OFF "), Some(false));
        assert_eq!(parse_on_off("maybe"), None);
    }

    #[test]
    fn test_parse_humanize() {
        let current = HumanizeSettings::default();
        let both = parse_humanize("0.2 0.9", current).unwrap();
        assert_eq!(both.loi, 0.2);
        assert_eq!(both.human, 0.9);

        let keyed = parse_humanize("human=0.1", current).unwrap();
        assert_eq!(keyed.loi, current.loi);
        assert_eq!(keyed.human, 0.1);

        let clamped = parse_humanize("loi=3", current).unwrap();
        assert_eq!(clamped.loi, 1.0);

        assert!(parse_humanize("speed=1", current).is_none());
        assert!(parse_humanize("0.1 0.2 0.3", current).is_none());
    }

    #[test]
    fn test_parse_named_lists_choices() {
        match parse_named("loud", "energy", Energy::from_name, Energy::ALL) {
            Err(CommandResult::Error(msg)) => assert!(msg.contains("low|normal|high")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_named("HIGH", "energy", Energy::from_name, Energy::ALL),
            Ok(Energy::High)
        ));
    }
}
