use anyhow::{anyhow, Context, Result};
use backbeat::repl::Repl;
use backbeat::Host;
use backbeat_core::{EngineConfig, InstrumentMode, Library, OutputMode};
use clap::Parser;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "backbeat")]
#[command(about = "Bar-quantized accompaniment engine with an interactive REPL")]
struct Cli {
    /// Library JSON (styles, patterns, groove presets, guitar shapes)
    #[arg(long)]
    library: Option<PathBuf>,

    /// Engine timing configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Starting style id
    #[arg(long)]
    style: Option<String>,

    /// Starting tempo
    #[arg(long)]
    bpm: Option<f64>,

    /// guitar, piano or band
    #[arg(long)]
    instrument: Option<String>,

    /// compact or external
    #[arg(long)]
    output: Option<String>,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

fn load_library(cli: &Cli) -> Result<Library> {
    let mut library = match &cli.library {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read library {}", path.display()))?;
            Library::from_json_str(&json)
                .with_context(|| format!("Failed to load library {}", path.display()))?
        }
        None => Library::builtin()?,
    };

    if let Some(style) = &cli.style {
        library.style(style)?;
        library.defaults.style = style.clone();
    }
    if let Some(bpm) = cli.bpm {
        library.defaults.bpm = bpm;
    }
    if let Some(name) = &cli.instrument {
        library.defaults.instrument = InstrumentMode::from_name(name)
            .ok_or_else(|| anyhow!("Unknown instrument '{}' (guitar, piano, band)", name))?;
    }
    if let Some(name) = &cli.output {
        library.defaults.output = OutputMode::from_name(name)
            .ok_or_else(|| anyhow!("Unknown output '{}' (compact, external)", name))?;
    }
    Ok(library)
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Invalid config {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.quiet { "warn" } else { "info" }),
    )
    .init();

    let library = Arc::new(load_library(&cli)?);
    let config = load_config(&cli)?;
    info!(
        "Backbeat v{}: {} styles, starting on {} at {:.0} BPM",
        env!("CARGO_PKG_VERSION"),
        library.styles.len(),
        library.defaults.style,
        library.defaults.bpm
    );

    let host = Host::spawn(library.clone(), config)?;
    Repl::new(host, library)?.run()
}
