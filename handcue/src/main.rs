//! handcue - replay hand-landmark scenarios through the tracking engine.
//!
//! Emotes are printed to stdout; cursor actions and engine state go to the
//! log.

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use tracing::{debug, info, warn};

use handcue::cursor::CursorController;
use handcue::scenario::Scenario;
use handcue::sink::{dispatch, EventRouter, TerminalEmoteSink};
use handcue::{Engine, EngineConfig, Preset};

#[derive(Parser, Debug)]
#[command(name = "handcue", about = "Hand tracking and emote trigger engine")]
struct Cli {
    /// Scenario file: one s-expression frame per line
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Run the built-in demo session
    #[arg(long)]
    demo: bool,

    /// Config override file (plist)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preset: default, high-performance, high-accuracy, responsive, smooth
    #[arg(long)]
    preset: Option<String>,

    /// Log engine status every N frames (0 = never)
    #[arg(long, default_value_t = 0)]
    status_every: u64,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handcue=info".into()),
        )
        .init();

    info!("handcue v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match cli.preset.as_deref() {
        Some(name) => match Preset::from_str(name) {
            Some(preset) => {
                info!("preset: {}", preset.as_str());
                EngineConfig::preset(preset)
            }
            None => {
                let known: Vec<&str> = Preset::all().iter().map(|p| p.as_str()).collect();
                bail!("unknown preset: {} (use: {})", name, known.join(", "));
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(path) = &cli.config {
        config = EngineConfig::from_file(path, config)?;
        info!("config loaded from {}", path.display());
    }
    config.validate()?;

    if cli.print_config {
        println!("{}", config.config_sexp());
        return Ok(());
    }

    let scenario = match (&cli.scenario, cli.demo) {
        (Some(_), true) => bail!("--scenario and --demo are mutually exclusive"),
        (Some(path), false) => Scenario::from_file(path)?,
        (None, true) => Scenario::demo(),
        (None, false) => bail!("nothing to run: pass --scenario <file> or --demo"),
    };
    info!("replaying {} frame(s)", scenario.len());

    let mut router = EventRouter::new(
        CursorController::new(config.cursor, config.click),
        TerminalEmoteSink::stdout(),
    );
    let mut engine = Engine::new(config);

    for (i, frame) in scenario.frames.iter().enumerate() {
        let snapshot = engine.update(&frame.input, frame.t);
        dispatch(&mut router, &snapshot);
        for action in router.cursor.drain_actions() {
            debug!(frame = snapshot.frame, "cursor {}", action.to_sexp());
        }
        if cli.status_every > 0 && (i as u64 + 1) % cli.status_every == 0 {
            info!("status {}", engine.status_sexp());
        }
    }

    if scenario.is_empty() {
        warn!("scenario had no frames");
    }
    info!(
        "done: {} emote(s) printed, {} track(s) evicted",
        router.emote.printed,
        engine.tracks().evicted_total
    );
    info!("final status {}", engine.status_sexp());
    Ok(())
}
