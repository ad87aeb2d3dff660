//! Binary entrypoint for the life-drawing slide-show.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use life_drawing_class::config::Configuration;
use life_drawing_class::images::FileImageSource;
use life_drawing_class::playback::{PlaybackEngine, PlaybackSession};
use life_drawing_class::properties::DesignType;
use life_drawing_class::tasks::clock::{self, ClockCommand, ClockOptions};
use life_drawing_class::{merge, parser, scan, scheduler, segment};

#[derive(Debug, Parser)]
#[command(
    name = "life-drawing-class",
    version,
    about = "Timed reference slide-show for life-drawing practice"
)]
struct Cli {
    /// Path to YAML config
    #[arg(value_name = "CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Play this segment definition instead of the configured session, e.g. "5x2W,20,10B!,24"
    #[arg(short, long, value_name = "DEFINITION")]
    definition: Option<String>,

    /// Print the schedule and exit without importing images
    #[arg(long)]
    dry_run: bool,

    /// Override the speed multiplier
    #[arg(long, value_name = "FACTOR")]
    speed: Option<f64>,

    /// Deterministic seed for the image shuffle
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter =
        EnvFilter::from_default_env().add_directive(format!("life_drawing_class={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(definition) = cli.definition {
        cfg.session.design_type = DesignType::Manual;
        cfg.session.manual_segments_definition = definition;
    }
    if let Some(speed) = cli.speed {
        cfg.speed_multiplier = speed;
    }
    if cli.seed.is_some() {
        cfg.shuffle_seed = cli.seed;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;

    let segments = scheduler::session_segments(&cfg.session).context("failed to build schedule")?;
    let groups = merge::merge(&segments);
    info!(
        segments = segments.len(),
        total = %humantime::format_duration(segment::total_duration(&segments)),
        definition = %parser::format_definition(&groups),
        "schedule ready"
    );

    if cli.dry_run {
        let starts = segment::start_times(&segments);
        let mut first = 0;
        for group in &groups {
            let start = starts.get(first).copied().unwrap_or_default();
            println!(
                "{:>9}  {:<10} {}",
                humantime::format_duration(start).to_string(),
                group.kind.to_string(),
                group.duration_text()
            );
            first += group.count;
        }
        println!("{}", parser::format_definition(&groups));
        return Ok(());
    }

    let images = scan::import_images(&cfg.image_folders, &cfg.scan_options())
        .context("failed to import images")?;
    info!(count = images.len(), "imported images");

    let session = PlaybackSession::new(images, segments, cfg.image_order())?;
    let engine = PlaybackEngine::new(session, FileImageSource);

    let cancel = CancellationToken::new();
    let (command_tx, command_rx) = mpsc::channel::<ClockCommand>(16);

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    // p: pause/resume, r: restart, q: quit
    if std::io::stdin().is_terminal() {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let command = match line.trim() {
                    "p" => ClockCommand::Toggle,
                    "r" => ClockCommand::Restart,
                    "q" => break,
                    other => {
                        warn!(input = other, "unknown command; use p, r or q");
                        continue;
                    }
                };
                if command_tx.send(command).await.is_err() {
                    return;
                }
            }
            info!("stdin closed; initiating shutdown");
            cancel.cancel();
        });
    } else {
        tracing::debug!("stdin is not a terminal; skipping command reader");
    }

    let options = ClockOptions {
        interval: cfg.tick_interval,
        step: cfg.session_step(),
    };
    let engine = clock::run(engine, options, command_rx, cancel)
        .await
        .context("clock task failed")?;
    info!(
        state = %engine.state(),
        paused = %humantime::format_duration(engine.total_pause_duration()),
        "slide-show stopped"
    );
    Ok(())
}
