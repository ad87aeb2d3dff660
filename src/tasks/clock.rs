//! Periodic driver that feeds wall-clock time into a [`PlaybackEngine`].

use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::playback::{ImageSource, PlaybackEngine, SlideShowState, TickOutcome};

/// Requests forwarded to the engine between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    Pause,
    Resume,
    /// Pause when running, resume when paused.
    Toggle,
    /// Start over from the first segment, continuing the image order.
    Restart,
}

#[derive(Debug, Clone, Copy)]
pub struct ClockOptions {
    /// Real time between two ticks.
    pub interval: Duration,
    /// Session time credited on every tick; larger than `interval` to fast-forward.
    pub step: Duration,
}

impl Default for ClockOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            step: Duration::from_secs(1),
        }
    }
}

/// Tick `engine` until the schedule finishes or `cancel` fires.
///
/// Starts the engine first if it has not been started. Commands and ticks are
/// handled on this task only, so they never overlap.
pub async fn run<S: ImageSource>(
    mut engine: PlaybackEngine<S>,
    options: ClockOptions,
    mut commands: Receiver<ClockCommand>,
    cancel: CancellationToken,
) -> Result<PlaybackEngine<S>> {
    if engine.state() == SlideShowState::NotStarted {
        engine.start(true);
    }

    let mut ticker = interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; stopping clock");
                break;
            }

            Some(command) = commands.recv() => apply(&mut engine, command),

            _ = ticker.tick() => {
                match engine.tick(options.step)? {
                    TickOutcome::Counted => {}
                    TickOutcome::Advanced { segment } => {
                        debug!(segment, "clock advanced segment");
                    }
                    TickOutcome::Finished => {
                        info!("schedule complete; stopping clock");
                        break;
                    }
                }
            }
        }
    }
    Ok(engine)
}

fn apply<S: ImageSource>(engine: &mut PlaybackEngine<S>, command: ClockCommand) {
    let result = match command {
        ClockCommand::Pause => engine.pause().map(drop),
        ClockCommand::Resume => engine.resume().map(drop),
        ClockCommand::Toggle if engine.state() == SlideShowState::Paused => {
            engine.resume().map(drop)
        }
        ClockCommand::Toggle => engine.pause().map(drop),
        ClockCommand::Restart => {
            engine.start(false);
            Ok(())
        }
    };
    if let Err(err) = result {
        warn!(?command, "ignoring command: {err}");
    }
}
