use std::time::Duration;

use life_drawing_class::cycle::ImageOrder;
use life_drawing_class::parser::parse;
use life_drawing_class::playback::{ImageSource, PlaybackEngine, PlaybackSession, SlideShowState};
use life_drawing_class::tasks::clock::{self, ClockCommand, ClockOptions};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct Names;

impl ImageSource for Names {
    type Image = String;

    fn decode(&mut self, path: &str) -> anyhow::Result<String> {
        Ok(path.to_string())
    }
}

fn engine(definition: &str, images: usize) -> PlaybackEngine<Names> {
    let outcome = parse(definition);
    assert!(outcome.diagnostics.is_empty());
    let paths = (0..images).map(|i| format!("img-{i}.png")).collect();
    let session = PlaybackSession::new(paths, outcome.segments, ImageOrder::Sequential).unwrap();
    PlaybackEngine::new(session, Names)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clock_runs_schedule_to_the_end() {
    // two 30 second poses, 20 seconds of session time per tick
    let engine = engine("2x0.5", 3);
    let (_tx, rx) = mpsc::channel::<ClockCommand>(4);
    let options = ClockOptions {
        interval: Duration::from_millis(5),
        step: Duration::from_secs(20),
    };

    let engine = tokio::time::timeout(
        Duration::from_secs(5),
        clock::run(engine, options, rx, CancellationToken::new()),
    )
    .await
    .expect("clock did not finish")
    .unwrap();

    assert_eq!(engine.state(), SlideShowState::Finished);
    assert_eq!(engine.current_segment_index(), Some(1));
    assert_eq!(engine.current_image_path(), Some("img-1.png"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn paused_clock_counts_pause_and_stops_on_cancel() {
    let engine = engine("40", 1);
    let (tx, rx) = mpsc::channel::<ClockCommand>(4);
    let cancel = CancellationToken::new();
    let options = ClockOptions {
        interval: Duration::from_millis(5),
        step: Duration::from_secs(1),
    };

    let handle = tokio::spawn(clock::run(engine, options, rx, cancel.clone()));
    tx.send(ClockCommand::Toggle).await.unwrap();
    // pausing twice is rejected by the engine and only logged
    tx.send(ClockCommand::Pause).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let engine = handle.await.unwrap().unwrap();
    assert_eq!(engine.state(), SlideShowState::Paused);
    assert!(engine.total_pause_duration() > Duration::ZERO);
    assert!(engine.current_segment_elapsed_time() < Duration::from_secs(40 * 60));
}
