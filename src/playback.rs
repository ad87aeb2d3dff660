//! Slide-show state machine: walks a schedule in real time and decides which
//! image is on screen.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cycle::{ImageCycle, ImageOrder};
use crate::error::Error;
use crate::events::{Notifier, PlaybackField};
use crate::segment::Segment;

/// Decodes images on demand for the engine.
pub trait ImageSource {
    type Image;

    /// Decode the image behind `path`.
    ///
    /// # Errors
    /// Any failure; the engine skips the image and tries the next one.
    fn decode(&mut self, path: &str) -> anyhow::Result<Self::Image>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideShowState {
    #[default]
    NotStarted,
    Running,
    Paused,
    Finished,
}

impl SlideShowState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for SlideShowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: SlideShowState,
    pub to: SlideShowState,
}

/// What a single [`PlaybackEngine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time was added to the running segment or to the pause.
    Counted,
    /// The previous segment ran out and `segment` is now playing.
    Advanced { segment: usize },
    /// The last segment ran out.
    Finished,
}

/// Everything needed to resume a slide-show, as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlaybackSession {
    pub image_paths: Vec<String>,
    pub segments: Vec<Segment>,
    pub images_order: ImageCycle,
    /// Segment index to the `images_order` position shown during it.
    pub segment_image_index: BTreeMap<usize, usize>,
    pub state: SlideShowState,
    pub current_segment_index: Option<usize>,
    #[serde(with = "humantime_serde")]
    pub current_segment_elapsed_time: Duration,
    #[serde(with = "humantime_serde")]
    pub total_pause_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub current_pause_duration: Duration,
}

impl PlaybackSession {
    /// Fix the image order and prepare a not-yet-started session.
    ///
    /// # Errors
    /// Returns [`Error::EmptySchedule`] if `segments` is empty.
    pub fn new(
        image_paths: Vec<String>,
        segments: Vec<Segment>,
        order: ImageOrder,
    ) -> Result<Self, Error> {
        if segments.is_empty() {
            return Err(Error::EmptySchedule);
        }
        let images_order = ImageCycle::new(image_paths.len(), order);
        Ok(Self {
            image_paths,
            segments,
            images_order,
            segment_image_index: BTreeMap::new(),
            state: SlideShowState::NotStarted,
            current_segment_index: None,
            current_segment_elapsed_time: Duration::ZERO,
            total_pause_duration: Duration::ZERO,
            current_pause_duration: Duration::ZERO,
        })
    }

    #[must_use]
    pub fn current_segment(&self) -> Option<&Segment> {
        self.current_segment_index
            .and_then(|index| self.segments.get(index))
    }
}

pub struct PlaybackEngine<S: ImageSource> {
    session: PlaybackSession,
    source: S,
    current_image: Option<S::Image>,
    /// `images_order` position of `current_image`.
    displayed_slot: Option<usize>,
    notifier: Notifier<PlaybackField>,
}

impl<S: ImageSource> PlaybackEngine<S> {
    pub fn new(session: PlaybackSession, source: S) -> Self {
        Self {
            session,
            source,
            current_image: None,
            displayed_slot: None,
            notifier: Notifier::default(),
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn into_session(self) -> PlaybackSession {
        self.session
    }

    pub fn state(&self) -> SlideShowState {
        self.session.state
    }

    pub fn current_segment_index(&self) -> Option<usize> {
        self.session.current_segment_index
    }

    pub fn current_segment(&self) -> Option<&Segment> {
        self.session.current_segment()
    }

    pub fn current_segment_elapsed_time(&self) -> Duration {
        self.session.current_segment_elapsed_time
    }

    /// Time left in the current segment.
    pub fn remaining(&self) -> Duration {
        self.current_segment()
            .map(|segment| {
                segment
                    .duration()
                    .saturating_sub(self.session.current_segment_elapsed_time)
            })
            .unwrap_or_default()
    }

    pub fn total_pause_duration(&self) -> Duration {
        self.session.total_pause_duration
    }

    pub fn current_pause_duration(&self) -> Duration {
        self.session.current_pause_duration
    }

    /// Position in the image order of the image shown last, if any.
    pub fn last_used_image(&self) -> Option<usize> {
        self.session.images_order.last_used()
    }

    pub fn current_image(&self) -> Option<&S::Image> {
        self.current_image.as_ref()
    }

    /// Path of the image currently on screen.
    pub fn current_image_path(&self) -> Option<&str> {
        let slot = self.displayed_slot?;
        let index = self.session.images_order.image_at(slot)?;
        self.session.image_paths.get(index).map(String::as_str)
    }

    /// Receive the name of every field that changes from now on.
    pub fn subscribe(&mut self) -> Receiver<PlaybackField> {
        self.notifier.subscribe()
    }

    /// Begin, or begin again, from the first segment.
    ///
    /// With `reset_image_order` the image cycle starts over from its first
    /// entry; otherwise it continues where the previous run stopped.
    pub fn start(&mut self, reset_image_order: bool) -> Option<StateChange> {
        if reset_image_order {
            self.session.images_order.reset();
            self.notifier.notify(PlaybackField::LastUsedImage);
        }
        self.session.segment_image_index.clear();
        self.session.current_pause_duration = Duration::ZERO;
        self.session.total_pause_duration = Duration::ZERO;
        self.notifier.notify_all(&[
            PlaybackField::SegmentImageIndex,
            PlaybackField::CurrentPauseDuration,
            PlaybackField::TotalPauseDuration,
        ]);
        info!(
            segments = self.session.segments.len(),
            images = self.session.image_paths.len(),
            reset_image_order,
            "slide-show started"
        );
        self.go_to_segment(0)
    }

    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless running.
    pub fn pause(&mut self) -> Result<Option<StateChange>, Error> {
        if self.session.state != SlideShowState::Running {
            return Err(self.invalid("pause"));
        }
        self.session.current_pause_duration = Duration::ZERO;
        self.notifier.notify(PlaybackField::CurrentPauseDuration);
        info!(segment = ?self.session.current_segment_index, "slide-show paused");
        Ok(self.goto(SlideShowState::Paused))
    }

    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless paused.
    pub fn resume(&mut self) -> Result<Option<StateChange>, Error> {
        if self.session.state != SlideShowState::Paused {
            return Err(self.invalid("resume"));
        }
        info!(
            paused_secs = self.session.current_pause_duration.as_secs(),
            "slide-show resumed"
        );
        Ok(self.goto(SlideShowState::Running))
    }

    /// Account for `elapsed` wall-clock time.
    ///
    /// While running this counts toward the current segment and moves on once
    /// the segment is exceeded; while paused it counts toward the pause.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] before start and after finish;
    /// nothing is changed in that case.
    pub fn tick(&mut self, elapsed: Duration) -> Result<TickOutcome, Error> {
        match self.session.state {
            SlideShowState::Running => Ok(self.tick_running(elapsed)),
            SlideShowState::Paused => {
                self.session.current_pause_duration += elapsed;
                self.session.total_pause_duration += elapsed;
                self.notifier.notify_all(&[
                    PlaybackField::CurrentPauseDuration,
                    PlaybackField::TotalPauseDuration,
                ]);
                Ok(TickOutcome::Counted)
            }
            SlideShowState::NotStarted | SlideShowState::Finished => Err(self.invalid("tick")),
        }
    }

    fn tick_running(&mut self, elapsed: Duration) -> TickOutcome {
        self.session.current_segment_elapsed_time += elapsed;
        self.notifier
            .notify(PlaybackField::CurrentSegmentElapsedTime);

        let Some((index, segment)) = self
            .session
            .current_segment_index
            .and_then(|index| self.session.segments.get(index).map(|s| (index, s)))
        else {
            return TickOutcome::Counted;
        };
        if self.session.current_segment_elapsed_time <= segment.duration() {
            return TickOutcome::Counted;
        }

        let next = index + 1;
        if next < self.session.segments.len() {
            self.go_to_segment(next);
            TickOutcome::Advanced { segment: next }
        } else {
            info!(
                paused_secs = self.session.total_pause_duration.as_secs(),
                "slide-show finished"
            );
            self.goto(SlideShowState::Finished);
            TickOutcome::Finished
        }
    }

    fn go_to_segment(&mut self, index: usize) -> Option<StateChange> {
        self.session.current_segment_index = Some(index);
        self.session.current_segment_elapsed_time = Duration::ZERO;

        let slot = match self.reused_slot(index) {
            Some(slot) if Some(slot) == self.displayed_slot => Some(slot),
            Some(slot) => self.show_slot(slot).or_else(|| self.show_next_image()),
            None => self.show_next_image(),
        };
        if let Some(slot) = slot {
            self.session.segment_image_index.insert(index, slot);
            self.notifier.notify(PlaybackField::SegmentImageIndex);
        }

        if let Some(segment) = self.session.segments.get(index) {
            info!(
                index,
                kind = %segment.kind(),
                secs = segment.duration().as_secs(),
                image = ?self.current_image_path(),
                "segment started"
            );
        }
        self.notifier.notify_all(&[
            PlaybackField::CurrentSegmentIndex,
            PlaybackField::CurrentSegmentElapsedTime,
        ]);
        self.goto(SlideShowState::Running)
    }

    /// Image slot to keep for `index`: a break that holds the image, the
    /// segment right after it, and the other parts of a split pose all show
    /// what was on screen before.
    fn reused_slot(&self, index: usize) -> Option<usize> {
        let segments = &self.session.segments;
        let segment = segments.get(index)?;
        let shown = &self.session.segment_image_index;

        if let Some(previous) = index.checked_sub(1) {
            let after_hold = segments.get(previous).is_some_and(Segment::is_holding_break);
            if segment.is_holding_break() || after_hold {
                if let Some(slot) = shown.get(&previous) {
                    return Some(*slot);
                }
            }
        }
        if segment.is_grouped() {
            return segments[..index]
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, earlier)| earlier.group_id() == segment.group_id())
                .find_map(|(i, _)| shown.get(&i).copied());
        }
        None
    }

    /// Redisplay the image at `slot` without moving the cycle.
    fn show_slot(&mut self, slot: usize) -> Option<usize> {
        self.release_image();
        let path = self
            .session
            .images_order
            .image_at(slot)
            .and_then(|index| self.session.image_paths.get(index))?;
        match self.source.decode(path) {
            Ok(image) => {
                self.current_image = Some(image);
                self.displayed_slot = Some(slot);
                self.notifier.notify(PlaybackField::CurrentImage);
                Some(slot)
            }
            Err(err) => {
                warn!(path = %path, error = %err, "could not redisplay image");
                None
            }
        }
    }

    /// Move to the next image in the cycle that decodes, trying each image at
    /// most once.
    fn show_next_image(&mut self) -> Option<usize> {
        self.release_image();
        for _ in 0..self.session.images_order.len() {
            let Some(index) = self.session.images_order.advance() else {
                break;
            };
            self.notifier.notify(PlaybackField::LastUsedImage);
            let slot = self.session.images_order.last_used();
            let Some(path) = self.session.image_paths.get(index) else {
                warn!(index, "image order points past the image list");
                continue;
            };
            match self.source.decode(path) {
                Ok(image) => {
                    debug!(path = %path, ?slot, "image selected");
                    self.current_image = Some(image);
                    self.displayed_slot = slot;
                    self.notifier.notify(PlaybackField::CurrentImage);
                    return slot;
                }
                Err(err) => warn!(path = %path, error = %err, "skipping image that failed to decode"),
            }
        }
        warn!(
            images = self.session.image_paths.len(),
            "no decodable image left, showing nothing"
        );
        None
    }

    fn release_image(&mut self) {
        if self.current_image.take().is_some() {
            self.notifier.notify(PlaybackField::CurrentImage);
        }
        self.displayed_slot = None;
    }

    fn goto(&mut self, to: SlideShowState) -> Option<StateChange> {
        if self.session.state == to {
            return None;
        }
        let change = StateChange {
            from: self.session.state,
            to,
        };
        self.session.state = to;
        self.notifier.notify(PlaybackField::State);
        Some(change)
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            state: self.session.state,
            action,
        }
    }
}
