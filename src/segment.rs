//! Timed segments: the building blocks of a drawing session.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Segments shorter than this cannot be created.
pub const MIN_SEGMENT_DURATION: Duration = Duration::from_secs(10);

/// Group id carried by segments that were never split around a break.
pub const UNGROUPED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentType {
    WarmUp,
    LongPose,
    CoolDown,
    Break,
}

impl SegmentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::WarmUp => "warm-up",
            Self::LongPose => "long-pose",
            Self::CoolDown => "cool-down",
            Self::Break => "break",
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed block of a session.
///
/// Durations are kept at whole-second precision and never drop below
/// [`MIN_SEGMENT_DURATION`]; deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SegmentRecord", into = "SegmentRecord")]
pub struct Segment {
    kind: SegmentType,
    duration: Duration,
    group_id: i32,
    change_image_after_break: bool,
}

impl Segment {
    /// Create an ungrouped segment.
    ///
    /// # Errors
    /// Returns [`Error::SegmentTooShort`] if `duration`, rounded to whole
    /// seconds, is below [`MIN_SEGMENT_DURATION`].
    pub fn new(kind: SegmentType, duration: Duration) -> Result<Self, Error> {
        let duration = round_to_seconds(duration);
        if duration < MIN_SEGMENT_DURATION {
            return Err(Error::SegmentTooShort {
                duration,
                minimum: MIN_SEGMENT_DURATION,
            });
        }
        Ok(Self {
            kind,
            duration,
            group_id: UNGROUPED,
            change_image_after_break: true,
        })
    }

    pub fn minutes(kind: SegmentType, minutes: u64) -> Result<Self, Error> {
        Self::new(kind, Duration::from_secs(minutes * 60))
    }

    #[must_use]
    pub fn with_group(mut self, group_id: i32) -> Self {
        self.group_id = group_id;
        self
    }

    #[must_use]
    pub fn with_change_image_after_break(mut self, change: bool) -> Self {
        self.change_image_after_break = change;
        self
    }

    pub fn kind(&self) -> SegmentType {
        self.kind
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn group_id(&self) -> i32 {
        self.group_id
    }

    pub fn is_grouped(&self) -> bool {
        self.group_id != UNGROUPED
    }

    /// Only meaningful for breaks: `false` keeps the pre-break image on screen.
    pub fn change_image_after_break(&self) -> bool {
        self.change_image_after_break
    }

    pub fn is_break(&self) -> bool {
        self.kind == SegmentType::Break
    }

    /// A break after which the previous image stays on screen.
    pub fn is_holding_break(&self) -> bool {
        self.is_break() && !self.change_image_after_break
    }
}

fn round_to_seconds(duration: Duration) -> Duration {
    let secs = duration.as_secs() + u64::from(duration.subsec_millis() >= 500);
    Duration::from_secs(secs)
}

/// Start offset of every segment: a running sum of the preceding durations.
pub fn start_times(segments: &[Segment]) -> Vec<Duration> {
    let mut sum = Duration::ZERO;
    segments
        .iter()
        .map(|segment| {
            let start = sum;
            sum += segment.duration;
            start
        })
        .collect()
}

pub fn total_duration(segments: &[Segment]) -> Duration {
    segments.iter().map(Segment::duration).sum()
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SegmentRecord {
    #[serde(rename = "type")]
    kind: SegmentType,
    #[serde(with = "humantime_serde")]
    duration: Duration,
    #[serde(default = "SegmentRecord::default_group_id")]
    group_id: i32,
    #[serde(default = "SegmentRecord::default_change_image")]
    change_image_after_break: bool,
}

impl SegmentRecord {
    const fn default_group_id() -> i32 {
        UNGROUPED
    }

    const fn default_change_image() -> bool {
        true
    }
}

impl TryFrom<SegmentRecord> for Segment {
    type Error = Error;

    fn try_from(record: SegmentRecord) -> Result<Self, Self::Error> {
        Ok(Segment::new(record.kind, record.duration)?
            .with_group(record.group_id)
            .with_change_image_after_break(record.change_image_after_break))
    }
}

impl From<Segment> for SegmentRecord {
    fn from(segment: Segment) -> Self {
        Self {
            kind: segment.kind,
            duration: segment.duration,
            group_id: segment.group_id,
            change_image_after_break: segment.change_image_after_break,
        }
    }
}
