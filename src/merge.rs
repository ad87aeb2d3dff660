//! Collapsing runs of identical segments for display and re-editing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::segment::{Segment, SegmentType};

/// A run of identical consecutive segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SegmentGroup {
    #[serde(rename = "type")]
    pub kind: SegmentType,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub count: usize,
    pub change_image_after_break: bool,
}

impl SegmentGroup {
    pub fn new(
        kind: SegmentType,
        duration: Duration,
        count: usize,
        change_image_after_break: bool,
    ) -> Self {
        Self {
            kind,
            duration,
            count,
            change_image_after_break,
        }
    }

    /// Short label such as `5 × 2'` or `1'30"`; seconds are floored to tens.
    pub fn duration_text(&self) -> String {
        let secs = self.duration.as_secs();
        let minutes = secs / 60;
        let seconds = (secs % 60) / 10 * 10;
        let mut text = String::new();
        if minutes > 0 {
            text.push_str(&format!("{minutes}'"));
        }
        if seconds > 0 {
            text.push_str(&format!("{seconds}\""));
        }
        if self.count > 1 {
            text = format!("{} × {text}", self.count);
        }
        text
    }

    fn absorbs(&self, segment: &Segment) -> bool {
        self.kind != SegmentType::Break
            && self.kind == segment.kind()
            && self.duration == segment.duration()
            && self.change_image_after_break == segment.change_image_after_break()
    }
}

/// Collapse consecutive equal segments into counted groups.
///
/// Breaks always stay separate. Group ids are dropped.
pub fn merge(segments: &[Segment]) -> Vec<SegmentGroup> {
    let mut groups: Vec<SegmentGroup> = Vec::new();
    for segment in segments {
        match groups.last_mut() {
            Some(last) if last.absorbs(segment) => last.count += 1,
            _ => groups.push(SegmentGroup::new(
                segment.kind(),
                segment.duration(),
                1,
                segment.change_image_after_break(),
            )),
        }
    }
    groups
}

/// Replay every group `count` times as ungrouped segments.
///
/// # Errors
/// Returns [`Error::SegmentTooShort`] if a group holds a duration no segment
/// may have.
pub fn expand(groups: &[SegmentGroup]) -> Result<Vec<Segment>, Error> {
    let mut segments = Vec::with_capacity(groups.iter().map(|g| g.count).sum());
    for group in groups {
        let segment = Segment::new(group.kind, group.duration)?
            .with_change_image_after_break(group.change_image_after_break);
        segments.extend(std::iter::repeat_n(segment, group.count));
    }
    Ok(segments)
}
