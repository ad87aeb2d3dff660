//! Turns session properties into a concrete, ordered list of segments.

use std::cmp::Ordering;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Error;
use crate::parser::{self, Severity};
use crate::properties::{DesignType, SessionProperties};
use crate::segment::{self, MIN_SEGMENT_DURATION, Segment, SegmentType};

/// Long poses above this many minutes are rounded to a multiple of
/// [`ROUNDING_STEP_MINUTES`].
const LONG_POSE_ROUNDING_THRESHOLD_MINUTES: u64 = 20;
const ROUNDING_STEP_MINUTES: f64 = 5.0;

/// Segments for either design type: the automatic layout, or the parsed
/// manual definition.
///
/// # Errors
/// Everything [`design`] rejects, [`Error::Definition`] when the manual text
/// holds a broken section and [`Error::EmptySchedule`] when it holds nothing.
pub fn session_segments(props: &SessionProperties) -> Result<Vec<Segment>, Error> {
    match props.design_type {
        DesignType::Automatic => design(props),
        DesignType::Manual => {
            let outcome = parser::parse(&props.manual_segments_definition);
            if outcome.has_errors() {
                return Err(Error::Definition(outcome.diagnostics));
            }
            for diagnostic in outcome
                .diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Warning)
            {
                warn!(%diagnostic, "manual definition corrected");
            }
            if outcome.segments.is_empty() {
                return Err(Error::EmptySchedule);
            }
            Ok(outcome.segments)
        }
    }
}

/// Lay out warm-up, long pose and cool-down segments, then place the breaks.
///
/// Deterministic: identical properties always give identical schedules.
///
/// # Errors
/// [`Error::ManualSession`] for manual properties, [`Error::InvalidProperties`]
/// for out-of-range fields and [`Error::Layout`] when the requested parts do
/// not fit into the session.
pub fn design(props: &SessionProperties) -> Result<Vec<Segment>, Error> {
    if props.design_type == DesignType::Manual {
        return Err(Error::ManualSession);
    }
    props.validate()?;
    let props = fill_simplified(props)?;
    props.validate()?;

    let breaks_total = if props.add_breaks {
        times(props.breaks_duration, props.number_of_breaks)?
    } else {
        Duration::ZERO
    };
    let non_break = props
        .session_duration
        .checked_sub(breaks_total)
        .ok_or_else(|| Error::Layout("breaks take longer than the session".to_string()))?;

    let warm_up_target = if props.add_warm_up {
        share_in_minutes(props.warm_up_percent, non_break)
    } else {
        Duration::ZERO
    };
    let cool_down_target = if props.add_cool_down {
        share_in_minutes(props.cool_down_percent, non_break)
    } else {
        Duration::ZERO
    };

    let mut warm_up = if warm_up_target.is_zero() {
        Vec::new()
    } else {
        split_by_duration(
            warm_up_target,
            &props.available_warm_up_durations,
            SegmentType::WarmUp,
        )?
    };
    let mut cool_down = if cool_down_target.is_zero() {
        Vec::new()
    } else {
        split_by_duration(
            cool_down_target,
            &props.available_cool_down_durations,
            SegmentType::CoolDown,
        )?
    };

    let long_pose_total = non_break
        .checked_sub(segment::total_duration(&warm_up))
        .and_then(|rest| rest.checked_sub(segment::total_duration(&cool_down)))
        .ok_or_else(|| {
            Error::Layout("warm-up and cool-down leave no time for long poses".to_string())
        })?;
    let long_poses = split_by_count(
        long_pose_total,
        props.number_of_long_poses,
        SegmentType::LongPose,
    )?;

    warm_up.sort_by_key(Segment::duration);
    cool_down.sort_by(|a, b| b.duration().cmp(&a.duration()));

    let mut segments = warm_up;
    segments.extend(long_poses);
    segments.extend(cool_down);

    if !breaks_total.is_zero() {
        add_breaks(&props, &mut segments)?;
    }

    debug!(
        segments = segments.len(),
        total_secs = segment::total_duration(&segments).as_secs(),
        "designed session"
    );
    Ok(segments)
}

/// Derive the full property set from the few fields a simplified session sets.
///
/// Returns the properties unchanged when they are not simplified.
///
/// # Errors
/// [`Error::ManualSession`] for manual properties and [`Error::Layout`] when
/// the derived breaks leave no drawing time.
pub fn fill_simplified(props: &SessionProperties) -> Result<SessionProperties, Error> {
    if !props.is_simplified {
        return Ok(props.clone());
    }
    if props.design_type != DesignType::Automatic {
        return Err(Error::ManualSession);
    }

    let session_minutes = props.session_duration.as_secs_f64() / 60.0;
    let mut breaks_duration = minutes(10);
    let (warm_up, cool_down, steps) = if session_minutes < 60.0 {
        (minutes(10), minutes(5), vec![minutes(1), minutes(2)])
    } else if session_minutes < 120.0 {
        (minutes(30), minutes(15), vec![minutes(1), minutes(2), minutes(5)])
    } else {
        if session_minutes > 180.0 {
            breaks_duration = minutes(15);
        }
        (minutes(45), minutes(20), vec![minutes(1), minutes(5), minutes(10)])
    };

    // One break every hour and a half, never fewer than one.
    let number_of_breaks = ((session_minutes / 90.0).round_ties_even() - 1.0).max(1.0) as usize;

    let breaks_total = if props.add_breaks {
        times(breaks_duration, number_of_breaks)?
    } else {
        Duration::ZERO
    };
    let non_break = props
        .session_duration
        .checked_sub(breaks_total)
        .filter(|d| !d.is_zero())
        .ok_or_else(|| Error::Layout("breaks take up the whole session".to_string()))?;

    Ok(SessionProperties {
        design_type: DesignType::Automatic,
        session_duration: props.session_duration,
        add_warm_up: props.add_warm_up,
        available_warm_up_durations: steps.clone(),
        warm_up_percent: percent_of(warm_up, non_break),
        add_cool_down: props.add_cool_down,
        available_cool_down_durations: steps,
        cool_down_percent: percent_of(cool_down, non_break),
        number_of_long_poses: props.number_of_long_poses,
        add_breaks: props.add_breaks,
        breaks_duration,
        number_of_breaks,
        max_break_shift: props.max_break_shift,
        is_simplified: false,
        manual_segments_definition: props.manual_segments_definition.clone(),
    })
}

/// Fill `total` with segments whose lengths come from `available`.
///
/// Larger candidates take about half of what is left, the smallest takes the
/// rest. The result may fall short of `total` by less than the smallest
/// candidate that fits.
///
/// # Errors
/// [`Error::InvalidProperties`] when a candidate is shorter than the minimum
/// segment length.
pub fn split_by_duration(
    total: Duration,
    available: &[Duration],
    kind: SegmentType,
) -> Result<Vec<Segment>, Error> {
    if let Some(short) = available.iter().find(|d| **d < MIN_SEGMENT_DURATION) {
        return Err(Error::InvalidProperties(format!(
            "{kind} durations must be at least {MIN_SEGMENT_DURATION:?}, got {short:?}"
        )));
    }
    let mut candidates: Vec<Duration> = available.iter().copied().filter(|d| *d <= total).collect();
    candidates.sort_by(|a, b| b.cmp(a));
    let Some(&smallest) = candidates.last() else {
        return Ok(Vec::new());
    };

    let mut remaining = total;
    let mut segments = Vec::new();
    for candidate in candidates {
        if remaining < smallest {
            break;
        }
        let target = if candidate == smallest {
            remaining
        } else {
            remaining / 2
        };
        let mut count = u32::try_from(target.as_nanos().div_ceil(candidate.as_nanos()))
            .unwrap_or(u32::MAX);
        if candidate * count > remaining {
            count -= 1;
        }
        if count > 0 {
            debug!(%kind, count, secs = candidate.as_secs(), "duration tier");
            let segment = Segment::new(kind, candidate)?;
            segments.extend(std::iter::repeat_n(segment, count as usize));
            remaining -= candidate * count;
        }
    }
    Ok(segments)
}

/// Split `total` into `count` segments, the last one absorbing the remainder.
///
/// Never creates segments shorter than a minute, so `count` is capped by the
/// whole minutes in `total`. Segments longer than twenty minutes are rounded
/// to five.
///
/// # Errors
/// [`Error::Layout`] when `total` holds less than a minute or the rounded
/// segments overrun it.
pub fn split_by_count(
    total: Duration,
    count: usize,
    kind: SegmentType,
) -> Result<Vec<Segment>, Error> {
    let whole_minutes = usize::try_from(total.as_secs() / 60).unwrap_or(usize::MAX);
    let count = count.min(whole_minutes);
    if count == 0 {
        return Err(Error::Layout(format!(
            "{} left for {kind} segments, need at least a minute",
            humantime::format_duration(total)
        )));
    }

    let mut base_minutes = u64::try_from(total.as_millis() / count as u128 / 60_000).unwrap_or(u64::MAX);
    if base_minutes > LONG_POSE_ROUNDING_THRESHOLD_MINUTES {
        base_minutes =
            ((base_minutes as f64 / ROUNDING_STEP_MINUTES).round() * ROUNDING_STEP_MINUTES) as u64;
    }
    let base = minutes(base_minutes);
    let last = total
        .checked_sub(times(base, count - 1)?)
        .ok_or_else(|| {
            Error::Layout(format!(
                "{count} {kind} segments of {base_minutes} minutes overrun {}",
                humantime::format_duration(total)
            ))
        })?;

    let mut segments = Vec::with_capacity(count);
    segments.extend(std::iter::repeat_n(Segment::new(kind, base)?, count - 1));
    segments.push(Segment::new(kind, last)?);
    Ok(segments)
}

/// Spread the breaks evenly over the session, snapping each to a nearby
/// segment boundary or splitting the segment it falls into.
fn add_breaks(props: &SessionProperties, segments: &mut Vec<Segment>) -> Result<(), Error> {
    let slots = u32::try_from(props.number_of_breaks + 1)
        .map_err(|_| Error::InvalidProperties("too many breaks".to_string()))?;
    let interval = props.session_duration / slots;
    for i in 1..slots {
        add_break(props, segments, interval * i)?;
    }
    Ok(())
}

fn add_break(
    props: &SessionProperties,
    segments: &mut Vec<Segment>,
    at: Duration,
) -> Result<(), Error> {
    let starts = segment::start_times(segments);
    let Some((best_index, best_offset)) = starts
        .iter()
        .map(|start| signed_offset(*start, at))
        .enumerate()
        .min_by(|(_, a), (_, b)| closest_then_latest(*a, *b))
    else {
        return Err(Error::EmptySchedule);
    };

    let brk = Segment::new(SegmentType::Break, props.breaks_duration)?;
    if best_offset.unsigned_abs() <= props.max_break_shift.as_nanos() {
        debug!(
            target_secs = at.as_secs(),
            index = best_index,
            "break snapped to segment boundary"
        );
        segments.insert(best_index, brk);
        return Ok(());
    }

    let index = starts
        .iter()
        .filter(|start| **start < at)
        .count()
        .saturating_sub(1);
    let Some((first, second)) = split_point(&segments[index], at.saturating_sub(starts[index]))
    else {
        debug!(
            target_secs = at.as_secs(),
            index = best_index,
            "segment too short to split; break snapped to nearest boundary"
        );
        segments.insert(best_index, brk);
        return Ok(());
    };

    let group_id = if segments[index].is_grouped() {
        segments[index].group_id()
    } else {
        next_group_id(segments)
    };
    let pose = segments.remove(index);
    let parts = [
        Segment::new(pose.kind(), first)?.with_group(group_id),
        brk.with_change_image_after_break(false),
        Segment::new(pose.kind(), second)?.with_group(group_id),
    ];
    debug!(
        target_secs = at.as_secs(),
        index,
        first_secs = first.as_secs(),
        second_secs = second.as_secs(),
        "break splits segment"
    );
    segments.splice(index..index, parts);
    Ok(())
}

/// Lengths of the two parts of `pose` around a break placed roughly `offset`
/// into it, or `None` when either part would be too short.
///
/// The first part is a multiple of five minutes, rounded up when that makes
/// the two parts closer in length.
fn split_point(pose: &Segment, offset: Duration) -> Option<(Duration, Duration)> {
    let step = ROUNDING_STEP_MINUTES;
    let pose_minutes = pose.duration().as_secs_f64() / 60.0;
    let mut first_minutes = (offset.as_secs_f64() / 60.0 / step).floor() * step;
    if first_minutes < pose_minutes - first_minutes - step {
        first_minutes += step;
    }
    let first = minutes(first_minutes as u64);
    let second = pose.duration().checked_sub(first)?;
    (first >= MIN_SEGMENT_DURATION && second >= MIN_SEGMENT_DURATION).then_some((first, second))
}

fn next_group_id(segments: &[Segment]) -> i32 {
    segments
        .iter()
        .map(Segment::group_id)
        .max()
        .unwrap_or(0)
        .max(0)
        + 1
}

fn signed_offset(start: Duration, at: Duration) -> i128 {
    start.as_nanos() as i128 - at.as_nanos() as i128
}

/// Smallest distance first; on a tie the later boundary wins.
fn closest_then_latest(a: i128, b: i128) -> Ordering {
    a.unsigned_abs()
        .cmp(&b.unsigned_abs())
        .then_with(|| b.cmp(&a))
}

fn share_in_minutes(percent: f64, of: Duration) -> Duration {
    let share = (percent * of.as_secs_f64() / 60.0 / 100.0).round_ties_even();
    minutes(share.max(0.0) as u64)
}

fn percent_of(part: Duration, whole: Duration) -> f64 {
    100.0 * part.as_secs_f64() / whole.as_secs_f64()
}

fn times(duration: Duration, n: usize) -> Result<Duration, Error> {
    u32::try_from(n)
        .ok()
        .and_then(|n| duration.checked_mul(n))
        .ok_or_else(|| Error::Layout(format!("{n} × {duration:?} overflows")))
}

const fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}
