//! Compact text form of a segment list.
//!
//! Sections are comma separated and read `[count x] minutes[.fraction] [W|L|C|B[!]]`,
//! case-insensitively:
//!
//! - `5x2W`       five 2 minute warm-up poses
//! - `5x2.5C`     five 2:30 cool-down poses
//! - `40` / `40L` one 40 minute long pose
//! - `10B`        a 10 minute break
//! - `10B!`       a 10 minute break that keeps the current image afterwards
//! - `20,10B!,24` two long poses around a break, showing the same image

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::merge::SegmentGroup;
use crate::segment::{Segment, SegmentType};

/// Upper bound on the segments a single definition may expand to.
pub const MAX_SEGMENTS: usize = 1000;

/// Non-digit characters allowed inside a section; each at most once.
const MARKERS: [char; 7] = ['X', '.', 'W', 'L', 'C', 'B', '!'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// The section was still used after a correction.
    Warning,
    /// The section was dropped.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Diagnostic {
    pub section: String,
    /// 0-based position of the section in the definition.
    pub section_index: usize,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    fn error(section: &str, section_index: usize, message: String) -> Self {
        Self {
            section: section.to_string(),
            section_index,
            severity: Severity::Error,
            message,
        }
    }

    fn warning(section: &str, section_index: usize, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(section, section_index, message)
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} part ({}): {}",
            ordinal(self.section_index + 1),
            self.section,
            self.message
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub segments: Vec<Segment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Parse a definition, collecting a diagnostic for every broken section.
///
/// A broken section is skipped; the remaining sections are still parsed.
pub fn parse(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    if text.is_empty() {
        return outcome;
    }
    for (index, section) in text.split(',').enumerate() {
        let mut warnings = Vec::new();
        let parsed = read_section(section, &mut warnings);
        outcome.diagnostics.extend(
            warnings
                .into_iter()
                .map(|message| Diagnostic::warning(section, index, message)),
        );
        let room = MAX_SEGMENTS - outcome.segments.len();
        match parsed {
            Ok((count, _)) if count > room => outcome.diagnostics.push(Diagnostic::error(
                section,
                index,
                format!("A definition can hold at most {MAX_SEGMENTS} segments, {room} left"),
            )),
            Ok((count, segment)) => outcome
                .segments
                .extend(std::iter::repeat_n(segment, count)),
            Err(message) => outcome
                .diagnostics
                .push(Diagnostic::error(section, index, message)),
        }
    }
    outcome
}

/// Whether `text` only holds characters the grammar can use.
pub fn are_valid_chars(text: &str) -> bool {
    text.chars().all(|c| c == ',' || is_section_char(c))
}

fn is_section_char(c: char) -> bool {
    c.is_ascii_digit() || MARKERS.contains(&c.to_ascii_uppercase())
}

fn read_section(section: &str, warnings: &mut Vec<String>) -> Result<(usize, Segment), String> {
    if section.is_empty() {
        return Err("Empty section. Remove consecutive commas.".to_string());
    }

    let invalid: String = section.chars().filter(|c| !is_section_char(*c)).collect();
    if !invalid.is_empty() {
        return Err(format!(
            "Section contains invalid characters. Remove these: \"{invalid}\""
        ));
    }

    let upper = section.to_ascii_uppercase();
    let repeated = repeated_markers(&upper);
    if !repeated.is_empty() {
        return Err(format!(
            "The following characters can only appear once in each section: \"{repeated}\""
        ));
    }

    let (count, rest) = match upper.split_once('X') {
        Some((count_str, rest)) => {
            let count = count_str.parse::<u32>().map_err(|_| {
                format!("The part before the 'x' is not a valid integer: \"{count_str}\"")
            })?;
            if count < 1 {
                warnings.push(format!(
                    "The part before the 'x' must be greater than 0: \"{count_str}\""
                ));
            }
            (count.max(1) as usize, rest)
        }
        None => (1, upper.as_str()),
    };

    let split = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (minutes_str, type_str) = rest.split_at(split);
    let minutes = minutes_str.parse::<f64>().map_err(|_| {
        format!("The duration must be a valid number of minutes: \"{minutes_str}\"")
    })?;

    let (kind, change_image) = match type_str {
        "" | "L" => (SegmentType::LongPose, true),
        "W" => (SegmentType::WarmUp, true),
        "C" => (SegmentType::CoolDown, true),
        "B" => (SegmentType::Break, true),
        "B!" => (SegmentType::Break, false),
        other => {
            return Err(format!(
                "Unknown segment type: \"{other}\". Use 'W', 'L', 'C', 'B', or 'B!'."
            ));
        }
    };

    let duration = Duration::try_from_secs_f64(minutes * 60.0)
        .map_err(|_| format!("The duration is out of range: \"{minutes_str}\""))?;
    let segment = Segment::new(kind, duration)
        .map_err(|err| err.to_string())?
        .with_change_image_after_break(change_image);
    Ok((count, segment))
}

fn repeated_markers(upper: &str) -> String {
    let mut repeated = String::new();
    for marker in MARKERS {
        if upper.chars().filter(|c| *c == marker).count() > 1 {
            repeated.push(marker);
        }
    }
    repeated
}

/// `1st`, `2nd`, `3rd`, `4th`, ..., `11th`, `12th`, `13th`, ..., `21st`.
pub fn ordinal(n: usize) -> String {
    if n == 0 {
        return n.to_string();
    }
    let suffix = match n % 100 {
        11..=13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{n}{suffix}")
}

/// Canonical definition text for a list of merged groups.
///
/// Durations are written in minutes with at most one decimal, so anything
/// finer than six seconds is lost.
pub fn format_definition(groups: &[SegmentGroup]) -> String {
    groups
        .iter()
        .map(format_group)
        .collect::<Vec<_>>()
        .join(",")
}

fn format_group(group: &SegmentGroup) -> String {
    let count = if group.count > 1 {
        format!("{}x", group.count)
    } else {
        String::new()
    };
    let suffix = match group.kind {
        SegmentType::WarmUp => "W",
        SegmentType::LongPose => "",
        SegmentType::CoolDown => "C",
        SegmentType::Break if group.change_image_after_break => "B",
        SegmentType::Break => "B!",
    };
    format!("{count}{}{suffix}", format_minutes(group.duration))
}

fn format_minutes(duration: Duration) -> String {
    // tenths of a minute are six second steps
    let tenths = (duration.as_secs_f64() / 6.0).round() as u64;
    if tenths % 10 == 0 {
        format!("{}", tenths / 10)
    } else {
        format!("{}.{}", tenths / 10, tenths % 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    #[test]
    fn repeat_count_with_type() {
        let out = parse("5x2W");
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.segments.len(), 5);
        assert!(out
            .segments
            .iter()
            .all(|s| s.kind() == SegmentType::WarmUp && s.duration() == minutes(2)));
    }

    #[test]
    fn bare_number_is_long_pose() {
        let out = parse("40");
        assert_eq!(out.segments, vec![Segment::minutes(SegmentType::LongPose, 40).unwrap()]);
    }

    #[test]
    fn fraction_and_lowercase() {
        let out = parse("3x2.5c");
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.segments.len(), 3);
        assert_eq!(out.segments[0].kind(), SegmentType::CoolDown);
        assert_eq!(out.segments[0].duration(), Duration::from_secs(150));
    }

    #[test]
    fn holding_break() {
        let out = parse("10B!");
        assert_eq!(out.segments.len(), 1);
        let s = &out.segments[0];
        assert_eq!(s.kind(), SegmentType::Break);
        assert_eq!(s.duration(), minutes(10));
        assert!(!s.change_image_after_break());

        let out = parse("10b");
        assert!(out.segments[0].change_image_after_break());
    }

    #[test]
    fn poses_around_holding_break() {
        let out = parse("20,10B!,24");
        assert!(out.diagnostics.is_empty());
        let kinds: Vec<_> = out.segments.iter().map(Segment::kind).collect();
        assert_eq!(
            kinds,
            vec![SegmentType::LongPose, SegmentType::Break, SegmentType::LongPose]
        );
        assert_eq!(out.segments[2].duration(), minutes(24));
        assert!(out.segments[1].is_holding_break());
    }

    #[test]
    fn broken_section_does_not_stop_parsing() {
        let out = parse("5x,10W");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].section_index, 0);
        assert_eq!(out.diagnostics[0].section, "5x");
        assert!(out.diagnostics[0].to_string().starts_with("1st part (5x): "));
        assert_eq!(out.segments, vec![Segment::minutes(SegmentType::WarmUp, 10).unwrap()]);
    }

    #[test]
    fn empty_sections_are_reported() {
        let out = parse("10,,5W,");
        let indices: Vec<_> = out.diagnostics.iter().map(|d| d.section_index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(out.diagnostics[0].message.contains("consecutive commas"));
        assert_eq!(out.segments.len(), 2);
    }

    #[test]
    fn invalid_and_repeated_characters_are_distinct_errors() {
        let out = parse("5y,2WW,1x2xW");
        assert_eq!(out.diagnostics.len(), 3);
        assert!(out.diagnostics[0].message.contains("invalid characters"));
        assert!(out.diagnostics[0].message.contains("\"y\""));
        assert!(out.diagnostics[1].message.contains("only appear once"));
        assert!(out.diagnostics[1].message.contains("\"W\""));
        assert!(out.diagnostics[2].message.contains("\"X\""));
        assert!(out.segments.is_empty());
    }

    #[test]
    fn zero_count_is_clamped_with_warning() {
        let out = parse("0x5");
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].severity, Severity::Warning);
        assert!(!out.has_errors());
    }

    #[test]
    fn oversized_counts_are_diagnosed() {
        let out = parse("9223372036854775807x1,5W");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].section_index, 0);
        assert!(out.diagnostics[0].message.contains("not a valid integer"));
        assert_eq!(out.segments.len(), 1);

        let out = parse("3000000000x5");
        assert!(out.has_errors());
        assert!(out.segments.is_empty());
    }

    #[test]
    fn expansion_is_capped() {
        let out = parse(&format!("{MAX_SEGMENTS}x1"));
        assert!(!out.has_errors());
        assert_eq!(out.segments.len(), MAX_SEGMENTS);

        let out = parse("600x1,600x1,1");
        assert_eq!(out.segments.len(), 601);
        let indices: Vec<_> = out.diagnostics.iter().map(|d| d.section_index).collect();
        assert_eq!(indices, vec![1]);
        assert!(out.diagnostics[0].message.contains("at most"));
    }

    #[test]
    fn unknown_type_suffix() {
        let out = parse("5W!");
        assert!(out.has_errors());
        assert!(out.diagnostics[0].message.starts_with("Unknown segment type: \"W!\""));
        let out = parse("5.");
        assert!(!out.has_errors());
        let out = parse(".");
        assert!(out.has_errors());
    }

    #[test]
    fn too_short_duration_is_reported() {
        let out = parse("0.1");
        assert!(out.has_errors());
        assert!(out.segments.is_empty());
    }

    #[test]
    fn ordinals() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (101, "101st"),
            (111, "111th"),
            (112, "112th"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected);
        }
    }

    #[test]
    fn char_prefilter() {
        assert!(are_valid_chars("5x2w,10B!,40"));
        assert!(!are_valid_chars("5 x 2"));
    }

    #[test]
    fn formats_groups() {
        let groups = vec![
            SegmentGroup::new(SegmentType::WarmUp, minutes(2), 5, true),
            SegmentGroup::new(SegmentType::LongPose, minutes(20), 1, true),
            SegmentGroup::new(SegmentType::Break, minutes(10), 1, false),
            SegmentGroup::new(SegmentType::CoolDown, Duration::from_secs(150), 2, true),
            SegmentGroup::new(SegmentType::Break, Duration::from_secs(61), 1, true),
        ];
        assert_eq!(format_definition(&groups), "5x2W,20,10B!,2x2.5C,1B");
    }
}
