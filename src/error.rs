use std::time::Duration;

use thiserror::Error;

use crate::parser::Diagnostic;
use crate::playback::SlideShowState;

/// Library error type for scheduling and playback operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A segment was created shorter than the allowed minimum.
    #[error("segment must be at least {minimum:?} long, got {duration:?}")]
    SegmentTooShort { duration: Duration, minimum: Duration },

    /// Session properties are inconsistent or out of range.
    #[error("invalid session properties: {0}")]
    InvalidProperties(String),

    /// A manually declared session was handed to the automatic designer.
    #[error("this is a manually declared session")]
    ManualSession,

    /// The manual segment definition could not be parsed cleanly.
    #[error("invalid segment definition: {}", join_diagnostics(.0))]
    Definition(Vec<Diagnostic>),

    /// The requested segments cannot be laid out inside the session.
    #[error("cannot lay out schedule: {0}")]
    Layout(String),

    /// Playback needs at least one segment.
    #[error("schedule contains no segments")]
    EmptySchedule,

    /// A playback operation was attempted in a state that does not allow it.
    #[error("cannot {action} while slide-show is {state}")]
    InvalidTransition {
        state: SlideShowState,
        action: &'static str,
    },

    /// One or more configured image folders are invalid or unreadable.
    #[error("invalid image folder: {0}")]
    BadDir(String),

    /// The scan completed but found no images.
    #[error("no images found in configured folders")]
    EmptyScan,
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
