//! Error types for combat log parsing

use thiserror::Error;

/// A line that violates the mandatory grammar. The pipeline drops such lines
/// and counts them; the trailing grammar never produces this (unrecognized
/// trailing shapes degrade to `TrailingKind::Unknown` instead).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing or unbalanced {0} bracket")]
    MissingSegment(&'static str),

    #[error("invalid timestamp segment: {0:?}")]
    InvalidTimestamp(String),

    #[error("invalid entity segment: {0:?}")]
    InvalidEntity(String),

    #[error("invalid event segment: {0:?}")]
    InvalidEvent(String),

    #[error("invalid number in {0}")]
    InvalidNumber(&'static str),

    #[error("invalid event json: {0}")]
    Json(String),
}
