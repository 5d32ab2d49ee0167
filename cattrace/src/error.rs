use chrome_trace_format::Phase;
use thiserror::Error;

/// Why a single source event produced no packets.
///
/// None of these abort a run: the event is reported and conversion continues
/// with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("{phase} event is missing required field `{field}`")]
    MissingField { phase: Phase, field: &'static str },

    #[error("timestamp {timestamp} precedes trace origin {origin}")]
    BeforeOrigin { timestamp: i64, origin: i64 },

    #[error("negative duration {0}")]
    NegativeDuration(i64),

    #[error("end of slice overflows: start {start} + duration {duration}")]
    EndOverflow { start: i64, duration: i64 },

    #[error("unsupported phase `{0}`")]
    UnknownPhase(String),

    #[error("unsupported metadata `{0}`")]
    UnknownMetadata(String),
}

impl ConvertError {
    /// Unknown phases and metadata kinds are expected in real logs and only
    /// worth a debug line; everything else means a damaged record.
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            ConvertError::UnknownPhase(_) | ConvertError::UnknownMetadata(_)
        )
    }
}

/// The output written for a run does not read back as the packets it was
/// produced from. Indicates a codec bug, never bad input.
#[derive(Error, Debug)]
#[error("trace self-check failed for {path}: {reason}")]
pub struct InvariantViolation {
    pub path: String,
    pub reason: String,
}
