// Pattern validation errors

use crate::error::ErrorCode;
use std::fmt;

/// Pattern error code constants
///
/// Error code range: 1201-1207
pub struct PatternErrorCodes {}

impl PatternErrorCodes {
    pub const EMPTY_VOICES: i32 = 1201;
    pub const ROW_COUNT_MISMATCH: i32 = 1202;
    pub const COLUMN_COUNT_MISMATCH: i32 = 1203;
    pub const LOOP_RANGE_OUT_OF_BOUNDS: i32 = 1204;
    pub const INVALID_TIME_SIGNATURE: i32 = 1205;
    pub const INVALID_DIMENSIONS: i32 = 1206;
    pub const PARSE_FAILED: i32 = 1207;
}

/// Errors raised when a stored pattern violates the grid invariants.
///
/// Patterns are rejected before playback starts, so the scheduler never
/// has to re-check grid shape while running.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternError {
    /// Pattern declares no drum voices
    EmptyVoices,

    /// Grid row count differs from the voice list length
    RowCountMismatch { rows: usize, voices: usize },

    /// A grid row does not have bars × beats_per_bar × subdivisions columns
    ColumnCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Loop range is reversed or reaches past the last step
    LoopRangeOutOfBounds {
        start: usize,
        end: usize,
        steps: usize,
    },

    /// Time signature has zero beats or a zero beat unit
    InvalidTimeSignature { beats_per_bar: u32, beat_unit: u32 },

    /// Bar count or subdivision count is zero
    InvalidDimensions { bars: u32, subdivisions: u32 },

    /// Pattern JSON could not be read or parsed
    ParseFailed { reason: String },
}

impl ErrorCode for PatternError {
    fn code(&self) -> i32 {
        match self {
            PatternError::EmptyVoices => PatternErrorCodes::EMPTY_VOICES,
            PatternError::RowCountMismatch { .. } => PatternErrorCodes::ROW_COUNT_MISMATCH,
            PatternError::ColumnCountMismatch { .. } => PatternErrorCodes::COLUMN_COUNT_MISMATCH,
            PatternError::LoopRangeOutOfBounds { .. } => {
                PatternErrorCodes::LOOP_RANGE_OUT_OF_BOUNDS
            }
            PatternError::InvalidTimeSignature { .. } => PatternErrorCodes::INVALID_TIME_SIGNATURE,
            PatternError::InvalidDimensions { .. } => PatternErrorCodes::INVALID_DIMENSIONS,
            PatternError::ParseFailed { .. } => PatternErrorCodes::PARSE_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            PatternError::EmptyVoices => "Pattern has no drum voices".to_string(),
            PatternError::RowCountMismatch { rows, voices } => {
                format!("Grid has {} rows but pattern lists {} voices", rows, voices)
            }
            PatternError::ColumnCountMismatch {
                row,
                expected,
                actual,
            } => format!(
                "Grid row {} has {} steps, expected {}",
                row, actual, expected
            ),
            PatternError::LoopRangeOutOfBounds { start, end, steps } => format!(
                "Loop range {}..={} is outside the {} available steps",
                start, end, steps
            ),
            PatternError::InvalidTimeSignature {
                beats_per_bar,
                beat_unit,
            } => format!("Invalid time signature {}/{}", beats_per_bar, beat_unit),
            PatternError::InvalidDimensions { bars, subdivisions } => format!(
                "Pattern needs at least one bar and one subdivision (bars={}, subdivisions={})",
                bars, subdivisions
            ),
            PatternError::ParseFailed { reason } => format!("Failed to parse pattern: {}", reason),
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatternError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for PatternError {}

impl From<serde_json::Error> for PatternError {
    fn from(err: serde_json::Error) -> Self {
        PatternError::ParseFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PatternError {
    fn from(err: std::io::Error) -> Self {
        PatternError::ParseFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_codes_are_distinct() {
        let errors = [
            PatternError::EmptyVoices,
            PatternError::RowCountMismatch { rows: 1, voices: 2 },
            PatternError::ColumnCountMismatch {
                row: 0,
                expected: 16,
                actual: 8,
            },
            PatternError::LoopRangeOutOfBounds {
                start: 4,
                end: 20,
                steps: 16,
            },
            PatternError::InvalidTimeSignature {
                beats_per_bar: 0,
                beat_unit: 4,
            },
            PatternError::InvalidDimensions {
                bars: 0,
                subdivisions: 4,
            },
            PatternError::ParseFailed {
                reason: "eof".to_string(),
            },
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_loop_range_message() {
        let err = PatternError::LoopRangeOutOfBounds {
            start: 4,
            end: 20,
            steps: 16,
        };
        assert_eq!(
            err.message(),
            "Loop range 4..=20 is outside the 16 available steps"
        );
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PatternError = json_err.into();
        assert_eq!(err.code(), PatternErrorCodes::PARSE_FAILED);
    }
}
