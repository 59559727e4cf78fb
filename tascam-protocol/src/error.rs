use thiserror::Error;

/// Rejection of a command argument before anything is queued
///
/// Mirrors the parameter checks done at the API boundary: a command that
/// fails validation never reaches the dispatch queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Parameter '{parameter}' value '{value}' is out of range ({min}..={max})")]
    RangeError {
        parameter: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Parameter '{parameter}' value '{value}' is invalid: {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },
}

impl ValidationError {
    pub fn range_error(
        parameter: &str,
        min: impl std::fmt::Display,
        max: impl std::fmt::Display,
        value: impl std::fmt::Display,
    ) -> Self {
        Self::RangeError {
            parameter: parameter.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn invalid_value(
        parameter: &str,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure to turn a received frame into a typed response
///
/// Parse errors are never surfaced to callers. The reader logs them and drops
/// the frame; the next poll cycle re-queries the same state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Payload shorter than the response code requires
    #[error("Response {code} payload too short: expected at least {expected} chars, got {actual}")]
    TooShort {
        code: String,
        expected: usize,
        actual: usize,
    },

    /// A field that must be decimal digits contained something else
    #[error("Response {code} field '{field}' is not decimal: '{value}'")]
    InvalidDigits {
        code: String,
        field: &'static str,
        value: String,
    },

    /// A sense byte that is not two hex characters
    #[error("Response {code} sense byte is not hex: '{value}'")]
    InvalidHex { code: String, value: String },

    #[error("Response {code} payload contains non-ASCII bytes")]
    NonAscii { code: String },
}

/// Umbrella error for protocol-level operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_display() {
        let error = ValidationError::range_error("track", 1, 999, 1000);
        assert_eq!(
            error.to_string(),
            "Parameter 'track' value '1000' is out of range (1..=999)"
        );
    }

    #[test]
    fn test_parse_error_converts_to_protocol_error() {
        let error: ProtocolError = ParseError::TooShort {
            code: "D5".to_string(),
            expected: 4,
            actual: 2,
        }
        .into();
        assert!(matches!(error, ProtocolError::Parse(_)));
        assert!(error.to_string().contains("D5"));
    }
}
