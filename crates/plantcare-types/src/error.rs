//! Error types for payload parsing in plantcare-types.

use thiserror::Error;

/// Errors that can occur when decoding payloads returned by the devices.
///
/// This error type is transport-agnostic; network failures belong in
/// plantcare-core.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    /// The body was empty after trimming whitespace.
    #[error("empty response body")]
    Empty,

    /// A numeric field could not be parsed.
    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber {
        field: &'static str,
        value: String,
    },

    /// The body did not have the expected shape.
    #[error("unexpected format: expected {expected}, got {value:?}")]
    UnexpectedFormat {
        expected: &'static str,
        value: String,
    },

    /// A field held a value outside its allowed set.
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue {
        field: &'static str,
        value: String,
    },

    /// The JSON payload could not be decoded.
    #[error("invalid JSON: {0}")]
    Json(String),
}

/// Result type alias using plantcare-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
