//! Error types for plantcare-core.
//!
//! Every error here is recoverable from the dashboard's point of view: the
//! refresh cycle turns them into [`Notice`](crate::refresh::Notice)s and keeps
//! going on the next tick.
//!
//! | Error | Raised when | Surfaced as |
//! |-------|-------------|-------------|
//! | [`Error::DeviceUnreachable`] | network error, timeout, non-2xx status | warning |
//! | [`Error::MalformedResponse`] | body cannot be decoded | error |
//! | [`Error::ModelLoad`] | classifier assets missing or corrupt | classifier disabled |
//! | [`Error::Classification`] | inference failed for one frame | error |
//! | [`Error::ManualModeRequired`] | actuator command while in auto mode | rejected request |

use core::fmt;

use thiserror::Error;

/// Errors that can occur when talking to the plant devices or the classifier.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The device could not be reached or answered with an error status.
    #[error("Device unreachable at {url}: {reason}")]
    DeviceUnreachable {
        /// The full request URL.
        url: String,
        /// Why the request failed.
        reason: UnreachableReason,
    },

    /// The device answered but the body could not be decoded.
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        /// Endpoint path, e.g. `/dht`.
        endpoint: String,
        /// Decoding failure.
        reason: String,
    },

    /// Classifier assets could not be loaded.
    #[error("Failed to load classifier: {0}")]
    ModelLoad(String),

    /// Inference on a single frame failed.
    #[error("Classification failed: {0}")]
    Classification(String),

    /// The device base URL is not usable.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A camera operation was requested but no camera is configured.
    #[error("No camera configured")]
    CameraNotConfigured,

    /// Actuator commands are only accepted in manual mode.
    #[error("Switch to Manual mode to control the {0}")]
    ManualModeRequired(&'static str),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Build a [`Error::MalformedResponse`] from any displayable decoding error.
    pub fn malformed(endpoint: &str, reason: impl fmt::Display) -> Self {
        Error::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from the network rather than the payload.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Error::DeviceUnreachable { .. })
    }
}

/// Structured reasons for unreachable devices.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UnreachableReason {
    /// The request did not complete within its timeout.
    Timeout,
    /// The TCP connection could not be established.
    Connect(String),
    /// The device answered with a non-success HTTP status.
    Status(u16),
    /// Any other transport failure.
    Other(String),
}

impl fmt::Display for UnreachableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnreachableReason::Timeout => write!(f, "request timed out"),
            UnreachableReason::Connect(msg) => write!(f, "connection failed ({})", msg),
            UnreachableReason::Status(code) => write!(f, "HTTP status {}", code),
            UnreachableReason::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Result type alias using plantcare-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
