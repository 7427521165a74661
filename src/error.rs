//! Error types for the request-boost crate.
//!
//! Only pre-flight problems surface as errors. Failures of individual
//! attempts never leave a worker; they end up in the output slots instead.

use thiserror::Error;

/// Error returned when a batch cannot be started.
#[derive(Debug, Error)]
pub enum BoostError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A per-target list does not line up with the target list.
    #[error("{field} has {actual} entries but there are {expected} targets")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A target URL could not be parsed or uses an unsupported scheme.
    #[error("invalid url at index {index} ({url}): {reason}")]
    InvalidUrl {
        index: usize,
        url: String,
        reason: String,
    },

    /// A header name or value is not valid HTTP.
    #[error("invalid header at index {index} ({name}): {reason}")]
    InvalidHeader {
        index: usize,
        name: String,
        reason: String,
    },

    /// A proxy string could not be parsed.
    #[error("invalid proxy {proxy}: {reason}")]
    InvalidProxy { proxy: String, reason: String },

    /// The probe domain is empty or malformed.
    #[error("invalid probe domain: {0:?}")]
    InvalidDomain(String),

    /// A batch mixes HTTP targets with proxy targets.
    #[error("batch mixes http and proxy targets (first mismatch at index {index})")]
    MixedTargets { index: usize },

    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
