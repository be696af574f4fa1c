//! Error types for slipstream configuration.

use thiserror::Error;

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling the upload configuration.
///
/// Everything else in the system passes errors through from its
/// collaborators unchanged; only configuration parsing originates here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The rate-window string does not describe two "HH:MM" times separated
    /// by a hyphen.
    #[error("malformed rate window '{input}': {reason}")]
    MalformedWindow {
        /// The offending input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl Error {
    /// Build a [`Error::MalformedWindow`] for `input`.
    #[must_use]
    pub fn malformed_window(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedWindow {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
