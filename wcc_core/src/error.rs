//! Errors surfaced by the calendar pipeline.

use std::io;

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can make a calendar request fail.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller sent a missing or invalid query parameter.
    #[error("invalid request: {message}")]
    ClientInput { message: String },

    /// The provider answered with something we could not decode.
    #[error("unexpected response from provider: {message}")]
    UpstreamProtocol { message: String },

    /// The provider could not be reached or answered with an error status.
    #[error("could not reach provider: {0}")]
    UpstreamCommunication(#[from] reqwest::Error),

    /// A pickup date string did not contain a valid `DD-MM-YYYY` date.
    #[error("malformed pickup date from provider: {raw:?}")]
    MalformedDate { raw: String },

    /// No artifact is stored under this key.
    #[error("no artifact stored for key {key}")]
    NotFound { key: String },

    /// The pipeline was set up with invalid settings.
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{message}")]
    Unknown { message: String },
}

impl Error {
    pub fn client_input(message: impl Into<String>) -> Self {
        Self::ClientInput {
            message: message.into(),
        }
    }

    pub fn upstream_protocol(message: impl Into<String>) -> Self {
        Self::UpstreamProtocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Returns true if the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ClientInput { .. })
    }

    /// Returns true if the provider misbehaved or could not be reached.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::UpstreamProtocol { .. }
                | Self::UpstreamCommunication(_)
                | Self::MalformedDate { .. }
        )
    }
}
