use thiserror::Error;

/// Top-level error type for the `fieldlink-api` crate.
///
/// Transport and schema failures are kept distinct: a transport error is
/// a connectivity event the poller recovers from, while an invalid payload
/// means the radio sent something this crate refuses to partially accept.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport error (timeout, connection refused, DNS failure).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-2xx response from the radio, with the body text for debugging.
    #[error("Radio API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// JSON decoding failed, with the raw body preserved.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The payload decoded but failed structural validation. The whole
    /// update is discarded, never partially merged.
    #[error("Invalid radio payload: {reason}")]
    InvalidPayload { reason: String },
}

impl Error {
    /// Returns `true` for failures the status poller treats as a
    /// connectivity gap rather than a protocol problem.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
