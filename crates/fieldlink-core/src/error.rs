use std::time::Duration;

use fieldlink_api::RadioStatus;
use thiserror::Error;

/// Top-level error type for the `fieldlink-core` crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Error from the radio HTTP client.
    #[error("radio API error: {0}")]
    Api(#[from] fieldlink_api::Error),

    /// The radio never reported `CONFIGURING` after a configuration POST.
    #[error("radio did not acknowledge configuration within {0:?}")]
    NotAcknowledged(Duration),

    /// The radio stayed in `CONFIGURING` past the settle deadline.
    #[error("radio did not finish configuring within {0:?}")]
    SettleTimeout(Duration),

    /// The radio left `CONFIGURING` but settled somewhere unexpected.
    #[error("radio settled in status {status} instead of ACTIVE")]
    UnexpectedStatus { status: RadioStatus },

    /// The status poller stopped while a caller was waiting on it.
    #[error("status poller is no longer running")]
    PollerStopped,

    /// Socket-level failure in the push server.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol failure in the push server.
    #[error("push channel error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Failed to serialize an outbound push message.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
