use thiserror::Error;

use crate::buffer::CodecError;

/// Protocol-level error for the DS/FMS codec and listener service.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Buffer-level failure. `CodecError::Overflow` inside a streaming
    /// context means "incomplete frame" and is handled by the reassembler,
    /// never surfaced to consumers.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// TCP message with a type tag this protocol version doesn't know.
    /// The TCP path does not tolerate unknown extensions.
    #[error("unknown TCP message type 0x{0:02x}")]
    UnknownMessageType(u8),

    /// A UDP tag record declared a length of zero.
    #[error("zero-length tag record in status datagram")]
    ZeroLengthTag,

    /// The 2-bit mode field held the reserved value 3.
    #[error("invalid DS mode bits 0b{0:02b}")]
    InvalidMode(u8),

    /// The fixed control-packet body did not fill its buffer exactly.
    #[error("control packet body underfilled: {remaining} bytes remaining")]
    BodyUnderfilled { remaining: usize },

    /// Socket-level failure in the listener service.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtoError {
    /// Whether this error only signals that more bytes are needed.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Codec(CodecError::Overflow { .. }))
    }
}
