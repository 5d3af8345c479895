//! Error types for the packet codec.

use std::io;

/// A frame that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedPacket {
    /// The buffer ends before the frame does.
    #[error("truncated packet: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required for the frame.
        needed: usize,
        /// Bytes present in the buffer.
        available: usize,
    },

    /// The event type code is not one we know about.
    #[error("unknown debugger event type {0}")]
    UnknownEventType(i32),
}

/// Errors surfaced through the tokio-util codec traits.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The frame at the head of the buffer is malformed.
    #[error(transparent)]
    Malformed(#[from] MalformedPacket),
}
