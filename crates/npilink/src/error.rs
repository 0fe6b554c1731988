use std::time::Duration;

use crate::status::MtStatus;

/// Errors surfaced to link users.
///
/// Wire corruption never appears here; the frame layer resynchronizes
/// silently. Correlation failure, backpressure, and command status are the
/// caller-visible failure categories.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] npilink_transport::TransportError),

    /// Frame-level error (encode limit or payload decode).
    #[error("frame error: {0}")]
    Frame(#[from] npilink_frame::FrameError),

    /// An I/O error occurred writing to the serial line.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No matching synchronous response arrived within the retry budget.
    #[error(
        "no synchronous response for opcode {opcode:#04x} after {attempts} attempts ({waited:?})"
    )]
    SrspTimeout {
        opcode: u8,
        attempts: u32,
        waited: Duration,
    },

    /// The synchronous-response queue is full; the peer is answering faster
    /// than callers consume.
    #[error("synchronous response queue full")]
    SrspQueueFull,

    /// The event queue is full; inbound AREQ backpressure.
    #[error("event queue full")]
    EventQueueFull,

    /// The peer answered with a non-success MT status.
    #[error("command failed: {0}")]
    CommandFailed(MtStatus),

    /// The link has shut down.
    #[error("link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, LinkError>;
