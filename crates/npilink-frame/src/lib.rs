//! MT/NPI frame codec for the 802.15.4 co-processor serial link.
//!
//! Every command crosses the wire as a checksummed frame:
//! - A 1-byte start-of-frame marker (0xFE) for stream synchronization
//! - A 3-byte header: payload length, cmd0 (type | subsystem), cmd1 (opcode)
//! - The payload and a trailing XOR frame-check-sequence
//!
//! The receive side is an explicit state machine fed exact-size reads;
//! corrupt input resynchronizes silently and never reaches a dispatcher.

pub mod codec;
pub mod cursor;
pub mod error;
pub mod rx;

pub use codec::{
    checksum, encode_frame, CmdType, Frame, Subsystem, CMD_TYPE_MASK, EXTENSION_BIT, FCS_SIZE,
    HEADER_SIZE, MAX_PAYLOAD, SOF, SUBSYSTEM_MASK,
};
pub use cursor::PayloadCursor;
pub use error::{FrameError, Result};
pub use rx::FrameAssembler;
