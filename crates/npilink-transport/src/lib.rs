//! Stream transports for the MT/NPI co-processor link.
//!
//! The frame layer needs nothing more than a blocking Read + Write byte
//! stream; this crate provides that over a serial device node or a Unix
//! domain socket, with a socketpair constructor for tests.

pub mod error;
pub mod stream;

pub use error::{Result, TransportError};
pub use stream::NpiStream;
