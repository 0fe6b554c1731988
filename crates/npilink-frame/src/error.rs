/// Errors that can occur during frame encoding/decoding.
///
/// Receive-side corruption (bad checksum, wrong chunk length) never produces
/// an error value; the assembler resynchronizes silently. These variants cover
/// the caller-visible cases only.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the wire format's maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A field decode ran past the end of the payload.
    #[error("payload truncated (needed {needed} more bytes, {remaining} left)")]
    Truncated { needed: usize, remaining: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
