use bytes::Bytes;
use tracing::{trace, warn};

use crate::codec::{checksum, Frame, FCS_SIZE, HEADER_SIZE, SOF};

/// Receive state. The assembler tells the transport exactly how many bytes
/// the next read must deliver; each state owns one such request.
#[derive(Debug)]
enum RxState {
    /// Expecting 1 byte; anything other than SOF re-arms the same read.
    WaitingSof,
    /// Expecting the 3-byte header (length, cmd0, cmd1).
    WaitingHeader,
    /// Expecting payload + FCS for the header captured so far.
    WaitingData { header: [u8; HEADER_SIZE] },
}

/// Reassembles MT frames from a stream of exact-size reads.
///
/// One instance per link; the state machine is driven by whoever owns the
/// transport's receive path. `advance` consumes the chunk the previous call
/// asked for and returns the size of the next read, plus a completed frame
/// when the chunk closed one out.
///
/// Corrupt input (bad checksum, unexpected chunk length) is logged and
/// dropped; the machine resynchronizes on the next SOF byte and no error is
/// ever surfaced to the caller. A frame with a bad checksum is never emitted.
#[derive(Debug)]
pub struct FrameAssembler {
    state: RxState,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            state: RxState::WaitingSof,
        }
    }

    /// Size of the first read to issue on a fresh link.
    pub fn initial_read(&self) -> usize {
        1
    }

    /// Feed the chunk the previous request asked for.
    ///
    /// Returns `(next_read, frame)`: the exact byte count the next transport
    /// read must deliver, and the completed frame if this chunk finished one.
    pub fn advance(&mut self, chunk: &[u8]) -> (usize, Option<Frame>) {
        match &self.state {
            RxState::WaitingSof => {
                if chunk.len() == 1 && chunk[0] == SOF {
                    self.state = RxState::WaitingHeader;
                    (HEADER_SIZE, None)
                } else {
                    // Byte noise between frames; keep hunting for SOF.
                    (1, None)
                }
            }
            RxState::WaitingHeader => {
                if chunk.len() == HEADER_SIZE {
                    let mut header = [0u8; HEADER_SIZE];
                    header.copy_from_slice(chunk);
                    let payload_len = header[0] as usize;
                    self.state = RxState::WaitingData { header };
                    (payload_len + FCS_SIZE, None)
                } else {
                    warn!(
                        got = chunk.len(),
                        expected = HEADER_SIZE,
                        "short header read, resynchronizing"
                    );
                    self.state = RxState::WaitingSof;
                    (1, None)
                }
            }
            RxState::WaitingData { header } => {
                let header = *header;
                let payload_len = header[0] as usize;
                self.state = RxState::WaitingSof;

                if chunk.len() != payload_len + FCS_SIZE {
                    warn!(
                        got = chunk.len(),
                        expected = payload_len + FCS_SIZE,
                        "short data read, resynchronizing"
                    );
                    return (1, None);
                }

                let payload = &chunk[..payload_len];
                let fcs = chunk[payload_len];
                let calculated = checksum(header[0], header[1], header[2], payload);
                if calculated != fcs {
                    warn!(
                        cmd0 = format_args!("{:#04x}", header[1]),
                        cmd1 = format_args!("{:#04x}", header[2]),
                        expected = format_args!("{calculated:#04x}"),
                        got = format_args!("{fcs:#04x}"),
                        "checksum mismatch, frame dropped"
                    );
                    return (1, None);
                }

                trace!(
                    len = payload_len,
                    cmd0 = format_args!("{:#04x}", header[1]),
                    cmd1 = format_args!("{:#04x}", header[2]),
                    "frame assembled"
                );
                let frame = Frame::from_parts(header[1], header[2], Bytes::copy_from_slice(payload));
                (1, Some(frame))
            }
        }
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, CmdType, Subsystem};

    /// Drive the assembler the way the receive pump does: slice the wire
    /// buffer into exactly the chunks the assembler requests.
    fn feed(assembler: &mut FrameAssembler, wire: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut pos = 0;
        let mut next = assembler.initial_read();
        while pos + next <= wire.len() {
            let (request, frame) = assembler.advance(&wire[pos..pos + next]);
            pos += next;
            next = request;
            frames.extend(frame);
        }
        frames
    }

    fn sample_frame() -> Frame {
        Frame::new(CmdType::Srsp, Subsystem::Sys, 0x02, vec![2, 7, 1, 2, 0])
    }

    #[test]
    fn assembles_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(&sample_frame(), &mut wire).unwrap();

        let mut assembler = FrameAssembler::new();
        let frames = feed(&mut assembler, &wire);
        assert_eq!(frames, vec![sample_frame()]);
    }

    #[test]
    fn assembles_empty_payload_frame() {
        let ping = Frame::new(CmdType::Sreq, Subsystem::Sys, 0x01, Bytes::new());
        let mut wire = BytesMut::new();
        encode_frame(&ping, &mut wire).unwrap();

        let mut assembler = FrameAssembler::new();
        let frames = feed(&mut assembler, &wire);
        assert_eq!(frames, vec![ping]);
    }

    #[test]
    fn assembles_back_to_back_frames() {
        let mut wire = BytesMut::new();
        encode_frame(&sample_frame(), &mut wire).unwrap();
        let second = Frame::new(CmdType::Areq, Subsystem::Sys, 0x80, vec![0; 6]);
        encode_frame(&second, &mut wire).unwrap();

        let mut assembler = FrameAssembler::new();
        let frames = feed(&mut assembler, &wire);
        assert_eq!(frames, vec![sample_frame(), second]);
    }

    #[test]
    fn skips_leading_noise_until_sof() {
        let mut wire = BytesMut::from(&[0x00, 0x12, 0xAB][..]);
        encode_frame(&sample_frame(), &mut wire).unwrap();

        let mut assembler = FrameAssembler::new();
        let frames = feed(&mut assembler, &wire);
        assert_eq!(frames, vec![sample_frame()]);
    }

    #[test]
    fn single_bit_flip_anywhere_drops_frame() {
        let mut wire = BytesMut::new();
        encode_frame(&sample_frame(), &mut wire).unwrap();

        // Flip every bit of every byte between SOF and FCS in turn.
        for byte_idx in 1..wire.len() - 1 {
            for bit in 0..8 {
                let mut corrupted = wire.to_vec();
                corrupted[byte_idx] ^= 1 << bit;
                // A flip in the length byte changes the requested read size;
                // the frame must still never be emitted with wrong contents.
                let mut assembler = FrameAssembler::new();
                let frames = feed(&mut assembler, &corrupted);
                assert!(
                    frames.is_empty(),
                    "corrupted frame dispatched (byte {byte_idx}, bit {bit})"
                );
            }
        }
    }

    #[test]
    fn resynchronizes_after_spurious_sof() {
        // A lone SOF followed by garbage that fails the checksum, then a
        // genuine frame. Exactly one frame's worth of confusion, no garbage
        // dispatched.
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&[SOF, 0x02, 0x44, 0x80, 0x01, 0x02, 0x00]); // bad fcs
        encode_frame(&sample_frame(), &mut wire).unwrap();

        let mut assembler = FrameAssembler::new();
        let frames = feed(&mut assembler, &wire);
        assert_eq!(frames, vec![sample_frame()]);
    }

    #[test]
    fn short_header_read_resynchronizes() {
        let mut assembler = FrameAssembler::new();
        let (next, frame) = assembler.advance(&[SOF]);
        assert_eq!(next, HEADER_SIZE);
        assert!(frame.is_none());

        // Transport delivered fewer bytes than requested.
        let (next, frame) = assembler.advance(&[0x02]);
        assert_eq!(next, 1);
        assert!(frame.is_none());

        // Machine is hunting for SOF again.
        let mut wire = BytesMut::new();
        encode_frame(&sample_frame(), &mut wire).unwrap();
        let frames = feed(&mut assembler, &wire);
        assert_eq!(frames, vec![sample_frame()]);
    }

    #[test]
    fn short_data_read_resynchronizes() {
        let mut assembler = FrameAssembler::new();
        assembler.advance(&[SOF]);
        let (next, _) = assembler.advance(&[0x04, 0x61, 0x02]);
        assert_eq!(next, 5);

        let (next, frame) = assembler.advance(&[0x01, 0x02]);
        assert_eq!(next, 1);
        assert!(frame.is_none());

        let mut wire = BytesMut::new();
        encode_frame(&sample_frame(), &mut wire).unwrap();
        let frames = feed(&mut assembler, &wire);
        assert_eq!(frames, vec![sample_frame()]);
    }

    #[test]
    fn max_length_payload_assembles() {
        let big = Frame::new(
            CmdType::Srsp,
            Subsystem::Sys,
            0x33,
            (0..250u16).map(|i| i as u8).collect::<Vec<u8>>(),
        );
        let mut wire = BytesMut::new();
        encode_frame(&big, &mut wire).unwrap();

        let mut assembler = FrameAssembler::new();
        let frames = feed(&mut assembler, &wire);
        assert_eq!(frames, vec![big]);
    }
}
