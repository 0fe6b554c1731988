use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Start-of-frame marker byte.
pub const SOF: u8 = 0xFE;

/// Header size after the SOF marker: length (1) + cmd0 (1) + cmd1 (1).
pub const HEADER_SIZE: usize = 3;

/// Trailing frame-check-sequence size.
pub const FCS_SIZE: usize = 1;

/// Maximum payload size (256-byte MT frame minus the 3-byte header and margin).
pub const MAX_PAYLOAD: usize = 250;

/// Top three bits of cmd0 carry the command type.
pub const CMD_TYPE_MASK: u8 = 0xE0;

/// Low five bits of cmd0 carry the subsystem code.
pub const SUBSYSTEM_MASK: u8 = 0x1F;

/// Extension bit, combinable with AREQ/SRSP command types.
pub const EXTENSION_BIT: u8 = 0x80;

/// Command type carried in the top bits of cmd0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdType {
    /// Poll request (serial bootloader style transports only).
    Poll = 0x00,
    /// Synchronous request; the peer answers with an SRSP.
    Sreq = 0x20,
    /// Asynchronous request or unsolicited event.
    Areq = 0x40,
    /// Synchronous response to an earlier SREQ.
    Srsp = 0x60,
}

impl CmdType {
    /// Extract the command type from a raw cmd0 byte, ignoring the
    /// extension bit.
    pub fn from_cmd0(cmd0: u8) -> Self {
        match cmd0 & (CMD_TYPE_MASK & !EXTENSION_BIT) {
            0x20 => CmdType::Sreq,
            0x40 => CmdType::Areq,
            0x60 => CmdType::Srsp,
            _ => CmdType::Poll,
        }
    }
}

/// Command subsystem carried in the low five bits of cmd0.
///
/// Codes beyond this set are reserved; frames keep the raw cmd0 byte so
/// unknown codes survive routing and re-encoding untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subsystem {
    Res = 0,
    Sys = 1,
    Mac = 2,
    Nwk = 3,
    Af = 4,
    Zdo = 5,
    Sapi = 6,
    Util = 7,
    Dbg = 8,
    App = 9,
    Ota = 10,
    Znp = 11,
    Sbl = 13,
}

impl Subsystem {
    /// Look up a known subsystem by its 5-bit wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code & SUBSYSTEM_MASK {
            0 => Some(Subsystem::Res),
            1 => Some(Subsystem::Sys),
            2 => Some(Subsystem::Mac),
            3 => Some(Subsystem::Nwk),
            4 => Some(Subsystem::Af),
            5 => Some(Subsystem::Zdo),
            6 => Some(Subsystem::Sapi),
            7 => Some(Subsystem::Util),
            8 => Some(Subsystem::Dbg),
            9 => Some(Subsystem::App),
            10 => Some(Subsystem::Ota),
            11 => Some(Subsystem::Znp),
            13 => Some(Subsystem::Sbl),
            _ => None,
        }
    }

    /// The 5-bit wire code for this subsystem.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A decoded MT command frame.
///
/// cmd0 and cmd1 are kept as raw wire bytes; typed accessors derive the
/// command type and subsystem on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command type and subsystem byte.
    pub cmd0: u8,
    /// Opcode within the subsystem.
    pub cmd1: u8,
    /// Command payload, 0..=MAX_PAYLOAD bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame from typed parts.
    pub fn new(
        cmd_type: CmdType,
        subsystem: Subsystem,
        opcode: u8,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            cmd0: cmd_type as u8 | subsystem.code(),
            cmd1: opcode,
            payload: payload.into(),
        }
    }

    /// Build a frame from raw wire bytes.
    pub fn from_parts(cmd0: u8, cmd1: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            cmd0,
            cmd1,
            payload: payload.into(),
        }
    }

    /// The command type (POLL/SREQ/AREQ/SRSP).
    pub fn cmd_type(&self) -> CmdType {
        CmdType::from_cmd0(self.cmd0)
    }

    /// Whether the extension bit is set on cmd0.
    pub fn is_extended(&self) -> bool {
        self.cmd0 & EXTENSION_BIT != 0
    }

    /// The raw 5-bit subsystem code.
    pub fn subsystem_code(&self) -> u8 {
        self.cmd0 & SUBSYSTEM_MASK
    }

    /// The subsystem, if the code is a known one.
    pub fn subsystem(&self) -> Option<Subsystem> {
        Subsystem::from_code(self.cmd0)
    }

    /// The opcode within the subsystem (cmd1).
    pub fn opcode(&self) -> u8 {
        self.cmd1
    }

    /// Total on-wire size of this frame (SOF + header + payload + FCS).
    pub fn wire_size(&self) -> usize {
        1 + HEADER_SIZE + self.payload.len() + FCS_SIZE
    }
}

/// XOR frame-check-sequence over the header and payload bytes.
pub fn checksum(len: u8, cmd0: u8, cmd1: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(len ^ cmd0 ^ cmd1, |acc, byte| acc ^ byte)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────────┬──────────┬──────────┬──────────────┬─────────┐
/// │ SOF (1B)   │ len (1B) │ cmd0(1B) │ cmd1(1B) │ payload      │ FCS(1B) │
/// │ 0xFE       │ 0-250    │ type|sub │ opcode   │ (len bytes)  │ XOR     │
/// └────────────┴──────────┴──────────┴──────────┴──────────────┴─────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: frame.payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let len = frame.payload.len() as u8;
    dst.reserve(frame.wire_size());
    dst.put_u8(SOF);
    dst.put_u8(len);
    dst.put_u8(frame.cmd0);
    dst.put_u8(frame.cmd1);
    dst.put_slice(&frame.payload);
    dst.put_u8(checksum(len, frame.cmd0, frame.cmd1, &frame.payload));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sys_ping_sreq_wire_bytes() {
        // len 0, cmd0 = SREQ|SYS = 0x21, cmd1 = 0x01, fcs = 0x00^0x21^0x01.
        let frame = Frame::new(CmdType::Sreq, Subsystem::Sys, 0x01, Bytes::new());
        let mut wire = BytesMut::new();
        encode_frame(&frame, &mut wire).unwrap();
        assert_eq!(wire.as_ref(), &[0xFE, 0x00, 0x21, 0x01, 0x20]);
    }

    #[test]
    fn encode_with_payload() {
        let frame = Frame::new(CmdType::Sreq, Subsystem::Util, 0xEE, vec![0x00]);
        let mut wire = BytesMut::new();
        encode_frame(&frame, &mut wire).unwrap();

        assert_eq!(wire[0], SOF);
        assert_eq!(wire[1], 0x01);
        assert_eq!(wire[2], 0x27);
        assert_eq!(wire[3], 0xEE);
        assert_eq!(wire[4], 0x00);
        assert_eq!(wire[5], 0x01 ^ 0x27 ^ 0xEE);
    }

    #[test]
    fn oversized_payload_rejected() {
        let frame = Frame::new(
            CmdType::Sreq,
            Subsystem::Sys,
            0x33,
            vec![0u8; MAX_PAYLOAD + 1],
        );
        let mut wire = BytesMut::new();
        let err = encode_frame(&frame, &mut wire).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn cmd_type_decoding() {
        assert_eq!(CmdType::from_cmd0(0x21), CmdType::Sreq);
        assert_eq!(CmdType::from_cmd0(0x41), CmdType::Areq);
        assert_eq!(CmdType::from_cmd0(0x61), CmdType::Srsp);
        assert_eq!(CmdType::from_cmd0(0x01), CmdType::Poll);
        // Extension bit does not change the type.
        assert_eq!(CmdType::from_cmd0(0xE1), CmdType::Srsp);
        assert_eq!(CmdType::from_cmd0(0xC1), CmdType::Areq);
    }

    #[test]
    fn extension_bit_detected() {
        let frame = Frame::from_parts(0xE1, 0x02, Bytes::new());
        assert!(frame.is_extended());
        assert_eq!(frame.cmd_type(), CmdType::Srsp);
        assert_eq!(frame.subsystem(), Some(Subsystem::Sys));
    }

    #[test]
    fn subsystem_codes_round_trip() {
        for sub in [
            Subsystem::Res,
            Subsystem::Sys,
            Subsystem::Mac,
            Subsystem::Nwk,
            Subsystem::Af,
            Subsystem::Zdo,
            Subsystem::Sapi,
            Subsystem::Util,
            Subsystem::Dbg,
            Subsystem::App,
            Subsystem::Ota,
            Subsystem::Znp,
            Subsystem::Sbl,
        ] {
            assert_eq!(Subsystem::from_code(sub.code()), Some(sub));
        }
        assert_eq!(Subsystem::from_code(12), None);
        assert_eq!(Subsystem::from_code(31), None);
    }

    #[test]
    fn unknown_subsystem_kept_raw() {
        let frame = Frame::from_parts(0x40 | 0x1C, 0x10, Bytes::new());
        assert_eq!(frame.subsystem(), None);
        assert_eq!(frame.subsystem_code(), 0x1C);
    }

    #[test]
    fn checksum_is_xor_reduction() {
        assert_eq!(checksum(0x00, 0x21, 0x01, &[]), 0x20);
        assert_eq!(checksum(0x02, 0x61, 0x01, &[0xAA, 0x55]), 0x02 ^ 0x61 ^ 0x01 ^ 0xAA ^ 0x55);
    }

    #[test]
    fn wire_size_accounts_for_framing() {
        let frame = Frame::new(CmdType::Areq, Subsystem::Sys, 0x80, vec![0u8; 6]);
        assert_eq!(frame.wire_size(), 1 + 3 + 6 + 1);
    }
}
