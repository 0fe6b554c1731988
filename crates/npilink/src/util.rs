//! UTIL subsystem commands: event subscription, extended address, random.

use bytes::{BufMut, BytesMut};
use npilink_frame::{PayloadCursor, Subsystem};
use serde::Serialize;

use crate::error::{LinkError, Result};
use crate::link::NpiLink;
use crate::status::MtStatus;

pub const UTIL_CALLBACK_SUB_CMD: u8 = 0x06;
pub const UTIL_RANDOM: u8 = 0x12;
pub const UTIL_GET_EXT_ADDR: u8 = 0xEE;

/// Extended (IEEE 64-bit) address of the co-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtAddr {
    /// Which address was read (factory, NV, ...).
    pub addr_type: u8,
    /// Address bytes in wire order (little-endian).
    pub address: [u8; 8],
}

/// UTIL subsystem command wrappers, borrowed from a running link.
#[derive(Debug)]
pub struct Util<'a> {
    link: &'a NpiLink,
}

impl<'a> Util<'a> {
    pub(crate) fn new(link: &'a NpiLink) -> Self {
        Self { link }
    }

    /// Subscribe to a subsystem's callback events. Returns the enable mask
    /// in effect after the change.
    pub fn callback_sub_cmd(&self, subsystem_id: u8, enables: u32) -> Result<u32> {
        let mut req = BytesMut::with_capacity(5);
        req.put_u8(subsystem_id);
        req.put_u32_le(enables);
        let payload = self
            .link
            .send_and_await(Subsystem::Util, UTIL_CALLBACK_SUB_CMD, &req)?;

        let mut cursor = PayloadCursor::new(&payload);
        let status = MtStatus::from_code(cursor.get_u8()?);
        if !status.is_success() {
            return Err(LinkError::CommandFailed(status));
        }
        Ok(cursor.get_u32_le()?)
    }

    /// Read the co-processor's extended address.
    pub fn get_ext_addr(&self, addr_type: u8) -> Result<ExtAddr> {
        let payload = self
            .link
            .send_and_await(Subsystem::Util, UTIL_GET_EXT_ADDR, &[addr_type])?;

        let mut cursor = PayloadCursor::new(&payload);
        Ok(ExtAddr {
            addr_type: cursor.get_u8()?,
            address: cursor.get_array()?,
        })
    }

    /// Ask the co-processor for a 16-bit random number.
    pub fn random(&self) -> Result<u16> {
        let payload = self.link.send_and_await(Subsystem::Util, UTIL_RANDOM, &[])?;
        let mut cursor = PayloadCursor::new(&payload);
        Ok(cursor.get_u16_le()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_addr_serializes_for_output() {
        let addr = ExtAddr {
            addr_type: 1,
            address: [1, 2, 3, 4, 5, 6, 7, 8],
        };
        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.contains("\"addr_type\":1"));
        assert!(json.contains("[1,2,3,4,5,6,7,8]"));
    }
}
