//! SYS subsystem commands: ping, version, reset, and NV storage CRUD.
//!
//! Payloads are fixed-width little-endian fields in the order the MT
//! interface defines; encoding flattens the typed request structs and
//! decoding reads the response back through a bounds-checked cursor.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use npilink_frame::{CmdType, PayloadCursor, Subsystem, MAX_PAYLOAD};
use serde::Serialize;
use tracing::warn;

use crate::error::{LinkError, Result};
use crate::link::NpiLink;
use crate::router::HandlerRegistry;
use crate::status::MtStatus;

pub const SYS_RESET_REQ: u8 = 0x00;
pub const SYS_PING_REQ: u8 = 0x01;
pub const SYS_VERSION_REQ: u8 = 0x02;
pub const SYS_NV_CREATE_REQ: u8 = 0x30;
pub const SYS_NV_DELETE_REQ: u8 = 0x31;
pub const SYS_NV_LENGTH_REQ: u8 = 0x32;
pub const SYS_NV_READ_REQ: u8 = 0x33;
pub const SYS_NV_WRITE_REQ: u8 = 0x34;
pub const SYS_NV_UPDATE_REQ: u8 = 0x35;
pub const SYS_NV_COMPACT_REQ: u8 = 0x36;
pub const SYS_RESET_IND: u8 = 0x80;

/// Reset kind requested of the co-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetType {
    Hard = 0x00,
    Soft = 0x01,
}

/// Co-processor stack version, from the SYS version response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
    pub transport: u8,
    pub product: u8,
    pub major: u8,
    pub minor: u8,
    pub maint: u8,
}

/// Reset indication event, sent by the co-processor after any reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetInd {
    pub reason: u8,
    pub transport: u8,
    pub product: u8,
    pub major: u8,
    pub minor: u8,
    pub maint: u8,
}

/// Address of one NV storage item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NvItem {
    pub sys_id: u8,
    pub item_id: u16,
    pub sub_id: u16,
}

/// Handlers for SYS AREQ events.
pub trait SysEvents: Send + Sync {
    fn reset_ind(&self, ind: ResetInd);
}

/// Register SYS event decoding into a handler registry.
pub fn register_events(registry: &mut HandlerRegistry, events: Arc<dyn SysEvents>) {
    registry.register(Subsystem::Sys, SYS_RESET_IND, move |frame| {
        match decode_reset_ind(&frame.payload) {
            Ok(ind) => events.reset_ind(ind),
            Err(err) => warn!(%err, "malformed reset indication dropped"),
        }
    });
}

pub(crate) fn decode_reset_ind(payload: &[u8]) -> Result<ResetInd> {
    let mut cursor = PayloadCursor::new(payload);
    Ok(ResetInd {
        reason: cursor.get_u8()?,
        transport: cursor.get_u8()?,
        product: cursor.get_u8()?,
        major: cursor.get_u8()?,
        minor: cursor.get_u8()?,
        maint: cursor.get_u8()?,
    })
}

pub(crate) fn decode_version(payload: &[u8]) -> Result<Version> {
    let mut cursor = PayloadCursor::new(payload);
    Ok(Version {
        transport: cursor.get_u8()?,
        product: cursor.get_u8()?,
        major: cursor.get_u8()?,
        minor: cursor.get_u8()?,
        maint: cursor.get_u8()?,
    })
}

/// Decode a status-only SRSP payload and map non-success to an error.
pub(crate) fn check_status(payload: &[u8]) -> Result<()> {
    let mut cursor = PayloadCursor::new(payload);
    let status = MtStatus::from_code(cursor.get_u8()?);
    if status.is_success() {
        Ok(())
    } else {
        Err(LinkError::CommandFailed(status))
    }
}

fn encode_nv_item(dst: &mut BytesMut, item: NvItem) {
    dst.put_u8(item.sys_id);
    dst.put_u16_le(item.item_id);
    dst.put_u16_le(item.sub_id);
}

/// SYS subsystem command wrappers, borrowed from a running link.
#[derive(Debug)]
pub struct Sys<'a> {
    link: &'a NpiLink,
}

impl<'a> Sys<'a> {
    pub(crate) fn new(link: &'a NpiLink) -> Self {
        Self { link }
    }

    /// Request a co-processor reset. Fire-and-forget AREQ; the co-processor
    /// answers with a reset indication event once it is back up.
    pub fn reset(&self, reset_type: ResetType) -> Result<()> {
        self.link.send_command(
            CmdType::Areq,
            Subsystem::Sys,
            SYS_RESET_REQ,
            &[reset_type as u8],
        )
    }

    /// Ping the co-processor; returns its capability bitmap.
    pub fn ping(&self) -> Result<u16> {
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_PING_REQ, &[])?;
        let mut cursor = PayloadCursor::new(&payload);
        Ok(cursor.get_u16_le()?)
    }

    /// Query the co-processor stack version.
    pub fn version(&self) -> Result<Version> {
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_VERSION_REQ, &[])?;
        decode_version(&payload)
    }

    /// Create an NV item of `length` bytes.
    pub fn nv_create(&self, item: NvItem, length: u32) -> Result<()> {
        let mut req = BytesMut::with_capacity(9);
        encode_nv_item(&mut req, item);
        req.put_u32_le(length);
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_NV_CREATE_REQ, &req)?;
        check_status(&payload)
    }

    /// Delete an NV item.
    pub fn nv_delete(&self, item: NvItem) -> Result<()> {
        let mut req = BytesMut::with_capacity(5);
        encode_nv_item(&mut req, item);
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_NV_DELETE_REQ, &req)?;
        check_status(&payload)
    }

    /// Query the length of an NV item.
    pub fn nv_length(&self, item: NvItem) -> Result<u32> {
        let mut req = BytesMut::with_capacity(5);
        encode_nv_item(&mut req, item);
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_NV_LENGTH_REQ, &req)?;
        let mut cursor = PayloadCursor::new(&payload);
        Ok(cursor.get_u32_le()?)
    }

    /// Read `length` bytes of an NV item starting at `offset`.
    ///
    /// The response carries a status byte and a length-prefixed data run;
    /// the data length is checked against the actual payload size.
    pub fn nv_read(&self, item: NvItem, offset: u16, length: u8) -> Result<Bytes> {
        let mut req = BytesMut::with_capacity(8);
        encode_nv_item(&mut req, item);
        req.put_u16_le(offset);
        req.put_u8(length);
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_NV_READ_REQ, &req)?;

        let mut cursor = PayloadCursor::new(&payload);
        let status = MtStatus::from_code(cursor.get_u8()?);
        if !status.is_success() {
            return Err(LinkError::CommandFailed(status));
        }
        let data_len = cursor.get_u8()? as usize;
        Ok(Bytes::copy_from_slice(cursor.get_bytes(data_len)?))
    }

    /// Write `data` into an NV item at `offset`.
    pub fn nv_write(&self, item: NvItem, offset: u16, data: &[u8]) -> Result<()> {
        const FIXED: usize = 8; // item (5) + offset (2) + length (1)
        if data.len() > MAX_PAYLOAD - FIXED {
            return Err(npilink_frame::FrameError::PayloadTooLarge {
                size: data.len(),
                max: MAX_PAYLOAD - FIXED,
            }
            .into());
        }
        let mut req = BytesMut::with_capacity(FIXED + data.len());
        encode_nv_item(&mut req, item);
        req.put_u16_le(offset);
        req.put_u8(data.len() as u8);
        req.put_slice(data);
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_NV_WRITE_REQ, &req)?;
        check_status(&payload)
    }

    /// Rewrite an NV item from the start with `data`.
    pub fn nv_update(&self, item: NvItem, data: &[u8]) -> Result<()> {
        const FIXED: usize = 6; // item (5) + length (1)
        if data.len() > MAX_PAYLOAD - FIXED {
            return Err(npilink_frame::FrameError::PayloadTooLarge {
                size: data.len(),
                max: MAX_PAYLOAD - FIXED,
            }
            .into());
        }
        let mut req = BytesMut::with_capacity(FIXED + data.len());
        encode_nv_item(&mut req, item);
        req.put_u8(data.len() as u8);
        req.put_slice(data);
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_NV_UPDATE_REQ, &req)?;
        check_status(&payload)
    }

    /// Compact NV storage if at least `threshold` bytes can be reclaimed.
    pub fn nv_compact(&self, threshold: u16) -> Result<()> {
        let mut req = BytesMut::with_capacity(2);
        req.put_u16_le(threshold);
        let payload = self
            .link
            .send_and_await(Subsystem::Sys, SYS_NV_COMPACT_REQ, &req)?;
        check_status(&payload)
    }
}
